//! The processed station dataset.

use core::str::FromStr;
use std::sync::Arc;

use object_store::ObjectStore;
use polars::prelude::*;
use station_structs::{
    ChargerType, CityType, PipelineError, PipelineResult, StationRecord, StationStatus, columns,
};
use tracing::info;

use crate::frame::{
    f64_values, frame_to_parquet, i64_values, parquet_to_frame, required, str_values,
};
use crate::path_utils::{object_exists, read_optional, write_bytes};

/// Location of the processed dataset inside the store.
pub const PROCESSED_DATASET_PATH: &str = "data/processed/stations.parquet";

/// Columnar station dataset persisted as parquet.
#[derive(Clone)]
pub struct StationDataset {
    store: Arc<dyn ObjectStore>,
}

impl StationDataset {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Returns true once ingestion has written the dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    pub async fn exists(&self) -> PipelineResult<bool> {
        object_exists(self.store.as_ref(), PROCESSED_DATASET_PATH).await
    }

    /// Writes the records, replacing any previous dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub async fn write_records(&self, records: &[StationRecord]) -> PipelineResult<()> {
        let mut df = records_to_frame(records)?;
        let data = frame_to_parquet(&mut df)?;

        write_bytes(self.store.as_ref(), PROCESSED_DATASET_PATH, data).await?;

        info!(
            path = PROCESSED_DATASET_PATH,
            stations = records.len(),
            columns = ?df.get_column_names(),
            "Processed data saved"
        );

        Ok(())
    }

    /// Loads the dataset as a frame.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DataNotFound`] if ingestion has not run yet.
    pub async fn read_frame(&self) -> PipelineResult<DataFrame> {
        let data = read_optional(self.store.as_ref(), PROCESSED_DATASET_PATH)
            .await?
            .ok_or_else(|| PipelineError::DataNotFound {
                path: PROCESSED_DATASET_PATH.to_string(),
                hint: "Run ingest first.",
            })?;

        parquet_to_frame(data)
    }

    /// Loads the dataset as typed records.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset is missing or malformed.
    pub async fn read_records(&self) -> PipelineResult<Vec<StationRecord>> {
        let df = self.read_frame().await?;
        frame_to_records(&df)
    }
}

/// Builds the columnar representation of station records.
///
/// # Errors
///
/// Returns an error if polars rejects the columns.
pub fn records_to_frame(records: &[StationRecord]) -> PipelineResult<DataFrame> {
    let text = |f: fn(&StationRecord) -> Option<String>| -> Vec<Option<String>> {
        records.iter().map(f).collect()
    };

    DataFrame::new(vec![
        Column::new(
            columns::STATION_ID.into(),
            records.iter().map(|r| r.station_id).collect::<Vec<_>>(),
        ),
        Column::new(columns::TITLE.into(), text(|r| r.title.clone())),
        Column::new(columns::COUNTRY.into(), text(|r| r.country.clone())),
        Column::new(columns::REGION.into(), text(|r| r.region.clone())),
        Column::new(columns::TOWN.into(), text(|r| r.town.clone())),
        Column::new(
            columns::CITY_TYPE.into(),
            records.iter().map(|r| r.city_type.to_string()).collect::<Vec<_>>(),
        ),
        Column::new(
            columns::CHARGER_TYPE.into(),
            records.iter().map(|r| r.charger_type.to_string()).collect::<Vec<_>>(),
        ),
        Column::new(
            columns::LATITUDE.into(),
            records.iter().map(|r| r.latitude).collect::<Vec<_>>(),
        ),
        Column::new(
            columns::LONGITUDE.into(),
            records.iter().map(|r| r.longitude).collect::<Vec<_>>(),
        ),
        Column::new(
            columns::NUM_CONNECTORS.into(),
            records.iter().map(|r| r.num_connectors).collect::<Vec<_>>(),
        ),
        Column::new(
            columns::POWER_KW.into(),
            records.iter().map(|r| r.power_kw).collect::<Vec<_>>(),
        ),
        Column::new(
            columns::USAGE_TYPE_ID.into(),
            records.iter().map(|r| r.usage_type_id).collect::<Vec<_>>(),
        ),
        Column::new(
            columns::STATUS_TYPE_ID.into(),
            records.iter().map(|r| r.status_type_id).collect::<Vec<_>>(),
        ),
        Column::new(
            columns::STATUS.into(),
            records.iter().map(|r| r.status.to_string()).collect::<Vec<_>>(),
        ),
        Column::new(
            columns::SESSIONS_PER_DAY.into(),
            records.iter().map(|r| r.sessions_per_day).collect::<Vec<_>>(),
        ),
    ])
    .map_err(|e| PipelineError::storage("Failed to build station frame", e))
}

fn parse_category<T: FromStr>(column: &str, values: Vec<Option<String>>) -> PipelineResult<Vec<T>> {
    required(column, values)?
        .into_iter()
        .map(|raw| {
            T::from_str(&raw)
                .map_err(|_| PipelineError::Schema(format!("Invalid {column} value: {raw}")))
        })
        .collect()
}

/// Reads station records back from a frame.
///
/// # Errors
///
/// Returns [`PipelineError::Schema`] if a column is missing or malformed.
pub fn frame_to_records(df: &DataFrame) -> PipelineResult<Vec<StationRecord>> {
    let station_ids = required(columns::STATION_ID, i64_values(df, columns::STATION_ID)?)?;
    let titles = str_values(df, columns::TITLE)?;
    let countries = str_values(df, columns::COUNTRY)?;
    let regions = str_values(df, columns::REGION)?;
    let towns = str_values(df, columns::TOWN)?;
    let city_types: Vec<CityType> =
        parse_category(columns::CITY_TYPE, str_values(df, columns::CITY_TYPE)?)?;
    let charger_types: Vec<ChargerType> =
        parse_category(columns::CHARGER_TYPE, str_values(df, columns::CHARGER_TYPE)?)?;
    let latitudes = f64_values(df, columns::LATITUDE)?;
    let longitudes = f64_values(df, columns::LONGITUDE)?;
    let connectors = required(columns::NUM_CONNECTORS, i64_values(df, columns::NUM_CONNECTORS)?)?;
    let powers = required(columns::POWER_KW, f64_values(df, columns::POWER_KW)?)?;
    let usage_type_ids = i64_values(df, columns::USAGE_TYPE_ID)?;
    let status_type_ids = i64_values(df, columns::STATUS_TYPE_ID)?;
    let statuses: Vec<StationStatus> =
        parse_category(columns::STATUS, str_values(df, columns::STATUS)?)?;
    let sessions = required(
        columns::SESSIONS_PER_DAY,
        f64_values(df, columns::SESSIONS_PER_DAY)?,
    )?;

    let records = (0..df.height())
        .map(|i| StationRecord {
            station_id: station_ids[i],
            title: titles[i].clone(),
            country: countries[i].clone(),
            region: regions[i].clone(),
            town: towns[i].clone(),
            city_type: city_types[i],
            charger_type: charger_types[i],
            latitude: latitudes[i],
            longitude: longitudes[i],
            num_connectors: connectors[i],
            power_kw: powers[i],
            usage_type_id: usage_type_ids[i],
            status_type_id: status_type_ids[i],
            status: statuses[i],
            sessions_per_day: sessions[i],
        })
        .collect();

    Ok(records)
}

#[cfg(test)]
mod tests {
    use object_store::memory::InMemory;

    use super::*;

    fn record(id: i64, region: Option<&str>) -> StationRecord {
        StationRecord {
            station_id: id,
            title: Some(format!("Site {id}")),
            country: Some(String::from("DE")),
            region: region.map(str::to_owned),
            town: None,
            city_type: CityType::Rural,
            charger_type: ChargerType::AC,
            latitude: Some(52.5),
            longitude: None,
            num_connectors: 2,
            power_kw: 22.0,
            usage_type_id: None,
            status_type_id: Some(50),
            status: StationStatus::Operational,
            sessions_per_day: 6.3,
        }
    }

    #[tokio::test]
    async fn test_read_before_write_is_data_not_found() {
        let dataset = StationDataset::new(Arc::new(InMemory::new()));

        assert!(!dataset.exists().await.expect("exists"));
        assert!(matches!(
            dataset.read_frame().await,
            Err(PipelineError::DataNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_records_survive_storage() {
        let dataset = StationDataset::new(Arc::new(InMemory::new()));
        let records = vec![record(1, Some("Berlin")), record(2, None)];

        dataset.write_records(&records).await.expect("write");

        assert!(dataset.exists().await.expect("exists"));
        assert_eq!(dataset.read_records().await.expect("read"), records);
    }

    #[tokio::test]
    async fn test_dataset_lands_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = object_store::local::LocalFileSystem::new_with_prefix(dir.path())
            .expect("local store");
        let dataset = StationDataset::new(Arc::new(store));

        dataset
            .write_records(&[record(3, Some("Hessen"))])
            .await
            .expect("write");

        assert!(dir.path().join(PROCESSED_DATASET_PATH).is_file());
        assert_eq!(dataset.read_records().await.expect("read").len(), 1);
    }

    #[test]
    fn test_frame_has_target_column() {
        let df = records_to_frame(&[record(7, Some("Bayern"))]).expect("frame");
        assert!(crate::frame::has_column(&df, columns::SESSIONS_PER_DAY));
        assert_eq!(df.width(), 15);
    }
}
