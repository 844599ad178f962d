//! Append-only log of served predictions.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use object_store::ObjectStore;
use polars::prelude::*;
use station_structs::{
    PipelineError, PipelineResult, PredictionLogEntry, StationFeatures, log_columns,
};
use tracing::debug;
use uuid::Uuid;

use crate::frame::{f64_values, frame_to_parquet, i64_values, parquet_to_frame, required, str_values};
use crate::path_utils::{read_optional, write_bytes};

pub const PREDICTION_LOG_PATH: &str = "data/logs/predictions.parquet";

/// Parquet-backed prediction log.
///
/// Appending rewrites the whole file, so concurrent appends from separate
/// handles can lose rows. Callers route every append through one writer.
#[derive(Clone)]
pub struct PredictionLogStore {
    store: Arc<dyn ObjectStore>,
}

impl PredictionLogStore {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Appends one entry. The file is created on first use.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Logging`] if the log cannot be read or
    /// rewritten.
    pub async fn append(&self, entry: PredictionLogEntry) -> PipelineResult<()> {
        let mut entries = self
            .read_all()
            .await
            .map_err(|e| PipelineError::Logging(e.to_string()))?;
        entries.push(entry);

        let mut df = entries_to_frame(&entries).map_err(|e| PipelineError::Logging(e.to_string()))?;
        let data = frame_to_parquet(&mut df).map_err(|e| PipelineError::Logging(e.to_string()))?;

        write_bytes(self.store.as_ref(), PREDICTION_LOG_PATH, data)
            .await
            .map_err(|e| PipelineError::Logging(e.to_string()))?;

        debug!(rows = entries.len(), "Prediction logged");

        Ok(())
    }

    /// Reads every logged entry in append order. A missing log is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the log exists but cannot be decoded.
    pub async fn read_all(&self) -> PipelineResult<Vec<PredictionLogEntry>> {
        match read_optional(self.store.as_ref(), PREDICTION_LOG_PATH).await? {
            Some(data) => frame_to_entries(&parquet_to_frame(data)?),
            None => Ok(Vec::new()),
        }
    }

    /// Reads every logged entry, requiring the log to exist.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DataNotFound`] if nothing has been logged yet.
    pub async fn read_existing(&self) -> PipelineResult<Vec<PredictionLogEntry>> {
        let data = read_optional(self.store.as_ref(), PREDICTION_LOG_PATH)
            .await?
            .ok_or_else(|| PipelineError::DataNotFound {
                path: PREDICTION_LOG_PATH.to_string(),
                hint: "Call /predict a few times first.",
            })?;

        frame_to_entries(&parquet_to_frame(data)?)
    }

    /// Number of logged rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be decoded.
    pub async fn len(&self) -> PipelineResult<usize> {
        match read_optional(self.store.as_ref(), PREDICTION_LOG_PATH).await? {
            Some(data) => Ok(parquet_to_frame(data)?.height()),
            None => Ok(0),
        }
    }
}

fn entries_to_frame(entries: &[PredictionLogEntry]) -> PipelineResult<DataFrame> {
    DataFrame::new(vec![
        Column::new(
            log_columns::TIMESTAMP_UTC.into(),
            entries
                .iter()
                .map(|e| e.timestamp_utc.to_rfc3339_opts(SecondsFormat::Nanos, true))
                .collect::<Vec<_>>(),
        ),
        Column::new(
            log_columns::PREDICTION.into(),
            entries.iter().map(|e| e.prediction).collect::<Vec<_>>(),
        ),
        Column::new(
            log_columns::REQUEST_ID.into(),
            entries
                .iter()
                .map(|e| e.request_id.to_string())
                .collect::<Vec<_>>(),
        ),
        Column::new(
            log_columns::REGION.into(),
            entries
                .iter()
                .map(|e| e.request.region.clone())
                .collect::<Vec<_>>(),
        ),
        Column::new(
            log_columns::CITY_TYPE.into(),
            entries
                .iter()
                .map(|e| e.request.city_type.clone())
                .collect::<Vec<_>>(),
        ),
        Column::new(
            log_columns::CHARGER_TYPE.into(),
            entries
                .iter()
                .map(|e| e.request.charger_type.clone())
                .collect::<Vec<_>>(),
        ),
        Column::new(
            log_columns::POWER_KW.into(),
            entries.iter().map(|e| e.request.power_kw).collect::<Vec<_>>(),
        ),
        Column::new(
            log_columns::NUM_CONNECTORS.into(),
            entries
                .iter()
                .map(|e| e.request.num_connectors)
                .collect::<Vec<_>>(),
        ),
    ])
    .map_err(|e| PipelineError::storage("Failed to build prediction log frame", e))
}

fn frame_to_entries(df: &DataFrame) -> PipelineResult<Vec<PredictionLogEntry>> {
    let timestamps = required(
        log_columns::TIMESTAMP_UTC,
        str_values(df, log_columns::TIMESTAMP_UTC)?,
    )?;
    let predictions = required(
        log_columns::PREDICTION,
        f64_values(df, log_columns::PREDICTION)?,
    )?;
    let request_ids = required(
        log_columns::REQUEST_ID,
        str_values(df, log_columns::REQUEST_ID)?,
    )?;
    let regions = required(log_columns::REGION, str_values(df, log_columns::REGION)?)?;
    let city_types = required(
        log_columns::CITY_TYPE,
        str_values(df, log_columns::CITY_TYPE)?,
    )?;
    let charger_types = required(
        log_columns::CHARGER_TYPE,
        str_values(df, log_columns::CHARGER_TYPE)?,
    )?;
    let powers = required(log_columns::POWER_KW, f64_values(df, log_columns::POWER_KW)?)?;
    let connectors = required(
        log_columns::NUM_CONNECTORS,
        i64_values(df, log_columns::NUM_CONNECTORS)?,
    )?;

    let rows = timestamps
        .into_iter()
        .zip(request_ids)
        .zip(regions.into_iter().zip(city_types).zip(charger_types))
        .zip(predictions.into_iter().zip(powers).zip(connectors));

    rows.map(
        |(((timestamp, request_id), ((region, city_type), charger_type)), ((prediction, power_kw), num_connectors))| {
            let timestamp_utc = DateTime::parse_from_rfc3339(&timestamp)
                .map_err(|e| PipelineError::Schema(format!("Invalid log timestamp {timestamp}: {e}")))?
                .with_timezone(&Utc);
            let request_id = Uuid::parse_str(&request_id)
                .map_err(|e| PipelineError::Schema(format!("Invalid request id {request_id}: {e}")))?;

            Ok(PredictionLogEntry {
                timestamp_utc,
                prediction,
                request_id,
                request: StationFeatures {
                    region,
                    city_type,
                    charger_type,
                    power_kw,
                    num_connectors,
                },
            })
        },
    )
    .collect()
}

#[cfg(test)]
mod tests {
    use object_store::memory::InMemory;

    use super::*;

    fn entry(region: &str, prediction: f64) -> PredictionLogEntry {
        PredictionLogEntry::new(
            StationFeatures {
                region: region.to_string(),
                city_type: String::from("urban"),
                charger_type: String::from("DC"),
                power_kw: 150.0,
                num_connectors: 4,
            },
            prediction,
        )
    }

    #[tokio::test]
    async fn test_missing_log_is_empty() {
        let log = PredictionLogStore::new(Arc::new(InMemory::new()));

        assert_eq!(log.len().await.expect("len"), 0);
        assert!(log.read_all().await.expect("read").is_empty());

        let err = log.read_existing().await.expect_err("no log yet");
        assert!(matches!(err, PipelineError::DataNotFound { .. }));
        assert!(err.to_string().contains("/predict"));
    }

    #[tokio::test]
    async fn test_appends_preserve_order_and_fields() {
        let log = PredictionLogStore::new(Arc::new(InMemory::new()));
        let first = entry("Berlin", 14.2);
        let second = entry("Hamburg", 3.0);

        log.append(first.clone()).await.expect("append");
        log.append(second.clone()).await.expect("append");

        let rows = log.read_all().await.expect("read");
        assert_eq!(rows, vec![first, second]);
        assert_eq!(log.len().await.expect("len"), 2);
    }

    #[tokio::test]
    async fn test_corrupt_log_fails_as_logging_error() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        write_bytes(
            store.as_ref(),
            PREDICTION_LOG_PATH,
            bytes::Bytes::from_static(b"not parquet"),
        )
        .await
        .expect("write");

        let err = PredictionLogStore::new(store)
            .append(entry("Berlin", 1.0))
            .await
            .expect_err("corrupt log");
        assert!(matches!(err, PipelineError::Logging(_)));
    }
}
