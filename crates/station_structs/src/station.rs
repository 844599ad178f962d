use serde::{Deserialize, Serialize};

/// Column names of the processed station dataset.
pub mod columns {
    pub const STATION_ID: &str = "station_id";
    pub const TITLE: &str = "title";
    pub const COUNTRY: &str = "country";
    pub const REGION: &str = "region";
    pub const TOWN: &str = "town";
    pub const CITY_TYPE: &str = "city_type";
    pub const CHARGER_TYPE: &str = "charger_type";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const NUM_CONNECTORS: &str = "num_connectors";
    pub const POWER_KW: &str = "power_kw";
    pub const USAGE_TYPE_ID: &str = "usage_type_id";
    pub const STATUS_TYPE_ID: &str = "status_type_id";
    pub const STATUS: &str = "status";
    pub const SESSIONS_PER_DAY: &str = "sessions_per_day";
}

/// Target column predicted by the model.
pub const TARGET_COLUMN: &str = columns::SESSIONS_PER_DAY;

/// Open Charge Map status id for a fully operational site.
pub const STATUS_OPERATIONAL_ID: i64 = 50;

/// Open Charge Map current type id for DC connections.
pub const CURRENT_TYPE_DC_ID: i64 = 30;

/// Power at or above which a station counts as a DC fast charger.
pub const DC_POWER_THRESHOLD_KW: f64 = 50.0;

/// One physical charging station, as written to the processed dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    /// Open Charge Map POI id
    pub station_id: i64,

    /// Site title
    pub title: Option<String>,

    /// ISO country code
    pub country: Option<String>,

    /// State or province
    pub region: Option<String>,

    /// Town name
    pub town: Option<String>,

    /// Settlement density bucket
    pub city_type: CityType,

    /// AC or DC
    pub charger_type: ChargerType,

    pub latitude: Option<f64>,

    pub longitude: Option<f64>,

    /// Number of connections at the site
    pub num_connectors: i64,

    /// Highest connection power in kW
    pub power_kw: f64,

    /// Open Charge Map usage type
    pub usage_type_id: Option<i64>,

    /// Raw Open Charge Map status id
    pub status_type_id: Option<i64>,

    /// Status category derived from `status_type_id`
    pub status: StationStatus,

    /// Synthetic utilization label
    pub sessions_per_day: f64,
}

/// Settlement density around a station.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CityType {
    Urban,
    Suburban,
    Rural,
}

impl CityType {
    /// Minimum stations in a town for it to count as urban.
    pub const URBAN_MIN_STATIONS: usize = 25;

    /// Minimum stations in a town for it to count as suburban.
    pub const SUBURBAN_MIN_STATIONS: usize = 5;

    /// Buckets a town by how many stations it has in the ingested batch.
    #[must_use]
    pub const fn from_station_density(stations_in_town: usize) -> Self {
        if stations_in_town >= Self::URBAN_MIN_STATIONS {
            Self::Urban
        } else if stations_in_town >= Self::SUBURBAN_MIN_STATIONS {
            Self::Suburban
        } else {
            Self::Rural
        }
    }
}

/// Current type offered by a station.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
pub enum ChargerType {
    AC,
    DC,
}

impl ChargerType {
    /// Classifies a station from its connection current types and peak power.
    #[must_use]
    pub fn classify(current_type_ids: &[i64], max_power_kw: f64) -> Self {
        if current_type_ids.contains(&CURRENT_TYPE_DC_ID) || max_power_kw >= DC_POWER_THRESHOLD_KW
        {
            Self::DC
        } else {
            Self::AC
        }
    }
}

/// Operational status category.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StationStatus {
    Operational,
    PartlyOperational,
    Planned,
    NotOperational,
    Unknown,
}

impl StationStatus {
    /// Maps an Open Charge Map `StatusTypeID`.
    #[must_use]
    pub const fn from_status_type_id(id: Option<i64>) -> Self {
        match id {
            Some(STATUS_OPERATIONAL_ID) => Self::Operational,
            Some(75) => Self::PartlyOperational,
            Some(150) => Self::Planned,
            Some(100 | 200 | 210) => Self::NotOperational,
            _ => Self::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use core::str::FromStr;

    use super::*;

    #[test]
    fn test_city_type_buckets() {
        assert_eq!(CityType::from_station_density(0), CityType::Rural);
        assert_eq!(CityType::from_station_density(4), CityType::Rural);
        assert_eq!(CityType::from_station_density(5), CityType::Suburban);
        assert_eq!(CityType::from_station_density(24), CityType::Suburban);
        assert_eq!(CityType::from_station_density(25), CityType::Urban);
    }

    #[test]
    fn test_charger_type_classification() {
        assert_eq!(ChargerType::classify(&[10, 20], 22.0), ChargerType::AC);
        assert_eq!(ChargerType::classify(&[10, 30], 22.0), ChargerType::DC);
        assert_eq!(ChargerType::classify(&[], 50.0), ChargerType::DC);
        assert_eq!(ChargerType::classify(&[], 0.0), ChargerType::AC);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            StationStatus::from_status_type_id(Some(50)),
            StationStatus::Operational
        );
        assert_eq!(
            StationStatus::from_status_type_id(Some(200)),
            StationStatus::NotOperational
        );
        assert_eq!(StationStatus::from_status_type_id(None), StationStatus::Unknown);
        assert_eq!(StationStatus::from_status_type_id(Some(0)), StationStatus::Unknown);
    }

    #[test]
    fn test_string_round_trip() {
        assert_eq!(CityType::Suburban.to_string(), "suburban");
        assert_eq!(CityType::from_str("urban").ok(), Some(CityType::Urban));
        assert_eq!(ChargerType::DC.to_string(), "DC");
        assert_eq!(StationStatus::PartlyOperational.to_string(), "partly_operational");
    }
}
