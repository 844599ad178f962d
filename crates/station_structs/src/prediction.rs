use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{PipelineError, PipelineResult};

/// Station profile sent to the prediction endpoint.
///
/// Categorical fields are free text: a value never seen during training is
/// accepted and contributes no signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationFeatures {
    /// State or province, e.g. "Berlin"
    pub region: String,

    /// "urban", "suburban" or "rural"
    pub city_type: String,

    /// "AC" or "DC"
    pub charger_type: String,

    /// Peak power in kW, at least 1
    #[serde(rename = "power_kW")]
    pub power_kw: f64,

    /// Number of connectors, at least 1
    pub num_connectors: i64,
}

impl StationFeatures {
    /// Checks the numeric bounds of the request.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Schema`] when a bound is violated.
    pub fn validate(&self) -> PipelineResult<()> {
        if !self.power_kw.is_finite() || self.power_kw < 1.0 {
            return Err(PipelineError::Schema(format!(
                "power_kW must be a number >= 1, got {}",
                self.power_kw
            )));
        }

        if self.num_connectors < 1 {
            return Err(PipelineError::Schema(format!(
                "num_connectors must be >= 1, got {}",
                self.num_connectors
            )));
        }

        Ok(())
    }
}

/// Response body of the prediction endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predicted_sessions_per_day: f64,
}

/// Column names of the prediction log.
pub mod log_columns {
    pub const TIMESTAMP_UTC: &str = "timestamp_utc";
    pub const PREDICTION: &str = "prediction";
    pub const REQUEST_ID: &str = "request_id";
    pub const REGION: &str = "region";
    pub const CITY_TYPE: &str = "city_type";
    pub const CHARGER_TYPE: &str = "charger_type";
    pub const POWER_KW: &str = "power_kW";
    pub const NUM_CONNECTORS: &str = "num_connectors";
}

/// One served prediction, with the request that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionLogEntry {
    pub timestamp_utc: DateTime<Utc>,
    pub prediction: f64,
    pub request_id: Uuid,
    #[serde(flatten)]
    pub request: StationFeatures,
}

impl PredictionLogEntry {
    /// Creates an entry stamped with the current time and a fresh request id.
    #[must_use]
    pub fn new(request: StationFeatures, prediction: f64) -> Self {
        Self {
            timestamp_utc: Utc::now(),
            prediction,
            request_id: Uuid::new_v4(),
            request,
        }
    }
}
