use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hidden layer sizes of each ensemble member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkShape {
    pub hidden_size_1: usize,
    pub hidden_size_2: usize,
}

impl Default for NetworkShape {
    fn default() -> Self {
        Self {
            hidden_size_1: 64,
            hidden_size_2: 32,
        }
    }
}

/// JSON sidecar persisted next to the trained model.
///
/// `feature_columns` is the authoritative feature schema: every request row
/// is reconciled to exactly these columns, in this order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_type: String,
    pub n_estimators: usize,
    /// Mean absolute error on the held-out split
    pub mae: f64,
    pub feature_columns: Vec<String>,
    pub training_timestamp: DateTime<Utc>,
    /// Sorted levels seen per categorical field; the first one is the reference
    #[serde(default)]
    pub categorical_levels: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub model_config: NetworkShape,
}

impl ModelMetadata {
    /// Read-only projection exposed by the metadata endpoint.
    #[must_use]
    pub fn summary(&self) -> MetadataSummary {
        MetadataSummary {
            model_type: self.model_type.clone(),
            mae: self.mae,
            training_timestamp: self.training_timestamp,
        }
    }
}

/// Public view of a trained bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataSummary {
    pub model_type: String,
    pub mae: f64,
    pub training_timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_without_supplements_still_parses() {
        let json = r#"{
            "model_type": "MlpEnsembleRegressor",
            "n_estimators": 200,
            "mae": 1.25,
            "feature_columns": ["num_connectors", "power_kw"],
            "training_timestamp": "2026-01-02T03:04:05Z"
        }"#;

        let metadata: ModelMetadata = serde_json::from_str(json).expect("should parse");
        assert_eq!(metadata.n_estimators, 200);
        assert!(metadata.categorical_levels.is_empty());
        assert_eq!(metadata.model_config, NetworkShape::default());

        let summary = metadata.summary();
        assert_eq!(summary.model_type, "MlpEnsembleRegressor");
        assert!((summary.mae - 1.25).abs() < f64::EPSILON);
    }
}
