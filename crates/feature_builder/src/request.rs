//! Request-time feature rows.

use std::collections::BTreeMap;

use polars::prelude::*;
use station_structs::{ModelMetadata, PipelineError, PipelineResult, StationFeatures, columns};

use crate::encode::expand;
use crate::matrix::FeatureMatrix;

/// A request row shaped exactly like the training matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledRow {
    /// Equal to the recorded feature columns, in order
    pub columns: Vec<String>,
    pub values: Vec<f32>,
    /// Columns the request produced that the model does not know
    pub dropped: Vec<String>,
    /// `field=value` for categorical values never seen in training
    pub unseen: Vec<String>,
}

/// Builds a one-row frame from a request, with dataset column names.
///
/// # Errors
///
/// Returns an error if polars rejects the columns.
pub fn request_frame(features: &StationFeatures) -> PipelineResult<DataFrame> {
    DataFrame::new(vec![
        Column::new(columns::REGION.into(), [features.region.as_str()]),
        Column::new(columns::CITY_TYPE.into(), [features.city_type.as_str()]),
        Column::new(columns::CHARGER_TYPE.into(), [features.charger_type.as_str()]),
        Column::new(columns::POWER_KW.into(), [features.power_kw]),
        Column::new(columns::NUM_CONNECTORS.into(), [features.num_connectors]),
    ])
    .map_err(|e| PipelineError::Schema(format!("Invalid request: {e}")))
}

/// Expands a request with the training rule.
///
/// No level is dropped: a single row has no reference category of its own,
/// so every categorical value emits its indicator and [`reconcile`] discards
/// those the model does not know.
///
/// # Errors
///
/// Returns an error if the request cannot be framed or encoded.
pub fn encode_request(features: &StationFeatures) -> PipelineResult<FeatureMatrix> {
    expand(&request_frame(features)?, false)
}

/// Reshapes an encoded request to `feature_columns`.
///
/// Missing columns are zero-filled, unknown ones dropped. A categorical value
/// absent from `categorical_levels` is reported as unseen; the reference
/// level is known and not reported.
///
/// # Errors
///
/// Returns [`PipelineError::Schema`] if `encoded` is not exactly one row.
pub fn reconcile(
    encoded: &FeatureMatrix,
    feature_columns: &[String],
    categorical_levels: &BTreeMap<String, Vec<String>>,
) -> PipelineResult<ReconciledRow> {
    let row = match (encoded.n_rows(), encoded.row(0)) {
        (1, Some(row)) => row,
        (n, _) => {
            return Err(PipelineError::Schema(format!(
                "Expected a single request row, got {n}"
            )));
        }
    };

    let values = feature_columns
        .iter()
        .map(|column| encoded.column_index(column).map_or(0.0, |i| row[i]))
        .collect();

    let dropped = encoded
        .columns()
        .iter()
        .filter(|c| !feature_columns.contains(c))
        .cloned()
        .collect();

    let unseen = encoded
        .categorical_levels()
        .iter()
        .filter_map(|(field, values)| {
            let known = categorical_levels.get(field)?;
            let unknown: Vec<String> = values
                .iter()
                .filter(|v| !known.contains(v))
                .map(|v| format!("{field}={v}"))
                .collect();
            Some(unknown)
        })
        .flatten()
        .collect();

    Ok(ReconciledRow {
        columns: feature_columns.to_vec(),
        values,
        dropped,
        unseen,
    })
}

/// Builds the model input for a request against a trained bundle.
///
/// # Errors
///
/// Returns an error if the request cannot be encoded.
pub fn prepare_row(
    features: &StationFeatures,
    metadata: &ModelMetadata,
) -> PipelineResult<ReconciledRow> {
    let encoded = encode_request(features)?;
    reconcile(
        &encoded,
        &metadata.feature_columns,
        &metadata.categorical_levels,
    )
}
