//! One-hot expansion of station frames.

use std::collections::{BTreeMap, BTreeSet};

use datastore::frame::{f64_values, has_column, str_values};
use polars::prelude::*;
use station_structs::{PipelineError, PipelineResult, TARGET_COLUMN, columns};
use tracing::debug;

use crate::matrix::FeatureMatrix;

/// Columns never used as model inputs: identifiers, free text, coordinates,
/// and fields a prediction request cannot carry.
pub const NON_FEATURE_COLUMNS: &[&str] = &[
    columns::STATION_ID,
    columns::TITLE,
    columns::TOWN,
    columns::LATITUDE,
    columns::LONGITUDE,
    columns::COUNTRY,
    columns::USAGE_TYPE_ID,
    columns::STATUS_TYPE_ID,
    columns::STATUS,
];

/// Name of the indicator column for `value` of categorical `column`.
#[must_use]
pub fn indicator_name(column: &str, value: &str) -> String {
    format!("{column}_{value}")
}

enum ColumnKind {
    Numeric,
    Categorical,
}

fn column_kind(name: &str, dtype: &DataType) -> PipelineResult<ColumnKind> {
    match dtype {
        DataType::Boolean
        | DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64 => Ok(ColumnKind::Numeric),
        DataType::String | DataType::Null => Ok(ColumnKind::Categorical),
        other => Err(PipelineError::Schema(format!(
            "Column '{name}' has type {other}, which cannot be encoded"
        ))),
    }
}

/// Expands every feature column of `df` into numeric columns.
///
/// Numeric columns come first in frame order, then categorical indicators in
/// frame order. With `drop_first`, the lexicographically smallest level of
/// each categorical column is the reference and gets no indicator.
pub(crate) fn expand(df: &DataFrame, drop_first: bool) -> PipelineResult<FeatureMatrix> {
    let n_rows = df.height();
    let mut numeric: Vec<(String, Vec<f32>)> = Vec::new();
    let mut categorical: Vec<(String, Vec<Option<String>>)> = Vec::new();

    for column in df.get_columns() {
        let name = column.name().as_str();
        if name == TARGET_COLUMN || NON_FEATURE_COLUMNS.contains(&name) {
            continue;
        }

        match column_kind(name, column.dtype())? {
            ColumnKind::Numeric => {
                let values = f64_values(df, name)?
                    .into_iter()
                    .map(|v| v.unwrap_or(0.0) as f32)
                    .collect();
                numeric.push((name.to_string(), values));
            }
            ColumnKind::Categorical => categorical.push((name.to_string(), str_values(df, name)?)),
        }
    }

    let mut feature_columns: Vec<String> = Vec::new();
    let mut feature_values: Vec<Vec<f32>> = Vec::new();
    let mut levels_by_field = BTreeMap::new();

    for (name, values) in numeric {
        feature_columns.push(name);
        feature_values.push(values);
    }

    for (name, values) in categorical {
        let levels: Vec<String> = values
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let skip = usize::from(drop_first);
        for level in levels.iter().skip(skip) {
            feature_columns.push(indicator_name(&name, level));
            feature_values.push(
                values
                    .iter()
                    .map(|v| if v.as_ref() == Some(level) { 1.0 } else { 0.0 })
                    .collect(),
            );
        }

        levels_by_field.insert(name, levels);
    }

    let mut row_major = Vec::with_capacity(n_rows * feature_columns.len());
    for row in 0..n_rows {
        row_major.extend(feature_values.iter().map(|column| column[row]));
    }

    FeatureMatrix::new(feature_columns, row_major, n_rows, levels_by_field)
}

/// Splits a processed station frame into features and target.
///
/// # Errors
///
/// Returns [`PipelineError::Schema`] if the target column is absent or not
/// numeric, or a feature column cannot be encoded.
pub fn build_features(df: &DataFrame) -> PipelineResult<(FeatureMatrix, Vec<f32>)> {
    if !has_column(df, TARGET_COLUMN) {
        return Err(PipelineError::Schema(format!(
            "Target column '{TARGET_COLUMN}' not found in data."
        )));
    }

    let target_column = df
        .column(TARGET_COLUMN)
        .map_err(|e| PipelineError::Schema(e.to_string()))?;
    if !matches!(
        column_kind(TARGET_COLUMN, target_column.dtype()),
        Ok(ColumnKind::Numeric)
    ) {
        return Err(PipelineError::Schema(format!(
            "Target column '{TARGET_COLUMN}' must be numeric, found {}",
            target_column.dtype()
        )));
    }

    let target = f64_values(df, TARGET_COLUMN)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.map(|v| v as f32).ok_or_else(|| {
                PipelineError::Schema(format!("Target column '{TARGET_COLUMN}' is null at row {row}"))
            })
        })
        .collect::<PipelineResult<Vec<_>>>()?;

    let matrix = expand(df, true)?;

    debug!(
        rows = matrix.n_rows(),
        columns = ?matrix.columns(),
        "Built feature matrix"
    );

    Ok((matrix, target))
}
