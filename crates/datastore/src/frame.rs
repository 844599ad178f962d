//! Parquet encoding and typed column access for polars frames.

use std::io::Cursor;

use bytes::Bytes;
use polars::prelude::*;
use station_structs::{PipelineError, PipelineResult};

/// Serializes a frame to parquet bytes.
///
/// # Errors
///
/// Returns an error if polars fails to encode the frame.
pub fn frame_to_parquet(df: &mut DataFrame) -> PipelineResult<Bytes> {
    let mut buffer = Vec::new();

    ParquetWriter::new(&mut buffer)
        .finish(df)
        .map_err(|e| PipelineError::storage("Failed to encode parquet", e))?;

    Ok(Bytes::from(buffer))
}

/// Decodes parquet bytes into a frame.
///
/// # Errors
///
/// Returns an error if the bytes are not a readable parquet file.
pub fn parquet_to_frame(data: Bytes) -> PipelineResult<DataFrame> {
    ParquetReader::new(Cursor::new(data))
        .finish()
        .map_err(|e| PipelineError::storage("Failed to decode parquet", e))
}

/// Returns true if the frame has a column called `name`.
#[must_use]
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

fn column_as(df: &DataFrame, name: &str, dtype: &DataType) -> PipelineResult<Series> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::Schema(format!("Column '{name}' not found in data.")))?;

    column
        .as_materialized_series()
        .cast(dtype)
        .map_err(|e| PipelineError::Schema(format!("Column '{name}' cannot be read as {dtype}: {e}")))
}

/// Reads a column as optional strings.
///
/// # Errors
///
/// Returns [`PipelineError::Schema`] if the column is missing or not castable.
pub fn str_values(df: &DataFrame, name: &str) -> PipelineResult<Vec<Option<String>>> {
    let series = column_as(df, name, &DataType::String)?;
    let values = series
        .str()
        .map_err(|e| PipelineError::Schema(format!("Column '{name}' is not text: {e}")))?;

    Ok(values.into_iter().map(|v| v.map(str::to_owned)).collect())
}

/// Reads a column as optional `f64`.
///
/// # Errors
///
/// Returns [`PipelineError::Schema`] if the column is missing or not numeric.
pub fn f64_values(df: &DataFrame, name: &str) -> PipelineResult<Vec<Option<f64>>> {
    let series = column_as(df, name, &DataType::Float64)?;
    let values = series
        .f64()
        .map_err(|e| PipelineError::Schema(format!("Column '{name}' is not numeric: {e}")))?;

    Ok(values.into_iter().collect())
}

/// Reads a column as optional `i64`.
///
/// # Errors
///
/// Returns [`PipelineError::Schema`] if the column is missing or not integral.
pub fn i64_values(df: &DataFrame, name: &str) -> PipelineResult<Vec<Option<i64>>> {
    let series = column_as(df, name, &DataType::Int64)?;
    let values = series
        .i64()
        .map_err(|e| PipelineError::Schema(format!("Column '{name}' is not an integer: {e}")))?;

    Ok(values.into_iter().collect())
}

/// Reads a column that must not contain nulls.
///
/// # Errors
///
/// Returns [`PipelineError::Schema`] if any row is null.
pub fn required<T>(name: &str, values: Vec<Option<T>>) -> PipelineResult<Vec<T>> {
    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.ok_or_else(|| PipelineError::Schema(format!("Column '{name}' is null at row {row}")))
        })
        .collect()
}
