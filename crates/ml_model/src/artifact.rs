//! Model serialization and the persisted bundle.

use std::sync::Arc;

use burn::prelude::*;
use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder as _};
use bytes::Bytes;
use datastore::ArtifactStore;
use object_store::ObjectStore;
use station_structs::{ModelMetadata, PipelineError, PipelineResult};

use crate::model::{StationRegressor, StationRegressorRecord};
use crate::training::TrainedBundle;

type ModelRecorder = BinBytesRecorder<FullPrecisionSettings>;

/// Serializes the model weights.
///
/// # Errors
///
/// Returns [`PipelineError::Model`] if the record cannot be encoded.
pub fn encode_model<B: Backend>(model: StationRegressor<B>) -> PipelineResult<Bytes> {
    ModelRecorder::default()
        .record(model.into_record(), ())
        .map(Bytes::from)
        .map_err(|e| PipelineError::Model(format!("Failed to encode model: {e}")))
}

/// Rebuilds a model from its weights and the metadata describing its shape.
///
/// # Errors
///
/// Returns [`PipelineError::Model`] if the weights cannot be decoded or do
/// not match the shape the metadata describes.
pub fn decode_model<B: Backend>(
    data: &Bytes,
    metadata: &ModelMetadata,
    device: &B::Device,
) -> PipelineResult<StationRegressor<B>> {
    let skeleton = StationRegressor::new(
        device,
        metadata.feature_columns.len(),
        metadata.n_estimators,
        &metadata.model_config,
    );

    let record: StationRegressorRecord<B> = ModelRecorder::default()
        .load(data.to_vec(), device)
        .map_err(|e| PipelineError::Model(format!("Failed to decode model: {e}")))?;

    // burn asserts on a member count mismatch while loading
    if record.members.len() != metadata.n_estimators {
        return Err(PipelineError::Model(format!(
            "Weights hold {} members, metadata expects {}",
            record.members.len(),
            metadata.n_estimators
        )));
    }

    let model = skeleton.load_record(record);
    model.ensure_shape(
        metadata.feature_columns.len(),
        metadata.n_estimators,
        &metadata.model_config,
    )?;

    Ok(model)
}

/// Persists a trained bundle, model first and metadata last.
///
/// # Errors
///
/// Returns an error if encoding or either write fails.
pub async fn save_bundle(store: Arc<dyn ObjectStore>, bundle: &TrainedBundle) -> PipelineResult<()> {
    let model = encode_model(bundle.model.clone())?;
    ArtifactStore::new(store).save(model, &bundle.metadata).await
}
