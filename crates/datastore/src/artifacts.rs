//! The trained model bundle: weights plus the JSON metadata sidecar.

use std::sync::Arc;

use bytes::Bytes;
use object_store::ObjectStore;
use station_structs::{ModelMetadata, PipelineError, PipelineResult};
use tracing::info;

use crate::path_utils::{read_optional, write_bytes};

pub const MODEL_PATH: &str = "models/model.bin";
pub const METADATA_PATH: &str = "models/metadata.json";

/// Raw bytes of a persisted bundle, before the model is rebuilt.
#[derive(Debug, Clone)]
pub struct ArtifactBundleBytes {
    pub model: Bytes,
    pub metadata: ModelMetadata,
}

#[derive(Clone)]
pub struct ArtifactStore {
    store: Arc<dyn ObjectStore>,
}

impl ArtifactStore {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Persists a bundle, overwriting the previous one.
    ///
    /// Metadata goes last: a bundle is only visible once its sidecar exists.
    ///
    /// # Errors
    ///
    /// Returns an error if either write fails.
    pub async fn save(&self, model: Bytes, metadata: &ModelMetadata) -> PipelineResult<()> {
        let metadata_json = serde_json::to_vec_pretty(metadata)
            .map_err(|e| PipelineError::storage("Failed to serialize model metadata", e))?;

        write_bytes(self.store.as_ref(), MODEL_PATH, model).await?;
        write_bytes(self.store.as_ref(), METADATA_PATH, Bytes::from(metadata_json)).await?;

        info!(
            model_path = MODEL_PATH,
            metadata_path = METADATA_PATH,
            "Model bundle saved"
        );

        Ok(())
    }

    /// Loads only the metadata sidecar.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ArtifactMissing`] if no bundle was saved.
    pub async fn load_metadata(&self) -> PipelineResult<ModelMetadata> {
        let data = read_optional(self.store.as_ref(), METADATA_PATH)
            .await?
            .ok_or_else(|| PipelineError::ArtifactMissing {
                path: METADATA_PATH.to_string(),
            })?;

        serde_json::from_slice(&data)
            .map_err(|e| PipelineError::storage("Failed to parse model metadata", e))
    }

    /// Loads the weights and the metadata sidecar.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ArtifactMissing`] if either file is absent.
    pub async fn load(&self) -> PipelineResult<ArtifactBundleBytes> {
        let model = read_optional(self.store.as_ref(), MODEL_PATH)
            .await?
            .ok_or_else(|| PipelineError::ArtifactMissing {
                path: MODEL_PATH.to_string(),
            })?;
        let metadata = self.load_metadata().await?;

        Ok(ArtifactBundleBytes { model, metadata })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use object_store::memory::InMemory;
    use station_structs::NetworkShape;

    use super::*;

    fn metadata() -> ModelMetadata {
        ModelMetadata {
            model_type: String::from("MlpEnsembleRegressor"),
            n_estimators: 3,
            mae: 0.8,
            feature_columns: vec![String::from("num_connectors"), String::from("power_kw")],
            training_timestamp: Utc::now(),
            categorical_levels: BTreeMap::new(),
            model_config: NetworkShape::default(),
        }
    }

    #[tokio::test]
    async fn test_load_before_save_is_missing() {
        let artifacts = ArtifactStore::new(Arc::new(InMemory::new()));

        let err = artifacts.load().await.expect_err("nothing saved");
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_weights_without_sidecar_are_missing() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        write_bytes(store.as_ref(), MODEL_PATH, Bytes::from_static(b"weights"))
            .await
            .expect("write");

        let err = ArtifactStore::new(store).load().await.expect_err("no sidecar");
        assert!(matches!(err, PipelineError::ArtifactMissing { path } if path == METADATA_PATH));
    }

    #[tokio::test]
    async fn test_bundle_round_trip() {
        let artifacts = ArtifactStore::new(Arc::new(InMemory::new()));
        let metadata = metadata();

        artifacts
            .save(Bytes::from_static(b"weights"), &metadata)
            .await
            .expect("save");

        let bundle = artifacts.load().await.expect("load");
        assert_eq!(bundle.model.as_ref(), b"weights");
        assert_eq!(bundle.metadata, metadata);
    }
}
