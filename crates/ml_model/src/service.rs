//! Loaded model bundle serving single-station predictions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use burn::backend::ndarray::NdArrayDevice;
use datastore::ArtifactStore;
use feature_builder::{ReconciledRow, prepare_row};
use object_store::ObjectStore;
use station_structs::{ModelMetadata, PipelineError, PipelineResult, StationFeatures};
use tracing::{info, warn};

use crate::InferenceBackend;
use crate::artifact::decode_model;
use crate::model::StationRegressor;

/// A trained model plus its recorded feature schema.
///
/// The network is never mutated after load. burn modules are not `Sync`, so
/// the mutex only guards taking a handle; clones share their weight buffers
/// and inference runs outside the lock.
pub struct ModelService {
    model: Mutex<StationRegressor<InferenceBackend>>,
    metadata: ModelMetadata,
    device: NdArrayDevice,
    unseen_category_requests: AtomicU64,
}

impl ModelService {
    /// Loads the persisted bundle.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ArtifactMissing`] if the model or its
    /// metadata has not been saved, or [`PipelineError::Model`] if the
    /// weights do not match the metadata.
    pub async fn load(store: Arc<dyn ObjectStore>) -> PipelineResult<Self> {
        let bundle = ArtifactStore::new(store).load().await?;
        let device = NdArrayDevice::default();
        let model = decode_model(&bundle.model, &bundle.metadata, &device)?;

        info!(
            model_type = %bundle.metadata.model_type,
            features = bundle.metadata.feature_columns.len(),
            mae = bundle.metadata.mae,
            "Model loaded"
        );

        Ok(Self::from_parts(model, bundle.metadata))
    }

    /// Wraps an in-memory model.
    #[must_use]
    pub fn from_parts(model: StationRegressor<InferenceBackend>, metadata: ModelMetadata) -> Self {
        Self {
            model: Mutex::new(model),
            metadata,
            device: NdArrayDevice::default(),
            unseen_category_requests: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Number of requests so far that carried a category unseen in training.
    #[must_use]
    pub fn unseen_category_requests(&self) -> u64 {
        self.unseen_category_requests.load(Ordering::Relaxed)
    }

    /// Builds the exact model input for a request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be encoded.
    pub fn prepare_features(&self, features: &StationFeatures) -> PipelineResult<ReconciledRow> {
        prepare_row(features, &self.metadata)
    }

    /// Predicts daily sessions for one station profile.
    ///
    /// Unseen categorical values contribute nothing; they are counted and
    /// logged.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Schema`] for an invalid request, or a model
    /// error if inference fails.
    pub fn predict(&self, features: &StationFeatures) -> PipelineResult<f64> {
        features.validate()?;

        let row = self.prepare_features(features)?;
        if !row.unseen.is_empty() {
            self.unseen_category_requests.fetch_add(1, Ordering::Relaxed);
            warn!(unseen = ?row.unseen, "Request carries categories unseen in training");
        }

        let model = self
            .model
            .lock()
            .map_err(|_| PipelineError::Model(String::from("Model lock poisoned")))?
            .clone();

        let predictions = model.predict_rows(&row.values, row.columns.len(), &self.device)?;

        predictions
            .first()
            .map(|&p| f64::from(p))
            .ok_or_else(|| PipelineError::Model(String::from("Model returned no prediction")))
    }
}

#[cfg(test)]
mod tests {
    use datastore::StationDataset;
    use object_store::memory::InMemory;
    use station_structs::{ChargerType, CityType, StationRecord, StationStatus};

    use super::*;
    use crate::artifact::encode_model;
    use crate::training::{TrainingConfig, train};

    const REGIONS: [&str; 4] = ["Bayern", "Berlin", "Hamburg", "Hessen"];

    fn synthetic_records(n: usize) -> Vec<StationRecord> {
        (0..n)
            .map(|i| {
                let city_type = match i % 3 {
                    0 => CityType::Urban,
                    1 => CityType::Suburban,
                    _ => CityType::Rural,
                };
                let charger_type = if i % 2 == 0 { ChargerType::DC } else { ChargerType::AC };
                let power_kw = if charger_type == ChargerType::DC { 150.0 } else { 22.0 };
                let num_connectors = (i % 4 + 1) as i64;

                StationRecord {
                    station_id: i as i64,
                    title: None,
                    country: Some(String::from("DE")),
                    region: Some(REGIONS[i % REGIONS.len()].to_string()),
                    town: None,
                    city_type,
                    charger_type,
                    latitude: None,
                    longitude: None,
                    num_connectors,
                    power_kw,
                    usage_type_id: Some(1),
                    status_type_id: Some(50),
                    status: StationStatus::Operational,
                    sessions_per_day: (power_kw / 10.0 + num_connectors as f64 * 0.8) * 1.2,
                }
            })
            .collect()
    }

    fn quick_config() -> TrainingConfig {
        TrainingConfig {
            n_estimators: 2,
            epochs: 20,
            batch_size: 16,
            ..TrainingConfig::default()
        }
    }

    fn berlin() -> StationFeatures {
        StationFeatures {
            region: String::from("Berlin"),
            city_type: String::from("urban"),
            charger_type: String::from("DC"),
            power_kw: 150.0,
            num_connectors: 4,
        }
    }

    async fn trained_store() -> (Arc<dyn ObjectStore>, ModelMetadata) {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        StationDataset::new(Arc::clone(&store))
            .write_records(&synthetic_records(100))
            .await
            .expect("write dataset");

        let metadata = train(Arc::clone(&store), &quick_config())
            .await
            .expect("train");
        (store, metadata)
    }

    #[tokio::test]
    async fn test_load_before_training_is_artifact_missing() {
        let result = ModelService::load(Arc::new(InMemory::new())).await;
        assert!(matches!(result, Err(PipelineError::ArtifactMissing { .. })));
    }

    #[tokio::test]
    async fn test_weights_not_matching_metadata_fail_to_load() {
        let (store, metadata) = trained_store().await;

        let device = NdArrayDevice::default();
        let stale: StationRegressor<InferenceBackend> = StationRegressor::new(
            &device,
            metadata.feature_columns.len() + 2,
            metadata.n_estimators,
            &metadata.model_config,
        );
        ArtifactStore::new(Arc::clone(&store))
            .save(encode_model(stale).expect("encode"), &metadata)
            .await
            .expect("save");

        let result = ModelService::load(store).await;
        assert!(matches!(result, Err(PipelineError::Model(_))));
    }

    #[tokio::test]
    async fn test_concurrent_predictions_agree() {
        let (store, _) = trained_store().await;
        let service = ModelService::load(store).await.expect("load");

        let expected = service.predict(&berlin()).expect("predict");
        let results: Vec<f64> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| service.predict(&berlin()).expect("predict")))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("thread"))
                .collect()
        });

        assert!(results.iter().all(|p| (p - expected).abs() < 1e-9));
    }

    #[tokio::test]
    async fn test_train_then_serve() {
        let (store, metadata) = trained_store().await;

        assert!(metadata.mae.is_finite() && metadata.mae >= 0.0);
        // power_kw, num_connectors, 3 regions, 2 city types, 1 charger type
        assert_eq!(metadata.feature_columns.len(), 8);

        let service = ModelService::load(store).await.expect("load");
        assert_eq!(service.metadata(), &metadata);

        let row = service.prepare_features(&berlin()).expect("row");
        assert_eq!(row.columns, metadata.feature_columns);

        let prediction = service.predict(&berlin()).expect("predict");
        assert!(prediction.is_finite());
        assert!(prediction >= 0.0);
        assert_eq!(service.unseen_category_requests(), 0);
    }

    #[tokio::test]
    async fn test_unseen_category_is_counted_not_fatal() {
        let (store, _) = trained_store().await;
        let service = ModelService::load(store).await.expect("load");

        let request = StationFeatures {
            region: String::from("Atlantis"),
            ..berlin()
        };
        let prediction = service.predict(&request).expect("predict");

        assert!(prediction >= 0.0);
        assert_eq!(service.unseen_category_requests(), 1);
    }

    #[tokio::test]
    async fn test_invalid_request_is_schema_error() {
        let (store, _) = trained_store().await;
        let service = ModelService::load(store).await.expect("load");

        let request = StationFeatures {
            num_connectors: 0,
            ..berlin()
        };
        assert!(matches!(
            service.predict(&request),
            Err(PipelineError::Schema(_))
        ));
    }
}
