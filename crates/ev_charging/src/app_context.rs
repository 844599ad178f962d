//! Shared state of the prediction API.

use std::sync::Arc;

use ml_model::ModelService;
use object_store::ObjectStore;
use tracing::{error, warn};

use crate::prediction_logger::PredictionLogWriter;

/// Whether a model could be loaded at startup.
pub enum ModelReadiness {
    Ready(Arc<ModelService>),
    /// No usable bundle; the reason is reported to clients.
    Unavailable(String),
}

/// State handed to every request handler.
pub struct AppContext {
    pub model: ModelReadiness,
    pub log_writer: PredictionLogWriter,
}

impl AppContext {
    /// Loads the model bundle and starts the prediction log writer.
    ///
    /// A missing or unreadable bundle does not stop the service; it starts
    /// in the unavailable state instead.
    pub async fn initialize(store: Arc<dyn ObjectStore>) -> Self {
        let model = match ModelService::load(Arc::clone(&store)).await {
            Ok(service) => ModelReadiness::Ready(Arc::new(service)),
            Err(e) if e.is_unavailable() => {
                warn!(error = %e, "Serving without a model");
                ModelReadiness::Unavailable(e.to_string())
            }
            Err(e) => {
                error!(error = %e, "Failed to load model");
                ModelReadiness::Unavailable(e.to_string())
            }
        };

        Self {
            model,
            log_writer: PredictionLogWriter::spawn(store),
        }
    }

    #[must_use]
    pub fn model_service(&self) -> Option<&Arc<ModelService>> {
        match &self.model {
            ModelReadiness::Ready(service) => Some(service),
            ModelReadiness::Unavailable(_) => None,
        }
    }

    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.model, ModelReadiness::Ready(_))
    }
}
