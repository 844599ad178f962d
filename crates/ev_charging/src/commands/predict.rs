//! Predict command - one-off prediction, logged like a served one.

use std::sync::Arc;

use anyhow::Result;
use ml_model::ModelService;
use object_store::ObjectStore;
use station_structs::StationFeatures;
use tracing::info;

use crate::prediction_logger::PredictionLogWriter;

/// Runs the predict command.
///
/// # Errors
///
/// Returns an error if no model is trained or the request is invalid.
pub async fn run(store: Arc<dyn ObjectStore>, features: StationFeatures) -> Result<()> {
    let service = ModelService::load(Arc::clone(&store)).await?;
    let prediction = service.predict(&features)?;

    info!(
        region = %features.region,
        city_type = %features.city_type,
        charger_type = %features.charger_type,
        power_kw = features.power_kw,
        num_connectors = features.num_connectors,
        predicted_sessions_per_day = prediction,
        "Prediction"
    );

    let writer = PredictionLogWriter::spawn(store);
    writer.record(features, prediction);
    writer.shutdown().await;

    Ok(())
}
