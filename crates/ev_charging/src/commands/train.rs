//! Train command - fits the ensemble on the processed dataset.

use std::sync::Arc;

use anyhow::Result;
use ml_model::{TrainingConfig, train};
use object_store::ObjectStore;
use tracing::info;

/// Runs the train command.
///
/// # Errors
///
/// Returns an error if no dataset exists or training fails.
pub async fn run(store: Arc<dyn ObjectStore>, config: &TrainingConfig) -> Result<()> {
    info!(
        n_estimators = config.n_estimators,
        epochs = config.epochs,
        batch_size = config.batch_size,
        learning_rate = config.learning_rate,
        "Starting training"
    );

    let metadata = train(store, config).await?;

    info!(
        model_type = %metadata.model_type,
        mae = metadata.mae,
        features = metadata.feature_columns.len(),
        trained_at = %metadata.training_timestamp,
        "Training complete"
    );

    Ok(())
}
