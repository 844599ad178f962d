//! Training logic for the station regressor ensemble.

use std::sync::Arc;

use burn::data::dataset::Dataset as _;
use burn::module::AutodiffModule as _;
use burn::nn::loss::{MseLoss, Reduction};
use burn::optim::{AdamConfig, GradientsParams, Optimizer as _};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use chrono::Utc;
use feature_builder::{DEFAULT_SEED, DEFAULT_TEST_SIZE, FeatureMatrix, TrainTestSplit, get_train_test};
use object_store::ObjectStore;
use rand::seq::SliceRandom as _;
use rand::{Rng as _, SeedableRng as _};
use rand_chacha::ChaCha8Rng;
use station_structs::{ModelMetadata, NetworkShape, PipelineError, PipelineResult};
use tracing::{debug, info};

use crate::artifact::save_bundle;
use crate::dataset::{FeatureDataset, StationBatcher};
use crate::model::{RegressorHead, StationRegressor};
use crate::{InferenceBackend, MODEL_TYPE, TrainingBackend};

/// Configuration for training the ensemble.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Number of bagged ensemble members.
    pub n_estimators: usize,
    /// Training epochs per member.
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Share of rows held out for evaluation.
    pub test_size: f64,
    /// Seed for the split, bootstrap samples and batch order.
    pub seed: u64,
    /// Hidden layer sizes of each member.
    pub model: NetworkShape,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 5,
            epochs: 150,
            batch_size: 32,
            learning_rate: 5e-3,
            test_size: DEFAULT_TEST_SIZE,
            seed: DEFAULT_SEED,
            model: NetworkShape::default(),
        }
    }
}

impl TrainingConfig {
    fn validate(&self) -> PipelineResult<()> {
        if self.n_estimators == 0 {
            return Err(PipelineError::Model(String::from("n_estimators must be at least 1")));
        }
        if self.epochs == 0 || self.batch_size == 0 {
            return Err(PipelineError::Model(String::from(
                "epochs and batch_size must be at least 1",
            )));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(PipelineError::Model(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// A trained model and the metadata describing it.
#[derive(Debug)]
pub struct TrainedBundle {
    pub model: StationRegressor<InferenceBackend>,
    pub metadata: ModelMetadata,
}

/// Per-column mean and scale of the training rows.
///
/// Constant columns get a scale of 1 so they standardize to zero.
fn column_stats(x: &FeatureMatrix) -> (Vec<f32>, Vec<f32>) {
    let n_cols = x.n_cols();
    let n_rows = x.n_rows().max(1) as f64;
    let mut sum = vec![0.0_f64; n_cols];
    let mut sum_sq = vec![0.0_f64; n_cols];

    for row in (0..x.n_rows()).filter_map(|i| x.row(i)) {
        for (j, &v) in row.iter().enumerate() {
            sum[j] += f64::from(v);
            sum_sq[j] += f64::from(v) * f64::from(v);
        }
    }

    let mean: Vec<f64> = sum.iter().map(|s| s / n_rows).collect();
    let scale = sum_sq
        .iter()
        .zip(&mean)
        .map(|(sq, m)| {
            let std = (sq / n_rows - m * m).max(0.0).sqrt();
            if std > 1e-8 { std as f32 } else { 1.0 }
        })
        .collect();

    (mean.into_iter().map(|m| m as f32).collect(), scale)
}

fn standardize(values: &[f32], mean: &[f32], scale: &[f32]) -> Vec<f32> {
    values
        .chunks_exact(mean.len().max(1))
        .flat_map(|row| {
            row.iter()
                .zip(mean.iter().zip(scale))
                .map(|(v, (m, s))| (v - m) / s)
        })
        .collect()
}

/// Trains one member on a bootstrap sample of the standardized rows.
fn train_member<B: AutodiffBackend>(
    device: &B::Device,
    dataset: &FeatureDataset,
    n_features: usize,
    config: &TrainingConfig,
    rng: &mut ChaCha8Rng,
) -> PipelineResult<(RegressorHead<B::InnerBackend>, f32)> {
    let n = dataset.len();
    let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

    let mut model = RegressorHead::<B>::new(device, n_features, &config.model);
    let mut optimizer = AdamConfig::new().init();
    let batcher = StationBatcher::<B>::new(device.clone(), n_features);
    let loss_fn = MseLoss::new();
    let mut final_loss = 0.0;

    for epoch in 0..config.epochs {
        let mut order = bootstrap.clone();
        order.shuffle(rng);

        let mut epoch_loss = 0.0;
        let mut batch_count = 0;

        for batch_indices in order.chunks(config.batch_size) {
            let items: Vec<_> = batch_indices
                .iter()
                .filter_map(|&i| dataset.get(i))
                .collect();

            if items.is_empty() {
                continue;
            }

            let batch = batcher.batch(items);

            let predictions = model.forward(batch.inputs);
            let loss = loss_fn.forward(predictions, batch.targets, Reduction::Mean);

            let loss_value: f32 = loss
                .clone()
                .into_data()
                .to_vec()
                .map_err(|e| PipelineError::Model(format!("Failed to read loss: {e:?}")))?
                .first()
                .copied()
                .unwrap_or(0.0);

            if !loss_value.is_finite() {
                return Err(PipelineError::Model(format!(
                    "Training diverged at epoch {epoch} (loss = {loss_value})"
                )));
            }

            epoch_loss += f64::from(loss_value);
            batch_count += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);

            model = optimizer.step(config.learning_rate, model, grads);
        }

        final_loss = if batch_count > 0 {
            (epoch_loss / f64::from(batch_count)) as f32
        } else {
            0.0
        };

        if epoch % 25 == 0 || epoch + 1 == config.epochs {
            debug!(epoch = epoch + 1, train_loss = final_loss, "Epoch complete");
        }
    }

    Ok((model.valid(), final_loss))
}

/// Mean absolute error of `model` on the given rows.
///
/// # Errors
///
/// Returns [`PipelineError::Model`] if inference fails.
pub fn mean_absolute_error(
    model: &StationRegressor<InferenceBackend>,
    x: &FeatureMatrix,
    y: &[f32],
) -> PipelineResult<f64> {
    if y.is_empty() {
        return Err(PipelineError::Model(String::from("No rows to evaluate")));
    }

    let device = Default::default();
    let predictions = model.predict_rows(x.values(), x.n_cols(), &device)?;

    let total: f64 = predictions
        .iter()
        .zip(y)
        .map(|(p, t)| f64::from((p - t).abs()))
        .sum();

    Ok(total / y.len() as f64)
}

/// Fits the ensemble on the training rows and evaluates it on the held-out
/// rows.
///
/// # Errors
///
/// Returns an error if the configuration or the split is unusable, or
/// training diverges.
pub fn train_bundle(split: &TrainTestSplit, config: &TrainingConfig) -> PipelineResult<TrainedBundle> {
    config.validate()?;

    let x_train = &split.x_train;
    let n_features = x_train.n_cols();
    if n_features == 0 || x_train.n_rows() == 0 {
        return Err(PipelineError::Model(format!(
            "Cannot train on {} rows x {n_features} features",
            x_train.n_rows()
        )));
    }

    let device = Default::default();
    let (mean, scale) = column_stats(x_train);
    let standardized = standardize(x_train.values(), &mean, &scale);
    let dataset = FeatureDataset::from_rows(&standardized, &split.y_train, n_features);

    info!(
        rows = x_train.n_rows(),
        features = n_features,
        n_estimators = config.n_estimators,
        epochs = config.epochs,
        "Training ensemble"
    );

    let mut members = Vec::with_capacity(config.n_estimators);
    for index in 0..config.n_estimators {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(index as u64));
        let (member, final_loss) =
            train_member::<TrainingBackend>(&device, &dataset, n_features, config, &mut rng)?;

        info!(
            member = index + 1,
            of = config.n_estimators,
            final_loss,
            "Ensemble member trained"
        );
        members.push(member);
    }

    let model = StationRegressor::from_parts(&mean, &scale, members, &device);
    let mae = mean_absolute_error(&model, &split.x_test, &split.y_test)?;

    info!(mae, test_rows = split.x_test.n_rows(), "Held-out evaluation");

    let metadata = ModelMetadata {
        model_type: String::from(MODEL_TYPE),
        n_estimators: config.n_estimators,
        mae,
        feature_columns: x_train.columns().to_vec(),
        training_timestamp: Utc::now(),
        categorical_levels: x_train.categorical_levels().clone(),
        model_config: config.model,
    };

    Ok(TrainedBundle { model, metadata })
}

/// Runs the whole training pipeline: load, split, fit, evaluate, persist.
///
/// # Errors
///
/// Returns [`PipelineError::DataNotFound`] if ingestion has not run, or any
/// training or storage error.
pub async fn train(store: Arc<dyn ObjectStore>, config: &TrainingConfig) -> PipelineResult<ModelMetadata> {
    let split = get_train_test(Arc::clone(&store), config.test_size, config.seed).await?;
    let bundle = train_bundle(&split, config)?;

    save_bundle(store, &bundle).await?;

    info!(
        mae = bundle.metadata.mae,
        features = bundle.metadata.feature_columns.len(),
        "Model trained and saved"
    );

    Ok(bundle.metadata)
}
