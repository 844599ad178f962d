//! ML model crate for charging-session prediction.
//!
//! This crate uses the Burn deep learning framework to define, train,
//! persist and serve a bagged ensemble of small regressors that predicts
//! daily charging sessions from a station profile.

use burn::backend::{Autodiff, NdArray};

mod artifact;
mod dataset;
mod model;
mod service;
mod training;

pub use artifact::{decode_model, encode_model, save_bundle};
pub use dataset::{FeatureDataset, StationBatch, StationBatcher, StationItem};
pub use model::{RegressorHead, StationRegressor};
pub use service::ModelService;
pub use training::{TrainedBundle, TrainingConfig, mean_absolute_error, train, train_bundle};

/// Value of `model_type` in the metadata sidecar.
pub const MODEL_TYPE: &str = "MlpEnsembleRegressor";

/// Backend used for inference and persisted weights.
pub type InferenceBackend = NdArray;

/// Backend used to fit ensemble members.
pub type TrainingBackend = Autodiff<NdArray>;
