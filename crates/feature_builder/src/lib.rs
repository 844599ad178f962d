//! Feature engineering shared by training and serving.
//!
//! Training expands the processed station dataset into a numeric matrix;
//! serving expands a single request with the same rule and reconciles it
//! against the column list recorded at training time.

mod encode;
mod matrix;
mod request;
mod split;

pub use encode::{NON_FEATURE_COLUMNS, build_features, indicator_name};
pub use matrix::FeatureMatrix;
pub use request::{ReconciledRow, encode_request, prepare_row, reconcile, request_frame};
pub use split::{DEFAULT_SEED, DEFAULT_TEST_SIZE, TrainTestSplit, get_train_test, load_processed, split_train_test};
