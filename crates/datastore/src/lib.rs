//! Persistence for the charging-station pipeline.
//!
//! Everything is addressed by well-known paths inside one `object_store`
//! root: the raw API cache, the processed station dataset, the trained model
//! bundle and the prediction log.

mod artifacts;
pub mod frame;
mod path_utils;
mod prediction_log;
mod raw_cache;
mod stations;

pub use artifacts::{ArtifactBundleBytes, ArtifactStore, METADATA_PATH, MODEL_PATH};
pub use path_utils::{object_exists, read_optional, write_bytes};
pub use prediction_log::{PREDICTION_LOG_PATH, PredictionLogStore};
pub use raw_cache::RawResponseCache;
pub use stations::{PROCESSED_DATASET_PATH, StationDataset, frame_to_records, records_to_frame};
