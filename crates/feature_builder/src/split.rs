//! Loading the processed dataset and the seeded train/test split.

use std::sync::Arc;

use datastore::StationDataset;
use object_store::ObjectStore;
use polars::prelude::DataFrame;
use rand::SeedableRng as _;
use rand::seq::SliceRandom as _;
use rand_chacha::ChaCha8Rng;
use station_structs::{PipelineError, PipelineResult};
use tracing::info;

use crate::encode::build_features;
use crate::matrix::FeatureMatrix;

pub const DEFAULT_TEST_SIZE: f64 = 0.2;
pub const DEFAULT_SEED: u64 = 42;

/// Features and target split into training and held-out rows.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: FeatureMatrix,
    pub x_test: FeatureMatrix,
    pub y_train: Vec<f32>,
    pub y_test: Vec<f32>,
}

/// Loads the processed station dataset.
///
/// # Errors
///
/// Returns [`PipelineError::DataNotFound`] if ingestion has not run yet.
pub async fn load_processed(store: Arc<dyn ObjectStore>) -> PipelineResult<DataFrame> {
    StationDataset::new(store).read_frame().await
}

/// Shuffles rows with a seeded RNG and holds out `ceil(n * test_size)` of
/// them.
///
/// # Errors
///
/// Returns [`PipelineError::Schema`] if `test_size` is not in `(0, 1)`, the
/// target length does not match, or there are fewer than two rows.
pub fn split_train_test(
    x: &FeatureMatrix,
    y: &[f32],
    test_size: f64,
    seed: u64,
) -> PipelineResult<TrainTestSplit> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PipelineError::Schema(format!(
            "test_size must be between 0 and 1, got {test_size}"
        )));
    }

    let n = x.n_rows();
    if y.len() != n {
        return Err(PipelineError::Schema(format!(
            "Target has {} rows but features have {n}",
            y.len()
        )));
    }
    if n < 2 {
        return Err(PipelineError::Schema(format!(
            "At least 2 rows are needed to split, got {n}"
        )));
    }

    let n_test = ((n as f64 * test_size).ceil() as usize).clamp(1, n - 1);

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
    let (test_idx, train_idx) = indices.split_at(n_test);

    Ok(TrainTestSplit {
        x_train: x.select_rows(train_idx),
        x_test: x.select_rows(test_idx),
        y_train: train_idx.iter().map(|&i| y[i]).collect(),
        y_test: test_idx.iter().map(|&i| y[i]).collect(),
    })
}

/// Loads the processed dataset, builds features and splits them.
///
/// # Errors
///
/// Returns [`PipelineError::DataNotFound`] if ingestion has not run, or a
/// schema error from feature building.
pub async fn get_train_test(
    store: Arc<dyn ObjectStore>,
    test_size: f64,
    seed: u64,
) -> PipelineResult<TrainTestSplit> {
    let df = load_processed(store).await?;
    let (x, y) = build_features(&df)?;
    let split = split_train_test(&x, &y, test_size, seed)?;

    info!(
        train_rows = split.x_train.n_rows(),
        test_rows = split.x_test.n_rows(),
        features = x.n_cols(),
        "Prepared train/test split"
    );

    Ok(split)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use object_store::memory::InMemory;

    use super::*;

    fn numbered(n: usize) -> (FeatureMatrix, Vec<f32>) {
        let values: Vec<f32> = (0..n).map(|i| i as f32).collect();
        let x = FeatureMatrix::new(vec![String::from("i")], values.clone(), n, BTreeMap::new())
            .expect("matrix");
        (x, values)
    }

    #[test]
    fn test_split_sizes_and_alignment() {
        let (x, y) = numbered(101);
        let split = split_train_test(&x, &y, 0.2, 42).expect("split");

        assert_eq!(split.x_test.n_rows(), 21);
        assert_eq!(split.x_train.n_rows(), 80);
        assert_eq!(split.x_train.values(), split.y_train.as_slice());
        assert_eq!(split.x_test.values(), split.y_test.as_slice());

        let mut all: Vec<f32> = split.y_train.iter().chain(&split.y_test).copied().collect();
        all.sort_by(f32::total_cmp);
        assert_eq!(all, y);
    }

    #[test]
    fn test_split_is_seeded() {
        let (x, y) = numbered(30);
        let a = split_train_test(&x, &y, 0.2, 42).expect("split");
        let b = split_train_test(&x, &y, 0.2, 42).expect("split");
        let c = split_train_test(&x, &y, 0.2, 7).expect("split");

        assert_eq!(a.y_test, b.y_test);
        assert_ne!(a.y_test, c.y_test);
    }

    #[test]
    fn test_invalid_split_requests() {
        let (x, y) = numbered(10);
        assert!(split_train_test(&x, &y, 0.0, 42).is_err());
        assert!(split_train_test(&x, &y, 1.0, 42).is_err());
        assert!(split_train_test(&x, &y[..5], 0.2, 42).is_err());

        let (one, y1) = numbered(1);
        assert!(split_train_test(&one, &y1, 0.2, 42).is_err());
    }

    #[tokio::test]
    async fn test_missing_dataset_is_data_not_found() {
        let err = get_train_test(Arc::new(InMemory::new()), 0.2, 42)
            .await
            .expect_err("no dataset");
        assert!(matches!(err, PipelineError::DataNotFound { .. }));
    }
}
