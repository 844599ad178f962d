//! Dataset and batching for Burn training.

use burn::prelude::*;

/// A single standardized feature row with its target.
#[derive(Debug, Clone)]
pub struct StationItem {
    pub features: Vec<f32>,
    pub target: f32,
}

/// In-memory training rows.
#[derive(Debug, Clone)]
pub struct FeatureDataset {
    items: Vec<StationItem>,
}

impl FeatureDataset {
    /// Creates a dataset from row-major values and matching targets.
    #[must_use]
    pub fn from_rows(values: &[f32], targets: &[f32], n_features: usize) -> Self {
        let items = values
            .chunks_exact(n_features.max(1))
            .zip(targets)
            .map(|(row, &target)| StationItem {
                features: row.to_vec(),
                target,
            })
            .collect();
        Self { items }
    }
}

impl burn::data::dataset::Dataset<StationItem> for FeatureDataset {
    fn get(&self, index: usize) -> Option<StationItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// A batch of training data.
#[derive(Debug, Clone)]
pub struct StationBatch<B: Backend> {
    /// Input features tensor of shape `[batch_size, n_features]`.
    pub inputs: Tensor<B, 2>,
    /// Targets tensor of shape `[batch_size, 1]`.
    pub targets: Tensor<B, 2>,
}

/// Batcher for creating training batches.
#[derive(Debug, Clone)]
pub struct StationBatcher<B: Backend> {
    device: B::Device,
    n_features: usize,
}

impl<B: Backend> StationBatcher<B> {
    #[must_use]
    pub const fn new(device: B::Device, n_features: usize) -> Self {
        Self { device, n_features }
    }

    /// Creates a batch from a vector of items.
    pub fn batch(&self, items: Vec<StationItem>) -> StationBatch<B> {
        let batch_size = items.len();

        let mut features_data = Vec::with_capacity(batch_size * self.n_features);
        let mut targets_data = Vec::with_capacity(batch_size);

        for item in items {
            features_data.extend_from_slice(&item.features);
            targets_data.push(item.target);
        }

        let inputs = Tensor::<B, 1>::from_floats(features_data.as_slice(), &self.device)
            .reshape([batch_size, self.n_features]);

        let targets = Tensor::<B, 1>::from_floats(targets_data.as_slice(), &self.device)
            .reshape([batch_size, 1]);

        StationBatch { inputs, targets }
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;
    use burn::data::dataset::Dataset;

    use super::*;

    type TestBackend = NdArray;

    #[test]
    fn test_dataset_from_rows() {
        let dataset = FeatureDataset::from_rows(&[1.0, 2.0, 3.0, 4.0], &[10.0, 20.0], 2);

        assert_eq!(dataset.len(), 2);
        let item = dataset.get(1).expect("second row");
        assert_eq!(item.features, vec![3.0, 4.0]);
        assert!((item.target - 20.0).abs() < f32::EPSILON);
        assert!(dataset.get(2).is_none());
    }

    #[test]
    fn test_batcher() {
        let device = burn::backend::ndarray::NdArrayDevice::default();
        let batcher = StationBatcher::<TestBackend>::new(device, 3);

        let items = vec![
            StationItem {
                features: vec![0.0; 3],
                target: 1.0,
            },
            StationItem {
                features: vec![1.0; 3],
                target: 2.5,
            },
        ];

        let batch = batcher.batch(items);

        assert_eq!(batch.inputs.dims(), [2, 3]);
        assert_eq!(batch.targets.dims(), [2, 1]);
    }
}
