//! Network definitions.

use burn::module::Param;
use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;
use burn::tensor::activation::softplus;
use station_structs::{NetworkShape, PipelineError, PipelineResult};

/// One ensemble member: a small feed-forward regressor.
///
/// The output goes through softplus, so predictions are never negative.
#[derive(Module, Debug)]
pub struct RegressorHead<B: Backend> {
    linear1: Linear<B>,
    linear2: Linear<B>,
    linear_out: Linear<B>,
    activation: Relu,
}

impl<B: Backend> RegressorHead<B> {
    pub fn new(device: &B::Device, n_features: usize, shape: &NetworkShape) -> Self {
        let linear1 = LinearConfig::new(n_features, shape.hidden_size_1).init(device);
        let linear2 = LinearConfig::new(shape.hidden_size_1, shape.hidden_size_2).init(device);
        let linear_out = LinearConfig::new(shape.hidden_size_2, 1).init(device);
        let activation = Relu::new();

        Self {
            linear1,
            linear2,
            linear_out,
            activation,
        }
    }

    /// Forward pass on standardized inputs.
    ///
    /// # Arguments
    ///
    /// * `input` - Tensor of shape [`batch_size`, `n_features`]
    ///
    /// # Returns
    ///
    /// Tensor of shape [`batch_size`, 1].
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.linear1.forward(input);
        let x = self.activation.forward(x);
        let x = self.linear2.forward(x);
        let x = self.activation.forward(x);
        softplus(self.linear_out.forward(x), 1.0)
    }

    /// Layer widths as `[inputs, hidden_1, hidden_2, outputs]`, read from the
    /// loaded weights.
    fn widths(&self) -> [usize; 4] {
        let [n_in, hidden_1] = self.linear1.weight.val().dims();
        let [_, hidden_2] = self.linear2.weight.val().dims();
        let [_, n_out] = self.linear_out.weight.val().dims();
        [n_in, hidden_1, hidden_2, n_out]
    }
}

/// Bagged ensemble of [`RegressorHead`]s with built-in input standardization.
///
/// Takes raw feature rows; the prediction is the mean of the members.
#[derive(Module, Debug)]
pub struct StationRegressor<B: Backend> {
    input_mean: Param<Tensor<B, 1>>,
    input_scale: Param<Tensor<B, 1>>,
    members: Vec<RegressorHead<B>>,
}

impl<B: Backend> StationRegressor<B> {
    /// Creates an untrained ensemble, used as the skeleton records load into.
    pub fn new(
        device: &B::Device,
        n_features: usize,
        n_estimators: usize,
        shape: &NetworkShape,
    ) -> Self {
        let members = (0..n_estimators)
            .map(|_| RegressorHead::new(device, n_features, shape))
            .collect();

        Self::from_parts(
            &vec![0.0; n_features],
            &vec![1.0; n_features],
            members,
            device,
        )
    }

    /// Assembles an ensemble from trained members and train-set statistics.
    pub fn from_parts(
        mean: &[f32],
        scale: &[f32],
        members: Vec<RegressorHead<B>>,
        device: &B::Device,
    ) -> Self {
        Self {
            input_mean: Param::from_tensor(Tensor::from_floats(mean, device)),
            input_scale: Param::from_tensor(Tensor::from_floats(scale, device)),
            members,
        }
    }

    #[must_use]
    pub fn n_members(&self) -> usize {
        self.members.len()
    }

    /// Checks that the loaded weights have the shape the metadata describes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Model`] naming the first mismatch.
    pub fn ensure_shape(
        &self,
        n_features: usize,
        n_estimators: usize,
        shape: &NetworkShape,
    ) -> PipelineResult<()> {
        if self.members.len() != n_estimators {
            return Err(PipelineError::Model(format!(
                "Weights hold {} members, metadata expects {n_estimators}",
                self.members.len()
            )));
        }

        let [mean_width] = self.input_mean.val().dims();
        let [scale_width] = self.input_scale.val().dims();
        if mean_width != n_features || scale_width != n_features {
            return Err(PipelineError::Model(format!(
                "Weights standardize {mean_width} features, metadata expects {n_features}"
            )));
        }

        let expected = [n_features, shape.hidden_size_1, shape.hidden_size_2, 1];
        for (index, member) in self.members.iter().enumerate() {
            let widths = member.widths();
            if widths != expected {
                return Err(PipelineError::Model(format!(
                    "Member {index} has layer widths {widths:?}, metadata expects {expected:?}"
                )));
            }
        }

        Ok(())
    }

    /// Forward pass on raw feature rows of shape [`batch_size`, `n_features`].
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mean = self.input_mean.val().unsqueeze::<2>();
        let scale = self.input_scale.val().unsqueeze::<2>();
        let x = (input - mean) / scale;

        let outputs = self
            .members
            .iter()
            .map(|member| member.forward(x.clone()))
            .collect();

        Tensor::cat(outputs, 1).mean_dim(1)
    }

    /// Predicts every row of a row-major feature buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Model`] if the buffer shape is wrong, the
    /// ensemble is empty, or the output cannot be read back.
    pub fn predict_rows(
        &self,
        values: &[f32],
        n_features: usize,
        device: &B::Device,
    ) -> PipelineResult<Vec<f32>> {
        if self.members.is_empty() {
            return Err(PipelineError::Model(String::from("Ensemble has no members")));
        }
        if n_features == 0 || values.len() % n_features != 0 {
            return Err(PipelineError::Model(format!(
                "{} values do not form rows of {n_features} features",
                values.len()
            )));
        }

        let n_rows = values.len() / n_features;
        let input = Tensor::<B, 1>::from_floats(values, device).reshape([n_rows, n_features]);

        self.forward(input)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| PipelineError::Model(format!("Failed to read predictions: {e:?}")))
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;
    use burn::backend::ndarray::NdArrayDevice;

    use super::*;

    type TestBackend = NdArray;

    #[test]
    fn test_ensemble_output_shape_and_sign() {
        let device = NdArrayDevice::default();
        let model: StationRegressor<TestBackend> =
            StationRegressor::new(&device, 4, 3, &NetworkShape::default());

        assert_eq!(model.n_members(), 3);

        let predictions = model
            .predict_rows(&[1.0, -2.0, 3.0, 0.0, 5.0, 6.0, -7.0, 8.0], 4, &device)
            .expect("predict");

        assert_eq!(predictions.len(), 2);
        assert!(predictions.iter().all(|p| p.is_finite() && *p >= 0.0));
    }

    #[test]
    fn test_ragged_input_is_rejected() {
        let device = NdArrayDevice::default();
        let model: StationRegressor<TestBackend> =
            StationRegressor::new(&device, 4, 1, &NetworkShape::default());

        assert!(model.predict_rows(&[1.0, 2.0, 3.0], 4, &device).is_err());
    }

    #[test]
    fn test_ensure_shape() {
        let device = NdArrayDevice::default();
        let shape = NetworkShape {
            hidden_size_1: 8,
            hidden_size_2: 4,
        };
        let model: StationRegressor<TestBackend> = StationRegressor::new(&device, 5, 2, &shape);

        assert!(model.ensure_shape(5, 2, &shape).is_ok());
        assert!(model.ensure_shape(3, 2, &shape).is_err());
        assert!(model.ensure_shape(5, 1, &shape).is_err());
        assert!(model.ensure_shape(5, 2, &NetworkShape::default()).is_err());
    }
}
