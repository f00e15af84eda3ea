//! The classifier: an ordered stack of linear stages with ReLU between them
//!
//! Parameter storage, initialization, and gradient bookkeeping all belong to burn; this
//! module only declares the stack.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::{ElementConversion, activation::relu},
};
use thiserror::Error;

/// Errors for the neural network
#[derive(Debug, Error)]
pub enum NNError {
    #[error("Input size mismatch: expected {expected}, got {got}")]
    InputSizeMismatch { expected: usize, got: usize },
    #[error("Stage {stage} has zero width")]
    ZeroWidth { stage: usize },
}

/// Shape of the classifier
#[derive(Config, Debug)]
pub struct ClassifierConfig {
    /// Features per image (`width * height`)
    pub input_size: usize,
    pub num_classes: usize,
    /// Width of every hidden stage, in order. Empty means a single linear stage.
    pub hidden_sizes: Vec<usize>,
}

impl ClassifierConfig {
    /// Builds the stack with burn's default (Kaiming uniform) initialization
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Classifier<B>, NNError> {
        let widths = std::iter::once(self.input_size)
            .chain(self.hidden_sizes.iter().copied())
            .chain(std::iter::once(self.num_classes))
            .collect::<Vec<_>>();
        if let Some(stage) = widths.iter().position(|w| *w == 0) {
            return Err(NNError::ZeroWidth { stage });
        }

        let mut stages = widths
            .windows(2)
            .map(|w| LinearConfig::new(w[0], w[1]).init(device))
            .collect::<Vec<_>>();
        // windows(2) over at least two widths yields at least one stage
        let output = stages.remove(stages.len() - 1);
        Ok(Classifier {
            hidden: stages,
            output,
        })
    }
}

/// Feed-forward classifier producing one logit per class
#[derive(Module, Debug)]
pub struct Classifier<B: Backend> {
    hidden: Vec<Linear<B>>,
    output: Linear<B>,
}

impl<B: Backend> Classifier<B> {
    /// `[batch, input_size]` images to `[batch, num_classes]` logits
    pub fn forward(&self, images: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self
            .hidden
            .iter()
            .fold(images, |x, stage| relu(stage.forward(x)));
        self.output.forward(x)
    }

    /// Index of the largest logit per image
    pub fn predict(&self, images: Tensor<B, 2>) -> Tensor<B, 1, Int> {
        self.forward(images).argmax(1).flatten::<1>(0, 1)
    }

    /// Weights of the stage the images enter through, `[input_size, width]`
    pub fn first_weight(&self) -> Tensor<B, 2> {
        self.hidden.first().unwrap_or(&self.output).weight.val()
    }

    pub fn input_size(&self) -> usize {
        self.first_weight().dims()[0]
    }

    pub fn num_classes(&self) -> usize {
        self.output.weight.val().dims()[1]
    }

    /// Checks that `images` has the feature count the first stage expects
    pub fn check_input(&self, images: &Tensor<B, 2>) -> Result<(), NNError> {
        let got = images.dims()[1];
        let expected = self.input_size();
        if got != expected {
            return Err(NNError::InputSizeMismatch { expected, got });
        }
        Ok(())
    }

    /// Fraction of the first hidden stage's ReLU outputs that are zero (used for debugging)
    pub fn dead_units(&self, images: Tensor<B, 2>) -> f32 {
        let Some(first) = self.hidden.first() else {
            return 0.0;
        };
        let activations = relu(first.forward(images));
        let total = activations.dims().iter().product::<usize>();
        if total == 0 {
            return 0.0;
        }
        let dead = activations
            .equal_elem(0.0)
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();
        dead as f32 / total as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_eq_float;

    use burn::{backend::NdArray, module::Param};

    type TestBackend = NdArray;

    fn linear(weights: [[f32; 2]; 2], bias: [f32; 2]) -> Linear<TestBackend> {
        let device = Default::default();
        Linear {
            weight: Param::from_tensor(Tensor::from_floats(weights, &device)),
            bias: Some(Param::from_tensor(Tensor::from_floats(bias, &device))),
        }
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model = ClassifierConfig::new(4, 3, vec![5, 6])
            .init::<TestBackend>(&device)
            .unwrap();
        assert_eq!(model.hidden.len(), 2);
        assert_eq!(model.input_size(), 4);
        assert_eq!(model.num_classes(), 3);
        // (4*5 + 5) + (5*6 + 6) + (6*3 + 3)
        assert_eq!(model.num_params(), 82);

        let logits = model.forward(Tensor::zeros([2, 4], &device));
        assert_eq!(logits.dims(), [2, 3]);
    }

    #[test]
    fn test_zero_width() {
        let device = Default::default();
        let err = ClassifierConfig::new(4, 3, vec![5, 0])
            .init::<TestBackend>(&device)
            .unwrap_err();
        assert!(matches!(err, NNError::ZeroWidth { stage: 2 }));

        let err = ClassifierConfig::new(4, 0, vec![])
            .init::<TestBackend>(&device)
            .unwrap_err();
        assert!(matches!(err, NNError::ZeroWidth { stage: 1 }));
    }

    #[test]
    fn test_predict() {
        let device = Default::default();
        let model = Classifier {
            hidden: vec![],
            output: linear([[1.0, 0.0], [0.0, 1.0]], [0.0, 0.0]),
        };
        let images = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0], [0.0, 3.0], [5.0, 2.0]], &device);
        let preds = model.predict(images);
        assert_eq!(preds.into_data().to_vec::<i64>().unwrap(), vec![0, 1, 0]);
    }

    #[test]
    fn test_dim_mismatch() {
        let device = Default::default();
        let model = ClassifierConfig::new(2, 3, vec![4])
            .init::<TestBackend>(&device)
            .unwrap();
        let images = Tensor::<TestBackend, 2>::zeros([1, 3], &device);
        assert!(matches!(
            model.check_input(&images),
            Err(NNError::InputSizeMismatch {
                expected: 2,
                got: 3
            })
        ));
        assert!(model.check_input(&Tensor::zeros([1, 2], &device)).is_ok());
    }

    #[test]
    fn test_dead_units() {
        let device = Default::default();
        // first unit always negative on positive inputs, second always positive
        let model = Classifier {
            hidden: vec![linear([[-1.0, 1.0], [-1.0, 1.0]], [0.0, 0.0])],
            output: linear([[1.0, 0.0], [0.0, 1.0]], [0.0, 0.0]),
        };
        let images = Tensor::<TestBackend, 2>::from_floats([[1.0, 2.0], [3.0, 4.0]], &device);
        assert_eq_float!(model.dead_units(images), 0.5);

        let no_hidden = Classifier {
            hidden: vec![],
            output: linear([[1.0, 0.0], [0.0, 1.0]], [0.0, 0.0]),
        };
        assert_eq_float!(no_hidden.dead_units(Tensor::ones([1, 2], &device)), 0.0);
    }
}
