//! Loss function(s)

use std::fmt::{self, Display};

use burn::{
    nn::loss::{CrossEntropyLossConfig, MseLoss, Reduction},
    prelude::*,
    tensor::activation::softmax,
};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::dataloader::ImageBatch;

/// Which scalar loss to train against
#[derive(Debug, ValueEnum, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LossKind {
    /// Cross entropy between logits and class indices
    CrossEntropy,
    /// Mean squared error between softmax probabilities and one hot targets
    Mse,
}

impl Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LossKind::CrossEntropy => write!(f, "cross-entropy"),
            LossKind::Mse => write!(f, "mse"),
        }
    }
}

impl LossKind {
    /// Mean loss of `logits` against the batch targets, a single element tensor
    pub fn compute<B: Backend>(&self, logits: Tensor<B, 2>, batch: &ImageBatch<B>) -> Tensor<B, 1> {
        match self {
            LossKind::CrossEntropy => CrossEntropyLossConfig::new()
                .init(&logits.device())
                .forward(logits, batch.targets.clone()),
            LossKind::Mse => {
                let probs = softmax(logits, 1);
                MseLoss::new().forward(probs, batch.one_hot.clone(), Reduction::Mean)
            }
        }
    }
}
