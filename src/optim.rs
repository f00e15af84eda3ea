//! Optimizer(s)
//!
//! The update rules live in `burn::optim`; this module picks one and configures it the way
//! the walkthrough describes them.

use std::fmt::{self, Display};

use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, Optimizer, SgdConfig, momentum::MomentumConfig},
    tensor::backend::AutodiffBackend,
};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Toggles between optimizers
#[derive(Debug, ValueEnum, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OptimizerKind {
    Sgd,
    Adam,
}

impl Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizerKind::Sgd => write!(f, "sgd"),
            OptimizerKind::Adam => write!(f, "adam"),
        }
    }
}

/// SGD, with classic (undampened, non-Nesterov) momentum unless `momentum` is zero
pub fn sgd<B, M>(momentum: f64) -> impl Optimizer<M, B>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let momentum = (momentum > 0.0).then(|| {
        MomentumConfig::new()
            .with_momentum(momentum)
            .with_dampening(0.0)
            .with_nesterov(false)
    });
    SgdConfig::new().with_momentum(momentum).init::<B, M>()
}

/// Adam with burn's default betas and epsilon
pub fn adam<B, M>() -> impl Optimizer<M, B>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    AdamConfig::new().init::<B, M>()
}
