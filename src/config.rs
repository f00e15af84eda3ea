//! Run configuration, saved next to the outputs so a run can be repeated

use std::path::Path;

use burn::prelude::*;
use thiserror::Error;

use crate::{
    datasets::{DatasetKind, LoadOptions},
    loss::LossKind,
    nn::ClassifierConfig,
    optim::OptimizerKind,
    train::TrainSettings,
};

/// Errors while reading a run configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config from '{path}': {message}")]
    Load { path: String, message: String },
}

#[derive(Config, Debug)]
pub struct TrainingConfig {
    pub dataset: DatasetKind,
    pub optimizer: OptimizerKind,
    pub loss: LossKind,
    pub hidden_sizes: Vec<usize>,
    pub data_dir: String,
    pub train_limit: Option<usize>,
    #[config(default = 500)]
    pub synthetic_per_class: usize,
    #[config(default = 5)]
    pub epochs: usize,
    #[config(default = 64)]
    pub batch_size: usize,
    #[config(default = 1.0e-2)]
    pub learning_rate: f64,
    #[config(default = 0.9)]
    pub momentum: f64,
    #[config(default = 100)]
    pub report_every: usize,
    #[config(default = 42)]
    pub seed: u64,
}

impl TrainingConfig {
    /// Reads a config previously written with `Config::save`
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        Self::load(path).map_err(|e| ConfigError::Load {
            path: path.display().to_string(),
            message: format!("{e:?}"),
        })
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            data_dir: self.data_dir.clone().into(),
            train_limit: self.train_limit,
            synthetic_per_class: self.synthetic_per_class,
            seed: self.seed,
        }
    }

    pub fn classifier(&self, input_size: usize, num_classes: usize) -> ClassifierConfig {
        ClassifierConfig::new(input_size, num_classes, self.hidden_sizes.clone())
    }

    pub fn settings(&self) -> TrainSettings {
        TrainSettings {
            epochs: self.epochs,
            batch_size: self.batch_size,
            learning_rate: self.learning_rate,
            loss: self.loss,
            report_every: self.report_every,
            seed: self.seed,
        }
    }
}
