//! The training loop
//!
//! Everything here is sequencing: compute a loss, ask burn for the backward pass, hand the
//! gradients to the optimizer, and keep a running average of the loss for the narration.

use std::path::Path;

use burn::{
    data::dataloader::{DataLoaderBuilder, batcher::Batcher},
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    record::CompactRecorder,
    tensor::{ElementConversion, backend::AutodiffBackend},
};
use thiserror::Error;

use crate::{
    dataloader::ImageBatch,
    datasets::ImageSet,
    loss::LossKind,
    nn::{Classifier, NNError},
};

/// Errors raised while training or evaluating
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("Invalid training settings: {0}")]
    InvalidSettings(String),
    #[error(transparent)]
    Model(#[from] NNError),
    #[error("Loss became {loss} at epoch {epoch}, batch {batch}")]
    Diverged { epoch: usize, batch: usize, loss: f32 },
    #[error("Nothing to evaluate on, the test set is empty")]
    EmptyEvaluation,
    #[error("Failed to save the model to '{path}': {message}")]
    Checkpoint { path: String, message: String },
}

/// Knobs of the epoch/batch loop
#[derive(Debug, Clone)]
pub struct TrainSettings {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub loss: LossKind,
    /// Report the running average loss every this many batches
    pub report_every: usize,
    /// Seed for the data loader's shuffling
    pub seed: u64,
}

impl TrainSettings {
    pub fn validate(&self) -> Result<(), TrainError> {
        if self.epochs == 0 {
            return Err(TrainError::InvalidSettings("epochs must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(TrainError::InvalidSettings(
                "batch size must be at least 1".into(),
            ));
        }
        if self.report_every == 0 {
            return Err(TrainError::InvalidSettings(
                "report interval must be at least 1".into(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(TrainError::InvalidSettings(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// What a single backward pass and optimizer step did to one batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub loss_before: f32,
    pub loss_after: f32,
    /// L2 norm of the gradient of the first stage's weights
    pub grad_norm: f32,
}

/// Loss and accuracy on a held out set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub loss: f32,
    pub accuracy: f32,
}

/// Everything reported while fitting
#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    /// `(batches seen so far, running average loss)` at every report
    pub points: Vec<(usize, f32)>,
    pub epoch_losses: Vec<f32>,
    pub epoch_accuracies: Vec<f32>,
}

/// Averages batch losses over a reporting window and over the epoch
#[derive(Debug, Clone)]
pub struct RunningLoss {
    report_every: usize,
    window_sum: f64,
    window_len: usize,
    epoch_sum: f64,
    epoch_len: usize,
}

impl RunningLoss {
    pub fn new(report_every: usize) -> Self {
        Self {
            report_every: report_every.max(1),
            window_sum: 0.0,
            window_len: 0,
            epoch_sum: 0.0,
            epoch_len: 0,
        }
    }

    /// Adds a batch loss, returning the window average once `report_every` losses are in
    pub fn push(&mut self, loss: f32) -> Option<f32> {
        self.window_sum += f64::from(loss);
        self.window_len += 1;
        self.epoch_sum += f64::from(loss);
        self.epoch_len += 1;
        if self.window_len < self.report_every {
            return None;
        }
        let avg = self.window_sum / self.window_len as f64;
        self.window_sum = 0.0;
        self.window_len = 0;
        Some(avg as f32)
    }

    /// Mean of every loss pushed since the epoch started
    pub fn epoch_mean(&self) -> Option<f32> {
        (self.epoch_len > 0).then(|| (self.epoch_sum / self.epoch_len as f64) as f32)
    }

    /// Resets the epoch totals; the reporting window keeps counting across epochs
    pub fn start_epoch(&mut self) {
        self.epoch_sum = 0.0;
        self.epoch_len = 0;
    }

    /// Average of a partially filled window, emptying it
    pub fn flush(&mut self) -> Option<f32> {
        if self.window_len == 0 {
            return None;
        }
        let avg = self.window_sum / self.window_len as f64;
        self.window_sum = 0.0;
        self.window_len = 0;
        Some(avg as f32)
    }
}

fn scalar<B: Backend>(t: Tensor<B, 1>) -> f32 {
    t.into_scalar().elem::<f32>()
}

/// The first `batch_size` images of a set as a batch, unshuffled
pub fn first_batch<B: Backend>(
    set: &ImageSet,
    batch_size: usize,
    device: &B::Device,
) -> Option<ImageBatch<B>> {
    if set.is_empty() || batch_size == 0 {
        return None;
    }
    let items = set.items.iter().take(batch_size).cloned().collect();
    Some(set.batcher().batch(items, device))
}

/// One backward pass and one optimizer update on a single batch, narrated.
///
/// The loss is recomputed on the same batch afterwards so the effect of the step is visible.
pub fn single_step<B, O>(
    model: Classifier<B>,
    optim: &mut O,
    batch: &ImageBatch<B>,
    loss_kind: LossKind,
    learning_rate: f64,
) -> Result<(Classifier<B>, StepReport), TrainError>
where
    B: AutodiffBackend,
    O: Optimizer<Classifier<B>, B>,
{
    model.check_input(&batch.images)?;

    let loss = loss_kind.compute(model.forward(batch.images.clone()), batch);
    let loss_before = scalar(loss.clone());
    log::info!("Loss on a batch of {} before any update: {:.4}", batch.len(), loss_before);

    let grads = loss.backward();
    let grad_norm = model
        .first_weight()
        .grad(&grads)
        .map(|g| g.powf_scalar(2.0).sum().sqrt().into_scalar().elem::<f32>())
        .unwrap_or(0.0);
    log::info!("Gradient norm of the first stage's weights after backward: {:.4}", grad_norm);

    let grads = GradientsParams::from_grads(grads, &model);
    let model = optim.step(learning_rate, model, grads);

    let loss_after = scalar(loss_kind.compute(model.forward(batch.images.clone()), batch));
    log::info!("Loss on the same batch after one optimizer step: {:.4}", loss_after);

    Ok((
        model,
        StepReport {
            loss_before,
            loss_after,
            grad_norm,
        },
    ))
}

/// Mean loss and accuracy of `model` over `batches`
pub fn evaluate<B: Backend>(
    model: &Classifier<B>,
    batches: impl IntoIterator<Item = ImageBatch<B>>,
    loss_kind: LossKind,
) -> Result<Evaluation, TrainError> {
    let mut loss_sum = 0.0f64;
    let mut correct = 0usize;
    let mut total = 0usize;

    for batch in batches {
        let n = batch.len();
        let logits = model.forward(batch.images.clone());
        let loss = scalar(loss_kind.compute(logits.clone(), &batch));
        let hits = logits
            .argmax(1)
            .flatten::<1>(0, 1)
            .equal(batch.targets)
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();
        loss_sum += f64::from(loss) * n as f64;
        correct += hits as usize;
        total += n;
    }

    if total == 0 {
        return Err(TrainError::EmptyEvaluation);
    }
    Ok(Evaluation {
        loss: (loss_sum / total as f64) as f32,
        accuracy: correct as f32 / total as f32,
    })
}

/// Trains `model` for `settings.epochs` passes over `train`, evaluating on `test` after
/// every epoch
pub fn fit<B, O>(
    mut model: Classifier<B>,
    optim: &mut O,
    train: ImageSet,
    test: ImageSet,
    settings: &TrainSettings,
) -> Result<(Classifier<B>, TrainingHistory), TrainError>
where
    B: AutodiffBackend,
    O: Optimizer<Classifier<B>, B>,
{
    settings.validate()?;
    for set in [&train, &test] {
        if set.input_size() != model.input_size() {
            return Err(NNError::InputSizeMismatch {
                expected: model.input_size(),
                got: set.input_size(),
            }
            .into());
        }
    }
    if test.is_empty() {
        return Err(TrainError::EmptyEvaluation);
    }

    let train_loader = DataLoaderBuilder::new(train.batcher())
        .batch_size(settings.batch_size)
        .shuffle(settings.seed)
        .build(train.into_dataset());
    // evaluation runs on the inner backend, no graph is recorded
    let test_loader = DataLoaderBuilder::new(test.batcher())
        .batch_size(settings.batch_size)
        .build(test.into_dataset());

    let mut running = RunningLoss::new(settings.report_every);
    let mut history = TrainingHistory::default();
    let mut batches_seen = 0;

    for epoch in 1..=settings.epochs {
        running.start_epoch();
        let mut dead_units = 0.0;
        let mut n_batches = 0;

        for (batch_idx, batch) in train_loader.iter().enumerate() {
            let logits = model.forward(batch.images.clone());
            let loss = settings.loss.compute(logits, &batch);
            let loss_value = scalar(loss.clone());
            if !loss_value.is_finite() {
                return Err(TrainError::Diverged {
                    epoch,
                    batch: batch_idx + 1,
                    loss: loss_value,
                });
            }

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(settings.learning_rate, model, grads);
            batches_seen += 1;
            n_batches += 1;

            if log::log_enabled!(log::Level::Debug) {
                dead_units += model.dead_units(batch.images);
            }
            if let Some(avg) = running.push(loss_value) {
                log::info!("[epoch {}, batch {:>5}] running loss: {:.4}", epoch, batch_idx + 1, avg);
                history.points.push((batches_seen, avg));
            }
        }

        if n_batches > 0 {
            log::debug!(
                "Average fraction of dead units in epoch {}: {:.3}",
                epoch,
                dead_units / n_batches as f32
            );
        }
        let epoch_loss = running.epoch_mean().unwrap_or(f32::NAN);
        let evaluation = evaluate(&model.valid(), test_loader.iter(), settings.loss)?;
        log::info!(
            "epoch: {}, epoch_loss: {:.4}, test_loss: {:.4}, test_accuracy: {:.2}%",
            epoch,
            epoch_loss,
            evaluation.loss,
            evaluation.accuracy * 100.0
        );
        history.epoch_losses.push(epoch_loss);
        history.epoch_accuracies.push(evaluation.accuracy);
    }

    // a run shorter than one window still gets a point on the curve
    if let Some(avg) = running.flush() {
        log::info!("[after {:>5} batches] running loss: {:.4}", batches_seen, avg);
        history.points.push((batches_seen, avg));
    }

    Ok((model, history))
}

/// Writes the model's parameters with burn's `CompactRecorder`, which adds its own extension
pub fn save_model<B: Backend>(model: &Classifier<B>, path: &Path) -> Result<(), TrainError> {
    model
        .clone()
        .save_file(path.to_path_buf(), &CompactRecorder::new())
        .map_err(|e| TrainError::Checkpoint {
            path: path.display().to_string(),
            message: format!("{e:?}"),
        })?;
    log::info!("Model saved to '{}'.", path.display());
    Ok(())
}
