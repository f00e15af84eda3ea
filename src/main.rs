//! Trains a small feed-forward classifier on an image dataset, narrating each step
//!
//! # Usage
//! Runnable via
//! ```sh
//! cargo run -- -h
//! cargo run
//! cargo run -- --dataset fashion-mnist --data-dir data/fashion --epochs 10
//! ```
//!
//! MNIST and Fashion-MNIST are read from the four standard IDX files (plain or `.gz`) in
//! `--data-dir`. The default synthetic dataset needs no download.

use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
};

use burn::{
    backend::{Autodiff, NdArray},
    module::AutodiffModule,
    optim::Optimizer,
    prelude::*,
};
use clap::Parser;
use grad_notebook::{
    config::TrainingConfig,
    datasets::{DatasetKind, ImageSet, load_dataset},
    loss::LossKind,
    nn::Classifier,
    optim::{OptimizerKind, adam, sgd},
    plot::{plot_loss_curve, plot_samples},
    train::{first_batch, fit, save_model, single_step},
};

type TrainBackend = Autodiff<NdArray>;

#[derive(Parser)]
struct Args {
    #[clap(short, long, default_value_t = DatasetKind::Synthetic)]
    dataset: DatasetKind,
    /// Directory holding the IDX files for mnist / fashion-mnist
    #[clap(long, default_value_t = format!("data"))]
    data_dir: String,
    /// Train on at most this many images
    #[clap(long)]
    train_limit: Option<usize>,
    #[clap(long, default_value_t = 500)]
    synthetic_per_class: usize,
    #[clap(short, long, default_value_t = 5)]
    epochs: usize,
    #[clap(short, long, default_value_t = 64)]
    batch_size: usize,
    #[clap(short, long, default_value_t = 0.01)]
    lr: f64,
    #[clap(short, long, default_value_t = 0.9)]
    momentum: f64,
    #[clap(long, default_value_t = OptimizerKind::Sgd)]
    optimizer: OptimizerKind,
    #[clap(long, default_value_t = LossKind::CrossEntropy)]
    loss: LossKind,
    /// Widths of the hidden stages, comma separated
    #[clap(long, value_delimiter = ',', default_values_t = vec![128, 64])]
    hidden: Vec<usize>,
    /// Print the running average loss every this many batches
    #[clap(short, long, default_value_t = 100)]
    report_every: usize,
    #[clap(long, default_value_t = 42)]
    seed: u64,
    #[clap(short, long, default_value_t = format!("output"))]
    output_dir: String,
    /// Load every setting above from a saved `config.json` instead
    #[clap(long)]
    config: Option<PathBuf>,
    /// Number of images in the sample grids
    #[clap(long, default_value_t = 16)]
    samples: usize,
    #[clap(long, default_value_t = false)]
    no_plots: bool,
    #[clap(long, default_value_t = false)]
    save_model: bool,
}

impl Args {
    fn to_config(&self) -> TrainingConfig {
        TrainingConfig::new(
            self.dataset,
            self.optimizer,
            self.loss,
            self.hidden.clone(),
            self.data_dir.clone(),
        )
        .with_train_limit(self.train_limit)
        .with_synthetic_per_class(self.synthetic_per_class)
        .with_epochs(self.epochs)
        .with_batch_size(self.batch_size)
        .with_learning_rate(self.lr)
        .with_momentum(self.momentum)
        .with_report_every(self.report_every)
        .with_seed(self.seed)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => TrainingConfig::load_file(path)?,
        None => args.to_config(),
    };
    let output_dir = PathBuf::from(&args.output_dir);
    fs::create_dir_all(&output_dir)?;
    config.save(output_dir.join("config.json"))?;

    match config.optimizer {
        OptimizerKind::Sgd => run(
            &config,
            &args,
            &output_dir,
            sgd::<TrainBackend, Classifier<TrainBackend>>(config.momentum),
        ),
        OptimizerKind::Adam => run(
            &config,
            &args,
            &output_dir,
            adam::<TrainBackend, Classifier<TrainBackend>>(),
        ),
    }
}

fn run<O>(
    config: &TrainingConfig,
    args: &Args,
    output_dir: &Path,
    mut optim: O,
) -> Result<(), Box<dyn Error>>
where
    O: Optimizer<Classifier<TrainBackend>, TrainBackend>,
{
    let device = Default::default();
    let kind = config.dataset;
    let settings = config.settings();
    settings.validate()?;

    // load and normalize
    let (train, test, _) = load_dataset(kind, &config.load_options())?;
    let preview = ImageSet::new(
        test.width,
        test.height,
        test.class_names.clone(),
        test.items.iter().take(args.samples).cloned().collect(),
    )?;
    if !args.no_plots {
        plot_samples(
            &train,
            args.samples,
            None,
            &output_dir.join(format!("samples_{kind}.png")),
        )?;
    }

    // declare the stack of stages
    let model = config
        .classifier(train.input_size(), train.num_classes())
        .init::<TrainBackend>(&device)?;
    log::info!(
        "Classifier {} -> {:?} -> {} with {} parameters",
        model.input_size(),
        config.hidden_sizes,
        model.num_classes(),
        model.num_params()
    );

    // one loss, one backward pass, one optimizer step
    let batch = first_batch::<TrainBackend>(&train, settings.batch_size, &device)
        .ok_or("the training set is empty")?;
    let (model, report) = single_step(model, &mut optim, &batch, settings.loss, settings.learning_rate)?;
    log::info!(
        "One step with lr {} moved the batch loss by {:+.4}",
        settings.learning_rate,
        report.loss_after - report.loss_before
    );

    // and repeat over epochs and batches
    log::info!(
        "Training for {} epochs with {} and {} loss",
        settings.epochs,
        config.optimizer,
        settings.loss
    );
    let (model, history) = fit(model, &mut optim, train, test, &settings)?;

    if !args.no_plots {
        plot_loss_curve(
            &history,
            &format!("Running loss on {kind}"),
            &output_dir.join(format!("loss_{kind}.png")),
        )?;

        let valid = model.valid();
        if let Some(batch) = first_batch::<NdArray>(&preview, preview.len(), &device) {
            let predictions = valid
                .predict(batch.images)
                .into_data()
                .to_vec::<i64>()
                .map_err(|e| format!("{e:?}"))?
                .into_iter()
                .map(|p| p as usize)
                .collect::<Vec<_>>();
            plot_samples(
                &preview,
                preview.len(),
                Some(&predictions),
                &output_dir.join(format!("predictions_{kind}.png")),
            )?;
        }
    }

    if args.save_model {
        save_model(&model, &output_dir.join("model"))?;
    }
    if let (Some(loss), Some(accuracy)) = (history.epoch_losses.last(), history.epoch_accuracies.last()) {
        log::info!(
            "Finished: final epoch loss {:.4}, test accuracy {:.2}%",
            loss,
            accuracy * 100.0
        );
    }
    Ok(())
}
