//! Command-line driver: trains a network on IDX (MNIST-format) data, saves
//! it as JSON, and measures classification accuracy on a held-out set.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use ffnn::data::idx::argmax;
use ffnn::train::{accuracy, TrainConfig};
use ffnn::{load_idx_pair, train_loop, Dataset, Network, NetworkSpec};

#[derive(Parser)]
#[command(name = "ffnn")]
#[command(about = "Train and evaluate a feedforward network on IDX digit data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level: trace, debug, info, warn or error
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a network and save its parameters
    Train {
        /// IDX3 training images
        #[arg(long)]
        train_images: PathBuf,
        /// IDX1 training labels
        #[arg(long)]
        train_labels: PathBuf,
        /// IDX3 held-out images, scored after every epoch
        #[arg(long, requires = "test_labels")]
        test_images: Option<PathBuf>,
        /// IDX1 held-out labels
        #[arg(long, requires = "test_images")]
        test_labels: Option<PathBuf>,
        /// Architecture as NetworkSpec JSON (default: 784-15-10 sigmoid)
        #[arg(long)]
        spec: Option<String>,
        #[arg(long, default_value_t = 1)]
        epochs: usize,
        #[arg(long, default_value_t = 3.0)]
        learning_rate: f64,
        /// Use only the first N training examples
        #[arg(long)]
        limit: Option<usize>,
        /// Seed for weight initialization and shuffling
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Reshuffle training examples every epoch
        #[arg(long)]
        shuffle: bool,
        #[arg(long, default_value_t = 10)]
        classes: usize,
        /// Log progress every N examples (0 disables)
        #[arg(long, default_value_t = 1000)]
        log_every: usize,
        /// Where to write the trained parameters
        #[arg(short, long, default_value = "model.json")]
        output: PathBuf,
    },
    /// Measure accuracy of a saved network
    Eval {
        #[arg(short, long)]
        model: PathBuf,
        #[arg(long)]
        images: PathBuf,
        #[arg(long)]
        labels: PathBuf,
        #[arg(long, default_value_t = 10)]
        classes: usize,
        #[arg(long)]
        limit: Option<usize>,
        /// Print the first N predictions
        #[arg(long, default_value_t = 10)]
        show: usize,
    },
    /// Write the default architecture as NetworkSpec JSON
    Spec {
        #[arg(short, long, default_value = "spec.json")]
        output: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let subscriber = FmtSubscriber::builder().with_max_level(cli.log_level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Train {
            train_images,
            train_labels,
            test_images,
            test_labels,
            spec,
            epochs,
            learning_rate,
            limit,
            seed,
            shuffle,
            classes,
            log_every,
            output,
        } => {
            let spec = match spec {
                Some(path) => NetworkSpec::load_json(&path)
                    .with_context(|| format!("loading network spec {}", path))?,
                None => NetworkSpec::mnist_default(),
            };
            let mut network = spec.build(seed)?;
            check_classes(&network, classes)?;

            let train = load_dataset(&train_images, &train_labels, classes, limit)?;
            let test = match (test_images, test_labels) {
                (Some(images), Some(labels)) => Some(load_dataset(&images, &labels, classes, None)?),
                _ => None,
            };

            let mut config = TrainConfig::new(epochs, learning_rate).with_log_every(log_every);
            if shuffle {
                config = config.with_shuffle_seed(seed);
            }

            info!(examples = train.len(), epochs, learning_rate, "training");
            let validation = test
                .as_ref()
                .map(|t| (t.inputs.as_slice(), t.targets.as_slice()));
            let history = train_loop(&mut network, &train.inputs, &train.targets, validation, &config)?;

            if let Some(last) = history.last() {
                println!("Final train loss: {:.6}", last.train_loss);
                if let Some(acc) = last.val_accuracy {
                    println!("Held-out accuracy: {:.2}%", acc);
                }
            }

            network
                .save_json(&output)
                .with_context(|| format!("saving network to {}", output.display()))?;
            println!("Model saved to {}", output.display());
        }
        Commands::Eval {
            model,
            images,
            labels,
            classes,
            limit,
            show,
        } => {
            let network = Network::load_json(&model)
                .with_context(|| format!("loading network {}", model.display()))?;
            check_classes(&network, classes)?;
            let data = load_dataset(&images, &labels, classes, limit)?;

            let acc = accuracy(&network, &data.inputs, &data.targets)?;
            println!("Accuracy: {:.2}% over {} examples", acc, data.len());

            if show > 0 {
                println!("{:>12}  {:>12}", "True Label", "Predicted");
                println!("{}", "-".repeat(26));
                for (input, &label) in data.inputs.iter().zip(&data.labels).take(show) {
                    let predicted = argmax(&network.eval(input)?);
                    println!("{:>12}  {:>12}", label, predicted);
                }
            }
        }
        Commands::Spec { output } => {
            NetworkSpec::mnist_default()
                .save_json(&output)
                .with_context(|| format!("writing spec to {}", output))?;
            println!("Spec written to {}", output);
        }
    }

    Ok(())
}

/// The network must emit one score per class.
fn check_classes(network: &Network, classes: usize) -> Result<()> {
    if network.output_size() != Some(classes) {
        bail!(
            "network has {:?} outputs but the dataset has {} classes",
            network.output_size(),
            classes
        );
    }
    Ok(())
}

fn load_dataset(
    images: &Path,
    labels: &Path,
    classes: usize,
    limit: Option<usize>,
) -> Result<Dataset> {
    let mut data = load_idx_pair(images, labels, classes)
        .with_context(|| format!("loading {} / {}", images.display(), labels.display()))?;
    if let Some(n) = limit {
        data.truncate(n);
    }
    Ok(data)
}
