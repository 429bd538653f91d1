use std::time::Instant;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use crate::data::idx::argmax;
use crate::error::{check_len, Result};
use crate::loss::mse::MseLoss;
use crate::network::network::Network;
use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::TrainConfig;
use crate::train::trainer::train_epoch;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains `network` for `config.epochs` epochs and returns the statistics of
/// every completed epoch.
///
/// # Arguments
/// - `network`:      mutable reference to the network; modified in place
/// - `train_inputs`: training samples, each of the network's input size
/// - `train_labels`: corresponding targets, same length as `train_inputs`
/// - `validation`:   optional `(inputs, targets)` held-out set, scored after
///                    every epoch
/// - `config`:       epochs, learning rate, shuffling and logging
pub fn train_loop(
    network: &mut Network,
    train_inputs: &[Vec<f64>],
    train_labels: &[Vec<f64>],
    validation: Option<(&[Vec<f64>], &[Vec<f64>])>,
    config: &TrainConfig,
) -> Result<Vec<EpochStats>> {
    check_len("train labels", train_inputs.len(), train_labels.len())?;
    if let Some((vi, vl)) = validation {
        check_len("validation labels", vi.len(), vl.len())?;
        if vi.is_empty() {
            warn!("validation set is empty; accuracy will be reported as 0");
        }
    }

    let mut rng = config.shuffle_seed.map(ChaCha8Rng::seed_from_u64);
    let mut order: Vec<usize> = (0..train_inputs.len()).collect();
    let mut history = Vec::with_capacity(config.epochs);

    for epoch in 1..=config.epochs {
        let t_start = Instant::now();

        if let Some(rng) = rng.as_mut() {
            order.shuffle(rng);
        }

        // ── One full pass over the training data ───────────────────────────
        let train_loss = train_epoch(
            network,
            train_inputs,
            train_labels,
            config.learning_rate,
            &order,
            config.log_every,
        )?;

        // ── Validation ────────────────────────────────────────────────────
        let (val_loss, val_accuracy) = match validation {
            Some((vi, vl)) => (
                Some(evaluate_loss(network, vi, vl)?),
                Some(accuracy(network, vi, vl)?),
            ),
            None => (None, None),
        };

        let elapsed_ms = t_start.elapsed().as_millis() as u64;
        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            train_loss,
            val_loss,
            val_accuracy,
            elapsed_ms,
        };
        info!(
            epoch,
            total = config.epochs,
            train_loss,
            val_loss = ?stats.val_loss,
            val_accuracy = ?stats.val_accuracy,
            elapsed_ms,
            "epoch complete"
        );
        history.push(stats);
    }

    Ok(history)
}

/// Mean loss over a dataset without updating the network.
pub fn evaluate_loss(
    network: &Network,
    inputs: &[Vec<f64>],
    labels: &[Vec<f64>],
) -> Result<f64> {
    check_len("labels", inputs.len(), labels.len())?;
    if inputs.is_empty() {
        return Ok(0.0);
    }
    let mut total = 0.0;
    for (input, label) in inputs.iter().zip(labels) {
        let output = network.eval(input)?;
        check_len("label", output.len(), label.len())?;
        total += MseLoss::loss(&output, label);
    }
    Ok(total / inputs.len() as f64)
}

/// Percentage of samples whose output argmax matches the target argmax.
pub fn accuracy(
    network: &Network,
    inputs: &[Vec<f64>],
    labels: &[Vec<f64>],
) -> Result<f64> {
    check_len("labels", inputs.len(), labels.len())?;
    if inputs.is_empty() {
        return Ok(0.0);
    }
    let mut correct = 0usize;
    for (input, label) in inputs.iter().zip(labels) {
        let output = network.eval(input)?;
        check_len("label", output.len(), label.len())?;
        if argmax(&output) == argmax(label) {
            correct += 1;
        }
    }
    Ok(correct as f64 / inputs.len() as f64 * 100.0)
}
