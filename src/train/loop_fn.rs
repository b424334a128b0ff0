use std::sync::atomic::Ordering;
use std::time::Instant;

use log::info;
use rand::seq::SliceRandom;

use crate::error::Result;
use crate::loss::nll::NllLoss;
use crate::math::matrix::Matrix;
use crate::network::Network;
use crate::optim::sgd::Sgd;
use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::TrainConfig;

/// Rows per forward pass when evaluating.
const EVAL_CHUNK: usize = 256;

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Trains `network` for `config.epochs` epochs and returns the mean training
/// loss of the **last completed epoch**.
///
/// # Arguments
/// - `network`:      the network to train; its parameters are modified in place
/// - `train_inputs`: training samples, each a `Vec<f64>` of length `input_size`
/// - `train_labels`: target class index of each sample
/// - `val_inputs`:   optional validation samples
/// - `val_labels`:   optional validation targets (required iff `val_inputs` is `Some`)
/// - `optimizer`:    SGD optimizer (carries learning rate)
/// - `config`:       hyperparameters, optional progress channel, optional stop flag
///
/// Steps run in training mode (dropout on) and validation in evaluation
/// mode. The network's mode on entry is restored on return.
///
/// # Early termination
/// The loop breaks early if:
/// - the `progress_tx` receiver has been dropped, **or**
/// - `config.stop_flag` is set to `true`.
///
/// # Errors
/// `InputMismatch` if any training or validation sample is not
/// `input_size` wide.
///
/// # Panics
/// Panics if `train_inputs` is empty, lengths mismatch, `batch_size == 0`,
/// or a label is not a valid class index.
pub fn train_loop(
    network: &mut Network,
    train_inputs: &[Vec<f64>],
    train_labels: &[usize],
    val_inputs: Option<&[Vec<f64>]>,
    val_labels: Option<&[usize]>,
    optimizer: &Sgd,
    config: &TrainConfig,
) -> Result<f64> {
    assert!(!train_inputs.is_empty(), "train_inputs must not be empty");
    assert_eq!(
        train_inputs.len(),
        train_labels.len(),
        "train_inputs and train_labels must have equal length"
    );
    assert_eq!(
        val_inputs.is_some(),
        val_labels.is_some(),
        "val_inputs and val_labels must be given together"
    );
    assert!(config.batch_size > 0, "batch_size must be at least 1");

    let was_training = network.is_training();
    let result = run_epochs(
        network,
        train_inputs,
        train_labels,
        val_inputs.zip(val_labels),
        optimizer,
        config,
    );
    if was_training {
        network.train();
    } else {
        network.eval();
    }
    result
}

/// Mean NLL and accuracy of `network` on a labelled set, in evaluation mode.
/// The network's mode on entry is restored on return.
///
/// Returns `InputMismatch` if any sample is not `input_size` wide.
///
/// # Panics
/// Panics if `inputs` and `labels` differ in length or a label is not a
/// valid class index.
pub fn evaluate(network: &mut Network, inputs: &[Vec<f64>], labels: &[usize]) -> Result<(f64, f64)> {
    assert_eq!(inputs.len(), labels.len(), "one label per input");
    if inputs.is_empty() {
        return Ok((0.0, 0.0));
    }

    let was_training = network.is_training();
    network.eval();

    let mut total_loss = 0.0;
    let mut correct = 0usize;
    let mut outcome = Ok(());
    for (xs, ys) in inputs.chunks(EVAL_CHUNK).zip(labels.chunks(EVAL_CHUNK)) {
        match network.forward(&Matrix::from_data(xs.to_vec())) {
            Ok(log_probs) => {
                total_loss += NllLoss::loss(&log_probs, ys) * ys.len() as f64;
                correct += count_correct(&log_probs, ys);
            }
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }

    if was_training {
        network.train();
    }
    outcome?;

    let n = inputs.len() as f64;
    Ok((total_loss / n, correct as f64 / n))
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn run_epochs(
    network: &mut Network,
    train_inputs: &[Vec<f64>],
    train_labels: &[usize],
    validation: Option<(&[Vec<f64>], &[usize])>,
    optimizer: &Sgd,
    config: &TrainConfig,
) -> Result<f64> {
    let mut last_train_loss = 0.0;

    for epoch in 1..=config.epochs {
        if stop_requested(config) {
            break;
        }

        let t_start = Instant::now();

        network.train();
        let (train_loss, train_accuracy) = run_one_epoch(
            network,
            train_inputs,
            train_labels,
            optimizer,
            config.batch_size,
        )?;
        last_train_loss = train_loss;

        let (val_loss, val_accuracy) = match validation {
            Some((vi, vl)) => {
                let (loss, acc) = evaluate(network, vi, vl)?;
                (Some(loss), Some(acc))
            }
            None => (None, None),
        };

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            train_loss,
            train_accuracy,
            val_loss,
            val_accuracy,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };

        if config.print_every > 0 && (epoch % config.print_every == 0 || epoch == config.epochs) {
            log_epoch(&stats);
        }

        if let Some(ref tx) = config.progress_tx {
            // If the receiver has been dropped, stop training.
            if tx.send(stats).is_err() {
                break;
            }
        }
    }

    Ok(last_train_loss)
}

/// One full pass of mini-batch SGD over the training data, in shuffled
/// order. Returns the mean loss and the accuracy over all samples.
fn run_one_epoch(
    network: &mut Network,
    inputs: &[Vec<f64>],
    labels: &[usize],
    optimizer: &Sgd,
    batch_size: usize,
) -> Result<(f64, f64)> {
    let n = inputs.len();
    let mut total_loss = 0.0;
    let mut correct = 0usize;

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rand::thread_rng());

    for batch in indices.chunks(batch_size) {
        let x = Matrix::from_data(batch.iter().map(|&i| inputs[i].clone()).collect());
        let y: Vec<usize> = batch.iter().map(|&i| labels[i]).collect();

        let pass = network.forward_pass(&x)?;
        total_loss += NllLoss::loss(&pass.log_probs, &y) * y.len() as f64;
        correct += count_correct(&pass.log_probs, &y);

        let grad_logits = NllLoss::logit_gradient(&pass.log_probs, &y);
        let grads = network.backward(&pass, &grad_logits);
        optimizer.step(network, &grads);
    }

    Ok((total_loss / n as f64, correct as f64 / n as f64))
}

fn count_correct(log_probs: &Matrix, labels: &[usize]) -> usize {
    log_probs
        .row_argmax()
        .iter()
        .zip(labels)
        .filter(|(p, l)| p == l)
        .count()
}

fn stop_requested(config: &TrainConfig) -> bool {
    config
        .stop_flag
        .as_ref()
        .is_some_and(|flag| flag.load(Ordering::Relaxed))
}

fn log_epoch(stats: &EpochStats) {
    match (stats.val_loss, stats.val_accuracy) {
        (Some(val_loss), Some(val_accuracy)) => info!(
            "epoch {}/{}: train loss {:.4}, train acc {:.3}, val loss {:.4}, val acc {:.3} ({} ms)",
            stats.epoch,
            stats.total_epochs,
            stats.train_loss,
            stats.train_accuracy,
            val_loss,
            val_accuracy,
            stats.elapsed_ms
        ),
        _ => info!(
            "epoch {}/{}: train loss {:.4}, train acc {:.3} ({} ms)",
            stats.epoch, stats.total_epochs, stats.train_loss, stats.train_accuracy, stats.elapsed_ms
        ),
    }
}
