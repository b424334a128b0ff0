use serde::{Deserialize, Serialize};

/// Per-epoch training statistics emitted by `train_loop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    pub total_epochs: usize,
    /// Mean NLL over all training samples, measured in training mode while
    /// the epoch ran.
    pub train_loss: f64,
    /// Fraction of training samples whose arg-max matched, in [0, 1].
    pub train_accuracy: f64,
    /// Mean validation NLL in evaluation mode, if a validation set was given.
    pub val_loss: Option<f64>,
    pub val_accuracy: Option<f64>,
    /// Wall-clock duration of the epoch, validation included.
    pub elapsed_ms: u64,
}
