use rand::Rng;

use crate::error::{NetError, Result};
use crate::math::matrix::Matrix;

/// Inverted dropout: in training mode each activation is zeroed with
/// probability `p` and survivors are scaled by `1 / (1 - p)`. The network
/// skips it entirely in evaluation mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dropout {
    p: f64,
}

impl Dropout {
    pub fn new(p: f64) -> Result<Dropout> {
        if !(0.0..1.0).contains(&p) {
            return Err(NetError::InvalidSpec(format!(
                "dropout probability must be in [0, 1), got {p}"
            )));
        }
        Ok(Dropout { p })
    }

    pub fn p(&self) -> f64 {
        self.p
    }

    /// Draws a `[rows, cols]` mask of `0` or `1/(1-p)`, or `None` when
    /// `p == 0` and dropout is a no-op.
    pub fn sample_mask<R: Rng + ?Sized>(&self, rows: usize, cols: usize, rng: &mut R) -> Option<Matrix> {
        if self.p == 0.0 {
            return None;
        }
        let scale = 1.0 / (1.0 - self.p);
        let data = (0..rows)
            .map(|_| {
                (0..cols)
                    .map(|_| if rng.gen_bool(self.p) { 0.0 } else { scale })
                    .collect()
            })
            .collect();
        Some(Matrix { rows, cols, data })
    }
}
