use crate::math::matrix::Matrix;

/// Negative log-likelihood over log-probability rows, for use with the
/// network's log-softmax output.
pub struct NllLoss;

impl NllLoss {
    /// Mean over the batch of `-log_probs[i][targets[i]]`.
    ///
    /// # Panics
    /// Panics if `targets.len() != log_probs.rows` or a target is not a valid
    /// class index.
    pub fn loss(log_probs: &Matrix, targets: &[usize]) -> f64 {
        assert_eq!(log_probs.rows, targets.len(), "one target per row");
        if targets.is_empty() {
            return 0.0;
        }
        let total: f64 = log_probs
            .data
            .iter()
            .zip(targets)
            .map(|(row, &t)| -row[t])
            .sum();
        total / targets.len() as f64
    }

    /// Gradient of the mean NLL with respect to the pre-softmax logits.
    ///
    /// Log-softmax and NLL composed together simplify to
    ///   ∂L/∂z_ij = (softmax_ij - [j == target_i]) / batch
    /// so the log-softmax stage needs no separate Jacobian in the backward
    /// pass.
    pub fn logit_gradient(log_probs: &Matrix, targets: &[usize]) -> Matrix {
        assert_eq!(log_probs.rows, targets.len(), "one target per row");
        let scale = 1.0 / targets.len().max(1) as f64;
        let data = log_probs
            .data
            .iter()
            .zip(targets)
            .map(|(row, &t)| {
                assert!(t < row.len(), "target class {t} out of range for {} classes", row.len());
                row.iter()
                    .enumerate()
                    .map(|(j, &lp)| {
                        let one_hot = if j == t { 1.0 } else { 0.0 };
                        (lp.exp() - one_hot) * scale
                    })
                    .collect()
            })
            .collect();
        Matrix::from_data(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::log_softmax;

    #[test]
    fn uniform_prediction_costs_ln_classes() {
        let lp = Matrix::row_vector(log_softmax(&[0.0, 0.0, 0.0, 0.0]));
        let loss = NllLoss::loss(&lp, &[2]);
        assert!((loss - 4f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn gradient_rows_sum_to_zero() {
        let lp = Matrix::from_data(vec![log_softmax(&[1.0, 2.0, 0.5]), log_softmax(&[0.0, -1.0, 3.0])]);
        let grad = NllLoss::logit_gradient(&lp, &[0, 2]);
        for row in &grad.data {
            assert!(row.iter().sum::<f64>().abs() < 1e-12);
        }
        assert!(grad.data[0][0] < 0.0);
        assert!(grad.data[1][2] < 0.0);
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let logits = [0.3, -1.2, 2.0];
        let target = [1];
        let eps = 1e-6;
        let lp = Matrix::row_vector(log_softmax(&logits));
        let grad = NllLoss::logit_gradient(&lp, &target);
        for j in 0..logits.len() {
            let mut plus = logits;
            plus[j] += eps;
            let mut minus = logits;
            minus[j] -= eps;
            let numeric = (NllLoss::loss(&Matrix::row_vector(log_softmax(&plus)), &target)
                - NllLoss::loss(&Matrix::row_vector(log_softmax(&minus)), &target))
                / (2.0 * eps);
            assert!((numeric - grad.data[0][j]).abs() < 1e-6);
        }
    }
}
