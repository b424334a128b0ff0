/// Element-wise rectifier.
pub fn relu(x: f64) -> f64 {
    if x > 0.0 { x } else { 0.0 }
}

/// Derivative of `relu` at the pre-activation `x` (0 at the kink).
pub fn relu_derivative(x: f64) -> f64 {
    if x > 0.0 { 1.0 } else { 0.0 }
}

/// Numerically stable log-softmax of one row:
///   out[i] = x[i] - (max + ln(sum(exp(x - max))))
///
/// `exp(out)` is a probability distribution over the row.
pub fn log_softmax(row: &[f64]) -> Vec<f64> {
    let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let log_sum = row.iter().map(|&x| (x - max).exp()).sum::<f64>().ln() + max;
    row.iter().map(|&x| x - log_sum).collect()
}
