use rand::Rng;

use crate::math::matrix::Matrix;

/// Fully-connected layer: `y = x W^T + b`.
#[derive(Debug, Clone)]
pub struct Linear {
    pub weight: Matrix, // [out_features, in_features]
    pub bias: Vec<f64>, // [out_features]
}

/// Gradients of a loss with respect to one `Linear`'s parameters.
#[derive(Debug, Clone)]
pub struct LinearGrads {
    pub weight: Matrix,
    pub bias: Vec<f64>,
}

impl Linear {
    /// Weight and bias are drawn from `U(-1/sqrt(in), 1/sqrt(in))`.
    pub fn new<R: Rng + ?Sized>(in_features: usize, out_features: usize, rng: &mut R) -> Linear {
        let bound = 1.0 / (in_features as f64).sqrt();
        let weight = Matrix::uniform(out_features, in_features, bound, rng);
        let bias = (0..out_features)
            .map(|_| rng.gen_range(-bound..=bound))
            .collect();
        Linear { weight, bias }
    }

    pub fn in_features(&self) -> usize {
        self.weight.cols
    }

    pub fn out_features(&self) -> usize {
        self.weight.rows
    }

    /// Batch forward: `[batch, in] -> [batch, out]`.
    pub fn forward(&self, input: &Matrix) -> Matrix {
        (input * &self.weight.transpose()).add_row(&self.bias)
    }

    /// Given `grad_output = ∂L/∂y` for the batch and the input the forward
    /// pass saw, returns the parameter gradients and `∂L/∂x`.
    pub fn backward(&self, grad_output: &Matrix, input: &Matrix) -> (LinearGrads, Matrix) {
        // [out, batch] x [batch, in] = [out, in]
        let weight = &grad_output.transpose() * input;
        let bias = grad_output.column_sums();
        // [batch, out] x [out, in] = [batch, in]
        let grad_input = grad_output * &self.weight;
        (LinearGrads { weight, bias }, grad_input)
    }

    /// Applies pre-computed gradients scaled by lr.
    pub fn apply_gradients(&mut self, grads: &LinearGrads, lr: f64) {
        self.weight = self.weight.clone() - grads.weight.map(|x| x * lr);
        for (b, g) in self.bias.iter_mut().zip(&grads.bias) {
            *b -= g * lr;
        }
    }
}
