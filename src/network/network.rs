use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::activation::{log_softmax, relu, relu_derivative};
use crate::error::{NetError, Result};
use crate::layers::{Dropout, Linear, LinearGrads};
use crate::math::matrix::Matrix;
use crate::network::parameters::{
    expected_shapes, param_name, LayerId, ParamKind, ParamTensor, ParameterSet,
};
use crate::network::spec::NetworkSpec;

/// Dropout probability of a freshly built network.
pub const DEFAULT_DROPOUT: f64 = 0.5;

/// Feed-forward classifier:
/// input → [Linear → ReLU → Dropout]* → Linear → log-softmax.
///
/// Dropout is only active in training mode, which is the mode a network is
/// built (and loaded) in. Call [`Network::eval`] before inference.
#[derive(Debug, Clone)]
pub struct Network {
    pub hidden_layers: Vec<Linear>,
    pub output: Linear,
    dropout: Dropout,
    training: bool,
    rng: StdRng,
}

/// Intermediates of one forward pass, consumed by [`Network::backward`].
#[derive(Debug, Clone)]
pub struct ForwardPass {
    /// Log-probabilities, one row per sample.
    pub log_probs: Matrix,
    // Input seen by each linear transform, output layer last.
    inputs: Vec<Matrix>,
    // Per hidden layer.
    pre_activations: Vec<Matrix>,
    masks: Vec<Option<Matrix>>,
}

impl Network {
    /// Builds a network with freshly, independently initialised parameters.
    pub fn build(spec: &NetworkSpec) -> Result<Network> {
        Network::build_seeded(spec, rand::thread_rng().gen())
    }

    /// Same as [`Network::build`], but initialisation and dropout masks are
    /// driven by a generator seeded with `seed`.
    pub fn build_seeded(spec: &NetworkSpec, seed: u64) -> Result<Network> {
        spec.validate()?;
        let mut rng = StdRng::seed_from_u64(seed);

        let dims = spec.layer_dims();
        let (hidden_dims, output_dim) = dims.split_at(dims.len() - 1);
        let hidden_layers = hidden_dims
            .iter()
            .map(|&(fan_in, width)| Linear::new(fan_in, width, &mut rng))
            .collect();
        let output = Linear::new(output_dim[0].0, output_dim[0].1, &mut rng);

        debug!(
            "built network {} -> {:?} -> {}",
            spec.input_size, spec.hidden_sizes, spec.output_size
        );

        Ok(Network {
            hidden_layers,
            output,
            dropout: Dropout::new(DEFAULT_DROPOUT)?,
            training: true,
            rng,
        })
    }

    /// Replaces the dropout probability; must lie in `[0, 1)`.
    pub fn with_dropout(mut self, p: f64) -> Result<Network> {
        self.dropout = Dropout::new(p)?;
        Ok(self)
    }

    pub fn dropout(&self) -> f64 {
        self.dropout.p()
    }

    /// Enables dropout.
    pub fn train(&mut self) {
        self.training = true;
    }

    /// Disables dropout; forward passes become deterministic.
    pub fn eval(&mut self) {
        self.training = false;
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    pub fn input_size(&self) -> usize {
        self.hidden_layers
            .first()
            .unwrap_or(&self.output)
            .in_features()
    }

    pub fn output_size(&self) -> usize {
        self.output.out_features()
    }

    /// Output width of each hidden linear transform, in forward order.
    pub fn hidden_sizes(&self) -> Vec<usize> {
        self.hidden_layers.iter().map(Linear::out_features).collect()
    }

    /// The architecture, read back from the live layers.
    pub fn spec(&self) -> NetworkSpec {
        NetworkSpec {
            input_size: self.input_size(),
            output_size: self.output_size(),
            hidden_sizes: self.hidden_sizes(),
        }
    }

    /// All linear transforms, output last.
    pub fn linears(&self) -> impl Iterator<Item = &Linear> {
        self.hidden_layers.iter().chain(std::iter::once(&self.output))
    }

    pub fn linears_mut(&mut self) -> impl Iterator<Item = &mut Linear> {
        self.hidden_layers.iter_mut().chain(std::iter::once(&mut self.output))
    }

    fn named_linears(&self) -> impl Iterator<Item = (LayerId, &Linear)> {
        self.hidden_layers
            .iter()
            .enumerate()
            .map(|(i, l)| (LayerId::Hidden(i), l))
            .chain(std::iter::once((LayerId::Output, &self.output)))
    }

    /// Number of learned scalars.
    pub fn parameter_count(&self) -> usize {
        self.linears()
            .map(|l| l.weight.rows * l.weight.cols + l.bias.len())
            .sum()
    }

    /// Log-probabilities for a batch, one row per sample.
    pub fn forward(&mut self, input: &Matrix) -> Result<Matrix> {
        self.forward_pass(input).map(|pass| pass.log_probs)
    }

    /// Forward pass that keeps what [`Network::backward`] needs.
    ///
    /// Every row of `input` must be `input_size` wide; otherwise the first
    /// offending width is reported as `InputMismatch`.
    pub fn forward_pass(&mut self, input: &Matrix) -> Result<ForwardPass> {
        let width = self.input_size();
        let ragged = input.data.iter().map(Vec::len).find(|&len| len != width);
        if input.cols != width || ragged.is_some() {
            return Err(NetError::InputMismatch {
                expected: width,
                found: ragged.unwrap_or(input.cols),
            });
        }

        let depth = self.hidden_layers.len();
        let mut inputs = Vec::with_capacity(depth + 1);
        let mut pre_activations = Vec::with_capacity(depth);
        let mut masks = Vec::with_capacity(depth);

        let mut x = input.clone();
        for layer in &self.hidden_layers {
            let z = layer.forward(&x);
            let mut a = z.map(relu);
            let mask = if self.training {
                self.dropout.sample_mask(a.rows, a.cols, &mut self.rng)
            } else {
                None
            };
            if let Some(m) = &mask {
                a = a.hadamard(m);
            }
            inputs.push(std::mem::replace(&mut x, a));
            pre_activations.push(z);
            masks.push(mask);
        }

        let logits = self.output.forward(&x);
        inputs.push(x);

        Ok(ForwardPass {
            log_probs: logits.map_rows(log_softmax),
            inputs,
            pre_activations,
            masks,
        })
    }

    /// Back-propagates `grad_logits = ∂L/∂logits` through the pass and
    /// returns one `LinearGrads` per linear transform, output last.
    ///
    /// # Panics
    /// Panics if `pass` was produced by a network of a different shape.
    pub fn backward(&self, pass: &ForwardPass, grad_logits: &Matrix) -> Vec<LinearGrads> {
        let depth = self.hidden_layers.len();
        let mut grads = Vec::with_capacity(depth + 1);

        let (output_grads, mut grad) = self.output.backward(grad_logits, &pass.inputs[depth]);

        for i in (0..depth).rev() {
            if let Some(mask) = &pass.masks[i] {
                grad = grad.hadamard(mask);
            }
            let grad_z = grad.hadamard(&pass.pre_activations[i].map(relu_derivative));
            let (layer_grads, grad_input) = self.hidden_layers[i].backward(&grad_z, &pass.inputs[i]);
            grads.push(layer_grads);
            grad = grad_input;
        }

        grads.reverse();
        grads.push(output_grads);
        grads
    }

    /// Arg-max class of every row, under the current mode.
    pub fn predict(&mut self, input: &Matrix) -> Result<Vec<usize>> {
        Ok(self.forward(input)?.row_argmax())
    }

    /// Snapshot of every weight and bias, keyed by layer position and kind.
    pub fn state_dict(&self) -> ParameterSet {
        let mut params = ParameterSet::new();
        for (id, layer) in self.named_linears() {
            params.insert(param_name(id, ParamKind::Weight), ParamTensor::from(&layer.weight));
            params.insert(param_name(id, ParamKind::Bias), ParamTensor::from(layer.bias.as_slice()));
        }
        params
    }

    /// Overwrites every parameter with the matching entry of `params`.
    ///
    /// Strict and all-or-nothing: every entry is validated before anything
    /// is assigned, so on error the network is unchanged. Missing,
    /// unexpected, or ragged entries are `CorruptCheckpoint`; entries of the
    /// wrong shape are reported together as `ShapeMismatch`.
    pub fn load_state_dict(&mut self, params: &ParameterSet) -> Result<()> {
        let dims: Vec<(usize, usize)> = self
            .linears()
            .map(|l| (l.in_features(), l.out_features()))
            .collect();
        params.check_shapes(&expected_shapes(&dims))?;

        // Shapes matched, so weights are matrices and biases are vectors.
        let depth = self.hidden_layers.len();
        for (i, layer) in self.linears_mut().enumerate() {
            let id = LayerId::at(i, depth);
            if let Some(ParamTensor::Matrix(rows)) = params.get(&param_name(id, ParamKind::Weight)) {
                layer.weight = Matrix::from_data(rows.clone());
            }
            if let Some(ParamTensor::Vector(values)) = params.get(&param_name(id, ParamKind::Bias)) {
                layer.bias = values.clone();
            }
        }
        Ok(())
    }
}
