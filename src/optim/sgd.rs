use crate::layers::LinearGrads;
use crate::network::Network;

/// Plain stochastic gradient descent.
#[derive(Debug, Clone, Copy)]
pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }

    /// Applies one update to every linear transform. `grads` is in the order
    /// [`Network::backward`] returns it (hidden layers first, output last).
    pub fn step(&self, network: &mut Network, grads: &[LinearGrads]) {
        assert_eq!(
            grads.len(),
            network.hidden_layers.len() + 1,
            "one gradient per linear transform"
        );
        for (layer, g) in network.linears_mut().zip(grads) {
            layer.apply_gradients(g, self.learning_rate);
        }
    }
}
