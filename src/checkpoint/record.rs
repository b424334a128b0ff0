use serde::{Deserialize, Serialize};

use crate::error::{NetError, Result};
use crate::network::{expected_shapes, Network, NetworkSpec, ParameterSet};

/// On-disk layout of a checkpoint: the architecture fields plus the full
/// state dictionary, and nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckpointRecord {
    pub input_size: usize,
    pub output_size: usize,
    pub hidden_sizes: Vec<usize>,
    pub state_dict: ParameterSet,
}

impl CheckpointRecord {
    /// Snapshots `network`. The architecture is read from the live layers,
    /// so it always agrees with the parameters captured alongside it.
    pub fn from_network(network: &Network) -> Result<CheckpointRecord> {
        let state_dict = network.state_dict();
        if let Some((name, _)) = state_dict.iter().find(|(_, t)| !t.is_finite()) {
            return Err(NetError::NonFiniteParameter { name: name.to_owned() });
        }
        Ok(CheckpointRecord {
            input_size: network.input_size(),
            output_size: network.output_size(),
            hidden_sizes: network.hidden_sizes(),
            state_dict,
        })
    }

    /// The architecture stored in the record, validated.
    pub fn spec(&self) -> Result<NetworkSpec> {
        let spec = NetworkSpec {
            input_size: self.input_size,
            output_size: self.output_size,
            hidden_sizes: self.hidden_sizes.clone(),
        };
        spec.validate()
            .map_err(|e| NetError::corrupt(format!("stored architecture is invalid ({e})")))?;
        Ok(spec)
    }

    /// The stored architecture, after checking every `state_dict` entry
    /// against the shapes it implies. Works from the record alone, so a bogus
    /// width is caught here before any layer is allocated.
    pub fn check(&self) -> Result<NetworkSpec> {
        let spec = self.spec()?;
        self.state_dict.check_shapes(&expected_shapes(&spec.layer_dims()))?;
        Ok(spec)
    }

    /// Rebuilds the network from the stored architecture alone, then
    /// overwrites every freshly initialised parameter with its stored value.
    pub fn into_network(self) -> Result<Network> {
        let spec = self.check()?;
        let mut network = Network::build(&spec)?;
        network.load_state_dict(&self.state_dict)?;
        Ok(network)
    }
}
