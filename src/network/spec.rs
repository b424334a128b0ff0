use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NetError, Result};

/// Architecture of a fully-connected classifier.
///
/// `NetworkSpec` can be saved to / loaded from JSON independently of any
/// trained weights, so architectures can be kept as config files before
/// training starts. A checkpoint carries the same three fields at its top
/// level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Width of the input feature vector.
    pub input_size: usize,
    /// Number of output classes.
    pub output_size: usize,
    /// Width of each hidden layer, input side first. May be empty, in which
    /// case the network is a single linear map followed by log-softmax.
    pub hidden_sizes: Vec<usize>,
}

impl NetworkSpec {
    pub fn new(input_size: usize, output_size: usize, hidden_sizes: Vec<usize>) -> Result<NetworkSpec> {
        let spec = NetworkSpec { input_size, output_size, hidden_sizes };
        spec.validate()?;
        Ok(spec)
    }

    /// Checks that every width is strictly positive.
    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 {
            return Err(NetError::InvalidSpec("input_size must be positive".into()));
        }
        if self.output_size == 0 {
            return Err(NetError::InvalidSpec("output_size must be positive".into()));
        }
        if let Some(i) = self.hidden_sizes.iter().position(|&w| w == 0) {
            return Err(NetError::InvalidSpec(format!(
                "hidden_sizes[{i}] must be positive"
            )));
        }
        Ok(())
    }

    /// `(in_features, out_features)` of every linear transform, output last.
    pub fn layer_dims(&self) -> Vec<(usize, usize)> {
        let mut widths = Vec::with_capacity(self.hidden_sizes.len() + 2);
        widths.push(self.input_size);
        widths.extend_from_slice(&self.hidden_sizes);
        widths.push(self.output_size);
        widths.windows(2).map(|w| (w[0], w[1])).collect()
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let io_err = |source| NetError::Io { path: path.to_path_buf(), source };
        let file = std::fs::File::create(path).map_err(io_err)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self).map_err(|e| io_err(e.into()))
    }

    /// Deserializes and validates a `NetworkSpec` from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<NetworkSpec> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| NetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = std::io::BufReader::new(file);
        let spec: NetworkSpec = serde_json::from_reader(reader)
            .map_err(|e| NetError::InvalidSpec(format!("{}: {e}", path.display())))?;
        spec.validate()?;
        Ok(spec)
    }
}
