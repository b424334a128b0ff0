use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{NetError, Result, ShapeMismatch};
use crate::math::matrix::Matrix;

/// Numeric values of one parameter as stored in a checkpoint: a weight
/// matrix as a list of rows, or a bias as a flat list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamTensor {
    Matrix(Vec<Vec<f64>>),
    Vector(Vec<f64>),
}

impl ParamTensor {
    /// `[rows, cols]` or `[len]`. For a ragged matrix `cols` is the first
    /// row's length; check [`ParamTensor::is_rectangular`] first.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            ParamTensor::Matrix(rows) => vec![rows.len(), rows.first().map_or(0, Vec::len)],
            ParamTensor::Vector(values) => vec![values.len()],
        }
    }

    pub fn is_rectangular(&self) -> bool {
        match self {
            ParamTensor::Matrix(rows) => {
                let cols = rows.first().map_or(0, Vec::len);
                rows.iter().all(|r| r.len() == cols)
            }
            ParamTensor::Vector(_) => true,
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            ParamTensor::Matrix(rows) => rows.iter().flatten().all(|x| x.is_finite()),
            ParamTensor::Vector(values) => values.iter().all(|x| x.is_finite()),
        }
    }
}

impl From<&Matrix> for ParamTensor {
    fn from(m: &Matrix) -> Self {
        ParamTensor::Matrix(m.data.clone())
    }
}

impl From<&[f64]> for ParamTensor {
    fn from(v: &[f64]) -> Self {
        ParamTensor::Vector(v.to_vec())
    }
}

/// Which half of a linear transform a parameter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Weight,
    Bias,
}

impl ParamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamKind::Weight => "weight",
            ParamKind::Bias => "bias",
        }
    }
}

/// Position of a linear transform inside the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerId {
    Hidden(usize),
    Output,
}

impl LayerId {
    /// Id of the `index`-th linear transform in a network with `depth`
    /// hidden layers.
    pub fn at(index: usize, depth: usize) -> LayerId {
        if index < depth {
            LayerId::Hidden(index)
        } else {
            LayerId::Output
        }
    }
}

/// Layer-qualified parameter name, e.g. `hidden_layers.0.weight` or
/// `output.bias`.
pub fn param_name(layer: LayerId, kind: ParamKind) -> String {
    match layer {
        LayerId::Hidden(i) => format!("hidden_layers.{i}.{}", kind.as_str()),
        LayerId::Output => format!("output.{}", kind.as_str()),
    }
}

/// Name and shape of every parameter of a network whose linear transforms
/// have the given `(in_features, out_features)`, in layer order.
pub fn expected_shapes(layer_dims: &[(usize, usize)]) -> Vec<(String, Vec<usize>)> {
    let depth = layer_dims.len().saturating_sub(1);
    layer_dims
        .iter()
        .enumerate()
        .flat_map(|(i, &(fan_in, width))| {
            let id = LayerId::at(i, depth);
            [
                (param_name(id, ParamKind::Weight), vec![width, fan_in]),
                (param_name(id, ParamKind::Bias), vec![width]),
            ]
        })
        .collect()
}

/// Every learned tensor of a network, keyed by [`param_name`]. Keys iterate
/// in sorted order, so serializing the same set twice gives the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, ParamTensor>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, tensor: ParamTensor) -> Option<ParamTensor> {
        self.0.insert(name.into(), tensor)
    }

    pub fn get(&self, name: &str) -> Option<&ParamTensor> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamTensor> {
        self.0.remove(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamTensor)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Checks this set against `expected` (see [`expected_shapes`]) without
    /// touching any network.
    ///
    /// Missing, unexpected, or ragged entries are `CorruptCheckpoint`; entries
    /// of the wrong shape are reported together as `ShapeMismatch`.
    pub fn check_shapes(&self, expected: &[(String, Vec<usize>)]) -> Result<()> {
        let mut missing = Vec::new();
        let mut mismatches = Vec::new();

        for (name, shape) in expected {
            let Some(tensor) = self.get(name) else {
                missing.push(name.as_str());
                continue;
            };
            if !tensor.is_rectangular() {
                return Err(NetError::corrupt(format!("parameter '{name}' has ragged rows")));
            }
            let stored = tensor.shape();
            if stored != *shape {
                mismatches.push(ShapeMismatch {
                    name: name.clone(),
                    stored,
                    expected: shape.clone(),
                });
            }
        }

        let unexpected: Vec<&str> = self
            .names()
            .filter(|name| !expected.iter().any(|(e, _)| e == name))
            .collect();

        if !missing.is_empty() || !unexpected.is_empty() {
            let mut reasons = Vec::new();
            if !missing.is_empty() {
                reasons.push(format!("missing parameter(s) {missing:?}"));
            }
            if !unexpected.is_empty() {
                reasons.push(format!("unexpected parameter(s) {unexpected:?}"));
            }
            return Err(NetError::corrupt(reasons.join("; ")));
        }
        if !mismatches.is_empty() {
            return Err(NetError::ShapeMismatch(mismatches));
        }
        Ok(())
    }

    /// Total number of scalars across all tensors.
    pub fn scalar_count(&self) -> usize {
        self.0.values().map(|t| t.shape().iter().product::<usize>()).sum()
    }
}
