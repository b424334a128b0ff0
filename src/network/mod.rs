pub mod network;
pub mod parameters;
pub mod spec;

pub use network::{ForwardPass, Network, DEFAULT_DROPOUT};
pub use parameters::{expected_shapes, param_name, LayerId, ParamKind, ParamTensor, ParameterSet};
pub use spec::NetworkSpec;
