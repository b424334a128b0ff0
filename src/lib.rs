pub mod activation;
pub mod checkpoint;
pub mod error;
pub mod layers;
pub mod loss;
pub mod math;
pub mod network;
pub mod optim;
pub mod train;

// Convenience re-exports
pub use checkpoint::{load, save, CheckpointRecord};
pub use error::{NetError, Result, ShapeMismatch};
pub use layers::{Linear, LinearGrads};
pub use loss::NllLoss;
pub use math::Matrix;
pub use network::{Network, NetworkSpec, ParamTensor, ParameterSet};
pub use optim::Sgd;
pub use train::{evaluate, train_loop, EpochStats, TrainConfig};
