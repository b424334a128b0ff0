pub mod functions;

pub use functions::{log_softmax, relu, relu_derivative};
