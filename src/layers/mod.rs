pub mod dense;
pub mod dropout;

pub use dense::{Linear, LinearGrads};
pub use dropout::Dropout;
