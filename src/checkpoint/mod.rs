//! Durable, self-describing checkpoints.
//!
//! A checkpoint is a single JSON object:
//!
//! ```json
//! {
//!   "input_size": 784,
//!   "output_size": 10,
//!   "hidden_sizes": [512, 256, 128],
//!   "state_dict": {
//!     "hidden_layers.0.bias": [...],
//!     "hidden_layers.0.weight": [[...], ...],
//!     "output.bias": [...],
//!     "output.weight": [[...], ...]
//!   }
//! }
//! ```
//!
//! Loading never needs a caller-supplied architecture: the network is
//! rebuilt from the three size fields and then filled from `state_dict`.

pub mod record;
pub mod store;

pub use record::CheckpointRecord;
pub use store::{load, load_record, save};
