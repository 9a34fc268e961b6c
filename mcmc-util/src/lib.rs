//! Building blocks for Markov chain Monte Carlo samplers.

/// Log-domain categorical sampling shared by all full-conditional draws
pub mod categorical;

/// Per-sweep log-likelihood trace
pub mod chain;

pub use categorical::{sample_categorical_log, softmax};
pub use chain::McmcTrace;
