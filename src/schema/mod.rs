//! Schema module - Configuration, progress and result types for search runs.

mod config;
mod progress;

pub use config::*;
pub use progress::*;
