//! Core numeric helpers

pub mod stats;

// Re-export commonly used types
pub use stats::{as_whole, mean_present, min_present, TrailingWindow};
