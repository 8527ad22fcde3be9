//! Common utilities for synchronization integration tests

#![allow(dead_code)]

pub mod fixtures;
pub mod recording;

// Re-export commonly used items
pub use fixtures::{document, project, solution, synchronizer};
pub use recording::RecordingSource;
