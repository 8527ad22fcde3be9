//! CLI command implementations

pub mod check;
pub mod diff;
pub mod snapshot;
pub mod sync;
