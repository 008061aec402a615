//! CLI command implementations.

pub mod advise;
pub mod analyze;
pub mod common;
pub mod devices;
pub mod master;
pub mod params;
pub mod play;
