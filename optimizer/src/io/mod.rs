//! I/O helpers for the optimizer: configuration, script execution, artifacts
//! and prompt rendering.

pub mod artifacts;
pub mod config;
pub mod process;
pub mod prompt;
