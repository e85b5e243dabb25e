//! abtox-common — Shared errors, the sandboxed HTTP client, and the run
//! configuration schema used across all abtox crates.

pub mod error;
pub mod run_config;
pub mod sandbox;

// Re-export commonly used types
pub use error::{AbtoxError, Result};
pub use run_config::{FilterConfig, OutputConfig, RegistryConfig, RunConfig};
