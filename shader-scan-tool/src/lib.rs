//! Command line host for the shader scan cache.
//!
//! Loads a YAML configuration, sets up tracing and drives
//! [`shader_scan::ScanCache`] lookups the way an interactive host would.

pub mod tool_config;
pub mod tracing_config;
