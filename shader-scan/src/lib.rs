//! Background, non-blocking cache of shaders discovered in search directories.
//!
//! This crate provides:
//! - Annotation based visibility filtering: [`annotation`] module
//! - The external metadata extractor contract: [`extractor`] module
//! - Per-scope snapshots of directory timestamps and categorized items: [`snapshot`] module
//! - The refresh lock shared by all scopes of a cache: [`coordinator`] module
//! - The background rescan task: [`worker`] module
//! - The lookup facade hosts talk to: [`cache`] module
//!
//! Lookups never wait for a scan. They return the last complete result (or
//! [`PLACEHOLDER`]) and ask for a refresh, which is dropped when another one
//! is still running.
//!
//! # Examples
//!
//! ```no_run
//! use shader_scan::{ScanCache, ScanOptions, ShaderInfoTool};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let extractor = Arc::new(ShaderInfoTool::new("shaderinfo"));
//! let cache = ScanCache::new(
//!     tokio::runtime::Handle::current(),
//!     extractor,
//!     ScanOptions::default(),
//! );
//!
//! let paths = vec![String::from("/opt/shaders")];
//! let surfaces = cache.shaders_in_path("scene", &paths, "surface");
//! println!("{:?}", surfaces);
//! # }
//! ```

// Internal collection type aliases (not re-exported)
mod collections;

pub mod error;

// Shader annotation parsing
pub mod annotation;

// External shader metadata tool
pub mod extractor;

// Cached scan results
pub mod snapshot;

// Single outstanding refresh per cache
pub mod coordinator;

// Background directory rescans
pub mod worker;

// Lookup facade
pub mod cache;

#[cfg(test)]
mod testing;

pub use annotation::is_visible;
pub use cache::{BoxError, CompletionCallback, ScanCache, ScanEvent};
pub use coordinator::{RefreshCoordinator, RefreshPermit, RefreshStats};
pub use error::{Result, ScanError};
pub use extractor::{BasicInfo, Extractor, ShaderInfoTool};
pub use snapshot::{DEFAULT_CATEGORIES, DirectoryRecord, PLACEHOLDER, ScanSnapshot, placeholder};
pub use worker::{RefreshRequest, ScanOptions, ScanOutcome};
