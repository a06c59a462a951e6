//! Shader lookups backed by background rescans.
//!
//! [`ScanCache`] keeps one [`ScanSnapshot`] per scope (typically a scene).
//! Lookups read whatever snapshot is current and then ask for a refresh. At
//! most one refresh runs at a time across the whole cache; a request that
//! arrives while one is running is dropped, since the host will look up (and
//! therefore ask) again shortly.
//!
//! Readers only ever take the scope map's read lock. The worker takes the
//! write lock briefly to swap in results it built beforehand, so a lookup
//! sees either the previous complete list, the placeholder, or the new
//! complete list.

use crate::collections::HashMap;
use crate::coordinator::{RefreshCoordinator, RefreshStats};
use crate::extractor::Extractor;
use crate::snapshot::{ScanSnapshot, placeholder};
use crate::worker::{RefreshRequest, ScanOptions, ScanOutcome, ScanWorker};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::trace;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Called with the scope name after its shader list was rebuilt. Errors are
/// logged and otherwise ignored.
pub type CompletionCallback = Arc<dyn Fn(&str) -> Result<(), BoxError> + Send + Sync>;

/// Broadcast to subscribers whenever cached data changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    Updated { scope: String },
}

pub struct ScanCache {
    scopes: Arc<RwLock<HashMap<String, ScanSnapshot>>>,
    coordinator: RefreshCoordinator,
    extractor: Arc<dyn Extractor>,
    options: ScanOptions,
    events: broadcast::Sender<ScanEvent>,
    runtime_handle: Handle,
}

impl ScanCache {
    /// Creates an empty cache whose refreshes run on `runtime_handle`.
    pub fn new(runtime_handle: Handle, extractor: Arc<dyn Extractor>, options: ScanOptions) -> Self {
        let (events, _) = broadcast::channel(options.event_capacity.max(1));

        Self {
            scopes: Arc::default(),
            coordinator: RefreshCoordinator::new(),
            extractor,
            options,
            events,
            runtime_handle,
        }
    }

    /// Current items of `category` in `scope`, in discovery order.
    ///
    /// Returns the placeholder if the scope was never scanned or the
    /// category has not been populated.
    pub fn get(&self, scope: &str, category: &str) -> Vec<String> {
        self.scopes
            .read()
            .get(scope)
            .and_then(|snapshot| snapshot.items(category))
            .map(<[String]>::to_vec)
            .unwrap_or_else(placeholder)
    }

    /// Looks up the shaders of `category` in `scope` and schedules a refresh
    /// of `paths`. Never waits for the refresh.
    ///
    /// The result is sorted case-insensitively.
    pub fn shaders_in_path(&self, scope: &str, paths: &[String], category: &str) -> Vec<String> {
        let mut shaders = self.get(scope, category);
        self.request_refresh(RefreshRequest::new(scope, paths.to_vec(), category));

        shaders.sort_by_cached_key(|name| name.to_lowercase());
        shaders
    }

    /// Spawns a background refresh unless one is already running.
    ///
    /// Returns `None` when the request was dropped. The handle can be
    /// awaited for the outcome, or ignored.
    pub fn request_refresh(&self, request: RefreshRequest) -> Option<JoinHandle<ScanOutcome>> {
        let Some(permit) = self.coordinator.try_begin() else {
            trace!(scope = %request.scope, "Refresh already running, dropping request");
            return None;
        };

        let worker = ScanWorker {
            scopes: Arc::clone(&self.scopes),
            extractor: Arc::clone(&self.extractor),
            options: self.options.clone(),
            events: self.events.clone(),
        };

        Some(self.runtime_handle.spawn(worker.run(permit, request)))
    }

    /// Receives a [`ScanEvent`] for every rebuilt scope.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.events.subscribe()
    }

    /// Whether a refresh is currently running.
    pub fn is_refreshing(&self) -> bool {
        self.coordinator.is_busy()
    }

    pub fn refresh_stats(&self) -> RefreshStats {
        self.coordinator.stats()
    }

    /// Scopes seen so far, sorted.
    pub fn scopes(&self) -> Vec<String> {
        let mut scopes: Vec<_> = self.scopes.read().keys().cloned().collect();
        scopes.sort();
        scopes
    }

    /// Categories of `scope` with their current item counts, sorted by name.
    pub fn categories(&self, scope: &str) -> Vec<(String, usize)> {
        let mut categories: Vec<_> = self
            .scopes
            .read()
            .get(scope)
            .map(|snapshot| {
                snapshot
                    .categories()
                    .map(|(category, items)| (category.to_string(), items.len()))
                    .collect()
            })
            .unwrap_or_default();

        categories.sort();
        categories
    }

    /// A copy of the current snapshot of `scope`.
    pub fn snapshot(&self, scope: &str) -> Option<ScanSnapshot> {
        self.scopes.read().get(scope).cloned()
    }
}

impl std::fmt::Debug for ScanCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanCache")
            .field("scopes", &self.scopes.read().len())
            .field("coordinator", &self.coordinator)
            .field("options", &self.options)
            .finish()
    }
}
