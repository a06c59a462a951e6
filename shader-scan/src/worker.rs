//! Background rescans of the watched directories.
//!
//! A worker is spawned for a [`RefreshRequest`] only after it obtained the
//! cache's [`RefreshPermit`]. It first checks whether any watched directory
//! changed since the last scan and, if none did, waits for the cool-down and
//! leaves the cache untouched. Otherwise it replaces every category with the
//! placeholder, runs the extractor on every shader file, and commits the new
//! categories together with the directory timestamps it observed.
//!
//! Files the extractor fails on are skipped, and so are directories that
//! cannot be listed. Neither stops the rest of the scan.

use crate::annotation::is_visible;
use crate::cache::{CompletionCallback, ScanEvent};
use crate::collections::HashMap;
use crate::coordinator::RefreshPermit;
use crate::error::{Result, ScanError};
use crate::extractor::{BasicInfo, Extractor};
use crate::snapshot::{ScanSnapshot, modified_secs};
use parking_lot::RwLock;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Tuning knobs shared by all refreshes of a cache.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// File extension of shader files, without the dot
    pub extension: String,
    /// How long a refresh that found nothing to do keeps the permit
    pub cooldown: Duration,
    /// Buffered [`ScanEvent`]s per subscriber
    pub event_capacity: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extension: String::from("sdl"),
            cooldown: Duration::from_secs(2),
            event_capacity: 16,
        }
    }
}

impl ScanOptions {
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

/// What a host asks the cache to refresh.
#[derive(Clone)]
pub struct RefreshRequest {
    pub scope: String,
    pub paths: Vec<String>,
    /// Category the triggering lookup asked for
    pub category: String,
    pub on_complete: Option<CompletionCallback>,
}

impl RefreshRequest {
    pub fn new(scope: impl Into<String>, paths: Vec<String>, category: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            paths,
            category: category.into(),
            on_complete: None,
        }
    }

    pub fn with_on_complete(mut self, callback: CompletionCallback) -> Self {
        self.on_complete = Some(callback);
        self
    }
}

impl std::fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshRequest")
            .field("scope", &self.scope)
            .field("paths", &self.paths)
            .field("category", &self.category)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// Result of a refresh that got past the permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// No watched directory changed; nothing was touched.
    Fresh,
    /// The scope was rebuilt from scratch.
    Rebuilt {
        /// Visible shaders now cached
        items: usize,
        /// Hidden shaders left out
        hidden: usize,
        /// Files the extractor failed on
        skipped: usize,
    },
}

#[derive(Debug, Default)]
struct Tally {
    items: usize,
    hidden: usize,
    skipped: usize,
}

pub(crate) struct ScanWorker {
    pub(crate) scopes: Arc<RwLock<HashMap<String, ScanSnapshot>>>,
    pub(crate) extractor: Arc<dyn Extractor>,
    pub(crate) options: ScanOptions,
    pub(crate) events: broadcast::Sender<ScanEvent>,
}

impl ScanWorker {
    pub(crate) async fn run(self, permit: RefreshPermit, request: RefreshRequest) -> ScanOutcome {
        let scope = request.scope.as_str();

        // Only this worker writes while it holds the permit, so the record
        // can be checked outside the lock and written back afterwards.
        let mut directories = self
            .scopes
            .write()
            .entry(scope.to_string())
            .or_insert_with(ScanSnapshot::new)
            .directories
            .clone();

        let Some(stale) = directories.find_stale(&request.paths).map(str::to_string) else {
            if let Some(snapshot) = self.scopes.write().get_mut(scope) {
                snapshot.directories = directories;
            }

            debug!(
                scope,
                category = %request.category,
                "No watched directory changed since the last scan"
            );
            tokio::time::sleep(self.options.cooldown).await;
            drop(permit);
            return ScanOutcome::Fresh;
        };

        debug!(
            scope,
            category = %request.category,
            directory = %stale,
            "Directory changed, rebuilding shader list"
        );
        if let Some(snapshot) = self.scopes.write().get_mut(scope) {
            snapshot.mark_loading();
        }

        let started = Instant::now();
        let mut categories: HashMap<String, Vec<String>> = HashMap::default();
        let mut tally = Tally::default();

        for path in &request.paths {
            // Everything in the directory as of this time gets accounted for below
            match modified_secs(path) {
                Ok(mtime) => directories.record(path, mtime),
                Err(e) => debug!("Cannot read modification time of {}: {}", path, e),
            }

            let files = match shader_files(Path::new(path), &self.options.extension).await {
                Ok(files) => files,
                Err(e) => {
                    warn!("Skipping shader directory: {}", e);
                    continue;
                }
            };

            for file in files {
                match self.describe(&file).await {
                    Ok(Some(info)) => {
                        categories.entry(info.category).or_default().push(info.name);
                        tally.items += 1;
                    }
                    Ok(None) => {
                        debug!("Hiding {} because of its visibility annotation", file.display());
                        tally.hidden += 1;
                    }
                    Err(e) => {
                        warn!("Skipping shader: {}", e);
                        tally.skipped += 1;
                    }
                }
            }
        }

        if let Some(snapshot) = self.scopes.write().get_mut(scope) {
            snapshot.commit(directories, categories);
        }
        drop(permit);

        info!(
            scope,
            items = tally.items,
            hidden = tally.hidden,
            skipped = tally.skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Rebuilt shader list"
        );

        self.notify(&request);

        ScanOutcome::Rebuilt {
            items: tally.items,
            hidden: tally.hidden,
            skipped: tally.skipped,
        }
    }

    /// Extracts the shader's info, or `None` if its annotations hide it.
    async fn describe(&self, path: &Path) -> Result<Option<BasicInfo>> {
        let info = self.extractor.basic_info(path).await?;
        let annotations = self.extractor.annotations(path).await?;

        if !is_visible(&annotations) {
            return Ok(None);
        }

        Ok(Some(info))
    }

    fn notify(&self, request: &RefreshRequest) {
        // Fails only when nobody subscribed
        let _ = self.events.send(ScanEvent::Updated {
            scope: request.scope.clone(),
        });

        if let Some(callback) = &request.on_complete {
            let scope = request.scope.as_str();
            match std::panic::catch_unwind(AssertUnwindSafe(|| callback(scope))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(scope, "Completion callback failed: {}", e),
                Err(_) => debug!(scope, "Completion callback panicked"),
            }
        }
    }
}

/// Lists the regular files directly inside `dir` that have `extension`,
/// sorted by file name.
pub(crate) async fn shader_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let read_dir_error = |source| ScanError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_dir_error)?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(read_dir_error)? {
        let path = entry.path();

        if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
            continue;
        }

        // Follows symlinks so linked shaders are picked up
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => debug!("Cannot stat {}: {}", path.display(), e),
        }
    }

    files.sort();
    Ok(files)
}
