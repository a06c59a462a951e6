//! Per-scope scan results.
//!
//! A [`ScanSnapshot`] pairs the modification time recorded for each watched
//! directory with the shader names found in them, grouped by category. The
//! worker never edits the category map in place while scanning: it builds a
//! complete replacement and commits it together with the new directory
//! timestamps.

use crate::collections::HashMap;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Returned while a scan is in progress or before one ever completed.
pub const PLACEHOLDER: &str = "Loading...";

/// Categories every new scope starts with.
pub const DEFAULT_CATEGORIES: [&str; 4] = ["surface", "displacement", "interior", "atmosphere"];

/// The placeholder as a lookup result.
pub fn placeholder() -> Vec<String> {
    vec![String::from(PLACEHOLDER)]
}

/// Modification time of `path` in seconds since the Unix epoch.
pub(crate) fn modified_secs(path: impl AsRef<Path>) -> std::io::Result<f64> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0))
}

/// Last observed modification time of each watched directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryRecord {
    times: HashMap<String, f64>,
}

impl DirectoryRecord {
    /// Recorded modification time of a directory, if it was ever seen.
    pub fn get(&self, path: &str) -> Option<f64> {
        self.times.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Records `mtime` for `path`. Recorded times never move backwards.
    pub(crate) fn record(&mut self, path: &str, mtime: f64) {
        let recorded = self.times.entry(path.to_string()).or_insert(0.0);
        *recorded = recorded.max(mtime);
    }

    /// Checks the directories in order and returns the first one whose
    /// on-disk modification time is newer than the recorded one.
    ///
    /// Unseen directories are recorded with `0.0`, which makes them stale as
    /// soon as they exist. Directories whose metadata cannot be read are not
    /// considered stale.
    pub(crate) fn find_stale<'a>(&mut self, paths: &'a [String]) -> Option<&'a str> {
        for path in paths {
            let recorded = *self.times.entry(path.clone()).or_insert(0.0);

            match modified_secs(path) {
                Ok(current) if recorded < current => return Some(path.as_str()),
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("Cannot read modification time of {}: {}", path, e);
                }
            }
        }

        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanSnapshot {
    pub(crate) directories: DirectoryRecord,
    /// Category -> shader names, in discovery order
    pub(crate) categories: HashMap<String, Vec<String>>,
}

impl ScanSnapshot {
    /// A snapshot for a scope seen for the first time.
    pub fn new() -> Self {
        let categories = DEFAULT_CATEGORIES
            .iter()
            .map(|category| (category.to_string(), Vec::new()))
            .collect();

        Self {
            directories: DirectoryRecord::default(),
            categories,
        }
    }

    /// Items of `category` in discovery order, `None` if not populated.
    pub fn items(&self, category: &str) -> Option<&[String]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.categories
            .iter()
            .map(|(category, items)| (category.as_str(), items.as_slice()))
    }

    pub fn directories(&self) -> &DirectoryRecord {
        &self.directories
    }

    /// Swaps every existing category's items for the placeholder.
    pub(crate) fn mark_loading(&mut self) {
        for items in self.categories.values_mut() {
            *items = placeholder();
        }
    }

    /// Replaces the categories wholesale together with the directory times
    /// observed while building them.
    pub(crate) fn commit(
        &mut self,
        directories: DirectoryRecord,
        categories: HashMap<String, Vec<String>>,
    ) {
        self.directories = directories;
        self.categories = categories;
    }
}

impl Default for ScanSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{FileTime, set_file_mtime};
    use tempfile::TempDir;

    fn path_string(dir: &TempDir) -> String {
        dir.path().to_string_lossy().to_string()
    }

    #[test]
    fn test_new_snapshot_has_default_categories() {
        let snapshot = ScanSnapshot::new();

        for category in DEFAULT_CATEGORIES {
            assert_eq!(snapshot.items(category), Some(&[][..]));
        }
        assert_eq!(snapshot.items("light"), None);
        assert!(snapshot.directories().is_empty());
    }

    #[test]
    fn test_unseen_directory_is_stale() {
        let dir = TempDir::new().unwrap();
        let paths = vec![path_string(&dir)];

        let mut record = DirectoryRecord::default();
        assert_eq!(record.find_stale(&paths), Some(paths[0].as_str()));
        assert_eq!(record.get(&paths[0]), Some(0.0));
    }

    #[test]
    fn test_recorded_directory_is_fresh_until_modified() {
        let dir = TempDir::new().unwrap();
        let paths = vec![path_string(&dir)];

        let mut record = DirectoryRecord::default();
        record.record(&paths[0], modified_secs(dir.path()).unwrap());
        assert_eq!(record.find_stale(&paths), None);

        // Only the directory itself changes, nothing inside it
        let later = FileTime::from_unix_time(FileTime::now().unix_seconds() + 60, 0);
        set_file_mtime(dir.path(), later).unwrap();

        assert_eq!(record.find_stale(&paths), Some(paths[0].as_str()));
    }

    #[test]
    fn test_staleness_stops_at_first_stale_directory() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let paths = vec![path_string(&first), path_string(&second)];

        let mut record = DirectoryRecord::default();
        assert_eq!(record.find_stale(&paths), Some(paths[0].as_str()));

        // The second path was never looked at
        assert_eq!(record.get(&paths[1]), None);
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_missing_directory_is_not_stale() {
        let dir = TempDir::new().unwrap();
        let paths = vec![dir.path().join("missing").to_string_lossy().to_string()];

        let mut record = DirectoryRecord::default();
        assert_eq!(record.find_stale(&paths), None);
    }

    #[test]
    fn test_recorded_times_never_decrease() {
        let mut record = DirectoryRecord::default();
        record.record("/shaders", 200.0);
        record.record("/shaders", 100.0);
        assert_eq!(record.get("/shaders"), Some(200.0));
    }

    #[test]
    fn test_mark_loading_and_commit() {
        let mut snapshot = ScanSnapshot::new();
        snapshot.mark_loading();

        for category in DEFAULT_CATEGORIES {
            assert_eq!(snapshot.items(category).unwrap(), &placeholder()[..]);
        }

        let mut directories = DirectoryRecord::default();
        directories.record("/shaders", 42.0);

        let mut categories = HashMap::default();
        categories.insert(String::from("light"), vec![String::from("spot")]);
        snapshot.commit(directories, categories);

        assert_eq!(snapshot.items("surface"), None);
        assert_eq!(snapshot.items("light").unwrap(), &[String::from("spot")][..]);
        assert_eq!(snapshot.directories().get("/shaders"), Some(42.0));
    }
}
