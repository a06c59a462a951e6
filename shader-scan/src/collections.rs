//! Internal collection type aliases.
//!
//! Snapshots are keyed by short strings (scope names, directory paths and
//! category names), so we use `rustc_hash::FxHashMap` for them.

pub(crate) type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
