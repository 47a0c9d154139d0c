//! Change detection for the watched media directory.
//!
//! Two independent sources drive the synchronization engine:
//!
//! 1. **Events**: a debounced notify subscription: low latency, but may
//!    be unavailable on some filesystems or drop events under load
//! 2. **Polling**: a periodic full-snapshot scan: higher latency,
//!    unconditionally correct, and the authority whenever the two
//!    disagree
//!
//! # Architecture
//!
//! ```text
//! media dir ── notify ──┐
//!                       ├─→ classifier ─→ workers ─→ SyncEngine
//! media dir ── poll ────┘       (quiescence probe per added path)
//! ```

pub mod classifier;
pub mod quiescence;
pub mod watcher;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::domain::is_media_path;

// Re-export key types
pub use classifier::{Change, SnapshotDiff};
pub use quiescence::Quiescence;
pub use watcher::{WatchHandle, Watcher, WatcherError};

/// Recursive snapshot of every media file under a directory.
///
/// Unreadable subtrees are skipped rather than surfaced; the next poll
/// cycle will see them again.
pub fn scan_media_paths(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_media_path(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}

/// Snapshot as a set, for diffing against the known paths
pub fn scan_media_set(dir: &Path) -> HashSet<PathBuf> {
    scan_media_paths(dir).into_iter().collect()
}
