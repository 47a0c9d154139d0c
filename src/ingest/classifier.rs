//! Classification of raw filesystem signals.
//!
//! Two sources feed the watch loop: debounced notify events and the
//! periodic full-snapshot poll. Both are reduced here to the same small
//! vocabulary: a path was added, removed, or is of no interest. The
//! debouncer erases event kinds, so whether the path still exists at
//! classification time decides between added and removed.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::domain::is_media_path;

/// Action derived from one filesystem signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Candidate for admission; must still pass the write-completion probe
    Added(PathBuf),

    /// The path is gone and any catalog entry for it should go too
    Removed(PathBuf),

    /// Not media, or a directory
    Ignored,
}

/// Classify a single debounced event. `is_file` is the path's state at
/// the time the event was drained.
pub fn classify(path: &Path, is_file: bool) -> Change {
    if !is_media_path(path) {
        return Change::Ignored;
    }

    if is_file {
        Change::Added(path.to_path_buf())
    } else {
        Change::Removed(path.to_path_buf())
    }
}

/// Symmetric difference between the known path set and a fresh snapshot
#[derive(Debug, Default)]
pub struct SnapshotDiff {
    pub added: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

/// Diff a poll snapshot against the authoritative known set
pub fn diff(known: &HashSet<PathBuf>, current: &HashSet<PathBuf>) -> SnapshotDiff {
    SnapshotDiff {
        added: current.difference(known).cloned().collect(),
        removed: known.difference(current).cloned().collect(),
    }
}
