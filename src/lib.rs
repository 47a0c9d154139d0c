//! albumcast - incremental album feed publisher
//!
//! Watches a music directory and keeps a catalog of media items plus
//! their derived feed documents (one RSS feed per album and an aggregate
//! HTML index) synchronized with the directory's contents, without a
//! full rescan on every change.
//!
//! # Architecture
//!
//! Change detection runs two independent sources: a debounced filesystem
//! event subscription (fast, best-effort) and a periodic full-snapshot
//! poll (slower, authoritative). Either alone is sufficient. A detected
//! file is only admitted once it has settled (size held for a full
//! probe interval, both ends readable), and every catalog
//! mutation is persisted before any feed document is rewritten, so a
//! crash mid-regeneration is recoverable from the snapshot.
//!
//! # Modules
//!
//! - `ingest`: watch loop, change classification, write-completion probe
//! - `sync`: the synchronization engine driving every catalog mutation
//! - `library`: the persisted catalog of admitted items
//! - `adapters`: tag extraction, document rendering, output writing
//! - `domain`: data structures (MediaItem, FeedId)
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # One-shot full synchronization
//! albumcast bootstrap
//!
//! # Bootstrap, then watch until interrupted
//! albumcast run
//!
//! # Inspect the catalog
//! albumcast catalog
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod ingest;
pub mod library;
pub mod sync;

// Re-export main types at crate root for convenience
pub use adapters::{MetadataExtractor, TagExtractor};
pub use config::ResolvedConfig;
pub use domain::{FeedId, MediaItem};
pub use ingest::{WatchHandle, Watcher};
pub use library::Catalog;
pub use sync::{AddOutcome, RemoveOutcome, SyncEngine};
