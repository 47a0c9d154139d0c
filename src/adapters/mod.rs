//! Adapters for the collaborators the synchronization engine drives.
//!
//! The engine itself only decides *when* something happens; these modules
//! decide *how*: reading embedded audio tags, rendering feed and index
//! documents, and writing them into the published site tree.

pub mod render;
pub mod sink;
pub mod tags;

use std::path::Path;

use async_trait::async_trait;

use crate::domain::MediaItem;

// Re-export the production implementations
pub use render::{render_feed, render_index, IndexEntry};
pub use sink::SiteSink;
pub use tags::TagExtractor;

/// Trait for metadata extraction from a media file.
///
/// Contract: returns `None`, never an error, for unreadable files,
/// missing or unsupported tag data, and files without an album name. A
/// `Some` result is a fully populated item, public URL and thumbnail
/// fallback included.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Option<MediaItem>;
}
