//! Domain types for the feed synchronizer.
//!
//! This module contains the core data structures:
//! - MediaItem: one admitted media file and its published metadata
//! - FeedId: address-derived identifier for a collection's feed document

pub mod item;

// Re-export commonly used types
pub use item::{is_media_path, FeedId, MediaItem, MEDIA_EXTENSIONS};
