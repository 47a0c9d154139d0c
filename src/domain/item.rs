//! Media item record and collection identity.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// File extensions admitted as media.
pub const MEDIA_EXTENSIONS: [&str; 2] = ["mp3", "m4a"];

/// Check if a path carries a recognized media extension.
///
/// Directories and files with any other extension are never media,
/// regardless of content.
pub fn is_media_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MEDIA_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Feed identifier (SHA256(album name)[0:16]).
///
/// Names the feed output document, so album names never have to be
/// filesystem- or URL-safe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedId(String);

impl FeedId {
    /// Derive the feed ID for an album name
    pub fn from_album(album: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(album.as_bytes());
        let result = hasher.finalize();

        Self(hex::encode(&result[..8]))
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FeedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One admitted media file.
///
/// Items are replaced whole on re-admission; nothing mutates individual
/// fields after extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    /// Absolute source path (unique key within the catalog)
    pub path: PathBuf,

    /// Album the item belongs to (its feed collection)
    pub album: String,

    /// Display title
    pub title: String,

    /// Playback duration in whole seconds
    pub duration_secs: u64,

    /// Public URL, relative to the site root
    pub url: String,

    /// File size in bytes
    pub size_bytes: u64,

    /// Filesystem creation time (modification time where unavailable)
    pub created_at: DateTime<Utc>,

    /// Thumbnail URL, relative to the site root
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl MediaItem {
    /// Stable content identifier (SHA256(album + title)[0:16]), used as
    /// the item guid in feed documents.
    pub fn guid(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.album.as_bytes());
        hasher.update(self.title.as_bytes());
        let result = hasher.finalize();

        hex::encode(&result[..8])
    }

    /// Feed ID of the collection this item belongs to
    pub fn feed_id(&self) -> FeedId {
        FeedId::from_album(&self.album)
    }

    /// Duration formatted as HH:MM:SS for feed documents
    pub fn duration_hhmmss(&self) -> String {
        let hours = self.duration_secs / 3600;
        let minutes = (self.duration_secs % 3600) / 60;
        let seconds = self.duration_secs % 60;
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }

    /// MIME type derived from the file extension
    pub fn mime_type(&self) -> &'static str {
        match self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("m4a") => "audio/mp4",
            _ => "audio/mpeg",
        }
    }
}
