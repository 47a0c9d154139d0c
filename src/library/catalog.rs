//! Versioned JSON snapshot of all admitted media items.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

use crate::domain::MediaItem;

/// Errors that can occur loading or persisting the catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Catalog of all admitted media items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Catalog format version
    pub version: u32,

    /// All admitted items, at most one per source path
    pub items: Vec<MediaItem>,

    /// Every album name ever admitted. Removal never prunes this set:
    /// an emptied album keeps its (stale) feed document, and therefore
    /// its index entry, until the next full bootstrap.
    #[serde(default)]
    pub albums: BTreeSet<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self {
            version: 1,
            items: Vec::new(),
            albums: BTreeSet::new(),
        }
    }

    /// Load a catalog snapshot from disk (absent file ⇒ empty catalog)
    pub async fn load(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Persist the full catalog snapshot, overwriting any previous one
    pub async fn save(&self, path: &Path) -> Result<(), CatalogError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;

        Ok(())
    }

    /// Insert an item, replacing any existing item at the same path
    pub fn insert(&mut self, item: MediaItem) {
        self.albums.insert(item.album.clone());

        if let Some(existing) = self.items.iter_mut().find(|i| i.path == item.path) {
            *existing = item;
        } else {
            self.items.push(item);
        }
    }

    /// Remove the item at a path, returning it if present
    pub fn remove_path(&mut self, path: &Path) -> Option<MediaItem> {
        let pos = self.items.iter().position(|i| i.path == path)?;
        Some(self.items.remove(pos))
    }

    /// Get the item at a path
    pub fn get(&self, path: &Path) -> Option<&MediaItem> {
        self.items.iter().find(|i| i.path == path)
    }

    /// Check whether a path is already cataloged
    pub fn contains(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }

    /// All cataloged source paths
    pub fn paths(&self) -> Vec<PathBuf> {
        self.items.iter().map(|i| i.path.clone()).collect()
    }

    /// Items belonging to an album, sorted by title descending (the
    /// order feed documents are published in)
    pub fn album_items(&self, album: &str) -> Vec<&MediaItem> {
        let mut items: Vec<_> = self.items.iter().filter(|i| i.album == album).collect();
        items.sort_by(|a, b| b.title.cmp(&a.title));
        items
    }

    /// All registered album names, sorted
    pub fn album_names(&self) -> Vec<&str> {
        self.albums.iter().map(String::as_str).collect()
    }

    /// Get the number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the catalog has no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
