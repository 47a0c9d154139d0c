//! Output sink for rendered documents.
//!
//! Overwrite-in-place writes into the published site tree. Feed documents
//! are keyed by `FeedId`, so the sink never has to sanitize album names.

use std::path::PathBuf;

use thiserror::Error;
use tokio::fs;

use crate::config::ResolvedConfig;
use crate::domain::FeedId;

/// Errors writing output documents
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes rendered documents into the site tree
#[derive(Debug, Clone)]
pub struct SiteSink {
    feeds_dir: PathBuf,
    index_path: PathBuf,
}

impl SiteSink {
    pub fn new(config: &ResolvedConfig) -> Self {
        Self {
            feeds_dir: config.feeds_dir(),
            index_path: config.index_path(),
        }
    }

    /// Path a feed document is published at
    pub fn feed_path(&self, id: &FeedId) -> PathBuf {
        self.feeds_dir.join(format!("{}.xml", id))
    }

    /// Write (or overwrite) one feed document
    pub async fn write_feed(&self, id: &FeedId, document: &str) -> Result<(), SinkError> {
        fs::create_dir_all(&self.feeds_dir).await?;
        fs::write(self.feed_path(id), document).await?;
        Ok(())
    }

    /// Write (or overwrite) the aggregate index document
    pub async fn write_index(&self, document: &str) -> Result<(), SinkError> {
        if let Some(parent) = self.index_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.index_path, document).await?;
        Ok(())
    }
}
