//! The engine behind every catalog mutation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::adapters::sink::SinkError;
use crate::adapters::{render_feed, render_index, IndexEntry, MetadataExtractor, SiteSink};
use crate::config::ResolvedConfig;
use crate::domain::FeedId;
use crate::ingest::quiescence::{self, Quiescence};
use crate::ingest::scan_media_paths;
use crate::library::{Catalog, CatalogError};

/// Errors that abort a synchronization step.
///
/// Both kinds leave the in-memory catalog intact; the failed path or
/// collection simply stays out of sync until the next change or
/// bootstrap touches it.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Catalog persistence failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Document write failed: {0}")]
    Output(#[from] SinkError),
}

/// Result of handling an added path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Extracted, cataloged, persisted, and feeds regenerated
    Admitted,

    /// The path is already cataloged (duplicate dispatch)
    AlreadyKnown,

    /// Another worker holds the dispatch marker for this path
    InFlight,

    /// Extraction declined the file (no tags, no album)
    Skipped,

    /// The file never settled within the probe budget
    TimedOut,

    /// The path vanished before it settled
    Gone,
}

/// Result of handling a removed path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotTracked,
}

/// Mutable engine state, guarded by one mutex.
///
/// `dispatched` is the dedup marker set: a path in it has passed the
/// write-completion probe and is between extraction and its terminal
/// outcome. Markers are set and cleared under the same lock as every
/// catalog mutation.
struct SyncState {
    catalog: Catalog,
    dispatched: HashSet<PathBuf>,
}

/// Synchronization engine
pub struct SyncEngine {
    config: Arc<ResolvedConfig>,
    extractor: Arc<dyn MetadataExtractor>,
    sink: SiteSink,
    state: Mutex<SyncState>,
}

impl SyncEngine {
    /// Create an engine, loading any previously persisted catalog
    pub async fn new(
        config: Arc<ResolvedConfig>,
        extractor: Arc<dyn MetadataExtractor>,
    ) -> Result<Self, SyncError> {
        let catalog = Catalog::load(&config.catalog_path()).await?;
        if !catalog.is_empty() {
            info!(items = catalog.len(), "Loaded persisted catalog");
        }

        Ok(Self {
            sink: SiteSink::new(&config),
            config,
            extractor,
            state: Mutex::new(SyncState {
                catalog,
                dispatched: HashSet::new(),
            }),
        })
    }

    /// Full synchronization: scan the media directory, extract every
    /// qualifying file, replace the catalog, persist it, and regenerate
    /// every feed plus the index. Returns the number of admitted items.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> Result<usize, SyncError> {
        let paths = scan_media_paths(&self.config.media_dir);
        let mut fresh = Catalog::new();

        for path in &paths {
            match self.extractor.extract(path).await {
                Some(item) => fresh.insert(item),
                None => debug!("Not admissible, skipping {}", path.display()),
            }
        }

        let admitted = fresh.len();
        info!(scanned = paths.len(), admitted, "Bootstrap scan complete");

        let mut state = self.state.lock().await;
        state.catalog = fresh;
        state.catalog.save(&self.config.catalog_path()).await?;
        self.regenerate_all(&state.catalog).await?;

        Ok(admitted)
    }

    /// Handle a path classified as added.
    ///
    /// Waits for the file to settle, extracts it, and admits it unless
    /// it is already cataloged or already being handled by a concurrent
    /// dispatch (the event source and a poll cycle racing on the same
    /// new file is normal).
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn handle_added(&self, path: &Path) -> Result<AddOutcome, SyncError> {
        match quiescence::settle(path, &self.config.quiescence).await {
            Quiescence::Stable => {}
            Quiescence::TimedOut => {
                info!("File never settled, abandoning");
                return Ok(AddOutcome::TimedOut);
            }
            Quiescence::Gone => return Ok(AddOutcome::Gone),
        }

        {
            let mut state = self.state.lock().await;
            if state.dispatched.contains(path) {
                return Ok(AddOutcome::InFlight);
            }
            if state.catalog.contains(path) {
                return Ok(AddOutcome::AlreadyKnown);
            }
            state.dispatched.insert(path.to_path_buf());
        }

        // Extraction reads the whole file; keep the lock released
        let extracted = self.extractor.extract(path).await;

        let mut state = self.state.lock().await;
        state.dispatched.remove(path);

        let item = match extracted {
            Some(item) => item,
            None => {
                debug!("Extraction declined the file");
                return Ok(AddOutcome::Skipped);
            }
        };

        if state.catalog.contains(path) {
            return Ok(AddOutcome::AlreadyKnown);
        }

        let album = item.album.clone();
        state.catalog.insert(item);
        state.catalog.save(&self.config.catalog_path()).await?;

        self.regenerate_album(&state.catalog, &album).await?;
        self.regenerate_index(&state.catalog).await?;

        info!(album = %album, "Admitted");
        Ok(AddOutcome::Admitted)
    }

    /// Handle a path classified as removed.
    ///
    /// No-op for paths that were never admitted. An emptied album keeps
    /// its last feed document and its index entry; only a bootstrap
    /// rebuilds those away.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn handle_removed(&self, path: &Path) -> Result<RemoveOutcome, SyncError> {
        let mut state = self.state.lock().await;
        state.dispatched.remove(path);

        let removed = match state.catalog.remove_path(path) {
            Some(item) => item,
            None => return Ok(RemoveOutcome::NotTracked),
        };

        state.catalog.save(&self.config.catalog_path()).await?;

        let remaining = state.catalog.album_items(&removed.album).len();
        if remaining > 0 {
            self.regenerate_album(&state.catalog, &removed.album).await?;
        } else {
            warn!(album = %removed.album, "Album emptied, leaving its feed document in place");
        }
        self.regenerate_index(&state.catalog).await?;

        info!(album = %removed.album, remaining, "Removed");
        Ok(RemoveOutcome::Removed)
    }

    /// Re-render every feed and the index from the current catalog
    /// without re-extracting anything. Recovers output documents after a
    /// crash that persisted the catalog but never finished regenerating.
    pub async fn regenerate_site(&self) -> Result<(), SyncError> {
        let state = self.state.lock().await;
        self.regenerate_all(&state.catalog).await
    }

    /// Paths currently in the catalog, the seed for the watch loop's
    /// known set
    pub async fn known_paths(&self) -> Vec<PathBuf> {
        self.state.lock().await.catalog.paths()
    }

    /// Clone of the current catalog, for read-only callers
    pub async fn catalog_snapshot(&self) -> Catalog {
        self.state.lock().await.catalog.clone()
    }

    async fn regenerate_all(&self, catalog: &Catalog) -> Result<(), SyncError> {
        for album in catalog.album_names() {
            // A registered album with no items has only a stale document;
            // nothing to recompute for it
            if !catalog.album_items(album).is_empty() {
                self.regenerate_album(catalog, album).await?;
            }
        }
        self.regenerate_index(catalog).await
    }

    async fn regenerate_album(&self, catalog: &Catalog, album: &str) -> Result<(), SyncError> {
        let items = catalog.album_items(album);
        let document = render_feed(album, &items);
        self.sink
            .write_feed(&FeedId::from_album(album), &document)
            .await?;
        Ok(())
    }

    async fn regenerate_index(&self, catalog: &Catalog) -> Result<(), SyncError> {
        let entries: Vec<IndexEntry> = catalog
            .album_names()
            .into_iter()
            .map(IndexEntry::new)
            .collect();
        let document = render_index(&self.config.site_title, &entries);
        self.sink.write_index(&document).await?;
        Ok(())
    }
}
