//! The watch loop.
//!
//! Runs the event subscription and the periodic poll concurrently and
//! feeds classified changes to the synchronization engine. Added
//! candidates go to a bounded pool of worker tasks, because each one may
//! block for seconds inside the write-completion probe; removals are
//! immediate.
//!
//! The poll-maintained known-path set is the ground truth. It is seeded
//! from the catalog at startup so files that vanished while the process
//! was down are detected by the first poll, and only poll cycles ever
//! update it. A failed event subscription degrades the loop to
//! poll-only operation; it never stops it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::classifier::{self, Change};
use super::scan_media_set;
use crate::config::ResolvedConfig;
use crate::sync::SyncEngine;

/// Debounce window for raw notify events
const DEBOUNCE_WINDOW: Duration = Duration::from_secs(2);

/// Upper bound on concurrently settling added paths
const MAX_CONCURRENT_ADDS: usize = 4;

/// Errors that can occur with the watcher
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("Watch directory does not exist: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Watches the media directory and drives the synchronization engine
pub struct Watcher {
    config: Arc<ResolvedConfig>,
}

impl Watcher {
    pub fn new(config: Arc<ResolvedConfig>) -> Self {
        Self { config }
    }

    /// Start the watch loop. Fails fast if the watch directory is
    /// missing; every later failure is degraded, not fatal.
    pub fn spawn(&self, engine: Arc<SyncEngine>) -> Result<WatchHandle, WatcherError> {
        if !self.config.media_dir.is_dir() {
            return Err(WatcherError::DirectoryNotFound(self.config.media_dir.clone()));
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>(1);
        let config = self.config.clone();

        let task = tokio::spawn(async move {
            run_watch_loop(config, engine, stop_rx).await;
        });

        Ok(WatchHandle { stop_tx, task })
    }
}

/// Handle to stop the watch loop cooperatively
pub struct WatchHandle {
    stop_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl WatchHandle {
    /// Stop the loop and wait for in-flight workers to finish or time
    /// out on their own.
    pub async fn stop(self) -> Result<(), tokio::task::JoinError> {
        let _ = self.stop_tx.send(()).await;
        self.task.await
    }
}

/// Establish the debounced event subscription. The returned debouncer
/// owns the notify watcher; dropping it ends the subscription.
fn start_event_source(
    dir: &Path,
    tx: mpsc::UnboundedSender<DebounceEventResult>,
) -> Result<Debouncer<RecommendedWatcher>, notify::Error> {
    let mut debouncer = new_debouncer(DEBOUNCE_WINDOW, move |result: DebounceEventResult| {
        let _ = tx.send(result);
    })?;

    debouncer
        .watcher()
        .watch(dir, RecursiveMode::Recursive)?;

    Ok(debouncer)
}

async fn run_watch_loop(
    config: Arc<ResolvedConfig>,
    engine: Arc<SyncEngine>,
    mut stop_rx: mpsc::Receiver<()>,
) {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<DebounceEventResult>();

    // The subscription lives exactly as long as this binding
    let _debouncer = if config.use_event_source {
        match start_event_source(&config.media_dir, event_tx.clone()) {
            Ok(debouncer) => {
                info!("Watching {} for media files", config.media_dir.display());
                Some(debouncer)
            }
            Err(e) => {
                warn!("Event subscription unavailable, polling only: {}", e);
                None
            }
        }
    } else {
        info!("Event subscription disabled, polling only");
        None
    };

    let mut known: HashSet<PathBuf> = engine.known_paths().await.into_iter().collect();

    let mut poll = tokio::time::interval(config.poll_interval());
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let limiter = Arc::new(Semaphore::new(MAX_CONCURRENT_ADDS));
    let mut inflight: HashSet<PathBuf> = HashSet::new();
    let mut workers: JoinSet<PathBuf> = JoinSet::new();

    loop {
        tokio::select! {
            _ = stop_rx.recv() => {
                info!("Watcher stopping");
                break;
            }

            _ = poll.tick() => {
                let current = scan_media_set(&config.media_dir);
                let diff = classifier::diff(&known, &current);

                for path in diff.removed {
                    debug!("Poll detected removed file: {}", path.display());
                    remove(&engine, &path).await;
                }
                for path in diff.added {
                    debug!("Poll detected new file: {}", path.display());
                    dispatch_added(&engine, &limiter, &mut inflight, &mut workers, path);
                }

                known = current;
            }

            Some(result) = event_rx.recv() => {
                let events = match result {
                    Ok(events) => events,
                    Err(e) => {
                        warn!("Event source error: {:?}", e);
                        continue;
                    }
                };

                for event in events {
                    match classifier::classify(&event.path, event.path.is_file()) {
                        Change::Added(path) => {
                            dispatch_added(&engine, &limiter, &mut inflight, &mut workers, path);
                        }
                        Change::Removed(path) => remove(&engine, &path).await,
                        Change::Ignored => {}
                    }
                }
            }

            Some(finished) = workers.join_next(), if !workers.is_empty() => {
                if let Ok(path) = finished {
                    inflight.remove(&path);
                }
            }
        }
    }

    // Let in-flight workers complete or time out naturally
    while workers.join_next().await.is_some() {}
}

/// Hand an added candidate to a worker, unless one is already on it
fn dispatch_added(
    engine: &Arc<SyncEngine>,
    limiter: &Arc<Semaphore>,
    inflight: &mut HashSet<PathBuf>,
    workers: &mut JoinSet<PathBuf>,
    path: PathBuf,
) {
    if !inflight.insert(path.clone()) {
        return;
    }

    let engine = engine.clone();
    let limiter = limiter.clone();

    workers.spawn(async move {
        let _permit = match limiter.acquire_owned().await {
            Ok(permit) => permit,
            // Closed only on shutdown
            Err(_) => return path,
        };

        match engine.handle_added(&path).await {
            Ok(outcome) => debug!("Handled {}: {:?}", path.display(), outcome),
            Err(e) => warn!("Failed to handle {}: {}", path.display(), e),
        }

        path
    });
}

async fn remove(engine: &Arc<SyncEngine>, path: &Path) {
    if let Err(e) = engine.handle_removed(path).await {
        warn!("Failed to remove {}: {}", path.display(), e);
    }
}
