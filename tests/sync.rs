//! Synchronization Engine Integration Tests
//!
//! Exercises the full add/remove/bootstrap flow against a temp site tree
//! with a deterministic extractor. Media files here are plain text of
//! the form `album|title|duration_secs`; an empty album field makes the
//! extractor decline the file, mirroring a tag file without an album.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;

use albumcast::adapters::MetadataExtractor;
use albumcast::config::{QuiescenceSettings, ResolvedConfig};
use albumcast::domain::{FeedId, MediaItem};
use albumcast::sync::{AddOutcome, RemoveOutcome, SyncEngine};

/// Extractor that reads `album|title|duration` from file contents
struct FakeExtractor {
    site_dir: PathBuf,
}

#[async_trait]
impl MetadataExtractor for FakeExtractor {
    async fn extract(&self, path: &Path) -> Option<MediaItem> {
        let metadata = tokio::fs::metadata(path).await.ok()?;
        let content = tokio::fs::read_to_string(path).await.ok()?;

        let mut parts = content.trim().splitn(3, '|');
        let album = parts.next()?.trim().to_string();
        if album.is_empty() {
            return None;
        }
        let title = parts.next()?.trim().to_string();
        let duration_secs = parts.next().and_then(|d| d.trim().parse().ok()).unwrap_or(0);

        let url = path
            .strip_prefix(&self.site_dir)
            .ok()?
            .to_string_lossy()
            .into_owned();

        Some(MediaItem {
            path: path.to_path_buf(),
            album,
            title,
            duration_secs,
            url,
            size_bytes: metadata.len(),
            created_at: Utc::now(),
            thumbnail_url: None,
        })
    }
}

struct TestSite {
    /// Owns the on-disk tree for the duration of the test
    _temp: TempDir,
    config: Arc<ResolvedConfig>,
}

impl TestSite {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let site_dir = temp.path().join("site");
        let media_dir = site_dir.join("media");
        std::fs::create_dir_all(&media_dir).unwrap();

        let config = Arc::new(ResolvedConfig {
            home: temp.path().join("state"),
            site_dir,
            media_dir,
            site_title: "Test Feeds".to_string(),
            default_thumbnail_url: None,
            poll_interval_secs: 3600,
            use_event_source: false,
            quiescence: QuiescenceSettings {
                interval_ms: 20,
                max_attempts: 10,
            },
            config_file: None,
        });

        Self { _temp: temp, config }
    }

    async fn engine(&self) -> Arc<SyncEngine> {
        let extractor = Arc::new(FakeExtractor {
            site_dir: self.config.site_dir.clone(),
        });
        Arc::new(SyncEngine::new(self.config.clone(), extractor).await.unwrap())
    }

    fn write_media(&self, name: &str, album: &str, title: &str) -> PathBuf {
        let path = self.config.media_dir.join(name);
        std::fs::write(&path, format!("{}|{}|60", album, title)).unwrap();
        path
    }

    fn feed_doc(&self, album: &str) -> Option<String> {
        let path = self
            .config
            .feeds_dir()
            .join(format!("{}.xml", FeedId::from_album(album)));
        std::fs::read_to_string(path).ok()
    }

    fn index_doc(&self) -> String {
        std::fs::read_to_string(self.config.index_path()).unwrap()
    }
}

#[tokio::test]
async fn test_bootstrap_partitions_by_album() {
    let site = TestSite::new();
    site.write_media("a.mp3", "X", "alpha");
    site.write_media("b.mp3", "X", "bravo");
    site.write_media("c.mp3", "Y", "charlie");
    site.write_media("notes.txt", "X", "not media");

    let engine = site.engine().await;
    let admitted = engine.bootstrap().await.unwrap();

    // notes.txt is not scanned: wrong extension
    assert_eq!(admitted, 3);

    let feed_x = site.feed_doc("X").unwrap();
    assert_eq!(feed_x.matches("<item>").count(), 2);
    // Title-descending order within the feed
    assert!(feed_x.find("bravo").unwrap() < feed_x.find("alpha").unwrap());

    let feed_y = site.feed_doc("Y").unwrap();
    assert_eq!(feed_y.matches("<item>").count(), 1);

    let index = site.index_doc();
    assert!(index.contains("X"));
    assert!(index.contains("Y"));
    assert!(index.contains(&format!("feeds/{}.xml", FeedId::from_album("X"))));
}

#[tokio::test]
async fn test_add_is_idempotent_under_race() {
    let site = TestSite::new();
    let engine = site.engine().await;
    engine.bootstrap().await.unwrap();

    // Event source and poll cycle racing on the same new file
    let path = site.write_media("new.mp3", "X", "fresh");
    let (first, second) = tokio::join!(engine.handle_added(&path), engine.handle_added(&path));
    let outcomes = [first.unwrap(), second.unwrap()];

    let admissions = outcomes
        .iter()
        .filter(|o| **o == AddOutcome::Admitted)
        .count();
    assert_eq!(admissions, 1, "exactly one dispatch may admit: {:?}", outcomes);

    let catalog = engine.catalog_snapshot().await;
    assert_eq!(catalog.len(), 1);

    // A later duplicate dispatch is a plain no-op
    let replay = engine.handle_added(&path).await.unwrap();
    assert_eq!(replay, AddOutcome::AlreadyKnown);
    assert_eq!(engine.catalog_snapshot().await.len(), 1);
}

#[tokio::test]
async fn test_remove_then_readd_reflects_new_content() {
    let site = TestSite::new();
    let path = site.write_media("track.mp3", "X", "old cut");

    let engine = site.engine().await;
    engine.bootstrap().await.unwrap();
    assert!(site.feed_doc("X").unwrap().contains("old cut"));

    std::fs::remove_file(&path).unwrap();
    let removed = engine.handle_removed(&path).await.unwrap();
    assert_eq!(removed, RemoveOutcome::Removed);

    let path = site.write_media("track.mp3", "X", "new cut");
    let added = engine.handle_added(&path).await.unwrap();
    assert_eq!(added, AddOutcome::Admitted);

    let catalog = engine.catalog_snapshot().await;
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.get(&path).unwrap().title, "new cut");

    let feed = site.feed_doc("X").unwrap();
    assert!(feed.contains("new cut"));
    assert!(!feed.contains("old cut"));
}

#[tokio::test]
async fn test_emptied_album_keeps_stale_feed_and_index_entry() {
    let site = TestSite::new();
    let path_a = site.write_media("a.mp3", "X", "alpha");
    let path_b = site.write_media("b.mp3", "X", "bravo");

    let engine = site.engine().await;
    engine.bootstrap().await.unwrap();
    assert_eq!(site.feed_doc("X").unwrap().matches("<item>").count(), 2);

    std::fs::remove_file(&path_a).unwrap();
    engine.handle_removed(&path_a).await.unwrap();
    let feed = site.feed_doc("X").unwrap();
    assert_eq!(feed.matches("<item>").count(), 1);
    assert!(feed.contains("bravo"));

    std::fs::remove_file(&path_b).unwrap();
    engine.handle_removed(&path_b).await.unwrap();

    assert!(engine.catalog_snapshot().await.is_empty());

    // The feed document is not deleted and not rewritten: it still shows
    // the last non-empty state, and the index still lists the album
    let stale = site.feed_doc("X").unwrap();
    assert_eq!(stale.matches("<item>").count(), 1);
    assert!(stale.contains("bravo"));
    assert!(site.index_doc().contains(&format!("feeds/{}.xml", FeedId::from_album("X"))));
}

#[tokio::test]
async fn test_remove_untracked_is_noop() {
    let site = TestSite::new();
    let engine = site.engine().await;
    engine.bootstrap().await.unwrap();

    let outcome = engine
        .handle_removed(&site.config.media_dir.join("ghost.mp3"))
        .await
        .unwrap();
    assert_eq!(outcome, RemoveOutcome::NotTracked);
}

#[tokio::test]
async fn test_missing_album_is_silently_skipped() {
    let site = TestSite::new();
    let engine = site.engine().await;
    engine.bootstrap().await.unwrap();

    let path = site.write_media("untagged.mp3", "", "no album");
    let outcome = engine.handle_added(&path).await.unwrap();

    assert_eq!(outcome, AddOutcome::Skipped);
    assert!(engine.catalog_snapshot().await.is_empty());

    // Skipping clears the dispatch marker: the path can be reprocessed
    std::fs::write(&path, "X|tagged now|60").unwrap();
    let outcome = engine.handle_added(&path).await.unwrap();
    assert_eq!(outcome, AddOutcome::Admitted);
}

#[tokio::test]
async fn test_vanished_path_is_gone() {
    let site = TestSite::new();
    let engine = site.engine().await;

    let outcome = engine
        .handle_added(&site.config.media_dir.join("never-existed.mp3"))
        .await
        .unwrap();
    assert_eq!(outcome, AddOutcome::Gone);
    assert!(engine.catalog_snapshot().await.is_empty());
}

#[tokio::test]
async fn test_growing_file_times_out_then_admits_once_finished() {
    let site = TestSite::new();
    let engine = site.engine().await;
    engine.bootstrap().await.unwrap();

    let path = site.config.media_dir.join("slow.mp3");
    std::fs::write(&path, "X|slow copy|60").unwrap();

    // Keep appending while the probe runs
    let writer_path = path.clone();
    let writer = tokio::spawn(async move {
        use std::io::Write;
        for _ in 0..100 {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&writer_path)
                .unwrap();
            file.write_all(b" ").unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    });

    let outcome = engine.handle_added(&path).await.unwrap();
    assert_eq!(outcome, AddOutcome::TimedOut);
    assert!(engine.catalog_snapshot().await.is_empty());

    writer.await.unwrap();

    // Once the writer stops, a fresh dispatch admits the file
    let outcome = engine.handle_added(&path).await.unwrap();
    assert_eq!(outcome, AddOutcome::Admitted);
    assert_eq!(engine.catalog_snapshot().await.len(), 1);
}

#[tokio::test]
async fn test_crash_recovery_regenerates_from_snapshot() {
    let site = TestSite::new();
    site.write_media("a.mp3", "X", "alpha");
    site.write_media("b.mp3", "Y", "bravo");

    {
        let engine = site.engine().await;
        engine.bootstrap().await.unwrap();
    }

    // Simulate a crash after catalog persistence but before feed
    // regeneration: the snapshot survives, the documents do not
    std::fs::remove_dir_all(site.config.feeds_dir()).unwrap();
    std::fs::remove_file(site.config.index_path()).unwrap();

    let engine = site.engine().await;
    let catalog = engine.catalog_snapshot().await;
    assert_eq!(catalog.len(), 2);

    engine.regenerate_site().await.unwrap();

    assert_eq!(site.feed_doc("X").unwrap().matches("<item>").count(), 1);
    assert_eq!(site.feed_doc("Y").unwrap().matches("<item>").count(), 1);
    let index = site.index_doc();
    assert!(index.contains("X"));
    assert!(index.contains("Y"));
}

#[tokio::test]
async fn test_bootstrap_persists_catalog() {
    let site = TestSite::new();
    site.write_media("a.mp3", "X", "alpha");

    let engine = site.engine().await;
    engine.bootstrap().await.unwrap();

    let snapshot = std::fs::read_to_string(site.config.catalog_path()).unwrap();
    assert!(snapshot.contains("alpha"));
}
