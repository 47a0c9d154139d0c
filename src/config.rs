//! Configuration for albumcast paths and watch behavior.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (ALBUMCAST_HOME, ALBUMCAST_MEDIA_DIR, ALBUMCAST_SITE_DIR)
//! 2. Config file (.albumcast/config.yaml)
//! 3. Defaults (~/.albumcast)
//!
//! Config file discovery:
//! - Searches current directory and parents for .albumcast/config.yaml
//! - Paths in config file are relative to the config file's parent directory
//!
//! The result is a single `ResolvedConfig`, validated once at startup and
//! injected into every component that needs a path. Nothing here is cached
//! globally.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

/// Startup misconfiguration. Any of these is fatal: the watch loop is
/// never started.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Media directory does not exist: {}", .0.display())]
    MediaDirNotFound(PathBuf),

    #[error("Site directory does not exist: {}", .0.display())]
    SiteDirNotFound(PathBuf),

    #[error(
        "Media directory {} is not under the site directory {}",
        .media.display(),
        .site.display()
    )]
    MediaOutsideSite { media: PathBuf, site: PathBuf },
}

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub watch: Option<WatchConfig>,
    #[serde(default)]
    pub quiescence: Option<QuiescenceConfig>,
    #[serde(default)]
    pub site: Option<SiteConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to config file)
    pub home: Option<String>,
    /// Published site root (relative to config file)
    pub site: Option<String>,
    /// Watched media directory (relative to config file)
    pub media: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    pub poll_interval_secs: Option<u64>,
    pub events: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuiescenceConfig {
    pub interval_ms: Option<u64>,
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub title: Option<String>,
    pub default_thumbnail: Option<String>,
}

/// Settings for the write-completion probe
#[derive(Debug, Clone)]
pub struct QuiescenceSettings {
    /// Delay between probe attempts
    pub interval_ms: u64,
    /// Attempt budget before the path is abandoned
    pub max_attempts: u32,
}

impl Default for QuiescenceSettings {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_attempts: 5,
        }
    }
}

impl QuiescenceSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to the state directory (catalog snapshot)
    pub home: PathBuf,
    /// Absolute path to the published site root
    pub site_dir: PathBuf,
    /// Absolute path to the watched media directory
    pub media_dir: PathBuf,
    /// Title rendered on the index page
    pub site_title: String,
    /// Site-relative thumbnail URL used when a file embeds no cover art
    pub default_thumbnail_url: Option<String>,
    /// Seconds between full-snapshot polls
    pub poll_interval_secs: u64,
    /// Whether the filesystem event subscription is attempted at all
    pub use_event_source: bool,
    /// Write-completion probe settings
    pub quiescence: QuiescenceSettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Path of the persisted catalog snapshot
    pub fn catalog_path(&self) -> PathBuf {
        self.home.join("catalog.json")
    }

    /// Directory feed documents are written to
    pub fn feeds_dir(&self) -> PathBuf {
        self.site_dir.join("feeds")
    }

    /// Path of the aggregate index document
    pub fn index_path(&self) -> PathBuf {
        self.site_dir.join("index.html")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Check the external paths this process depends on. Media files are
    /// published by URL relative to the site root, so the media directory
    /// must live inside it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.media_dir.is_dir() {
            return Err(ConfigError::MediaDirNotFound(self.media_dir.clone()));
        }
        if !self.site_dir.is_dir() {
            return Err(ConfigError::SiteDirNotFound(self.site_dir.clone()));
        }
        if !self.media_dir.starts_with(&self.site_dir) {
            return Err(ConfigError::MediaOutsideSite {
                media: self.media_dir.clone(),
                site: self.site_dir.clone(),
            });
        }
        Ok(())
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".albumcast").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(&path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from all sources
pub fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".albumcast");

    let config_file = find_config_file();

    let file = match &config_file {
        Some(path) => Some(load_config_file(path)?),
        None => None,
    };

    // Base directory is the parent of .albumcast/ (i.e., grandparent of config.yaml)
    let base_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .and_then(Path::parent)
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let home = if let Ok(env_home) = std::env::var("ALBUMCAST_HOME") {
        PathBuf::from(env_home)
    } else if let Some(home_path) = file.as_ref().and_then(|f| f.paths.home.as_deref()) {
        resolve_path(&base_dir, home_path)
    } else {
        default_home
    };

    let site_dir = if let Ok(env_site) = std::env::var("ALBUMCAST_SITE_DIR") {
        PathBuf::from(env_site)
    } else if let Some(site_path) = file.as_ref().and_then(|f| f.paths.site.as_deref()) {
        resolve_path(&base_dir, site_path)
    } else {
        home.join("site")
    };

    let media_dir = if let Ok(env_media) = std::env::var("ALBUMCAST_MEDIA_DIR") {
        PathBuf::from(env_media)
    } else if let Some(media_path) = file.as_ref().and_then(|f| f.paths.media.as_deref()) {
        resolve_path(&base_dir, media_path)
    } else {
        site_dir.join("media")
    };

    let watch = file.as_ref().and_then(|f| f.watch.as_ref());
    let quiescence = file.as_ref().and_then(|f| f.quiescence.as_ref());
    let site = file.as_ref().and_then(|f| f.site.as_ref());

    let defaults = QuiescenceSettings::default();

    Ok(ResolvedConfig {
        home,
        site_dir,
        media_dir,
        site_title: site
            .and_then(|s| s.title.clone())
            .unwrap_or_else(|| "albumcast".to_string()),
        default_thumbnail_url: site.and_then(|s| s.default_thumbnail.clone()),
        poll_interval_secs: watch.and_then(|w| w.poll_interval_secs).unwrap_or(30),
        use_event_source: watch.and_then(|w| w.events).unwrap_or(true),
        quiescence: QuiescenceSettings {
            interval_ms: quiescence
                .and_then(|q| q.interval_ms)
                .unwrap_or(defaults.interval_ms),
            max_attempts: quiescence
                .and_then(|q| q.max_attempts)
                .unwrap_or(defaults.max_attempts),
        },
        config_file,
    })
}
