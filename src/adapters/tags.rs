//! Tag-based metadata extraction for media files.
//!
//! Reads embedded audio tags with lofty and resolves the item's public
//! URL and thumbnail relative to the published site root. The album tag
//! is required: a file without one is not admissible and extraction
//! returns `None`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lofty::file::TaggedFileExt;
use lofty::picture::PictureType;
use lofty::prelude::*;
use lofty::probe::Probe;
use tracing::debug;

use super::MetadataExtractor;
use crate::config::ResolvedConfig;
use crate::domain::MediaItem;

/// Metadata extractor backed by embedded audio tags
pub struct TagExtractor {
    site_dir: PathBuf,
    default_thumbnail_url: Option<String>,
}

/// Tag fields pulled out of a media file
struct TagData {
    album: Option<String>,
    title: Option<String>,
    duration_secs: u64,
    cover: Option<Cover>,
}

struct Cover {
    data: Vec<u8>,
    extension: &'static str,
}

impl TagExtractor {
    pub fn new(config: &ResolvedConfig) -> Self {
        Self {
            site_dir: config.site_dir.clone(),
            default_thumbnail_url: config.default_thumbnail_url.clone(),
        }
    }

    /// URL of a site file, relative to the site root. `None` for paths
    /// outside the site tree.
    fn site_url(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.site_dir).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    /// Export embedded cover art next to the media file and return its
    /// site-relative URL. Best-effort: any failure falls back to the
    /// configured default thumbnail.
    async fn resolve_thumbnail(&self, path: &Path, cover: Option<Cover>) -> Option<String> {
        if let Some(cover) = cover {
            let cover_path = path.with_extension(cover.extension);
            let exported = cover_path.exists()
                || tokio::fs::write(&cover_path, &cover.data).await.is_ok();
            if exported {
                if let Some(url) = self.site_url(&cover_path) {
                    return Some(url);
                }
            } else {
                debug!("Could not export cover art for {}", path.display());
            }
        }

        self.default_thumbnail_url.clone()
    }
}

#[async_trait]
impl MetadataExtractor for TagExtractor {
    async fn extract(&self, path: &Path) -> Option<MediaItem> {
        let metadata = tokio::fs::metadata(path).await.ok()?;
        if !metadata.is_file() {
            return None;
        }

        let tags = match read_tags(path) {
            Some(tags) => tags,
            None => {
                debug!("Unreadable tag data, skipping {}", path.display());
                return None;
            }
        };

        let album = match tags.album {
            Some(album) => album,
            None => {
                debug!("No album tag, skipping {}", path.display());
                return None;
            }
        };

        // A missing title is repairable, a missing album is not
        let title = tags
            .title
            .or_else(|| {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .filter(|t| !t.is_empty())?;

        let url = self.site_url(path)?;
        let created_at: DateTime<Utc> = metadata
            .created()
            .or_else(|_| metadata.modified())
            .ok()?
            .into();
        let thumbnail_url = self.resolve_thumbnail(path, tags.cover).await;

        Some(MediaItem {
            path: path.to_path_buf(),
            album,
            title,
            duration_secs: tags.duration_secs,
            url,
            size_bytes: metadata.len(),
            created_at,
            thumbnail_url,
        })
    }
}

/// Read tag fields from a media file. `None` on any probe or parse
/// failure.
fn read_tags(path: &Path) -> Option<TagData> {
    let tagged = Probe::open(path).ok()?.read().ok()?;
    let duration_secs = tagged.properties().duration().as_secs();

    let tag = tagged.primary_tag().or_else(|| tagged.first_tag());

    let (album, title, cover) = match tag {
        Some(tag) => {
            let cover = tag
                .pictures()
                .iter()
                .find(|p| p.pic_type() == PictureType::CoverFront)
                .or_else(|| tag.pictures().first())
                .map(|p| Cover {
                    data: p.data().to_vec(),
                    extension: match p.mime_type().map(|m| m.as_str()) {
                        Some("image/png") => "png",
                        _ => "jpg",
                    },
                });
            (
                tag.album().map(|a| a.into_owned()).filter(|a| !a.is_empty()),
                tag.title().map(|t| t.into_owned()).filter(|t| !t.is_empty()),
                cover,
            )
        }
        None => (None, None, None),
    };

    Some(TagData {
        album,
        title,
        duration_secs,
        cover,
    })
}
