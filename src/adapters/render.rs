//! Feed and index document rendering.
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time templating with
//! automatic escaping. Both renderers are pure functions of their inputs;
//! writing the result anywhere is the sink's job.
//!
//! Feed documents live under `feeds/`, one directory below the site root,
//! so item URLs inside a feed are prefixed with `../`.

use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::domain::{FeedId, MediaItem};

const XML_PRELUDE: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// One album entry on the index page
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: FeedId,
    pub title: String,
}

impl IndexEntry {
    pub fn new(title: &str) -> Self {
        Self {
            id: FeedId::from_album(title),
            title: title.to_string(),
        }
    }
}

/// Render the RSS document for one album.
///
/// Items are rendered in the order given; the engine passes them sorted
/// by title descending.
pub fn render_feed(album: &str, items: &[&MediaItem]) -> String {
    let channel_image = items.iter().find_map(|i| i.thumbnail_url.as_deref());

    let markup: Markup = html! {
        (PreEscaped(XML_PRELUDE))
        rss version="2.0" {
            channel {
                title { (album) }
                description { (album) }
                @if let Some(image_url) = channel_image {
                    image {
                        url { "../" (image_url) }
                        title { (album) }
                        link { "../index.html" }
                    }
                }
                @for item in items {
                    item {
                        title { (item.title) }
                        guid isPermaLink="false" { (item.guid()) }
                        pubDate { (item.created_at.to_rfc2822()) }
                        enclosure url={ "../" (item.url) } length=(item.size_bytes) type=(item.mime_type()) {}
                        duration { (item.duration_hhmmss()) }
                    }
                }
            }
        }
    };

    markup.into_string()
}

/// Render the aggregate index page listing every album feed
pub fn render_index(site_title: &str, entries: &[IndexEntry]) -> String {
    let markup: Markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (site_title) }
            }
            body {
                h1 { (site_title) }
                ul class="feeds" {
                    @for entry in entries {
                        li {
                            a href={ "feeds/" (entry.id) ".xml" } { (entry.title) }
                        }
                    }
                }
            }
        }
    };

    markup.into_string()
}
