use serde::{Deserialize, Serialize};

use crate::canonical::CanonicalUrl;

/// Discovery label for a canonical URL. Only `Page` and `Api` URLs are ever
/// enqueued for fetching; feeds and assets are recorded and left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlKind {
    Page,
    Api,
    Feed,
    Asset,
}

impl UrlKind {
    pub fn is_fetchable(self) -> bool {
        matches!(self, UrlKind::Page | UrlKind::Api)
    }
}

const ASSET_EXTENSIONS: &[&str] = &[
    // images
    "avif", "bmp", "gif", "ico", "jpeg", "jpg", "png", "svg", "webp",
    // fonts
    "eot", "otf", "ttf", "woff", "woff2",
    // archives
    "7z", "bz2", "gz", "rar", "tar", "tgz", "zip",
    // media
    "avi", "flac", "m4a", "mkv", "mov", "mp3", "mp4", "ogg", "wav", "webm",
    // stylesheets and scripts
    "css", "js", "mjs",
    // documents
    "doc", "docx", "pdf", "ppt", "pptx", "txt", "xls", "xlsx",
];

const API_FIRST_SEGMENTS: &[&str] = &["api", "graphql", "rest", "v1", "v2"];

const FEED_SEGMENTS: &[&str] = &["atom", "feed", "rss"];

/// Classify a canonical URL by path, extension and query heuristics.
pub fn classify(url: &CanonicalUrl) -> UrlKind {
    let segments: Vec<&str> = url.path.split('/').filter(|s| !s.is_empty()).collect();
    let last = segments.last().copied().unwrap_or_default().to_lowercase();
    let (stem, extension) = match last.rsplit_once('.') {
        Some((stem, ext)) => (stem.to_string(), ext.to_string()),
        None => (last.clone(), String::new()),
    };

    if !extension.is_empty() && ASSET_EXTENSIONS.contains(&extension.as_str()) {
        return UrlKind::Asset;
    }

    if extension == "rss"
        || extension == "atom"
        || FEED_SEGMENTS.contains(&stem.as_str())
        || segments
            .iter()
            .any(|s| FEED_SEGMENTS.contains(&s.to_lowercase().as_str()))
    {
        return UrlKind::Feed;
    }

    let first = segments.first().copied().unwrap_or_default().to_lowercase();
    if API_FIRST_SEGMENTS.contains(&first.as_str())
        || extension == "json"
        || extension == "xml"
        || has_data_format_query(url)
    {
        return UrlKind::Api;
    }

    UrlKind::Page
}

fn has_data_format_query(url: &CanonicalUrl) -> bool {
    url::form_urlencoded::parse(url.query.as_bytes()).any(|(k, v)| {
        let key = k.to_lowercase();
        let value = v.to_lowercase();
        (key == "format" || key == "output") && (value == "json" || value == "xml")
    })
}
