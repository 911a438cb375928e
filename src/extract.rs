use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

const LINK_ATTRS: &[&str] = &["href", "src", "action", "data", "poster"];

static LINK_ATTR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[href], [src], [action], [data], [poster]").expect("valid selector")
});

/// Fallback for markup the DOM pass finds nothing in.
static ATTR_FALLBACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:href|src)\s*=\s*['"]([^'"]+)['"]"#).expect("valid regex")
});

/// JSON-embedded search targets from known app patterns.
static SEARCH_TARGET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)"target"\s*:\s*"([^"]+)""#).expect("valid regex"));

pub fn is_http_url(url: &str) -> bool {
    let lower = url.trim_start().to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Resolve a raw attribute value against the page URL; returns the candidate
/// unchanged when the base does not parse.
pub fn absolute_url(base: &str, candidate: &str) -> String {
    match Url::parse(base).and_then(|b| b.join(candidate)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => candidate.to_string(),
    }
}

/// Collect absolute http(s) link candidates from HTML. The DOM pass reads
/// `href`, `src`, `action`, `data` and `poster` on any element; when it
/// yields nothing, a regex sweep over `href`/`src` attributes fills in.
pub fn extract_links(html: &str, base_url: &str) -> BTreeSet<String> {
    let mut urls = BTreeSet::new();

    let document = Html::parse_document(html);
    for element in document.select(&LINK_ATTR_SELECTOR) {
        for attr in LINK_ATTRS {
            let Some(value) = element.value().attr(attr) else {
                continue;
            };
            if value.trim().is_empty() {
                continue;
            }
            let resolved = absolute_url(base_url, value);
            if is_http_url(&resolved) {
                urls.insert(resolved);
            }
        }
    }

    if urls.is_empty() {
        for capture in ATTR_FALLBACK_RE.captures_iter(html) {
            let resolved = absolute_url(base_url, &capture[1]);
            if is_http_url(&resolved) {
                urls.insert(resolved);
            }
        }
    }

    urls
}

/// `"target": "<url>"` occurrences in raw HTML, sorted and deduplicated.
pub fn extract_search_targets(html: &str) -> Vec<String> {
    let targets: BTreeSet<String> = SEARCH_TARGET_RE
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .collect();
    targets.into_iter().collect()
}
