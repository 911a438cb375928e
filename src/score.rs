use std::collections::HashSet;

use url::form_urlencoded;

use crate::canonical::{CanonicalUrl, is_ip_hostname};

/// Priority score for frontier ordering: higher means expanded earlier.
/// `pattern_seen_count` is the number of same-shape URLs registered *before*
/// this one.
pub fn priority_score(
    url: &CanonicalUrl,
    host_seen: &HashSet<String>,
    pattern_seen_count: u32,
) -> f64 {
    let host = url.hostname();
    let mut score = 0.0;

    // New hosts/subdomains are high-value pivots.
    if !host.is_empty() && !host_seen.contains(host) {
        score += 120.0;
        if is_ip_hostname(host) {
            score += 80.0;
        }
    }

    // Prefer HTTPS slightly when both exist.
    if url.scheme == "https" {
        score += 8.0;
    }

    // Penalize query-heavy URLs (often infinite).
    let param_count = form_urlencoded::parse(url.query.as_bytes()).count();
    if param_count > 0 {
        score -= 18.0 + (param_count as f64 * 10.0).min(60.0);
    }
    if !url.query.is_empty() {
        score -= ((url.query.len() as f64 - 24.0).max(0.0) / 16.0).min(30.0);
    }

    // Penalize repeated patterns (/item/{int} etc).
    score -= (f64::from(pattern_seen_count) * 8.0).min(80.0);

    score
}
