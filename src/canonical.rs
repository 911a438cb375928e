use std::fmt;
use std::sync::LazyLock;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use regex::Regex;
use url::Url;
use url::form_urlencoded;

static INT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").expect("valid regex"));

/// RFC-style UUIDs only (variants 1-5); 32-hex tokens that are not UUIDs
/// fall through to the hex rule.
static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .expect("valid regex")
});

static HEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[0-9a-f]{16,}$").expect("valid regex"));

static IPV4_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(\.\d{1,3}){3}$").expect("valid regex"));

/// Common tracking/noise query params; `utm_`-prefixed keys are dropped
/// wholesale on top of this list.
const TRACKING_KEYS: &[&str] = &[
    "fbclid",
    "gclid",
    "igshid",
    "mc_cid",
    "mc_eid",
    "msclkid",
    "ref",
    "ref_src",
    "spm",
    "utm_campaign",
    "utm_content",
    "utm_medium",
    "utm_name",
    "utm_source",
    "utm_term",
];

/// Bytes escaped when re-encoding a normalized path. Everything outside the
/// unreserved set plus `/:@-._~!$&'()*+,;=` stays percent-encoded.
const PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b':')
    .remove(b'@')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

/// A strictly normalized http(s) URL. The `url` string is the sole identity
/// token for dedupe: two canonical URLs are equal iff all components are.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalUrl {
    pub url: String,
    pub scheme: String,
    /// Lowercased host, with the port kept when it is not the scheme default.
    pub host: String,
    pub path: String,
    pub query: String,
}

impl CanonicalUrl {
    /// Host without the port.
    pub fn hostname(&self) -> &str {
        self.host.split(':').next().unwrap_or("")
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

pub fn is_ip_hostname(hostname: &str) -> bool {
    let host = hostname.trim().to_lowercase();
    !host.is_empty() && IPV4_RE.is_match(&host)
}

/// Parse and normalize `raw` into its canonical form, resolving against
/// `base` when given. Returns `None` for anything that is not an http(s) URL
/// with a host; malformed input never errors.
pub fn canonicalize(raw: &str, base: Option<&str>, remove_tracking: bool) -> Option<CanonicalUrl> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Strip fragments early to reduce parse variability.
    let mut value = match trimmed.find('#') {
        Some(idx) => trimmed[..idx].to_string(),
        None => trimmed.to_string(),
    };

    let base_url = base.and_then(|b| Url::parse(b).ok());
    if let Some(b) = &base_url {
        if let Ok(joined) = b.join(&value) {
            value = joined.to_string();
        }
    }

    // Protocol-relative inputs take the base scheme, defaulting to http.
    if value.starts_with("//") {
        let scheme = base_url
            .as_ref()
            .map(|b| b.scheme().to_string())
            .unwrap_or_default();
        let scheme = if scheme.is_empty() {
            "http"
        } else {
            scheme.as_str()
        };
        value = format!("{scheme}:{value}");
    }

    let parsed = match Url::parse(&value) {
        Ok(u) if u.host_str().is_some_and(|h| !h.is_empty()) => u,
        _ => {
            // Schemeless inputs like "example.com/path".
            let assumed = base_url
                .as_ref()
                .map(|b| b.scheme().to_string())
                .unwrap_or_default();
            let assumed = if assumed.is_empty() {
                "http"
            } else {
                assumed.as_str()
            };
            Url::parse(&format!("{assumed}://{value}")).ok()?
        }
    };

    let scheme = parsed.scheme().to_lowercase();
    if scheme != "http" && scheme != "https" {
        return None;
    }

    let host = parsed
        .host_str()
        .unwrap_or_default()
        .to_lowercase()
        .trim_end_matches('.')
        .to_string();
    if host.is_empty() {
        return None;
    }

    let port = parsed.port().filter(|&p| {
        !((scheme == "http" && p == 80) || (scheme == "https" && p == 443))
    });
    let netloc = match port {
        Some(p) => format!("{host}:{p}"),
        None => host,
    };

    let path = normalize_path(parsed.path());
    let query = normalize_query(parsed.query().unwrap_or_default(), remove_tracking);

    let url = if query.is_empty() {
        format!("{scheme}://{netloc}{path}")
    } else {
        format!("{scheme}://{netloc}{path}?{query}")
    };

    Some(CanonicalUrl {
        url,
        scheme,
        host: netloc,
        path,
        query,
    })
}

fn normalize_path(path: &str) -> String {
    let raw = if path.is_empty() { "/" } else { path };

    // Collapse duplicate slashes, then resolve dot segments.
    let mut segments: Vec<&str> = Vec::new();
    for seg in raw.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let normalized = if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    };

    // Stable percent-encoding: decode, then re-encode against the safe set.
    let decoded = percent_decode_str(&normalized).decode_utf8_lossy();
    let encoded = utf8_percent_encode(&decoded, PATH_ENCODE_SET).to_string();
    if encoded.is_empty() {
        "/".to_string()
    } else {
        encoded
    }
}

fn normalize_query(query: &str, remove_tracking: bool) -> String {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (k, v) in form_urlencoded::parse(query.as_bytes()) {
        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        let low = key.to_lowercase();
        if remove_tracking && (TRACKING_KEYS.contains(&low.as_str()) || low.starts_with("utm_")) {
            continue;
        }
        pairs.push((key.to_string(), v.to_string()));
    }

    pairs.sort_by(|a, b| {
        a.0.to_lowercase()
            .cmp(&b.0.to_lowercase())
            .then_with(|| a.1.cmp(&b.1))
    });

    if pairs.is_empty() {
        return String::new();
    }
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer.extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    serializer.finish()
}

/// Stable "shape" key for throttling similar URLs: dynamic path segments and
/// query values collapse to type placeholders while query keys survive.
pub fn pattern_key(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let host = match parsed.host_str() {
        Some(h) if !h.is_empty() => h.to_lowercase(),
        _ => return url.to_string(),
    };

    let decoded = percent_decode_str(parsed.path()).decode_utf8_lossy();
    let segments: Vec<String> = decoded
        .split('/')
        .filter(|s| !s.is_empty())
        .map(normalize_path_segment)
        .filter(|s| !s.is_empty())
        .collect();
    let norm_path = if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    };

    let mut query: Vec<(String, String)> = Vec::new();
    for (k, v) in form_urlencoded::parse(parsed.query().unwrap_or_default().as_bytes()) {
        let key = k.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        query.push((key, normalize_value_token(&v)));
    }
    query.sort();

    if query.is_empty() {
        format!("{host}{norm_path}")
    } else {
        let rendered: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{host}{norm_path}?{}", rendered.join("&"))
    }
}

fn normalize_path_segment(seg: &str) -> String {
    let s = seg.trim();
    if s.is_empty() {
        return String::new();
    }
    if INT_RE.is_match(s) {
        return "{int}".to_string();
    }
    if UUID_RE.is_match(s) {
        return "{uuid}".to_string();
    }
    if HEX_RE.is_match(s) {
        return "{hex}".to_string();
    }
    if s.chars().count() > 64 {
        return "{long}".to_string();
    }
    s.to_string()
}

fn normalize_value_token(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    if INT_RE.is_match(value) {
        return "{int}".to_string();
    }
    if UUID_RE.is_match(value) {
        return "{uuid}".to_string();
    }
    if HEX_RE.is_match(value) {
        return "{hex}".to_string();
    }
    if value.chars().count() > 64 {
        return "{long}".to_string();
    }
    "{str}".to_string()
}

/// Number of `k=v` pairs in the URL's query string, blank values included.
pub fn query_param_count(url: &str) -> usize {
    let Ok(parsed) = Url::parse(url) else {
        return 0;
    };
    parsed
        .query()
        .map(|q| form_urlencoded::parse(q.as_bytes()).count())
        .unwrap_or(0)
}
