use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::classify::UrlKind;
use crate::scope::host_in_scope;

/// One entry per unique canonical URL. Depth and parent are those of the
/// first discovery and are never rewritten; the score is the one computed at
/// insertion time.
#[derive(Debug, Clone)]
pub struct DiscoveryNode {
    pub url: String,
    pub depth: u32,
    pub parent: Option<String>,
    pub score: f64,
    pub kind: UrlKind,
}

/// The durable output of a crawl: the node map, the discovery edges, the
/// per-pattern counters that throttle parametric explosions, and the derived
/// accumulators (subdomain pivots, per-host directory hints, per-kind URL
/// sets). All serialized collections are ordered so snapshots stay
/// deterministic.
#[derive(Debug, Default)]
pub struct DiscoveryRegistry {
    discovered: HashMap<String, DiscoveryNode>,
    edges: BTreeSet<(String, String)>,
    pattern_counts: HashMap<String, u32>,
    patterns_suppressed_total: u64,
    host_seen: HashSet<String>,
    subdomains: BTreeSet<String>,
    directories_by_host: BTreeMap<String, BTreeSet<String>>,
    max_depth_reached: u32,
    pages: BTreeSet<String>,
    api: BTreeSet<String>,
    feeds: BTreeSet<String>,
    assets: BTreeSet<String>,
    routes: BTreeSet<String>,
    js_files: BTreeSet<String>,
    query_urls: BTreeSet<String>,
    network_requests: BTreeSet<String>,
}

impl DiscoveryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.discovered.contains_key(url)
    }

    pub fn get(&self, url: &str) -> Option<&DiscoveryNode> {
        self.discovered.get(url)
    }

    pub fn len(&self) -> usize {
        self.discovered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.discovered.is_empty()
    }

    pub fn host_seen(&self) -> &HashSet<String> {
        &self.host_seen
    }

    pub fn pattern_count(&self, pattern: &str) -> u32 {
        self.pattern_counts.get(pattern).copied().unwrap_or(0)
    }

    /// Claim a slot under `pattern`. Returns false (and counts the
    /// suppression) once the per-pattern cap is reached; a cap of zero
    /// disables throttling.
    pub fn try_claim_pattern(&mut self, pattern: &str, max_per_pattern: u32) -> bool {
        if max_per_pattern > 0 {
            let count = self.pattern_counts.entry(pattern.to_string()).or_insert(0);
            if *count >= max_per_pattern {
                self.patterns_suppressed_total += 1;
                return false;
            }
            *count += 1;
        }
        true
    }

    pub fn patterns_suppressed_total(&self) -> u64 {
        self.patterns_suppressed_total
    }

    /// Insert a node discovered for the first time. The caller has already
    /// claimed the pattern slot and computed the score.
    pub fn insert_node(&mut self, node: DiscoveryNode) {
        if node.depth > self.max_depth_reached {
            self.max_depth_reached = node.depth;
        }
        self.discovered.insert(node.url.clone(), node);
    }

    pub fn max_depth_reached(&self) -> u32 {
        self.max_depth_reached
    }

    /// Mark a host as seen; in-scope hosts other than the apex itself are
    /// recorded as subdomain pivots.
    pub fn note_host(&mut self, host: &str, apex: &str) {
        if host.is_empty() {
            return;
        }
        self.host_seen.insert(host.to_string());
        if host_in_scope(host, apex) && host != apex {
            self.subdomains.insert(host.to_string());
        }
    }

    pub fn add_edge(&mut self, source: &str, target: &str) {
        self.edges.insert((source.to_string(), target.to_string()));
    }

    /// Record a canonical URL under its kind's accumulator.
    pub fn record_kind(&mut self, kind: UrlKind, url: &str) {
        let set = match kind {
            UrlKind::Page => &mut self.pages,
            UrlKind::Api => &mut self.api,
            UrlKind::Feed => &mut self.feeds,
            UrlKind::Asset => &mut self.assets,
        };
        set.insert(url.to_string());
    }

    pub fn add_route(&mut self, url: &str) {
        self.routes.insert(url.to_string());
    }

    pub fn add_js_file(&mut self, url: &str) {
        self.js_files.insert(url.to_string());
    }

    pub fn add_query_url(&mut self, url: &str) {
        self.query_urls.insert(url.to_string());
    }

    pub fn add_network_request(&mut self, url: &str) {
        self.network_requests.insert(url.to_string());
    }

    /// First path segment of an in-scope page/api URL, leading-slash form.
    pub fn add_directory_hint(&mut self, host: &str, first_segment: &str) {
        self.directories_by_host
            .entry(host.to_string())
            .or_default()
            .insert(format!("/{first_segment}"));
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DiscoveryNode> {
        self.discovered.values()
    }

    pub fn edges(&self) -> &BTreeSet<(String, String)> {
        &self.edges
    }

    pub fn subdomains(&self) -> &BTreeSet<String> {
        &self.subdomains
    }

    pub fn directories_by_host(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.directories_by_host
    }

    pub fn pages(&self) -> &BTreeSet<String> {
        &self.pages
    }

    pub fn api(&self) -> &BTreeSet<String> {
        &self.api
    }

    pub fn feeds(&self) -> &BTreeSet<String> {
        &self.feeds
    }

    pub fn assets(&self) -> &BTreeSet<String> {
        &self.assets
    }

    pub fn routes(&self) -> &BTreeSet<String> {
        &self.routes
    }

    pub fn js_files(&self) -> &BTreeSet<String> {
        &self.js_files
    }

    pub fn query_urls(&self) -> &BTreeSet<String> {
        &self.query_urls
    }

    pub fn network_requests(&self) -> &BTreeSet<String> {
        &self.network_requests
    }
}
