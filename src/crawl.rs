use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use url::Url;

use crate::budget::{Budgets, StopReason};
use crate::canonical::{self, CanonicalUrl};
use crate::classify::{self, UrlKind};
use crate::cli::CrawlArgs;
use crate::extract;
use crate::fetch::{Fetcher, HeadlessRenderer, HttpFetcher};
use crate::formats::{CrawlGraph, CrawlReport, CrawlStats, DiscoveredUrls, GraphEdge, GraphNode};
use crate::frontier::Frontier;
use crate::jsroutes::JsRouteDiscoverer;
use crate::registry::{DiscoveryNode, DiscoveryRegistry};
use crate::scope::{apex_of, host_in_scope};
use crate::score::priority_score;

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Echoed in the report; usually the start host.
    pub target: String,
    /// Scope root. Hosts equal to it or ending in `.apex` are in scope.
    pub apex: String,
    pub budgets: Budgets,
    /// Per-request timeout in seconds.
    pub timeout_s: u64,
    /// Inter-request delay in seconds.
    pub rate_limit_s: f64,
    pub remove_tracking: bool,
    /// Queries recorded as `?query=<q>` variants of fetched pages.
    pub seed_queries: Vec<String>,
}

impl CrawlConfig {
    pub fn new(target: &str, apex: &str) -> Self {
        Self {
            target: target.to_string(),
            apex: apex.to_string(),
            budgets: Budgets::default(),
            timeout_s: 8,
            rate_limit_s: 0.3,
            remove_tracking: true,
            seed_queries: Vec::new(),
        }
    }
}

/// Best-first bounded crawler. Collaborators are injected capabilities; a
/// missing fetcher is the only absence that aborts the run.
pub struct CrawlEngine {
    config: CrawlConfig,
    fetcher: Option<Arc<dyn Fetcher>>,
    js_discoverer: Option<Arc<dyn JsRouteDiscoverer>>,
    renderer: Option<Arc<dyn HeadlessRenderer>>,
    registry: DiscoveryRegistry,
    frontier: Frontier,
    visited: HashSet<String>,
    requests_made: u32,
    stop_reason: Option<StopReason>,
    started: Instant,
}

impl CrawlEngine {
    pub fn new(config: CrawlConfig) -> Self {
        Self {
            config,
            fetcher: None,
            js_discoverer: None,
            renderer: None,
            registry: DiscoveryRegistry::new(),
            frontier: Frontier::new(),
            visited: HashSet::new(),
            requests_made: 0,
            stop_reason: None,
            started: Instant::now(),
        }
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_js_discoverer(mut self, discoverer: Arc<dyn JsRouteDiscoverer>) -> Self {
        self.js_discoverer = Some(discoverer);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn HeadlessRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Check every budget axis; the first tripped reason sticks and is never
    /// overwritten by a later check.
    fn budget_hit(&mut self) -> bool {
        match self.config.budgets.check(
            self.started.elapsed(),
            self.requests_made,
            self.registry.len(),
        ) {
            Some(reason) => {
                self.stop_reason.get_or_insert(reason);
                true
            }
            None => false,
        }
    }

    /// Register a canonical URL on first observation and enqueue it when it
    /// came from the frontier path and is fetchable. Depth and parent stick
    /// with the first discovery.
    fn add_discovered(
        &mut self,
        child: &CanonicalUrl,
        parent: Option<&str>,
        depth: u32,
        kind: UrlKind,
        from_frontier: bool,
    ) {
        if self.registry.contains(child.as_str()) {
            return;
        }
        if self.budget_hit() {
            return;
        }

        let pattern = canonical::pattern_key(child.as_str());
        if !self
            .registry
            .try_claim_pattern(&pattern, self.config.budgets.max_per_pattern)
        {
            tracing::debug!(url = %child, pattern = %pattern, "pattern cap reached; suppressed");
            return;
        }

        // Score with the shape count prior to this insertion, and before the
        // host loses its novelty.
        let pattern_seen = self.registry.pattern_count(&pattern).saturating_sub(1);
        let score = priority_score(child, self.registry.host_seen(), pattern_seen);

        self.registry.insert_node(DiscoveryNode {
            url: child.url.clone(),
            depth,
            parent: parent.map(str::to_owned),
            score,
            kind,
        });
        self.registry.note_host(child.hostname(), &self.config.apex);
        if let Some(parent) = parent {
            self.registry.add_edge(parent, child.as_str());
        }

        if !from_frontier {
            return;
        }
        if let Some(max_depth) = self.config.budgets.max_depth {
            if depth > max_depth {
                return;
            }
        }
        if !kind.is_fetchable() {
            return;
        }
        if self.visited.contains(child.as_str()) || self.frontier.contains(child.as_str()) {
            return;
        }
        self.frontier.push(child.clone(), score, depth);
    }

    /// Seed, run the loop to a stop reason, and produce the result snapshot.
    /// The crawl itself never fails; transport errors abandon the current
    /// node and the loop moves on.
    pub async fn crawl(&mut self, start_urls: &[String]) -> CrawlReport {
        self.started = Instant::now();
        let remove_tracking = self.config.remove_tracking;
        let apex = self.config.apex.clone();

        for raw in start_urls {
            let Some(seed) = canonical::canonicalize(raw, Some(raw), remove_tracking) else {
                continue;
            };
            let host = seed.hostname().to_string();
            if !host.is_empty() && !host_in_scope(&host, &apex) {
                tracing::debug!(url = %seed, apex = %apex, "seed out of scope; dropped");
                continue;
            }
            self.add_discovered(&seed, None, 0, UrlKind::Page, true);
        }

        while !self.frontier.is_empty() {
            if self.budget_hit() {
                break;
            }
            let Some(fetcher) = self.fetcher.clone() else {
                self.stop_reason.get_or_insert(StopReason::MissingFetcher);
                break;
            };

            let Some(url) = self.frontier.pop() else {
                break;
            };
            if self.visited.contains(url.as_str()) {
                continue;
            }
            self.visited.insert(url.url.clone());
            self.requests_made += 1;

            let timeout = Duration::from_secs(self.config.timeout_s);
            let response = match fetcher.get(url.as_str(), timeout).await {
                Ok(response) => response,
                Err(err) => {
                    tracing::debug!(url = %url, ?err, "fetch failed");
                    continue;
                }
            };

            // Post-redirect canonicalization: register where the chain landed
            // as a same-depth alias so downstream edges can point at it.
            let final_url = if response.final_url.is_empty() {
                url.url.clone()
            } else {
                response.final_url.clone()
            };
            let effective = canonical::canonicalize(&final_url, Some(url.as_str()), remove_tracking);
            if let Some(effective) = &effective {
                if effective.as_str() != url.as_str() && !self.registry.contains(effective.as_str())
                {
                    let (parent, depth, kind) = match self.registry.get(url.as_str()) {
                        Some(node) => (node.parent.clone(), node.depth, node.kind),
                        None => (None, 0, UrlKind::Page),
                    };
                    self.add_discovered(effective, parent.as_deref(), depth, kind, false);
                }
            }

            if response.status >= 400 {
                tracing::debug!(url = %url, status = response.status, "error status; skipped");
                continue;
            }
            let content_type = response
                .content_type
                .as_deref()
                .unwrap_or_default()
                .to_lowercase();
            if !content_type.contains("text/html") && !response.body.to_lowercase().contains("<html")
            {
                continue;
            }

            let html = &response.body;
            let base_url = final_url;
            let effective_str = effective
                .as_ref()
                .map(|e| e.url.clone())
                .unwrap_or_else(|| url.url.clone());

            self.registry.record_kind(UrlKind::Page, &effective_str);

            let mut links = extract::extract_links(html, &base_url);

            // Seeded query variants are recorded but never expanded.
            if !self.config.seed_queries.is_empty() {
                let query_urls = build_query_urls(&base_url, &self.config.seed_queries);
                for query_url in query_urls {
                    let Some(cq) = canonical::canonicalize(&query_url, Some(&base_url), remove_tracking)
                    else {
                        continue;
                    };
                    self.registry.add_query_url(cq.as_str());
                    self.registry.record_kind(UrlKind::Page, cq.as_str());
                }
            }

            // Inline JSON search targets from known app patterns.
            for target in extract::extract_search_targets(html) {
                let candidate = extract::absolute_url(&base_url, &target);
                if extract::is_http_url(&candidate) {
                    links.insert(candidate);
                }
            }

            // JS route discovery can yield valuable API and route endpoints;
            // its findings are recorded, never enqueued.
            if let Some(js) = self.js_discoverer.clone() {
                match js.discover(html, &base_url).await {
                    Ok((discovery, scripts)) => {
                        for script in &scripts {
                            self.registry.add_js_file(script);
                        }
                        for route in &discovery.routes {
                            self.registry.add_route(route);
                        }
                        for api in &discovery.api {
                            self.registry.record_kind(UrlKind::Api, api);
                        }
                        for feed in &discovery.feeds {
                            self.registry.record_kind(UrlKind::Feed, feed);
                        }
                        for asset in &discovery.assets {
                            self.registry.record_kind(UrlKind::Asset, asset);
                        }
                    }
                    Err(err) => {
                        tracing::debug!(url = %url, ?err, "js route discovery failed");
                    }
                }
            }

            if let Some(renderer) = self.renderer.clone() {
                match renderer.render(&base_url).await {
                    Ok((rendered, observed)) => {
                        if !rendered.is_empty() {
                            links.extend(extract::extract_links(&rendered, &base_url));
                        }
                        for request in &observed {
                            self.registry.add_network_request(request);
                        }
                    }
                    Err(err) => {
                        tracing::debug!(url = %url, ?err, "headless render failed");
                    }
                }
            }

            let parent_canonical =
                canonical::canonicalize(&base_url, Some(&base_url), remove_tracking)
                    .map(|c| c.url)
                    .unwrap_or_else(|| effective_str.clone());
            let parent_depth = self
                .registry
                .get(&parent_canonical)
                .or_else(|| self.registry.get(url.as_str()))
                .map(|node| node.depth)
                .unwrap_or(0);

            for link in &links {
                let Some(child) = canonical::canonicalize(link, Some(&base_url), remove_tracking)
                else {
                    continue;
                };
                let host = child.hostname().to_string();
                if host.is_empty() || !host_in_scope(&host, &apex) {
                    continue;
                }

                let kind = classify::classify(&child);
                self.registry.record_kind(kind, child.as_str());

                // Directory hints feed downstream enumeration.
                if kind.is_fetchable() {
                    if let Some(first) = child.path.split('/').find(|s| !s.is_empty()) {
                        self.registry.add_directory_hint(&host, first);
                    }
                }

                self.add_discovered(&child, Some(&parent_canonical), parent_depth + 1, kind, true);
            }

            if self.config.rate_limit_s > 0.0 {
                tokio::time::sleep(Duration::from_secs_f64(self.config.rate_limit_s)).await;
            }
        }

        if self.stop_reason.is_none() {
            self.stop_reason = Some(if self.frontier.is_empty() {
                StopReason::FrontierEmpty
            } else {
                StopReason::Stopped
            });
        }

        self.snapshot(start_urls)
    }

    fn snapshot(&self, start_urls: &[String]) -> CrawlReport {
        let remove_tracking = self.config.remove_tracking;
        let clean = |urls: &BTreeSet<String>| -> Vec<String> {
            urls.iter()
                .filter_map(|u| canonical::canonicalize(u, Some(u), remove_tracking))
                .map(|c| c.url)
                .collect::<BTreeSet<String>>()
                .into_iter()
                .collect()
        };

        let pages_union: BTreeSet<String> = self
            .registry
            .pages()
            .union(self.registry.routes())
            .cloned()
            .collect();
        let pages = clean(&pages_union);

        let directories_by_host = self
            .registry
            .directories_by_host()
            .iter()
            .map(|(host, dirs)| (host.clone(), dirs.iter().cloned().collect()))
            .collect();

        let mut nodes: Vec<GraphNode> = self
            .registry
            .nodes()
            .map(|node| GraphNode {
                url: node.url.clone(),
                depth: node.depth,
                parent: node.parent.clone(),
                score: node.score,
                kind: node.kind,
            })
            .collect();
        nodes.sort_by(|a, b| {
            a.depth
                .cmp(&b.depth)
                .then_with(|| b.score.total_cmp(&a.score))
                .then_with(|| a.url.cmp(&b.url))
        });

        let edges = self
            .registry
            .edges()
            .iter()
            .map(|(source, target)| GraphEdge {
                source: source.clone(),
                target: target.clone(),
                relation: "discovered".to_string(),
            })
            .collect();

        CrawlReport {
            target: self.config.target.clone(),
            apex: self.config.apex.clone(),
            start: start_urls.to_vec(),
            budgets: self.config.budgets,
            stats: CrawlStats {
                requests_made: self.requests_made,
                nodes_discovered: self.registry.len() as u64,
                nodes_fetched: self.visited.len() as u64,
                frontier_remaining: self.frontier.len() as u64,
                max_depth_reached: self.registry.max_depth_reached(),
                stop_reason: self.stop_reason.unwrap_or(StopReason::FrontierEmpty),
                patterns_suppressed_total: self.registry.patterns_suppressed_total(),
            },
            discovered: DiscoveredUrls {
                subdomains: self.registry.subdomains().iter().cloned().collect(),
                directories_by_host,
                urls: pages.clone(),
                pages,
                api: clean(self.registry.api()),
                feeds: clean(self.registry.feeds()),
                assets: clean(self.registry.assets()),
                routes: clean(self.registry.routes()),
                js_files: self.registry.js_files().iter().cloned().collect(),
                requests: self.registry.network_requests().iter().cloned().collect(),
                query_urls: self.registry.query_urls().iter().cloned().collect(),
            },
            crawl_graph: CrawlGraph { nodes, edges },
        }
    }
}

/// `?query=<q>` (or `&query=<q>`) variants of a fetched page for each
/// configured seed query.
fn build_query_urls(base_url: &str, seeds: &[String]) -> Vec<String> {
    seeds
        .iter()
        .filter_map(|q| {
            let q = q.trim();
            if q.is_empty() {
                return None;
            }
            if base_url.contains('?') {
                Some(format!("{base_url}&query={q}"))
            } else {
                Some(format!("{base_url}?query={q}"))
            }
        })
        .collect()
}

/// Start URLs for a CLI target: a scheme-qualified target is the single
/// seed; a bare host is seeded over both https and http.
fn start_urls_for(target: &str) -> (String, Vec<String>) {
    let trimmed = target.trim();
    match Url::parse(trimmed) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
            let host = parsed
                .host_str()
                .map(str::to_owned)
                .unwrap_or_else(|| trimmed.to_string());
            (host, vec![trimmed.to_string()])
        }
        _ => {
            let host = trimmed.to_string();
            (
                host.clone(),
                vec![format!("https://{host}"), format!("http://{host}")],
            )
        }
    }
}

pub async fn run(args: CrawlArgs) -> anyhow::Result<()> {
    let target = args.target.trim();
    if target.is_empty() {
        anyhow::bail!("target must not be empty");
    }

    let (host, start) = start_urls_for(target);
    let apex = apex_of(&host);

    let budgets = Budgets {
        max_requests: args.max_requests,
        max_time_s: args.max_time_s,
        max_nodes: args.max_nodes,
        max_depth: args.max_depth,
        max_per_pattern: args.max_per_pattern,
    };
    let seed_queries: Vec<String> = args
        .seed_queries
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();

    if args.headless {
        tracing::warn!("no headless renderer is wired into this build; --headless ignored");
    }

    let config = CrawlConfig {
        target: host.clone(),
        apex: apex.clone(),
        budgets,
        timeout_s: args.timeout_s,
        rate_limit_s: args.rate_limit_ms as f64 / 1000.0,
        remove_tracking: !args.keep_tracking,
        seed_queries,
    };

    let fetcher = Arc::new(HttpFetcher::new().context("build fetcher")?);
    let mut engine = CrawlEngine::new(config).with_fetcher(fetcher);

    tracing::info!(target = %host, apex = %apex, seeds = start.len(), "starting crawl");
    let report = engine.crawl(&start).await;
    tracing::info!(
        requests = report.stats.requests_made,
        nodes = report.stats.nodes_discovered,
        stop_reason = ?report.stats.stop_reason,
        "crawl finished"
    );

    let pretty = serde_json::to_string_pretty(&report).context("serialize report")?;
    println!("{pretty}");

    if let Some(out) = &args.out {
        let out_path = PathBuf::from(out);
        if let Some(parent) = out_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create report dir: {}", parent.display()))?;
            }
        }
        std::fs::write(&out_path, format!("{pretty}\n"))
            .with_context(|| format!("write report: {}", out_path.display()))?;
    }

    Ok(())
}
