use std::collections::HashMap;
use std::sync::Arc;

use siterecon::budget::StopReason;
use siterecon::canonical::canonicalize;
use siterecon::classify::UrlKind;
use siterecon::crawl::{CrawlConfig, CrawlEngine};
use siterecon::formats::CrawlReport;

mod fetch_stub;
use fetch_stub::{
    StubFetcher, assert_strictly_ascending, html_page, json_response, redirected_page,
};

fn config(target: &str) -> CrawlConfig {
    let mut config = CrawlConfig::new(target, target);
    config.rate_limit_s = 0.0;
    config
}

fn small_site() -> HashMap<String, fetch_stub::StubPage> {
    let mut pages = HashMap::new();
    pages.insert(
        "https://example.com/".to_string(),
        html_page(
            r#"<html><body>
                <a href="/about">About</a>
                <a href="/item/1">One</a>
                <a href="/item/2">Two</a>
                <a href="https://api.example.com/v1/users">Users API</a>
                <img src="/logo.png">
                <a href="/feed">Feed</a>
                <a href="http://evil.test/">Elsewhere</a>
            </body></html>"#,
        ),
    );
    pages.insert(
        "https://example.com/about".to_string(),
        html_page(r#"<html><body><a href="/">Home</a></body></html>"#),
    );
    pages.insert(
        "https://example.com/item/1".to_string(),
        html_page("<html><body>one</body></html>"),
    );
    pages.insert(
        "https://example.com/item/2".to_string(),
        html_page("<html><body>two</body></html>"),
    );
    pages.insert(
        "https://api.example.com/v1/users".to_string(),
        json_response(r#"{"users": []}"#),
    );
    pages
}

async fn crawl_small_site() -> CrawlReport {
    let fetcher = Arc::new(StubFetcher::new(small_site()));
    let mut engine = CrawlEngine::new(config("example.com")).with_fetcher(fetcher);
    engine.crawl(&["https://example.com/".to_string()]).await
}

#[tokio::test]
async fn discovers_and_classifies_reachable_urls() {
    let report = crawl_small_site().await;

    assert_eq!(report.stats.stop_reason, StopReason::FrontierEmpty);
    assert_eq!(report.stats.nodes_discovered, 7);
    // Assets and feeds are registered but never fetched.
    assert_eq!(report.stats.requests_made, 5);
    assert_eq!(report.stats.nodes_fetched, 5);
    assert_eq!(report.stats.frontier_remaining, 0);
    assert_eq!(report.stats.max_depth_reached, 1);

    assert!(report.discovered.pages.contains(&"https://example.com/".to_string()));
    assert!(report.discovered.pages.contains(&"https://example.com/about".to_string()));
    assert!(report.discovered.api.contains(&"https://api.example.com/v1/users".to_string()));
    assert!(report.discovered.assets.contains(&"https://example.com/logo.png".to_string()));
    assert!(report.discovered.feeds.contains(&"https://example.com/feed".to_string()));
    assert_eq!(report.discovered.urls, report.discovered.pages);

    assert_eq!(report.discovered.subdomains, vec!["api.example.com"]);
    let dirs = &report.discovered.directories_by_host["example.com"];
    assert!(dirs.contains(&"/about".to_string()));
    assert!(dirs.contains(&"/item".to_string()));
    assert_eq!(
        report.discovered.directories_by_host["api.example.com"],
        vec!["/v1"]
    );
}

#[tokio::test]
async fn out_of_scope_urls_never_enter_the_registry() {
    let report = crawl_small_site().await;

    for node in &report.crawl_graph.nodes {
        assert!(
            !node.url.contains("evil.test"),
            "out-of-scope node: {}",
            node.url
        );
    }
    for list in [
        &report.discovered.pages,
        &report.discovered.api,
        &report.discovered.assets,
        &report.discovered.feeds,
    ] {
        assert!(list.iter().all(|u| !u.contains("evil.test")));
    }
}

#[tokio::test]
async fn graph_invariants_hold() {
    let report = crawl_small_site().await;

    let registry: Vec<&str> = report
        .crawl_graph
        .nodes
        .iter()
        .map(|n| n.url.as_str())
        .collect();

    for node in &report.crawl_graph.nodes {
        // Every node is its own canonical form.
        let recanonical = canonicalize(&node.url, None, true).expect("canonical node url");
        assert_eq!(recanonical.url, node.url);

        if let Some(parent) = &node.parent {
            assert!(registry.contains(&parent.as_str()), "orphan parent {parent}");
            assert!(node.depth >= 1);
        } else {
            assert_eq!(node.depth, 0);
        }
    }

    for edge in &report.crawl_graph.edges {
        assert_eq!(edge.relation, "discovered");
        assert!(registry.contains(&edge.source.as_str()));
        assert!(registry.contains(&edge.target.as_str()));
    }

    // Nodes sort by (depth asc, score desc, url asc).
    for window in report.crawl_graph.nodes.windows(2) {
        let (a, b) = (&window[0], &window[1]);
        assert!(
            a.depth < b.depth
                || (a.depth == b.depth && a.score > b.score)
                || (a.depth == b.depth && a.score == b.score && a.url < b.url)
        );
    }

    assert_strictly_ascending(&report.discovered.pages, "pages");
    assert_strictly_ascending(&report.discovered.api, "api");
    assert_strictly_ascending(&report.discovered.assets, "assets");
    assert_strictly_ascending(&report.discovered.feeds, "feeds");
    assert_strictly_ascending(&report.discovered.subdomains, "subdomains");
}

#[tokio::test]
async fn report_is_deterministic_across_runs() {
    let first = serde_json::to_string(&crawl_small_site().await).expect("serialize");
    let second = serde_json::to_string(&crawl_small_site().await).expect("serialize");
    assert_eq!(first, second);
}

#[tokio::test]
async fn report_uses_the_external_schema_names() {
    let report = crawl_small_site().await;
    let value = serde_json::to_value(&report).expect("to value");

    assert!(value.pointer("/budgets/maxRequests").is_some());
    assert!(value.pointer("/budgets/maxPerPattern").is_some());
    assert_eq!(
        value.pointer("/stats/stop_reason").and_then(|v| v.as_str()),
        Some("frontierEmpty")
    );
    assert_eq!(
        value
            .pointer("/crawl_graph/edges/0/type")
            .and_then(|v| v.as_str()),
        Some("discovered")
    );
}

#[tokio::test]
async fn https_seed_is_fetched_before_http_twin() {
    let mut pages = HashMap::new();
    pages.insert(
        "https://example.com/".to_string(),
        html_page("<html><body>secure</body></html>"),
    );
    pages.insert(
        "http://example.com/".to_string(),
        html_page("<html><body>plain</body></html>"),
    );

    let fetcher = Arc::new(StubFetcher::new(pages));
    let mut engine = CrawlEngine::new(config("example.com")).with_fetcher(fetcher.clone());
    let report = engine
        .crawl(&[
            "https://example.com".to_string(),
            "http://example.com".to_string(),
        ])
        .await;

    assert_eq!(
        fetcher.fetch_log(),
        vec!["https://example.com/", "http://example.com/"]
    );
    assert_eq!(report.stats.nodes_discovered, 2);
}

#[tokio::test]
async fn redirect_registers_a_same_depth_alias() {
    let mut pages = HashMap::new();
    pages.insert(
        "http://example.com/a".to_string(),
        redirected_page(
            "https://example.com/b",
            r#"<html><body><a href="/c">C</a></body></html>"#,
        ),
    );
    pages.insert(
        "https://example.com/c".to_string(),
        html_page("<html><body>c</body></html>"),
    );

    let fetcher = Arc::new(StubFetcher::new(pages));
    let mut engine = CrawlEngine::new(config("example.com")).with_fetcher(fetcher);
    let report = engine.crawl(&["http://example.com/a".to_string()]).await;

    let alias = report
        .crawl_graph
        .nodes
        .iter()
        .find(|n| n.url == "https://example.com/b")
        .expect("alias node");
    assert_eq!(alias.depth, 0);
    assert_eq!(alias.parent, None);
    assert_eq!(alias.kind, UrlKind::Page);

    assert!(
        report
            .crawl_graph
            .nodes
            .iter()
            .any(|n| n.url == "http://example.com/a")
    );
    // The landing URL, not the popped one, is recorded as the page and as
    // the edge source for what it links to.
    assert!(report.discovered.pages.contains(&"https://example.com/b".to_string()));
    assert!(
        report
            .crawl_graph
            .edges
            .iter()
            .any(|e| e.source == "https://example.com/b" && e.target == "https://example.com/c")
    );
}

#[tokio::test]
async fn transport_failures_abandon_the_node_and_continue() {
    let mut pages = HashMap::new();
    pages.insert(
        "https://example.com/".to_string(),
        html_page(
            r#"<html><body>
                <a href="/dead">Dead</a>
                <a href="/alive">Alive</a>
            </body></html>"#,
        ),
    );
    // /dead has no stub entry: the fetch errors out.
    pages.insert(
        "https://example.com/alive".to_string(),
        html_page("<html><body>alive</body></html>"),
    );

    let fetcher = Arc::new(StubFetcher::new(pages));
    let mut engine = CrawlEngine::new(config("example.com")).with_fetcher(fetcher);
    let report = engine.crawl(&["https://example.com/".to_string()]).await;

    assert_eq!(report.stats.stop_reason, StopReason::FrontierEmpty);
    assert_eq!(report.stats.requests_made, 3);
    assert!(report.discovered.pages.contains(&"https://example.com/alive".to_string()));
}

#[tokio::test]
async fn non_html_responses_are_not_expanded() {
    let mut pages = HashMap::new();
    pages.insert(
        "https://example.com/".to_string(),
        html_page(r#"<html><body><a href="/data">Data</a></body></html>"#),
    );
    pages.insert(
        "https://example.com/data".to_string(),
        json_response(r#"{"link": "https://example.com/never"}"#),
    );

    let fetcher = Arc::new(StubFetcher::new(pages));
    let mut engine = CrawlEngine::new(config("example.com")).with_fetcher(fetcher);
    let report = engine.crawl(&["https://example.com/".to_string()]).await;

    assert_eq!(report.stats.requests_made, 2);
    // The JSON body is never scanned for links.
    assert!(
        !report
            .crawl_graph
            .nodes
            .iter()
            .any(|n| n.url.ends_with("/never"))
    );
    assert!(report.discovered.pages.iter().all(|u| !u.ends_with("/never")));
}

#[tokio::test]
async fn out_of_scope_and_malformed_seeds_are_silently_dropped() {
    let mut pages = HashMap::new();
    pages.insert(
        "https://example.com/".to_string(),
        html_page("<html><body>home</body></html>"),
    );

    let fetcher = Arc::new(StubFetcher::new(pages));
    let mut engine = CrawlEngine::new(config("example.com")).with_fetcher(fetcher);
    let report = engine
        .crawl(&[
            "https://example.com/".to_string(),
            "https://elsewhere.test/".to_string(),
            "not a url at all".to_string(),
        ])
        .await;

    assert_eq!(report.stats.nodes_discovered, 1);
    assert_eq!(report.crawl_graph.nodes[0].url, "https://example.com/");
    assert_eq!(report.stats.stop_reason, StopReason::FrontierEmpty);
}
