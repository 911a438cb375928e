use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::budget::{Budgets, StopReason};
use crate::classify::UrlKind;

/// The result snapshot a crawl always produces, budget-stopped or not.
/// Every URL list is sorted ascending and contains canonical URLs only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlReport {
    pub target: String,
    pub apex: String,
    pub start: Vec<String>,
    pub budgets: Budgets,
    pub stats: CrawlStats,
    pub discovered: DiscoveredUrls,
    pub crawl_graph: CrawlGraph,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlStats {
    pub requests_made: u32,
    pub nodes_discovered: u64,
    pub nodes_fetched: u64,
    pub frontier_remaining: u64,
    pub max_depth_reached: u32,
    pub stop_reason: StopReason,
    pub patterns_suppressed_total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredUrls {
    pub subdomains: Vec<String>,
    pub directories_by_host: BTreeMap<String, Vec<String>>,
    pub urls: Vec<String>,
    pub pages: Vec<String>,
    pub api: Vec<String>,
    pub feeds: Vec<String>,
    pub assets: Vec<String>,
    pub routes: Vec<String>,
    pub js_files: Vec<String>,
    pub requests: Vec<String>,
    pub query_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub url: String,
    pub depth: u32,
    pub parent: Option<String>,
    pub score: f64,
    pub kind: UrlKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relation: String,
}
