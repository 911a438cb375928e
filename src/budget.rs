use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Hard multi-axis bounds for one crawl. A zero value disables that axis;
/// `max_depth` and `max_per_pattern` are per-URL rejects rather than stop
/// reasons. Immutable once the crawl starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budgets {
    #[serde(rename = "maxRequests")]
    pub max_requests: u32,
    #[serde(rename = "maxTime")]
    pub max_time_s: f64,
    #[serde(rename = "maxNodes")]
    pub max_nodes: u32,
    #[serde(rename = "maxDepth")]
    pub max_depth: Option<u32>,
    #[serde(rename = "maxPerPattern")]
    pub max_per_pattern: u32,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            max_requests: 120,
            max_time_s: 25.0,
            max_nodes: 2500,
            max_depth: None,
            max_per_pattern: 30,
        }
    }
}

impl Budgets {
    /// First tripped axis in precedence order: time, then requests, then
    /// nodes.
    pub fn check(
        &self,
        elapsed: Duration,
        requests_made: u32,
        nodes_discovered: usize,
    ) -> Option<StopReason> {
        if self.max_time_s > 0.0 && elapsed.as_secs_f64() >= self.max_time_s {
            return Some(StopReason::MaxTime);
        }
        if self.max_requests > 0 && requests_made >= self.max_requests {
            return Some(StopReason::MaxRequests);
        }
        if self.max_nodes > 0 && nodes_discovered >= self.max_nodes as usize {
            return Some(StopReason::MaxNodes);
        }
        None
    }
}

/// Why the crawl loop ended. Exactly one is reported per crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    #[serde(rename = "frontierEmpty")]
    FrontierEmpty,
    #[serde(rename = "maxTime")]
    MaxTime,
    #[serde(rename = "maxRequests")]
    MaxRequests,
    #[serde(rename = "maxNodes")]
    MaxNodes,
    #[serde(rename = "missingRequestsLib")]
    MissingFetcher,
    #[serde(rename = "stopped")]
    Stopped,
}
