use async_trait::async_trait;

/// Endpoints a JS analysis pass pulled out of a page's scripts.
#[derive(Debug, Clone, Default)]
pub struct JsDiscovery {
    pub routes: Vec<String>,
    pub api: Vec<String>,
    pub feeds: Vec<String>,
    pub assets: Vec<String>,
}

/// Sub-discoverer for routes and endpoints referenced from JavaScript.
/// Returns the discovery buckets plus the list of script URLs it analyzed.
/// The engine records the results but never enqueues them, and swallows
/// errors.
#[async_trait]
pub trait JsRouteDiscoverer: Send + Sync {
    async fn discover(
        &self,
        html: &str,
        base_url: &str,
    ) -> anyhow::Result<(JsDiscovery, Vec<String>)>;
}
