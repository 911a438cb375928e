use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

/// Fixed identifier sent with every request, stable across a run.
pub const USER_AGENT: &str = "Mozilla/5.0 (siterecon-link-discovery)";

/// What the engine needs back from one GET: where the redirect chain landed,
/// the status, the content type, and the body.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// HTTP capability injected into the engine. The engine issues one GET at a
/// time; redirects are followed by the implementation.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> anyhow::Result<FetchResponse>;
}

/// Optional render capability: fully load a page and report the HTML plus
/// the network requests observed while loading.
#[async_trait]
pub trait HeadlessRenderer: Send + Sync {
    async fn render(&self, url: &str) -> anyhow::Result<(String, Vec<String>)>;
}

/// Production fetcher on reqwest.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str, timeout: Duration) -> anyhow::Result<FetchResponse> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response
            .text()
            .await
            .with_context(|| format!("read body of {url}"))?;

        Ok(FetchResponse {
            final_url,
            status,
            content_type,
            body,
        })
    }
}
