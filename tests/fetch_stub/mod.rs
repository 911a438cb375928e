#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use siterecon::fetch::{FetchResponse, Fetcher};

/// Canned response for one URL.
#[derive(Debug, Clone)]
pub struct StubPage {
    pub final_url: Option<String>,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

pub fn html_page(body: &str) -> StubPage {
    StubPage {
        final_url: None,
        status: 200,
        content_type: Some("text/html; charset=utf-8".to_string()),
        body: body.to_string(),
    }
}

pub fn redirected_page(final_url: &str, body: &str) -> StubPage {
    StubPage {
        final_url: Some(final_url.to_string()),
        status: 200,
        content_type: Some("text/html".to_string()),
        body: body.to_string(),
    }
}

pub fn json_response(body: &str) -> StubPage {
    StubPage {
        final_url: None,
        status: 200,
        content_type: Some("application/json".to_string()),
        body: body.to_string(),
    }
}

pub fn error_page(status: u16) -> StubPage {
    StubPage {
        final_url: None,
        status,
        content_type: Some("text/html".to_string()),
        body: "<html><body>error</body></html>".to_string(),
    }
}

/// In-memory fetcher. Unknown URLs return a transport error; the fetch log
/// records pop order for assertions.
pub struct StubFetcher {
    pages: HashMap<String, StubPage>,
    pub fetched: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl StubFetcher {
    pub fn new(pages: HashMap<String, StubPage>) -> Self {
        Self {
            pages,
            fetched: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Simulate slow responses, for time-budget tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetch_log(&self) -> Vec<String> {
        self.fetched.lock().expect("fetch log lock").clone()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn get(&self, url: &str, _timeout: Duration) -> anyhow::Result<FetchResponse> {
        self.fetched
            .lock()
            .expect("fetch log lock")
            .push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let Some(page) = self.pages.get(url) else {
            anyhow::bail!("connection refused: {url}");
        };
        Ok(FetchResponse {
            final_url: page
                .final_url
                .clone()
                .unwrap_or_else(|| url.to_string()),
            status: page.status,
            content_type: page.content_type.clone(),
            body: page.body.clone(),
        })
    }
}

pub fn assert_strictly_ascending(list: &[String], label: &str) {
    for window in list.windows(2) {
        assert!(
            window[0] < window[1],
            "{label} not strictly ascending: {:?} >= {:?}",
            window[0],
            window[1]
        );
    }
}
