//! HTTP client creation and page fetching for article sources.

use reqwest::{cookie::Jar, header};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::TARGET_WEB_REQUEST;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Create a client with a cookie store, gzip and default redirects.
pub fn create_http_client() -> Result<reqwest::Client, SourceError> {
    let cookie_store = Jar::default();
    reqwest::Client::builder()
        .cookie_store(true)
        .cookie_provider(Arc::new(cookie_store))
        .gzip(true)
        .redirect(reqwest::redirect::Policy::default())
        .user_agent(BROWSER_USER_AGENT)
        .build()
        .map_err(|e| SourceError::Request(format!("failed to build HTTP client: {}", e)))
}

/// Fetch a page as text. Non-success statuses are errors.
pub async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<String, SourceError> {
    debug!(target: TARGET_WEB_REQUEST, "Fetching {}", url);

    let response = timeout(
        REQUEST_TIMEOUT,
        client
            .get(url)
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send(),
    )
    .await
    .map_err(|_| {
        warn!(target: TARGET_WEB_REQUEST, "Request to {} timed out after {}s", url, REQUEST_TIMEOUT.as_secs());
        SourceError::Request(format!("request to {} timed out", url))
    })?
    .map_err(|e| SourceError::Request(format!("request to {} failed: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(SourceError::Response(format!(
            "{} returned HTTP {}",
            url,
            response.status()
        )));
    }

    response
        .text()
        .await
        .map_err(|e| SourceError::Response(format!("failed to read body of {}: {}", url, e)))
}
