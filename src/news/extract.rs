use readability::extractor;
use std::io::Cursor;
use tracing::{info, warn};
use url::Url;

use crate::news::client::fetch_page;
use crate::TARGET_WEB_REQUEST;

/// Download an article and pull its readable body text.
///
/// Returns `None` when the page cannot be fetched or has no readable text; the
/// caller falls back to whatever snippet it already has.
pub async fn extract_article_text(client: &reqwest::Client, url: &str) -> Option<String> {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(target: TARGET_WEB_REQUEST, "Skipping extraction of invalid URL {}: {}", url, e);
            return None;
        }
    };

    let html = match fetch_page(client, url).await {
        Ok(html) => html,
        Err(e) => {
            warn!(target: TARGET_WEB_REQUEST, "Error fetching article page: {}", e);
            return None;
        }
    };

    let product = tokio::task::spawn_blocking(move || {
        extractor::extract(&mut Cursor::new(html.into_bytes()), &parsed)
    })
    .await;

    match product {
        Ok(Ok(product)) => {
            let text = product.text.trim();
            if text.is_empty() {
                warn!(target: TARGET_WEB_REQUEST, "Extracted article is empty for URL: {}", url);
                return None;
            }
            info!(target: TARGET_WEB_REQUEST, "Extraction succeeded for URL: {}", url);
            Some(text.to_string())
        }
        Ok(Err(e)) => {
            warn!(target: TARGET_WEB_REQUEST, "Error extracting page {}: {:?}", url, e);
            None
        }
        Err(e) => {
            warn!(target: TARGET_WEB_REQUEST, "Extraction task for {} failed: {}", url, e);
            None
        }
    }
}
