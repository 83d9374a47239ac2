use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::event::parse_event_date;
use crate::news::client::{create_http_client, REQUEST_TIMEOUT};
use crate::news::extract::extract_article_text;
use crate::news::{Article, ArticleSource};
use crate::TARGET_WEB_REQUEST;

pub const NEWSAPI_ENDPOINT: &str = "https://newsapi.org/v2/everything";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiResponse {
    status: String,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
    message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    content: Option<String>,
    published_at: Option<String>,
}

/// Searches NewsAPI and replaces each hit's snippet with the full article text
/// when it can be extracted.
pub struct NewsApiSource {
    api_key: String,
    page_size: usize,
    client: reqwest::Client,
    fetch_full_text: bool,
}

impl NewsApiSource {
    pub fn new(api_key: &str, page_size: usize) -> Result<Self, SourceError> {
        if api_key.trim().is_empty() {
            return Err(SourceError::NotConfigured("NEWSAPI_KEY is empty".to_string()));
        }
        Ok(Self {
            api_key: api_key.to_string(),
            page_size: page_size.max(1),
            client: create_http_client()?,
            fetch_full_text: true,
        })
    }

    /// Keep NewsAPI snippets instead of downloading each article.
    pub fn snippets_only(mut self) -> Self {
        self.fetch_full_text = false;
        self
    }

    async fn search(&self, query: &str) -> Result<Vec<Article>, SourceError> {
        let page_size = self.page_size.to_string();
        let response = self
            .client
            .get(NEWSAPI_ENDPOINT)
            .query(&[
                ("q", query),
                ("pageSize", page_size.as_str()),
                ("sortBy", "publishedAt"),
                ("language", "en"),
                ("apiKey", self.api_key.as_str()),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| SourceError::Request(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Response(e.to_string()))?;
        parse_newsapi_response(&body)
    }
}

#[async_trait]
impl ArticleSource for NewsApiSource {
    async fn fetch_articles(&self, query: &str) -> Result<Vec<Article>, SourceError> {
        let articles = self.search(query).await?;
        info!(target: TARGET_WEB_REQUEST, "Got {} articles for query '{}'", articles.len(), query);

        if !self.fetch_full_text {
            return Ok(articles.into_iter().filter(|a| !a.text.is_empty()).collect());
        }

        let resolved = join_all(articles.into_iter().map(|mut article| async move {
            match extract_article_text(&self.client, &article.url).await {
                Some(text) => article.text = text,
                None => debug!(target: TARGET_WEB_REQUEST, "Using snippet for {}", article.url),
            }
            article
        }))
        .await;

        Ok(resolved
            .into_iter()
            .filter(|article| {
                if article.text.is_empty() {
                    warn!(target: TARGET_WEB_REQUEST, "No text for {}, skipping", article.url);
                    false
                } else {
                    true
                }
            })
            .collect())
    }
}

/// Parse a `/v2/everything` response body into articles with snippet text.
pub fn parse_newsapi_response(body: &str) -> Result<Vec<Article>, SourceError> {
    let response: NewsApiResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::Response(format!("invalid NewsAPI JSON: {}", e)))?;

    if response.status != "ok" {
        return Err(SourceError::Response(
            response
                .message
                .unwrap_or_else(|| format!("NewsAPI status {}", response.status)),
        ));
    }

    Ok(response
        .articles
        .into_iter()
        .filter_map(|raw| {
            let url = raw.url.filter(|u| !u.is_empty())?;
            let text = raw
                .description
                .filter(|d| !d.trim().is_empty())
                .or(raw.content)
                .unwrap_or_default()
                .trim()
                .to_string();
            Some(Article {
                title: raw.title.unwrap_or_default(),
                url,
                text,
                published_at: raw.published_at.as_deref().and_then(parse_event_date),
            })
        })
        .collect())
}
