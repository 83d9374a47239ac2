//! Article retrieval: finding articles for a query and getting their text.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::SourceError;
use crate::event::format_event_date;

pub mod client;
pub mod extract;
pub mod newsapi;

pub use newsapi::NewsApiSource;

/// A news article with the best text we could get for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub text: String,
    pub published_at: Option<NaiveDate>,
}

impl Article {
    /// Text handed to the event extractor: publish date, title and body.
    pub fn as_source_text(&self) -> String {
        let published = self
            .published_at
            .map(format_event_date)
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "Publish Date:\n{}\n\nTitle:\n{}\n\nText:\n{}\n",
            published, self.title, self.text
        )
    }
}

/// Finds articles relevant to a query.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    async fn fetch_articles(&self, query: &str) -> Result<Vec<Article>, SourceError>;
}
