use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::news::ArticleSource;
use crate::pipeline::{SourceText, TimelinePipeline};
use crate::timeline::Timeline;
use crate::TARGET_PIPELINE;

/// Query-to-timeline entry point: article retrieval in front of the pipeline.
#[derive(Clone)]
pub struct TimelineService {
    source: Arc<dyn ArticleSource>,
    pipeline: TimelinePipeline,
}

impl TimelineService {
    pub fn new(source: Arc<dyn ArticleSource>, pipeline: TimelinePipeline) -> Self {
        Self { source, pipeline }
    }

    /// Retrieves articles for the query and runs the full pipeline over them.
    pub async fn generate_timeline(
        &self,
        query: &str,
        cancel: CancellationToken,
    ) -> Result<Timeline, PipelineError> {
        let query = query.trim();
        info!(target: TARGET_PIPELINE, "Timeline requested for '{}'", query);

        let articles = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            articles = self.source.fetch_articles(query) => articles?,
        };

        if articles.is_empty() {
            warn!(target: TARGET_PIPELINE, "No articles found for '{}'", query);
            return Err(PipelineError::NoEvents);
        }

        let sources: Vec<SourceText> = articles
            .iter()
            .map(|article| SourceText {
                text: article.as_source_text(),
                url: Some(article.url.clone()),
            })
            .collect();

        self.pipeline.generate(query, &sources, cancel).await
    }
}
