use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::PipelineError;
use crate::pipeline::TimelineService;
use crate::timeline::Timeline;
use crate::TARGET_WEB_REQUEST;

/// Request payload for timeline generation.
#[derive(Debug, Deserialize)]
pub struct TimelineRequest {
    pub query: String,
}

/// Error payload returned with non-2xx responses.
#[derive(Debug, Serialize, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Clone)]
struct AppState {
    service: Arc<TimelineService>,
}

pub fn router(service: Arc<TimelineService>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/timeline", post(generate_timeline))
        .with_state(AppState { service })
}

/// Runs the HTTP API until the process is stopped.
pub async fn app_api_loop(service: Arc<TimelineService>, port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!(target: TARGET_WEB_REQUEST, "Server running on http://{}", addr);

    axum::serve(listener, router(service).into_make_service()).await?;
    Ok(())
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Timeline Generator API is running" }))
}

/// Generates a timeline for the posted query. If the client goes away the
/// handler future is dropped, and the drop guard cancels the run.
async fn generate_timeline(
    State(state): State<AppState>,
    Json(payload): Json<TimelineRequest>,
) -> Result<Json<Timeline>, (StatusCode, Json<ErrorResponse>)> {
    if payload.query.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                detail: "Query must not be empty".to_string(),
            }),
        ));
    }

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    info!(target: TARGET_WEB_REQUEST, "POST /timeline query='{}'", payload.query);
    match state.service.generate_timeline(&payload.query, cancel).await {
        Ok(timeline) => Ok(Json(timeline)),
        Err(err) => {
            error!(target: TARGET_WEB_REQUEST, "Timeline generation failed for '{}': {}", payload.query, err);
            Err(error_response(&err))
        }
    }
}

fn error_response(err: &PipelineError) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            detail: format!("Error generating timeline: {}", err),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::error::{EmbeddingError, ExtractionError, GenerationError, SourceError};
    use crate::event::{Event, EventExtractor};
    use crate::news::{Article, ArticleSource};
    use crate::pipeline::TimelinePipeline;
    use crate::summary::{Summarizer, Summary};
    use crate::vector::Embedder;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    struct DownSource;

    #[async_trait]
    impl ArticleSource for DownSource {
        async fn fetch_articles(&self, _query: &str) -> Result<Vec<Article>, SourceError> {
            Err(SourceError::Request("connection refused".to_string()))
        }
    }

    struct OneArticle;

    #[async_trait]
    impl ArticleSource for OneArticle {
        async fn fetch_articles(&self, _query: &str) -> Result<Vec<Article>, SourceError> {
            Ok(vec![Article {
                title: "Ceasefire".to_string(),
                url: "https://example.com/a".to_string(),
                text: "A ceasefire was announced.".to_string(),
                published_at: NaiveDate::from_ymd_opt(2025, 6, 24),
            }])
        }
    }

    struct Fixed;

    #[async_trait]
    impl EventExtractor for Fixed {
        async fn extract(&self, _text: &str, _query: &str) -> Result<Vec<Event>, ExtractionError> {
            Ok(vec![Event::new(
                NaiveDate::from_ymd_opt(2025, 6, 24).unwrap(),
                "Ceasefire announced",
            )])
        }
    }

    #[async_trait]
    impl Embedder for Fixed {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0, 0.0])
        }
    }

    #[async_trait]
    impl Summarizer for Fixed {
        async fn summarize(
            &self,
            _descriptions: &[String],
            _context: Option<&str>,
        ) -> Result<Summary, GenerationError> {
            Ok(Summary {
                summary: "A ceasefire was announced.".to_string(),
                title: Some("Ceasefire".to_string()),
            })
        }
    }

    fn state(source: Arc<dyn ArticleSource>) -> State<AppState> {
        let pipeline = TimelinePipeline::new(
            Arc::new(Fixed),
            Arc::new(Fixed),
            Arc::new(Fixed),
            PipelineConfig::default(),
        );
        State(AppState {
            service: Arc::new(TimelineService::new(source, pipeline)),
        })
    }

    fn request(query: &str) -> Json<TimelineRequest> {
        Json(TimelineRequest {
            query: query.to_string(),
        })
    }

    #[tokio::test]
    async fn test_root_reports_running() {
        let Json(body) = root().await;
        assert_eq!(body["message"], "Timeline Generator API is running");
    }

    #[tokio::test]
    async fn test_generate_timeline_success() {
        let Json(timeline) = generate_timeline(state(Arc::new(OneArticle)), request("ceasefire"))
            .await
            .unwrap();
        assert_eq!(timeline.query, "ceasefire");
        assert_eq!(timeline.windows.len(), 1);
        let event = &timeline.windows[0].substories[0].events[0];
        assert_eq!(event.source_url.as_deref(), Some("https://example.com/a"));
    }

    #[tokio::test]
    async fn test_failure_maps_to_500_detail() {
        let (status, Json(body)) = generate_timeline(state(Arc::new(DownSource)), request("iran"))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body.detail,
            "Error generating timeline: article request failed: connection refused"
        );
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let (status, _) = generate_timeline(state(Arc::new(OneArticle)), request("   "))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
