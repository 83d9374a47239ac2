//! Error taxonomy for timeline generation.
//!
//! Extraction and generation failures abort a run. Embedding failures are
//! contained to the window that hit them. [`PipelineError`] is what the
//! transport layer sees.

use std::time::Duration;

use thiserror::Error;

/// Marker for an external call that exceeded its time budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout(pub Duration);

/// Upstream text could not be turned into structured events.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("extraction request failed: {0}")]
    Request(String),

    #[error("malformed extraction output: {0}")]
    Malformed(String),

    #[error("extraction timed out after {0:?}")]
    TimedOut(Duration),
}

/// Vectors could not be computed for a window's events.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    #[error("embedding model error: {0}")]
    Model(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("embedding timed out after {0:?}")]
    TimedOut(Duration),
}

/// The language model could not produce a usable summary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Request(String),

    #[error("generation returned empty or degenerate text")]
    Empty,

    #[error("generation timed out after {0:?}")]
    TimedOut(Duration),
}

/// Article retrieval failed before extraction could start.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("article source is not configured: {0}")]
    NotConfigured(String),

    #[error("article request failed: {0}")]
    Request(String),

    #[error("unexpected article source response: {0}")]
    Response(String),
}

/// Error returned to callers of the timeline entry points.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("no events could be extracted for the query")]
    NoEvents,

    #[error("temporal clustering failed: {0}")]
    Clustering(String),

    #[error("timeline invariant violated: {0}")]
    Invariant(String),

    #[error("timeline generation was cancelled")]
    Cancelled,

    #[error("pipeline task failed: {0}")]
    Task(String),
}

impl From<Timeout> for ExtractionError {
    fn from(t: Timeout) -> Self {
        ExtractionError::TimedOut(t.0)
    }
}

impl From<Timeout> for EmbeddingError {
    fn from(t: Timeout) -> Self {
        EmbeddingError::TimedOut(t.0)
    }
}

impl From<Timeout> for GenerationError {
    fn from(t: Timeout) -> Self {
        GenerationError::TimedOut(t.0)
    }
}

impl From<Timeout> for SourceError {
    fn from(t: Timeout) -> Self {
        SourceError::Request(format!("timed out after {:?}", t.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_wraps_into_pipeline_error() {
        let err: PipelineError = GenerationError::Empty.into();
        assert!(matches!(err, PipelineError::Generation(GenerationError::Empty)));
        assert_eq!(
            err.to_string(),
            "generation returned empty or degenerate text"
        );
    }

    #[test]
    fn test_timeout_converts_per_capability() {
        let t = Timeout(Duration::from_secs(5));
        assert_eq!(
            ExtractionError::from(t),
            ExtractionError::TimedOut(Duration::from_secs(5))
        );
        assert_eq!(
            EmbeddingError::from(t),
            EmbeddingError::TimedOut(Duration::from_secs(5))
        );
        assert_eq!(
            GenerationError::from(t),
            GenerationError::TimedOut(Duration::from_secs(5))
        );
    }
}
