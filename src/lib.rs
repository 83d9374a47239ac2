pub mod app_api;
pub mod clustering;
pub mod config;
pub mod environment;
pub mod error;
pub mod event;
pub mod llm;
pub mod logging;
pub mod news;
pub mod pipeline;
pub mod prompt;
pub mod retry;
pub mod summary;
pub mod timeline;
pub mod vector;

use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use ollama_rs::Ollama;

pub use config::{PipelineConfig, ServiceConfig};
pub use error::{EmbeddingError, ExtractionError, GenerationError, PipelineError};
pub use event::Event;
pub use pipeline::{TimelinePipeline, TimelineService};
pub use timeline::Timeline;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_LLM_REQUEST: &str = "llm_request";
pub const TARGET_PIPELINE: &str = "pipeline";
pub const TARGET_CLUSTERING: &str = "clustering";

#[derive(Clone, Debug)]
pub enum LLMClient {
    Ollama(Ollama),
    OpenAI(OpenAIClient<OpenAIConfig>),
}

/// Connection and sampling settings for a single LLM role (extraction or summary).
#[derive(Clone, Debug)]
pub struct LLMParams {
    pub llm_client: LLMClient,
    pub model: String,
    pub temperature: f32,
}
