//! Pipeline and service configuration.
//!
//! [`PipelineConfig`] is threaded explicitly into every pipeline run so tests can
//! drive the core with mocked capabilities and fixed settings. [`ServiceConfig`]
//! gathers the transport-level settings from the process environment.

use std::time::Duration;

use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use ollama_rs::Ollama;
use tracing::info;

use crate::environment::{get_env_parsed, get_env_secs, get_env_string};
use crate::{LLMClient, LLMParams};

/// Tunables for one pipeline invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Target number of time windows.
    pub window_count: usize,
    /// Shortest calendar span, in days, that justifies a window of its own.
    pub min_window_days: i64,
    /// Windows with fewer events than this skip semantic clustering.
    pub min_semantic_window: usize,
    /// Minimum neighbourhood size for a density cluster.
    pub density_min_points: usize,
    /// Neighbourhood radius (L2 over unit-normalized embeddings). 0.75 admits
    /// pairs at cosine 0.72 and above, where MiniLM places different reports of
    /// the same development; unrelated stories on one topic sit near 0.3.
    pub density_tolerance: f64,
    /// Time budget for each external call attempt.
    pub request_timeout: Duration,
    /// Retries allowed after the first attempt of an external call.
    pub retry_budget: usize,
    /// Pause between attempts.
    pub retry_backoff: Duration,
    /// Windows processed concurrently after temporal clustering.
    pub max_window_tasks: usize,
    /// External calls allowed in flight at once across the run.
    pub max_inflight_requests: usize,
    /// Events kept when a summary is retried with a shortened prompt.
    pub retry_summary_events: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_count: 4,
            min_window_days: 7,
            min_semantic_window: 3,
            density_min_points: 2,
            density_tolerance: 0.75,
            request_timeout: Duration::from_secs(120),
            retry_budget: 1,
            retry_backoff: Duration::from_secs(2),
            max_window_tasks: 4,
            max_inflight_requests: 4,
            retry_summary_events: 8,
        }
    }
}

impl PipelineConfig {
    /// Builds a config from `TIMELINE_*` environment variables, using defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            window_count: get_env_parsed("TIMELINE_WINDOWS", defaults.window_count).max(1),
            min_window_days: get_env_parsed("TIMELINE_MIN_WINDOW_DAYS", defaults.min_window_days)
                .max(1),
            min_semantic_window: get_env_parsed(
                "TIMELINE_MIN_SEMANTIC_WINDOW",
                defaults.min_semantic_window,
            ),
            density_min_points: get_env_parsed(
                "TIMELINE_DENSITY_MIN_POINTS",
                defaults.density_min_points,
            )
            .max(2),
            density_tolerance: get_env_parsed(
                "TIMELINE_DENSITY_TOLERANCE",
                defaults.density_tolerance,
            ),
            request_timeout: get_env_secs("TIMELINE_REQUEST_TIMEOUT", defaults.request_timeout),
            retry_budget: get_env_parsed("TIMELINE_RETRY_BUDGET", defaults.retry_budget),
            retry_backoff: get_env_secs("TIMELINE_RETRY_BACKOFF", defaults.retry_backoff),
            max_window_tasks: get_env_parsed("TIMELINE_WINDOW_TASKS", defaults.max_window_tasks)
                .max(1),
            max_inflight_requests: get_env_parsed(
                "TIMELINE_INFLIGHT_REQUESTS",
                defaults.max_inflight_requests,
            )
            .max(1),
            retry_summary_events: get_env_parsed(
                "TIMELINE_RETRY_SUMMARY_EVENTS",
                defaults.retry_summary_events,
            )
            .max(1),
        }
    }
}

/// Which hosted or local LLM backend to talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    Ollama { host: String, port: u16 },
    OpenAI { api_key: String },
}

/// Settings for the service wrapped around the pipeline.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub backend: LlmBackend,
    pub extraction_model: String,
    pub extraction_temperature: f32,
    pub summary_model: String,
    pub summary_temperature: f32,
    pub newsapi_key: Option<String>,
    pub news_page_size: usize,
    /// Extract events from NewsAPI snippets without downloading each article.
    pub news_snippets_only: bool,
    pub embedding_model_dir: String,
    pub port: u16,
    pub pipeline: PipelineConfig,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let backend = match get_env_string("LLM_TYPE", "ollama").to_lowercase().as_str() {
            "openai" => LlmBackend::OpenAI {
                api_key: get_env_string("OPENAI_API_KEY", ""),
            },
            _ => LlmBackend::Ollama {
                host: get_env_string("OLLAMA_HOST", "http://localhost"),
                port: get_env_parsed("OLLAMA_PORT", 11434),
            },
        };

        let default_model = match backend {
            LlmBackend::OpenAI { .. } => "gpt-4o",
            LlmBackend::Ollama { .. } => "llama3.1",
        };

        Self {
            backend,
            extraction_model: get_env_string("EXTRACTION_MODEL", default_model),
            extraction_temperature: get_env_parsed("EXTRACTION_TEMPERATURE", 0.2),
            summary_model: get_env_string("SUMMARY_MODEL", default_model),
            summary_temperature: get_env_parsed("SUMMARY_TEMPERATURE", 0.3),
            newsapi_key: std::env::var("NEWSAPI_KEY").ok().filter(|k| !k.is_empty()),
            news_page_size: get_env_parsed("NEWS_PAGE_SIZE", 10),
            news_snippets_only: get_env_parsed("NEWS_SNIPPETS_ONLY", false),
            embedding_model_dir: get_env_string("EMBEDDING_MODEL_DIR", "models"),
            port: get_env_parsed("PORT", 8000),
            pipeline: PipelineConfig::from_env(),
        }
    }

    /// Creates the client for the configured backend.
    pub fn llm_client(&self) -> LLMClient {
        match &self.backend {
            LlmBackend::Ollama { host, port } => {
                info!("Connecting to Ollama at {}:{}", host, port);
                LLMClient::Ollama(Ollama::new(host.clone(), *port))
            }
            LlmBackend::OpenAI { api_key } => {
                info!("Using OpenAI API");
                let config = OpenAIConfig::new().with_api_key(api_key.clone());
                LLMClient::OpenAI(OpenAIClient::with_config(config))
            }
        }
    }

    pub fn extraction_params(&self, client: &LLMClient) -> LLMParams {
        LLMParams {
            llm_client: client.clone(),
            model: self.extraction_model.clone(),
            temperature: self.extraction_temperature,
        }
    }

    pub fn summary_params(&self, client: &LLMClient) -> LLMParams {
        LLMParams {
            llm_client: client.clone(),
            model: self.summary_model.clone(),
            temperature: self.summary_temperature,
        }
    }
}
