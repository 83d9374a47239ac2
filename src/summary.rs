//! Narrative summaries for substory groups.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::error::{GenerationError, PipelineError};
use crate::event::{sort_chronologically, Event};
use crate::llm::generate_llm_response;
use crate::prompt::{substory_summary_prompt, SUMMARY_SYSTEM};
use crate::retry::{CallContext, RetryError};
use crate::{LLMParams, TARGET_LLM_REQUEST};

/// Prose produced for one substory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub summary: String,
    pub title: Option<String>,
}

/// Turns an ordered list of event lines into a summary paragraph.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        descriptions: &[String],
        context: Option<&str>,
    ) -> Result<Summary, GenerationError>;
}

/// Summarizer backed by a chat/completion model.
pub struct LlmSummarizer {
    params: LLMParams,
}

impl LlmSummarizer {
    pub fn new(params: LLMParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(
        &self,
        descriptions: &[String],
        context: Option<&str>,
    ) -> Result<Summary, GenerationError> {
        let prompt = substory_summary_prompt(&descriptions.join("\n"), context);
        let response = generate_llm_response(SUMMARY_SYSTEM, &prompt, &self.params).await?;
        parse_summary_response(&response)
    }
}

static JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

#[derive(Deserialize)]
struct SummaryReply {
    summary: Option<String>,
    title: Option<String>,
}

/// Reads a summary reply. A JSON object supplies `summary` and optionally
/// `title`, even when the model wraps it in prose. Anything else is taken as
/// the summary text itself.
pub fn parse_summary_response(raw: &str) -> Result<Summary, GenerationError> {
    let cleaned = raw.trim().trim_matches('`').trim();
    let cleaned = match cleaned.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => cleaned[4..].trim(),
        _ => cleaned,
    };

    let reply = serde_json::from_str::<SummaryReply>(cleaned).ok().or_else(|| {
        JSON_OBJECT
            .find(cleaned)
            .and_then(|m| serde_json::from_str::<SummaryReply>(m.as_str()).ok())
    });

    let (summary, title) = match reply {
        Some(reply) => (reply.summary.unwrap_or_default(), reply.title),
        None => {
            debug!(target: TARGET_LLM_REQUEST, "Summary reply is not JSON, using it verbatim");
            (cleaned.to_string(), None)
        }
    };

    let summary = summary.trim().to_string();
    if is_degenerate(&summary) {
        return Err(GenerationError::Empty);
    }

    Ok(Summary {
        summary,
        title: title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()),
    })
}

fn is_degenerate(text: &str) -> bool {
    !text.chars().any(char::is_alphanumeric)
}

/// The `n` events with the longest descriptions, back in chronological order.
pub fn salient_events(events: &[Event], n: usize) -> Vec<Event> {
    if events.len() <= n {
        return events.to_vec();
    }
    let mut ranked: Vec<(usize, &Event)> = events.iter().enumerate().collect();
    ranked.sort_by(|(ia, a), (ib, b)| {
        b.description
            .chars()
            .count()
            .cmp(&a.description.chars().count())
            .then(ia.cmp(ib))
    });
    ranked.truncate(n);
    ranked.sort_by_key(|(i, _)| *i);

    let mut kept: Vec<Event> = ranked.into_iter().map(|(_, e)| e.clone()).collect();
    sort_chronologically(&mut kept);
    kept
}

/// Summarizes a group of events with the run's retry budget. Retries send only
/// the most salient events.
pub async fn summarize_events(
    events: &[Event],
    context: Option<&str>,
    summarizer: &dyn Summarizer,
    ctx: &CallContext,
    shortened_len: usize,
) -> Result<Summary, PipelineError> {
    let full: Vec<String> = events.iter().map(Event::bullet).collect();
    let short: Vec<String> = salient_events(events, shortened_len)
        .iter()
        .map(Event::bullet)
        .collect();

    let result = ctx
        .call("summarize substory", |attempt| {
            let lines = if attempt == 0 { &full } else { &short };
            if attempt > 0 {
                warn!(target: TARGET_LLM_REQUEST, "Retrying summary with {} of {} events", lines.len(), full.len());
            }
            summarizer.summarize(lines, context)
        })
        .await;

    match result {
        Ok(summary) => {
            info!(target: TARGET_LLM_REQUEST, "Summarized {} events", events.len());
            Ok(summary)
        }
        Err(RetryError::Cancelled) => Err(PipelineError::Cancelled),
        Err(RetryError::Exhausted(err)) => {
            error!(target: TARGET_LLM_REQUEST, "Summary generation failed: {}", err);
            Err(PipelineError::Generation(err))
        }
    }
}
