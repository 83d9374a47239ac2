use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, error, info};

use super::types::{parse_event_date, Event};
use super::TARGET_EVENT;
use crate::error::ExtractionError;
use crate::llm::generate_llm_response;
use crate::prompt::{event_extraction_prompt, EVENT_EXTRACTION_SYSTEM};
use crate::LLMParams;

static JSON_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").expect("valid regex"));

/// Turns unstructured source text into dated events.
#[async_trait]
pub trait EventExtractor: Send + Sync {
    async fn extract(&self, source_text: &str, query: &str) -> Result<Vec<Event>, ExtractionError>;
}

/// Extractor backed by a chat/completion model.
pub struct LlmEventExtractor {
    params: LLMParams,
}

impl LlmEventExtractor {
    pub fn new(params: LLMParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl EventExtractor for LlmEventExtractor {
    async fn extract(&self, source_text: &str, query: &str) -> Result<Vec<Event>, ExtractionError> {
        let prompt = event_extraction_prompt(source_text, query);

        let response = generate_llm_response(EVENT_EXTRACTION_SYSTEM, &prompt, &self.params)
            .await
            .map_err(|e| {
                error!(target: TARGET_EVENT, "Failed to generate event extraction response: {}", e);
                ExtractionError::Request(e.to_string())
            })?;

        let events = parse_event_response(&response)?;
        info!(target: TARGET_EVENT, "Extracted {} events from source text", events.len());
        Ok(events)
    }
}

/// Parse an extraction reply into events.
///
/// Accepts a bare JSON array, an array wrapped in markdown fences, or an object
/// with an `events` array. Any record without a non-empty description and a
/// recognizable date rejects the whole reply.
pub fn parse_event_response(raw: &str) -> Result<Vec<Event>, ExtractionError> {
    let cleaned = strip_code_fence(raw);

    let json: Value = match serde_json::from_str(cleaned) {
        Ok(parsed) => parsed,
        Err(first_err) => {
            // Models sometimes wrap the array in prose
            let candidate = JSON_ARRAY
                .find(cleaned)
                .map(|m| m.as_str())
                .ok_or_else(|| malformed(raw, &format!("invalid JSON: {}", first_err)))?;
            serde_json::from_str(candidate)
                .map_err(|e| malformed(raw, &format!("invalid JSON: {}", e)))?
        }
    };

    let records = match &json {
        Value::Array(records) => records,
        Value::Object(obj) => match obj.get("events").and_then(Value::as_array) {
            Some(records) => records,
            None => return Err(malformed(raw, "object without an 'events' array")),
        },
        _ => return Err(malformed(raw, "expected a JSON array of events")),
    };

    let events = records
        .iter()
        .enumerate()
        .map(|(i, record)| parse_event_object(record).ok_or_else(|| {
            malformed(raw, &format!("record {} is not a valid event: {}", i, record))
        }))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(target: TARGET_EVENT, "Parsed {} events from extraction response", events.len());
    Ok(events)
}

fn parse_event_object(value: &Value) -> Option<Event> {
    let description = value
        .get("event")
        .or_else(|| value.get("description"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())?;
    let date = value.get("date").and_then(Value::as_str).and_then(parse_event_date)?;

    let mut event = Event::new(date, description);
    if let Some(url) = value
        .get("source_url")
        .and_then(Value::as_str)
        .filter(|u| !u.trim().is_empty())
    {
        event = event.with_source_url(url.trim());
    }
    Some(event)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim().trim_matches('`').trim();
    match trimmed.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => trimmed[4..].trim(),
        _ => trimmed,
    }
}

fn malformed(raw: &str, reason: &str) -> ExtractionError {
    // Show up to 500 chars to avoid giant logs
    let preview: String = raw.chars().take(500).collect();
    error!(target: TARGET_EVENT, "Rejecting extraction output ({}). Raw content: {}", reason, preview);
    ExtractionError::Malformed(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parses_fenced_array() {
        let raw = "```json\n[{\"event\": \"Ceasefire between Israel and Iran\", \"date\": \"2025/06/01\"}]\n```";
        let events = parse_event_response(raw).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].date, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(events[0].description, "Ceasefire between Israel and Iran");
    }

    #[test]
    fn test_parses_array_inside_prose() {
        let raw = "Here are the events:\n[{\"event\": \"A\", \"date\": \"2024-01-02\"}]\nDone.";
        let events = parse_event_response(raw).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_parses_events_object_and_keeps_source_url() {
        let raw = r#"{"events": [{"event": "B", "date": "2024/03", "source_url": "https://x.test/b"}]}"#;
        let events = parse_event_response(raw).unwrap();
        assert_eq!(events[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(events[0].source_url.as_deref(), Some("https://x.test/b"));
    }

    #[test]
    fn test_empty_array_is_not_an_error() {
        assert!(parse_event_response("[]").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_bad_records() {
        let missing_date = r#"[{"event": "A"}]"#;
        assert!(matches!(
            parse_event_response(missing_date),
            Err(ExtractionError::Malformed(_))
        ));

        let empty_event = r#"[{"event": "  ", "date": "2024/01/01"}]"#;
        assert!(parse_event_response(empty_event).is_err());

        let range = r#"[{"event": "A", "date": "2024/01/01 - 2024/02/01"}]"#;
        assert!(parse_event_response(range).is_err());

        assert!(parse_event_response("I could not find any events.").is_err());
        assert!(parse_event_response(r#"{"status": "ok"}"#).is_err());
    }
}
