use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use unicode_normalization::UnicodeNormalization;

/// Canonical calendar representation used for events on the wire and in prompts.
pub const EVENT_DATE_FORMAT: &str = "%Y-%m-%d";

/// A single dated thing that happened, as extracted from a source article.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    #[serde(with = "event_date")]
    pub date: NaiveDate,

    // Serialized as `event` to match the timeline wire shape
    #[serde(rename = "event")]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl Event {
    pub fn new(date: NaiveDate, description: &str) -> Self {
        Event {
            date,
            description: description.trim().to_string(),
            source_url: None,
        }
    }

    pub fn with_source_url(mut self, url: &str) -> Self {
        self.source_url = Some(url.to_string());
        self
    }

    /// Identity used for deduplication: the date plus a case- and
    /// whitespace-insensitive form of the description.
    pub fn dedup_key(&self) -> (NaiveDate, String) {
        let normalized = self
            .description
            .nfkc()
            .collect::<String>()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        (self.date, normalized)
    }

    /// Scalar feature for temporal clustering.
    pub fn day_number(&self) -> f64 {
        self.date.num_days_from_ce() as f64
    }

    /// `- <date>: <event>` bullet used in summarization prompts.
    pub fn bullet(&self) -> String {
        format!("- {}: {}", format_event_date(self.date), self.description)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", format_event_date(self.date), self.description)
    }
}

pub fn format_event_date(date: NaiveDate) -> String {
    date.format(EVENT_DATE_FORMAT).to_string()
}

/// Parses the date shapes language models and news APIs actually produce.
///
/// Accepts `YYYY/MM/DD`, `YYYY-MM-DD`, `YYYY.MM.DD`, RFC 3339 timestamps (date part
/// only) and month-precision dates (`YYYY/MM`, `YYYY-MM`), which resolve to the
/// first of the month.
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for format in ["%Y/%m/%d", "%Y-%m-%d", "%Y.%m.%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }

    // 2025-06-28T10:00:00Z and friends
    if raw.len() > 10 && raw.is_char_boundary(10) && raw[10..].starts_with('T') {
        return parse_event_date(&raw[..10]);
    }

    let parts: Vec<&str> = raw.split(['/', '-']).collect();
    if parts.len() == 2 {
        let year = parts[0].parse::<i32>().ok()?;
        let month = parts[1].parse::<u32>().ok()?;
        return NaiveDate::from_ymd_opt(year, month, 1);
    }

    None
}

/// Removes duplicate events, keeping the first occurrence of each
/// [`Event::dedup_key`] and preserving input order.
pub fn dedup_events(events: Vec<Event>) -> Vec<Event> {
    let mut seen = HashSet::new();
    events
        .into_iter()
        .filter(|event| seen.insert(event.dedup_key()))
        .collect()
}

/// Sorts events chronologically; events on the same day keep their relative order.
pub fn sort_chronologically(events: &mut [Event]) {
    events.sort_by_key(|event| event.date);
}

mod event_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_event_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_event_date(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognized event date: {}", raw)))
    }
}
