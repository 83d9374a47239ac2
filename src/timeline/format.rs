use chrono::NaiveDate;
use thiserror::Error;

use crate::event::{format_event_date, parse_event_date};

/// Separator between the two dates of a formatted window (en dash).
pub const TIME_WINDOW_SEPARATOR: &str = " – ";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeWindowParseError {
    #[error("time window has no separator: {0}")]
    MissingSeparator(String),

    #[error("unrecognized date in time window: {0}")]
    BadDate(String),

    #[error("time window ends before it starts: {0}")]
    Reversed(String),
}

/// Formats a window's range as `<start> – <end>`.
pub fn format_time_window(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "{}{}{}",
        format_event_date(start),
        TIME_WINDOW_SEPARATOR,
        format_event_date(end)
    )
}

/// Inverse of [`format_time_window`]. Also accepts a spaced ASCII hyphen.
pub fn parse_time_window(raw: &str) -> Result<(NaiveDate, NaiveDate), TimeWindowParseError> {
    let (start, end) = raw
        .split_once('–')
        .or_else(|| raw.split_once(" - "))
        .ok_or_else(|| TimeWindowParseError::MissingSeparator(raw.to_string()))?;

    let start = parse_event_date(start)
        .ok_or_else(|| TimeWindowParseError::BadDate(start.trim().to_string()))?;
    let end =
        parse_event_date(end).ok_or_else(|| TimeWindowParseError::BadDate(end.trim().to_string()))?;

    if end < start {
        return Err(TimeWindowParseError::Reversed(raw.to_string()));
    }
    Ok((start, end))
}
