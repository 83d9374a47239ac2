use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::timeline::format::{format_time_window, parse_time_window, TimeWindowParseError};

/// A summarized group of related events inside one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substory {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub events: Vec<Event>,
}

/// One time window of the finished timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireWindow", try_from = "WireWindow")]
pub struct TimelineWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub substories: Vec<Substory>,
}

impl TimelineWindow {
    pub fn time_window(&self) -> String {
        format_time_window(self.start, self.end)
    }

    pub fn event_count(&self) -> usize {
        self.substories.iter().map(|s| s.events.len()).sum()
    }
}

/// Serialized form of a window, with the range flattened into `time_window`.
#[derive(Serialize, Deserialize)]
struct WireWindow {
    time_window: String,
    substories: Vec<Substory>,
}

impl From<TimelineWindow> for WireWindow {
    fn from(window: TimelineWindow) -> Self {
        WireWindow {
            time_window: window.time_window(),
            substories: window.substories,
        }
    }
}

impl TryFrom<WireWindow> for TimelineWindow {
    type Error = TimeWindowParseError;

    fn try_from(wire: WireWindow) -> Result<Self, Self::Error> {
        let (start, end) = parse_time_window(&wire.time_window)?;
        Ok(TimelineWindow {
            start,
            end,
            substories: wire.substories,
        })
    }
}

/// The generated timeline for a query, windows in ascending order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub query: String,
    #[serde(rename = "timeline")]
    pub windows: Vec<TimelineWindow>,
}

impl Timeline {
    pub fn event_count(&self) -> usize {
        self.windows.iter().map(TimelineWindow::event_count).sum()
    }

    pub fn substory_count(&self) -> usize {
        self.windows.iter().map(|w| w.substories.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn sample() -> Timeline {
        Timeline {
            query: "iran israel".to_string(),
            windows: vec![TimelineWindow {
                start: date(1),
                end: date(28),
                substories: vec![Substory {
                    summary: "Strikes and a ceasefire.".to_string(),
                    title: None,
                    events: vec![
                        Event::new(date(1), "Israel launched air strikes on Iran"),
                        Event::new(date(28), "Ceasefire holds")
                            .with_source_url("https://example.com/b"),
                    ],
                }],
            }],
        }
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["query"], "iran israel");
        let window = &json["timeline"][0];
        assert_eq!(window["time_window"], "2025-06-01 – 2025-06-28");
        let substory = &window["substories"][0];
        assert_eq!(substory["summary"], "Strikes and a ceasefire.");
        assert!(substory.get("title").is_none());
        assert_eq!(substory["events"][0]["date"], "2025-06-01");
        assert_eq!(substory["events"][1]["source_url"], "https://example.com/b");
        assert!(window.get("start").is_none());
    }

    #[test]
    fn test_wire_shape_reads_back() {
        let timeline = sample();
        let text = serde_json::to_string(&timeline).unwrap();
        let parsed: Timeline = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, timeline);
        assert_eq!(parsed.event_count(), 2);
        assert_eq!(parsed.substory_count(), 1);
    }
}
