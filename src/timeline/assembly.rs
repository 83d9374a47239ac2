use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, error};

use crate::clustering::SubstoryGroup;
use crate::error::PipelineError;
use crate::event::Event;
use crate::summary::Summary;
use crate::timeline::types::{Substory, Timeline, TimelineWindow};
use crate::TARGET_PIPELINE;

/// A finished window before assembly: its range plus summarized groups.
#[derive(Debug, Clone)]
pub struct WindowParts {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub groups: Vec<(SubstoryGroup, Summary)>,
}

/// Label used when the model gave no title.
pub fn positional_title(index: usize) -> String {
    format!("Substory {}", index + 1)
}

/// Shapes summarized windows into a [`Timeline`] and checks it against the
/// events that went in.
pub fn assemble(
    query: &str,
    parts: Vec<WindowParts>,
    input: &[Event],
) -> Result<Timeline, PipelineError> {
    let mut windows: Vec<TimelineWindow> = parts
        .into_iter()
        .map(|part| {
            let mut groups = part.groups;
            groups.sort_by_key(|(group, _)| group.earliest());
            let substories = groups
                .into_iter()
                .enumerate()
                .map(|(i, (group, summary))| Substory {
                    summary: summary.summary,
                    title: summary.title.or_else(|| Some(positional_title(i))),
                    events: group.events,
                })
                .collect();
            TimelineWindow {
                start: part.start,
                end: part.end,
                substories,
            }
        })
        .collect();
    windows.sort_by_key(|w| (w.start, w.end));

    let timeline = Timeline {
        query: query.to_string(),
        windows,
    };

    validate(&timeline, input).map_err(|err| {
        error!(target: TARGET_PIPELINE, "Assembled timeline is invalid: {}", err);
        err
    })?;
    debug!(target: TARGET_PIPELINE,
        "Assembled {} windows, {} substories, {} events",
        timeline.windows.len(), timeline.substory_count(), timeline.event_count()
    );
    Ok(timeline)
}

/// Checks the structural invariants of a timeline.
///
/// Every input event appears exactly once, windows are ordered and disjoint,
/// every window has a substory, every substory has events and a non-empty
/// summary, and events sit inside their window's range in date order.
pub fn validate(timeline: &Timeline, input: &[Event]) -> Result<(), PipelineError> {
    let mut remaining: HashMap<&Event, usize> = HashMap::new();
    for event in input {
        *remaining.entry(event).or_default() += 1;
    }

    let mut previous_end: Option<NaiveDate> = None;
    for window in &timeline.windows {
        let label = window.time_window();
        if window.start > window.end {
            return Err(invariant(format!("window {} is reversed", label)));
        }
        if let Some(prev) = previous_end {
            if window.start <= prev {
                return Err(invariant(format!(
                    "window {} overlaps or precedes the previous window",
                    label
                )));
            }
        }
        previous_end = Some(window.end);

        if window.substories.is_empty() {
            return Err(invariant(format!("window {} has no substories", label)));
        }

        for (i, substory) in window.substories.iter().enumerate() {
            if substory.events.is_empty() {
                return Err(invariant(format!("substory {} of {} has no events", i + 1, label)));
            }
            if substory.summary.trim().is_empty() {
                return Err(invariant(format!("substory {} of {} has an empty summary", i + 1, label)));
            }
            for pair in substory.events.windows(2) {
                if pair[0].date > pair[1].date {
                    return Err(invariant(format!("substory {} of {} is out of order", i + 1, label)));
                }
            }
            for event in &substory.events {
                if event.date < window.start || event.date > window.end {
                    return Err(invariant(format!("event '{}' falls outside window {}", event, label)));
                }
                match remaining.get_mut(event) {
                    Some(count) if *count > 0 => *count -= 1,
                    _ => {
                        return Err(invariant(format!(
                            "event '{}' is duplicated or was never extracted",
                            event
                        )))
                    }
                }
            }
        }
    }

    if let Some((missing, _)) = remaining.iter().find(|(_, count)| **count > 0) {
        return Err(invariant(format!("event '{}' is missing from the timeline", missing)));
    }
    Ok(())
}

fn invariant(message: String) -> PipelineError {
    PipelineError::Invariant(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn summary(text: &str, title: Option<&str>) -> Summary {
        Summary {
            summary: text.to_string(),
            title: title.map(str::to_string),
        }
    }

    fn inputs() -> Vec<Event> {
        vec![
            Event::new(date(1, 5), "a"),
            Event::new(date(1, 9), "b"),
            Event::new(date(3, 2), "c"),
        ]
    }

    fn parts(events: &[Event]) -> Vec<WindowParts> {
        vec![
            WindowParts {
                start: date(3, 2),
                end: date(3, 2),
                groups: vec![(SubstoryGroup::new(vec![events[2].clone()]), summary("third", None))],
            },
            WindowParts {
                start: date(1, 5),
                end: date(1, 9),
                groups: vec![
                    (SubstoryGroup::new(vec![events[1].clone()]), summary("second", Some("B"))),
                    (SubstoryGroup::new(vec![events[0].clone()]), summary("first", None)),
                ],
            },
        ]
    }

    #[test]
    fn test_assemble_orders_and_labels() {
        let events = inputs();
        let timeline = assemble("query", parts(&events), &events).unwrap();
        assert_eq!(timeline.query, "query");
        assert_eq!(timeline.windows.len(), 2);
        assert_eq!(timeline.windows[0].start, date(1, 5));

        let first = &timeline.windows[0].substories;
        assert_eq!(first[0].summary, "first");
        assert_eq!(first[0].title.as_deref(), Some("Substory 1"));
        assert_eq!(first[1].title.as_deref(), Some("B"));
        assert_eq!(timeline.event_count(), 3);
    }

    #[test]
    fn test_missing_event_is_invariant_violation() {
        let mut events = inputs();
        let built = parts(&events);
        events.push(Event::new(date(3, 2), "never placed"));
        assert!(matches!(
            assemble("q", built, &events),
            Err(PipelineError::Invariant(_))
        ));
    }

    #[test]
    fn test_duplicate_event_is_invariant_violation() {
        let events = inputs();
        let mut built = parts(&events);
        built[0].groups[0].0.events.push(events[2].clone());
        assert!(matches!(
            assemble("q", built, &events),
            Err(PipelineError::Invariant(_))
        ));
    }

    #[test]
    fn test_overlapping_windows_rejected() {
        let events = inputs();
        let mut built = parts(&events);
        built[0].start = date(1, 9);
        assert!(matches!(
            assemble("q", built, &events),
            Err(PipelineError::Invariant(_))
        ));
    }

    #[test]
    fn test_empty_summary_rejected() {
        let events = inputs();
        let mut built = parts(&events);
        built[0].groups[0].1.summary = "  ".to_string();
        assert!(matches!(
            assemble("q", built, &events),
            Err(PipelineError::Invariant(_))
        ));
    }
}
