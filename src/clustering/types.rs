use chrono::NaiveDate;

use crate::event::{sort_chronologically, Event};

/// Contiguous calendar interval holding the events assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub events: Vec<Event>,
}

impl TimeWindow {
    /// Builds a window spanning the given events. Returns `None` for an empty group.
    pub fn from_events(mut events: Vec<Event>) -> Option<Self> {
        sort_chronologically(&mut events);
        let start = events.first()?.date;
        let end = events.last()?.date;
        Some(TimeWindow { start, end, events })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Absorbs another window's events and widens the range to cover them.
    pub fn merge(&mut self, other: TimeWindow) {
        self.events.extend(other.events);
        sort_chronologically(&mut self.events);
        self.start = self.start.min(other.start);
        self.end = self.end.max(other.end);
    }
}

/// Per-event result of density clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Membership {
    Assigned(usize),
    Unclustered,
}

impl From<Option<usize>> for Membership {
    fn from(label: Option<usize>) -> Self {
        match label {
            Some(id) => Membership::Assigned(id),
            None => Membership::Unclustered,
        }
    }
}

/// Events of one window that share a topic.
#[derive(Debug, Clone, PartialEq)]
pub struct SubstoryGroup {
    pub events: Vec<Event>,
}

impl SubstoryGroup {
    pub fn new(mut events: Vec<Event>) -> Self {
        sort_chronologically(&mut events);
        SubstoryGroup { events }
    }

    pub fn earliest(&self) -> Option<NaiveDate> {
        self.events.first().map(|e| e.date)
    }
}

/// How a window's substories were decided, kept for logging.
#[derive(Debug, Clone, PartialEq)]
pub enum Grouping {
    /// Too few events to cluster.
    BelowThreshold,
    /// Density clustering found at most one real cluster.
    Collapsed,
    /// Embedding or clustering failed; the window is kept whole.
    Degraded(String),
    /// Number of substories found.
    Clustered(usize),
}
