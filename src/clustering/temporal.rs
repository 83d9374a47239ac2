use std::collections::{BTreeMap, BTreeSet};

use linfa::prelude::*;
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2};
use tracing::{debug, info};

use crate::clustering::types::TimeWindow;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::event::Event;
use crate::TARGET_CLUSTERING;

/// Number of windows to ask k-means for.
///
/// Never more than the configured count or the number of distinct dates, and
/// never more than one window per `min_window_days` of covered calendar time.
pub fn target_window_count(events: &[Event], window_count: usize, min_window_days: i64) -> usize {
    let distinct_dates = events.iter().map(|e| e.date).collect::<BTreeSet<_>>();
    let (first, last) = match (distinct_dates.first(), distinct_dates.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return 0,
    };

    let span_days = (last - first).num_days() + 1;
    let min_window_days = min_window_days.max(1);
    let by_span = ((span_days + min_window_days - 1) / min_window_days) as usize;

    window_count.min(distinct_dates.len()).min(by_span).max(1)
}

/// Partitions events into chronologically ordered, non-overlapping windows.
///
/// Clusters on the ordinal day number with k-means. Labels never leak: windows
/// are re-ordered by start date, empty clusters are dropped and clusters with
/// the same centroid or overlapping ranges are merged.
pub fn cluster_by_time(
    events: Vec<Event>,
    config: &PipelineConfig,
) -> Result<Vec<TimeWindow>, PipelineError> {
    if events.is_empty() {
        return Ok(Vec::new());
    }

    let k = target_window_count(&events, config.window_count, config.min_window_days);
    debug!(target: TARGET_CLUSTERING, "Temporal clustering {} events into at most {} windows", events.len(), k);

    let labels = if k <= 1 {
        vec![0; events.len()]
    } else {
        kmeans_labels(&events, k)?
    };

    let mut groups: BTreeMap<usize, Vec<Event>> = BTreeMap::new();
    for (event, label) in events.into_iter().zip(labels) {
        groups.entry(label).or_default().push(event);
    }

    let mut windows: Vec<TimeWindow> = groups
        .into_values()
        .filter_map(TimeWindow::from_events)
        .collect();
    windows.sort_by_key(|w| (w.start, w.end));

    let windows = merge_overlapping(windows);
    info!(target: TARGET_CLUSTERING, "Built {} time window(s)", windows.len());
    Ok(windows)
}

/// Runs k-means over the day numbers and returns one label per event. Labels of
/// clusters sharing a centroid are folded onto the lowest such label.
fn kmeans_labels(events: &[Event], k: usize) -> Result<Vec<usize>, PipelineError> {
    let origin = events
        .iter()
        .map(Event::day_number)
        .fold(f64::INFINITY, f64::min);
    let features: Vec<f64> = events.iter().map(|e| e.day_number() - origin).collect();
    let n = features.len();

    let observations = Array2::from_shape_vec((n, 1), features)
        .map_err(|e| PipelineError::Clustering(format!("failed to build feature matrix: {}", e)))?;
    let dataset = DatasetBase::new(observations.clone(), Array1::from_elem(n, ()));

    let model = KMeans::params(k)
        .max_n_iterations(300)
        .tolerance(1e-4)
        .fit(&dataset)
        .map_err(|e| PipelineError::Clustering(format!("k-means failed: {}", e)))?;

    let predictions: Array1<usize> = model.predict(&observations);
    let canonical = canonical_labels(model.centroids());

    Ok(predictions
        .iter()
        .map(|&label| canonical.get(label).copied().unwrap_or(label))
        .collect())
}

/// Maps every cluster label to the lowest label sharing its centroid.
fn canonical_labels(centroids: &Array2<f64>) -> Vec<usize> {
    let mut canonical: Vec<usize> = (0..centroids.nrows()).collect();
    for i in 0..centroids.nrows() {
        for j in 0..i {
            if (centroids[[i, 0]] - centroids[[j, 0]]).abs() < 1e-9 {
                canonical[i] = canonical[j];
                break;
            }
        }
    }
    canonical
}

/// Merges neighbours whose ranges overlap. Input must be sorted by start date.
fn merge_overlapping(windows: Vec<TimeWindow>) -> Vec<TimeWindow> {
    let mut merged: Vec<TimeWindow> = Vec::with_capacity(windows.len());
    for window in windows {
        match merged.last_mut() {
            Some(last) if last.overlaps(&window) => {
                debug!(target: TARGET_CLUSTERING,
                    "Merging window {}..{} into {}..{}",
                    window.start, window.end, last.start, last.end
                );
                last.merge(window);
            }
            _ => merged.push(window),
        }
    }
    merged
}
