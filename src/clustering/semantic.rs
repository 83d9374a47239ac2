use std::collections::BTreeMap;

use futures::future::try_join_all;
use linfa::traits::Transformer;
use linfa::ParamGuard;
use linfa_clustering::Dbscan;
use ndarray::{Array1, Array2};
use tracing::{debug, info, warn};

use crate::clustering::types::{Grouping, Membership, SubstoryGroup, TimeWindow};
use crate::config::PipelineConfig;
use crate::error::{EmbeddingError, PipelineError};
use crate::event::Event;
use crate::retry::{CallContext, RetryError};
use crate::vector::{centroid, euclidean_distance, l2_normalize, Embedder};
use crate::TARGET_CLUSTERING;

/// Splits one window into topical substory groups.
///
/// Windows below `min_semantic_window` are kept whole without embedding. An
/// embedding or clustering failure also keeps the window whole; only
/// cancellation is returned as an error.
pub async fn split_window(
    window: &TimeWindow,
    embedder: &dyn Embedder,
    ctx: &CallContext,
    config: &PipelineConfig,
) -> Result<(Vec<SubstoryGroup>, Grouping), PipelineError> {
    if window.len() < config.min_semantic_window {
        return Ok((whole(window), Grouping::BelowThreshold));
    }

    let embeddings = match embed_events(&window.events, embedder, ctx).await {
        Ok(embeddings) => embeddings,
        Err(RetryError::Cancelled) => return Err(PipelineError::Cancelled),
        Err(RetryError::Exhausted(err)) => {
            warn!(target: TARGET_CLUSTERING,
                "Embedding failed for window {}..{}, keeping it as one substory: {}",
                window.start, window.end, err
            );
            return Ok((whole(window), Grouping::Degraded(err.to_string())));
        }
    };

    Ok(partition_events(&window.events, &embeddings, config))
}

/// Embeds every event description in the window, concurrently.
pub async fn embed_events(
    events: &[Event],
    embedder: &dyn Embedder,
    ctx: &CallContext,
) -> Result<Vec<Vec<f32>>, RetryError<EmbeddingError>> {
    try_join_all(events.iter().map(|event| {
        ctx.call("embed event", move |_| embedder.embed(&event.description))
    }))
    .await
}

/// Groups events by their embeddings. Pure and deterministic.
pub fn partition_events(
    events: &[Event],
    embeddings: &[Vec<f32>],
    config: &PipelineConfig,
) -> (Vec<SubstoryGroup>, Grouping) {
    let single = || vec![SubstoryGroup::new(events.to_vec())];

    if events.len() != embeddings.len() {
        warn!(target: TARGET_CLUSTERING,
            "Got {} embeddings for {} events, keeping window whole",
            embeddings.len(), events.len()
        );
        return (single(), Grouping::Degraded("embedding count mismatch".to_string()));
    }

    let vectors: Vec<Vec<f64>> = embeddings.iter().map(|v| l2_normalize(v)).collect();
    let memberships = match density_memberships(
        &vectors,
        config.density_min_points,
        config.density_tolerance,
    ) {
        Ok(memberships) => memberships,
        Err(err) => {
            warn!(target: TARGET_CLUSTERING, "Density clustering failed, keeping window whole: {}", err);
            return (single(), Grouping::Degraded(err.to_string()));
        }
    };

    let noise = memberships
        .iter()
        .filter(|m| **m == Membership::Unclustered)
        .count();

    match fold_unclustered(&vectors, &memberships) {
        Some(labels) => {
            let groups = group_by_label(events, &labels);
            info!(target: TARGET_CLUSTERING,
                "Window split into {} substories ({} noise events folded)",
                groups.len(), noise
            );
            let count = groups.len();
            (groups, Grouping::Clustered(count))
        }
        None => {
            debug!(target: TARGET_CLUSTERING,
                "Density clustering found fewer than two clusters ({} noise of {})",
                noise, events.len()
            );
            (single(), Grouping::Collapsed)
        }
    }
}

/// Runs DBSCAN over the vectors. `None` labels from the library become
/// [`Membership::Unclustered`].
pub fn density_memberships(
    vectors: &[Vec<f64>],
    min_points: usize,
    tolerance: f64,
) -> Result<Vec<Membership>, EmbeddingError> {
    let rows = vectors.len();
    let dims = vectors.first().map(Vec::len).unwrap_or(0);
    if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
        return Err(EmbeddingError::Dimension {
            expected: dims,
            actual: bad.len(),
        });
    }
    if rows == 0 || dims == 0 {
        return Ok(vec![Membership::Unclustered; rows]);
    }

    let flat: Vec<f64> = vectors.iter().flatten().copied().collect();
    let observations = Array2::from_shape_vec((rows, dims), flat)
        .map_err(|e| EmbeddingError::Model(format!("failed to build embedding matrix: {}", e)))?;

    let params = Dbscan::params(min_points)
        .tolerance(tolerance)
        .check()
        .map_err(|e| EmbeddingError::Model(format!("invalid density parameters: {}", e)))?;
    let labels: Array1<Option<usize>> = params.transform(&observations);

    Ok(labels.iter().map(|label| Membership::from(*label)).collect())
}

/// Assigns every unclustered point to the real cluster with the nearest
/// centroid, lowest id on ties.
///
/// Returns `None` when fewer than two real clusters exist; the caller then
/// treats the window as one substory.
pub fn fold_unclustered(vectors: &[Vec<f64>], memberships: &[Membership]) -> Option<Vec<usize>> {
    let mut members: BTreeMap<usize, Vec<&[f64]>> = BTreeMap::new();
    for (vector, membership) in vectors.iter().zip(memberships) {
        if let Membership::Assigned(id) = membership {
            members.entry(*id).or_default().push(vector.as_slice());
        }
    }
    if members.len() < 2 {
        return None;
    }

    let centroids: Vec<(usize, Vec<f64>)> = members
        .into_iter()
        .filter_map(|(id, vs)| centroid(vs).map(|c| (id, c)))
        .collect();

    let labels = vectors
        .iter()
        .zip(memberships)
        .map(|(vector, membership)| match membership {
            Membership::Assigned(id) => *id,
            Membership::Unclustered => nearest_centroid(vector, &centroids),
        })
        .collect();
    Some(labels)
}

fn nearest_centroid(vector: &[f64], centroids: &[(usize, Vec<f64>)]) -> usize {
    let mut best: Option<(usize, f64)> = None;
    for (id, c) in centroids {
        let distance = euclidean_distance(vector, c);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((*id, distance)),
        }
    }
    best.map(|(id, _)| id).unwrap_or(0)
}

/// Builds one group per label, ordered by earliest event date.
pub fn group_by_label(events: &[Event], labels: &[usize]) -> Vec<SubstoryGroup> {
    let mut by_label: BTreeMap<usize, Vec<Event>> = BTreeMap::new();
    for (event, label) in events.iter().zip(labels) {
        by_label.entry(*label).or_default().push(event.clone());
    }

    let mut groups: Vec<SubstoryGroup> = by_label.into_values().map(SubstoryGroup::new).collect();
    groups.sort_by_key(|g| g.earliest());
    groups
}

fn whole(window: &TimeWindow) -> Vec<SubstoryGroup> {
    vec![SubstoryGroup::new(window.events.clone())]
}
