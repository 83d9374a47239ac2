//! The timeline generation pipeline.
//!
//! Extraction runs per source document and is joined in source order. After
//! temporal clustering (a barrier) each window is split into substories and
//! summarized in its own task; results are joined by window index before
//! assembly. The first fatal failure cancels every other task of the run.

use std::sync::Arc;

use futures::future::try_join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::clustering::{cluster_by_time, split_window, Grouping, TimeWindow};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::event::{dedup_events, sort_chronologically, Event, EventExtractor};
use crate::retry::{CallContext, RetryError};
use crate::summary::{summarize_events, Summarizer};
use crate::timeline::{assemble, format_time_window, Timeline, WindowParts};
use crate::vector::Embedder;
use crate::TARGET_PIPELINE;

pub mod service;

pub use service::TimelineService;

/// One piece of raw source text, with the locator events extracted from it inherit.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceText {
    pub text: String,
    pub url: Option<String>,
}

/// The core pipeline with its three external capabilities.
#[derive(Clone)]
pub struct TimelinePipeline {
    extractor: Arc<dyn EventExtractor>,
    embedder: Arc<dyn Embedder>,
    summarizer: Arc<dyn Summarizer>,
    config: PipelineConfig,
}

impl TimelinePipeline {
    pub fn new(
        extractor: Arc<dyn EventExtractor>,
        embedder: Arc<dyn Embedder>,
        summarizer: Arc<dyn Summarizer>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            extractor,
            embedder,
            summarizer,
            config,
        }
    }

    /// Extracts events from the sources and builds the timeline.
    pub async fn generate(
        &self,
        query: &str,
        sources: &[SourceText],
        cancel: CancellationToken,
    ) -> Result<Timeline, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!(target: TARGET_PIPELINE, "timeline_run", %run_id, query);

        async {
            let ctx = CallContext::new(&self.config, cancel.child_token());
            let events = self.extract_events(query, sources, &ctx).await?;
            self.run(query, events, &ctx).await
        }
        .instrument(span)
        .await
    }

    /// Builds the timeline from events that are already extracted.
    pub async fn generate_from_events(
        &self,
        query: &str,
        events: Vec<Event>,
        cancel: CancellationToken,
    ) -> Result<Timeline, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!(target: TARGET_PIPELINE, "timeline_run", %run_id, query);

        async {
            let ctx = CallContext::new(&self.config, cancel.child_token());
            self.run(query, events, &ctx).await
        }
        .instrument(span)
        .await
    }

    /// Runs extraction over every source concurrently. Any source failing after
    /// its retry budget fails the run.
    pub async fn extract_events(
        &self,
        query: &str,
        sources: &[SourceText],
        ctx: &CallContext,
    ) -> Result<Vec<Event>, PipelineError> {
        info!(target: TARGET_PIPELINE, "Extracting events from {} source(s)", sources.len());
        let extractor = self.extractor.as_ref();

        let per_source = try_join_all(sources.iter().map(|source| async move {
            let events = ctx
                .call("extract events", |_| extractor.extract(&source.text, query))
                .await
                .map_err(|err| match err {
                    RetryError::Cancelled => PipelineError::Cancelled,
                    RetryError::Exhausted(err) => PipelineError::Extraction(err),
                })?;

            Ok::<_, PipelineError>(
                events
                    .into_iter()
                    .map(|event| match &source.url {
                        Some(url) if event.source_url.is_none() => event.with_source_url(url),
                        _ => event,
                    })
                    .collect::<Vec<_>>(),
            )
        }))
        .await
        .map_err(|err| {
            error!(target: TARGET_PIPELINE, "Event extraction failed: {}", err);
            err
        })?;

        let events: Vec<Event> = per_source.into_iter().flatten().collect();
        debug!(target: TARGET_PIPELINE, "Extracted {} raw events", events.len());
        Ok(events)
    }

    async fn run(
        &self,
        query: &str,
        events: Vec<Event>,
        ctx: &CallContext,
    ) -> Result<Timeline, PipelineError> {
        let mut events = dedup_events(events);
        if events.is_empty() {
            return Err(PipelineError::NoEvents);
        }
        sort_chronologically(&mut events);
        info!(target: TARGET_PIPELINE, "Generating timeline from {} events", events.len());

        let windows = cluster_by_time(events.clone(), &self.config)?;
        let parts = self.process_windows(windows, ctx).await?;

        if ctx.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let timeline = assemble(query, parts, &events)?;
        info!(target: TARGET_PIPELINE,
            "Timeline ready: {} windows, {} substories",
            timeline.windows.len(),
            timeline.substory_count()
        );
        Ok(timeline)
    }

    /// Fans out one task per window, bounded by `max_window_tasks`, and joins
    /// the results back into window order.
    async fn process_windows(
        &self,
        windows: Vec<TimeWindow>,
        ctx: &CallContext,
    ) -> Result<Vec<WindowParts>, PipelineError> {
        let window_slots = Arc::new(Semaphore::new(self.config.max_window_tasks.max(1)));
        let mut slots: Vec<Option<WindowParts>> = vec![None; windows.len()];
        let mut tasks = JoinSet::new();

        for (index, window) in windows.into_iter().enumerate() {
            let window_slots = Arc::clone(&window_slots);
            let embedder = Arc::clone(&self.embedder);
            let summarizer = Arc::clone(&self.summarizer);
            let config = self.config.clone();
            let ctx = ctx.clone();

            tasks.spawn(
                async move {
                    let _slot = tokio::select! {
                        biased;
                        _ = ctx.cancel.cancelled() => return Err(PipelineError::Cancelled),
                        slot = window_slots.acquire_owned() => slot
                            .map_err(|e| PipelineError::Task(e.to_string()))?,
                    };
                    process_window(window, embedder.as_ref(), summarizer.as_ref(), &ctx, &config)
                        .await
                        .map(|parts| (index, parts))
                }
                .in_current_span(),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok(Ok((index, parts))) => {
                    slots[index] = Some(parts);
                    continue;
                }
                Ok(Err(err)) => err,
                Err(join_err) => PipelineError::Task(join_err.to_string()),
            };

            // Stop the remaining windows and discard what they produced.
            ctx.cancel.cancel();
            tasks.abort_all();
            if !matches!(failure, PipelineError::Cancelled) {
                error!(target: TARGET_PIPELINE, "Window processing failed: {}", failure);
            }
            return Err(failure);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| PipelineError::Task(format!("window {} produced no result", index)))
            })
            .collect()
    }
}

/// Splits a window into substories and summarizes each, joined by substory index.
async fn process_window(
    window: TimeWindow,
    embedder: &dyn Embedder,
    summarizer: &dyn Summarizer,
    ctx: &CallContext,
    config: &PipelineConfig,
) -> Result<WindowParts, PipelineError> {
    let range = format_time_window(window.start, window.end);
    let (groups, grouping) = split_window(&window, embedder, ctx, config).await?;

    match &grouping {
        Grouping::BelowThreshold => {
            debug!(target: TARGET_PIPELINE, "Window {} has {} events, not clustering", range, window.len())
        }
        Grouping::Collapsed => debug!(target: TARGET_PIPELINE, "Window {} collapsed to one substory", range),
        Grouping::Degraded(reason) => {
            info!(target: TARGET_PIPELINE, "Window {} degraded to one substory: {}", range, reason)
        }
        Grouping::Clustered(count) => {
            debug!(target: TARGET_PIPELINE, "Window {} has {} substories", range, count)
        }
    }

    let context = if groups.len() == 1 {
        Some(format!("All of these events fall within {}.", range))
    } else {
        None
    };

    let summaries = try_join_all(groups.iter().map(|group| {
        summarize_events(
            &group.events,
            context.as_deref(),
            summarizer,
            ctx,
            config.retry_summary_events,
        )
    }))
    .await?;

    Ok(WindowParts {
        start: window.start,
        end: window.end,
        groups: groups.into_iter().zip(summaries).collect(),
    })
}
