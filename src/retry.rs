//! Timeout, retry and cancellation policy for external capability calls.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::error::Timeout;
use crate::TARGET_PIPELINE;

/// Outcome of a call that did not succeed.
#[derive(Debug, PartialEq)]
pub enum RetryError<E> {
    /// The run was cancelled while the call was pending.
    Cancelled,
    /// Every attempt failed; holds the last error.
    Exhausted(E),
}

/// Shared per-run context for external calls: the time and retry budget, the
/// run's cancellation token and the pool of in-flight request permits.
#[derive(Clone, Debug)]
pub struct CallContext {
    pub timeout: Duration,
    pub retries: usize,
    pub backoff: Duration,
    pub cancel: CancellationToken,
    permits: Arc<Semaphore>,
}

impl CallContext {
    pub fn new(config: &PipelineConfig, cancel: CancellationToken) -> Self {
        Self {
            timeout: config.request_timeout,
            retries: config.retry_budget,
            backoff: config.retry_backoff,
            cancel,
            permits: Arc::new(Semaphore::new(config.max_inflight_requests.max(1))),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs `op` until it succeeds or the retry budget is spent.
    ///
    /// `op` receives the zero-based attempt number so callers can change the
    /// request between attempts. Each attempt holds one in-flight permit and is
    /// bounded by the context timeout.
    pub async fn call<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<Timeout> + Display,
    {
        let max_attempts = self.retries + 1;
        let mut attempt = 0;

        loop {
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!(target: TARGET_PIPELINE, "{}: cancelled before attempt {}", label, attempt + 1);
                    return Err(RetryError::Cancelled);
                }
                outcome = self.attempt(&mut op, attempt) => outcome,
            };

            let err = match outcome {
                Some(Ok(value)) => {
                    debug!(target: TARGET_PIPELINE, "{}: attempt {} succeeded", label, attempt + 1);
                    return Ok(value);
                }
                Some(Err(err)) => err,
                None => return Err(RetryError::Cancelled),
            };

            attempt += 1;
            if attempt >= max_attempts {
                error!(target: TARGET_PIPELINE, "{}: failed after {} attempt(s): {}", label, attempt, err);
                return Err(RetryError::Exhausted(err));
            }

            warn!(target: TARGET_PIPELINE, "{}: attempt {}/{} failed: {}", label, attempt, max_attempts, err);

            if !self.backoff.is_zero() {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Err(RetryError::Cancelled),
                    _ = sleep(self.backoff) => {}
                }
            }
        }
    }

    async fn attempt<T, E, F, Fut>(&self, op: &mut F, attempt: usize) -> Option<Result<T, E>>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<Timeout>,
    {
        // A closed semaphore only happens on teardown.
        let _permit = self.permits.acquire().await.ok()?;
        match timeout(self.timeout, op(attempt)).await {
            Ok(result) => Some(result),
            Err(_) => Some(Err(E::from(Timeout(self.timeout)))),
        }
    }
}
