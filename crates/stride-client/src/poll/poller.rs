/*
[INPUT]:  Queue id, poll configuration, cancellation token
[OUTPUT]: Terminal job result or a classified polling error
[POS]:    Polling layer - generic long-running-job poller
[UPDATE]: When poll intervals, attempt caps, or error policy change
*/

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::http::{Result, StrideError};
use crate::types::{QueueJob, QueueJobStatus};

/// Where status snapshots come from. Implemented by `ApiGateway`;
/// tests script their own sequences.
#[async_trait]
pub trait QueueStatusSource: Send + Sync {
    async fn queue_status(&self, queue_id: &str) -> Result<QueueJob>;
}

pub const UNBOUNDED_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const BOUNDED_POLL_INTERVAL: Duration = Duration::from_millis(1000);
pub const BOUNDED_MAX_ATTEMPTS: u32 = 30;

/// One polling state machine, two policies.
///
/// The unbounded configuration keeps going through transient errors and
/// has no attempt cap; the bounded configuration treats any query error
/// as terminal and gives up after `max_attempts`.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub continue_on_transient_error: bool,
}

impl PollConfig {
    pub fn unbounded() -> Self {
        Self {
            interval: UNBOUNDED_POLL_INTERVAL,
            max_attempts: None,
            continue_on_transient_error: true,
        }
    }

    pub fn bounded() -> Self {
        Self {
            interval: BOUNDED_POLL_INTERVAL,
            max_attempts: Some(BOUNDED_MAX_ATTEMPTS),
            continue_on_transient_error: false,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Resolves a queue id to a terminal result via strictly sequential
/// status queries: the next query is issued only after the previous
/// response and the interval delay.
pub struct QueuePoller<S: QueueStatusSource> {
    source: Arc<S>,
    config: PollConfig,
}

impl<S: QueueStatusSource> Clone for QueuePoller<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: QueueStatusSource> QueuePoller<S> {
    pub fn new(source: Arc<S>, config: PollConfig) -> Self {
        Self { source, config }
    }

    /// Poll until the job reaches `complete` (returning its result
    /// payload) or `failed` (returning the server's message verbatim).
    ///
    /// Giving up on the attempt cap yields `JobTimeout`, which does not
    /// imply the job failed; the server keeps working on it.
    pub async fn wait(
        &self,
        queue_id: &str,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value> {
        let mut attempts: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(StrideError::Cancelled);
            }
            if let Some(max) = self.config.max_attempts {
                if attempts >= max {
                    tracing::warn!(queue_id, attempts, "giving up on queue job client-side");
                    return Err(StrideError::JobTimeout { attempts });
                }
            }
            attempts += 1;

            match self.source.queue_status(queue_id).await {
                Ok(job) => match job.status {
                    QueueJobStatus::Complete => {
                        tracing::debug!(queue_id, attempts, "queue job complete");
                        return Ok(job.result.unwrap_or(serde_json::Value::Null));
                    }
                    QueueJobStatus::Failed => {
                        let message = job
                            .error_message
                            .unwrap_or_else(|| "queue job failed".to_string());
                        tracing::warn!(queue_id, %message, "queue job failed");
                        return Err(StrideError::JobFailed { message });
                    }
                    status => {
                        tracing::trace!(queue_id, ?status, attempts, "queue job still running");
                    }
                },
                Err(err) if self.config.continue_on_transient_error && err.is_transient() => {
                    tracing::warn!(queue_id, error = %err, "transient poll error; rescheduling");
                }
                Err(err) => return Err(err),
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(StrideError::Cancelled),
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }
}
