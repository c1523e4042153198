/*
[INPUT]:  Queue ids plus live refresh/error callbacks
[OUTPUT]: Background bounded polls that update the owning screen
[POS]:    Polling layer - enrichment-specific stateful wrapper
[UPDATE]: When the enrichment flow or its supersession rules change
*/

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::http::StrideError;

use super::poller::{PollConfig, QueuePoller, QueueStatusSource};

/// Callbacks and parameters the in-flight poll consults when it
/// finishes. Held behind a shared cell (not captured at start) so a
/// poll that outlives a task switch still observes the LATEST task id
/// and refresh callback.
pub struct EnrichmentContext {
    pub task_id: String,
    pub on_refresh: Arc<dyn Fn(&str) + Send + Sync>,
    pub on_error: Arc<dyn Fn(&StrideError) + Send + Sync>,
}

struct ActivePoll {
    id: u64,
    queue_id: String,
    cancel: CancellationToken,
}

/// Stateful wrapper around the bounded poll configuration for step
/// enrichment jobs.
///
/// At most one poll is in flight per poller: starting a new one cancels
/// the previous poll's pending timer before the new poll begins, so two
/// pollers never race on the same screen state.
pub struct EnrichmentPoller<S: QueueStatusSource + 'static> {
    poller: QueuePoller<S>,
    context: Arc<RwLock<EnrichmentContext>>,
    active: Arc<Mutex<Option<ActivePoll>>>,
    next_id: AtomicU64,
}

impl<S: QueueStatusSource + 'static> EnrichmentPoller<S> {
    pub fn new(source: Arc<S>, context: EnrichmentContext) -> Self {
        Self::with_config(source, context, PollConfig::bounded())
    }

    pub fn with_config(source: Arc<S>, context: EnrichmentContext, config: PollConfig) -> Self {
        Self {
            poller: QueuePoller::new(source, config),
            context: Arc::new(RwLock::new(context)),
            active: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn is_enriching(&self) -> bool {
        self.active.lock().unwrap().is_some()
    }

    pub fn current_queue_id(&self) -> Option<String> {
        self.active
            .lock()
            .unwrap()
            .as_ref()
            .map(|poll| poll.queue_id.clone())
    }

    /// Replace the live context. An outstanding poll picks this up
    /// without being restarted.
    pub fn set_context(&self, context: EnrichmentContext) {
        *self.context.write().unwrap() = context;
    }

    /// Begin polling `queue_id`, superseding any poll already running.
    pub fn start_polling(&self, queue_id: &str) {
        let mut active = self.active.lock().unwrap();

        if let Some(prior) = active.take() {
            tracing::debug!(
                stale_queue_id = %prior.queue_id,
                queue_id,
                "superseding active enrichment poll"
            );
            prior.cancel.cancel();
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();

        tokio::spawn({
            let poller = self.poller.clone();
            let context = self.context.clone();
            let slot = self.active.clone();
            let cancel = cancel.clone();
            let queue_id = queue_id.to_string();
            async move {
                let outcome = poller.wait(&queue_id, &cancel).await;

                // Clear the active slot first (only if we still own it)
                // so callbacks observe is_enriching == false.
                {
                    let mut guard = slot.lock().unwrap();
                    if guard.as_ref().is_some_and(|poll| poll.id == id) {
                        guard.take();
                    }
                }

                // Callbacks run without the context lock held; they are
                // allowed to call set_context re-entrantly.
                match outcome {
                    Ok(_) => {
                        let (on_refresh, task_id) = {
                            let ctx = context.read().unwrap();
                            (ctx.on_refresh.clone(), ctx.task_id.clone())
                        };
                        on_refresh(&task_id);
                    }
                    Err(StrideError::Cancelled) => {
                        tracing::debug!(queue_id, "enrichment poll superseded or stopped");
                    }
                    Err(err) => {
                        tracing::warn!(queue_id, error = %err, "enrichment poll failed");
                        let on_error = context.read().unwrap().on_error.clone();
                        on_error(&err);
                    }
                }
            }
        });

        *active = Some(ActivePoll {
            id,
            queue_id: queue_id.to_string(),
            cancel,
        });
    }

    /// Cancel the active poll, if any. Idempotent.
    pub fn stop_polling(&self) {
        if let Some(poll) = self.active.lock().unwrap().take() {
            poll.cancel.cancel();
        }
    }
}

impl<S: QueueStatusSource + 'static> Drop for EnrichmentPoller<S> {
    fn drop(&mut self) {
        self.stop_polling();
    }
}
