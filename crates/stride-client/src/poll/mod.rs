/*
[INPUT]:  Queue ids and polling policies
[OUTPUT]: Resolved long-running job outcomes
[POS]:    Polling layer - queue job resolution
[UPDATE]: When polling policies or the enrichment flow change
*/

pub mod enrichment;
pub mod poller;

pub use enrichment::{EnrichmentContext, EnrichmentPoller};
pub use poller::{
    PollConfig,
    QueuePoller,
    QueueStatusSource,
    BOUNDED_MAX_ATTEMPTS,
    BOUNDED_POLL_INTERVAL,
    UNBOUNDED_POLL_INTERVAL,
};
