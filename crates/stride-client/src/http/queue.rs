/*
[INPUT]:  Queue ids of long-running backend jobs
[OUTPUT]: Job status snapshots for the polling layer
[POS]:    HTTP layer - queue status endpoint
[UPDATE]: When the queue status shape changes
*/

use async_trait::async_trait;
use reqwest::Method;

use crate::http::{ApiGateway, Result};
use crate::poll::QueueStatusSource;
use crate::types::QueueJob;

impl ApiGateway {
    /// Snapshot of a long-running job
    ///
    /// GET /get-queue-status/{id}
    pub async fn get_queue_status(&self, queue_id: &str) -> Result<QueueJob> {
        let endpoint = format!("/get-queue-status/{queue_id}");
        self.send(Method::GET, &endpoint, None).await
    }
}

#[async_trait]
impl QueueStatusSource for ApiGateway {
    async fn queue_status(&self, queue_id: &str) -> Result<QueueJob> {
        self.get_queue_status(queue_id).await
    }
}
