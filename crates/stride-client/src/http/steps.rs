/*
[INPUT]:  Step ids, prompts, completion/ordering updates, notes
[OUTPUT]: Step records and queue references for AI step jobs
[POS]:    HTTP layer - step endpoints
[UPDATE]: When adding new step endpoints or changing request bodies
*/

use reqwest::Method;

use crate::http::{ApiGateway, Result};
use crate::types::{AddStepRequest, QueueRef, Step, StepEnvelope, StepUpdate, TaskStepsResponse};

impl ApiGateway {
    /// Fetch the steps of a task
    ///
    /// GET /get-task-steps/{id}?include_metadata={bool}
    pub async fn get_task_steps(
        &self,
        task_id: &str,
        include_metadata: bool,
    ) -> Result<TaskStepsResponse> {
        let endpoint = format!("/get-task-steps/{task_id}?include_metadata={include_metadata}");
        self.send(Method::GET, &endpoint, None).await
    }

    /// Apply a partial update to a step (completion flag, ordering)
    ///
    /// PUT /update-step/{id}
    pub async fn update_step(&self, step_id: &str, update: &StepUpdate) -> Result<Step> {
        let endpoint = format!("/update-step/{step_id}");
        let body = serde_json::to_value(update)?;
        let envelope: StepEnvelope = self.send(Method::PUT, &endpoint, Some(&body)).await?;
        Ok(envelope.step)
    }

    /// Enqueue AI generation of a new step from a prompt
    ///
    /// POST /add-step
    pub async fn add_step(&self, request: &AddStepRequest) -> Result<QueueRef> {
        let body = serde_json::to_value(request)?;
        self.send(Method::POST, "/add-step", Some(&body)).await
    }

    /// Enqueue splitting of a step into smaller steps
    ///
    /// POST /split-step/{id}
    pub async fn split_step(
        &self,
        step_id: &str,
        additional_context: Option<&str>,
    ) -> Result<QueueRef> {
        let endpoint = format!("/split-step/{step_id}");
        let body = match additional_context {
            Some(context) => serde_json::json!({ "additional_context": context }),
            None => serde_json::json!({}),
        };
        self.send(Method::POST, &endpoint, Some(&body)).await
    }

    /// Enqueue an AI rewrite of a single step
    ///
    /// POST /rewrite-step/{id}
    pub async fn rewrite_step(&self, step_id: &str) -> Result<QueueRef> {
        let endpoint = format!("/rewrite-step/{step_id}");
        self.send(Method::POST, &endpoint, None).await
    }

    /// Set the free-form note attached to a step
    ///
    /// PUT /update-step-note/{id}
    pub async fn update_step_note(&self, step_id: &str, note: &str) -> Result<()> {
        let endpoint = format!("/update-step-note/{step_id}");
        let body = serde_json::json!({ "note": note });
        self.send_unit(Method::PUT, &endpoint, Some(&body)).await
    }

    /// Remove the note attached to a step
    ///
    /// DELETE /update-step-note/{id}
    pub async fn delete_step_note(&self, step_id: &str) -> Result<()> {
        let endpoint = format!("/update-step-note/{step_id}");
        self.send_unit(Method::DELETE, &endpoint, None).await
    }
}
