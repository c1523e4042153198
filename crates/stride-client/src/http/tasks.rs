/*
[INPUT]:  Task ids, prompts, and partial-update bodies
[OUTPUT]: Task records and queue references for AI generation jobs
[POS]:    HTTP layer - task endpoints
[UPDATE]: When adding new task endpoints or changing query parameters
*/

use reqwest::Method;

use crate::http::{ApiGateway, Result};
use crate::types::{
    QueueRef, Task, TaskListResponse, TaskQuery, TaskSummary, TaskSummaryResponse, TaskUpdate,
};

impl ApiGateway {
    /// Enqueue AI task generation from a prompt
    ///
    /// POST /create-task
    pub async fn create_task(&self, prompt: &str) -> Result<QueueRef> {
        let body = serde_json::json!({ "prompt": prompt });
        self.send(Method::POST, "/create-task", Some(&body)).await
    }

    /// List tasks for a user with optional filters
    ///
    /// GET /get-tasks?user_id={user_id}&status={status}&limit={limit}&offset={offset}
    pub async fn get_tasks(&self, user_id: &str, query: TaskQuery) -> Result<Vec<Task>> {
        let mut params = vec![format!("user_id={user_id}")];
        if let Some(status) = query.status {
            params.push(format!("status={}", status.as_query_value()));
        }
        if let Some(limit) = query.limit {
            params.push(format!("limit={limit}"));
        }
        if let Some(offset) = query.offset {
            params.push(format!("offset={offset}"));
        }

        let endpoint = format!("/get-tasks?{}", params.join("&"));
        let response: TaskListResponse = self.send(Method::GET, &endpoint, None).await?;
        Ok(response.tasks)
    }

    /// Apply a partial update to a task
    ///
    /// PUT /update-task/{id}
    pub async fn update_task(&self, task_id: &str, update: &TaskUpdate) -> Result<Task> {
        let endpoint = format!("/update-task/{task_id}");
        let body = serde_json::to_value(update)?;
        let envelope: crate::types::TaskEnvelope =
            self.send(Method::PUT, &endpoint, Some(&body)).await?;
        Ok(envelope.task)
    }

    /// Enqueue duplication of an existing task (steps are regenerated)
    ///
    /// POST /duplicate-task/{id}
    pub async fn duplicate_task(&self, task_id: &str) -> Result<QueueRef> {
        let endpoint = format!("/duplicate-task/{task_id}");
        self.send(Method::POST, &endpoint, None).await
    }

    /// Enqueue an AI rewrite of a task's title and steps
    ///
    /// POST /rewrite-task/{id}
    pub async fn rewrite_task(&self, task_id: &str) -> Result<QueueRef> {
        let endpoint = format!("/rewrite-task/{task_id}");
        self.send(Method::POST, &endpoint, None).await
    }

    /// Lightweight task rows for list screens
    ///
    /// GET /get-tasks-summary?user_id={user_id}
    pub async fn get_tasks_summary(&self, user_id: &str) -> Result<Vec<TaskSummary>> {
        let endpoint = format!("/get-tasks-summary?user_id={user_id}");
        let response: TaskSummaryResponse = self.send(Method::GET, &endpoint, None).await?;
        Ok(response.tasks)
    }
}
