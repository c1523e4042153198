/*
[INPUT]:  Gateway responses for tasks and steps
[OUTPUT]: Cached task/step lists for display between refreshes
[POS]:    State layer - visible list cache
[UPDATE]: When list screens need new cached views
*/

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use stride_client::slug::task_id_from_slug;
use stride_client::{ApiGateway, Result, Step, StepUpdate, Task, TaskQuery};

/// Thin cache over the gateway's list endpoints. The backend stays
/// authoritative; this only keeps the last fetched lists so screens can
/// render without refetching.
pub struct TaskStore {
    gateway: Arc<ApiGateway>,
    tasks: Mutex<Vec<Task>>,
    steps: Mutex<HashMap<String, Vec<Step>>>,
}

impl TaskStore {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self {
            gateway,
            tasks: Mutex::new(Vec::new()),
            steps: Mutex::new(HashMap::new()),
        }
    }

    pub async fn refresh_tasks(&self, user_id: &str, query: TaskQuery) -> Result<Vec<Task>> {
        let tasks = self.gateway.get_tasks(user_id, query).await?;
        *self.tasks.lock().unwrap() = tasks.clone();
        Ok(tasks)
    }

    pub fn cached_tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }

    pub async fn refresh_steps(&self, task_id: &str) -> Result<Vec<Step>> {
        let response = self.gateway.get_task_steps(task_id, false).await?;
        self.steps
            .lock()
            .unwrap()
            .insert(task_id.to_string(), response.steps.clone());
        Ok(response.steps)
    }

    pub fn cached_steps(&self, task_id: &str) -> Vec<Step> {
        self.steps
            .lock()
            .unwrap()
            .get(task_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Toggle a step's completion flag and patch the cached copy.
    pub async fn set_step_completed(&self, step_id: &str, completed: bool) -> Result<Step> {
        let update = StepUpdate {
            is_completed: Some(completed),
            rank_order: None,
        };
        let step = self.gateway.update_step(step_id, &update).await?;

        let mut steps = self.steps.lock().unwrap();
        if let Some(list) = steps.get_mut(&step.task_id) {
            if let Some(cached) = list.iter_mut().find(|s| s.id == step.id) {
                *cached = step.clone();
            }
        }
        Ok(step)
    }

    /// Resolve a full task id or a slug short-id against the cached
    /// list.
    pub fn resolve_task(&self, id_or_short: &str) -> Option<Task> {
        let tasks = self.tasks.lock().unwrap();
        tasks
            .iter()
            .find(|task| task.id == id_or_short || task.id.starts_with(id_or_short))
            .cloned()
    }

    /// Turn whatever the user typed (full id, slug, or short id) into
    /// a task id, refreshing the cached list on a miss. Unrecognized
    /// input passes through unchanged so the backend stays the
    /// authority on whether an id exists.
    pub async fn resolve_task_id(&self, user_id: &str, input: &str) -> Result<String> {
        if let Some(task) = self.resolve_task(input) {
            return Ok(task.id);
        }
        self.refresh_tasks(user_id, TaskQuery::default()).await?;
        if let Some(task) = self.resolve_task(input) {
            return Ok(task.id);
        }
        // Slugs carry the short id as their final hyphen segment.
        if let Some(short) = task_id_from_slug(input) {
            if short != input {
                if let Some(task) = self.resolve_task(short) {
                    return Ok(task.id);
                }
            }
        }
        Ok(input.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stride_client::SessionStore;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn store_against(server: &MockServer) -> TaskStore {
        let gateway =
            ApiGateway::new(&server.uri(), "anon-key", SessionStore::new()).unwrap();
        TaskStore::new(Arc::new(gateway))
    }

    #[tokio::test]
    async fn test_refresh_tasks_populates_cache() {
        let server = MockServer::start().await;
        let store = store_against(&server).await;

        Mock::given(method("GET"))
            .and(path("/get-tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tasks": [{
                    "id": "abcdef1234567890",
                    "user_id": "user-1",
                    "title": "Plan Weekend",
                    "status": "active",
                }],
            })))
            .mount(&server)
            .await;

        assert!(store.cached_tasks().is_empty());

        let tasks = store
            .refresh_tasks("user-1", TaskQuery::default())
            .await
            .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(store.cached_tasks().len(), 1);

        // Slug short-ids resolve against the cache.
        let resolved = store.resolve_task("abcdef12").unwrap();
        assert_eq!(resolved.id, "abcdef1234567890");
    }

    #[tokio::test]
    async fn test_resolve_task_id_accepts_slug_and_short_id() {
        let server = MockServer::start().await;
        let store = store_against(&server).await;

        Mock::given(method("GET"))
            .and(path("/get-tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tasks": [{
                    "id": "abcdef1234567890",
                    "user_id": "user-1",
                    "title": "Plan Weekend",
                    "status": "active",
                }],
            })))
            .mount(&server)
            .await;

        // Cold cache: the first resolve fetches the list.
        let id = store
            .resolve_task_id("user-1", "plan-weekend-abcdef12")
            .await
            .unwrap();
        assert_eq!(id, "abcdef1234567890");

        let id = store.resolve_task_id("user-1", "abcdef12").await.unwrap();
        assert_eq!(id, "abcdef1234567890");

        let id = store
            .resolve_task_id("user-1", "abcdef1234567890")
            .await
            .unwrap();
        assert_eq!(id, "abcdef1234567890");

        // Unknown input passes through for the backend to judge.
        let id = store.resolve_task_id("user-1", "zzzz").await.unwrap();
        assert_eq!(id, "zzzz");
    }

    #[tokio::test]
    async fn test_set_step_completed_patches_cache() {
        let server = MockServer::start().await;
        let store = store_against(&server).await;

        Mock::given(method("GET"))
            .and(path("/get-task-steps/t-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "task_id": "t-1",
                "steps": [
                    { "id": "s-1", "task_id": "t-1", "title": "Book hotel", "is_completed": false },
                ],
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/update-step/s-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "step": {
                    "id": "s-1",
                    "task_id": "t-1",
                    "title": "Book hotel",
                    "is_completed": true,
                },
            })))
            .mount(&server)
            .await;

        store.refresh_steps("t-1").await.unwrap();
        assert!(!store.cached_steps("t-1")[0].is_completed);

        let step = store.set_step_completed("s-1", true).await.unwrap();
        assert!(step.is_completed);
        assert!(store.cached_steps("t-1")[0].is_completed);
    }
}
