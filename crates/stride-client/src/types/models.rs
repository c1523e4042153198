/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};

use super::enums::{QueueJobStatus, TaskStatus};

/// A user task with its server-assigned ordering and lifecycle fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub rank_order: Option<i64>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// One step inside a task. Steps are generated server-side and only
/// their completion flag, ordering, and note are client-writable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub task_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub rank_order: Option<i64>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Lightweight task row for list screens (no steps attached).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub step_count: u32,
    #[serde(default)]
    pub completed_step_count: u32,
}

/// Server-tracked asynchronous job, polled until a terminal status.
///
/// The client never writes to this record; `result` is an opaque
/// payload whose shape depends on the operation that enqueued the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueJob {
    pub queue_id: String,
    pub status: QueueJobStatus,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub default_task_view: Option<String>,
    #[serde(default)]
    pub notifications_enabled: Option<bool>,
}
