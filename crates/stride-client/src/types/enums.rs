/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Active,
    Completed,
    Archived,
}

impl TaskStatus {
    pub fn as_query_value(&self) -> &'static str {
        match self {
            TaskStatus::Active => "active",
            TaskStatus::Completed => "completed",
            TaskStatus::Archived => "archived",
        }
    }
}

/// Server-side status of a long-running queue job.
///
/// `Complete` and `Failed` are terminal; everything else means the job
/// is still being worked on and the client should keep polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueJobStatus {
    Pending,
    Processing,
    Complete,
    Failed,
}

impl QueueJobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueueJobStatus::Complete | QueueJobStatus::Failed)
    }
}
