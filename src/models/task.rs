//! Checklist task owned by an incident.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Completion state of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not yet done.
    Incompleted,
    /// Done; `completed_at` is stamped.
    Completed,
}

impl TaskStatus {
    /// Canonical string form used in persistence.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Incompleted => "incompleted",
            Self::Completed => "completed",
        }
    }
}

/// Checklist item scoped to one incident; never orphaned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Task {
    /// Unique record identifier.
    pub id: String,
    /// Owning incident number.
    pub incident_number: i64,
    /// Short task title.
    pub title: String,
    /// Longer free-text description.
    pub description: String,
    /// Completion state.
    pub status: TaskStatus,
    /// Identity that created the task.
    pub created_by: String,
    /// Optional assignee identity.
    pub assignee: Option<String>,
    /// Channel the originating chat message lives in, for later edits.
    pub channel_id: Option<String>,
    /// Timestamp reference of the originating chat message.
    pub message_ts: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Completion timestamp; cleared when the task is reopened.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Construct a new incomplete task with a generated identifier.
    #[must_use]
    pub fn new(
        incident_number: i64,
        title: impl Into<String>,
        created_by: impl Into<String>,
        channel_id: Option<String>,
        message_ts: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            incident_number,
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Incompleted,
            created_by: created_by.into(),
            assignee: None,
            channel_id,
            message_ts,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Sparse update applied to an existing task.
///
/// Only supplied fields are written; everything else is left untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    /// Replacement title.
    pub title: Option<String>,
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement completion state.
    pub status: Option<TaskStatus>,
    /// Replacement assignee.
    pub assignee: Option<String>,
    /// Replacement chat-message reference.
    pub message_ts: Option<String>,
}
