//! Task sub-engine: checklist CRUD scoped to an incident.

use std::sync::Arc;

use crate::context::Identity;
use crate::models::task::{Task, TaskPatch, TaskStatus};
use crate::persistence::incident_repo::IncidentRepo;
use crate::persistence::task_repo::TaskRepo;
use crate::state::AppState;
use crate::{AppError, Result};

/// Service owning task CRUD and task-level visibility rules.
#[derive(Clone)]
pub struct TaskService {
    state: Arc<AppState>,
}

impl TaskService {
    /// Create a new service instance.
    #[must_use]
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    fn tasks(&self) -> TaskRepo {
        TaskRepo::new(Arc::clone(&self.state.db))
    }

    fn incidents(&self) -> IncidentRepo {
        IncidentRepo::new(Arc::clone(&self.state.db))
    }

    /// Create a task under an incident.
    ///
    /// Tasks are never orphaned: the owning incident must exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an empty title or non-positive
    /// incident number, `AppError::NotFound` for a missing incident.
    pub async fn create_task(
        &self,
        incident_number: i64,
        title: &str,
        created_by: &str,
        channel_id: Option<String>,
        message_ts: Option<String>,
    ) -> Result<Task> {
        if incident_number <= 0 {
            return Err(AppError::Validation(format!(
                "invalid incident number: {incident_number}"
            )));
        }
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("task title must not be empty".into()));
        }

        // Existence check keeps tasks from being orphaned.
        self.incidents().get(incident_number).await?;

        let task = Task::new(incident_number, title, created_by, channel_id, message_ts);
        self.tasks().create(&task).await?;
        Ok(task)
    }

    /// Apply a sparse update; unsupplied fields stay untouched.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the task does not exist.
    pub async fn update_task(&self, task_id: &str, patch: &TaskPatch) -> Result<Task> {
        if let Some(ref title) = patch.title {
            if title.trim().is_empty() {
                return Err(AppError::Validation("task title must not be empty".into()));
            }
        }
        self.tasks().update(task_id, patch).await
    }

    /// Mark a task completed, stamping the completion time.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the task does not exist.
    pub async fn complete_task(&self, task_id: &str) -> Result<Task> {
        self.tasks()
            .update(
                task_id,
                &TaskPatch {
                    status: Some(TaskStatus::Completed),
                    ..TaskPatch::default()
                },
            )
            .await
    }

    /// Reopen a task, clearing the completion time.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the task does not exist.
    pub async fn uncomplete_task(&self, task_id: &str) -> Result<Task> {
        self.tasks()
            .update(
                task_id,
                &TaskPatch {
                    status: Some(TaskStatus::Incompleted),
                    ..TaskPatch::default()
                },
            )
            .await
    }

    /// List an incident's tasks, oldest first; empty when none exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_tasks(&self, incident_number: i64) -> Result<Vec<Task>> {
        self.tasks().list_by_incident(incident_number).await
    }

    /// List tasks with the private-incident visibility rule applied.
    ///
    /// A non-member of a private incident receives an empty list, not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the incident does not exist.
    pub async fn list_tasks_for_viewer(
        &self,
        incident_number: i64,
        viewer: &Identity,
    ) -> Result<Vec<Task>> {
        let incident = self.incidents().get(incident_number).await?;
        if incident.private {
            if let Some(user_id) = viewer.user_id() {
                if !incident.is_member(user_id) {
                    return Ok(Vec::new());
                }
            }
        }
        self.list_tasks(incident_number).await
    }

    /// Direct task lookup with the visibility rule applied.
    ///
    /// Unlike list filtering, a non-member asking for a private incident's
    /// task by id gets an access-denied error, not a redaction.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for a missing task and
    /// `AppError::Unauthorized` for a non-member of a private incident.
    pub async fn get_task_for_viewer(&self, task_id: &str, viewer: &Identity) -> Result<Task> {
        let task = self.tasks().get(task_id).await?;
        let incident = self.incidents().get(task.incident_number).await?;
        if incident.private {
            if let Some(user_id) = viewer.user_id() {
                if !incident.is_member(user_id) {
                    return Err(AppError::Unauthorized(format!(
                        "task {task_id} belongs to a private incident"
                    )));
                }
            }
        }
        Ok(task)
    }
}
