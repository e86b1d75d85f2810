//! Task repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::Utc;

use crate::models::task::{Task, TaskPatch, TaskStatus};
use crate::{AppError, Result};

use super::db::Database;

/// Repository wrapper around `SQLite` for task records.
#[derive(Clone)]
pub struct TaskRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    incident_number: i64,
    title: String,
    description: String,
    status: String,
    created_by: String,
    assignee: Option<String>,
    channel_id: Option<String>,
    message_ts: Option<String>,
    created_at: String,
    completed_at: Option<String>,
}

fn parse_task_status(s: &str) -> Result<TaskStatus> {
    match s {
        "incompleted" => Ok(TaskStatus::Incompleted),
        "completed" => Ok(TaskStatus::Completed),
        other => Err(AppError::Db(format!("invalid task status: {other}"))),
    }
}

impl TaskRow {
    fn into_task(self) -> Result<Task> {
        let status = parse_task_status(&self.status)?;
        let created_at = chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|err| AppError::Db(format!("invalid created_at: {err}")))?
            .with_timezone(&Utc);
        let completed_at = self
            .completed_at
            .as_deref()
            .map(|s| {
                chrono::DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|err| AppError::Db(format!("invalid completed_at: {err}")))
            })
            .transpose()?;

        Ok(Task {
            id: self.id,
            incident_number: self.incident_number,
            title: self.title,
            description: self.description,
            status,
            created_by: self.created_by,
            assignee: self.assignee,
            channel_id: self.channel_id,
            message_ts: self.message_ts,
            created_at,
            completed_at,
        })
    }
}

impl TaskRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new task record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn create(&self, task: &Task) -> Result<()> {
        sqlx::query(
            "INSERT INTO task (id, incident_number, title, description, status, created_by,
             assignee, channel_id, message_ts, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&task.id)
        .bind(task.incident_number)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(&task.created_by)
        .bind(&task.assignee)
        .bind(&task.channel_id)
        .bind(&task.message_ts)
        .bind(task.created_at.to_rfc3339())
        .bind(task.completed_at.map(|dt| dt.to_rfc3339()))
        .execute(self.db.as_ref())
        .await?;
        Ok(())
    }

    /// Retrieve a task by identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the task does not exist.
    pub async fn get(&self, id: &str) -> Result<Task> {
        let row: Option<TaskRow> = sqlx::query_as("SELECT * FROM task WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.db.as_ref())
            .await?;

        row.map(TaskRow::into_task)
            .transpose()?
            .ok_or_else(|| AppError::NotFound(format!("task {id} not found")))
    }

    /// Apply a sparse patch to a task, leaving unsupplied fields untouched.
    ///
    /// Transitioning to `Completed` stamps `completed_at`; transitioning
    /// back clears it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the task does not exist.
    pub async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task> {
        let mut current = self.get(id).await?;

        if let Some(ref title) = patch.title {
            current.title = title.clone();
        }
        if let Some(ref description) = patch.description {
            current.description = description.clone();
        }
        if let Some(status) = patch.status {
            if status != current.status {
                current.completed_at = match status {
                    TaskStatus::Completed => Some(Utc::now()),
                    TaskStatus::Incompleted => None,
                };
            }
            current.status = status;
        }
        if let Some(ref assignee) = patch.assignee {
            current.assignee = Some(assignee.clone());
        }
        if let Some(ref message_ts) = patch.message_ts {
            current.message_ts = Some(message_ts.clone());
        }

        sqlx::query(
            "UPDATE task SET title = ?1, description = ?2, status = ?3, assignee = ?4,
             message_ts = ?5, completed_at = ?6 WHERE id = ?7",
        )
        .bind(&current.title)
        .bind(&current.description)
        .bind(current.status.as_str())
        .bind(&current.assignee)
        .bind(&current.message_ts)
        .bind(current.completed_at.map(|dt| dt.to_rfc3339()))
        .bind(id)
        .execute(self.db.as_ref())
        .await?;

        Ok(current)
    }

    /// List tasks for one incident, oldest first.
    ///
    /// Returns an empty vec when none exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_by_incident(&self, incident_number: i64) -> Result<Vec<Task>> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            "SELECT * FROM task WHERE incident_number = ?1 ORDER BY created_at ASC",
        )
        .bind(incident_number)
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(TaskRow::into_task).collect()
    }
}
