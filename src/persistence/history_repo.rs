//! Status history repository for `SQLite` persistence.
//!
//! The history table is append-only: rows are inserted, never updated or
//! deduplicated.

use std::sync::Arc;

use chrono::Utc;

use crate::models::history::StatusHistory;
use crate::models::incident::IncidentStatus;
use crate::{AppError, Result};

use super::db::Database;

/// Repository wrapper around `SQLite` for status history records.
#[derive(Clone)]
pub struct HistoryRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct HistoryRow {
    id: String,
    incident_number: i64,
    status: String,
    actor: String,
    note: String,
    created_at: String,
}

impl HistoryRow {
    fn into_history(self) -> Result<StatusHistory> {
        let status = IncidentStatus::parse(&self.status)
            .map_err(|_| AppError::Db(format!("invalid persisted status: {}", self.status)))?;
        let created_at = chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|err| AppError::Db(format!("invalid created_at: {err}")))?
            .with_timezone(&Utc);

        Ok(StatusHistory {
            id: self.id,
            incident_number: self.incident_number,
            status,
            actor: self.actor,
            note: self.note,
            created_at,
        })
    }
}

impl HistoryRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append one history entry.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn append(&self, entry: &StatusHistory) -> Result<()> {
        sqlx::query(
            "INSERT INTO status_history (id, incident_number, status, actor, note, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&entry.id)
        .bind(entry.incident_number)
        .bind(entry.status.as_str())
        .bind(&entry.actor)
        .bind(&entry.note)
        .bind(entry.created_at.to_rfc3339())
        .execute(self.db.as_ref())
        .await?;
        Ok(())
    }

    /// List history entries for one incident, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_by_incident(&self, incident_number: i64) -> Result<Vec<StatusHistory>> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            "SELECT * FROM status_history WHERE incident_number = ?1 ORDER BY created_at ASC",
        )
        .bind(incident_number)
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(HistoryRow::into_history).collect()
    }
}
