//! Incident repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::Utc;

use crate::models::incident::{Incident, IncidentStatus};
use crate::{AppError, Result};

use super::db::Database;

/// Repository wrapper around `SQLite` for incident records.
#[derive(Clone)]
pub struct IncidentRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct IncidentRow {
    number: i64,
    title: String,
    description: String,
    category: String,
    severity: String,
    origin_channel_id: String,
    origin_channel_name: String,
    incident_channel_id: Option<String>,
    incident_channel_name: Option<String>,
    created_by: String,
    private: bool,
    members: String,
    status: String,
    created_at: String,
    lead: Option<String>,
}

impl IncidentRow {
    /// Convert a database row into the domain model.
    fn into_incident(self) -> Result<Incident> {
        let status = IncidentStatus::parse(&self.status)
            .map_err(|_| AppError::Db(format!("invalid persisted status: {}", self.status)))?;
        let members: Vec<String> = serde_json::from_str(&self.members)
            .map_err(|err| AppError::Db(format!("invalid members json: {err}")))?;
        let created_at = chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|err| AppError::Db(format!("invalid created_at: {err}")))?
            .with_timezone(&Utc);

        Ok(Incident {
            number: self.number,
            title: self.title,
            description: self.description,
            category: self.category,
            severity: self.severity,
            origin_channel_id: self.origin_channel_id,
            origin_channel_name: self.origin_channel_name,
            incident_channel_id: self.incident_channel_id,
            incident_channel_name: self.incident_channel_name,
            created_by: self.created_by,
            private: self.private,
            members,
            status,
            created_at,
            lead: self.lead,
        })
    }
}

impl IncidentRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Atomically allocate the next incident number.
    ///
    /// The counter lives in a single row mutated with an upsert, so
    /// concurrent callers always observe distinct, monotonic values.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the counter update fails.
    pub async fn next_incident_number(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            "INSERT INTO counter (name, value) VALUES ('incident', 1)
             ON CONFLICT(name) DO UPDATE SET value = value + 1
             RETURNING value",
        )
        .fetch_one(self.db.as_ref())
        .await?;
        Ok(row.0)
    }

    /// Insert or fully replace an incident record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the write fails.
    pub async fn put(&self, incident: &Incident) -> Result<()> {
        let members = serde_json::to_string(&incident.members)
            .map_err(|err| AppError::Db(format!("failed to encode members: {err}")))?;
        let created_at = incident.created_at.to_rfc3339();

        sqlx::query(
            "INSERT OR REPLACE INTO incident (number, title, description, category, severity,
             origin_channel_id, origin_channel_name, incident_channel_id, incident_channel_name,
             created_by, private, members, status, created_at, lead)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )
        .bind(incident.number)
        .bind(&incident.title)
        .bind(&incident.description)
        .bind(&incident.category)
        .bind(&incident.severity)
        .bind(&incident.origin_channel_id)
        .bind(&incident.origin_channel_name)
        .bind(&incident.incident_channel_id)
        .bind(&incident.incident_channel_name)
        .bind(&incident.created_by)
        .bind(incident.private)
        .bind(&members)
        .bind(incident.status.as_str())
        .bind(&created_at)
        .bind(&incident.lead)
        .execute(self.db.as_ref())
        .await?;

        Ok(())
    }

    /// Retrieve an incident by number.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the incident does not exist.
    pub async fn get(&self, number: i64) -> Result<Incident> {
        let row: Option<IncidentRow> = sqlx::query_as("SELECT * FROM incident WHERE number = ?1")
            .bind(number)
            .fetch_optional(self.db.as_ref())
            .await?;

        row.map(IncidentRow::into_incident)
            .transpose()?
            .ok_or_else(|| AppError::NotFound(format!("incident {number} not found")))
    }

    /// Retrieve the incident bound to a channel.
    ///
    /// The dedicated incident channel wins; the origin channel is checked
    /// as a fallback so commands issued where the incident started still
    /// resolve.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no incident is bound to the channel.
    pub async fn get_by_channel_id(&self, channel_id: &str) -> Result<Incident> {
        let row: Option<IncidentRow> = sqlx::query_as(
            "SELECT * FROM incident WHERE incident_channel_id = ?1
             ORDER BY number DESC LIMIT 1",
        )
        .bind(channel_id)
        .fetch_optional(self.db.as_ref())
        .await?;

        if let Some(row) = row {
            return row.into_incident();
        }

        let row: Option<IncidentRow> = sqlx::query_as(
            "SELECT * FROM incident WHERE origin_channel_id = ?1 AND status != 'closed'
             ORDER BY number DESC LIMIT 1",
        )
        .bind(channel_id)
        .fetch_optional(self.db.as_ref())
        .await?;

        row.map(IncidentRow::into_incident)
            .transpose()?
            .ok_or_else(|| AppError::NotFound(format!("no incident bound to channel {channel_id}")))
    }

    /// Update only the status field of an incident.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the incident does not exist.
    pub async fn update_status(&self, number: i64, status: IncidentStatus) -> Result<()> {
        let result = sqlx::query("UPDATE incident SET status = ?1 WHERE number = ?2")
            .bind(status.as_str())
            .bind(number)
            .execute(self.db.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("incident {number} not found")));
        }
        Ok(())
    }

    /// Record the dedicated channel created for an incident.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn set_incident_channel(
        &self,
        number: i64,
        channel_id: &str,
        channel_name: &str,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE incident SET incident_channel_id = ?1, incident_channel_name = ?2
             WHERE number = ?3",
        )
        .bind(channel_id)
        .bind(channel_name)
        .bind(number)
        .execute(self.db.as_ref())
        .await?;
        Ok(())
    }

    /// List all incidents, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list(&self) -> Result<Vec<Incident>> {
        let rows: Vec<IncidentRow> =
            sqlx::query_as("SELECT * FROM incident ORDER BY number DESC")
                .fetch_all(self.db.as_ref())
                .await?;

        rows.into_iter().map(IncidentRow::into_incident).collect()
    }
}
