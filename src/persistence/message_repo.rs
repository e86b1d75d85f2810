//! Channel message repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::message::ChannelMessage;
use crate::{AppError, Result};

use super::db::Database;

/// Repository wrapper around `SQLite` for captured channel messages.
#[derive(Clone)]
pub struct MessageRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct MessageRow {
    id: String,
    channel_id: String,
    user_id: String,
    text: String,
    ts: String,
    thread_ts: Option<String>,
    created_at: String,
}

impl MessageRow {
    fn into_message(self) -> Result<ChannelMessage> {
        let created_at = chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|err| AppError::Db(format!("invalid created_at: {err}")))?
            .with_timezone(&Utc);

        Ok(ChannelMessage {
            id: self.id,
            channel_id: self.channel_id,
            user_id: self.user_id,
            text: self.text,
            ts: self.ts,
            thread_ts: self.thread_ts,
            created_at,
        })
    }
}

impl MessageRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Persist one captured message.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn save(&self, message: &ChannelMessage) -> Result<()> {
        sqlx::query(
            "INSERT INTO message (id, channel_id, user_id, text, ts, thread_ts, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&message.id)
        .bind(&message.channel_id)
        .bind(&message.user_id)
        .bind(&message.text)
        .bind(&message.ts)
        .bind(&message.thread_ts)
        .bind(message.created_at.to_rfc3339())
        .execute(self.db.as_ref())
        .await?;
        Ok(())
    }

    /// Retrieve a message by identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the message does not exist.
    pub async fn get(&self, id: &str) -> Result<ChannelMessage> {
        let row: Option<MessageRow> = sqlx::query_as("SELECT * FROM message WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.db.as_ref())
            .await?;

        row.map(MessageRow::into_message)
            .transpose()?
            .ok_or_else(|| AppError::NotFound(format!("message {id} not found")))
    }

    /// List the most recent messages in a channel, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_recent(&self, channel_id: &str, limit: u32) -> Result<Vec<ChannelMessage>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT * FROM (
                 SELECT * FROM message WHERE channel_id = ?1 ORDER BY ts DESC LIMIT ?2
             ) ORDER BY ts ASC",
        )
        .bind(channel_id)
        .bind(limit)
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(MessageRow::into_message).collect()
    }

    /// Delete captured messages older than the cutoff.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM message WHERE created_at < ?1")
            .bind(cutoff.to_rfc3339())
            .execute(self.db.as_ref())
            .await?;
        Ok(result.rows_affected())
    }
}
