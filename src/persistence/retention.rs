//! Retention service for time-based data purge.
//!
//! Runs as a background task deleting expired login sessions and captured
//! channel messages older than the configured retention window. Incidents
//! and their history are never purged — closed, not erased.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::Result;

use super::db::Database;
use super::message_repo::MessageRepo;
use super::session_repo::SessionRepo;

const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Spawn the retention purge background task.
///
/// The task runs hourly. On each tick it deletes expired sessions and
/// messages older than `message_retention_days`.
#[must_use]
pub fn spawn_retention_task(
    db: Arc<Database>,
    message_retention_days: u32,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("retention task shutting down");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(err) = purge(&db, message_retention_days).await {
                        error!(?err, "retention purge failed");
                    }
                }
            }
        }
    })
}

async fn purge(db: &Arc<Database>, message_retention_days: u32) -> Result<()> {
    let now = Utc::now();
    let cutoff = now - chrono::Duration::days(i64::from(message_retention_days));

    let sessions = SessionRepo::new(Arc::clone(db)).purge_expired(now).await?;
    let messages = MessageRepo::new(Arc::clone(db))
        .purge_older_than(cutoff)
        .await?;

    info!(sessions, messages, "retention purge completed");
    Ok(())
}
