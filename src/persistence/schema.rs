//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS` — safe to
//! re-run on every server startup. Produces a convergent result.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the connected `SQLite` database.
///
/// Creates all six tables idempotently. Safe to call on every startup.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS incident (
    number                  INTEGER PRIMARY KEY NOT NULL,
    title                   TEXT NOT NULL,
    description             TEXT NOT NULL DEFAULT '',
    category                TEXT NOT NULL,
    severity                TEXT NOT NULL,
    origin_channel_id       TEXT NOT NULL,
    origin_channel_name     TEXT NOT NULL,
    incident_channel_id     TEXT,
    incident_channel_name   TEXT,
    created_by              TEXT NOT NULL,
    private                 INTEGER NOT NULL DEFAULT 0,
    members                 TEXT NOT NULL DEFAULT '[]',
    status                  TEXT NOT NULL CHECK(status IN ('triage','handling','monitoring','closed')),
    created_at              TEXT NOT NULL,
    lead                    TEXT
);

CREATE TABLE IF NOT EXISTS status_history (
    id              TEXT PRIMARY KEY NOT NULL,
    incident_number INTEGER NOT NULL,
    status          TEXT NOT NULL CHECK(status IN ('triage','handling','monitoring','closed')),
    actor           TEXT NOT NULL,
    note            TEXT NOT NULL DEFAULT '',
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS task (
    id              TEXT PRIMARY KEY NOT NULL,
    incident_number INTEGER NOT NULL,
    title           TEXT NOT NULL,
    description     TEXT NOT NULL DEFAULT '',
    status          TEXT NOT NULL CHECK(status IN ('incompleted','completed')),
    created_by      TEXT NOT NULL,
    assignee        TEXT,
    channel_id      TEXT,
    message_ts      TEXT,
    created_at      TEXT NOT NULL,
    completed_at    TEXT
);

CREATE TABLE IF NOT EXISTS message (
    id          TEXT PRIMARY KEY NOT NULL,
    channel_id  TEXT NOT NULL,
    user_id     TEXT NOT NULL,
    text        TEXT NOT NULL,
    ts          TEXT NOT NULL,
    thread_ts   TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS session (
    id          TEXT PRIMARY KEY NOT NULL,
    user_id     TEXT NOT NULL,
    user_name   TEXT,
    created_at  TEXT NOT NULL,
    expires_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS counter (
    name    TEXT PRIMARY KEY NOT NULL,
    value   INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_incident_origin_channel ON incident(origin_channel_id);
CREATE INDEX IF NOT EXISTS idx_incident_channel ON incident(incident_channel_id);
CREATE INDEX IF NOT EXISTS idx_history_incident ON status_history(incident_number);
CREATE INDEX IF NOT EXISTS idx_task_incident ON task(incident_number);
CREATE INDEX IF NOT EXISTS idx_message_channel ON message(channel_id);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
