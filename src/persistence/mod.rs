//! Persistence layer modules.

pub mod db;
pub mod history_repo;
pub mod incident_repo;
pub mod message_repo;
pub mod retention;
pub mod schema;
pub mod session_repo;
pub mod task_repo;

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;
