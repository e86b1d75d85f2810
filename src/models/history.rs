//! Append-only status transition log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::incident::IncidentStatus;

/// One status transition for one incident.
///
/// History rows are immutable once written and monotonically increasing in
/// time; every successful status change appends exactly one row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct StatusHistory {
    /// Unique record identifier.
    pub id: String,
    /// Target incident number.
    pub incident_number: i64,
    /// Status value after the transition.
    pub status: IncidentStatus,
    /// Identity that performed the transition.
    pub actor: String,
    /// Free-text note attached to the transition.
    pub note: String,
    /// Transition timestamp.
    pub created_at: DateTime<Utc>,
}

impl StatusHistory {
    /// Construct a new history entry with a generated identifier.
    #[must_use]
    pub fn new(
        incident_number: i64,
        status: IncidentStatus,
        actor: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            incident_number,
            status,
            actor: actor.into(),
            note: note.into(),
            created_at: Utc::now(),
        }
    }
}
