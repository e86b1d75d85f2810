//! Incident aggregate and lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

/// Lifecycle status for an incident.
///
/// All four states are valid at rest. The engine allows any transition
/// between defined states; ordering discipline is a caller policy, not an
/// invariant enforced here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    /// Under initial assessment.
    Triage,
    /// Actively being handled.
    Handling,
    /// Fix applied, watching for recurrence.
    Monitoring,
    /// Resolved; incidents are closed, never erased.
    Closed,
}

impl IncidentStatus {
    /// Parse a user-supplied status value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for anything outside the four
    /// defined states.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "triage" => Ok(Self::Triage),
            "handling" => Ok(Self::Handling),
            "monitoring" => Ok(Self::Monitoring),
            "closed" => Ok(Self::Closed),
            other => Err(AppError::Validation(format!(
                "invalid incident status: {other}"
            ))),
        }
    }

    /// Canonical string form used in persistence and chat messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Triage => "triage",
            Self::Handling => "handling",
            Self::Monitoring => "monitoring",
            Self::Closed => "closed",
        }
    }
}

/// Incident aggregate root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Incident {
    /// Monotonically assigned incident number.
    pub number: i64,
    /// Short human title.
    pub title: String,
    /// Longer free-text description.
    pub description: String,
    /// Category identifier (drives channel invites).
    pub category: String,
    /// Severity identifier.
    pub severity: String,
    /// Channel the triggering message was posted in.
    pub origin_channel_id: String,
    /// Name of the origin channel.
    pub origin_channel_name: String,
    /// Dedicated incident channel, once created.
    pub incident_channel_id: Option<String>,
    /// Name of the dedicated channel.
    pub incident_channel_name: Option<String>,
    /// Creator identity; immutable after creation.
    pub created_by: String,
    /// Whether detail fields are restricted to the member set.
    pub private: bool,
    /// Member identities; populated only when private.
    pub members: Vec<String>,
    /// Current lifecycle status.
    pub status: IncidentStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Lead assignee, if one has been designated.
    pub lead: Option<String>,
}

impl Incident {
    /// Whether the given user may see this incident's detail fields.
    ///
    /// The creator is always a member; the member set is only meaningful
    /// for private incidents.
    #[must_use]
    pub fn is_member(&self, user_id: &str) -> bool {
        self.created_by == user_id || self.members.iter().any(|member| member == user_id)
    }

    /// Generic label shown to non-members in place of the real title.
    #[must_use]
    pub fn generic_title(&self) -> String {
        format!("Private incident #{} ({})", self.number, self.category)
    }

    /// Redacted copy for non-member viewers of a private incident.
    ///
    /// Clears the description and replaces the title; status, channel
    /// names, category, and timestamps are left intact.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            title: self.generic_title(),
            description: String::new(),
            ..self.clone()
        }
    }
}
