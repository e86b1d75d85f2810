//! Login session record for authenticated read paths.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque-token session mapping a browser to a Slack identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Session {
    /// Opaque session token.
    pub id: String,
    /// Authenticated Slack user ID.
    pub user_id: String,
    /// Display name captured at login, if available.
    pub user_name: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Expiry timestamp; expired sessions are purged by retention.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Construct a session with a generated token and the given lifetime.
    #[must_use]
    pub fn new(user_id: impl Into<String>, user_name: Option<String>, ttl_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            user_name,
            created_at: now,
            expires_at: now + Duration::hours(ttl_hours),
        }
    }

    /// Whether the session has passed its expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
