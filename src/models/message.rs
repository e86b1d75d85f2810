//! Raw channel message persisted for conversational context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One chat message captured from a channel.
///
/// Stored unconditionally by the classifier so the summarizer can later
/// reconstruct the conversation leading up to an incident.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ChannelMessage {
    /// Unique record identifier.
    pub id: String,
    /// Channel the message was posted in.
    pub channel_id: String,
    /// Author identity.
    pub user_id: String,
    /// Message text.
    pub text: String,
    /// Platform timestamp of the message.
    pub ts: String,
    /// Parent timestamp when the message is a thread reply.
    pub thread_ts: Option<String>,
    /// Capture timestamp.
    pub created_at: DateTime<Utc>,
}

impl ChannelMessage {
    /// Construct a captured message with a generated identifier.
    #[must_use]
    pub fn new(
        channel_id: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
        ts: impl Into<String>,
        thread_ts: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            channel_id: channel_id.into(),
            user_id: user_id.into(),
            text: text.into(),
            ts: ts.into(),
            thread_ts,
            created_at: Utc::now(),
        }
    }
}
