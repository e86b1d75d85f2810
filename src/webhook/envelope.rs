//! Inbound webhook payload parsing.
//!
//! Event callbacks arrive as JSON envelopes; block-action interactions
//! arrive form-encoded with the JSON payload under a `payload=` field.
//! Parsing here only shapes the data — routing decisions live in the
//! server and classifier.

use serde::Deserialize;

use crate::models::event::InboundEvent;
use crate::{AppError, Result};

/// Outer envelope of an events-API request.
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    /// Envelope type: `url_verification` or `event_callback`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Verification challenge to echo back, when present.
    #[serde(default)]
    pub challenge: Option<String>,
    /// Inner event for `event_callback` envelopes.
    #[serde(default)]
    pub event: Option<RawMessageEvent>,
}

impl EventEnvelope {
    /// Parse an envelope from a raw JSON body.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for malformed JSON.
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|err| AppError::Validation(format!("malformed event envelope: {err}")))
    }

    /// Whether this is a URL verification handshake.
    #[must_use]
    pub fn is_challenge(&self) -> bool {
        self.kind == "url_verification"
    }
}

/// Inner message event, platform-shaped.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMessageEvent {
    /// Event type: `message` or `app_mention`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Message subtype (edits, joins, bot posts); absent for plain messages.
    #[serde(default)]
    pub subtype: Option<String>,
    /// Author user ID.
    #[serde(default)]
    pub user: Option<String>,
    /// Bot marker when a bot authored the message.
    #[serde(default)]
    pub bot_id: Option<String>,
    /// Channel the message was posted in.
    #[serde(default)]
    pub channel: Option<String>,
    /// Message text.
    #[serde(default)]
    pub text: Option<String>,
    /// Platform timestamp.
    #[serde(default)]
    pub ts: Option<String>,
    /// Parent timestamp for threaded messages.
    #[serde(default)]
    pub thread_ts: Option<String>,
}

impl RawMessageEvent {
    /// Normalize into the domain event shape.
    ///
    /// Returns `None` for events the core does not process: non-message
    /// kinds, structural subtypes like `message_changed`, or events missing
    /// a channel or timestamp.
    #[must_use]
    pub fn normalize(self) -> Option<InboundEvent> {
        if self.kind != "message" && self.kind != "app_mention" {
            return None;
        }
        // bot_message keeps its author fields; structural subtypes do not
        // describe a new message and are skipped.
        if let Some(ref subtype) = self.subtype {
            if subtype != "bot_message" {
                return None;
            }
        }
        Some(InboundEvent {
            user_id: self.user,
            bot_id: self.bot_id,
            channel_id: self.channel?,
            text: self.text.unwrap_or_default(),
            ts: self.ts?,
            thread_ts: self.thread_ts,
        })
    }
}

/// A block-action interaction payload.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionPayload {
    /// Interaction type, `block_actions` for button presses.
    #[serde(rename = "type")]
    pub kind: String,
    /// User who pressed the button.
    pub user: InteractionUser,
    /// Channel the interactive message sits in.
    #[serde(default)]
    pub channel: Option<InteractionChannel>,
    /// The interactive message itself.
    #[serde(default)]
    pub message: Option<InteractionMessage>,
    /// Actions taken; button presses carry exactly one.
    #[serde(default)]
    pub actions: Vec<InteractionAction>,
}

/// Acting user of an interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionUser {
    /// Platform user ID.
    pub id: String,
    /// Display username, when provided.
    #[serde(default)]
    pub username: Option<String>,
}

/// Channel reference inside an interaction payload.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionChannel {
    /// Channel ID.
    pub id: String,
    /// Channel name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Message reference inside an interaction payload.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionMessage {
    /// Timestamp identifying the message within its channel.
    pub ts: String,
}

/// One action within an interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionAction {
    /// Action identifier wired into the block.
    pub action_id: String,
    /// Opaque value attached to the button.
    #[serde(default)]
    pub value: Option<String>,
}

impl InteractionPayload {
    /// Extract and parse the interaction payload from a form-encoded body.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` when the `payload` field is absent or
    /// holds malformed JSON.
    pub fn from_form(body: &str) -> Result<Self> {
        let raw = form_field(body, "payload")
            .ok_or_else(|| AppError::Validation("missing payload form field".into()))?;
        serde_json::from_str(&raw)
            .map_err(|err| AppError::Validation(format!("malformed interaction payload: {err}")))
    }

    /// First action's ID, empty when the payload carries no actions.
    #[must_use]
    pub fn action_id(&self) -> &str {
        self.actions
            .first()
            .map_or("", |action| action.action_id.as_str())
    }

    /// First action's value, when present.
    #[must_use]
    pub fn action_value(&self) -> Option<&str> {
        self.actions.first().and_then(|action| action.value.as_deref())
    }
}

/// Look up one field of a form-encoded body, percent-decoded.
fn form_field(body: &str, name: &str) -> Option<String> {
    for pair in body.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key == name {
            return Some(percent_decode(value));
        }
    }
    None
}

/// Decode `%XX` escapes and `+` spaces in a form-encoded value.
fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'+' => {
                out.push(b' ');
                index += 1;
            }
            b'%' => {
                if let Some(hex) = raw.get(index + 1..index + 3) {
                    if let Ok(byte) = u8::from_str_radix(hex, 16) {
                        out.push(byte);
                        index += 3;
                        continue;
                    }
                }
                out.push(b'%');
                index += 1;
            }
            byte => {
                out.push(byte);
                index += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
