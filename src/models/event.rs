//! Normalized inbound chat event.

/// Normalized representation of a chat message or mention.
///
/// Constructed per request from the platform envelope; transient, never
/// persisted by the core itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Author identity; absent for some system-generated messages.
    pub user_id: Option<String>,
    /// Bot marker set by the platform when a bot authored the message.
    pub bot_id: Option<String>,
    /// Channel the message was posted in.
    pub channel_id: String,
    /// Message text.
    pub text: String,
    /// Platform timestamp of the message.
    pub ts: String,
    /// Parent timestamp when the message sits inside a thread.
    pub thread_ts: Option<String>,
}

impl InboundEvent {
    /// Whether the sender is a bot identity (loop prevention).
    #[must_use]
    pub fn is_from_bot(&self) -> bool {
        self.bot_id.is_some() || self.user_id.is_none()
    }

    /// Whether the event is a reply inside a thread rather than a
    /// top-level message.
    ///
    /// A thread parent carries its own `ts` as `thread_ts`; replies carry
    /// a differing parent timestamp.
    #[must_use]
    pub fn is_thread_reply(&self) -> bool {
        self.thread_ts
            .as_deref()
            .is_some_and(|parent| parent != self.ts)
    }
}
