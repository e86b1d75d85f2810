//! Per-request execution context carried across the async boundary.

use std::fmt::{Display, Formatter};

use uuid::Uuid;

/// Caller identity attached to a request.
///
/// Webhook-originated work carries the Slack user ID of the message author;
/// service-to-service and unauthenticated callers are `Anonymous`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// No authenticated caller.
    Anonymous,
    /// A known Slack user ID.
    User(String),
}

impl Identity {
    /// The Slack user ID, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::User(id) => Some(id.as_str()),
        }
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::User(id) => write!(f, "{id}"),
        }
    }
}

/// Bundle of identity and correlation id handed to background work.
///
/// Created fresh per inbound request. [`ExecutionContext::detached`] yields
/// an owned copy with no linkage to the request's lifetime, so dispatched
/// work cannot observe request cancellation.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Acting identity for the unit of work.
    pub identity: Identity,
    /// Correlation id tying log lines back to the originating request.
    pub request_id: String,
}

impl ExecutionContext {
    /// Context for an inbound request with a freshly generated correlation id.
    #[must_use]
    pub fn for_request(identity: Identity) -> Self {
        Self {
            identity,
            request_id: Uuid::new_v4().to_string(),
        }
    }

    /// Anonymous context for service-internal work.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::for_request(Identity::Anonymous)
    }

    /// Owned copy safe to move into background work.
    ///
    /// The context holds no cancellation state, so a clone is sufficient;
    /// this method exists to make the hand-off explicit at dispatch sites.
    #[must_use]
    pub fn detached(&self) -> Self {
        self.clone()
    }

    /// Replace the identity, keeping the correlation id.
    #[must_use]
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }
}
