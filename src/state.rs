//! Shared application state.

use std::sync::Arc;

use crate::config::GlobalConfig;
use crate::llm::Summarizer;
use crate::persistence::db::Database;
use crate::slack::gateway::SlackGateway;

/// Shared state handed to webhook handlers and dispatched work.
///
/// Slack and the summarizer are optional: without credentials the service
/// runs in local-only mode, skipping chat side effects and falling back to
/// pattern-based classification.
pub struct AppState {
    /// Parsed global configuration.
    pub config: Arc<GlobalConfig>,
    /// `SQLite` connection pool.
    pub db: Arc<Database>,
    /// Slack Web API gateway, when configured.
    pub slack: Option<Arc<SlackGateway>>,
    /// Summarizer client, when configured.
    pub summarizer: Option<Arc<Summarizer>>,
}
