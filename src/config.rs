//! Global configuration parsing, validation, and credential loading.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Nested Slack configuration for webhook connectivity.
///
/// The signing secret and bot token are loaded at runtime via the OS
/// keychain or environment variables, never from the TOML config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SlackConfig {
    /// Bot user ID used to recognize `<@BOT>` mentions in message text.
    #[serde(default)]
    pub bot_user_id: String,
    /// Request signing secret for webhook verification (populated at runtime).
    #[serde(skip)]
    pub signing_secret: String,
    /// Bot token used for Web API calls (populated at runtime).
    #[serde(skip)]
    pub bot_token: String,
}

impl SlackConfig {
    /// Whether webhook verification and Web API calls are usable.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.signing_secret.is_empty() && !self.bot_token.is_empty()
    }
}

/// Summarizer (LLM) configuration for incident title/description extraction.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible chat completions API.
    #[serde(default = "default_llm_api_base")]
    pub api_base: String,
    /// Model identifier passed to the completions endpoint.
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// API key (populated at runtime from keychain / env var).
    #[serde(skip)]
    pub api_key: String,
}

fn default_llm_api_base() -> String {
    "https://api.openai.com/v1".into()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".into()
}

/// Per-category invite lists applied when a dedicated channel is created.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CategoryConfig {
    /// Slack user IDs invited to every incident of this category.
    #[serde(default)]
    pub invite_users: Vec<String>,
    /// Slack usergroup IDs whose members are invited.
    #[serde(default)]
    pub invite_groups: Vec<String>,
}

fn default_http_port() -> u16 {
    3000
}

fn default_channel_prefix() -> String {
    "inc".into()
}

fn default_message_retention_days() -> u32 {
    90
}

fn default_category() -> String {
    "general".into()
}

fn default_severity() -> String {
    "unclassified".into()
}

fn default_true() -> bool {
    true
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// HTTP port for the webhook endpoints.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Path to the `SQLite` database file.
    pub db_path: String,
    /// Dashboard base URL; when set, a bookmark is added to incident channels.
    #[serde(default)]
    pub frontend_url: Option<String>,
    /// Prefix for dedicated incident channel names (`<prefix>-<number>-<slug>`).
    #[serde(default = "default_channel_prefix")]
    pub channel_prefix: String,
    /// Whether new incidents start in `Triage` rather than `Handling`.
    #[serde(default = "default_true")]
    pub initial_triage: bool,
    /// Days before raw channel messages are purged.
    #[serde(default = "default_message_retention_days")]
    pub message_retention_days: u32,
    /// Category assigned when classification does not pick one.
    #[serde(default = "default_category")]
    pub default_category: String,
    /// Severity assigned when classification does not pick one.
    #[serde(default = "default_severity")]
    pub default_severity: String,
    /// Incident categories with their invite lists.
    #[serde(default)]
    pub categories: HashMap<String, CategoryConfig>,
    /// Slack connectivity settings.
    #[serde(default)]
    pub slack: SlackConfig,
    /// Optional summarizer settings; absent means pattern-only classification.
    #[serde(default)]
    pub llm: Option<LlmConfig>,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load Slack and summarizer credentials from the OS keychain with
    /// env-var fallback.
    ///
    /// Missing Slack credentials are tolerated: the webhook endpoints answer
    /// 503 until the service is configured, so startup must not fail here.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the keychain task cannot be joined.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.slack.signing_secret =
            load_credential("slack_signing_secret", "SLACK_SIGNING_SECRET")
                .await?
                .unwrap_or_default();
        self.slack.bot_token = load_credential("slack_bot_token", "SLACK_BOT_TOKEN")
            .await?
            .unwrap_or_default();
        if !self.slack.is_configured() {
            warn!("slack credentials incomplete; webhook endpoints will answer 503");
        }

        if let Some(ref mut llm) = self.llm {
            match load_credential("llm_api_key", "LLM_API_KEY").await? {
                Some(key) => llm.api_key = key,
                None => {
                    warn!("llm api key missing; falling back to pattern-based classification");
                    self.llm = None;
                }
            }
        }
        Ok(())
    }

    /// Invite lists for a category, empty when the category is unknown.
    #[must_use]
    pub fn category(&self, name: &str) -> CategoryConfig {
        self.categories.get(name).cloned().unwrap_or_default()
    }

    fn validate(&self) -> Result<()> {
        if self.db_path.trim().is_empty() {
            return Err(AppError::Config("db_path must not be empty".into()));
        }
        if self.channel_prefix.trim().is_empty() {
            return Err(AppError::Config("channel_prefix must not be empty".into()));
        }
        if self.message_retention_days == 0 {
            return Err(AppError::Config(
                "message_retention_days must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Load a single credential from the OS keychain with env-var fallback.
///
/// Returns `Ok(None)` when neither source provides a value.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<Option<String>> {
    let key = keyring_key.to_owned();

    // Keychain access is synchronous I/O, so it runs on the blocking pool.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new("incident-relay", &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(Some(value)),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    Ok(env::var(env_key).ok().filter(|value| !value.is_empty()))
}
