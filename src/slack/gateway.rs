//! Slack Web API client used for all outbound chat-platform calls.
//!
//! Every method is a single synchronous-looking HTTP call; callers inside
//! dispatched work treat failures as upstream errors (logged, swallowed,
//! best-effort compensation).

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{AppError, Result};

const DEFAULT_API_BASE: &str = "https://slack.com/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Identifier pair for a posted or updated message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    /// Channel the message landed in.
    pub channel: String,
    /// Platform timestamp identifying the message.
    pub ts: String,
}

/// Channel metadata subset the core consumes.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Channel ID.
    pub id: String,
    /// Channel name without the leading `#`.
    #[serde(default)]
    pub name: String,
}

/// User metadata subset the core consumes.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    /// User ID.
    pub id: String,
    /// Handle without the leading `@`.
    #[serde(default)]
    pub name: String,
    /// Full display name, if set.
    #[serde(default)]
    pub real_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiAck {
    ok: bool,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    ok: bool,
    error: Option<String>,
    channel: Option<String>,
    ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConversationResponse {
    ok: bool,
    error: Option<String>,
    channel: Option<ChannelInfo>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    ok: bool,
    error: Option<String>,
    user: Option<UserInfo>,
}

#[derive(Debug, Deserialize)]
struct UsergroupUsersResponse {
    ok: bool,
    error: Option<String>,
    #[serde(default)]
    users: Vec<String>,
}

/// Slack Web API gateway bound to one bot token.
#[derive(Clone)]
pub struct SlackGateway {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl SlackGateway {
    /// Build a gateway against the public Slack API.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` if the HTTP client cannot be constructed.
    pub fn new(bot_token: impl Into<String>) -> Result<Self> {
        Self::with_api_base(bot_token, DEFAULT_API_BASE)
    }

    /// Build a gateway against a custom API base (tests).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` if the HTTP client cannot be constructed.
    pub fn with_api_base(bot_token: impl Into<String>, api_base: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| AppError::Slack(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_owned(),
            bot_token: bot_token.into(),
        })
    }

    /// Post a message to a channel, optionally threaded and with blocks.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` if the call fails or the API answers not-ok.
    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
        blocks: Option<Value>,
        thread_ts: Option<&str>,
    ) -> Result<PostedMessage> {
        let mut payload = json!({
            "channel": channel,
            "text": text,
            "unfurl_links": false,
        });
        if let Some(blocks) = blocks {
            payload["blocks"] = blocks;
        }
        if let Some(thread_ts) = thread_ts {
            payload["thread_ts"] = Value::String(thread_ts.to_owned());
        }

        let response: ChatMessageResponse = self.call("chat.postMessage", &payload).await?;
        if !response.ok {
            return Err(api_error("chat.postMessage", response.error));
        }

        Ok(PostedMessage {
            channel: response.channel.unwrap_or_else(|| channel.to_owned()),
            ts: response
                .ts
                .ok_or_else(|| AppError::Slack("chat.postMessage response missing ts".into()))?,
        })
    }

    /// Replace the content of an existing message.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` if the call fails or the API answers not-ok.
    pub async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        text: &str,
        blocks: Option<Value>,
    ) -> Result<()> {
        let mut payload = json!({
            "channel": channel,
            "ts": ts,
            "text": text,
        });
        if let Some(blocks) = blocks {
            payload["blocks"] = blocks;
        }

        let response: ChatMessageResponse = self.call("chat.update", &payload).await?;
        if !response.ok {
            return Err(api_error("chat.update", response.error));
        }
        Ok(())
    }

    /// Create a channel for a new incident.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` if the call fails or the API answers not-ok.
    pub async fn create_channel(&self, name: &str, private: bool) -> Result<ChannelInfo> {
        let payload = json!({
            "name": name,
            "is_private": private,
        });

        let response: ConversationResponse = self.call("conversations.create", &payload).await?;
        if !response.ok {
            return Err(api_error("conversations.create", response.error));
        }
        let channel = response
            .channel
            .ok_or_else(|| AppError::Slack("conversations.create missing channel".into()))?;
        info!(channel_id = %channel.id, channel_name = %channel.name, "created channel");
        Ok(channel)
    }

    /// Invite users to a channel.
    ///
    /// No-op for an empty user list.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` if the call fails or the API answers not-ok.
    pub async fn invite_users(&self, channel: &str, users: &[String]) -> Result<()> {
        if users.is_empty() {
            return Ok(());
        }
        let payload = json!({
            "channel": channel,
            "users": users.join(","),
        });

        let response: ApiAck = self.call("conversations.invite", &payload).await?;
        if !response.ok {
            return Err(api_error("conversations.invite", response.error));
        }
        Ok(())
    }

    /// Fetch channel metadata.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` if the call fails or the API answers not-ok.
    pub async fn channel_info(&self, channel: &str) -> Result<ChannelInfo> {
        let payload = json!({ "channel": channel });

        let response: ConversationResponse = self.call("conversations.info", &payload).await?;
        if !response.ok {
            return Err(api_error("conversations.info", response.error));
        }
        response
            .channel
            .ok_or_else(|| AppError::Slack("conversations.info missing channel".into()))
    }

    /// Fetch user metadata.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` if the call fails or the API answers not-ok.
    pub async fn user_info(&self, user: &str) -> Result<UserInfo> {
        let payload = json!({ "user": user });

        let response: UserResponse = self.call("users.info", &payload).await?;
        if !response.ok {
            return Err(api_error("users.info", response.error));
        }
        response
            .user
            .ok_or_else(|| AppError::Slack("users.info missing user".into()))
    }

    /// List member user IDs of a usergroup.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` if the call fails or the API answers not-ok.
    pub async fn usergroup_members(&self, usergroup: &str) -> Result<Vec<String>> {
        let payload = json!({ "usergroup": usergroup });

        let response: UsergroupUsersResponse =
            self.call("usergroups.users.list", &payload).await?;
        if !response.ok {
            return Err(api_error("usergroups.users.list", response.error));
        }
        Ok(response.users)
    }

    /// Add a link bookmark to a channel.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` if the call fails or the API answers not-ok.
    pub async fn add_bookmark(&self, channel: &str, title: &str, link: &str) -> Result<()> {
        let payload = json!({
            "channel_id": channel,
            "title": title,
            "type": "link",
            "link": link,
        });

        let response: ApiAck = self.call("bookmarks.add", &payload).await?;
        if !response.ok {
            return Err(api_error("bookmarks.add", response.error));
        }
        Ok(())
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        payload: &Value,
    ) -> Result<T> {
        let response = self
            .http
            .post(format!("{}/{method}", self.api_base))
            .bearer_auth(&self.bot_token)
            .json(payload)
            .send()
            .await
            .map_err(|err| AppError::Slack(format!("{method} request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Slack(format!(
                "{method} failed with http status {status}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|err| AppError::Slack(format!("failed to decode {method} response: {err}")))
    }
}

fn api_error(method: &str, error: Option<String>) -> AppError {
    AppError::Slack(format!(
        "{method} failed: {}",
        error.unwrap_or_else(|| "unknown error".into())
    ))
}
