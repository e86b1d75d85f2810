//! Summarizer client for incident title/description extraction.
//!
//! Talks to an OpenAI-compatible chat completions endpoint. The response
//! contract is strict: a non-JSON or empty reply is a hard failure, never a
//! partial success.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::config::LlmConfig;
use crate::models::message::ChannelMessage;
use crate::{AppError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SYSTEM_PROMPT: &str = "You summarize chat conversations about operational \
problems. Reply with a single JSON object of the form \
{\"title\": \"...\", \"description\": \"...\"} and nothing else. The title is a \
short headline for the incident; the description is one or two sentences of \
context. Do not wrap the JSON in markdown fences.";

/// Title/description pair extracted from a conversation.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Summary {
    /// Short incident headline.
    pub title: String,
    /// One or two sentences of context.
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// Client for one OpenAI-compatible completions endpoint.
#[derive(Clone)]
pub struct Summarizer {
    http: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl Summarizer {
    /// Build a summarizer from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Llm` if the HTTP client cannot be constructed.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| AppError::Llm(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Summarize an ordered conversation into a `{title, description}` pair.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Llm` if the call fails or the reply violates the
    /// JSON contract.
    pub async fn summarize(&self, messages: &[ChannelMessage]) -> Result<Summary> {
        if messages.is_empty() {
            return Err(AppError::Llm("no conversation to summarize".into()));
        }

        let transcript = messages
            .iter()
            .map(|m| format!("[{}] {}: {}", m.ts, m.user_id, m.text))
            .collect::<Vec<_>>()
            .join("\n");

        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": transcript },
            ],
            "temperature": 0.2,
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| AppError::Llm(format!("completions request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Llm(format!(
                "completions failed with http status {status}"
            )));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|err| AppError::Llm(format!("failed to decode completion: {err}")))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        parse_summary(&content)
    }
}

/// Parse the strict `{title, description}` reply contract.
///
/// # Errors
///
/// Returns `AppError::Llm` for empty, non-JSON, or blank-title replies.
pub fn parse_summary(content: &str) -> Result<Summary> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::Llm("summarizer returned an empty reply".into()));
    }

    let summary: Summary = serde_json::from_str(trimmed)
        .map_err(|err| AppError::Llm(format!("summarizer reply is not valid JSON: {err}")))?;

    if summary.title.trim().is_empty() {
        return Err(AppError::Llm("summarizer returned an empty title".into()));
    }
    Ok(summary)
}
