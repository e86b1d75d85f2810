//! Event classifier and command router.
//!
//! Interprets a normalized message event: bot/thread/empty filtering,
//! task-command detection, and incident-trigger detection. The fast local
//! trigger check and the slow (summarizer-assisted) classification are
//! separate functions composed here, never inlined together.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{info, warn};

use crate::context::ExecutionContext;
use crate::llm::Summary;
use crate::models::event::InboundEvent;
use crate::models::message::ChannelMessage;
use crate::models::task::Task;
use crate::persistence::incident_repo::IncidentRepo;
use crate::persistence::message_repo::MessageRepo;
use crate::slack::blocks;
use crate::state::AppState;
use crate::tasks::TaskService;
use crate::{AppError, Result};

/// How many recent channel messages feed the summarizer.
const CONTEXT_WINDOW: u32 = 20;

/// Maximum length of a fallback title derived from the message text.
const FALLBACK_TITLE_CHARS: usize = 80;

/// A parsed `@bot task` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCommand {
    /// The mentioned user ID (should be the bot).
    pub mentioned: String,
    /// Task title; `None` means "list tasks".
    pub title: Option<String>,
}

/// Fields carried from classification into the creation-prompt step.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct PromptValue {
    /// Classified incident title.
    pub title: String,
    /// Classified incident description.
    pub description: String,
    /// Category assigned to the incident.
    pub category: String,
    /// Severity assigned to the incident.
    pub severity: String,
    /// Channel the trigger message was posted in.
    pub origin_channel_id: String,
    /// Name of the origin channel.
    pub origin_channel_name: String,
}

fn task_command_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::expect_used)] // Pattern is a compile-time constant.
        Regex::new(r"^\s*<@([A-Z0-9]+)>\s+(?:t|task)(?:\s+(.+))?\s*$")
            .expect("task command pattern is valid")
    })
}

fn trigger_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::expect_used)] // Pattern is a compile-time constant.
        Regex::new(r"(?i)\b(incident|outage|sev[0-9]|down|degraded|unreachable|data loss|on fire)\b")
            .expect("trigger pattern is valid")
    })
}

/// Parse an `@bot {t|task} [title]` command from message text.
///
/// Returns `None` when the text is not a task command or the mention does
/// not match the configured bot user (an unconfigured bot user accepts any
/// mention).
#[must_use]
pub fn parse_task_command(bot_user_id: &str, text: &str) -> Option<TaskCommand> {
    let captures = task_command_regex().captures(text)?;
    let mentioned = captures.get(1)?.as_str().to_owned();
    if !bot_user_id.is_empty() && mentioned != bot_user_id {
        return None;
    }
    let title = captures
        .get(2)
        .map(|m| parse_task_title(m.as_str()))
        .filter(|title| !title.is_empty());
    Some(TaskCommand { mentioned, title })
}

/// Normalize a task title: trim whitespace, then strip a single layer of
/// matching quote characters and trim again.
#[must_use]
pub fn parse_task_title(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = strip_matching_quotes(trimmed);
    unquoted.trim().to_owned()
}

fn strip_matching_quotes(value: &str) -> &str {
    for quote in ['"', '\'', '`'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Fast local check: is this plausibly an incident-opening message?
///
/// Cheap keyword heuristic; positives escalate to the slow classification
/// path, negatives are dropped without further work.
#[must_use]
pub fn is_incident_trigger(text: &str) -> bool {
    trigger_regex().is_match(text)
}

/// Derive a summary from the trigger message alone.
///
/// Used when no summarizer is configured or the summarizer fails; the
/// first line becomes the title, the full text the description.
#[must_use]
pub fn fallback_summary(text: &str) -> Summary {
    let first_line = text.lines().next().unwrap_or("").trim();
    let title: String = first_line.chars().take(FALLBACK_TITLE_CHARS).collect();
    Summary {
        title,
        description: text.trim().to_owned(),
    }
}

/// Process one normalized message event end to end.
///
/// Runs inside dispatched work: upstream failures are surfaced as errors
/// for the dispatcher to log, user-facing compensations are best-effort.
///
/// # Errors
///
/// Returns an error when persistence fails; chat-platform failures during
/// replies are logged and swallowed.
pub async fn handle_message_event(
    state: Arc<AppState>,
    ctx: ExecutionContext,
    event: InboundEvent,
) -> Result<()> {
    // Loop prevention and noise filtering, each step short-circuiting.
    if event.is_from_bot() {
        return Ok(());
    }
    if event.text.trim().is_empty() {
        return Ok(());
    }
    if event.is_thread_reply() {
        return Ok(());
    }

    // Persist the raw message unconditionally for later summarization.
    let message = ChannelMessage::new(
        event.channel_id.clone(),
        event.user_id.clone().unwrap_or_default(),
        event.text.clone(),
        event.ts.clone(),
        event.thread_ts.clone(),
    );
    MessageRepo::new(Arc::clone(&state.db)).save(&message).await?;

    if let Some(command) = parse_task_command(&state.config.slack.bot_user_id, &event.text) {
        return handle_task_command(&state, &ctx, &event, command).await;
    }

    if is_incident_trigger(&event.text) {
        return handle_trigger(&state, &ctx, &event).await;
    }

    Ok(())
}

/// Route a task command: list without a title, create with one.
async fn handle_task_command(
    state: &Arc<AppState>,
    ctx: &ExecutionContext,
    event: &InboundEvent,
    command: TaskCommand,
) -> Result<()> {
    let incidents = IncidentRepo::new(Arc::clone(&state.db));
    let incident = match incidents.get_by_channel_id(&event.channel_id).await {
        Ok(incident) => incident,
        Err(AppError::NotFound(_)) => {
            // A channel with no bound incident gets a user-facing error,
            // not a silent failure.
            post_reply(
                state,
                &event.channel_id,
                "No incident is bound to this channel, so tasks cannot be managed here.",
            )
            .await;
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    let tasks = TaskService::new(Arc::clone(state));
    match command.title {
        Some(title) => {
            let task = tasks
                .create_task(
                    incident.number,
                    &title,
                    event.user_id.as_deref().unwrap_or_default(),
                    Some(event.channel_id.clone()),
                    Some(event.ts.clone()),
                )
                .await?;
            info!(
                incident = incident.number,
                task_id = %task.id,
                request_id = %ctx.request_id,
                "task created from chat command"
            );
            post_reply(
                state,
                &event.channel_id,
                &format!("Added task: *{}*", task.title),
            )
            .await;
        }
        None => {
            let list: Vec<Task> = tasks.list_tasks(incident.number).await?;
            post_reply(state, &event.channel_id, &blocks::render_task_list(&list)).await;
        }
    }
    Ok(())
}

/// Slow classification path for a trigger-positive message.
///
/// Posts the "thinking" acknowledgement first, then classifies, then
/// posts the creation prompt. All three are sequential steps of the same
/// dispatched unit, never split across dispatches.
async fn handle_trigger(
    state: &Arc<AppState>,
    ctx: &ExecutionContext,
    event: &InboundEvent,
) -> Result<()> {
    post_reply(
        state,
        &event.channel_id,
        "\u{1f440} This might be an incident — let me gather some context\u{2026}",
    )
    .await;

    let summary = classify_trigger(state, event).await;
    let origin_channel_name = resolve_channel_name(state, &event.channel_id).await;

    let value = PromptValue {
        title: summary.title.clone(),
        description: summary.description.clone(),
        category: state.config.default_category.clone(),
        severity: state.config.default_severity.clone(),
        origin_channel_id: event.channel_id.clone(),
        origin_channel_name,
    };
    let encoded = serde_json::to_string(&value)
        .map_err(|err| AppError::Validation(format!("failed to encode prompt value: {err}")))?;

    info!(
        channel = %event.channel_id,
        request_id = %ctx.request_id,
        title = %value.title,
        "posting incident creation prompt"
    );

    let prompt = blocks::creation_prompt(
        &value.title,
        &value.description,
        &value.category,
        &encoded,
    );
    if let Some(ref slack) = state.slack {
        if let Err(err) = slack
            .post_message(
                &event.channel_id,
                "This looks like an incident.",
                Some(serde_json::Value::Array(prompt)),
                None,
            )
            .await
        {
            warn!(channel = %event.channel_id, %err, "failed to post creation prompt");
        }
    }
    Ok(())
}

/// Summarizer-assisted classification with a pattern fallback.
async fn classify_trigger(state: &Arc<AppState>, event: &InboundEvent) -> Summary {
    let Some(ref summarizer) = state.summarizer else {
        return fallback_summary(&event.text);
    };

    let messages = MessageRepo::new(Arc::clone(&state.db))
        .list_recent(&event.channel_id, CONTEXT_WINDOW)
        .await
        .unwrap_or_default();

    match summarizer.summarize(&messages).await {
        Ok(summary) => summary,
        Err(err) => {
            warn!(channel = %event.channel_id, %err, "summarizer failed; using fallback");
            fallback_summary(&event.text)
        }
    }
}

async fn resolve_channel_name(state: &Arc<AppState>, channel_id: &str) -> String {
    if let Some(ref slack) = state.slack {
        if let Ok(info) = slack.channel_info(channel_id).await {
            if !info.name.is_empty() {
                return info.name;
            }
        }
    }
    channel_id.to_owned()
}

/// Best-effort channel reply; failures are logged, never propagated.
async fn post_reply(state: &Arc<AppState>, channel_id: &str, text: &str) {
    let Some(ref slack) = state.slack else { return };
    if let Err(err) = slack.post_message(channel_id, text, None, None).await {
        warn!(channel = %channel_id, %err, "failed to post reply");
    }
}
