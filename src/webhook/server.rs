//! Webhook ingress: router, signature gate, and acknowledge-then-dispatch.
//!
//! Handlers do the minimum inline — verify, parse, route — and return 200
//! before any domain processing runs. The real work is handed to
//! [`dispatch`](crate::dispatch::dispatch) on a detached task.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::classifier::{self, PromptValue};
use crate::context::{ExecutionContext, Identity};
use crate::dispatch::dispatch;
use crate::lifecycle::{CreateIncident, IncidentService};
use crate::slack::blocks;
use crate::state::AppState;
use crate::webhook::envelope::{EventEnvelope, InteractionPayload};
use crate::webhook::signature;
use crate::Result;

/// Build the HTTP router for the webhook surface.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/slack/events", post(events_route))
        .route("/slack/interactions", post(interactions_route))
        .route("/health", get(health_route))
        .with_state(state)
}

async fn health_route() -> &'static str {
    "ok"
}

async fn events_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let (status, response, _work) = handle_events(
        &state,
        header(&headers, signature::TIMESTAMP_HEADER),
        header(&headers, signature::SIGNATURE_HEADER),
        &body,
    );
    (status, response)
}

async fn interactions_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let (status, response, _work) = handle_interactions(
        &state,
        header(&headers, signature::TIMESTAMP_HEADER),
        header(&headers, signature::SIGNATURE_HEADER),
        &body,
    );
    (status, response)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Handle an events-API request.
///
/// Order matters: the URL verification handshake is answered before any
/// signature check, unconfigured Slack answers 503, a bad signature answers
/// 401 with no work dispatched. Valid message events are acknowledged with
/// 200 immediately; classification runs on the returned detached task.
pub fn handle_events(
    state: &Arc<AppState>,
    timestamp: Option<&str>,
    sig: Option<&str>,
    body: &str,
) -> (StatusCode, String, Option<JoinHandle<()>>) {
    if let Ok(envelope) = EventEnvelope::from_json(body) {
        if envelope.is_challenge() {
            let challenge = envelope.challenge.unwrap_or_default();
            return (StatusCode::OK, challenge, None);
        }
    }

    if !state.config.slack.is_configured() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "slack is not configured".into(),
            None,
        );
    }
    if let Err(err) = signature::verify(
        &state.config.slack.signing_secret,
        timestamp,
        sig,
        body.as_bytes(),
    ) {
        warn!(%err, "rejected events request");
        return (StatusCode::UNAUTHORIZED, "invalid signature".into(), None);
    }

    let envelope = match EventEnvelope::from_json(body) {
        Ok(envelope) => envelope,
        Err(err) => return (StatusCode::BAD_REQUEST, err.to_string(), None),
    };
    if envelope.kind != "event_callback" {
        return (StatusCode::OK, "ignored".into(), None);
    }
    let Some(event) = envelope.event.and_then(super::envelope::RawMessageEvent::normalize) else {
        return (StatusCode::OK, "ignored".into(), None);
    };

    let identity = event
        .user_id
        .clone()
        .map_or(Identity::Anonymous, Identity::User);
    let ctx = ExecutionContext::for_request(identity);
    let work = dispatch(
        &ctx,
        "message_event",
        classifier::handle_message_event(Arc::clone(state), ctx.detached(), event),
    );
    (StatusCode::OK, "ok".into(), Some(work))
}

/// Handle a block-actions interaction request.
///
/// Same gate order as events, minus the handshake: 503 unconfigured, 401
/// bad signature, then acknowledge and dispatch the button's effect.
pub fn handle_interactions(
    state: &Arc<AppState>,
    timestamp: Option<&str>,
    sig: Option<&str>,
    body: &str,
) -> (StatusCode, String, Option<JoinHandle<()>>) {
    if !state.config.slack.is_configured() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "slack is not configured".into(),
            None,
        );
    }
    if let Err(err) = signature::verify(
        &state.config.slack.signing_secret,
        timestamp,
        sig,
        body.as_bytes(),
    ) {
        warn!(%err, "rejected interactions request");
        return (StatusCode::UNAUTHORIZED, "invalid signature".into(), None);
    }

    let payload = match InteractionPayload::from_form(body) {
        Ok(payload) => payload,
        Err(err) => return (StatusCode::BAD_REQUEST, err.to_string(), None),
    };
    if payload.kind != "block_actions" {
        return (StatusCode::OK, "ignored".into(), None);
    }

    let ctx = ExecutionContext::for_request(Identity::User(payload.user.id.clone()));
    match payload.action_id() {
        "incident_open" => {
            let Some(value) = payload.action_value() else {
                return (StatusCode::OK, "ignored".into(), None);
            };
            let prompt: PromptValue = match serde_json::from_str(value) {
                Ok(prompt) => prompt,
                Err(err) => {
                    return (
                        StatusCode::BAD_REQUEST,
                        format!("malformed action value: {err}"),
                        None,
                    );
                }
            };
            let work = dispatch(
                &ctx,
                "incident_open",
                open_from_prompt(Arc::clone(state), payload, prompt),
            );
            (StatusCode::OK, String::new(), Some(work))
        }
        "incident_dismiss" => {
            let work = dispatch(
                &ctx,
                "incident_dismiss",
                dismiss_prompt(Arc::clone(state), payload),
            );
            (StatusCode::OK, String::new(), Some(work))
        }
        other => {
            warn!(action_id = other, "unhandled interaction action");
            (StatusCode::OK, "ignored".into(), None)
        }
    }
}

/// Complete incident creation from an accepted creation prompt.
///
/// The prompt message is rewritten first so the buttons cannot be pressed
/// twice, then the incident is created and the message updated again with
/// the outcome.
async fn open_from_prompt(
    state: Arc<AppState>,
    payload: InteractionPayload,
    prompt: PromptValue,
) -> Result<()> {
    let prompt_message = payload
        .channel
        .as_ref()
        .zip(payload.message.as_ref())
        .map(|(channel, message)| (channel.id.clone(), message.ts.clone()));

    if let (Some(slack), Some((channel, ts))) = (&state.slack, &prompt_message) {
        if let Err(err) = slack
            .update_message(
                channel,
                ts,
                "Opening incident\u{2026}",
                Some(serde_json::Value::Array(vec![blocks::text_section(
                    "Opening incident\u{2026}",
                )])),
            )
            .await
        {
            warn!(%err, "failed to disarm creation prompt");
        }
    }

    let service = IncidentService::new(Arc::clone(&state));
    let incident = service
        .create(CreateIncident {
            title: prompt.title,
            description: prompt.description,
            category: prompt.category,
            severity: prompt.severity,
            origin_channel_id: prompt.origin_channel_id,
            origin_channel_name: prompt.origin_channel_name,
            created_by: payload.user.id.clone(),
            private: false,
            triage: state.config.initial_triage,
        })
        .await?;

    if let (Some(slack), Some((channel, ts))) = (&state.slack, &prompt_message) {
        let confirmation = match incident.incident_channel_id {
            Some(ref incident_channel) => format!(
                "\u{2705} Incident #{} opened \u{2014} <#{}>",
                incident.number, incident_channel
            ),
            None => format!("\u{2705} Incident #{} opened", incident.number),
        };
        if let Err(err) = slack
            .update_message(
                channel,
                ts,
                &confirmation,
                Some(serde_json::Value::Array(vec![blocks::text_section(
                    &confirmation,
                )])),
            )
            .await
        {
            warn!(%err, "failed to confirm incident creation");
        }
    }

    Ok(())
}

/// Rewrite a dismissed creation prompt so it stops offering buttons.
async fn dismiss_prompt(state: Arc<AppState>, payload: InteractionPayload) -> Result<()> {
    let Some(ref slack) = state.slack else {
        return Ok(());
    };
    let (Some(channel), Some(message)) = (payload.channel, payload.message) else {
        return Ok(());
    };

    let text = format!("Dismissed by <@{}>.", payload.user.id);
    slack
        .update_message(
            &channel.id,
            &message.ts,
            &text,
            Some(serde_json::Value::Array(vec![blocks::text_section(&text)])),
        )
        .await
}
