//! Block Kit message builders.
//!
//! Helpers for constructing the JSON block payloads sent with
//! `chat.postMessage` / `chat.update`.

use serde_json::{json, Value};

use crate::models::incident::Incident;
use crate::models::task::{Task, TaskStatus};

/// Build a markdown section block.
#[must_use]
pub fn text_section(message: &str) -> Value {
    json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": message },
    })
}

/// Build a plain-text header block.
#[must_use]
pub fn header(message: &str) -> Value {
    json!({
        "type": "header",
        "text": { "type": "plain_text", "text": message, "emoji": true },
    })
}

/// Build an actions block with the given `(action_id, label, value)` buttons.
#[must_use]
pub fn action_buttons(block_id: &str, buttons: &[(&str, &str, &str)]) -> Value {
    let elements: Vec<Value> = buttons
        .iter()
        .map(|(action_id, text, value)| {
            json!({
                "type": "button",
                "action_id": action_id,
                "text": { "type": "plain_text", "text": text, "emoji": true },
                "value": value,
            })
        })
        .collect();
    json!({
        "type": "actions",
        "block_id": block_id,
        "elements": elements,
    })
}

/// Build the creation-prompt blocks posted after trigger classification.
///
/// The action value carries the classified fields so the interaction
/// handler can complete creation without re-deriving them.
#[must_use]
pub fn creation_prompt(title: &str, description: &str, category: &str, value: &str) -> Vec<Value> {
    vec![
        text_section(&format!(
            "\u{1f6a8} This looks like an incident.\n*{title}*\n{description}\n_category: {category}_"
        )),
        action_buttons(
            "incident_prompt",
            &[
                ("incident_open", "Open incident", value),
                ("incident_dismiss", "Dismiss", value),
            ],
        ),
    ]
}

/// Build the summary blocks posted to a freshly created incident channel.
#[must_use]
pub fn incident_opened(incident: &Incident) -> Vec<Value> {
    vec![
        header(&format!("#{} {}", incident.number, incident.title)),
        text_section(&format!(
            "*Status:* {}\n*Category:* {}\n*Severity:* {}\n*Opened by:* <@{}>",
            incident.status.as_str(),
            incident.category,
            incident.severity,
            incident.created_by,
        )),
    ]
}

/// Render a task list as a single markdown string.
#[must_use]
pub fn render_task_list(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks yet. Add one with `@bot task <title>`.".to_owned();
    }
    let mut out = String::from("*Tasks:*\n");
    for (index, task) in tasks.iter().enumerate() {
        let mark = match task.status {
            TaskStatus::Completed => "\u{2705}",
            TaskStatus::Incompleted => "\u{2b1c}",
        };
        out.push_str(&format!("{} {}. {}\n", mark, index + 1, task.title));
    }
    out
}
