//! Integration tests for the task sub-engine.

use std::sync::Arc;

use incident_relay::config::GlobalConfig;
use incident_relay::context::Identity;
use incident_relay::models::incident::{Incident, IncidentStatus};
use incident_relay::models::task::{TaskPatch, TaskStatus};
use incident_relay::persistence::{db, incident_repo::IncidentRepo};
use incident_relay::state::AppState;
use incident_relay::tasks::TaskService;
use incident_relay::AppError;

async fn test_state() -> Arc<AppState> {
    let config = GlobalConfig::from_toml_str(r#"db_path = "unused.db""#).expect("config");
    let db = db::connect_memory().await.expect("db");
    Arc::new(AppState {
        config: Arc::new(config),
        db: Arc::new(db),
        slack: None,
        summarizer: None,
    })
}

async fn seed_incident(state: &Arc<AppState>, number: i64, private: bool) {
    let incident = Incident {
        number,
        title: "Database outage".into(),
        description: "primary unreachable".into(),
        category: "platform".into(),
        severity: "sev2".into(),
        origin_channel_id: "C_ORIGIN".into(),
        origin_channel_name: "ops".into(),
        incident_channel_id: None,
        incident_channel_name: None,
        created_by: "U_CREATOR".into(),
        private,
        members: vec!["U_CREATOR".into(), "U_MEMBER".into()],
        status: IncidentStatus::Handling,
        created_at: chrono::Utc::now(),
        lead: None,
    };
    IncidentRepo::new(Arc::clone(&state.db))
        .put(&incident)
        .await
        .expect("seed incident");
}

#[tokio::test]
async fn create_task_requires_existing_incident() {
    let state = test_state().await;
    let service = TaskService::new(Arc::clone(&state));

    let result = service.create_task(7, "verify fix", "U1", None, None).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn create_task_rejects_bad_input() {
    let state = test_state().await;
    seed_incident(&state, 1, false).await;
    let service = TaskService::new(Arc::clone(&state));

    let empty = service.create_task(1, "   ", "U1", None, None).await;
    assert!(matches!(empty, Err(AppError::Validation(_))));

    let negative = service.create_task(-3, "verify fix", "U1", None, None).await;
    assert!(matches!(negative, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn create_task_trims_title_and_starts_incomplete() {
    let state = test_state().await;
    seed_incident(&state, 1, false).await;
    let service = TaskService::new(Arc::clone(&state));

    let task = service
        .create_task(1, "  verify fix  ", "U1", Some("C1".into()), Some("1.0".into()))
        .await
        .expect("create");

    assert_eq!(task.title, "verify fix");
    assert_eq!(task.status, TaskStatus::Incompleted);
    assert_eq!(task.incident_number, 1);
}

#[tokio::test]
async fn complete_and_reopen_round_trip() {
    let state = test_state().await;
    seed_incident(&state, 1, false).await;
    let service = TaskService::new(Arc::clone(&state));

    let task = service
        .create_task(1, "verify fix", "U1", None, None)
        .await
        .expect("create");

    let completed = service.complete_task(&task.id).await.expect("complete");
    assert_eq!(completed.status, TaskStatus::Completed);
    assert!(completed.completed_at.is_some());

    let reopened = service.uncomplete_task(&task.id).await.expect("reopen");
    assert_eq!(reopened.status, TaskStatus::Incompleted);
    assert!(reopened.completed_at.is_none());
}

#[tokio::test]
async fn sparse_patch_leaves_other_fields_alone() {
    let state = test_state().await;
    seed_incident(&state, 1, false).await;
    let service = TaskService::new(Arc::clone(&state));

    let task = service
        .create_task(1, "verify fix", "U1", None, None)
        .await
        .expect("create");
    let patched = service
        .update_task(
            &task.id,
            &TaskPatch {
                assignee: Some("U_ONCALL".into()),
                ..TaskPatch::default()
            },
        )
        .await
        .expect("patch");

    assert_eq!(patched.title, "verify fix");
    assert_eq!(patched.assignee.as_deref(), Some("U_ONCALL"));
    assert_eq!(patched.status, TaskStatus::Incompleted);
}

#[tokio::test]
async fn patch_with_empty_title_is_rejected() {
    let state = test_state().await;
    seed_incident(&state, 1, false).await;
    let service = TaskService::new(Arc::clone(&state));

    let task = service
        .create_task(1, "verify fix", "U1", None, None)
        .await
        .expect("create");
    let result = service
        .update_task(
            &task.id,
            &TaskPatch {
                title: Some("  ".into()),
                ..TaskPatch::default()
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn list_is_oldest_first_and_empty_when_none() {
    let state = test_state().await;
    seed_incident(&state, 1, false).await;
    let service = TaskService::new(Arc::clone(&state));

    assert!(service.list_tasks(1).await.expect("list").is_empty());

    service
        .create_task(1, "first", "U1", None, None)
        .await
        .expect("create first");
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    service
        .create_task(1, "second", "U1", None, None)
        .await
        .expect("create second");

    let titles: Vec<String> = service
        .list_tasks(1)
        .await
        .expect("list")
        .into_iter()
        .map(|task| task.title)
        .collect();
    assert_eq!(titles, vec!["first", "second"]);
}

#[tokio::test]
async fn private_incident_tasks_are_hidden_from_non_members() {
    let state = test_state().await;
    seed_incident(&state, 1, true).await;
    let service = TaskService::new(Arc::clone(&state));

    let task = service
        .create_task(1, "rotate credentials", "U_CREATOR", None, None)
        .await
        .expect("create");

    // Listing yields an empty list for outsiders, not an error.
    let hidden = service
        .list_tasks_for_viewer(1, &Identity::User("U_STRANGER".into()))
        .await
        .expect("list");
    assert!(hidden.is_empty());

    // Members see the real list.
    let visible = service
        .list_tasks_for_viewer(1, &Identity::User("U_MEMBER".into()))
        .await
        .expect("list");
    assert_eq!(visible.len(), 1);

    // Anonymous callers carry no auth context and are not filtered.
    let unfiltered = service
        .list_tasks_for_viewer(1, &Identity::Anonymous)
        .await
        .expect("list");
    assert_eq!(unfiltered.len(), 1);

    // Direct lookup by a non-member is an access error, not a redaction.
    let denied = service
        .get_task_for_viewer(&task.id, &Identity::User("U_STRANGER".into()))
        .await;
    assert!(matches!(denied, Err(AppError::Unauthorized(_))));

    let allowed = service
        .get_task_for_viewer(&task.id, &Identity::User("U_MEMBER".into()))
        .await;
    assert!(allowed.is_ok());
}

#[tokio::test]
async fn listing_tasks_of_missing_incident_is_not_found() {
    let state = test_state().await;
    let service = TaskService::new(Arc::clone(&state));

    let result = service
        .list_tasks_for_viewer(9, &Identity::Anonymous)
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}
