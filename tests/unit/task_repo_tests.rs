//! Unit tests for `TaskRepo` CRUD and patch semantics.

use std::sync::Arc;

use incident_relay::models::task::{Task, TaskPatch, TaskStatus};
use incident_relay::persistence::{db, task_repo::TaskRepo};
use incident_relay::AppError;

#[tokio::test]
async fn create_then_get_round_trips() {
    let db = db::connect_memory().await.expect("db");
    let repo = TaskRepo::new(Arc::new(db));

    let task = Task::new(1, "rotate pager", "U1", Some("C1".into()), Some("1.0".into()));
    repo.create(&task).await.expect("create");

    let loaded = repo.get(&task.id).await.expect("get");
    assert_eq!(loaded.title, "rotate pager");
    assert_eq!(loaded.incident_number, 1);
    assert_eq!(loaded.status, TaskStatus::Incompleted);
    assert_eq!(loaded.channel_id.as_deref(), Some("C1"));
    assert!(loaded.completed_at.is_none());
}

#[tokio::test]
async fn get_missing_task_is_not_found() {
    let db = db::connect_memory().await.expect("db");
    let repo = TaskRepo::new(Arc::new(db));

    let result = repo.get("nope").await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn patch_updates_only_supplied_fields() {
    let db = db::connect_memory().await.expect("db");
    let repo = TaskRepo::new(Arc::new(db));

    let task = Task::new(1, "original", "U1", None, None);
    repo.create(&task).await.expect("create");

    let patched = repo
        .update(
            &task.id,
            &TaskPatch {
                title: Some("renamed".into()),
                ..TaskPatch::default()
            },
        )
        .await
        .expect("update");

    assert_eq!(patched.title, "renamed");
    assert_eq!(patched.status, TaskStatus::Incompleted);
    assert_eq!(patched.created_by, "U1");
    assert!(patched.assignee.is_none());
}

#[tokio::test]
async fn completing_stamps_completed_at() {
    let db = db::connect_memory().await.expect("db");
    let repo = TaskRepo::new(Arc::new(db));

    let task = Task::new(1, "verify fix", "U1", None, None);
    repo.create(&task).await.expect("create");

    let completed = repo
        .update(
            &task.id,
            &TaskPatch {
                status: Some(TaskStatus::Completed),
                ..TaskPatch::default()
            },
        )
        .await
        .expect("complete");
    assert_eq!(completed.status, TaskStatus::Completed);
    assert!(completed.completed_at.is_some());

    let reopened = repo
        .update(
            &task.id,
            &TaskPatch {
                status: Some(TaskStatus::Incompleted),
                ..TaskPatch::default()
            },
        )
        .await
        .expect("reopen");
    assert_eq!(reopened.status, TaskStatus::Incompleted);
    assert!(reopened.completed_at.is_none());
}

#[tokio::test]
async fn restating_same_status_keeps_completed_at() {
    let db = db::connect_memory().await.expect("db");
    let repo = TaskRepo::new(Arc::new(db));

    let task = Task::new(1, "verify fix", "U1", None, None);
    repo.create(&task).await.expect("create");

    let first = repo
        .update(
            &task.id,
            &TaskPatch {
                status: Some(TaskStatus::Completed),
                ..TaskPatch::default()
            },
        )
        .await
        .expect("complete");
    let again = repo
        .update(
            &task.id,
            &TaskPatch {
                status: Some(TaskStatus::Completed),
                ..TaskPatch::default()
            },
        )
        .await
        .expect("restate");

    assert_eq!(first.completed_at, again.completed_at);
}

#[tokio::test]
async fn patch_on_missing_task_is_not_found() {
    let db = db::connect_memory().await.expect("db");
    let repo = TaskRepo::new(Arc::new(db));

    let result = repo.update("nope", &TaskPatch::default()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn list_is_oldest_first_and_scoped() {
    let db = db::connect_memory().await.expect("db");
    let repo = TaskRepo::new(Arc::new(db));

    let first = Task::new(1, "first", "U1", None, None);
    let mut second = Task::new(1, "second", "U1", None, None);
    // Force a strictly later creation time so ordering is deterministic.
    second.created_at = first.created_at + chrono::Duration::milliseconds(10);
    let other = Task::new(2, "elsewhere", "U1", None, None);
    repo.create(&first).await.expect("create first");
    repo.create(&second).await.expect("create second");
    repo.create(&other).await.expect("create other");

    let titles: Vec<String> = repo
        .list_by_incident(1)
        .await
        .expect("list")
        .into_iter()
        .map(|task| task.title)
        .collect();
    assert_eq!(titles, vec!["first", "second"]);

    assert!(repo.list_by_incident(9).await.expect("list").is_empty());
}
