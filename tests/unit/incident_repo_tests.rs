//! Unit tests for `IncidentRepo` persistence.

use std::sync::Arc;

use incident_relay::models::incident::{Incident, IncidentStatus};
use incident_relay::persistence::{db, incident_repo::IncidentRepo};
use incident_relay::AppError;

fn sample_incident(number: i64) -> Incident {
    Incident {
        number,
        title: "Database outage".into(),
        description: "Primary is unreachable".into(),
        category: "platform".into(),
        severity: "sev2".into(),
        origin_channel_id: "C_ORIGIN".into(),
        origin_channel_name: "ops".into(),
        incident_channel_id: None,
        incident_channel_name: None,
        created_by: "U_CREATOR".into(),
        private: false,
        members: vec!["U_CREATOR".into()],
        status: IncidentStatus::Triage,
        created_at: chrono::Utc::now(),
        lead: None,
    }
}

#[tokio::test]
async fn next_incident_number_is_monotonic_from_one() {
    let db = db::connect_memory().await.expect("db");
    let repo = IncidentRepo::new(Arc::new(db));

    assert_eq!(repo.next_incident_number().await.expect("first"), 1);
    assert_eq!(repo.next_incident_number().await.expect("second"), 2);
    assert_eq!(repo.next_incident_number().await.expect("third"), 3);
}

#[tokio::test]
async fn put_then_get_round_trips_all_fields() {
    let db = db::connect_memory().await.expect("db");
    let repo = IncidentRepo::new(Arc::new(db));

    let incident = sample_incident(1);
    repo.put(&incident).await.expect("put");
    let loaded = repo.get(1).await.expect("get");

    assert_eq!(loaded.title, incident.title);
    assert_eq!(loaded.members, incident.members);
    assert_eq!(loaded.status, IncidentStatus::Triage);
    assert_eq!(loaded.created_by, "U_CREATOR");
    assert!(loaded.incident_channel_id.is_none());
    assert!(loaded.lead.is_none());
}

#[tokio::test]
async fn get_missing_incident_is_not_found() {
    let db = db::connect_memory().await.expect("db");
    let repo = IncidentRepo::new(Arc::new(db));

    let result = repo.get(42).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn update_status_persists_new_value() {
    let db = db::connect_memory().await.expect("db");
    let repo = IncidentRepo::new(Arc::new(db));

    repo.put(&sample_incident(1)).await.expect("put");
    repo.update_status(1, IncidentStatus::Monitoring)
        .await
        .expect("update");

    let loaded = repo.get(1).await.expect("get");
    assert_eq!(loaded.status, IncidentStatus::Monitoring);
}

#[tokio::test]
async fn update_status_on_missing_incident_is_not_found() {
    let db = db::connect_memory().await.expect("db");
    let repo = IncidentRepo::new(Arc::new(db));

    let result = repo.update_status(42, IncidentStatus::Closed).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn dedicated_channel_wins_channel_binding() {
    let db = db::connect_memory().await.expect("db");
    let repo = IncidentRepo::new(Arc::new(db));

    // Incident 1 lives in C_SHARED as its origin; incident 2 got a
    // dedicated channel with the same id (contrived but unambiguous).
    repo.put(&sample_incident(1)).await.expect("put 1");
    let mut second = sample_incident(2);
    second.origin_channel_id = "C_ELSEWHERE".into();
    repo.put(&second).await.expect("put 2");
    repo.set_incident_channel(2, "C_ORIGIN", "inc-2-database-outage")
        .await
        .expect("bind");

    let bound = repo.get_by_channel_id("C_ORIGIN").await.expect("resolve");
    assert_eq!(bound.number, 2);
}

#[tokio::test]
async fn closed_incident_does_not_bind_its_origin_channel() {
    let db = db::connect_memory().await.expect("db");
    let repo = IncidentRepo::new(Arc::new(db));

    let mut incident = sample_incident(1);
    incident.status = IncidentStatus::Closed;
    repo.put(&incident).await.expect("put");

    let result = repo.get_by_channel_id("C_ORIGIN").await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn origin_channel_resolves_newest_open_incident() {
    let db = db::connect_memory().await.expect("db");
    let repo = IncidentRepo::new(Arc::new(db));

    repo.put(&sample_incident(1)).await.expect("put 1");
    repo.put(&sample_incident(2)).await.expect("put 2");

    let bound = repo.get_by_channel_id("C_ORIGIN").await.expect("resolve");
    assert_eq!(bound.number, 2);
}

#[tokio::test]
async fn list_returns_newest_first() {
    let db = db::connect_memory().await.expect("db");
    let repo = IncidentRepo::new(Arc::new(db));

    repo.put(&sample_incident(1)).await.expect("put 1");
    repo.put(&sample_incident(2)).await.expect("put 2");
    repo.put(&sample_incident(3)).await.expect("put 3");

    let numbers: Vec<i64> = repo
        .list()
        .await
        .expect("list")
        .iter()
        .map(|incident| incident.number)
        .collect();
    assert_eq!(numbers, vec![3, 2, 1]);
}

#[tokio::test]
async fn set_incident_channel_records_both_fields() {
    let db = db::connect_memory().await.expect("db");
    let repo = IncidentRepo::new(Arc::new(db));

    repo.put(&sample_incident(1)).await.expect("put");
    repo.set_incident_channel(1, "C_INC", "inc-1-database-outage")
        .await
        .expect("bind");

    let loaded = repo.get(1).await.expect("get");
    assert_eq!(loaded.incident_channel_id.as_deref(), Some("C_INC"));
    assert_eq!(
        loaded.incident_channel_name.as_deref(),
        Some("inc-1-database-outage")
    );
}
