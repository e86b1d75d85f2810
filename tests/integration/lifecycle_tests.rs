//! Integration tests for the incident lifecycle engine.
//!
//! Exercises creation, the status state machine, and the append-only
//! history against an in-memory database with no chat platform attached.

use std::sync::Arc;

use incident_relay::config::GlobalConfig;
use incident_relay::context::Identity;
use incident_relay::lifecycle::{CreateIncident, IncidentService};
use incident_relay::models::incident::IncidentStatus;
use incident_relay::persistence::db;
use incident_relay::state::AppState;
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

fn create_request(title: &str, triage: bool) -> CreateIncident {
    CreateIncident {
        title: title.into(),
        description: "primary unreachable".into(),
        category: "platform".into(),
        severity: "sev2".into(),
        origin_channel_id: "C_ORIGIN".into(),
        origin_channel_name: "ops".into(),
        created_by: "U_CREATOR".into(),
        private: false,
        triage,
    }
}

#[tokio::test]
async fn triage_creation_seeds_exactly_one_history_row() {
    let state = test_state().await;
    let service = IncidentService::new(Arc::clone(&state));

    let incident = service
        .create(create_request("Database outage", true))
        .await
        .expect("create");

    assert_eq!(incident.number, 1);
    assert_eq!(incident.status, IncidentStatus::Triage);
    assert_eq!(incident.members, vec!["U_CREATOR".to_owned()]);
    // No chat platform, so no channel was orchestrated.
    assert!(incident.incident_channel_id.is_none());

    let history = service.status_history(1).await.expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, IncidentStatus::Triage);
    assert_eq!(history[0].actor, "U_CREATOR");
    assert_eq!(history[0].note, "incident opened");
}

#[tokio::test]
async fn non_triage_creation_starts_handling() {
    let state = test_state().await;
    let service = IncidentService::new(Arc::clone(&state));

    let incident = service
        .create(create_request("Checkout latency", false))
        .await
        .expect("create");
    assert_eq!(incident.status, IncidentStatus::Handling);
}

#[tokio::test]
async fn incident_numbers_are_sequential() {
    let state = test_state().await;
    let service = IncidentService::new(Arc::clone(&state));

    let first = service
        .create(create_request("first", true))
        .await
        .expect("create");
    let second = service
        .create(create_request("second", true))
        .await
        .expect("create");
    assert_eq!(first.number, 1);
    assert_eq!(second.number, 2);
}

#[tokio::test]
async fn empty_title_is_rejected_with_no_side_effects() {
    let state = test_state().await;
    let service = IncidentService::new(Arc::clone(&state));

    let result = service.create(create_request("   ", true)).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let viewer = Identity::Anonymous;
    assert!(service.list_for_viewer(&viewer).await.expect("list").is_empty());
}

#[tokio::test]
async fn status_change_mutates_incident_and_appends_history() {
    let state = test_state().await;
    let service = IncidentService::new(Arc::clone(&state));
    service
        .create(create_request("Database outage", true))
        .await
        .expect("create");

    let actor = Identity::User("U_LEAD".into());
    let updated = service
        .set_status(1, IncidentStatus::Monitoring, &actor, "fix deployed")
        .await
        .expect("set status");
    assert_eq!(updated.status, IncidentStatus::Monitoring);

    // The stored row reflects the mutation, and history gained one entry.
    let stored = service
        .get_for_viewer(1, &Identity::Anonymous)
        .await
        .expect("get");
    assert_eq!(stored.status, IncidentStatus::Monitoring);

    let history = service.status_history(1).await.expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].status, IncidentStatus::Monitoring);
    assert_eq!(history[1].actor, "U_LEAD");
    assert_eq!(history[1].note, "fix deployed");
}

#[tokio::test]
async fn any_transition_between_defined_states_is_allowed() {
    let state = test_state().await;
    let service = IncidentService::new(Arc::clone(&state));
    service
        .create(create_request("Database outage", true))
        .await
        .expect("create");
    let actor = Identity::User("U1".into());

    // Including backwards moves such as reopening a closed incident.
    for status in [
        IncidentStatus::Closed,
        IncidentStatus::Triage,
        IncidentStatus::Monitoring,
        IncidentStatus::Handling,
    ] {
        let updated = service
            .set_status(1, status, &actor, "")
            .await
            .expect("set status");
        assert_eq!(updated.status, status);
    }

    // One seed entry plus one per transition.
    let history = service.status_history(1).await.expect("history");
    assert_eq!(history.len(), 5);
}

#[tokio::test]
async fn restating_the_current_status_still_appends_history() {
    let state = test_state().await;
    let service = IncidentService::new(Arc::clone(&state));
    service
        .create(create_request("Database outage", true))
        .await
        .expect("create");
    let actor = Identity::User("U1".into());

    service
        .set_status(1, IncidentStatus::Triage, &actor, "still triaging")
        .await
        .expect("restate");
    service
        .set_status(1, IncidentStatus::Triage, &actor, "no change yet")
        .await
        .expect("restate again");

    let history = service.status_history(1).await.expect("history");
    assert_eq!(history.len(), 3);
}

#[tokio::test]
async fn invalid_status_string_mutates_nothing() {
    let state = test_state().await;
    let service = IncidentService::new(Arc::clone(&state));
    service
        .create(create_request("Database outage", true))
        .await
        .expect("create");
    let actor = Identity::User("U1".into());

    let result = service.set_status_str(1, "bogus", &actor, "").await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let stored = service
        .get_for_viewer(1, &Identity::Anonymous)
        .await
        .expect("get");
    assert_eq!(stored.status, IncidentStatus::Triage);
    assert_eq!(service.status_history(1).await.expect("history").len(), 1);
}

#[tokio::test]
async fn valid_status_string_is_parsed_and_applied() {
    let state = test_state().await;
    let service = IncidentService::new(Arc::clone(&state));
    service
        .create(create_request("Database outage", true))
        .await
        .expect("create");
    let actor = Identity::User("U1".into());

    let updated = service
        .set_status_str(1, "closed", &actor, "resolved")
        .await
        .expect("set status");
    assert_eq!(updated.status, IncidentStatus::Closed);
}

#[tokio::test]
async fn anonymous_actor_is_recorded_as_system() {
    let state = test_state().await;
    let service = IncidentService::new(Arc::clone(&state));
    service
        .create(create_request("Database outage", true))
        .await
        .expect("create");

    service
        .set_status(1, IncidentStatus::Handling, &Identity::Anonymous, "")
        .await
        .expect("set status");

    let history = service.status_history(1).await.expect("history");
    assert_eq!(history[1].actor, "system");
}

#[tokio::test]
async fn status_change_on_missing_incident_is_not_found() {
    let state = test_state().await;
    let service = IncidentService::new(Arc::clone(&state));

    let result = service
        .set_status(42, IncidentStatus::Closed, &Identity::Anonymous, "")
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(service.status_history(42).await.expect("history").is_empty());
}
