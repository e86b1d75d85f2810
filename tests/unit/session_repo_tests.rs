//! Unit tests for `SessionRepo` CRUD and expiry purge.

use std::sync::Arc;

use chrono::Utc;
use incident_relay::models::session::Session;
use incident_relay::persistence::{db, session_repo::SessionRepo};
use incident_relay::AppError;

#[tokio::test]
async fn create_then_get_round_trips() {
    let db = db::connect_memory().await.expect("db");
    let repo = SessionRepo::new(Arc::new(db));

    let session = Session::new("U1", Some("alex".into()), 24);
    repo.create(&session).await.expect("create");

    let loaded = repo.get(&session.id).await.expect("get");
    assert_eq!(loaded.user_id, "U1");
    assert_eq!(loaded.user_name.as_deref(), Some("alex"));
    assert!(!loaded.is_expired(Utc::now()));
}

#[tokio::test]
async fn get_missing_session_is_not_found() {
    let db = db::connect_memory().await.expect("db");
    let repo = SessionRepo::new(Arc::new(db));

    let result = repo.get("nope").await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn delete_removes_the_session() {
    let db = db::connect_memory().await.expect("db");
    let repo = SessionRepo::new(Arc::new(db));

    let session = Session::new("U1", None, 24);
    repo.create(&session).await.expect("create");
    repo.delete(&session.id).await.expect("delete");

    let result = repo.get(&session.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn purge_removes_only_expired_sessions() {
    let db = db::connect_memory().await.expect("db");
    let repo = SessionRepo::new(Arc::new(db));

    let expired = Session::new("U1", None, -1);
    let live = Session::new("U2", None, 24);
    repo.create(&expired).await.expect("create expired");
    repo.create(&live).await.expect("create live");

    let purged = repo.purge_expired(Utc::now()).await.expect("purge");
    assert_eq!(purged, 1);

    assert!(matches!(
        repo.get(&expired.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(repo.get(&live.id).await.is_ok());
}

#[test]
fn negative_ttl_is_immediately_expired() {
    let session = Session::new("U1", None, -1);
    assert!(session.is_expired(Utc::now()));
}
