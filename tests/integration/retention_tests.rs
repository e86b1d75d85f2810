//! Integration tests for the retention purge background task.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use incident_relay::models::message::ChannelMessage;
use incident_relay::models::session::Session;
use incident_relay::persistence::{
    db, message_repo::MessageRepo, retention, session_repo::SessionRepo,
};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn first_tick_purges_expired_sessions_and_old_messages() {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let sessions = SessionRepo::new(Arc::clone(&db));
    let messages = MessageRepo::new(Arc::clone(&db));

    let expired = Session::new("U1", None, -1);
    let live = Session::new("U2", None, 24);
    sessions.create(&expired).await.expect("create expired");
    sessions.create(&live).await.expect("create live");

    let mut stale = ChannelMessage::new("C1", "U1", "old chatter", "1.0", None);
    stale.created_at = Utc::now() - chrono::Duration::days(120);
    let fresh = ChannelMessage::new("C1", "U1", "recent chatter", "2.0", None);
    messages.save(&stale).await.expect("save stale");
    messages.save(&fresh).await.expect("save fresh");

    let cancel = CancellationToken::new();
    let handle = retention::spawn_retention_task(Arc::clone(&db), 90, cancel.clone());

    // The interval's first tick fires immediately; give it a moment.
    tokio::time::sleep(Duration::from_millis(200)).await;
    cancel.cancel();
    handle.await.expect("join");

    assert!(sessions.get(&expired.id).await.is_err());
    assert!(sessions.get(&live.id).await.is_ok());

    let remaining = messages.list_recent("C1", 10).await.expect("list");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].text, "recent chatter");
}

#[tokio::test]
async fn cancellation_stops_the_task() {
    let db = Arc::new(db::connect_memory().await.expect("db"));

    let cancel = CancellationToken::new();
    let handle = retention::spawn_retention_task(Arc::clone(&db), 90, cancel.clone());
    cancel.cancel();

    // Joining must complete promptly once cancelled.
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("task stopped")
        .expect("join");
}
