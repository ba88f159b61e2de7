use super::*;
use crate::state::{RoomId, test_helpers};

#[tokio::test]
async fn register_assigns_increasing_ids_in_room_one() {
    let state = test_helpers::test_app_state();
    let mut previous = None;
    let mut receivers = Vec::new();

    for _ in 0..20 {
        let (tx, rx) = mpsc::channel(4);
        receivers.push(rx);
        let (connection, _removed) = register(&state, tx).await;
        assert_eq!(connection.room, RoomId(1));
        if let Some(prev) = previous {
            assert!(connection.id > prev, "{} should follow {prev}", connection.id);
        }
        previous = Some(connection.id);
    }
    assert_eq!(live_count(&state).await, 20);
}

#[tokio::test]
async fn register_creates_room_without_subscribing() {
    let state = test_helpers::test_app_state();
    let (tx, _rx) = mpsc::channel(4);
    let (connection, _removed) = register(&state, tx).await;

    let rooms = state.rooms.read().await;
    let room = rooms.get(&connection.room).expect("room created on demand");
    assert!(room.members.is_empty());
}

#[tokio::test]
async fn join_subscribes_to_room_topic() {
    let state = test_helpers::test_app_state();
    let (connection, _rx) = test_helpers::join_client(&state).await;

    let rooms = state.rooms.read().await;
    assert!(rooms[&connection.room].members.contains(&connection.id));
}

#[tokio::test]
async fn lookup_finds_live_and_misses_unknown() {
    let state = test_helpers::test_app_state();
    let (connection, _rx) = test_helpers::join_client(&state).await;

    assert_eq!(lookup(&state, connection.id).await, Some(connection));
    assert_eq!(lookup(&state, ConnectionId(999)).await, None);
}

#[tokio::test]
async fn unregister_removes_session_and_membership() {
    let state = test_helpers::test_app_state();
    let (connection, _rx) = test_helpers::join_client(&state).await;

    assert_eq!(unregister(&state, connection.id).await, Some(connection));
    assert_eq!(lookup(&state, connection.id).await, None);
    let rooms = state.rooms.read().await;
    assert!(!rooms[&connection.room].members.contains(&connection.id));
}

#[tokio::test]
async fn unregister_is_idempotent() {
    let state = test_helpers::test_app_state();
    let (connection, _rx) = test_helpers::join_client(&state).await;

    assert!(unregister(&state, connection.id).await.is_some());
    assert!(unregister(&state, connection.id).await.is_none());
    assert!(unregister(&state, ConnectionId(12345)).await.is_none());
}

#[tokio::test]
async fn unregister_closes_outbound_queue() {
    let state = test_helpers::test_app_state();
    let (connection, mut rx) = test_helpers::join_client(&state).await;

    unregister(&state, connection.id).await;
    assert!(rx.recv().await.is_none(), "queue should close once the registry drops the sender");
}

#[tokio::test]
async fn ids_are_not_reused_after_disconnect() {
    let state = test_helpers::test_app_state();
    let (first, _rx1) = test_helpers::join_client(&state).await;
    unregister(&state, first.id).await;

    let (second, _rx2) = test_helpers::join_client(&state).await;
    assert!(second.id > first.id);
}

#[tokio::test]
async fn unregister_fires_removal_signal() {
    let state = test_helpers::test_app_state();
    let (tx, _rx) = mpsc::channel(4);
    let (connection, mut removed) = register(&state, tx).await;

    assert!(removed.try_recv().is_err());
    assert!(lookup(&state, connection.id).await.is_some());

    unregister(&state, connection.id).await;
    let fired = tokio::time::timeout(std::time::Duration::from_millis(100), removed).await;
    assert!(fired.is_ok(), "removal signal should resolve once the session is gone");
}
