use super::*;
use crate::state::test_helpers::{self, drain};
use tokio::time::{Duration, timeout};

#[tokio::test]
async fn publish_reaches_every_member_including_sender() {
    let state = test_helpers::test_app_state();
    let (a, mut rx_a) = test_helpers::join_client(&state).await;
    let (_b, mut rx_b) = test_helpers::join_client(&state).await;

    let frame = frames::member_joined(a.id.0);
    let delivered = publish(&state, a.room, frame.clone()).await;

    assert_eq!(delivered, 2);
    assert_eq!(drain(&mut rx_a), vec![frame.clone()]);
    assert_eq!(drain(&mut rx_b), vec![frame]);
}

#[tokio::test]
async fn publish_to_unknown_room_is_a_no_op() {
    let state = test_helpers::test_app_state();
    let (_a, mut rx_a) = test_helpers::join_client(&state).await;

    assert_eq!(publish(&state, RoomId(77), frames::keepalive()).await, 0);
    assert!(drain(&mut rx_a).is_empty());
}

#[tokio::test]
async fn registered_but_not_joined_receives_nothing() {
    let state = test_helpers::test_app_state();
    let (a, mut rx_a) = test_helpers::join_client(&state).await;
    let (tx, mut rx_pending) = tokio::sync::mpsc::channel(4);
    let _pending = session::register(&state, tx).await;

    assert_eq!(publish(&state, a.room, frames::member_left(9)).await, 1);
    assert_eq!(drain(&mut rx_a).len(), 1);
    assert!(drain(&mut rx_pending).is_empty());
}

#[tokio::test]
async fn unsubscribe_stops_delivery() {
    let state = test_helpers::test_app_state();
    let (a, mut rx_a) = test_helpers::join_client(&state).await;
    let (b, mut rx_b) = test_helpers::join_client(&state).await;

    unsubscribe(&state, &b).await;
    publish(&state, a.room, frames::member_left(3)).await;

    assert_eq!(drain(&mut rx_a).len(), 1);
    assert!(drain(&mut rx_b).is_empty());
}

#[tokio::test]
async fn full_queue_evicts_slow_member_without_blocking_others() {
    let state = test_helpers::test_app_state_with_queue(2);
    let (fast, mut rx_fast) = test_helpers::join_client(&state).await;
    let (slow, mut rx_slow) = test_helpers::join_client(&state).await;

    // The fast member keeps draining; the slow one never reads.
    let mut seen_by_fast = Vec::new();
    for i in 0..3u16 {
        let delivered = timeout(Duration::from_millis(200), publish(&state, fast.room, frames::member_joined(100 + i)))
            .await
            .expect("publish must not block on a slow member");
        assert!(delivered >= 1);
        seen_by_fast.extend(drain(&mut rx_fast));
    }

    assert_eq!(session::lookup(&state, slow.id).await, None, "slow member should be evicted");
    assert!(session::lookup(&state, fast.id).await.is_some());

    // The slow member's queue yields what was buffered, then closes.
    assert_eq!(drain(&mut rx_slow).len(), 2);
    assert!(rx_slow.recv().await.is_none());

    // The room hears about the eviction right away.
    assert_eq!(seen_by_fast.last(), Some(&frames::member_left(slow.id.0)));
}

#[tokio::test]
async fn eviction_clears_cached_frame() {
    let state = test_helpers::test_app_state_with_queue(2);
    let (fast, mut rx_fast) = test_helpers::join_client(&state).await;
    let (slow, _rx_slow) = test_helpers::join_client(&state).await;
    assert!(room::put(&state, slow.room, slow.id, frames::relay(slow.id.0, &frames::workspace(b"x"))).await);

    for _ in 0..2 {
        publish(&state, fast.room, frames::keepalive()).await;
        drain(&mut rx_fast);
    }
    publish(&state, fast.room, frames::keepalive()).await;

    assert_eq!(session::lookup(&state, slow.id).await, None);
    assert!(room::snapshot(&state, slow.room).await.is_empty());
    assert_eq!(drain(&mut rx_fast), vec![frames::keepalive(), frames::member_left(slow.id.0)]);
}

#[tokio::test]
async fn depart_announces_exactly_once() {
    let state = test_helpers::test_app_state();
    let (a, _rx_a) = test_helpers::join_client(&state).await;
    let (_b, mut rx_b) = test_helpers::join_client(&state).await;

    assert!(depart(&state, a.id).await);
    assert!(!depart(&state, a.id).await);
    assert!(!depart(&state, ConnectionId(999)).await);

    assert_eq!(drain(&mut rx_b), vec![frames::member_left(a.id.0)]);
}

#[tokio::test]
async fn departure_that_overflows_another_queue_evicts_it_too() {
    let state = test_helpers::test_app_state_with_queue(2);
    let (leaving, _rx_leaving) = test_helpers::join_client(&state).await;
    let (full, mut rx_full) = test_helpers::join_client(&state).await;
    let (watcher, mut rx_watcher) = test_helpers::join_client(&state).await;

    for _ in 0..2 {
        state.sessions.read().await[&full.id]
            .outbound
            .try_send(frames::keepalive())
            .expect("queue has room");
    }

    assert!(depart(&state, leaving.id).await);

    assert_eq!(session::lookup(&state, full.id).await, None);
    assert!(session::lookup(&state, watcher.id).await.is_some());
    assert_eq!(
        drain(&mut rx_watcher),
        vec![frames::member_left(leaving.id.0), frames::member_left(full.id.0)]
    );
    assert_eq!(drain(&mut rx_full).len(), 2);
    assert!(rx_full.recv().await.is_none());
}

#[tokio::test]
async fn closed_receiver_is_skipped() {
    let state = test_helpers::test_app_state();
    let (a, rx_a) = test_helpers::join_client(&state).await;
    let (_b, mut rx_b) = test_helpers::join_client(&state).await;
    drop(rx_a);

    assert_eq!(publish(&state, a.room, frames::keepalive()).await, 1);
    assert_eq!(drain(&mut rx_b).len(), 1);
    // Closing is left to the connection's own task.
    assert!(session::lookup(&state, a.id).await.is_some());
}
