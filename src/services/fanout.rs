//! Broadcast fanout: topic publish/subscribe per room.
//!
//! DESIGN
//! ======
//! Each member has a bounded outbound queue owned by the session registry.
//! `publish` never awaits on a member: it `try_send`s to every subscriber,
//! and a member whose queue is full is disconnected (unregistered) after the
//! pass. The whole departure runs on the publishing task; the evicted
//! connection's own task is only told to stop.
//!
//! There is no echo suppression: the publisher receives its own frames.

use bytes::Bytes;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace, warn};

use crate::services::{room, session};
use crate::state::{AppState, Connection, ConnectionId, RoomId};

pub async fn subscribe(state: &AppState, connection: &Connection) {
    let mut rooms = state.rooms.write().await;
    rooms
        .entry(connection.room)
        .or_default()
        .members
        .insert(connection.id);
}

pub async fn unsubscribe(state: &AppState, connection: &Connection) {
    let mut rooms = state.rooms.write().await;
    if let Some(room) = rooms.get_mut(&connection.room) {
        room.members.remove(&connection.id);
    }
}

/// Deliver `frame` to every member of `room`. Returns how many members
/// accepted it.
///
/// Members whose queue overflowed depart once the pass is over.
pub async fn publish(state: &AppState, room: RoomId, frame: Bytes) -> usize {
    let (delivered, overflowed) = deliver(state, room, &frame).await;
    trace!(%room, delivered, len = frame.len(), "fanout: published");

    for id in overflowed {
        warn!(conn_id = %id, %room, "fanout: outbound queue full, disconnecting member");
        depart(state, id).await;
    }
    delivered
}

/// Unregister `id`, drop its cached frame and announce member-left to its
/// room. Only the first call for an id does anything; returns whether this
/// call was it.
///
/// The announcement can overflow other queues in turn. Those members depart
/// the same way, handled iteratively.
pub async fn depart(state: &AppState, id: ConnectionId) -> bool {
    let mut pending = vec![id];
    let mut departed = false;

    while let Some(next) = pending.pop() {
        let Some(connection) = session::unregister(state, next).await else {
            continue;
        };
        departed |= next == id;

        room::remove(state, connection.room, connection.id).await;
        let (delivered, overflowed) = deliver(state, connection.room, &frames::member_left(connection.id.0)).await;
        debug!(conn_id = %connection.id, room = %connection.room, delivered, "fanout: member left");

        for evicted in overflowed {
            warn!(conn_id = %evicted, room = %connection.room, "fanout: outbound queue full, disconnecting member");
            pending.push(evicted);
        }
    }
    departed
}

/// One `try_send` pass over the room. Returns the delivery count and the
/// members whose queue was full.
async fn deliver(state: &AppState, room: RoomId, frame: &Bytes) -> (usize, Vec<ConnectionId>) {
    let members: Vec<ConnectionId> = {
        let rooms = state.rooms.read().await;
        let Some(room_state) = rooms.get(&room) else {
            return (0, Vec::new());
        };
        room_state.members.iter().copied().collect()
    };

    let mut delivered = 0;
    let mut overflowed = Vec::new();
    let sessions = state.sessions.read().await;
    for id in members {
        // Disconnect race: subscribed a moment ago, already unregistered.
        let Some(session) = sessions.get(&id) else {
            continue;
        };
        match session.outbound.try_send(frame.clone()) {
            Ok(()) => delivered += 1,
            Err(TrySendError::Full(_)) => overflowed.push(id),
            // Receiver gone: the connection task is already closing.
            Err(TrySendError::Closed(_)) => {}
        }
    }
    (delivered, overflowed)
}

#[cfg(test)]
#[path = "fanout_test.rs"]
mod tests;
