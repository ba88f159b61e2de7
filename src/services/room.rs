//! Room state cache: latest persistent frame per member.
//!
//! Newcomers receive a snapshot of these frames so they can reconstruct the
//! room without waiting for every member to move. Each member has exactly
//! one slot: a position update replaces a cached workspace update and vice
//! versa.
//!
//! Only current topic members hold a slot. `put` checks membership under the
//! same lock it writes with, so a frame that races a departure cannot leave a
//! slot behind for a member that has already been announced as gone.

use bytes::Bytes;
use serde::Serialize;

use crate::state::{AppState, ConnectionId, RoomId};

/// Every cached frame in `room`, at most one per member, in map order.
pub async fn snapshot(state: &AppState, room: RoomId) -> Vec<Bytes> {
    let rooms = state.rooms.read().await;
    rooms
        .get(&room)
        .map(|room_state| room_state.latest.values().cloned().collect())
        .unwrap_or_default()
}

/// Overwrite `id`'s slot with `frame`, whatever kind was stored before.
///
/// Returns `false`, storing nothing, if `id` is not a member of `room`.
pub async fn put(state: &AppState, room: RoomId, id: ConnectionId, frame: Bytes) -> bool {
    let mut rooms = state.rooms.write().await;
    let Some(room_state) = rooms.get_mut(&room) else {
        return false;
    };
    if !room_state.members.contains(&id) {
        return false;
    }
    room_state.latest.insert(id, frame);
    true
}

/// Drop `id`'s slot so it no longer appears in snapshots.
pub async fn remove(state: &AppState, room: RoomId, id: ConnectionId) {
    let mut rooms = state.rooms.write().await;
    if let Some(room_state) = rooms.get_mut(&room) {
        room_state.latest.remove(&id);
    }
}

/// Occupancy of one room, as served by `GET /api/rooms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoomStats {
    pub room: RoomId,
    pub members: usize,
    pub cached: usize,
}

/// Occupancy of every known room, ordered by room id.
pub async fn stats(state: &AppState) -> Vec<RoomStats> {
    let rooms = state.rooms.read().await;
    let mut out: Vec<RoomStats> = rooms
        .iter()
        .map(|(room, room_state)| RoomStats {
            room: *room,
            members: room_state.members.len(),
            cached: room_state.latest.len(),
        })
        .collect();
    out.sort_by_key(|s| s.room);
    out
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
