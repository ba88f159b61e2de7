//! Room placement: decides which room a new connection joins.

use crate::state::{ConnectionId, RoomId};

/// The room every connection lands in under [`SingleRoom`].
pub const DEFAULT_ROOM: RoomId = RoomId(1);

/// Strategy for assigning a freshly registered connection to a room.
pub trait RoomPlacement: Send + Sync {
    fn place(&self, id: ConnectionId) -> RoomId;
}

/// Puts everyone in one shared room.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleRoom;

impl RoomPlacement for SingleRoom {
    fn place(&self, _id: ConnectionId) -> RoomId {
        DEFAULT_ROOM
    }
}
