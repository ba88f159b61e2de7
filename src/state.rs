//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is built once in `main` and injected into Axum handlers via the
//! `State` extractor. It owns the identity counter, the session table and the
//! per-room state (topic membership + latest persistent frame per member).
//! Tests construct independent instances, there is no global state.
//!
//! LOCKING
//! =======
//! `sessions` and `rooms` are separate `RwLock`s and no code path holds both
//! at once. Fanout snapshots the member ids from `rooms`, releases it, then
//! reads `sessions` to reach the outbound queues.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::{RwLock, mpsc, oneshot};

use crate::config::RelayConfig;
use crate::services::identity::IdentityAllocator;
use crate::services::placement::{RoomPlacement, SingleRoom};

// =============================================================================
// IDS
// =============================================================================

/// Connection identity, 2 bytes big-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u16);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Room identity, 1 byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoomId(pub u8);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// =============================================================================
// CONNECTION / SESSION
// =============================================================================

/// One live connection and the room it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub room: RoomId,
}

/// Registry entry. The registry holds the only sender to the connection's
/// outbound queue, so removing the entry closes the queue.
///
/// Dropping `shutdown` wakes the connection's task, which stops writing and
/// drops its socket without draining what is still queued.
pub struct Session {
    pub connection: Connection,
    pub outbound: mpsc::Sender<Bytes>,
    pub shutdown: oneshot::Sender<()>,
}

// =============================================================================
// ROOM STATE
// =============================================================================

/// Per-room live state.
#[derive(Debug, Default)]
pub struct RoomState {
    /// Connections subscribed to the room topic.
    pub members: HashSet<ConnectionId>,
    /// Latest persistent relay frame per member. One slot per member,
    /// regardless of kind.
    pub latest: HashMap<ConnectionId, Bytes>,
}

impl RoomState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub config: RelayConfig,
    pub identities: Arc<IdentityAllocator>,
    pub placement: Arc<dyn RoomPlacement>,
    pub sessions: Arc<RwLock<HashMap<ConnectionId, Session>>>,
    pub rooms: Arc<RwLock<HashMap<RoomId, RoomState>>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        Self::with_placement(config, Arc::new(SingleRoom))
    }

    #[must_use]
    pub fn with_placement(config: RelayConfig, placement: Arc<dyn RoomPlacement>) -> Self {
        Self {
            config,
            identities: Arc::new(IdentityAllocator::new()),
            placement,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
