//! Event router: validates inbound client frames and relays them.
//!
//! DESIGN
//! ======
//! Validation is structural only: the frame must be non-empty and its kind
//! must sit strictly between the sentinels. Payload contents are never
//! inspected. Any failure means the caller closes the connection.
//!
//! A valid frame is prefixed with the sender id and published to the
//! sender's room. Persistent kinds (position, workspace) are cached first so
//! that the cache is never behind what members have already seen.
//!
//! A connection that has already departed (evicted while its task was still
//! reading) is refused; its frames are neither cached nor relayed.

use frames::{CodecError, EventKind};
use tracing::trace;

use crate::services::{fanout, room, session};
use crate::state::{AppState, Connection, ConnectionId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("connection {0} has already left its room")]
    Departed(ConnectionId),
}

impl RouteError {
    /// Grepable code for log lines.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Codec(CodecError::InvalidKind(_)) => "E_INVALID_KIND",
            Self::Codec(CodecError::Empty | CodecError::Truncated { .. }) => "E_FRAMING",
            Self::Departed(_) => "E_DEPARTED",
        }
    }
}

/// What the router did with an accepted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// Keepalive: accepted, nothing sent.
    Keepalive,
    /// Relayed to the room.
    Relayed { kind: EventKind, delivered: usize },
}

/// Validate one inbound frame from `connection` and relay it to its room.
///
/// # Errors
///
/// Returns [`RouteError`] for an empty frame, an out-of-range kind, or a
/// connection that is no longer registered. The connection must then be
/// closed; nothing has been published.
pub async fn handle(state: &AppState, connection: &Connection, raw: &[u8]) -> Result<Routed, RouteError> {
    let inbound = frames::decode(raw)?;
    let kind = EventKind::try_from(inbound.kind)?;

    if session::lookup(state, connection.id).await.is_none() {
        return Err(RouteError::Departed(connection.id));
    }

    if kind == EventKind::Keepalive {
        trace!(conn_id = %connection.id, "router: keepalive");
        return Ok(Routed::Keepalive);
    }

    let relayed = frames::relay(connection.id.0, raw);

    if kind.is_persistent() && !room::put(state, connection.room, connection.id, relayed.clone()).await {
        return Err(RouteError::Departed(connection.id));
    }

    let delivered = fanout::publish(state, connection.room, relayed).await;
    trace!(conn_id = %connection.id, ?kind, delivered, "router: relayed");
    Ok(Routed::Relayed { kind, delivered })
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
