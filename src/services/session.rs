//! Session registry: live connections and their room association.
//!
//! DESIGN
//! ======
//! The registry is the only owner of each connection's outbound sender.
//! `unregister` drops it, which closes the connection's queue and ends its
//! websocket task. Fanout relies on this to disconnect slow members.
//!
//! Each session also holds the sending half of a oneshot. The receiver,
//! returned by `register`, resolves as soon as the session is removed, so an
//! evicted connection's task can stop even while blocked on a socket write.
//!
//! Topic membership is established here (`join`) and torn down here
//! (`unregister`); fanout only reads it.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::services::fanout;
use crate::state::{AppState, Connection, ConnectionId, Session};

/// Allocate an identity, place it in a room and store the connection.
///
/// The room is created on demand. The connection is not yet subscribed to
/// the room topic; call [`join`] once the identity has been delivered.
///
/// The returned receiver resolves once the connection is unregistered.
pub async fn register(state: &AppState, outbound: mpsc::Sender<Bytes>) -> (Connection, oneshot::Receiver<()>) {
    let id = state.identities.next();
    let room = state.placement.place(id);
    let connection = Connection { id, room };
    let (shutdown, removed) = oneshot::channel();

    state.rooms.write().await.entry(room).or_default();

    let mut sessions = state.sessions.write().await;
    sessions.insert(id, Session { connection, outbound, shutdown });
    info!(conn_id = %id, %room, live = sessions.len(), "registered connection");

    (connection, removed)
}

/// Subscribe a registered connection to its room topic.
pub async fn join(state: &AppState, connection: &Connection) {
    fanout::subscribe(state, connection).await;
}

/// Look up a live connection.
pub async fn lookup(state: &AppState, id: ConnectionId) -> Option<Connection> {
    let sessions = state.sessions.read().await;
    sessions.get(&id).map(|session| session.connection)
}

/// Remove a connection and its topic membership. Unknown ids are a no-op.
///
/// Returns the removed connection, if it was still registered. Only one
/// caller ever sees `Some` for a given id.
pub async fn unregister(state: &AppState, id: ConnectionId) -> Option<Connection> {
    let removed = state.sessions.write().await.remove(&id);
    let Some(session) = removed else {
        debug!(conn_id = %id, "unregister: connection already gone");
        return None;
    };

    fanout::unsubscribe(state, &session.connection).await;
    info!(conn_id = %id, room = %session.connection.room, "unregistered connection");
    Some(session.connection)
}

/// Number of registered connections.
pub async fn live_count(state: &AppState) -> usize {
    state.sessions.read().await.len()
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
