//! WebSocket handler: one task per connection.
//!
//! DESIGN
//! ======
//! On upgrade, the connection is registered and a per-connection bounded
//! queue is created. The task then enters a `select!` loop:
//! - Incoming binary frames → event router (validate, cache, publish)
//! - Frames published to the room → forward to the socket
//! - Idle deadline → close
//!
//! The task owns its `Connection` and is the only place its frames are
//! handled, so a connection's events never run concurrently.
//!
//! LIFECYCLE
//! =========
//! 1. Register → identity-assignment (direct to socket)
//! 2. Join the room topic → publish member-joined (self included)
//! 3. Own member-joined → room-assignment → snapshot → held-back frames
//! 4. Relay loop until close, violation, idle timeout or eviction
//! 5. Depart: unregister → drop cache slot → publish member-left
//!
//! Every socket write is bounded by the idle timeout. The whole session also
//! races the registry's removal signal, so an evicted connection stops at
//! once instead of draining its queue into a peer that is not reading.

use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::services;
use crate::state::{AppState, Connection};

#[derive(Debug, thiserror::Error)]
enum SendError {
    #[error(transparent)]
    Socket(#[from] axum::Error),
    #[error("socket write timed out after {0:?}")]
    Timeout(Duration),
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let max = state.config.max_frame_bytes;
    ws.max_message_size(max)
        .max_frame_size(max)
        .on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let (client_tx, mut client_rx) = mpsc::channel::<Bytes>(state.config.outbound_queue);
    let (connection, mut removed) = services::session::register(&state, client_tx).await;
    info!(conn_id = %connection.id, room = %connection.room, "ws: client connected");

    // Eviction fires `removed`; the socket is dropped mid-write if need be.
    tokio::select! {
        () = serve(&mut socket, &state, &connection, &mut client_rx) => {}
        _ = &mut removed => {
            debug!(conn_id = %connection.id, "ws: removed from registry, dropping socket");
        }
    }

    close(&state, &connection).await;
    let live = services::session::live_count(&state).await;
    info!(conn_id = %connection.id, live, "ws: client disconnected");
}

async fn serve(socket: &mut WebSocket, state: &AppState, connection: &Connection, client_rx: &mut mpsc::Receiver<Bytes>) {
    match open(socket, state, connection, client_rx).await {
        Ok(()) => relay_loop(socket, state, connection, client_rx).await,
        Err(e) => debug!(conn_id = %connection.id, error = %e, "ws: handshake send failed"),
    }
}

/// Write one frame, bounded by the idle timeout.
async fn send_frame(socket: &mut WebSocket, state: &AppState, frame: Bytes) -> Result<(), SendError> {
    let limit = state.config.idle_timeout;
    tokio::time::timeout(limit, socket.send(Message::Binary(frame)))
        .await
        .map_err(|_| SendError::Timeout(limit))??;
    Ok(())
}

/// Send the opening sequence: identity, member-joined, room, snapshot.
///
/// Frames from other members that reach our queue before the opening
/// sequence is done are held back and written after the snapshot.
async fn open(
    socket: &mut WebSocket,
    state: &AppState,
    connection: &Connection,
    client_rx: &mut mpsc::Receiver<Bytes>,
) -> Result<(), SendError> {
    send_frame(socket, state, frames::identity(connection.id.0)).await?;

    let joined = frames::member_joined(connection.id.0);
    services::session::join(state, connection).await;
    services::fanout::publish(state, connection.room, joined.clone()).await;

    let (own_joined, held) = take_queued(client_rx, &joined);
    if own_joined {
        send_frame(socket, state, joined).await?;
    }

    send_frame(socket, state, frames::room_assignment(connection.room.0)).await?;

    let snapshot = services::room::snapshot(state, connection.room).await;
    debug!(conn_id = %connection.id, frames = snapshot.len(), held = held.len(), "ws: sending room snapshot");
    for frame in snapshot.into_iter().chain(held) {
        send_frame(socket, state, frame).await?;
    }
    Ok(())
}

/// Drain what is already queued. Reports whether our own member-joined was
/// among it and returns everything else, in order.
fn take_queued(client_rx: &mut mpsc::Receiver<Bytes>, joined: &Bytes) -> (bool, Vec<Bytes>) {
    let mut own_joined = false;
    let mut held = Vec::new();
    while let Ok(frame) = client_rx.try_recv() {
        if !own_joined && frame == *joined {
            own_joined = true;
        } else {
            held.push(frame);
        }
    }
    (own_joined, held)
}

async fn relay_loop(
    socket: &mut WebSocket,
    state: &AppState,
    connection: &Connection,
    client_rx: &mut mpsc::Receiver<Bytes>,
) {
    let idle_timeout = state.config.idle_timeout;
    let idle = tokio::time::sleep(idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                idle.as_mut().reset(Instant::now() + idle_timeout);
                match msg {
                    Message::Binary(data) => {
                        if let Err(e) = services::router::handle(state, connection, &data).await {
                            warn!(conn_id = %connection.id, code = e.error_code(), error = %e, "ws: protocol violation, closing");
                            break;
                        }
                    }
                    Message::Text(_) => {
                        warn!(conn_id = %connection.id, "ws: text frame on binary protocol, closing");
                        break;
                    }
                    Message::Close(_) => break,
                    Message::Ping(_) | Message::Pong(_) => {}
                }
            }
            frame = client_rx.recv() => {
                // The registry dropped our sender: evicted for backpressure.
                let Some(frame) = frame else { break };
                if let Err(e) = send_frame(socket, state, frame).await {
                    debug!(conn_id = %connection.id, error = %e, "ws: outbound send failed");
                    break;
                }
            }
            () = &mut idle => {
                info!(conn_id = %connection.id, timeout_secs = idle_timeout.as_secs(), "ws: idle timeout");
                break;
            }
        }
    }
}

/// Depart unless an eviction already did it for us.
async fn close(state: &AppState, connection: &Connection) {
    if !services::fanout::depart(state, connection.id).await {
        debug!(conn_id = %connection.id, "ws: departure already announced");
    }
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
