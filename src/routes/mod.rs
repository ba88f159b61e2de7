//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The relay speaks one protocol: binary frames over a websocket, accepted at
//! `/` and `/ws`. Two small read-only HTTP endpoints sit beside it for
//! operators.

pub mod ws;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::services;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(ws::handle_ws))
        .route("/ws", get(ws::handle_ws))
        .route("/api/rooms", get(list_rooms))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn list_rooms(State(state): State<AppState>) -> Json<Vec<services::room::RoomStats>> {
    Json(services::room::stats(&state).await)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
