//! Domain services used by the websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the relay's shared state transitions so the route
//! handlers can stay focused on transport concerns. Leaf-first:
//! `identity` → `placement` → `session` → `room` → `fanout` → `router`.

pub mod fanout;
pub mod identity;
pub mod placement;
pub mod room;
pub mod router;
pub mod session;
