//! Realtime presence relay.
//!
//! Connections get a durable `u16` identity, are placed in a room, and every
//! binary state frame they send is relayed to the room with their id
//! prefixed. The latest position/workspace frame per member is cached so
//! newcomers can rebuild the room from a snapshot.

pub mod config;
pub mod routes;
pub mod services;
pub mod state;
