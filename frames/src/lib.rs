//! Binary frame layout and codec for the presence relay wire protocol.
//!
//! This crate owns the byte-level representation shared by the `presence-relay`
//! server and its clients. Every frame starts with, or carries at a fixed
//! offset, a one-byte [`EventKind`].
//!
//! LAYOUT
//! ======
//! - Control frames (server → client): `[kind:1][payload]`
//! - Relayed frames (server → room):   `[sender:2 BE][kind:1][payload]`
//! - Client frames (client → server):  `[kind:1][payload]`
//!
//! The two server families are not self-describing; a client decodes them by
//! context with [`decode_control`] or [`decode_relay`].

use std::f32::consts::TAU;

use bytes::{BufMut, Bytes, BytesMut};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Lower sentinel of the kind range. Never valid on the wire.
pub const KIND_MIN: u8 = 1;

/// Upper sentinel of the kind range. Never valid on the wire.
pub const KIND_MAX: u8 = 10;

/// Bytes in the sender-id prefix of a relayed frame.
pub const SENDER_PREFIX_LEN: usize = 2;

/// Payload length of a position update: three `f32`.
pub const POSITION_PAYLOAD_LEN: usize = 3 * 4;

/// Fixed-point scale applied to the yaw angle of a rotation update.
pub const ROTATION_SCALE: f32 = 10_000.0;

// =============================================================================
// ERRORS
// =============================================================================

/// Error returned by the decoders in this crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Zero-length frame.
    #[error("empty frame")]
    Empty,
    /// Kind byte is a sentinel or outside the declared range.
    #[error("invalid event kind: {0}")]
    InvalidKind(u8),
    /// Frame is shorter than its kind requires.
    #[error("truncated frame: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

// =============================================================================
// EVENT KIND
// =============================================================================

/// Tag carried by every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum EventKind {
    Identity = 2,
    Room = 3,
    Keepalive = 4,
    MemberJoined = 5,
    MemberLeft = 6,
    Position = 7,
    Rotation = 8,
    Workspace = 9,
}

impl EventKind {
    /// Wire value of this kind.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Persistent kinds are cached per member and replayed to newcomers.
    #[must_use]
    pub fn is_persistent(self) -> bool {
        matches!(self, Self::Position | Self::Workspace)
    }
}

impl TryFrom<u8> for EventKind {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Self::Identity),
            3 => Ok(Self::Room),
            4 => Ok(Self::Keepalive),
            5 => Ok(Self::MemberJoined),
            6 => Ok(Self::MemberLeft),
            7 => Ok(Self::Position),
            8 => Ok(Self::Rotation),
            9 => Ok(Self::Workspace),
            other => Err(CodecError::InvalidKind(other)),
        }
    }
}

// =============================================================================
// INBOUND (client → server)
// =============================================================================

/// A client frame split into its raw kind byte and payload.
///
/// The kind is not range-checked here; that is the router's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inbound<'a> {
    pub kind: u8,
    pub payload: &'a [u8],
}

/// Split a client frame into kind and payload.
///
/// # Errors
///
/// Returns [`CodecError::Empty`] for a zero-length buffer.
pub fn decode(bytes: &[u8]) -> Result<Inbound<'_>, CodecError> {
    let Some((&kind, payload)) = bytes.split_first() else {
        return Err(CodecError::Empty);
    };
    Ok(Inbound { kind, payload })
}

// =============================================================================
// SERVER ENCODERS
// =============================================================================

fn control_with_id(kind: EventKind, id: u16) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + 2);
    buf.put_u8(kind.as_u8());
    buf.put_u16(id);
    buf.freeze()
}

/// `[Identity][id:2]`, unicast to a freshly opened connection.
#[must_use]
pub fn identity(id: u16) -> Bytes {
    control_with_id(EventKind::Identity, id)
}

/// `[Room][room:1]`, unicast after the member joined its room.
#[must_use]
pub fn room_assignment(room: u8) -> Bytes {
    Bytes::copy_from_slice(&[EventKind::Room.as_u8(), room])
}

/// `[MemberJoined][id:2]`, broadcast to the room.
#[must_use]
pub fn member_joined(id: u16) -> Bytes {
    control_with_id(EventKind::MemberJoined, id)
}

/// `[MemberLeft][id:2]`, broadcast to the room.
#[must_use]
pub fn member_left(id: u16) -> Bytes {
    control_with_id(EventKind::MemberLeft, id)
}

/// Prefix a raw client frame (`[kind][payload]`) with its sender id.
#[must_use]
pub fn relay(sender: u16, client_frame: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(SENDER_PREFIX_LEN + client_frame.len());
    buf.put_u16(sender);
    buf.put_slice(client_frame);
    buf.freeze()
}

// =============================================================================
// CLIENT ENCODERS
// =============================================================================

/// A world-space position as three `f32`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    #[must_use]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Read a position from a 12-byte payload (big-endian `f32`s).
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Truncated`] if fewer than 12 bytes are given.
    pub fn from_payload(payload: &[u8]) -> Result<Self, CodecError> {
        let Some(raw) = payload.get(..POSITION_PAYLOAD_LEN) else {
            return Err(CodecError::Truncated { expected: POSITION_PAYLOAD_LEN, actual: payload.len() });
        };
        let f = |i: usize| f32::from_be_bytes([raw[i], raw[i + 1], raw[i + 2], raw[i + 3]]);
        Ok(Self { x: f(0), y: f(4), z: f(8) })
    }
}

/// `[Keepalive]`
#[must_use]
pub fn keepalive() -> Bytes {
    Bytes::from_static(&[EventKind::Keepalive as u8])
}

/// `[Position][x:4][y:4][z:4]`
#[must_use]
pub fn position(pos: Position) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + POSITION_PAYLOAD_LEN);
    buf.put_u8(EventKind::Position.as_u8());
    buf.put_f32(pos.x);
    buf.put_f32(pos.y);
    buf.put_f32(pos.z);
    buf.freeze()
}

/// `[Rotation][yaw:2]` where yaw is `|floor((radians mod 2π) × 10000)|`.
#[must_use]
pub fn rotation(yaw_radians: f32) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + 2);
    buf.put_u8(EventKind::Rotation.as_u8());
    buf.put_u16(scale_yaw(yaw_radians));
    buf.freeze()
}

/// `[Workspace][payload...]`, payload forwarded verbatim by the server.
#[must_use]
pub fn workspace(payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + payload.len());
    buf.put_u8(EventKind::Workspace.as_u8());
    buf.put_slice(payload);
    buf.freeze()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scale_yaw(yaw_radians: f32) -> u16 {
    // `as` saturates, so NaN maps to 0 and anything above u16::MAX clamps.
    ((yaw_radians % TAU) * ROTATION_SCALE).floor().abs() as u16
}

/// Recover the yaw angle in radians from a rotation payload.
///
/// # Errors
///
/// Returns [`CodecError::Truncated`] if fewer than 2 bytes are given.
pub fn decode_rotation(payload: &[u8]) -> Result<f32, CodecError> {
    read_u16(payload).map(|raw| f32::from(raw) / ROTATION_SCALE)
}

// =============================================================================
// CLIENT DECODERS
// =============================================================================

/// A server-issued control frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFrame {
    Identity(u16),
    Room(u8),
    MemberJoined(u16),
    MemberLeft(u16),
}

/// Decode a `[kind][payload]` control frame.
///
/// # Errors
///
/// Returns [`CodecError::Empty`], [`CodecError::InvalidKind`] for kinds that
/// are not control kinds, or [`CodecError::Truncated`].
pub fn decode_control(bytes: &[u8]) -> Result<ControlFrame, CodecError> {
    let Inbound { kind, payload } = decode(bytes)?;
    match EventKind::try_from(kind)? {
        EventKind::Identity => read_u16(payload).map(ControlFrame::Identity),
        EventKind::MemberJoined => read_u16(payload).map(ControlFrame::MemberJoined),
        EventKind::MemberLeft => read_u16(payload).map(ControlFrame::MemberLeft),
        EventKind::Room => payload
            .first()
            .map(|&room| ControlFrame::Room(room))
            .ok_or(CodecError::Truncated { expected: 1, actual: 0 }),
        _ => Err(CodecError::InvalidKind(kind)),
    }
}

/// A relayed client frame as received by room members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayFrame {
    pub sender: u16,
    pub kind: EventKind,
    pub payload: Bytes,
}

/// Decode a `[sender:2][kind][payload]` relayed frame.
///
/// # Errors
///
/// Returns [`CodecError::Truncated`] if the sender prefix or kind is missing,
/// or [`CodecError::InvalidKind`].
pub fn decode_relay(bytes: &Bytes) -> Result<RelayFrame, CodecError> {
    if bytes.len() < SENDER_PREFIX_LEN + 1 {
        return Err(CodecError::Truncated { expected: SENDER_PREFIX_LEN + 1, actual: bytes.len() });
    }
    let sender = u16::from_be_bytes([bytes[0], bytes[1]]);
    let kind = EventKind::try_from(bytes[SENDER_PREFIX_LEN])?;
    Ok(RelayFrame { sender, kind, payload: bytes.slice(SENDER_PREFIX_LEN + 1..) })
}

fn read_u16(payload: &[u8]) -> Result<u16, CodecError> {
    match payload {
        [hi, lo, ..] => Ok(u16::from_be_bytes([*hi, *lo])),
        _ => Err(CodecError::Truncated { expected: 2, actual: payload.len() }),
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
