//! Protocol: tagged events exchanged over the websocket.
//!
//! ARCHITECTURE
//! ============
//! Every websocket text message is `{"event": <name>, "data": <payload>}`.
//! Each event name maps to exactly one payload shape. Inbound text is
//! decoded into a `ClientEvent` at the boundary (`decode_client`); anything
//! that fails to decode is answered with an `error` event to the sender only
//! and never reaches the room core.
//!
//! DESIGN
//! ======
//! - Field casing on the wire is camelCase.
//! - Payloads are checked for shape only. Colors and widths are trusted.
//! - Relayed fragments carry the author's `userId`, stamped by the server.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::room::{Operation, User};

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identity of one connection. Doubles as the user id inside a room.
pub type UserId = Uuid;

/// Identity of one completed operation in a room log.
pub type OperationId = Uuid;

// =============================================================================
// PAYLOAD TYPES
// =============================================================================

/// A position on the drawing surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Drawing tool. The eraser paints with a destructive blend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Brush,
    Eraser,
}

/// A completed stroke as submitted by a client (`stroke-end`, `redo`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub tool: Tool,
    pub color: String,
    pub width: f64,
    pub points: Vec<Point>,
}

/// First point of a live stroke plus its style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeStart {
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub width: f64,
    pub tool: Tool,
}

impl StrokeStart {
    #[must_use]
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Full state handed to a connection right after it joins a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub user_id: UserId,
    pub user_name: String,
    pub user_color: String,
    pub room_id: String,
    pub operations: Vec<Operation>,
    pub users: Vec<User>,
}

/// Payload wrapper that stamps the originating user onto a relayed fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relayed<T> {
    pub user_id: UserId,
    #[serde(flatten)]
    pub payload: T,
}

/// `stroke-end` as seen by peers: the stroke plus its server-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeCompleted {
    pub user_id: UserId,
    pub operation_id: OperationId,
    #[serde(flatten)]
    pub stroke: Stroke,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Welcome {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Departure {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationUndone {
    pub operation_id: OperationId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

// =============================================================================
// EVENTS
// =============================================================================

/// Events a client sends to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Join (or switch to) a room. Blank or null resolves to the default room.
    JoinRoom(Option<String>),
    StrokeStart(StrokeStart),
    StrokeMove(Point),
    StrokeEnd(Stroke),
    CursorMove(Point),
    Undo,
    /// Restore a stroke. The client resubmits the stroke it wants back.
    Redo(Stroke),
    Clear,
}

/// Events the server sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    Connected(Welcome),
    InitSnapshot(Snapshot),
    UserJoined(User),
    UserLeft(Departure),
    StrokeStart(Relayed<StrokeStart>),
    StrokeMove(Relayed<Point>),
    StrokeEnd(StrokeCompleted),
    CursorMove(Relayed<Point>),
    OperationUndone(OperationUndone),
    OperationRedone(Operation),
    CanvasCleared,
    Error(ErrorPayload),
}

impl ServerEvent {
    /// Wire name of the event, used for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::InitSnapshot(_) => "init-snapshot",
            Self::UserJoined(_) => "user-joined",
            Self::UserLeft(_) => "user-left",
            Self::StrokeStart(_) => "stroke-start",
            Self::StrokeMove(_) => "stroke-move",
            Self::StrokeEnd(_) => "stroke-end",
            Self::CursorMove(_) => "cursor-move",
            Self::OperationUndone(_) => "operation-undone",
            Self::OperationRedone(_) => "operation-redone",
            Self::CanvasCleared => "canvas-cleared",
            Self::Error(_) => "error",
        }
    }

    /// High-frequency presence traffic that is kept out of info-level logs.
    #[must_use]
    pub fn is_chatty(&self) -> bool {
        matches!(self, Self::StrokeStart(_) | Self::StrokeMove(_) | Self::CursorMove(_))
    }

    /// Build an `error` event from a typed error.
    #[must_use]
    pub fn error_from(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::Error(ErrorPayload { code: err.error_code().to_string(), message: err.to_string() })
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Grepable error code for structured error events.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid json: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("message has no event name")]
    MissingEvent,
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    #[error("malformed {event} payload: {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("binary messages are not supported")]
    Binary,
}

impl ErrorCode for ProtocolError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "E_INVALID_JSON",
            Self::MissingEvent => "E_MISSING_EVENT",
            Self::UnknownEvent(_) => "E_UNKNOWN_EVENT",
            Self::InvalidPayload { .. } => "E_INVALID_PAYLOAD",
            Self::Binary => "E_BINARY",
        }
    }
}

const CLIENT_EVENT_NAMES: [&str; 8] =
    ["join-room", "stroke-start", "stroke-move", "stroke-end", "cursor-move", "undo", "redo", "clear"];

// =============================================================================
// CODEC
// =============================================================================

/// Decode one inbound text message into a typed client event.
///
/// # Errors
///
/// Returns a `ProtocolError` describing why the message was rejected.
pub fn decode_client(text: &str) -> Result<ClientEvent, ProtocolError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(ProtocolError::InvalidJson)?;

    let Some(event) = value.get("event").and_then(serde_json::Value::as_str) else {
        return Err(ProtocolError::MissingEvent);
    };
    if !CLIENT_EVENT_NAMES.contains(&event) {
        return Err(ProtocolError::UnknownEvent(event.to_string()));
    }
    let event = event.to_string();

    serde_json::from_value(value).map_err(|source| ProtocolError::InvalidPayload { event, source })
}

/// Encode an event for the wire.
///
/// # Errors
///
/// Returns a serialization error if the payload cannot be represented as JSON.
pub fn encode<T: Serialize>(event: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

#[cfg(test)]
#[path = "protocol_test.rs"]
mod tests;
