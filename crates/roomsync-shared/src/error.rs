use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoomSyncError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("No active room context")]
    NoActiveRoom,
}

/// Rejected input, raised before any room resolution or subscription.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown chat type: {0:?}")]
    UnknownChatType(String),

    #[error("Name must not be empty")]
    EmptyName,

    #[error("Name too long: {len} chars (max {max})")]
    NameTooLong { len: usize, max: usize },

    #[error("Name contains control characters")]
    InvalidName,

    #[error("Current user identity is missing")]
    MissingIdentity,

    #[error("Message content must not be empty")]
    EmptyContent,

    #[error("Message content too long: {len} chars (max {max})")]
    ContentTooLong { len: usize, max: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Event channel closed")]
    Closed,

    #[error("Request dropped before a response was sent")]
    Dropped,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Remote error: {0}")]
    Remote(String),
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected payload for {event}: {reason}")]
    UnexpectedPayload { event: String, reason: String },
}
