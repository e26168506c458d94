//! Event taxonomy for the client.
//!
//! Inbound frames and lifecycle changes are surfaced to the application as
//! typed events. The wire contract uses stable string keys so the names can
//! cross serialization boundaries unchanged.
//!
//! # Event Kinds
//!
//! | Kind | Wire name | Payload |
//! |------|-----------|---------|
//! | [`EventKind::Open`] | `open` | none |
//! | [`EventKind::Message`] | `message` | UTF-8 text |
//! | [`EventKind::BinaryMessage`] | `binaryMessage` | byte sequence |
//! | [`EventKind::Close`] | `close` | none |
//! | [`EventKind::Error`] | `error` | description string |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// EventKind
// ============================================================================

/// Kind of a client event, used as the subscription key.
///
/// Serializes to the stable wire names (`open`, `message`, `binaryMessage`,
/// `close`, `error`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Connection established.
    #[serde(rename = "open")]
    Open,

    /// Text frame received.
    #[serde(rename = "message")]
    Message,

    /// Binary frame received.
    #[serde(rename = "binaryMessage")]
    BinaryMessage,

    /// Connection closed.
    #[serde(rename = "close")]
    Close,

    /// Error occurred.
    #[serde(rename = "error")]
    Error,
}

impl EventKind {
    /// All event kinds, in a fixed order.
    pub const ALL: [EventKind; 5] = [
        EventKind::Open,
        EventKind::Message,
        EventKind::BinaryMessage,
        EventKind::Close,
        EventKind::Error,
    ];

    /// Returns the stable wire name for this kind.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Message => "message",
            Self::BinaryMessage => "binaryMessage",
            Self::Close => "close",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Event
// ============================================================================

/// A client event with its kind-specific payload.
///
/// This is the tagged union handed to dispatched listeners: no payload for
/// open/close, text for message/error, bytes for binary messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Connection established.
    Open,

    /// Text frame received from the server.
    Message(String),

    /// Binary frame received from the server.
    BinaryMessage(Vec<u8>),

    /// Connection closed.
    Close,

    /// Error description.
    Error(String),
}

impl Event {
    /// Returns the kind of this event.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Open => EventKind::Open,
            Self::Message(_) => EventKind::Message,
            Self::BinaryMessage(_) => EventKind::BinaryMessage,
            Self::Close => EventKind::Close,
            Self::Error(_) => EventKind::Error,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
