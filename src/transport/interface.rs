//! Transport capability contract.
//!
//! A [`Transport`] opens one connection at a time and hands back a
//! [`TransportLink`]: an outbound frame sender and an inbound event
//! receiver. Everything after `open` is channel traffic, so the client
//! core is testable against a channel-backed fake with no live sockets.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use crate::error::Result;
use crate::trust::TrustPolicy;

// ============================================================================
// Frame
// ============================================================================

/// Outbound frame handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text message.
    Text(String),

    /// Binary message.
    Binary(Vec<u8>),

    /// Graceful close request.
    Close {
        /// WebSocket close code (1000 for normal closure).
        code: u16,
        /// Optional close reason.
        reason: Option<String>,
    },
}

// ============================================================================
// TransportEvent
// ============================================================================

/// Inbound event delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Text frame from the server.
    Text(String),

    /// Binary frame from the server.
    Binary(Vec<u8>),

    /// Non-fatal error, e.g. a failed send. The connection stays usable.
    Error(String),

    /// The connection closed (remote close frame, local close acknowledged,
    /// or stream end). Terminal: no further events follow.
    Closed,

    /// The connection failed. Terminal: no further events follow.
    Failed(String),
}

impl TransportEvent {
    /// Returns `true` if no further events can follow this one.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }
}

// ============================================================================
// TransportLink
// ============================================================================

/// Channel pair for one established connection.
///
/// Dropping the outbound sender asks the transport to wind down; the
/// transport still delivers a terminal event on the inbound side.
pub struct TransportLink {
    /// Outbound frames toward the server.
    pub outbound: mpsc::UnboundedSender<Frame>,
    /// Inbound events from the server.
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

// ============================================================================
// Transport
// ============================================================================

/// Capability that opens WebSocket connections.
///
/// The trust policy must be consulted during the TLS handshake, before any
/// application data is exchanged. `open` resolves on the open-ack (or the
/// first failure); it never resolves with a half-established connection.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opens a connection to `url`, honoring `trust` during the handshake.
    ///
    /// # Errors
    ///
    /// - [`Error::TrustRejected`](crate::Error::TrustRejected) if the policy declined the peer certificate
    /// - [`Error::Connection`](crate::Error::Connection) for network-level failures
    /// - [`Error::InvalidEndpoint`](crate::Error::InvalidEndpoint) if the URL cannot form a handshake request
    async fn open(&self, url: &Url, trust: Arc<dyn TrustPolicy>) -> Result<TransportLink>;
}

// ============================================================================
// Tests
// ============================================================================
