//! Connection lifecycle states.
//!
//! One client owns at most one logical connection at a time. States move
//! strictly forward for a given connection; a new `connect` after a
//! terminal state starts a fresh connection rather than reviving the old
//! one.
//!
//! ```text
//! Idle ──connect──► Connecting ──open-ack──► Open ──close──► Closing ──► Closed
//!                        │                     │                            ▲
//!                        └──failure──► Failed  └──failure──► Failed         │
//!                                                 └──remote close───────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of the client's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection attempted yet.
    Idle,

    /// Transport handshake in flight.
    Connecting,

    /// Connection established; messages flow.
    Open,

    /// Close requested; waiting for acknowledgement.
    Closing,

    /// Connection closed gracefully. Terminal for this connection.
    Closed,

    /// Connection failed. Terminal for this connection.
    Failed,
}

impl ConnectionState {
    /// Returns `true` for terminal states ([`Closed`](Self::Closed),
    /// [`Failed`](Self::Failed)).
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    /// Returns `true` if a new `connect` call is permitted.
    ///
    /// Permitted from [`Idle`](Self::Idle) and from the terminal states;
    /// a connect while another connection is live is rejected, not queued.
    #[inline]
    #[must_use]
    pub fn can_connect(&self) -> bool {
        matches!(self, Self::Idle | Self::Closed | Self::Failed)
    }

    /// Returns `true` if messages may be sent.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Tests
// ============================================================================
