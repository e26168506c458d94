//! Error types for the WebSocket client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use wss_self_signed::{Result, WebSocketClient};
//!
//! async fn example(client: &WebSocketClient) -> Result<()> {
//!     client.connect("wss://localhost:8443").await?;
//!     client.send("ping")?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Endpoint | [`Error::InvalidEndpoint`] |
//! | Trust | [`Error::TrustRejected`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`] |
//! | Operation | [`Error::InvalidOperation`], [`Error::SendFailed`] |
//! | External | [`Error::WebSocket`] |
//!
//! Every transport-originated failure is recovered into one of these
//! variants before it reaches the application; no raw socket error
//! escapes the crate boundary.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::client::ConnectionState;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned eagerly by [`ClientBuilder::build`](crate::ClientBuilder::build)
    /// when the client is misconfigured, e.g. no transport or no trust
    /// policy was injected.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Endpoint Errors
    // ========================================================================
    /// Malformed or unsupported endpoint URL.
    ///
    /// Returned synchronously by `connect` before any transport activity;
    /// the connection never reaches the Connecting state.
    #[error("Invalid endpoint '{url}': {message}")]
    InvalidEndpoint {
        /// The offending URL as given by the caller.
        url: String,
        /// Description of what is wrong with it.
        message: String,
    },

    // ========================================================================
    // Trust Errors
    // ========================================================================
    /// The trust policy rejected the peer certificate.
    ///
    /// The connection attempt is aborted during the TLS handshake, before
    /// any application data is exchanged.
    #[error("Peer certificate rejected by trust policy")]
    TrustRejected,

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Network-level connection failure.
    ///
    /// Returned when the transport cannot establish or keep the connection.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection closed while an operation was in flight.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Operation Errors
    // ========================================================================
    /// Operation not valid in the current connection state.
    ///
    /// Returned e.g. for `connect` while already Connecting/Open, or
    /// `send` while not Open. Never a silent success.
    #[error("Cannot {operation} while connection is {state}")]
    InvalidOperation {
        /// The operation that was attempted.
        operation: String,
        /// The state the connection was in.
        state: ConnectionState,
    },

    /// A message could not be handed to the transport.
    ///
    /// The connection state is unchanged; a send failure is not fatal.
    #[error("Send failed: {message}")]
    SendFailed {
        /// Description of the send failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// WebSocket protocol error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid endpoint error.
    #[inline]
    pub fn invalid_endpoint(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    #[inline]
    pub fn invalid_operation(operation: impl Into<String>, state: ConnectionState) -> Self {
        Self::InvalidOperation {
            operation: operation.into(),
            state,
        }
    }

    /// Creates a send failure error.
    #[inline]
    pub fn send_failed(message: impl Into<String>) -> Self {
        Self::SendFailed {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the trust policy rejected the peer certificate.
    #[inline]
    #[must_use]
    pub fn is_trust_rejected(&self) -> bool {
        matches!(self, Self::TrustRejected)
    }

    /// Returns `true` if this is a connection-level error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the operation was rejected for the current state.
    #[inline]
    #[must_use]
    pub fn is_invalid_operation(&self) -> bool {
        matches!(self, Self::InvalidOperation { .. })
    }

    /// Returns `true` if this error is recoverable by calling `connect` again.
    ///
    /// Configuration and endpoint errors require caller changes first.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::SendFailed { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
