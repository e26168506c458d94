//! WebSocket transport layer.
//!
//! The client never touches a socket directly: it drives a [`Transport`]
//! capability injected at construction time. The production implementation
//! is [`TlsTransport`], which wires the trust policy into the TLS handshake
//! and runs an explicit read/write loop over the socket.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   Frame (outbound)   ┌──────────────────┐
//! │ WebSocketClient  │─────────────────────►│  TlsTransport    │
//! │                  │                      │  select loop     │◄──► server
//! │  dispatch loop   │◄─────────────────────│                  │
//! └──────────────────┘ TransportEvent       └──────────────────┘
//!                        (inbound)
//! ```
//!
//! Send failures are reported through the inbound event channel, not as
//! call-site errors; a failed send is not fatal to the connection.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `interface` | [`Transport`] trait, [`Frame`], [`TransportEvent`], [`TransportLink`] |
//! | `tls` | tokio-tungstenite implementation with rustls trust override |

// ============================================================================
// Submodules
// ============================================================================

/// Transport capability contract.
pub mod interface;

/// TLS-capable tokio-tungstenite transport.
pub mod tls;

// ============================================================================
// Re-exports
// ============================================================================

pub use interface::{Frame, Transport, TransportEvent, TransportLink};
pub use tls::TlsTransport;
