//! WebSocket client for servers with self-signed TLS certificates.
//!
//! This library provides an event-driven WebSocket client facade whose
//! certificate validation is delegated to an application-chosen trust
//! policy, so development and embedded deployments can talk `wss://` to
//! endpoints the platform trust store would reject.
//!
//! # Architecture
//!
//! The client is composed of three layers:
//!
//! - **Facade** ([`WebSocketClient`]): connection lifecycle, sending,
//!   listener registration. One client drives one logical connection at a
//!   time and is reusable after it ends.
//! - **Transport** ([`Transport`] / [`TlsTransport`]): opens the socket,
//!   runs the TLS handshake, pumps frames both ways. Injected, so tests
//!   run against an in-memory double.
//! - **Trust** ([`TrustPolicy`]): the sole authority over whether a peer
//!   certificate chain is acceptable. Accept-all is available but only
//!   behind an explicit opt-in; there is no implicit default.
//!
//! Key design principles:
//!
//! - Event-driven: inbound frames push to registered listeners in arrival
//!   order, with no polling
//! - `connect` settles exactly once; later transport activity flows only
//!   through events
//! - `close` is idempotent, dispatches `close` at most once, and tears
//!   down every listener
//! - A misbehaving listener (panic) never poisons dispatch for the others
//!
//! # Quick Start
//!
//! ```no_run
//! use wss_self_signed::{AcceptAllCerts, Result, TlsTransport, WebSocketClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Accept-all must be chosen explicitly; never use it in production
//!     let client = WebSocketClient::builder()
//!         .transport(TlsTransport::new())
//!         .trust_policy(AcceptAllCerts::new())
//!         .build()?;
//!
//!     client.on_message(|text| println!("received: {text}"));
//!     client.on_close(|| println!("connection closed"));
//!
//!     client.connect("wss://192.168.1.10:8443").await?;
//!     client.send("hello")?;
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client facade, builder, and connection state machine |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`event`] | Event payloads and typed event kinds |
//! | [`registry`] | Multi-subscriber listener registry (internal core) |
//! | [`transport`] | Transport capability and the TLS implementation |
//! | [`trust`] | Certificate trust policies |

// ============================================================================
// Modules
// ============================================================================

/// Client facade, configuration builder, and connection state machine.
///
/// Use [`WebSocketClient::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Event payloads and typed event kinds.
///
/// [`Event`] carries the payload; [`EventKind`] is the registration key.
pub mod event;

/// Multi-subscriber listener registry.
///
/// Panic-isolated dispatch in registration order; used by the facade and
/// usable standalone.
pub mod registry;

/// Transport capability and the production TLS implementation.
///
/// [`Transport`] is the seam the facade is tested through.
pub mod transport;

/// Certificate trust policies.
///
/// [`TrustPolicy`] implementations decide certificate acceptance; the
/// bridge into the TLS stack is internal.
pub mod trust;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{ClientBuilder, ConnectionState, WebSocketClient};

// Error types
pub use error::{Error, Result};

// Event types
pub use event::{Event, EventKind};

// Registry types
pub use registry::{EventCallback, ListenerRegistry, SubscriptionHandle};

// Transport types
pub use transport::{Frame, TlsTransport, Transport, TransportEvent, TransportLink};

// Trust types
pub use trust::{AcceptAllCerts, PinnedCertificate, PinnedFingerprint, TrustDecision, TrustPolicy};
