//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating
//! [`WebSocketClient`] instances. The transport and the trust policy are
//! injected here; there is no global singleton and no lazily-thrown
//! misconfiguration error. Building without either is an eager
//! [`Error::Config`].
//!
//! # Example
//!
//! ```no_run
//! use wss_self_signed::{AcceptAllCerts, TlsTransport, WebSocketClient};
//!
//! # fn example() -> wss_self_signed::Result<()> {
//! let client = WebSocketClient::builder()
//!     .transport(TlsTransport::new())
//!     .trust_policy(AcceptAllCerts::new())
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use crate::client::core::WebSocketClient;
use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::trust::TrustPolicy;

// ============================================================================
// Constants
// ============================================================================

/// Default bound on the close acknowledgement wait.
pub(crate) const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`WebSocketClient`] instance.
///
/// Use [`WebSocketClient::builder()`] to create a new builder.
#[derive(Default)]
pub struct ClientBuilder {
    /// Injected transport.
    transport: Option<Arc<dyn Transport>>,
    /// Injected trust policy. No default: disabling validation must be an
    /// explicit choice in the caller's code.
    trust: Option<Arc<dyn TrustPolicy>>,
    /// Bound on the close acknowledgement wait.
    close_timeout: Option<Duration>,
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new client builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transport driving the connection.
    #[inline]
    #[must_use]
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Sets the trust policy consulted during the TLS handshake.
    #[inline]
    #[must_use]
    pub fn trust_policy(mut self, policy: impl TrustPolicy) -> Self {
        self.trust = Some(Arc::new(policy));
        self
    }

    /// Sets the bound on the close acknowledgement wait (default 5 s).
    ///
    /// On expiry the connection is forced to Closed and a non-fatal error
    /// event is dispatched; `close` never hangs.
    #[inline]
    #[must_use]
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = Some(timeout);
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the transport or the trust policy is missing.
    pub fn build(self) -> Result<WebSocketClient> {
        let transport = self.transport.ok_or_else(|| {
            Error::config(
                "A transport is required. Use .transport() to set it.\n\
                 Example: WebSocketClient::builder().transport(TlsTransport::new())",
            )
        })?;

        let trust = self.trust.ok_or_else(|| {
            Error::config(
                "A trust policy is required. Use .trust_policy() to set it.\n\
                 Example: .trust_policy(AcceptAllCerts::new()) explicitly opts out of validation",
            )
        })?;

        let close_timeout = self.close_timeout.unwrap_or(DEFAULT_CLOSE_TIMEOUT);

        Ok(WebSocketClient::new(transport, trust, close_timeout))
    }
}

// ============================================================================
// Tests
// ============================================================================
