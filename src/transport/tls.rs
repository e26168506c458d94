//! TLS-capable tokio-tungstenite transport.
//!
//! Opens the connection with a rustls connector whose certificate verifier
//! delegates to the injected [`TrustPolicy`], then runs an explicit select
//! loop over the split stream: outbound frames from the client on one side,
//! socket reads on the other. The loop terminates only on close or error;
//! there is no recursive re-listen after each message.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use rustls::crypto::CryptoProvider;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config};
use tracing::{debug, error, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::transport::interface::{Frame, Transport, TransportEvent, TransportLink};
use crate::trust::TrustPolicy;
use crate::trust::verifier::PolicyVerifier;

// ============================================================================
// Types
// ============================================================================

/// The underlying stream type after the handshake.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// TlsTransport
// ============================================================================

/// Production transport over tokio-tungstenite.
///
/// For `wss://` endpoints the trust policy replaces standard chain
/// validation during the handshake. A plain `ws://` endpoint has no TLS
/// handshake, so the policy is not consulted there.
pub struct TlsTransport {
    provider: Arc<CryptoProvider>,
}

impl Default for TlsTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TlsTransport {
    /// Creates the transport with the process default crypto provider.
    #[must_use]
    pub fn new() -> Self {
        let provider = CryptoProvider::get_default()
            .cloned()
            .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()));
        Self { provider }
    }

    /// Builds the rustls client configuration around the trust policy.
    fn tls_config(
        &self,
        trust: Arc<dyn TrustPolicy>,
        rejected: Arc<AtomicBool>,
    ) -> Result<rustls::ClientConfig> {
        let verifier = PolicyVerifier::new(trust, Arc::clone(&self.provider), rejected);

        let config = rustls::ClientConfig::builder_with_provider(Arc::clone(&self.provider))
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::config(format!("TLS configuration failed: {e}")))?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth();

        Ok(config)
    }
}

#[async_trait]
impl Transport for TlsTransport {
    async fn open(&self, url: &Url, trust: Arc<dyn TrustPolicy>) -> Result<TransportLink> {
        let rejected = Arc::new(AtomicBool::new(false));

        let connector = if url.scheme() == "wss" {
            let config = self.tls_config(trust, Arc::clone(&rejected))?;
            Some(Connector::Rustls(Arc::new(config)))
        } else {
            debug!(%url, "plain ws endpoint; trust policy not consulted");
            None
        };

        let request = url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::invalid_endpoint(url.as_str(), e.to_string()))?;

        let (stream, _response) = connect_async_tls_with_config(request, None, false, connector)
            .await
            .map_err(|e| classify_connect_error(url, rejected.load(Ordering::Acquire), e))?;

        debug!(%url, "websocket handshake completed");

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_io(stream, outbound_rx, inbound_tx));

        Ok(TransportLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

// ============================================================================
// Error Classification
// ============================================================================

/// Maps a handshake failure into the crate taxonomy.
///
/// A policy rejection surfaces from tungstenite as a generic TLS error; the
/// verifier's rejection flag disambiguates it. Network-level failures become
/// `Error::Connection`; protocol-level failures pass through as
/// `Error::WebSocket`.
fn classify_connect_error(url: &Url, rejected: bool, err: WsError) -> Error {
    if rejected {
        return Error::TrustRejected;
    }
    match err {
        WsError::Url(e) => Error::invalid_endpoint(url.as_str(), e.to_string()),
        WsError::Io(e) => Error::connection(e.to_string()),
        other => Error::WebSocket(other),
    }
}

// ============================================================================
// IO Loop
// ============================================================================

/// Drives one established connection until close or failure.
async fn run_io(
    stream: WsStream,
    mut outbound: mpsc::UnboundedReceiver<Frame>,
    inbound: mpsc::UnboundedSender<TransportEvent>,
) {
    let (mut write, mut read) = stream.split();
    let mut outbound_open = true;

    loop {
        tokio::select! {
            frame = outbound.recv(), if outbound_open => match frame {
                Some(Frame::Text(text)) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        warn!(error = %e, "text send failed");
                        let _ = inbound.send(TransportEvent::Error(format!("send failed: {e}")));
                    }
                }

                Some(Frame::Binary(data)) => {
                    if let Err(e) = write.send(Message::Binary(data.into())).await {
                        warn!(error = %e, "binary send failed");
                        let _ = inbound.send(TransportEvent::Error(format!("send failed: {e}")));
                    }
                }

                Some(Frame::Close { code, reason }) => {
                    debug!(code, "sending close frame");
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.unwrap_or_default().into(),
                    };
                    if let Err(e) = write.send(Message::Close(Some(frame))).await {
                        debug!(error = %e, "close send failed; stream already down");
                    }
                    // Keep reading until the peer acknowledges
                    outbound_open = false;
                }

                None => {
                    // Link dropped without an explicit close request
                    let _ = write.close().await;
                    outbound_open = false;
                }
            },

            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if inbound.send(TransportEvent::Text(text.as_str().to_owned())).is_err() {
                        break;
                    }
                }

                Some(Ok(Message::Binary(data))) => {
                    if inbound.send(TransportEvent::Binary(data.to_vec())).is_err() {
                        break;
                    }
                }

                Some(Ok(Message::Ping(payload))) => {
                    let _ = write.send(Message::Pong(payload)).await;
                }

                Some(Ok(Message::Pong(_) | Message::Frame(_))) => {}

                Some(Ok(Message::Close(_))) => {
                    debug!("close frame received");
                    let _ = inbound.send(TransportEvent::Closed);
                    break;
                }

                Some(Err(e)) => {
                    error!(error = %e, "websocket error");
                    let _ = inbound.send(TransportEvent::Failed(e.to_string()));
                    break;
                }

                None => {
                    debug!("websocket stream ended");
                    let _ = inbound.send(TransportEvent::Closed);
                    break;
                }
            },
        }
    }

    debug!("transport io loop terminated");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio_tungstenite::tungstenite::error::UrlError;

    use crate::trust::AcceptAllCerts;

    fn endpoint() -> Url {
        Url::parse("wss://example.test").expect("url")
    }

    #[test]
    fn test_tls_config_builds() {
        let transport = TlsTransport::new();
        let config = transport.tls_config(
            Arc::new(AcceptAllCerts::new()),
            Arc::new(AtomicBool::new(false)),
        );
        assert!(config.is_ok());
    }

    #[test]
    fn test_rejection_flag_wins_classification() {
        let err = classify_connect_error(&endpoint(), true, WsError::ConnectionClosed);
        assert!(err.is_trust_rejected());
    }

    #[test]
    fn test_url_failure_carries_endpoint() {
        let err = classify_connect_error(&endpoint(), false, WsError::Url(UrlError::NoHostName));
        assert!(matches!(
            &err,
            Error::InvalidEndpoint { url, .. } if url == "wss://example.test/"
        ));
    }

    #[test]
    fn test_io_failure_classified_as_connection() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = classify_connect_error(&endpoint(), false, WsError::Io(io));
        assert!(matches!(err, Error::Connection { .. }));
    }

    #[test]
    fn test_protocol_failure_passes_through() {
        let err = classify_connect_error(&endpoint(), false, WsError::ConnectionClosed);
        assert!(matches!(err, Error::WebSocket(_)));
        assert!(err.is_connection_error());
    }
}
