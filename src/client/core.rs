//! WebSocket client facade and connection state machine.
//!
//! [`WebSocketClient`] is the only type applications touch. It owns one
//! [`ListenerRegistry`] and the state of one logical connection, drives the
//! injected [`Transport`], and forwards transport events into listener
//! dispatch.
//!
//! # Connection Lifecycle
//!
//! 1. `connect(url)`: validate the URL, open the transport (the trust
//!    policy runs inside the handshake), dispatch `open` on success. The
//!    returned future settles exactly once; later transport events flow
//!    only through the event channels.
//! 2. Inbound frames: a per-connection dispatch task forwards them to
//!    listeners in arrival order; no two dispatches for one client run
//!    concurrently.
//! 3. `close()`: request a graceful close, wait for the acknowledgement
//!    with a bounded timeout, dispatch `close` exactly once, then tear down
//!    every listener.
//!
//! A connection failure is terminal for that connection; there is no
//! automatic retry. The client itself is reusable: `connect` is permitted
//! again once the previous connection reached Closed or Failed.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, warn};
use url::Url;

use crate::client::state::ConnectionState;
use crate::error::{Error, Result};
use crate::event::{Event, EventKind};
use crate::registry::{ListenerRegistry, SubscriptionHandle};
use crate::transport::{Frame, Transport, TransportEvent};
use crate::trust::TrustPolicy;

// ============================================================================
// Constants
// ============================================================================

/// Value the `connect` future resolves with on success.
const CONNECT_ACK: &str = "Connected";

/// WebSocket close code for normal closure.
const NORMAL_CLOSURE: u16 = 1000;

// ============================================================================
// Shared State
// ============================================================================

/// Connection state shared between the facade and the dispatch task.
struct Shared {
    /// Current lifecycle state.
    state: ConnectionState,
    /// Endpoint of the current connection, set at connect time.
    url: Option<Url>,
    /// Connection generation. Bumped on every connect attempt and on a
    /// close that cancels one, so stale tasks and racing connect/close
    /// resolve deterministically.
    epoch: u64,
    /// Outbound frame sender of the active connection.
    outbound: Option<mpsc::UnboundedSender<Frame>>,
    /// Dispatch task of the active connection.
    dispatch_task: Option<JoinHandle<()>>,
}

// ============================================================================
// WebSocketClient
// ============================================================================

/// Event-driven WebSocket client with a pluggable certificate trust policy.
///
/// # Thread Safety
///
/// `WebSocketClient` is `Send + Sync`. Listener registration and removal
/// may happen from any thread, concurrently with dispatch.
pub struct WebSocketClient {
    transport: Arc<dyn Transport>,
    trust: Arc<dyn TrustPolicy>,
    registry: Arc<ListenerRegistry>,
    close_timeout: Duration,
    shared: Arc<Mutex<Shared>>,
}

impl WebSocketClient {
    /// Creates a builder for configuring a client.
    #[inline]
    #[must_use]
    pub fn builder() -> crate::client::builder::ClientBuilder {
        crate::client::builder::ClientBuilder::new()
    }

    /// Creates a client from validated configuration.
    ///
    /// Called by [`ClientBuilder::build`](crate::ClientBuilder::build).
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        trust: Arc<dyn TrustPolicy>,
        close_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            trust,
            registry: Arc::new(ListenerRegistry::new()),
            close_timeout,
            shared: Arc::new(Mutex::new(Shared {
                state: ConnectionState::Idle,
                url: None,
                epoch: 0,
                outbound: None,
                dispatch_task: None,
            })),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    /// Returns the endpoint of the current (or last) connection.
    #[must_use]
    pub fn url(&self) -> Option<Url> {
        self.shared.lock().url.clone()
    }

    /// Returns the number of active listener subscriptions.
    #[inline]
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns the configured close acknowledgement timeout.
    #[inline]
    #[must_use]
    pub fn close_timeout(&self) -> Duration {
        self.close_timeout
    }

    // ========================================================================
    // Connect
    // ========================================================================

    /// Connects to the WebSocket server at `url`.
    ///
    /// Suspends until the transport signals open or failure; the result
    /// settles exactly once per call. On success the `open` event is
    /// dispatched and the call resolves with an acknowledgement string.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidEndpoint`] for a malformed URL or unsupported
    ///   scheme, synchronously, without touching the connection state
    /// - [`Error::InvalidOperation`] while a connection is already
    ///   Connecting, Open, or Closing (rejected, not queued)
    /// - [`Error::TrustRejected`] if the trust policy declined the peer
    ///   certificate; an `error` event is dispatched as well
    /// - [`Error::Connection`] for network-level handshake failures
    /// - [`Error::ConnectionClosed`] if `close` raced this attempt
    pub async fn connect(&self, url: &str) -> Result<String> {
        let parsed =
            Url::parse(url).map_err(|e| Error::invalid_endpoint(url, e.to_string()))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(Error::invalid_endpoint(
                url,
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }

        let epoch = {
            let mut shared = self.shared.lock();
            if !shared.state.can_connect() {
                return Err(Error::invalid_operation("connect", shared.state));
            }
            shared.epoch += 1;
            shared.state = ConnectionState::Connecting;
            shared.url = Some(parsed.clone());
            shared.outbound = None;
            shared.dispatch_task = None;
            shared.epoch
        };

        debug!(url = %parsed, "connecting");

        let link = match self.transport.open(&parsed, Arc::clone(&self.trust)).await {
            Ok(link) => link,
            Err(e) => {
                let failed = {
                    let mut shared = self.shared.lock();
                    if shared.epoch == epoch && shared.state == ConnectionState::Connecting {
                        shared.state = ConnectionState::Failed;
                        true
                    } else {
                        false
                    }
                };

                if failed {
                    error!(url = %parsed, error = %e, "connect failed");
                    self.registry.dispatch(&Event::Error(e.to_string()));
                    return Err(e);
                }

                // close() raced this attempt and already settled the state
                return Err(Error::ConnectionClosed);
            }
        };

        let (opened_tx, opened_rx) = oneshot::channel();
        {
            let mut shared = self.shared.lock();
            if shared.epoch != epoch || shared.state != ConnectionState::Connecting {
                // close() won the race; drop the link so the transport
                // winds down
                debug!(url = %parsed, "connect cancelled by close");
                return Err(Error::ConnectionClosed);
            }
            shared.state = ConnectionState::Open;
            shared.outbound = Some(link.outbound);
            shared.dispatch_task = Some(tokio::spawn(run_dispatch_loop(
                link.inbound,
                Arc::clone(&self.registry),
                Arc::clone(&self.shared),
                epoch,
                opened_tx,
            )));
        }

        // The loop task dispatches `open`; resolving only after it has done
        // so keeps every dispatch for this connection on that one task and
        // ahead of the first inbound frame.
        let _ = opened_rx.await;
        debug!(url = %parsed, "connection open");
        Ok(CONNECT_ACK.to_string())
    }

    // ========================================================================
    // Send
    // ========================================================================

    /// Sends a text message.
    ///
    /// A transport-level delivery failure surfaces as a non-fatal `error`
    /// event; the connection stays Open.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidOperation`] while the connection is not Open (no
    ///   buffering; never a silent success)
    /// - [`Error::SendFailed`] if the transport task is gone
    pub fn send(&self, message: impl Into<String>) -> Result<()> {
        self.send_frame(Frame::Text(message.into()), "send")
    }

    /// Sends a binary message.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub fn send_binary(&self, data: impl Into<Vec<u8>>) -> Result<()> {
        self.send_frame(Frame::Binary(data.into()), "send binary")
    }

    fn send_frame(&self, frame: Frame, operation: &str) -> Result<()> {
        let shared = self.shared.lock();
        if !shared.state.is_open() {
            return Err(Error::invalid_operation(operation, shared.state));
        }
        let outbound = shared.outbound.as_ref().ok_or(Error::ConnectionClosed)?;
        outbound
            .send(frame)
            .map_err(|_| Error::send_failed("transport task stopped"))
    }

    // ========================================================================
    // Close
    // ========================================================================

    /// Closes the connection and tears down every listener.
    ///
    /// Idempotent: closing an already-closed (or never-opened) client is a
    /// no-op apart from the listener teardown, and the `close` event is
    /// dispatched at most once per connection. Waits for the close
    /// acknowledgement up to the configured timeout; on expiry the
    /// connection is forced to Closed and a non-fatal `error` event is
    /// dispatched. Never fails observably.
    ///
    /// Safely interrupts an in-flight `connect`: the racing connect call
    /// settles with [`Error::ConnectionClosed`].
    pub async fn close(&self) {
        let (outbound, task) = {
            let mut shared = self.shared.lock();
            match shared.state {
                ConnectionState::Idle | ConnectionState::Closed | ConnectionState::Failed => {
                    drop(shared);
                    self.registry.unsubscribe_all(None);
                    return;
                }

                ConnectionState::Connecting => {
                    // Cancel the in-flight connect; the epoch bump makes
                    // the pending attempt resolve as closed.
                    shared.state = ConnectionState::Closing;
                    shared.epoch += 1;
                    (shared.outbound.take(), shared.dispatch_task.take())
                }

                ConnectionState::Open | ConnectionState::Closing => {
                    shared.state = ConnectionState::Closing;
                    (shared.outbound.take(), shared.dispatch_task.take())
                }
            }
        };

        if let Some(outbound) = outbound {
            let _ = outbound.send(Frame::Close {
                code: NORMAL_CLOSURE,
                reason: None,
            });
        }

        if let Some(mut task) = task
            && timeout(self.close_timeout, &mut task).await.is_err()
        {
            warn!(
                timeout = ?self.close_timeout,
                "close acknowledgement timed out; forcing closed"
            );
            // The loop task must be stopped before dispatching from here;
            // there is only ever one dispatch context per client.
            task.abort();
            let _ = task.await;
            self.registry
                .dispatch(&Event::Error("close acknowledgement timed out".into()));
        }

        // The dispatch task normally performs this transition when the
        // transport acknowledges; this is the forced path (timeout, or a
        // close with no live connection behind it).
        let force_closed = {
            let mut shared = self.shared.lock();
            if shared.state.is_terminal() {
                false
            } else {
                shared.state = ConnectionState::Closed;
                shared.outbound = None;
                true
            }
        };
        if force_closed {
            self.registry.dispatch(&Event::Close);
        }

        debug!("connection closed; tearing down listeners");
        self.registry.unsubscribe_all(None);
    }

    // ========================================================================
    // Listener Registration
    // ========================================================================

    /// Registers a callback for the `open` event. Never fails.
    pub fn on_open(&self, callback: impl Fn() + Send + Sync + 'static) -> SubscriptionHandle {
        self.registry.subscribe(EventKind::Open, move |event| {
            if matches!(event, Event::Open) {
                callback();
            }
        })
    }

    /// Registers a callback for the `message` event (text payload).
    pub fn on_message(
        &self,
        callback: impl Fn(&str) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        self.registry.subscribe(EventKind::Message, move |event| {
            if let Event::Message(text) = event {
                callback(text);
            }
        })
    }

    /// Registers a callback for the `binaryMessage` event (byte payload).
    pub fn on_binary_message(
        &self,
        callback: impl Fn(&[u8]) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        self.registry
            .subscribe(EventKind::BinaryMessage, move |event| {
                if let Event::BinaryMessage(data) = event {
                    callback(data);
                }
            })
    }

    /// Registers a callback for the `close` event.
    pub fn on_close(&self, callback: impl Fn() + Send + Sync + 'static) -> SubscriptionHandle {
        self.registry.subscribe(EventKind::Close, move |event| {
            if matches!(event, Event::Close) {
                callback();
            }
        })
    }

    /// Registers a callback for the `error` event (description payload).
    pub fn on_error(
        &self,
        callback: impl Fn(&str) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        self.registry.subscribe(EventKind::Error, move |event| {
            if let Event::Error(description) = event {
                callback(description);
            }
        })
    }

    /// Removes one subscription. Idempotent.
    #[inline]
    pub fn off(&self, handle: SubscriptionHandle) {
        self.registry.unsubscribe(handle);
    }

    /// Removes subscriptions in bulk: every subscription for `kind`, or
    /// every subscription for every kind with `None`.
    #[inline]
    pub fn off_all(&self, kind: Option<EventKind>) {
        self.registry.unsubscribe_all(kind);
    }
}

// ============================================================================
// Dispatch Loop
// ============================================================================

/// Forwards transport events into listener dispatch for one connection.
///
/// Runs as the single dispatch context of the client: the `open` event and
/// every transport event reach listeners from this task, in arrival order
/// and never concurrently. Terminates on the first terminal transport event
/// or when the channel drains.
async fn run_dispatch_loop(
    mut inbound: mpsc::UnboundedReceiver<TransportEvent>,
    registry: Arc<ListenerRegistry>,
    shared: Arc<Mutex<Shared>>,
    epoch: u64,
    opened: oneshot::Sender<()>,
) {
    // Open is dispatched here, before any inbound frame, so a frame the
    // server sends immediately can never overtake it.
    registry.dispatch(&Event::Open);
    let _ = opened.send(());

    while let Some(event) = inbound.recv().await {
        match event {
            TransportEvent::Text(text) => {
                if connection_live(&shared, epoch) {
                    registry.dispatch(&Event::Message(text));
                }
            }

            TransportEvent::Binary(data) => {
                if connection_live(&shared, epoch) {
                    registry.dispatch(&Event::BinaryMessage(data));
                }
            }

            TransportEvent::Error(description) => {
                if connection_live(&shared, epoch) {
                    registry.dispatch(&Event::Error(description));
                }
            }

            TransportEvent::Closed => {
                if settle_terminal(&shared, epoch, ConnectionState::Closed) {
                    registry.dispatch(&Event::Close);
                }
                break;
            }

            TransportEvent::Failed(description) => {
                if settle_terminal(&shared, epoch, ConnectionState::Failed) {
                    error!(error = %description, "connection failed");
                    registry.dispatch(&Event::Error(description));
                    // The transport has torn down; surface the closure too
                    registry.dispatch(&Event::Close);
                }
                break;
            }
        }
    }

    debug!(epoch, "dispatch loop terminated");
}

/// Returns `true` while this connection generation is still the live one.
fn connection_live(shared: &Arc<Mutex<Shared>>, epoch: u64) -> bool {
    let shared = shared.lock();
    shared.epoch == epoch
        && matches!(
            shared.state,
            ConnectionState::Open | ConnectionState::Closing
        )
}

/// Transitions this connection generation to a terminal state.
///
/// Returns `true` only for the transition that actually happened, so the
/// corresponding `close` event is dispatched exactly once.
fn settle_terminal(
    shared: &Arc<Mutex<Shared>>,
    epoch: u64,
    next: ConnectionState,
) -> bool {
    let mut shared = shared.lock();
    if shared.epoch == epoch && !shared.state.is_terminal() {
        debug!(from = %shared.state, to = %next, "connection reached terminal state");
        shared.state = next;
        shared.outbound = None;
        true
    } else {
        false
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rustls::pki_types::CertificateDer;
    use tokio::sync::Notify;

    use crate::transport::TransportLink;
    use crate::trust::{AcceptAllCerts, TrustDecision};

    // ------------------------------------------------------------------------
    // Mock transport
    // ------------------------------------------------------------------------

    /// Control handle for one mock connection.
    #[derive(Clone)]
    struct MockRemote {
        inbound: mpsc::UnboundedSender<TransportEvent>,
        sent: Arc<Mutex<Vec<Frame>>>,
    }

    impl MockRemote {
        fn emit(&self, event: TransportEvent) {
            self.inbound.send(event).expect("dispatch loop gone");
        }

        fn sent_frames(&self) -> Vec<Frame> {
            self.sent.lock().clone()
        }
    }

    /// Channel-backed transport standing in for the remote end.
    ///
    /// Consults the trust policy once per open with a fixed mock
    /// certificate, mirroring the handshake, and acknowledges close
    /// requests like a well-behaved server.
    struct MockTransport {
        remote: Arc<Mutex<Option<MockRemote>>>,
        open_count: Arc<AtomicUsize>,
        gate: Option<Arc<Notify>>,
        ack_close: bool,
        preload: Vec<TransportEvent>,
    }

    impl MockTransport {
        fn new() -> (Self, Arc<Mutex<Option<MockRemote>>>, Arc<AtomicUsize>) {
            let remote = Arc::new(Mutex::new(None));
            let open_count = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    remote: Arc::clone(&remote),
                    open_count: Arc::clone(&open_count),
                    gate: None,
                    ack_close: true,
                    preload: Vec::new(),
                },
                remote,
                open_count,
            )
        }

        fn gated() -> (Self, Arc<Mutex<Option<MockRemote>>>, Arc<Notify>) {
            let (mut transport, remote, _) = Self::new();
            let gate = Arc::new(Notify::new());
            transport.gate = Some(Arc::clone(&gate));
            (transport, remote, gate)
        }

        /// Server that swallows close requests instead of acknowledging.
        fn unresponsive() -> (Self, Arc<Mutex<Option<MockRemote>>>) {
            let (mut transport, remote, _) = Self::new();
            transport.ack_close = false;
            (transport, remote)
        }

        /// Server that has events queued before the handshake resolves.
        fn preloaded(events: Vec<TransportEvent>) -> Self {
            let (mut transport, _, _) = Self::new();
            transport.preload = events;
            transport
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn open(&self, _url: &Url, trust: Arc<dyn TrustPolicy>) -> Result<TransportLink> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }

            let cert = CertificateDer::from(b"mock-certificate".to_vec());
            if trust.evaluate(&cert, &[]) == TrustDecision::Reject {
                return Err(Error::TrustRejected);
            }

            self.open_count.fetch_add(1, Ordering::SeqCst);

            let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Frame>();
            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
            let sent = Arc::new(Mutex::new(Vec::new()));

            let remote = MockRemote {
                inbound: inbound_tx.clone(),
                sent: Arc::clone(&sent),
            };
            *self.remote.lock() = Some(remote);

            for event in &self.preload {
                let _ = inbound_tx.send(event.clone());
            }

            let ack_close = self.ack_close;
            tokio::spawn(async move {
                while let Some(frame) = outbound_rx.recv().await {
                    let is_close = matches!(frame, Frame::Close { .. });
                    sent.lock().push(frame);
                    if is_close && ack_close {
                        let _ = inbound_tx.send(TransportEvent::Closed);
                        break;
                    }
                }
            });

            Ok(TransportLink {
                outbound: outbound_tx,
                inbound: inbound_rx,
            })
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn mock_client() -> (WebSocketClient, Arc<Mutex<Option<MockRemote>>>, Arc<AtomicUsize>) {
        let (transport, remote, opens) = MockTransport::new();
        let client = WebSocketClient::builder()
            .transport(transport)
            .trust_policy(AcceptAllCerts::new())
            .close_timeout(Duration::from_millis(500))
            .build()
            .expect("build client");
        (client, remote, opens)
    }

    fn remote_of(slot: &Arc<Mutex<Option<MockRemote>>>) -> MockRemote {
        slot.lock().clone().expect("connection opened")
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..400 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached within timeout");
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    /// Reject-everything policy for the trust tests.
    struct RejectAll;

    impl TrustPolicy for RejectAll {
        fn evaluate(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
        ) -> TrustDecision {
            TrustDecision::Reject
        }
    }

    // ------------------------------------------------------------------------
    // Connect
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_connect_resolves_with_ack() {
        let (client, _remote, _) = mock_client();
        let (opens, on_open) = counter();
        client.on_open(on_open);

        let ack = client.connect("wss://example.test:8443").await.expect("connect");
        assert_eq!(ack, "Connected");
        assert_eq!(client.state(), ConnectionState::Open);
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_fails_synchronously() {
        let (client, _remote, opens) = mock_client();

        let err = client.connect("not a url").await.expect_err("must fail");
        assert!(matches!(err, Error::InvalidEndpoint { .. }));

        let err = client.connect("https://example.test").await.expect_err("must fail");
        assert!(matches!(err, Error::InvalidEndpoint { .. }));

        // State untouched, no transport activity
        assert_eq!(client.state(), ConnectionState::Idle);
        assert_eq!(opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_connect_rejected() {
        let (client, _remote, opens) = mock_client();
        client.connect("wss://example.test").await.expect("connect");

        let err = client.connect("wss://other.test").await.expect_err("must reject");
        assert!(err.is_invalid_operation());

        // First connection untouched, no second transport
        assert_eq!(client.state(), ConnectionState::Open);
        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(client.url().expect("url").as_str(), "wss://example.test/");
    }

    #[tokio::test]
    async fn test_trust_rejected_connect() {
        let (transport, _remote, _) = MockTransport::new();
        let client = WebSocketClient::builder()
            .transport(transport)
            .trust_policy(RejectAll)
            .build()
            .expect("build client");

        let (opens, on_open) = counter();
        client.on_open(on_open);
        let errors = Arc::new(Mutex::new(Vec::new()));
        let errors_inner = Arc::clone(&errors);
        client.on_error(move |desc| errors_inner.lock().push(desc.to_owned()));

        let err = client.connect("wss://host").await.expect_err("must fail");
        assert!(err.is_trust_rejected());
        assert_eq!(client.state(), ConnectionState::Failed);

        // No open event ever; the failure surfaced as an error event
        assert_eq!(opens.load(Ordering::SeqCst), 0);
        assert_eq!(errors.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_open_dispatched_before_queued_frames() {
        // A server that sends a frame the instant the handshake completes
        // must never have that frame overtake the open event.
        let transport = MockTransport::preloaded(vec![TransportEvent::Text("early".into())]);
        let client = WebSocketClient::builder()
            .transport(transport)
            .trust_policy(AcceptAllCerts::new())
            .build()
            .expect("build client");

        let log = Arc::new(Mutex::new(Vec::new()));
        let log_open = Arc::clone(&log);
        client.on_open(move || log_open.lock().push("open".to_owned()));
        let log_msg = Arc::clone(&log);
        client.on_message(move |text| log_msg.lock().push(format!("message:{text}")));

        client.connect("wss://example.test").await.expect("connect");

        // The open event is already delivered when connect resolves
        assert_eq!(log.lock().first().map(String::as_str), Some("open"));

        wait_until(|| log.lock().len() == 2).await;
        assert_eq!(*log.lock(), vec!["open", "message:early"]);
    }

    #[tokio::test]
    async fn test_connect_again_after_close() {
        let (client, _remote, opens) = mock_client();

        client.connect("wss://example.test").await.expect("first connect");
        client.close().await;
        assert_eq!(client.state(), ConnectionState::Closed);

        let ack = client.connect("wss://example.test").await.expect("reconnect");
        assert_eq!(ack, "Connected");
        assert_eq!(client.state(), ConnectionState::Open);
        assert_eq!(opens.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_connect_again_after_failure() {
        let (client, remote, _) = mock_client();
        client.connect("wss://example.test").await.expect("connect");

        remote_of(&remote).emit(TransportEvent::Failed("connection reset".into()));
        wait_until(|| client.state() == ConnectionState::Failed).await;

        client.connect("wss://example.test").await.expect("reconnect");
        assert_eq!(client.state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_close_racing_connect_resolves_deterministically() {
        let (transport, _remote, gate) = MockTransport::gated();
        let client = Arc::new(
            WebSocketClient::builder()
                .transport(transport)
                .trust_policy(AcceptAllCerts::new())
                .build()
                .expect("build client"),
        );

        let (closes, on_close) = counter();
        client.on_close(on_close);

        let connecting = Arc::clone(&client);
        let pending = tokio::spawn(async move { connecting.connect("wss://example.test").await });

        wait_until(|| client.state() == ConnectionState::Connecting).await;
        client.close().await;
        assert_eq!(client.state(), ConnectionState::Closed);

        // Release the handshake; the pending connect must settle with an
        // error, not hang or revive the connection
        gate.notify_one();
        let result = pending.await.expect("join");
        assert!(matches!(result, Err(Error::ConnectionClosed)));
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    // ------------------------------------------------------------------------
    // Send
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_send_forwards_exact_payload() {
        let (client, remote, _) = mock_client();
        client.connect("wss://example.test").await.expect("connect");

        client.send("ping").expect("send");
        let remote = remote_of(&remote);
        wait_until(|| !remote.sent_frames().is_empty()).await;
        assert_eq!(remote.sent_frames(), vec![Frame::Text("ping".into())]);
    }

    #[tokio::test]
    async fn test_send_binary_forwards_exact_bytes() {
        let (client, remote, _) = mock_client();
        client.connect("wss://example.test").await.expect("connect");

        client.send_binary(vec![0x01, 0x02, 0x03]).expect("send");
        let remote = remote_of(&remote);
        wait_until(|| !remote.sent_frames().is_empty()).await;
        assert_eq!(remote.sent_frames(), vec![Frame::Binary(vec![0x01, 0x02, 0x03])]);
    }

    #[tokio::test]
    async fn test_send_while_not_open_is_rejected() {
        let (client, _remote, _) = mock_client();

        let err = client.send("early").expect_err("must reject");
        assert!(err.is_invalid_operation());

        client.connect("wss://example.test").await.expect("connect");
        client.close().await;

        let err = client.send("late").expect_err("must reject");
        assert!(err.is_invalid_operation());
    }

    #[tokio::test]
    async fn test_send_failure_is_not_fatal() {
        let (client, remote, _) = mock_client();
        client.connect("wss://example.test").await.expect("connect");

        let errors = Arc::new(Mutex::new(Vec::new()));
        let errors_inner = Arc::clone(&errors);
        client.on_error(move |desc| errors_inner.lock().push(desc.to_owned()));

        remote_of(&remote).emit(TransportEvent::Error("send failed: broken pipe".into()));
        wait_until(|| !errors.lock().is_empty()).await;

        // Connection stays open after a reported send failure
        assert_eq!(client.state(), ConnectionState::Open);
    }

    // ------------------------------------------------------------------------
    // Receive
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_frames_dispatch_in_arrival_order() {
        let (client, remote, _) = mock_client();
        client.connect("wss://example.test").await.expect("connect");

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_inner = Arc::clone(&seen);
        client.on_message(move |text| seen_inner.lock().push(text.to_owned()));

        let remote = remote_of(&remote);
        for payload in ["A", "B", "C"] {
            remote.emit(TransportEvent::Text(payload.into()));
        }

        wait_until(|| seen.lock().len() == 3).await;
        assert_eq!(*seen.lock(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_binary_frames_are_not_text_decoded() {
        let (client, remote, _) = mock_client();
        client.connect("wss://example.test").await.expect("connect");

        let binary = Arc::new(Mutex::new(Vec::new()));
        let binary_inner = Arc::clone(&binary);
        client.on_binary_message(move |data| binary_inner.lock().push(data.to_vec()));
        let (texts, on_message) = counter();
        client.on_message(move |_| on_message());

        remote_of(&remote).emit(TransportEvent::Binary(vec![0x01, 0x02, 0x03]));
        wait_until(|| !binary.lock().is_empty()).await;

        assert_eq!(*binary.lock(), vec![vec![0x01, 0x02, 0x03]]);
        assert_eq!(texts.load(Ordering::SeqCst), 0);
    }

    // ------------------------------------------------------------------------
    // Close
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (client, _remote, _) = mock_client();
        client.connect("wss://example.test").await.expect("connect");

        let (closes, on_close) = counter();
        client.on_close(on_close);

        client.close().await;
        client.close().await;

        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_listeners_torn_down_on_close() {
        let (client, remote, _) = mock_client();
        client.connect("wss://example.test").await.expect("connect");

        let (hits, on_any) = counter();
        for _ in 0..2 {
            let on_any = {
                let hits = Arc::clone(&hits);
                move || {
                    hits.fetch_add(1, Ordering::SeqCst);
                }
            };
            client.on_open(on_any);
        }
        let hits_msg = Arc::clone(&hits);
        client.on_message(move |_| {
            hits_msg.fetch_add(1, Ordering::SeqCst);
        });
        let hits_err = Arc::clone(&hits);
        client.on_error(move |_| {
            hits_err.fetch_add(1, Ordering::SeqCst);
        });
        client.on_close(on_any);
        assert_eq!(client.subscription_count(), 5);

        let remote = remote_of(&remote);
        client.close().await;
        assert_eq!(client.subscription_count(), 0);

        // A simulated transport event after close reaches zero listeners
        let before = hits.load(Ordering::SeqCst);
        let _ = remote.inbound.send(TransportEvent::Text("late".into()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn test_off_is_idempotent() {
        let (client, _remote, _) = mock_client();
        let (hits, on_message) = counter();
        let handle = client.on_message(move |_| on_message());

        client.off(handle);
        client.off(handle);
        assert_eq!(client.subscription_count(), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_close_timeout_forces_closed() {
        let (transport, remote) = MockTransport::unresponsive();
        let client = WebSocketClient::builder()
            .transport(transport)
            .trust_policy(AcceptAllCerts::new())
            .close_timeout(Duration::from_millis(100))
            .build()
            .expect("build client");

        client.connect("wss://example.test").await.expect("connect");

        let (closes, on_close) = counter();
        client.on_close(on_close);
        let errors = Arc::new(Mutex::new(Vec::new()));
        let errors_inner = Arc::clone(&errors);
        client.on_error(move |desc| errors_inner.lock().push(desc.to_owned()));

        // The server never acknowledges; close must still return, force the
        // terminal state, and report the expiry as a non-fatal error
        client.close().await;

        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(*errors.lock(), vec!["close acknowledgement timed out"]);
        assert_eq!(client.subscription_count(), 0);

        // The close request itself did reach the transport
        let remote = remote_of(&remote);
        assert!(matches!(
            remote.sent_frames().last(),
            Some(Frame::Close { code: 1000, .. })
        ));
    }

    #[tokio::test]
    async fn test_remote_close_dispatches_close_once() {
        let (client, remote, _) = mock_client();
        client.connect("wss://example.test").await.expect("connect");

        let (closes, on_close) = counter();
        client.on_close(on_close);

        remote_of(&remote).emit(TransportEvent::Closed);
        wait_until(|| client.state() == ConnectionState::Closed).await;
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        // A later explicit close neither fails nor re-dispatches
        client.close().await;
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_emits_error_then_close() {
        let (client, remote, _) = mock_client();
        client.connect("wss://example.test").await.expect("connect");

        let log = Arc::new(Mutex::new(Vec::new()));
        let log_err = Arc::clone(&log);
        client.on_error(move |desc| log_err.lock().push(format!("error:{desc}")));
        let log_close = Arc::clone(&log);
        client.on_close(move || log_close.lock().push("close".into()));

        remote_of(&remote).emit(TransportEvent::Failed("connection reset".into()));
        wait_until(|| log.lock().len() == 2).await;

        assert_eq!(*log.lock(), vec!["error:connection reset", "close"]);
        assert_eq!(client.state(), ConnectionState::Failed);
    }

    #[tokio::test]
    async fn test_close_before_connect_is_a_no_op() {
        let (client, _remote, _) = mock_client();
        let (closes, on_close) = counter();
        client.on_close(on_close);

        client.close().await;
        assert_eq!(client.state(), ConnectionState::Idle);
        assert_eq!(closes.load(Ordering::SeqCst), 0);
        assert_eq!(client.subscription_count(), 0);
    }

    // ------------------------------------------------------------------------
    // End-to-end
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_full_text_round_trip() {
        let (client, remote, _) = mock_client();

        let messages = Arc::new(Mutex::new(Vec::new()));
        let messages_inner = Arc::clone(&messages);
        client.on_message(move |text| messages_inner.lock().push(text.to_owned()));
        let (closes, on_close) = counter();
        client.on_close(on_close);

        let ack = client.connect("wss://example.test:8443").await.expect("connect");
        assert_eq!(ack, "Connected");

        client.send("ping").expect("send");
        let remote = remote_of(&remote);
        wait_until(|| !remote.sent_frames().is_empty()).await;
        assert_eq!(remote.sent_frames(), vec![Frame::Text("ping".into())]);

        remote.emit(TransportEvent::Text("pong".into()));
        wait_until(|| !messages.lock().is_empty()).await;
        assert_eq!(*messages.lock(), vec!["pong"]);

        client.close().await;
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(client.subscription_count(), 0);
    }
}
