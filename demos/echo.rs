//! Echo round trip against a self-signed WebSocket server.
//!
//! Demonstrates:
//! - Building a client with the TLS transport and an explicit trust policy
//! - Registering listeners for message, error, and close events
//! - Connect, send, and graceful close
//!
//! Usage:
//!   cargo run --example echo -- wss://127.0.0.1:8443
//!   cargo run --example echo -- wss://127.0.0.1:8443 --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tracing_subscriber::EnvFilter;
use wss_self_signed::{AcceptAllCerts, Result, TlsTransport, WebSocketClient};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let url = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| "wss://127.0.0.1:8443".to_owned());
    init_logging(args.iter().any(|a| a == "--debug"));

    if let Err(e) = run(&url).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(url: &str) -> Result<()> {
    println!("=== Echo Round Trip ===\n");

    // ========================================================================
    // Build Client
    // ========================================================================

    // Accept-all is fine against a local development server; use a pinned
    // policy (PinnedCertificate / PinnedFingerprint) for anything real
    let client = WebSocketClient::builder()
        .transport(TlsTransport::new())
        .trust_policy(AcceptAllCerts::new())
        .build()?;

    client.on_open(|| println!("[Event] open"));
    client.on_message(|text| println!("[Event] message: {text}"));
    client.on_binary_message(|data| println!("[Event] binary: {} bytes", data.len()));
    client.on_error(|desc| println!("[Event] error: {desc}"));
    client.on_close(|| println!("[Event] close"));

    // ========================================================================
    // Connect, Echo, Close
    // ========================================================================

    println!("[Connect] {url}");
    let ack = client.connect(url).await?;
    println!("          ✓ {ack}\n");

    client.send("hello over self-signed TLS")?;
    client.send_binary(vec![0xDE, 0xAD, 0xBE, 0xEF])?;

    // Give the server a moment to echo before closing
    tokio::time::sleep(Duration::from_secs(1)).await;

    client.close().await;
    println!("\n[Done]");
    Ok(())
}

// ============================================================================
// Logging
// ============================================================================

fn init_logging(debug: bool) {
    let filter = if debug {
        "wss_self_signed=debug"
    } else {
        "wss_self_signed=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
