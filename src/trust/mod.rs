//! Certificate trust policies.
//!
//! This module decides whether a peer certificate is accepted during the
//! TLS handshake, independently of the platform trust store. It is the
//! seam that lets the client talk to servers presenting self-signed or
//! privately-issued certificates.
//!
//! # Policies
//!
//! | Policy | Accepts |
//! |--------|---------|
//! | [`AcceptAllCerts`] | everything (explicit opt-out of validation) |
//! | [`PinnedCertificate`] | one exact end-entity certificate (DER) |
//! | [`PinnedFingerprint`] | end-entity with a pinned SHA-256 fingerprint |
//!
//! There is no implicit default: [`ClientBuilder`](crate::ClientBuilder)
//! requires a policy, so disabling validation is always a visible decision
//! in the caller's code.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `policy` | [`TrustPolicy`] contract and the bundled policies |
//! | `verifier` | rustls [`ServerCertVerifier`] bridge (internal) |
//!
//! [`ServerCertVerifier`]: rustls::client::danger::ServerCertVerifier

// ============================================================================
// Submodules
// ============================================================================

/// Trust policy contract and bundled policies.
pub mod policy;

/// rustls certificate verifier delegating to a [`TrustPolicy`].
pub(crate) mod verifier;

// ============================================================================
// Re-exports
// ============================================================================

pub use policy::{AcceptAllCerts, PinnedCertificate, PinnedFingerprint, TrustDecision, TrustPolicy};
