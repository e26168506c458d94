//! Trust policy contract and the bundled policies.
//!
//! A [`TrustPolicy`] is evaluated exactly once per handshake, before any
//! application data flows. Rejecting aborts the connection attempt; it never
//! downgrades to a partial connection.

// ============================================================================
// Imports
// ============================================================================

use rustls::pki_types::CertificateDer;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{Error, Result};

// ============================================================================
// TrustDecision
// ============================================================================

/// Outcome of evaluating a peer certificate chain.
///
/// Transient value: evaluated once per handshake, never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustDecision {
    /// Accept the presented certificate and continue the handshake.
    Accept,
    /// Reject the certificate and abort the connection attempt.
    Reject,
}

impl TrustDecision {
    /// Returns `true` for [`TrustDecision::Accept`].
    #[inline]
    #[must_use]
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

// ============================================================================
// TrustPolicy
// ============================================================================

/// Decides whether to accept a peer certificate during transport setup.
///
/// The end-entity certificate and any presented intermediates are handed
/// over in DER form, exactly as received from the peer. Implementations
/// must be cheap and side-effect free; the transport consults the policy
/// from inside the TLS handshake.
pub trait TrustPolicy: Send + Sync + 'static {
    /// Evaluates the presented certificate chain.
    fn evaluate(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
    ) -> TrustDecision;
}

// ============================================================================
// AcceptAllCerts
// ============================================================================

/// Accepts every peer certificate without any validation.
///
/// This disables host and chain validation entirely: the connection is
/// encrypted but the peer is unauthenticated, so an active
/// man-in-the-middle cannot be detected. It exists for development
/// environments and appliances with self-signed certificates where the
/// endpoint is otherwise trusted.
///
/// It is never a default; constructing it is the explicit opt-in. Prefer
/// [`PinnedCertificate`] or [`PinnedFingerprint`] wherever the expected
/// certificate is known ahead of time.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllCerts;

impl AcceptAllCerts {
    /// Creates the accept-all policy.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TrustPolicy for AcceptAllCerts {
    fn evaluate(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
    ) -> TrustDecision {
        warn!("accepting peer certificate without validation");
        TrustDecision::Accept
    }
}

// ============================================================================
// PinnedCertificate
// ============================================================================

/// Accepts only an exact, byte-for-byte match of the end-entity certificate.
///
/// Intermediates are ignored: the pin is on the leaf the server actually
/// presents, so a rotated or substituted certificate is rejected even when
/// it chains to the same issuer.
#[derive(Debug, Clone)]
pub struct PinnedCertificate {
    der: Vec<u8>,
}

impl PinnedCertificate {
    /// Pins the given DER-encoded certificate.
    #[inline]
    #[must_use]
    pub fn from_der(der: impl Into<Vec<u8>>) -> Self {
        Self { der: der.into() }
    }

    /// Returns the SHA-256 fingerprint of the pinned certificate, hex-encoded.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.der))
    }
}

impl TrustPolicy for PinnedCertificate {
    fn evaluate(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
    ) -> TrustDecision {
        if end_entity.as_ref() == self.der.as_slice() {
            debug!("peer certificate matches pin");
            TrustDecision::Accept
        } else {
            warn!(
                expected = %self.fingerprint(),
                presented = %hex::encode(Sha256::digest(end_entity.as_ref())),
                "peer certificate does not match pin"
            );
            TrustDecision::Reject
        }
    }
}

// ============================================================================
// PinnedFingerprint
// ============================================================================

/// Accepts only an end-entity certificate with a pinned SHA-256 fingerprint.
///
/// Useful when only the fingerprint is distributed, e.g. printed by the
/// server at startup or shared out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinnedFingerprint {
    sha256: [u8; 32],
}

impl PinnedFingerprint {
    /// Pins a raw 32-byte SHA-256 fingerprint.
    #[inline]
    #[must_use]
    pub fn from_bytes(sha256: [u8; 32]) -> Self {
        Self { sha256 }
    }

    /// Pins a hex-encoded SHA-256 fingerprint.
    ///
    /// Accepts the common `aa:bb:cc` colon-separated form as well as plain
    /// hex, case-insensitively.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the string is not 32 bytes of hex.
    pub fn from_hex(fingerprint: &str) -> Result<Self> {
        let normalized: String = fingerprint
            .chars()
            .filter(|c| *c != ':')
            .collect::<String>()
            .to_ascii_lowercase();

        let bytes = hex::decode(&normalized)
            .map_err(|e| Error::config(format!("invalid fingerprint hex: {e}")))?;

        let sha256: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            Error::config(format!(
                "fingerprint must be 32 bytes (SHA-256), got {}",
                b.len()
            ))
        })?;

        Ok(Self { sha256 })
    }

    /// Computes the pin for a DER-encoded certificate.
    #[must_use]
    pub fn of_der(der: &[u8]) -> Self {
        Self {
            sha256: Sha256::digest(der).into(),
        }
    }
}

impl TrustPolicy for PinnedFingerprint {
    fn evaluate(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
    ) -> TrustDecision {
        let presented: [u8; 32] = Sha256::digest(end_entity.as_ref()).into();
        if presented == self.sha256 {
            debug!("peer certificate fingerprint matches pin");
            TrustDecision::Accept
        } else {
            warn!(
                expected = %hex::encode(self.sha256),
                presented = %hex::encode(presented),
                "peer certificate fingerprint does not match pin"
            );
            TrustDecision::Reject
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
