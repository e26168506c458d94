//! rustls certificate verifier delegating to a [`TrustPolicy`].
//!
//! The verifier replaces rustls' chain validation wholesale: the policy is
//! the sole authority over the presented certificates. TLS signature checks
//! (proof of key possession) still run through the crypto provider, so an
//! accepted peer must actually hold the key of the certificate it presented.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, DigitallySignedStruct, SignatureScheme};
use tracing::debug;

use crate::trust::policy::{TrustDecision, TrustPolicy};

// ============================================================================
// PolicyVerifier
// ============================================================================

/// Bridges a [`TrustPolicy`] into the rustls handshake.
///
/// Records rejections in a shared flag so the transport can distinguish a
/// policy rejection from a generic TLS failure after the handshake error
/// surfaces.
pub(crate) struct PolicyVerifier {
    policy: Arc<dyn TrustPolicy>,
    provider: Arc<CryptoProvider>,
    rejected: Arc<AtomicBool>,
}

impl PolicyVerifier {
    /// Creates a verifier around the given policy.
    pub(crate) fn new(
        policy: Arc<dyn TrustPolicy>,
        provider: Arc<CryptoProvider>,
        rejected: Arc<AtomicBool>,
    ) -> Self {
        Self {
            policy,
            provider,
            rejected,
        }
    }
}

impl fmt::Debug for PolicyVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyVerifier")
            .field("rejected", &self.rejected.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl ServerCertVerifier for PolicyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        match self.policy.evaluate(end_entity, intermediates) {
            TrustDecision::Accept => {
                debug!(server = ?server_name, "trust policy accepted peer certificate");
                Ok(ServerCertVerified::assertion())
            }
            TrustDecision::Reject => {
                self.rejected.store(true, Ordering::Release);
                Err(rustls::Error::InvalidCertificate(
                    CertificateError::ApplicationVerificationFailure,
                ))
            }
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::trust::policy::{AcceptAllCerts, PinnedCertificate};

    fn provider() -> Arc<CryptoProvider> {
        Arc::new(rustls::crypto::aws_lc_rs::default_provider())
    }

    fn verify(
        verifier: &PolicyVerifier,
        der: &[u8],
    ) -> Result<ServerCertVerified, rustls::Error> {
        let cert = CertificateDer::from(der.to_vec());
        let name = ServerName::try_from("localhost").expect("server name");
        verifier.verify_server_cert(&cert, &[], &name, &[], UnixTime::now())
    }

    #[test]
    fn test_accept_all_passes_handshake() {
        let rejected = Arc::new(AtomicBool::new(false));
        let verifier = PolicyVerifier::new(
            Arc::new(AcceptAllCerts::new()),
            provider(),
            Arc::clone(&rejected),
        );

        assert!(verify(&verifier, b"anything").is_ok());
        assert!(!rejected.load(Ordering::Acquire));
    }

    #[test]
    fn test_rejection_sets_flag() {
        let rejected = Arc::new(AtomicBool::new(false));
        let verifier = PolicyVerifier::new(
            Arc::new(PinnedCertificate::from_der(b"expected".to_vec())),
            provider(),
            Arc::clone(&rejected),
        );

        let err = verify(&verifier, b"presented").expect_err("must reject");
        assert!(matches!(
            err,
            rustls::Error::InvalidCertificate(CertificateError::ApplicationVerificationFailure)
        ));
        assert!(rejected.load(Ordering::Acquire));
    }

    #[test]
    fn test_supported_schemes_not_empty() {
        let verifier = PolicyVerifier::new(
            Arc::new(AcceptAllCerts::new()),
            provider(),
            Arc::new(AtomicBool::new(false)),
        );
        assert!(!verifier.supported_verify_schemes().is_empty());
    }
}
