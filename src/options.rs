use std::sync::Arc;

use bytes::Bytes;

use crate::cipher_suite::{CipherSuite, CIPHER_SUITE_PREFERENCES};
use crate::x509::CertificateVerifier;

/// Configuration for how client connections negotiate a handshake with the
/// remote and which credentials they can present.
pub struct ClientOptions {
    /// Offered cipher suites in decreasing order of desirability. The suite
    /// echoed by the server must be a member of this list.
    pub cipher_suites: Vec<CipherSuite>,

    /// Session cache capacity. Zero disables resumption entirely.
    pub max_sessions: usize,

    /// Verifies the server chain and extracts its RSA public key.
    pub certificate_verifier: Arc<dyn CertificateVerifier>,

    /// DER chain (leaf first) presented when the server sends a
    /// CertificateRequest. May be empty when client auth is never expected.
    pub client_certificate: Vec<Bytes>,

    /// Private key matching `client_certificate`; used only to sign
    /// CertificateVerify. Moved into the context's RSA state at creation.
    pub client_private_key: Option<rsa::RsaPrivateKey>,
}

impl ClientOptions {
    pub fn recommended(certificate_verifier: Arc<dyn CertificateVerifier>) -> Self {
        Self {
            cipher_suites: CIPHER_SUITE_PREFERENCES.to_vec(),
            max_sessions: 16,
            certificate_verifier,
            client_certificate: vec![],
            client_private_key: None,
        }
    }
}
