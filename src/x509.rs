use bytes::Bytes;

use crate::error::Result;

/// The server's verified certificate: an opaque handle pairing the DER chain
/// with the RSA public key the premaster secret gets encrypted to.
pub struct PeerCertificate {
    pub chain: Vec<Bytes>,
    pub public_key: rsa::RsaPublicKey,
}

/// Chain verification seam. Implementations check signatures, validity
/// windows and naming against their trust store and hand back the leaf's RSA
/// public key; the handshake driver treats all of that as a black box.
///
/// Failures surface as `Error::BadCertificate`.
pub trait CertificateVerifier: Send + Sync {
    fn process_certificate(&self, chain: &[Bytes]) -> Result<PeerCertificate>;
}
