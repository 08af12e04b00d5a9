use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::OsRng;
use rsa::{Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};

use crate::error::{Error, Result};
use crate::options::ClientOptions;
use crate::session::SessionCache;

/// State shared by every connection a client application opens: the session
/// cache and the RSA signing key, each behind its own lock.
pub struct ClientContext {
    options: ClientOptions,
    pub(crate) sessions: Mutex<SessionCache>,
    rsa: Mutex<RsaContext>,
}

impl ClientContext {
    pub fn new(mut options: ClientOptions) -> Arc<Self> {
        let client_key = options.client_private_key.take();
        let max_sessions = options.max_sessions;

        Arc::new(Self {
            options,
            sessions: Mutex::new(SessionCache::new(max_sessions)),
            rsa: Mutex::new(RsaContext { client_key }),
        })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn max_sessions(&self) -> usize {
        self.options.max_sessions
    }

    pub fn has_client_key(&self) -> bool {
        self.rsa.lock().client_key.is_some()
    }

    /// RSA-encrypts the premaster secret to the server's public key. The
    /// guard scope is exactly the RSA call; never held across I/O.
    pub(crate) fn encrypt_premaster(
        &self,
        peer_key: &RsaPublicKey,
        premaster: &[u8],
    ) -> Result<Vec<u8>> {
        let mut rsa = self.rsa.lock();
        rsa.encrypt_premaster(peer_key, premaster)
    }

    /// Signs the 36 byte transcript digest for CertificateVerify with the
    /// client's private key, under the same lock discipline.
    pub(crate) fn sign_digest(&self, digest: &[u8]) -> Result<Vec<u8>> {
        let mut rsa = self.rsa.lock();
        rsa.sign_digest(digest)
    }
}

/// The RSA operations share one big-number scratch state, which is not
/// re-entrant; `ClientContext` serializes every use of it.
struct RsaContext {
    client_key: Option<RsaPrivateKey>,
}

impl RsaContext {
    fn encrypt_premaster(&mut self, peer_key: &RsaPublicKey, premaster: &[u8]) -> Result<Vec<u8>> {
        let ciphertext = peer_key
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, premaster)
            .map_err(|_| Error::InvalidKey)?;
        if ciphertext.is_empty() {
            return Err(Error::InvalidKey);
        }

        Ok(ciphertext)
    }

    fn sign_digest(&mut self, digest: &[u8]) -> Result<Vec<u8>> {
        let key = self.client_key.as_ref().ok_or(Error::InvalidKey)?;

        // Raw block type 1 padding: TLS 1.0 signatures carry no DigestInfo.
        let signature = key
            .sign(Pkcs1v15Sign::new_unprefixed(), digest)
            .map_err(|_| Error::InvalidKey)?;
        if signature.is_empty() {
            return Err(Error::InvalidKey);
        }

        Ok(signature)
    }
}
