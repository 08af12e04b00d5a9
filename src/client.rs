// Client side of the TLS 1.0 handshake.

use std::sync::Arc;

use bytes::Bytes;
use log::debug;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::connection::{Connection, HandshakeState, HandshakeStatus};
use crate::context::ClientContext;
use crate::error::{Error, Result};
use crate::handshake::{
    CertificateChain, CertificateVerify, ClientHello, ClientKeyExchange, Finished, Handshake,
    HandshakeType, ServerHello, SESSION_ID_SIZE, TLS_1_0_VERSION,
};
use crate::key_schedule::{self, PREMASTER_SECRET_SIZE};
use crate::record_stream::{RecordStream, Transport};

/// Establishes a new TLS connection to a server over an already connected
/// transport, optionally offering to resume a prior session.
///
/// The handshake runs synchronously; the Connection is returned regardless
/// of the outcome and the caller consults `status()`.
pub fn open_client(
    ctx: Arc<ClientContext>,
    transport: Box<dyn Transport>,
    prior_session_id: Option<&[u8]>,
) -> Connection {
    let mut conn = Connection::new(ctx.clone(), RecordStream::new(transport));

    if let Some(id) = prior_session_id {
        if ctx.max_sessions() > 0 && id.len() == SESSION_ID_SIZE {
            conn.session_id = Bytes::copy_from_slice(id);
            conn.session_id_requested = true;
        }
    }

    match conn.records.set_blocking() {
        Ok(()) => drive_handshake(&mut conn),
        Err(e) => conn.set_status(HandshakeStatus::Error(e)),
    }

    conn
}

/// Runs the handshake to completion or first error, emitting a best-effort
/// alert on the way down. The outcome lands in the connection status.
pub(crate) fn drive_handshake(conn: &mut Connection) {
    match connect(conn) {
        Ok(()) => {
            debug!(
                "handshake complete, cipher {:?}",
                conn.negotiated_cipher
            );
            conn.set_status(HandshakeStatus::Ok);
        }
        Err(e) => {
            if let Some((level, description)) = e.alert() {
                if conn.records.send_alert(level, description).is_err() {
                    // Couldn't even tell the peer why we are dying; the
                    // cached session is no longer trustworthy.
                    conn.ctx.sessions.lock().remove(&conn.session_id);
                }
            }
            conn.set_status(HandshakeStatus::Error(e));
        }
    }
}

/// Does the handshaking from the beginning: ClientHello out, then pull
/// messages and advance the state machine until Finished has been sent and
/// received.
fn connect(conn: &mut Connection) -> Result<()> {
    conn.reset_handshake();
    conn.send_client_hello()?;

    while conn.state != HandshakeState::Done {
        let message = conn.records.next_handshake()?;
        conn.dispatch(message)?;
    }

    Ok(())
}

impl Connection {
    /// Blocks for one post-handshake message. A HelloRequest restarts the
    /// full handshake (fresh randoms, reset transcript); anything else is a
    /// protocol violation.
    ///
    /// Application reads are out of scope here, so this is the surface
    /// through which a server-initiated renegotiation is honored.
    pub fn await_renegotiation(&mut self) -> Result<()> {
        let message = self.records.next_handshake()?;
        let handshake = Handshake::parse(&message)?;

        // In the Done state the dispatch table accepts nothing but
        // HelloRequest.
        self.check_expected(handshake.typ())?;

        debug!("server requested renegotiation");
        self.set_status(HandshakeStatus::InProgress);
        drive_handshake(self);

        match self.status() {
            HandshakeStatus::Ok => Ok(()),
            HandshakeStatus::Error(e) => Err(e.clone()),
            HandshakeStatus::InProgress => Err(Error::Internal("handshake did not finish")),
        }
    }

    fn dispatch(&mut self, message: Bytes) -> Result<()> {
        let handshake = Handshake::parse(&message)?;
        self.check_expected(handshake.typ())?;

        // Everything both peers hash lands in the transcript; Finished is
        // verified against the transcript as it stood before the message
        // arrived. HelloRequest never gets this far: the driving loop exits
        // at Done and restarts go through await_renegotiation.
        match handshake {
            Handshake::Finished(finished) => self.process_finished(&finished, message),
            other => {
                self.transcript.push(message);
                match other {
                    Handshake::ServerHello(hello) => self.process_server_hello(hello),
                    Handshake::Certificate(chain) => self.process_certificate(chain),
                    Handshake::CertificateRequest(_) => self.process_cert_req(),
                    Handshake::ServerHelloDone => self.process_server_hello_done(),
                    _ => Err(Error::UnexpectedMessage {
                        got: other.typ(),
                        expected: self.state.describe(),
                    }),
                }
            }
        }
    }

    fn check_expected(&self, typ: HandshakeType) -> Result<()> {
        use crate::connection::HandshakeState::*;

        let ok = match (self.state, typ) {
            (AwaitingServerHello, HandshakeType::ServerHello) => true,
            (AwaitingCertificate, HandshakeType::Certificate) => true,
            (AwaitingCertReqOrHelloDone, HandshakeType::CertificateRequest) => true,
            (AwaitingCertReqOrHelloDone, HandshakeType::ServerHelloDone) => true,
            (AwaitingHelloDone, HandshakeType::ServerHelloDone) => true,
            (AwaitingFinished, HandshakeType::Finished) => true,
            (Done, HandshakeType::HelloRequest) => true,
            _ => false,
        };

        if ok {
            Ok(())
        } else {
            Err(Error::UnexpectedMessage {
                got: typ,
                expected: self.state.describe(),
            })
        }
    }

    /// Sends the initial client hello.
    fn send_client_hello(&mut self) -> Result<()> {
        // Give session resumption a go if the caller asked for it.
        let session_id = if self.session_id_requested {
            self.session_id.clone()
        } else {
            Bytes::new()
        };

        let hello = ClientHello::generate(session_id, self.ctx.options().cipher_suites.clone());
        self.client_random = hello.random;

        // Cleared so it can be set again if the server echoes the id back.
        self.session_id_requested = false;

        self.send_handshake_message(&Handshake::ClientHello(hello))
    }

    fn send_handshake_message(&mut self, handshake: &Handshake) -> Result<()> {
        let message = handshake.to_bytes();
        self.records.send_handshake(&message)?;
        self.transcript.push(message);
        Ok(())
    }

    /// Processes the server hello.
    fn process_server_hello(&mut self, hello: ServerHello) -> Result<()> {
        // Check that we are talking to a TLS 1.0 server.
        if hello.version != TLS_1_0_VERSION {
            return Err(Error::InvalidVersion {
                major: hello.version.major,
                minor: hello.version.minor,
            });
        }

        self.server_random = hello.random;

        if !self
            .ctx
            .options()
            .cipher_suites
            .contains(&hello.cipher_suite)
        {
            return Err(Error::IllegalParameter("cipher suite was not offered"));
        }
        if hello.compression_method != 0 {
            return Err(Error::IllegalParameter("non-null compression"));
        }

        if self.ctx.max_sessions() > 0 && !hello.session_id.is_empty() {
            let cached = self.ctx.sessions.lock().update(&hello.session_id);
            if let Some(master) = cached {
                // The server echoed a session we still hold: resumption
                // accepted, master secret comes from the cache.
                self.session_id_requested = true;
                self.master_secret = Some(Zeroizing::new(master));
            }
        }

        self.session_id = hello.session_id;
        self.negotiated_cipher = Some(hello.cipher_suite);

        if self.session_id_requested {
            debug!("resuming session, skipping key exchange");
            // The server's ChangeCipherSpec arrives next; the pending keys
            // must already be in place when it does.
            self.install_keys()?;
            self.state = HandshakeState::AwaitingFinished;
        } else {
            self.state = HandshakeState::AwaitingCertificate;
        }

        Ok(())
    }

    /// Hands the chain to the external verifier and keeps the resulting
    /// certificate handle for the key exchange.
    fn process_certificate(&mut self, chain: CertificateChain) -> Result<()> {
        let cert = self
            .ctx
            .options()
            .certificate_verifier
            .process_certificate(&chain.certificates)?;

        self.peer_certificate = Some(cert);
        self.state = HandshakeState::AwaitingCertReqOrHelloDone;
        Ok(())
    }

    /// Processes the certificate request. The body's CA list goes
    /// unprocessed since we send back the configured RSA chain anyway.
    fn process_cert_req(&mut self) -> Result<()> {
        self.cert_requested = true;
        self.state = HandshakeState::AwaitingHelloDone;
        Ok(())
    }

    /// Processes the server hello done message and emits the whole client
    /// flight in order.
    fn process_server_hello_done(&mut self) -> Result<()> {
        if self.cert_requested {
            self.send_certificate()?;
            self.send_client_key_xchg()?;
            self.send_cert_verify()?;
        } else {
            self.send_client_key_xchg()?;
        }

        self.records.send_change_cipher_spec()?;
        self.send_finished()?;

        self.state = HandshakeState::AwaitingFinished;
        Ok(())
    }

    fn send_certificate(&mut self) -> Result<()> {
        // A certificate without the matching signing key would leave the
        // CertificateVerify step unfulfillable; fail up front.
        if !self.ctx.has_client_key() {
            return Err(Error::InvalidKey);
        }

        let chain = CertificateChain {
            certificates: self.ctx.options().client_certificate.clone(),
        };
        self.send_handshake_message(&Handshake::Certificate(chain))
    }

    /// Sends a client key exchange message.
    fn send_client_key_xchg(&mut self) -> Result<()> {
        let peer = self
            .peer_certificate
            .as_ref()
            .ok_or(Error::Internal("no peer certificate"))?;

        // First two bytes encode the version we offered, not the negotiated
        // one.
        let mut premaster = Zeroizing::new([0u8; PREMASTER_SECRET_SIZE]);
        premaster[0] = TLS_1_0_VERSION.major;
        premaster[1] = TLS_1_0_VERSION.minor;
        OsRng.fill_bytes(&mut premaster[2..]);

        let encrypted = self
            .ctx
            .encrypt_premaster(&peer.public_key, &premaster[..])?;

        // Derived from the plaintext premaster generated above; the
        // ciphertext never comes back through a decrypt.
        let master = key_schedule::master_secret(
            &premaster[..],
            &self.client_random,
            &self.server_random,
        );

        if self.ctx.max_sessions() > 0 && !self.session_id.is_empty() {
            self.ctx
                .sessions
                .lock()
                .store_master(&self.session_id, &master);
        }

        self.master_secret = Some(master);
        self.install_keys()?;

        self.send_handshake_message(&Handshake::ClientKeyExchange(ClientKeyExchange {
            encrypted_premaster: Bytes::from(encrypted),
        }))
    }

    /// Expands the master secret into the pending key block for the
    /// negotiated cipher and hands it to the record layer.
    fn install_keys(&mut self) -> Result<()> {
        let master = self
            .master_secret
            .as_ref()
            .ok_or(Error::Internal("master secret not derived"))?;
        let suite = self
            .negotiated_cipher
            .ok_or(Error::Internal("no negotiated cipher"))?;

        let keys = key_schedule::key_block(
            &master[..],
            &self.client_random,
            &self.server_random,
            &suite.params()?,
        );
        self.records.install_pending_cipher(suite, keys);
        Ok(())
    }

    /// Sends a certificate verify message: the transcript digest signed with
    /// the client's private key.
    fn send_cert_verify(&mut self) -> Result<()> {
        let digest = self.transcript.digest();
        let signature = self.ctx.sign_digest(&digest)?;

        self.send_handshake_message(&Handshake::CertificateVerify(CertificateVerify {
            signature: Bytes::from(signature),
        }))
    }

    fn send_finished(&mut self) -> Result<()> {
        let verify_data = {
            let master = self
                .master_secret
                .as_ref()
                .ok_or(Error::Internal("master secret not derived"))?;
            key_schedule::verify_data(
                &master[..],
                &self.transcript,
                key_schedule::CLIENT_FINISHED_LABEL,
            )
        };

        self.finished_sent = true;
        self.send_handshake_message(&Handshake::Finished(Finished {
            verify_data: Bytes::copy_from_slice(&verify_data),
        }))
    }

    /// Verifies the server Finished against the transcript as it stood
    /// before this message arrived. On a resumed session our own
    /// ChangeCipherSpec and Finished only go out once the server's verifies.
    fn process_finished(&mut self, finished: &Finished, raw: Bytes) -> Result<()> {
        let expected = {
            let master = self
                .master_secret
                .as_ref()
                .ok_or(Error::Internal("master secret not derived"))?;
            key_schedule::verify_data(
                &master[..],
                &self.transcript,
                key_schedule::SERVER_FINISHED_LABEL,
            )
        };

        if !crate::constant_eq(&finished.verify_data, &expected) {
            return Err(Error::BadFinished);
        }

        self.transcript.push(raw);

        if !self.finished_sent {
            self.records.send_change_cipher_spec()?;
            self.send_finished()?;
        }

        self.state = HandshakeState::Done;
        Ok(())
    }
}
