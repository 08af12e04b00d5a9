// Test doubles: a blocking in-memory transport and a scripted TLS server
// that performs the real server half of the handshake cryptography.

use std::io::{self, Read, Write};
use std::sync::mpsc::{channel, Receiver, Sender};

use bytes::Bytes;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::{Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};

use crate::alert::Alert;
use crate::cipher_suite::CipherSuite;
use crate::error::{Error, Result};
use crate::handshake::{
    CertificateChain, CertificateRequest, ClientHello, Finished, Handshake, ProtocolVersion,
    ServerHello, RANDOM_SIZE, TLS_1_0_VERSION,
};
use crate::key_schedule::{self, MASTER_SECRET_SIZE, PREMASTER_SECRET_SIZE};
use crate::record::{ContentType, Record};
use crate::record_stream::Transport;
use crate::transcript::Transcript;
use crate::x509::{CertificateVerifier, PeerCertificate};

/// One end of a blocking in-memory pipe. Dropping (or hanging up) an end
/// makes the peer's reads return EOF and its writes fail.
pub struct PipeEnd {
    rx: Receiver<Vec<u8>>,
    tx: Option<Sender<Vec<u8>>>,
    buffer: Vec<u8>,
}

pub fn duplex() -> (PipeEnd, PipeEnd) {
    let (tx_a, rx_b) = channel();
    let (tx_b, rx_a) = channel();

    (
        PipeEnd {
            rx: rx_a,
            tx: Some(tx_a),
            buffer: vec![],
        },
        PipeEnd {
            rx: rx_b,
            tx: Some(tx_b),
            buffer: vec![],
        },
    )
}

impl PipeEnd {
    /// Stops writing without tearing down the read side.
    pub fn hang_up(&mut self) {
        self.tx = None;
    }
}

impl Read for PipeEnd {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.buffer.is_empty() {
            match self.rx.recv() {
                Ok(chunk) => self.buffer = chunk,
                Err(_) => return Ok(0),
            }
        }

        let n = buf.len().min(self.buffer.len());
        buf[..n].copy_from_slice(&self.buffer[..n]);
        self.buffer.drain(..n);
        Ok(n)
    }
}

impl Write for PipeEnd {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.tx.as_ref() {
            Some(tx) if tx.send(buf.to_vec()).is_ok() => Ok(buf.len()),
            _ => Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer hung up")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for PipeEnd {}

/// Trusts whatever chain it is shown and pins the key the chain is supposed
/// to carry. Stands in for the real X.509 verifier.
pub struct StaticKeyVerifier {
    pub public_key: RsaPublicKey,
}

impl CertificateVerifier for StaticKeyVerifier {
    fn process_certificate(&self, chain: &[Bytes]) -> Result<PeerCertificate> {
        Ok(PeerCertificate {
            chain: chain.to_vec(),
            public_key: self.public_key.clone(),
        })
    }
}

/// Rejects every chain; for contexts whose certificate path never runs.
pub struct NullVerifier;

impl CertificateVerifier for NullVerifier {
    fn process_certificate(&self, _chain: &[Bytes]) -> Result<PeerCertificate> {
        Err(Error::BadCertificate("no trust anchors configured".into()))
    }
}

pub fn test_server_rsa_key() -> RsaPrivateKey {
    RsaPrivateKey::new(&mut OsRng, 512).expect("generate server test key")
}

pub fn test_client_rsa_key() -> RsaPrivateKey {
    RsaPrivateKey::new(&mut OsRng, 512).expect("generate client test key")
}

/// Drives the server side of a handshake step by step over a pipe,
/// decrypting the premaster with its RSA key and deriving the same key
/// schedule as the client under test.
pub struct ScriptedServer {
    transport: PipeEnd,
    key: RsaPrivateKey,
    pub transcript: Transcript,
    pub client_random: [u8; RANDOM_SIZE],
    pub server_random: [u8; RANDOM_SIZE],
    pub master: Option<[u8; MASTER_SECRET_SIZE]>,
}

impl ScriptedServer {
    pub fn new(transport: PipeEnd, key: RsaPrivateKey) -> Self {
        let mut server_random = [0u8; RANDOM_SIZE];
        OsRng.fill_bytes(&mut server_random);

        Self {
            transport,
            key,
            transcript: Transcript::new(),
            client_random: [0u8; RANDOM_SIZE],
            server_random,
            master: None,
        }
    }

    pub fn hang_up(&mut self) {
        self.transport.hang_up();
    }

    /// Fresh randoms and an empty transcript for a renegotiated handshake.
    pub fn reset_for_new_handshake(&mut self) {
        self.transcript.clear();
        self.master = None;
        OsRng.fill_bytes(&mut self.server_random);
    }

    fn read_record(&mut self) -> Record {
        Record::read(&mut self.transport).expect("read record")
    }

    /// Reads one handshake message. The client under test frames one
    /// message per record. Transcript bookkeeping is the caller's business.
    fn read_handshake(&mut self) -> (Handshake, Bytes) {
        let record = self.read_record();
        assert_eq!(record.typ, ContentType::handshake);
        let handshake = Handshake::parse(&record.data).expect("parse handshake");
        (handshake, record.data)
    }

    fn send_record(&mut self, typ: ContentType, data: &[u8]) {
        let record = Record {
            typ,
            version: TLS_1_0_VERSION,
            data: Bytes::copy_from_slice(data),
        };

        let mut out = vec![];
        record.serialize(&mut out);
        self.transport.write_all(&out).expect("write record");
    }

    pub fn send_handshake(&mut self, handshake: &Handshake) {
        let message = handshake.to_bytes();
        self.transcript.push(message.clone());
        self.send_record(ContentType::handshake, &message);
    }

    pub fn expect_client_hello(&mut self) -> ClientHello {
        let (handshake, raw) = self.read_handshake();
        self.transcript.push(raw);

        match handshake {
            Handshake::ClientHello(hello) => {
                self.client_random = hello.random;
                hello
            }
            other => panic!("expected ClientHello, got {:?}", other.typ()),
        }
    }

    pub fn send_server_hello(&mut self, session_id: &[u8], suite: CipherSuite) {
        self.send_server_hello_raw(TLS_1_0_VERSION, session_id, suite, 0);
    }

    pub fn send_server_hello_raw(
        &mut self,
        version: ProtocolVersion,
        session_id: &[u8],
        suite: CipherSuite,
        compression_method: u8,
    ) {
        let hello = ServerHello {
            version,
            random: self.server_random,
            session_id: Bytes::copy_from_slice(session_id),
            cipher_suite: suite,
            compression_method,
        };
        self.send_handshake(&Handshake::ServerHello(hello));
    }

    pub fn send_certificate(&mut self) {
        // The test verifier pins the key, so the DER bytes are opaque.
        let chain = CertificateChain {
            certificates: vec![Bytes::from_static(b"scripted server certificate")],
        };
        self.send_handshake(&Handshake::Certificate(chain));
    }

    pub fn send_certificate_request(&mut self) {
        // One certificate type (rsa_sign) and an empty authority list.
        let body = Bytes::from_static(&[1, 1, 0, 0]);
        self.send_handshake(&Handshake::CertificateRequest(CertificateRequest { body }));
    }

    pub fn send_server_hello_done(&mut self) {
        self.send_handshake(&Handshake::ServerHelloDone);
    }

    pub fn expect_certificate(&mut self) -> CertificateChain {
        let (handshake, raw) = self.read_handshake();
        self.transcript.push(raw);

        match handshake {
            Handshake::Certificate(chain) => chain,
            other => panic!("expected Certificate, got {:?}", other.typ()),
        }
    }

    /// Decrypts the premaster secret and derives the same master secret the
    /// client just did.
    pub fn expect_client_key_exchange(&mut self) {
        let (handshake, raw) = self.read_handshake();
        self.transcript.push(raw);

        let cke = match handshake {
            Handshake::ClientKeyExchange(cke) => cke,
            other => panic!("expected ClientKeyExchange, got {:?}", other.typ()),
        };

        let premaster = self
            .key
            .decrypt(Pkcs1v15Encrypt, &cke.encrypted_premaster)
            .expect("decrypt premaster");
        assert_eq!(premaster.len(), PREMASTER_SECRET_SIZE);
        assert_eq!(&premaster[..2], &[3, 1]);

        let master =
            key_schedule::master_secret(&premaster, &self.client_random, &self.server_random);
        self.master = Some(*master);
    }

    /// Checks the CertificateVerify signature covers the transcript up
    /// through ClientKeyExchange.
    pub fn expect_certificate_verify(&mut self, client_public: &RsaPublicKey) {
        let (handshake, raw) = self.read_handshake();

        let verify = match handshake {
            Handshake::CertificateVerify(verify) => verify,
            other => panic!("expected CertificateVerify, got {:?}", other.typ()),
        };

        let digest = self.transcript.digest();
        client_public
            .verify(Pkcs1v15Sign::new_unprefixed(), &digest, &verify.signature)
            .expect("certificate verify signature");

        self.transcript.push(raw);
    }

    pub fn expect_change_cipher_spec(&mut self) {
        let record = self.read_record();
        assert_eq!(record.typ, ContentType::change_cipher_spec);
        assert_eq!(&record.data[..], &[1]);
    }

    pub fn expect_finished(&mut self) {
        let (handshake, raw) = self.read_handshake();

        let finished = match handshake {
            Handshake::Finished(finished) => finished,
            other => panic!("expected Finished, got {:?}", other.typ()),
        };

        let master = self.master.expect("master secret not derived");
        let expected = key_schedule::verify_data(
            &master,
            &self.transcript,
            key_schedule::CLIENT_FINISHED_LABEL,
        );
        assert_eq!(&finished.verify_data[..], &expected[..]);

        self.transcript.push(raw);
    }

    pub fn send_change_cipher_spec(&mut self) {
        self.send_record(ContentType::change_cipher_spec, &[1]);
    }

    pub fn send_finished(&mut self) {
        let master = self.master.expect("master secret not derived");
        let verify_data = key_schedule::verify_data(
            &master,
            &self.transcript,
            key_schedule::SERVER_FINISHED_LABEL,
        );

        self.send_handshake(&Handshake::Finished(Finished {
            verify_data: Bytes::copy_from_slice(&verify_data),
        }));
    }

    /// HelloRequest is never part of any transcript.
    pub fn send_hello_request(&mut self) {
        let message = Handshake::HelloRequest.to_bytes();
        self.send_record(ContentType::handshake, &message);
    }

    pub fn expect_alert(&mut self) -> Alert {
        let record = self.read_record();
        assert_eq!(record.typ, ContentType::alert);
        Alert::parse(&record.data).expect("parse alert")
    }

    /// Asserts that nothing further arrives before the client hangs up.
    pub fn expect_silence(&mut self) {
        match Record::read(&mut self.transport) {
            Err(Error::ConnectionLost) => {}
            other => panic!("expected silence, got {:?}", other),
        }
    }

    /// Plays the standard server side of a full handshake issuing
    /// `session_id`.
    pub fn run_full_handshake(&mut self, session_id: &[u8]) {
        self.expect_client_hello();
        self.send_server_hello(session_id, CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA);
        self.send_certificate();
        self.send_server_hello_done();
        self.expect_client_key_exchange();
        self.expect_change_cipher_spec();
        self.expect_finished();
        self.send_change_cipher_spec();
        self.send_finished();
    }

    /// Confirms resumption of `session_id` and jumps straight to the
    /// abbreviated finish, reusing `master` from the original handshake.
    pub fn run_resumed_handshake(&mut self, session_id: &[u8], master: [u8; MASTER_SECRET_SIZE]) {
        let hello = self.expect_client_hello();
        assert_eq!(&hello.session_id[..], session_id);

        self.master = Some(master);
        self.send_server_hello(session_id, CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA);
        self.send_change_cipher_spec();
        self.send_finished();
        self.expect_change_cipher_spec();
        self.expect_finished();
    }

    /// Full handshake with client authentication.
    pub fn run_mutual_auth_handshake(&mut self, session_id: &[u8], client_public: &RsaPublicKey) {
        self.expect_client_hello();
        self.send_server_hello(session_id, CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA);
        self.send_certificate();
        self.send_certificate_request();
        self.send_server_hello_done();
        self.expect_certificate();
        self.expect_client_key_exchange();
        self.expect_certificate_verify(client_public);
        self.expect_change_cipher_spec();
        self.expect_finished();
        self.send_change_cipher_spec();
        self.send_finished();
    }
}
