use std::sync::Arc;

use bytes::Bytes;
use zeroize::Zeroizing;

use crate::cipher_suite::CipherSuite;
use crate::context::ClientContext;
use crate::error::Error;
use crate::handshake::RANDOM_SIZE;
use crate::key_schedule::MASTER_SECRET_SIZE;
use crate::record_stream::RecordStream;
use crate::transcript::Transcript;
use crate::x509::PeerCertificate;

/// Which inbound handshake message the driver will accept next. Advances
/// monotonically; the only back edge is the HelloRequest restart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeState {
    AwaitingServerHello,
    AwaitingCertificate,
    AwaitingCertReqOrHelloDone,
    AwaitingHelloDone,
    AwaitingFinished,
    Done,
}

impl HandshakeState {
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            HandshakeState::AwaitingServerHello => "ServerHello",
            HandshakeState::AwaitingCertificate => "Certificate",
            HandshakeState::AwaitingCertReqOrHelloDone => "CertificateRequest or ServerHelloDone",
            HandshakeState::AwaitingHelloDone => "ServerHelloDone",
            HandshakeState::AwaitingFinished => "Finished",
            HandshakeState::Done => "HelloRequest",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum HandshakeStatus {
    InProgress,
    Ok,
    Error(Error),
}

impl HandshakeStatus {
    pub fn is_ok(&self) -> bool {
        *self == HandshakeStatus::Ok
    }
}

/// One TLS client connection. Owns its randoms, transcript, session id and
/// negotiated cipher; shares the session cache and RSA state through the
/// context. Usable for application traffic only once `status()` is Ok.
pub struct Connection {
    pub(crate) ctx: Arc<ClientContext>,
    pub(crate) records: RecordStream,

    pub(crate) is_client: bool,

    pub(crate) client_random: [u8; RANDOM_SIZE],
    pub(crate) server_random: [u8; RANDOM_SIZE],

    /// Empty means no resumable session.
    pub(crate) session_id: Bytes,
    /// Set when a prior session id was supplied at construction; cleared
    /// when the ClientHello goes out and set again only if the server
    /// confirms resumption by echoing the id.
    pub(crate) session_id_requested: bool,
    pub(crate) cert_requested: bool,

    pub(crate) negotiated_cipher: Option<CipherSuite>,
    pub(crate) transcript: Transcript,
    pub(crate) peer_certificate: Option<PeerCertificate>,
    pub(crate) master_secret: Option<Zeroizing<[u8; MASTER_SECRET_SIZE]>>,
    pub(crate) finished_sent: bool,

    pub(crate) state: HandshakeState,
    status: HandshakeStatus,
}

impl Connection {
    pub(crate) fn new(ctx: Arc<ClientContext>, records: RecordStream) -> Self {
        Self {
            ctx,
            records,
            is_client: true,
            client_random: [0u8; RANDOM_SIZE],
            server_random: [0u8; RANDOM_SIZE],
            session_id: Bytes::new(),
            session_id_requested: false,
            cert_requested: false,
            negotiated_cipher: None,
            transcript: Transcript::new(),
            peer_certificate: None,
            master_secret: None,
            finished_sent: false,
            state: HandshakeState::AwaitingServerHello,
            status: HandshakeStatus::InProgress,
        }
    }

    pub fn status(&self) -> &HandshakeStatus {
        &self.status
    }

    pub fn is_client(&self) -> bool {
        self.is_client
    }

    pub(crate) fn set_status(&mut self, status: HandshakeStatus) {
        self.status = status;
    }

    /// Id of the negotiated session; usable as `prior_session_id` for a
    /// later connection.
    pub fn session_id(&self) -> &[u8] {
        &self.session_id
    }

    pub fn negotiated_cipher(&self) -> Option<CipherSuite> {
        self.negotiated_cipher
    }

    /// Clears per-handshake state ahead of a (re)start. The session id and
    /// its requested flag survive: a session resumed once may be offered
    /// again on renegotiation.
    pub(crate) fn reset_handshake(&mut self) {
        self.transcript.clear();
        self.cert_requested = false;
        self.finished_sent = false;
        self.negotiated_cipher = None;
        self.peer_certificate = None;
        self.master_secret = None;
        self.state = HandshakeState::AwaitingServerHello;
    }
}
