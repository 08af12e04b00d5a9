use bytes::Bytes;
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::cipher_suite::CipherSuite;
use crate::error::{Error, Result};
use crate::parsing::*;

pub const RANDOM_SIZE: usize = 32;
pub const SESSION_ID_SIZE: usize = 32;

/// The {major, minor} pair carried by records, hellos and the premaster
/// secret. Compared field-wise, never as a packed integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

pub const TLS_1_0_VERSION: ProtocolVersion = ProtocolVersion { major: 3, minor: 1 };

impl ProtocolVersion {
    pub fn parse(c: &mut ParseCursor<'_>) -> Result<Self> {
        let major = c.next_u8()?;
        let minor = c.next_u8()?;
        Ok(Self { major, minor })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        out.push(self.major);
        out.push(self.minor);
    }
}

tls_enum_u8!(HandshakeType => {
    HelloRequest(0),
    ClientHello(1),
    ServerHello(2),
    Certificate(11),
    CertificateRequest(13),
    ServerHelloDone(14),
    CertificateVerify(15),
    ClientKeyExchange(16),
    Finished(20),
    (255)
});

/// One handshake message. Serialization always produces the 4 byte header
/// (type + 24 bit length) followed by the body; parsing takes the same form.
#[derive(Debug)]
pub enum Handshake {
    HelloRequest,
    ClientHello(ClientHello),
    ServerHello(ServerHello),
    Certificate(CertificateChain),
    CertificateRequest(CertificateRequest),
    ServerHelloDone,
    CertificateVerify(CertificateVerify),
    ClientKeyExchange(ClientKeyExchange),
    Finished(Finished),
}

impl Handshake {
    pub fn typ(&self) -> HandshakeType {
        match self {
            Handshake::HelloRequest => HandshakeType::HelloRequest,
            Handshake::ClientHello(_) => HandshakeType::ClientHello,
            Handshake::ServerHello(_) => HandshakeType::ServerHello,
            Handshake::Certificate(_) => HandshakeType::Certificate,
            Handshake::CertificateRequest(_) => HandshakeType::CertificateRequest,
            Handshake::ServerHelloDone => HandshakeType::ServerHelloDone,
            Handshake::CertificateVerify(_) => HandshakeType::CertificateVerify,
            Handshake::ClientKeyExchange(_) => HandshakeType::ClientKeyExchange,
            Handshake::Finished(_) => HandshakeType::Finished,
        }
    }

    /// Parses one complete handshake message, header included.
    pub fn parse(input: &[u8]) -> Result<Self> {
        let mut c = ParseCursor::new(input);
        let typ = HandshakeType::parse(&mut c)?;
        let len = c.next_u24()?;
        let payload = c.take(len)?;
        c.expect_empty()?;

        let mut body = ParseCursor::new(payload);
        let msg = match typ {
            HandshakeType::HelloRequest => {
                body.expect_empty()?;
                Handshake::HelloRequest
            }
            HandshakeType::ClientHello => Handshake::ClientHello(ClientHello::parse(&mut body)?),
            HandshakeType::ServerHello => Handshake::ServerHello(ServerHello::parse(&mut body)?),
            HandshakeType::Certificate => {
                Handshake::Certificate(CertificateChain::parse(&mut body)?)
            }
            HandshakeType::CertificateRequest => {
                Handshake::CertificateRequest(CertificateRequest::parse(&mut body)?)
            }
            HandshakeType::ServerHelloDone => {
                body.expect_empty()?;
                Handshake::ServerHelloDone
            }
            HandshakeType::CertificateVerify => {
                Handshake::CertificateVerify(CertificateVerify::parse(&mut body)?)
            }
            HandshakeType::ClientKeyExchange => {
                Handshake::ClientKeyExchange(ClientKeyExchange::parse(&mut body)?)
            }
            HandshakeType::Finished => Handshake::Finished(Finished::parse(&mut body)?),
            HandshakeType::unknown(_) => {
                return Err(Error::DecodeError("unsupported handshake type"));
            }
        };

        Ok(msg)
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        self.typ().serialize(out);
        serialize_varlen_vector(0, U24_LIMIT, out, |out| match self {
            Handshake::HelloRequest | Handshake::ServerHelloDone => {}
            Handshake::ClientHello(v) => v.serialize(out),
            Handshake::ServerHello(v) => v.serialize(out),
            Handshake::Certificate(v) => v.serialize(out),
            Handshake::CertificateRequest(v) => v.serialize(out),
            Handshake::CertificateVerify(v) => v.serialize(out),
            Handshake::ClientKeyExchange(v) => v.serialize(out),
            Handshake::Finished(v) => v.serialize(out),
        });
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut out = vec![];
        self.serialize(&mut out);
        Bytes::from(out)
    }
}

/*
struct {
    ProtocolVersion client_version;
    Random random;
    SessionID session_id;
    CipherSuite cipher_suites<2..2^16-1>;
    CompressionMethod compression_methods<1..2^8-1>;
} ClientHello;
*/
#[derive(Clone, Debug)]
pub struct ClientHello {
    pub version: ProtocolVersion,
    /// First 4 bytes are the big endian epoch seconds at creation time;
    /// the remaining 28 bytes are fresh entropy.
    pub random: [u8; RANDOM_SIZE],
    /// Empty, or the 32 byte id of a session offered for resumption.
    pub session_id: Bytes,
    pub cipher_suites: Vec<CipherSuite>,
    pub compression_methods: Bytes,
}

impl ClientHello {
    /// Builds a fresh hello offering `cipher_suites` and, when non-empty,
    /// resumption of `session_id`.
    pub fn generate(session_id: Bytes, cipher_suites: Vec<CipherSuite>) -> Self {
        let mut random = [0u8; RANDOM_SIZE];

        // Low 32 bits only; the field wraps past 2038 and that is fine.
        let time = Utc::now().timestamp() as u32;
        random[0..4].copy_from_slice(&time.to_be_bytes());
        OsRng.fill_bytes(&mut random[4..]);

        Self {
            version: TLS_1_0_VERSION,
            random,
            session_id,
            cipher_suites,
            compression_methods: Bytes::from_static(&[0]),
        }
    }

    pub fn parse(c: &mut ParseCursor<'_>) -> Result<Self> {
        let version = ProtocolVersion::parse(c)?;
        let random = *array_ref![c.take(RANDOM_SIZE)?, 0, RANDOM_SIZE];
        let session_id = c.varlen_vector(0, SESSION_ID_SIZE)?;

        let suite_data = c.varlen_vector(2, exp2(16) - 2)?;
        if suite_data.len() % 2 != 0 {
            return Err(Error::DecodeError("odd cipher suite list length"));
        }

        let mut cipher_suites = vec![];
        for pair in suite_data.chunks(2) {
            // The high octet is zero for every RSA key exchange suite we
            // speak; anything else can't match the preference list anyway.
            if pair[0] == 0 {
                cipher_suites.push(CipherSuite::from_u8(pair[1]));
            }
        }

        let compression_methods = c.varlen_vector(1, U8_LIMIT)?;

        Ok(Self {
            version,
            random,
            session_id,
            cipher_suites,
            compression_methods,
        })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        self.version.serialize(out);
        out.extend_from_slice(&self.random);
        serialize_varlen_vector(0, SESSION_ID_SIZE, out, |out| {
            out.extend_from_slice(&self.session_id);
        });
        serialize_varlen_vector(2, exp2(16) - 2, out, |out| {
            for suite in self.cipher_suites.iter() {
                out.push(0);
                suite.serialize(out);
            }
        });
        serialize_varlen_vector(1, U8_LIMIT, out, |out| {
            out.extend_from_slice(&self.compression_methods);
        });
    }
}

/*
struct {
    ProtocolVersion server_version;
    Random random;
    SessionID session_id;
    CipherSuite cipher_suite;
    CompressionMethod compression_method;
} ServerHello;
*/
#[derive(Clone, Debug)]
pub struct ServerHello {
    pub version: ProtocolVersion,
    pub random: [u8; RANDOM_SIZE],
    pub session_id: Bytes,
    pub cipher_suite: CipherSuite,
    pub compression_method: u8,
}

impl ServerHello {
    pub fn parse(c: &mut ParseCursor<'_>) -> Result<Self> {
        let version = ProtocolVersion::parse(c)?;
        let random = *array_ref![c.take(RANDOM_SIZE)?, 0, RANDOM_SIZE];
        let session_id = c.varlen_vector(0, SESSION_ID_SIZE)?;

        // As with the ClientHello, a non-zero high octet can't name a suite
        // out of our preference list.
        let high = c.next_u8()?;
        let low = c.next_u8()?;
        let cipher_suite = if high == 0 {
            CipherSuite::from_u8(low)
        } else {
            CipherSuite::unknown(low)
        };

        let compression_method = c.next_u8()?;

        // Trailing bytes (e.g. hello extensions) are tolerated.
        Ok(Self {
            version,
            random,
            session_id,
            cipher_suite,
            compression_method,
        })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        self.version.serialize(out);
        out.extend_from_slice(&self.random);
        serialize_varlen_vector(0, SESSION_ID_SIZE, out, |out| {
            out.extend_from_slice(&self.session_id);
        });
        out.push(0);
        self.cipher_suite.serialize(out);
        out.push(self.compression_method);
    }
}

/*
opaque ASN.1Cert<1..2^24-1>;

struct {
    ASN.1Cert certificate_list<0..2^24-1>;
} Certificate;
*/
#[derive(Clone, Debug)]
pub struct CertificateChain {
    /// DER encoded certificates, leaf first.
    pub certificates: Vec<Bytes>,
}

impl CertificateChain {
    pub fn parse(c: &mut ParseCursor<'_>) -> Result<Self> {
        let list = c.varlen_vector(0, U24_LIMIT)?;

        let mut certificates = vec![];
        let mut lc = ParseCursor::new(&list);
        while lc.remaining() > 0 {
            certificates.push(lc.varlen_vector(1, U24_LIMIT)?);
        }

        Ok(Self { certificates })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        serialize_varlen_vector(0, U24_LIMIT, out, |out| {
            for cert in self.certificates.iter() {
                serialize_varlen_vector(1, U24_LIMIT, out, |out| {
                    out.extend_from_slice(cert);
                });
            }
        });
    }
}

/// The client replies with its configured RSA chain no matter which types or
/// authorities the server lists, so the body is carried opaquely.
#[derive(Clone, Debug)]
pub struct CertificateRequest {
    pub body: Bytes,
}

impl CertificateRequest {
    pub fn parse(c: &mut ParseCursor<'_>) -> Result<Self> {
        let body = Bytes::copy_from_slice(c.take(c.remaining())?);
        Ok(Self { body })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.body);
    }
}

/*
struct {
    public-key-encrypted PreMasterSecret pre_master_secret;
} ClientKeyExchange;
*/
#[derive(Clone, Debug)]
pub struct ClientKeyExchange {
    pub encrypted_premaster: Bytes,
}

impl ClientKeyExchange {
    pub fn parse(c: &mut ParseCursor<'_>) -> Result<Self> {
        let encrypted_premaster = c.varlen_vector(0, U16_LIMIT)?;
        Ok(Self {
            encrypted_premaster,
        })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        serialize_varlen_vector(0, U16_LIMIT, out, |out| {
            out.extend_from_slice(&self.encrypted_premaster);
        });
    }
}

/// PKCS#1 signature over MD5(transcript) + SHA1(transcript).
#[derive(Clone, Debug)]
pub struct CertificateVerify {
    pub signature: Bytes,
}

impl CertificateVerify {
    pub fn parse(c: &mut ParseCursor<'_>) -> Result<Self> {
        let signature = c.varlen_vector(0, U16_LIMIT)?;
        Ok(Self { signature })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        serialize_varlen_vector(0, U16_LIMIT, out, |out| {
            out.extend_from_slice(&self.signature);
        });
    }
}

/*
struct {
    opaque verify_data[12];
} Finished;
*/
#[derive(Clone, Debug)]
pub struct Finished {
    pub verify_data: Bytes,
}

impl Finished {
    pub fn parse(c: &mut ParseCursor<'_>) -> Result<Self> {
        let verify_data = Bytes::copy_from_slice(c.take(c.remaining())?);
        Ok(Self { verify_data })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.verify_data);
    }
}
