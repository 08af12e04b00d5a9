use std::io;

use thiserror::Error;

use crate::alert::{AlertDescription, AlertLevel};
use crate::handshake::HandshakeType;

pub type Result<T> = std::result::Result<T, Error>;

/// Every way the handshake driver can fail. The first error terminates the
/// handshake and becomes the connection's final status.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("server advertised protocol version {major}.{minor}")]
    InvalidVersion { major: u8, minor: u8 },

    #[error("no usable RSA key for the requested operation")]
    InvalidKey,

    #[error("received {got:?} while expecting {expected}")]
    UnexpectedMessage {
        got: HandshakeType,
        expected: &'static str,
    },

    #[error("malformed message: {0}")]
    DecodeError(&'static str),

    #[error("connection lost")]
    ConnectionLost,

    #[error("illegal parameter: {0}")]
    IllegalParameter(&'static str),

    #[error("certificate rejected: {0}")]
    BadCertificate(String),

    #[error("finished verify_data mismatch")]
    BadFinished,

    #[error("received fatal alert: {0:?}")]
    AlertReceived(AlertDescription),

    #[error("internal error: {0}")]
    Internal(&'static str),

    #[error("transport error: {0}")]
    Io(String),
}

impl Error {
    /// The alert to send the peer for this error. None only for
    /// ConnectionLost, where the transport is already gone.
    pub(crate) fn alert(&self) -> Option<(AlertLevel, AlertDescription)> {
        let description = match self {
            Error::ConnectionLost => return None,
            Error::InvalidVersion { .. } => AlertDescription::protocol_version,
            Error::DecodeError(_) => AlertDescription::decode_error,
            Error::UnexpectedMessage { .. } => AlertDescription::unexpected_message,
            Error::IllegalParameter(_) => AlertDescription::illegal_parameter,
            Error::BadCertificate(_) => AlertDescription::bad_certificate,
            Error::BadFinished => AlertDescription::decrypt_error,
            Error::InvalidKey | Error::Internal(_) => AlertDescription::internal_error,
            Error::AlertReceived(_) | Error::Io(_) => AlertDescription::handshake_failure,
        };

        Some((AlertLevel::fatal, description))
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Error::ConnectionLost,
            _ => Error::Io(e.to_string()),
        }
    }
}
