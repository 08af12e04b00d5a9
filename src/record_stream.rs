use std::io::{Read, Write};
use std::net::TcpStream;

use bytes::{Bytes, BytesMut};
use log::{debug, warn};

use crate::alert::{Alert, AlertDescription, AlertLevel};
use crate::cipher_suite::CipherSuite;
use crate::error::{Error, Result};
use crate::handshake::TLS_1_0_VERSION;
use crate::key_schedule::KeyBlock;
use crate::record::{ContentType, Record};

/// Byte transport carrying TLS records. The handshake driver is blocking
/// and synchronous, so the transport must block too.
pub trait Transport: Read + Write + Send {
    /// Ensures reads and writes block. A no-op for transports that have no
    /// non-blocking mode.
    fn set_blocking(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Transport for TcpStream {
    fn set_blocking(&mut self) -> Result<()> {
        TcpStream::set_nonblocking(self, false)?;
        Ok(())
    }
}

/// Key material for both directions of one cipher generation, produced by
/// the key schedule and activated per direction by ChangeCipherSpec. The
/// record transform keyed by it (MAC + encryption) is the record protection
/// layer's concern and plugs in at activation.
pub struct CipherState {
    pub suite: CipherSuite,
    pub keys: KeyBlock,
}

/// Frames and unframes TLS records over a blocking transport.
///
/// Handshake messages may be coalesced into one record or split across
/// several; `next_handshake` reassembles and yields exactly one complete
/// message (4 byte header included) per call. ChangeCipherSpec records are
/// consumed internally and alerts surface as errors.
pub struct RecordStream {
    transport: Box<dyn Transport>,

    /// Bytes of a partial handshake message which haven't formed a complete
    /// message yet.
    handshake_buffer: BytesMut,

    pending_cipher: Option<CipherState>,
    write_active: bool,
    read_active: bool,
}

impl RecordStream {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            handshake_buffer: BytesMut::new(),
            pending_cipher: None,
            write_active: false,
            read_active: false,
        }
    }

    pub(crate) fn set_blocking(&mut self) -> Result<()> {
        self.transport.set_blocking()
    }

    /// Installs the pending cipher state derived from the master secret.
    /// Each direction switches over on its own ChangeCipherSpec.
    pub fn install_pending_cipher(&mut self, suite: CipherSuite, keys: KeyBlock) {
        self.pending_cipher = Some(CipherState { suite, keys });
    }

    pub fn pending_cipher(&self) -> Option<&CipherState> {
        self.pending_cipher.as_ref()
    }

    pub fn write_cipher_active(&self) -> bool {
        self.write_active
    }

    pub fn read_cipher_active(&self) -> bool {
        self.read_active
    }

    /// Sends one complete handshake message (header included) as a
    /// handshake record.
    pub fn send_handshake(&mut self, message: &[u8]) -> Result<()> {
        self.send_record(ContentType::handshake, message)
    }

    pub fn send_alert(&mut self, level: AlertLevel, description: AlertDescription) -> Result<()> {
        debug!("sending alert {:?}", description);

        let mut body = vec![];
        Alert { level, description }.serialize(&mut body);
        self.send_record(ContentType::alert, &body)
    }

    /// Emits a ChangeCipherSpec record and switches the write side over to
    /// the pending cipher.
    pub fn send_change_cipher_spec(&mut self) -> Result<()> {
        if self.pending_cipher.is_none() {
            return Err(Error::Internal("no pending cipher to activate"));
        }

        self.send_record(ContentType::change_cipher_spec, &[1])?;
        self.write_active = true;
        Ok(())
    }

    fn send_record(&mut self, typ: ContentType, data: &[u8]) -> Result<()> {
        let record = Record {
            typ,
            version: TLS_1_0_VERSION,
            data: Bytes::copy_from_slice(data),
        };

        let mut out = vec![];
        record.serialize(&mut out);

        // Once `write_active` is set, the record protection layer transforms
        // the payload here before it hits the wire.
        self.transport.write_all(&out)?;
        self.transport.flush()?;
        Ok(())
    }

    /// Blocks until one complete handshake message is available and returns
    /// it, header included.
    pub fn next_handshake(&mut self) -> Result<Bytes> {
        loop {
            if let Some(message) = self.take_buffered_message() {
                return Ok(message);
            }

            let record = Record::read(&mut *self.transport)?;
            match record.typ {
                ContentType::handshake => {
                    self.handshake_buffer.extend_from_slice(&record.data);
                }
                ContentType::change_cipher_spec => {
                    if !self.handshake_buffer.is_empty() {
                        return Err(Error::DecodeError(
                            "cipher change inside a handshake message",
                        ));
                    }
                    if record.data.len() != 1 || record.data[0] != 1 {
                        return Err(Error::DecodeError("bad change_cipher_spec body"));
                    }
                    if self.pending_cipher.is_none() {
                        return Err(Error::DecodeError("cipher change before key derivation"));
                    }

                    debug!("peer switched to the pending cipher");
                    self.read_active = true;
                }
                ContentType::alert => {
                    let alert = Alert::parse(&record.data)?;
                    if alert.description == AlertDescription::close_notify {
                        return Err(Error::ConnectionLost);
                    }
                    if alert.level == AlertLevel::fatal {
                        return Err(Error::AlertReceived(alert.description));
                    }

                    warn!("ignoring warning alert {:?}", alert.description);
                }
                _ => {
                    return Err(Error::DecodeError("unexpected record type during handshake"));
                }
            }
        }
    }

    fn take_buffered_message(&mut self) -> Option<Bytes> {
        if self.handshake_buffer.len() < 4 {
            return None;
        }

        let body_len = ((self.handshake_buffer[1] as usize) << 16)
            | ((self.handshake_buffer[2] as usize) << 8)
            | (self.handshake_buffer[3] as usize);
        let total = 4 + body_len;

        if self.handshake_buffer.len() < total {
            return None;
        }

        Some(self.handshake_buffer.split_to(total).freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::handshake::{Handshake, HandshakeType};
    use crate::testing::duplex;

    fn write_record(peer: &mut dyn Write, typ: ContentType, data: &[u8]) {
        let record = Record {
            typ,
            version: TLS_1_0_VERSION,
            data: Bytes::copy_from_slice(data),
        };
        let mut out = vec![];
        record.serialize(&mut out);
        peer.write_all(&out).unwrap();
    }

    #[test]
    fn reassembles_handshake_messages_across_records() {
        let (client_end, mut server_end) = duplex();
        let mut stream = RecordStream::new(Box::new(client_end));

        let message = Handshake::ServerHelloDone.to_bytes();
        write_record(&mut server_end, ContentType::handshake, &message[..2]);
        write_record(&mut server_end, ContentType::handshake, &message[2..]);

        let out = stream.next_handshake().unwrap();
        assert_eq!(&out[..], &message[..]);
    }

    #[test]
    fn splits_coalesced_handshake_messages() {
        let (client_end, mut server_end) = duplex();
        let mut stream = RecordStream::new(Box::new(client_end));

        let mut coalesced = Handshake::ServerHelloDone.to_bytes().to_vec();
        coalesced.extend_from_slice(&Handshake::HelloRequest.to_bytes());
        write_record(&mut server_end, ContentType::handshake, &coalesced);

        assert_eq!(
            stream.next_handshake().unwrap()[0],
            HandshakeType::ServerHelloDone.to_u8()
        );
        assert_eq!(
            stream.next_handshake().unwrap()[0],
            HandshakeType::HelloRequest.to_u8()
        );
    }

    #[test]
    fn fatal_alert_becomes_an_error() {
        let (client_end, mut server_end) = duplex();
        let mut stream = RecordStream::new(Box::new(client_end));

        write_record(
            &mut server_end,
            ContentType::alert,
            &[
                AlertLevel::fatal.to_u8(),
                AlertDescription::handshake_failure.to_u8(),
            ],
        );

        assert_eq!(
            stream.next_handshake().unwrap_err(),
            Error::AlertReceived(AlertDescription::handshake_failure)
        );
    }

    #[test]
    fn close_notify_is_connection_lost() {
        let (client_end, mut server_end) = duplex();
        let mut stream = RecordStream::new(Box::new(client_end));

        write_record(
            &mut server_end,
            ContentType::alert,
            &[
                AlertLevel::warning.to_u8(),
                AlertDescription::close_notify.to_u8(),
            ],
        );

        assert_eq!(stream.next_handshake().unwrap_err(), Error::ConnectionLost);
    }

    #[test]
    fn peer_hangup_is_connection_lost() {
        let (client_end, server_end) = duplex();
        let mut stream = RecordStream::new(Box::new(client_end));

        drop(server_end);
        assert_eq!(stream.next_handshake().unwrap_err(), Error::ConnectionLost);
    }

    #[test]
    fn change_cipher_spec_requires_pending_keys() {
        let (client_end, mut server_end) = duplex();
        let mut stream = RecordStream::new(Box::new(client_end));

        write_record(&mut server_end, ContentType::change_cipher_spec, &[1]);
        assert!(stream.next_handshake().is_err());
        assert!(!stream.read_cipher_active());
    }
}
