use std::io::Read;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::handshake::ProtocolVersion;
use crate::parsing::{exp2, U16_LIMIT};

tls_enum_u8!(ContentType => {
    change_cipher_spec(20),
    alert(21),
    handshake(22),
    application_data(23),
    (255)
});

/// Outer most data type transmitted on the wire.
#[derive(Debug)]
pub struct Record {
    pub typ: ContentType,
    pub version: ProtocolVersion,
    pub data: Bytes,
}

impl Record {
    pub fn read<R: Read + ?Sized>(reader: &mut R) -> Result<Record> {
        let mut buf = [0u8; 5];
        reader.read_exact(&mut buf)?;

        let typ = ContentType::from_u8(buf[0]);
        let version = ProtocolVersion {
            major: buf[1],
            minor: buf[2],
        };
        let length = u16::from_be_bytes(*array_ref![buf, 3, 2]) as usize;

        if length > exp2(14) + 2048 {
            return Err(Error::DecodeError("record overflow"));
        }

        let mut data = vec![0u8; length];
        reader.read_exact(&mut data)?;

        Ok(Record {
            typ,
            version,
            data: Bytes::from(data),
        })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        out.push(self.typ.to_u8());
        self.version.serialize(out);
        assert!(self.data.len() < U16_LIMIT);
        out.extend_from_slice(&(self.data.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.data);
    }
}
