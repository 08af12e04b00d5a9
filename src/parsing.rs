// TLS specific helpers for parsing binary packets.

use bytes::Bytes;

use crate::error::{Error, Result};

pub const U8_LIMIT: usize = u8::max_value() as usize;
pub const U16_LIMIT: usize = u16::max_value() as usize;
pub const U24_LIMIT: usize = 1 << 24;

pub fn exp2(v: usize) -> usize {
    1 << v
}

/// Sequential reader over the body of a single message.
///
/// Every read is bounds checked; running past the end of the buffer is a
/// decode error rather than a panic.
pub struct ParseCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ParseCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn next_u8(&mut self) -> Result<u8> {
        let b = *self
            .buf
            .get(self.pos)
            .ok_or(Error::DecodeError("input truncated"))?;
        self.pos += 1;
        Ok(b)
    }

    pub fn next_u16(&mut self) -> Result<u16> {
        let window = self.take(2)?;
        Ok(u16::from_be_bytes(*array_ref![window, 0, 2]))
    }

    pub fn next_u24(&mut self) -> Result<usize> {
        let window = self.take(3)?;
        Ok(((window[0] as usize) << 16) | ((window[1] as usize) << 8) | (window[2] as usize))
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::DecodeError("input truncated"));
        }

        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Reads a variable length vector of bytes.
    ///
    /// The max_bytes will be used to determine how large the length field is.
    /// In TLS, the minimum number of bytes required to store the max_length
    /// are used to encode the length of the vector.
    pub fn varlen_vector(&mut self, min_bytes: usize, max_bytes: usize) -> Result<Bytes> {
        let len = if max_bytes <= U8_LIMIT {
            self.next_u8()? as usize
        } else if max_bytes <= U16_LIMIT {
            self.next_u16()? as usize
        } else if max_bytes <= U24_LIMIT {
            self.next_u24()?
        } else {
            return Err(Error::DecodeError("maximum length not supported"));
        };

        if len < min_bytes || len > max_bytes {
            return Err(Error::DecodeError("length out of allowed range"));
        }

        Ok(Bytes::copy_from_slice(self.take(len)?))
    }

    pub fn expect_empty(&self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(Error::DecodeError("trailing bytes after message"));
        }

        Ok(())
    }
}

/// Encodes a byte vector using the length prefixed wire format defined by TLS.
pub fn serialize_varlen_vector<F: FnMut(&mut Vec<u8>)>(
    min_bytes: usize,
    max_bytes: usize,
    out: &mut Vec<u8>,
    mut f: F,
) {
    let i = out.len();
    let n = if max_bytes <= U8_LIMIT {
        1
    } else if max_bytes <= U16_LIMIT {
        2
    } else if max_bytes <= U24_LIMIT {
        3
    } else {
        panic!("Maximum length not supported");
    };

    out.resize(i + n, 0);
    let ii = out.len();

    f(out);

    let size = out.len() - ii;
    assert!(size >= min_bytes && size <= max_bytes);

    match n {
        1 => {
            out[i] = size as u8;
        }
        2 => {
            *array_mut_ref![out, i, 2] = (size as u16).to_be_bytes();
        }
        3 => {
            *array_mut_ref![out, i, 3] = [(size >> 16) as u8, (size >> 8) as u8, size as u8];
        }
        _ => panic!("Should not happen"),
    };
}
