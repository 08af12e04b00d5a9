use bytes::Bytes;
use md5::{Digest, Md5};
use sha1::Sha1;

/// Stores a list of all handshake messages seen as part of the TLS handshake.
///
/// Messages land here with their 4 byte headers, in send/receive order;
/// HelloRequest and ChangeCipherSpec never do. Both Finished digests and the
/// CertificateVerify signature are computed over this log.
pub struct Transcript {
    messages: Vec<Bytes>,
}

pub const TRANSCRIPT_DIGEST_SIZE: usize = 16 + 20;

impl Transcript {
    pub fn new() -> Self {
        Self { messages: vec![] }
    }

    pub fn push(&mut self, message: Bytes) {
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn messages(&self) -> &[Bytes] {
        &self.messages
    }

    /// MD5(messages) followed by SHA1(messages): the 36 byte value signed in
    /// CertificateVerify and used as the Finished PRF seed.
    pub fn digest(&self) -> [u8; TRANSCRIPT_DIGEST_SIZE] {
        let mut md5 = Md5::new();
        let mut sha1 = Sha1::new();
        for m in self.messages.iter() {
            md5.update(&m[..]);
            sha1.update(&m[..]);
        }

        let mut out = [0u8; TRANSCRIPT_DIGEST_SIZE];
        out[..16].copy_from_slice(&md5.finalize());
        out[16..].copy_from_slice(&sha1.finalize());
        out
    }
}
