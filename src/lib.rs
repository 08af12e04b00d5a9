#[macro_use]
extern crate arrayref;

#[macro_use]
mod macros;

pub mod alert;
pub mod cipher_suite;
pub mod client;
pub mod connection;
pub mod context;
pub mod error;
pub mod handshake;
pub mod key_schedule;
pub mod options;
pub mod parsing;
pub mod record;
pub mod record_stream;
pub mod session;
pub mod transcript;
pub mod x509;

#[cfg(test)]
pub(crate) mod testing;

pub use client::open_client;
pub use connection::{Connection, HandshakeStatus};
pub use context::ClientContext;
pub use error::{Error, Result};
pub use options::ClientOptions;

/// Constant time comparison function between two byte arrays.
///
/// Returns whether or not the two slices are byte-wise equal without leaking
/// the position of the first mismatch through timing.
pub fn constant_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for i in 0..a.len() {
        diff |= a[i] ^ b[i];
    }

    diff == 0
}
