// TLS 1.0 PRF and the secrets derived with it.

use bytes::Bytes;
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use zeroize::Zeroizing;

use crate::cipher_suite::CipherSuiteParams;
use crate::handshake::RANDOM_SIZE;
use crate::transcript::Transcript;

pub const PREMASTER_SECRET_SIZE: usize = 48;
pub const MASTER_SECRET_SIZE: usize = 48;
pub const VERIFY_DATA_LENGTH: usize = 12;

pub const CLIENT_FINISHED_LABEL: &[u8] = b"client finished";
pub const SERVER_FINISHED_LABEL: &[u8] = b"server finished";

/*
key_block = PRF(SecurityParameters.master_secret,
    "key expansion",
    SecurityParameters.server_random +
    SecurityParameters.client_random);

client_write_MAC_secret[SecurityParameters.hash_size]
server_write_MAC_secret[SecurityParameters.hash_size]
client_write_key[SecurityParameters.key_material_length]
server_write_key[SecurityParameters.key_material_length]
client_write_IV[SecurityParameters.IV_size]
server_write_IV[SecurityParameters.IV_size]
*/
#[derive(Debug)]
pub struct KeyBlock {
    pub client_write_mac_key: Bytes,
    pub server_write_mac_key: Bytes,
    pub client_write_key: Bytes,
    pub server_write_key: Bytes,
    pub client_write_iv: Bytes,
    pub server_write_iv: Bytes,
}

/// master_secret = PRF(pre_master_secret, "master secret",
///     ClientHello.random + ServerHello.random)
///     [0..47];
pub fn master_secret(
    premaster: &[u8],
    client_random: &[u8; RANDOM_SIZE],
    server_random: &[u8; RANDOM_SIZE],
) -> Zeroizing<[u8; MASTER_SECRET_SIZE]> {
    let mut seed = [0u8; 2 * RANDOM_SIZE];
    seed[..RANDOM_SIZE].copy_from_slice(client_random);
    seed[RANDOM_SIZE..].copy_from_slice(server_random);

    let out = prf(premaster, b"master secret", &seed, MASTER_SECRET_SIZE);

    let mut master = Zeroizing::new([0u8; MASTER_SECRET_SIZE]);
    master.copy_from_slice(&out);
    master
}

/// Expands the master secret into the key material for both directions,
/// split in the canonical order.
pub fn key_block(
    master: &[u8],
    client_random: &[u8; RANDOM_SIZE],
    server_random: &[u8; RANDOM_SIZE],
    params: &CipherSuiteParams,
) -> KeyBlock {
    let block_size = 2 * (params.mac_key_size + params.enc_key_size + params.iv_size);

    // NOTE: The randoms swap order relative to the master secret seed.
    let mut seed = [0u8; 2 * RANDOM_SIZE];
    seed[..RANDOM_SIZE].copy_from_slice(server_random);
    seed[RANDOM_SIZE..].copy_from_slice(client_random);

    let mut block = Bytes::copy_from_slice(&prf(master, b"key expansion", &seed, block_size));

    let client_write_mac_key = block.split_to(params.mac_key_size);
    let server_write_mac_key = block.split_to(params.mac_key_size);

    let client_write_key = block.split_to(params.enc_key_size);
    let server_write_key = block.split_to(params.enc_key_size);

    let client_write_iv = block.split_to(params.iv_size);
    let server_write_iv = block.split_to(params.iv_size);

    assert_eq!(block.len(), 0);

    KeyBlock {
        client_write_mac_key,
        server_write_mac_key,
        client_write_key,
        server_write_key,
        client_write_iv,
        server_write_iv,
    }
}

/// verify_data = PRF(master_secret, finished_label,
///     MD5(handshake_messages) + SHA-1(handshake_messages))[0..11];
pub fn verify_data(
    master: &[u8],
    transcript: &Transcript,
    label: &'static [u8],
) -> [u8; VERIFY_DATA_LENGTH] {
    let digest = transcript.digest();
    let out = prf(master, label, &digest, VERIFY_DATA_LENGTH);
    *array_ref![out, 0, VERIFY_DATA_LENGTH]
}

/// TLS 1.0 PRF: the secret is split into two halves (overlapping by one byte
/// when the length is odd) and
///
/// PRF(secret, label, seed) = P_MD5(S1, label + seed) XOR
///                            P_SHA1(S2, label + seed)
pub fn prf(secret: &[u8], label: &[u8], seed: &[u8], output_size: usize) -> Zeroizing<Vec<u8>> {
    let half = (secret.len() + 1) / 2;
    let s1 = &secret[..half];
    let s2 = &secret[secret.len() - half..];

    let mut data = label.to_vec();
    data.extend_from_slice(seed);

    let md5_part = p_hash(hmac_md5, s1, &data, output_size);
    let sha1_part = p_hash(hmac_sha1, s2, &data, output_size);

    let mut out = Zeroizing::new(vec![0u8; output_size]);
    for i in 0..output_size {
        out[i] = md5_part[i] ^ sha1_part[i];
    }

    out
}

/// Defined in the TLS 1.0 RFC as:
///
/// P_hash(secret, seed) =
///     HMAC_hash(secret, A(1) + seed) +
///     HMAC_hash(secret, A(2) + seed) +
///     HMAC_hash(secret, A(3) + seed) + ...
fn p_hash(
    hmac: fn(&[u8], &[u8]) -> Vec<u8>,
    secret: &[u8],
    seed: &[u8],
    output_size: usize,
) -> Zeroizing<Vec<u8>> {
    // Current value of A(i) where:
    //   A(0) = seed
    //   A(i) = HMAC_hash(secret, A(i-1))
    let mut a = seed.to_vec();

    let mut out = Zeroizing::new(Vec::with_capacity(output_size + 20));
    while out.len() < output_size {
        a = hmac(secret, &a);

        let mut data = a.clone();
        data.extend_from_slice(seed);

        out.extend_from_slice(&hmac(secret, &data));
    }

    out.truncate(output_size);

    out
}

fn hmac_md5(secret: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Md5>::new_from_slice(secret).unwrap();
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hmac_sha1(secret: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret).unwrap();
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
