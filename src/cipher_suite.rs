use crate::error::{Error, Result};

// All suites use RSA key exchange; the server picks one octet out of the
// client's preference list. On the wire each code is the pair (0x00, octet).
tls_enum_u8!(CipherSuite => {
    TLS_RSA_WITH_RC4_128_MD5(0x04),
    TLS_RSA_WITH_RC4_128_SHA(0x05),
    TLS_RSA_WITH_AES_128_CBC_SHA(0x2f),
    TLS_RSA_WITH_AES_256_CBC_SHA(0x35),
    (255)
});

/// Offered suites in decreasing order of desirability.
pub const CIPHER_SUITE_PREFERENCES: [CipherSuite; 4] = [
    CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
    CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA,
    CipherSuite::TLS_RSA_WITH_RC4_128_SHA,
    CipherSuite::TLS_RSA_WITH_RC4_128_MD5,
];

/// Key material lengths needed when expanding the key block for a suite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CipherSuiteParams {
    pub mac_key_size: usize,
    pub enc_key_size: usize,
    pub iv_size: usize,
}

impl CipherSuite {
    pub fn params(&self) -> Result<CipherSuiteParams> {
        Ok(match self {
            CipherSuite::TLS_RSA_WITH_RC4_128_MD5 => CipherSuiteParams {
                mac_key_size: 16,
                enc_key_size: 16,
                iv_size: 0,
            },
            CipherSuite::TLS_RSA_WITH_RC4_128_SHA => CipherSuiteParams {
                mac_key_size: 20,
                enc_key_size: 16,
                iv_size: 0,
            },
            CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA => CipherSuiteParams {
                mac_key_size: 20,
                enc_key_size: 16,
                iv_size: 16,
            },
            CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA => CipherSuiteParams {
                mac_key_size: 20,
                enc_key_size: 32,
                iv_size: 16,
            },
            CipherSuite::unknown(_) => {
                return Err(Error::IllegalParameter("unknown cipher suite"));
            }
        })
    }
}
