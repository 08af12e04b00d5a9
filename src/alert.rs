use crate::error::Result;
use crate::parsing::ParseCursor;

tls_enum_u8!(AlertLevel => {
    warning(1), fatal(2), (255)
});

tls_enum_u8!(AlertDescription => {
    close_notify(0),
    unexpected_message(10),
    bad_record_mac(20),
    record_overflow(22),
    handshake_failure(40),
    bad_certificate(42),
    unsupported_certificate(43),
    certificate_expired(45),
    certificate_unknown(46),
    illegal_parameter(47),
    decode_error(50),
    decrypt_error(51),
    protocol_version(70),
    internal_error(80),
    user_canceled(90),
    (255)
});

/// Body of an alert record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub description: AlertDescription,
}

impl Alert {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut c = ParseCursor::new(data);
        let level = AlertLevel::parse(&mut c)?;
        let description = AlertDescription::parse(&mut c)?;
        Ok(Self { level, description })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        self.level.serialize(out);
        self.description.serialize(out);
    }
}
