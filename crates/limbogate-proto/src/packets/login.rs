//! Login-state packets.
//!
//! The login-start body changed three times across the supported span:
//! 1.19 added (and 1.19.1 kept) optional signature data, 1.19.1 made
//! the profile id an optional trailer, and 1.20.2 made it mandatory.
//! Signature material is consumed and discarded; the limbo never
//! verifies it.

use crate::codec::{ByteMessage, PacketDecode, PacketEncode, Uuid};
use crate::error::ProtoError;
use crate::version::Version;

pub const MAX_USERNAME_CHARS: usize = 16;

#[derive(Debug, Clone)]
pub struct PacketLoginStart {
    pub username: String,
    pub uuid: Option<Uuid>,
}

impl PacketDecode for PacketLoginStart {
    fn decode(buf: &mut ByteMessage, version: Version) -> Result<Self, ProtoError> {
        let username = buf.read_string_limited(MAX_USERNAME_CHARS)?;
        if version.from_to(Version::V1_19, Version::V1_19_1) && buf.read_bool()? {
            buf.read_i64()?; // expiry timestamp
            buf.read_bytes_array()?; // public key
            buf.read_bytes_array()?; // signature
        }
        let uuid = if version.more_or_equal(Version::V1_20_2) {
            Some(buf.read_uuid()?)
        } else if version.more_or_equal(Version::V1_19_1) && buf.read_bool()? {
            Some(buf.read_uuid()?)
        } else {
            None
        };
        Ok(Self { username, uuid })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PacketLoginAcknowledged;

impl PacketDecode for PacketLoginAcknowledged {
    fn decode(_buf: &mut ByteMessage, _version: Version) -> Result<Self, ProtoError> {
        Ok(Self)
    }
}

#[derive(Debug, Clone)]
pub struct PacketLoginSuccess {
    pub uuid: Uuid,
    pub username: String,
}

impl PacketEncode for PacketLoginSuccess {
    fn encode(&self, buf: &mut ByteMessage, version: Version) {
        if version.less(Version::V1_16) {
            buf.write_string(&self.uuid.to_hyphenated());
        } else {
            buf.write_uuid(self.uuid);
        }
        buf.write_string(&self.username);
        if version.more_or_equal(Version::V1_19) {
            buf.write_var_int(0); // profile properties
        }
    }
}

/// Disconnect with a JSON chat component, valid in LOGIN,
/// CONFIGURATION and PLAY.
#[derive(Debug, Clone)]
pub struct PacketDisconnect {
    pub reason: String,
}

impl PacketEncode for PacketDisconnect {
    fn encode(&self, buf: &mut ByteMessage, _version: Version) {
        buf.write_string(&self.reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_start(version: Version, write: impl FnOnce(&mut ByteMessage)) -> PacketLoginStart {
        let mut buf = ByteMessage::new();
        write(&mut buf);
        PacketLoginStart::decode(&mut buf, version).unwrap()
    }

    #[test]
    fn legacy_login_start_is_just_a_name() {
        let decoded = decode_start(Version::V1_8, |buf| buf.write_string("Steve"));
        assert_eq!(decoded.username, "Steve");
        assert_eq!(decoded.uuid, None);
    }

    #[test]
    fn v1_19_signature_data_is_skipped() {
        let decoded = decode_start(Version::V1_19, |buf| {
            buf.write_string("Steve");
            buf.write_bool(true);
            buf.write_i64(9999);
            buf.write_bytes_array(&[1, 2, 3]);
            buf.write_bytes_array(&[4, 5]);
        });
        assert_eq!(decoded.username, "Steve");
        assert_eq!(decoded.uuid, None);
    }

    #[test]
    fn v1_19_1_optional_uuid_trailer() {
        let uuid = Uuid::new(1, 2);
        let decoded = decode_start(Version::V1_19_1, |buf| {
            buf.write_string("Steve");
            buf.write_bool(false); // no signature
            buf.write_bool(true);
            buf.write_uuid(uuid);
        });
        assert_eq!(decoded.uuid, Some(uuid));
    }

    #[test]
    fn v1_20_2_uuid_is_mandatory() {
        let uuid = Uuid::new(3, 4);
        let decoded = decode_start(Version::V1_20_2, |buf| {
            buf.write_string("Alex");
            buf.write_uuid(uuid);
        });
        assert_eq!(decoded.uuid, Some(uuid));

        let mut buf = ByteMessage::new();
        buf.write_string("Alex");
        assert!(PacketLoginStart::decode(&mut buf, Version::V1_20_2).is_err());
    }

    #[test]
    fn oversized_username_rejected() {
        let mut buf = ByteMessage::new();
        buf.write_string("ThisNameIsWayTooLongForMinecraft");
        assert!(matches!(
            PacketLoginStart::decode(&mut buf, Version::V1_8),
            Err(ProtoError::StringTooLong { .. })
        ));
    }

    #[test]
    fn login_success_uuid_form_by_version() {
        let packet = PacketLoginSuccess {
            uuid: Uuid::new(0x0123_4567_89AB_CDEF, 0xFEDC_BA98_7654_3210),
            username: "Steve".into(),
        };

        let mut old = ByteMessage::new();
        packet.encode(&mut old, Version::V1_12_2);
        assert_eq!(
            old.read_string().unwrap(),
            "01234567-89ab-cdef-fedc-ba9876543210"
        );

        let mut new = ByteMessage::new();
        packet.encode(&mut new, Version::V1_16);
        assert_eq!(new.read_uuid().unwrap(), packet.uuid);
        assert_eq!(new.read_string().unwrap(), "Steve");

        let mut signed = ByteMessage::new();
        packet.encode(&mut signed, Version::V1_19);
        signed.read_uuid().unwrap();
        signed.read_string().unwrap();
        assert_eq!(signed.read_var_int().unwrap(), 0);
        assert!(signed.is_empty());
    }
}
