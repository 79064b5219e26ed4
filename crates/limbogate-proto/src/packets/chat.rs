//! Serverbound chat. Everything past the message text is signing
//! apparatus the limbo consumes for framing correctness only; a bot
//! that cannot produce a structurally valid signature section outs
//! itself here.

use crate::codec::{ByteMessage, PacketDecode, Uuid};
use crate::error::ProtoError;
use crate::version::Version;

const SIGNATURE_BYTES: usize = 256;
const SEEN_MESSAGES_BITS: usize = 20;
/// Chains shorter than this are not produced by real clients.
const MIN_CHAIN_LINKS: i32 = 5;

#[derive(Debug, Clone)]
pub struct PacketClientChat {
    pub message: String,
    pub timestamp: Option<i64>,
    pub salt: Option<i64>,
}

impl PacketDecode for PacketClientChat {
    fn decode(buf: &mut ByteMessage, version: Version) -> Result<Self, ProtoError> {
        let message = buf.read_string_limited(256)?;
        if version.less(Version::V1_19) {
            return Ok(Self {
                message,
                timestamp: None,
                salt: None,
            });
        }
        let timestamp = buf.read_i64()?;
        let salt = buf.read_i64()?;
        if version.more_or_equal(Version::V1_19_3) {
            if buf.read_bool()? {
                buf.read_exact(SIGNATURE_BYTES)?;
            }
            read_seen_messages(buf)?;
        } else {
            buf.read_bytes_array()?; // signature
            buf.read_bool()?; // signed preview
            if version.more_or_equal(Version::V1_19_1) {
                read_chain(buf)?;
            }
        }
        Ok(Self {
            message,
            timestamp: Some(timestamp),
            salt: Some(salt),
        })
    }
}

/// 1.19.1/1.19.2 last-seen chain: seen links, then optionally received
/// links.
fn read_chain(buf: &mut ByteMessage) -> Result<(), ProtoError> {
    read_links(buf)?;
    if buf.read_bool()? {
        read_links(buf)?;
    }
    Ok(())
}

fn read_links(buf: &mut ByteMessage) -> Result<Vec<(Uuid, Vec<u8>)>, ProtoError> {
    let count = buf.read_var_int()?;
    if count <= MIN_CHAIN_LINKS {
        return Err(ProtoError::MalformedField(format!(
            "chat chain of {count} links"
        )));
    }
    let mut links = Vec::with_capacity(count as usize);
    for _ in 0..count {
        links.push((buf.read_uuid()?, buf.read_bytes_array()?));
    }
    Ok(links)
}

/// 1.19.3+ acknowledgement: offset plus a fixed 20-bit set.
fn read_seen_messages(buf: &mut ByteMessage) -> Result<(), ProtoError> {
    buf.read_var_int()?;
    buf.read_fixed_bit_set(SEEN_MESSAGES_BITS)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_chat_before_1_19() {
        let mut buf = ByteMessage::new();
        buf.write_string("hello");
        let decoded = PacketClientChat::decode(&mut buf, Version::V1_16).unwrap();
        assert_eq!(decoded.message, "hello");
        assert_eq!(decoded.timestamp, None);
    }

    #[test]
    fn v1_19_signed_chat() {
        let mut buf = ByteMessage::new();
        buf.write_string("hi");
        buf.write_i64(1_000);
        buf.write_i64(42);
        buf.write_bytes_array(&[1, 2, 3]); // signature
        buf.write_bool(false); // signed preview
        let decoded = PacketClientChat::decode(&mut buf, Version::V1_19).unwrap();
        assert_eq!(decoded.timestamp, Some(1_000));
        assert_eq!(decoded.salt, Some(42));
        assert!(buf.is_empty());
    }

    #[test]
    fn v1_19_1_short_chain_rejected() {
        let mut buf = ByteMessage::new();
        buf.write_string("hi");
        buf.write_i64(0);
        buf.write_i64(0);
        buf.write_bytes_array(&[]);
        buf.write_bool(false);
        buf.write_var_int(2); // seen chain too short
        assert!(matches!(
            PacketClientChat::decode(&mut buf, Version::V1_19_1),
            Err(ProtoError::MalformedField(_))
        ));
    }

    #[test]
    fn v1_19_3_seen_messages() {
        let mut buf = ByteMessage::new();
        buf.write_string("hi");
        buf.write_i64(0);
        buf.write_i64(0);
        buf.write_bool(true);
        buf.write_slice(&[0u8; 256]); // fixed signature
        buf.write_var_int(0); // offset
        buf.write_fixed_bit_set(&[false; 20]);
        let decoded = PacketClientChat::decode(&mut buf, Version::V1_19_3).unwrap();
        assert_eq!(decoded.message, "hi");
        assert!(buf.is_empty());
    }
}
