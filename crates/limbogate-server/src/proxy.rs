//! HAProxy protocol-v2 preamble.
//!
//! A fronting load balancer may prepend one binary header carrying the
//! real client address. It is only legal once, at the very start of the
//! stream; everything after the declared header length is ordinary
//! protocol traffic.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use bytes::{Buf, BytesMut};
use limbogate_proto::error::ProtoError;

const SIGNATURE: [u8; 12] = [
    0x0D, 0x0A, 0x0D, 0x0A, 0x00, 0x0D, 0x0A, 0x51, 0x55, 0x49, 0x54, 0x0A,
];
const HEADER_LEN: usize = 16;

#[derive(Debug, PartialEq, Eq)]
pub enum ProxyHeader {
    /// The stream does not start with the v2 signature.
    Absent,
    /// Signature seen but the full header has not arrived yet.
    Incomplete,
    /// Header consumed; the forwarded source address, if the proxy sent
    /// one (LOCAL/UNSPEC commands carry none).
    Parsed(Option<SocketAddr>),
}

/// Inspect (and, when present, consume) the proxy preamble at the
/// start of `buf`.
pub fn strip_header(buf: &mut BytesMut) -> Result<ProxyHeader, ProtoError> {
    let probe = buf.len().min(SIGNATURE.len());
    if buf[..probe] != SIGNATURE[..probe] {
        return Ok(ProxyHeader::Absent);
    }
    if buf.len() < HEADER_LEN {
        return Ok(ProxyHeader::Incomplete);
    }

    let ver_cmd = buf[12];
    if ver_cmd >> 4 != 0x2 {
        return Err(ProtoError::MalformedField(format!(
            "proxy header version {:#x}",
            ver_cmd >> 4
        )));
    }
    let family = buf[13];
    let addr_len = u16::from_be_bytes([buf[14], buf[15]]) as usize;
    if buf.len() < HEADER_LEN + addr_len {
        return Ok(ProxyHeader::Incomplete);
    }

    buf.advance(HEADER_LEN);
    let addresses = buf.split_to(addr_len);

    // LOCAL command or unspecified family: header valid, no override.
    if ver_cmd & 0x0F != 0x1 {
        return Ok(ProxyHeader::Parsed(None));
    }
    let source = match family >> 4 {
        // AF_INET, stream
        0x1 if addr_len >= 12 => {
            let mut octets = [0u8; 4];
            octets.copy_from_slice(&addresses[..4]);
            let port = u16::from_be_bytes([addresses[8], addresses[9]]);
            Some(SocketAddr::new(IpAddr::V4(Ipv4Addr::from(octets)), port))
        }
        // AF_INET6, stream
        0x2 if addr_len >= 36 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&addresses[..16]);
            let port = u16::from_be_bytes([addresses[32], addresses[33]]);
            Some(SocketAddr::new(IpAddr::V6(Ipv6Addr::from(octets)), port))
        }
        _ => None,
    };
    Ok(ProxyHeader::Parsed(source))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v2_header(family: u8, addresses: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&SIGNATURE);
        buf.extend_from_slice(&[0x21, family]);
        buf.extend_from_slice(&(addresses.len() as u16).to_be_bytes());
        buf.extend_from_slice(addresses);
        buf
    }

    #[test]
    fn plain_handshake_is_not_a_proxy_header() {
        let mut buf = BytesMut::from(&[0x10, 0x00, 0x2F][..]);
        assert_eq!(strip_header(&mut buf).unwrap(), ProxyHeader::Absent);
        assert_eq!(buf.len(), 3); // untouched
    }

    #[test]
    fn ipv4_source_extracted_and_stripped() {
        let mut addresses = Vec::new();
        addresses.extend_from_slice(&[192, 168, 1, 50]); // src
        addresses.extend_from_slice(&[10, 0, 0, 1]); // dst
        addresses.extend_from_slice(&40000u16.to_be_bytes());
        addresses.extend_from_slice(&25565u16.to_be_bytes());
        let mut buf = v2_header(0x11, &addresses);
        buf.extend_from_slice(&[0x07]); // first protocol byte

        let parsed = strip_header(&mut buf).unwrap();
        assert_eq!(
            parsed,
            ProxyHeader::Parsed(Some("192.168.1.50:40000".parse().unwrap()))
        );
        assert_eq!(buf.as_ref(), &[0x07]); // stream continues cleanly
    }

    #[test]
    fn partial_signature_waits() {
        let mut buf = BytesMut::from(&SIGNATURE[..6]);
        assert_eq!(strip_header(&mut buf).unwrap(), ProxyHeader::Incomplete);
    }

    #[test]
    fn local_command_has_no_override() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&SIGNATURE);
        buf.extend_from_slice(&[0x20, 0x00, 0x00, 0x00]);
        assert_eq!(strip_header(&mut buf).unwrap(), ProxyHeader::Parsed(None));
        assert!(buf.is_empty());
    }

    #[test]
    fn wrong_version_rejected() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&SIGNATURE);
        buf.extend_from_slice(&[0x31, 0x11, 0x00, 0x00]);
        assert!(strip_header(&mut buf).is_err());
    }
}
