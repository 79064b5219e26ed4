//! Pre-encoded packet bodies.
//!
//! A `PacketSnapshot` pairs a packet's logical kind with its encoded
//! body for one version, so the session layer can send it without
//! re-running encode. The wire id is resolved at send time from the
//! registry, which keeps a snapshot valid across every version that
//! shares the same body layout.

use bytes::Bytes;

use crate::codec::{ByteMessage, PacketEncode};
use crate::registry::PacketKind;
use crate::version::Version;

#[derive(Debug, Clone)]
pub struct PacketSnapshot {
    pub kind: PacketKind,
    pub body: Bytes,
}

impl PacketSnapshot {
    pub fn encode<P: PacketEncode>(kind: PacketKind, packet: &P, version: Version) -> Self {
        let mut buf = ByteMessage::new();
        packet.encode(&mut buf, version);
        Self {
            kind,
            body: buf.into_bytes(),
        }
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::status::PacketStatusPing;

    #[test]
    fn snapshot_captures_encoded_body() {
        let ping = PacketStatusPing { randomized: 42 };
        let snapshot = PacketSnapshot::encode(PacketKind::StatusPing, &ping, Version::V1_8);
        assert_eq!(snapshot.kind, PacketKind::StatusPing);
        assert_eq!(snapshot.body.as_ref(), 42i64.to_be_bytes());
    }
}
