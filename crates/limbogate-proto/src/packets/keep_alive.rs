use crate::codec::{ByteMessage, PacketDecode, PacketEncode};
use crate::error::ProtoError;
use crate::version::Version;

/// Liveness probe, echoed by the client. The id field was an i32
/// originally, a varint from 1.8 and a full i64 from 1.12.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketKeepAlive {
    pub id: i64,
}

impl PacketEncode for PacketKeepAlive {
    fn encode(&self, buf: &mut ByteMessage, version: Version) {
        if version.more_or_equal(Version::V1_12_2) {
            buf.write_i64(self.id);
        } else if version.more_or_equal(Version::V1_8) {
            buf.write_var_int(self.id as i32);
        } else {
            buf.write_i32(self.id as i32);
        }
    }
}

impl PacketDecode for PacketKeepAlive {
    fn decode(buf: &mut ByteMessage, version: Version) -> Result<Self, ProtoError> {
        let id = if version.more_or_equal(Version::V1_12_2) {
            buf.read_i64()?
        } else if version.more_or_equal(Version::V1_8) {
            buf.read_var_int()? as i64
        } else {
            buf.read_i32()? as i64
        };
        Ok(Self { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(version: Version, id: i64) {
        let mut buf = ByteMessage::new();
        PacketKeepAlive { id }.encode(&mut buf, version);
        assert_eq!(
            PacketKeepAlive::decode(&mut buf, version).unwrap().id,
            id
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn wire_form_tracks_version() {
        roundtrip(Version::V1_7_2, 1234);
        roundtrip(Version::V1_8, 1234);
        roundtrip(Version::V1_12_2, 0x1122_3344_5566_7788);
        roundtrip(Version::V1_20_4, -9);

        let mut buf = ByteMessage::new();
        PacketKeepAlive { id: 5 }.encode(&mut buf, Version::V1_8);
        assert_eq!(buf.remaining(), 1); // varint

        let mut buf = ByteMessage::new();
        PacketKeepAlive { id: 5 }.encode(&mut buf, Version::V1_7_2);
        assert_eq!(buf.remaining(), 4); // i32

        let mut buf = ByteMessage::new();
        PacketKeepAlive { id: 5 }.encode(&mut buf, Version::V1_13);
        assert_eq!(buf.remaining(), 8); // i64
    }
}
