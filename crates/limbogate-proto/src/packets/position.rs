//! Movement packets. The serverbound pair feeds the movement checks;
//! the clientbound position/look is the teleport that anchors the
//! client at the limbo spawn.

use crate::codec::{ByteMessage, PacketDecode, PacketEncode};
use crate::error::ProtoError;
use crate::version::Version;

/// Serverbound player position. 1.7 carried a second, head-level Y
/// between feet Y and Z.
#[derive(Debug, Clone, Copy)]
pub struct PacketPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub on_ground: bool,
}

impl PacketDecode for PacketPosition {
    fn decode(buf: &mut ByteMessage, version: Version) -> Result<Self, ProtoError> {
        let x = buf.read_f64()?;
        let y = buf.read_f64()?;
        if version.less(Version::V1_8) {
            buf.read_f64()?; // head y
        }
        Ok(Self {
            x,
            y,
            z: buf.read_f64()?,
            on_ground: buf.read_bool()?,
        })
    }
}

/// Serverbound position + look.
#[derive(Debug, Clone, Copy)]
pub struct PacketPositionLook {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

impl PacketDecode for PacketPositionLook {
    fn decode(buf: &mut ByteMessage, version: Version) -> Result<Self, ProtoError> {
        let x = buf.read_f64()?;
        let y = buf.read_f64()?;
        if version.less(Version::V1_8) {
            buf.read_f64()?; // head y
        }
        Ok(Self {
            x,
            y,
            z: buf.read_f64()?,
            yaw: buf.read_f32()?,
            pitch: buf.read_f32()?,
            on_ground: buf.read_bool()?,
        })
    }
}

/// Clientbound teleport. 1.8 switched the trailing on-ground flag for a
/// relative-bits byte, 1.9 added the teleport id the client must echo,
/// and 1.17 through 1.19.3 carried a dismount-vehicle flag.
#[derive(Debug, Clone, Copy)]
pub struct PacketServerPositionLook {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub teleport_id: i32,
}

impl PacketEncode for PacketServerPositionLook {
    fn encode(&self, buf: &mut ByteMessage, version: Version) {
        buf.write_f64(self.x);
        if version.less(Version::V1_8) {
            buf.write_f64(self.y + 1.62); // eye height
        } else {
            buf.write_f64(self.y);
        }
        buf.write_f64(self.z);
        buf.write_f32(self.yaw);
        buf.write_f32(self.pitch);
        if version.less(Version::V1_8) {
            buf.write_bool(true); // on ground
        } else {
            buf.write_u8(0x00); // all coordinates absolute
        }
        if version.more_or_equal(Version::V1_9) {
            buf.write_var_int(self.teleport_id);
        }
        if version.more_or_equal(Version::V1_17) && version.less(Version::V1_19_4) {
            buf.write_bool(false); // dismount vehicle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_position_has_head_y() {
        let mut buf = ByteMessage::new();
        buf.write_f64(1.0);
        buf.write_f64(64.0);
        buf.write_f64(65.62); // head y, dropped
        buf.write_f64(-3.0);
        buf.write_bool(true);
        let decoded = PacketPosition::decode(&mut buf, Version::V1_7_2).unwrap();
        assert_eq!(decoded.y, 64.0);
        assert_eq!(decoded.z, -3.0);
        assert!(decoded.on_ground);
    }

    #[test]
    fn modern_position_look_roundtrip() {
        let mut buf = ByteMessage::new();
        buf.write_f64(0.5);
        buf.write_f64(100.0);
        buf.write_f64(0.5);
        buf.write_f32(90.0);
        buf.write_f32(-10.0);
        buf.write_bool(false);
        let decoded = PacketPositionLook::decode(&mut buf, Version::V1_16).unwrap();
        assert_eq!(decoded.yaw, 90.0);
        assert_eq!(decoded.pitch, -10.0);
        assert!(!decoded.on_ground);
        assert!(buf.is_empty());
    }

    fn teleport(version: Version) -> ByteMessage {
        let mut buf = ByteMessage::new();
        PacketServerPositionLook {
            x: 0.5,
            y: 100.0,
            z: 0.5,
            yaw: 0.0,
            pitch: 0.0,
            teleport_id: 7,
        }
        .encode(&mut buf, version);
        buf
    }

    #[test]
    fn teleport_grows_with_version() {
        // 1.7: 3 doubles + 2 floats + bool, eye height folded into y.
        let mut old = teleport(Version::V1_7_2);
        old.read_f64().unwrap();
        assert_eq!(old.read_f64().unwrap(), 101.62);
        assert_eq!(old.remaining(), 8 + 4 + 4 + 1);

        // 1.9 appends the teleport id after the flags byte.
        let mut v9 = teleport(Version::V1_9);
        for _ in 0..3 {
            v9.read_f64().unwrap();
        }
        v9.read_f32().unwrap();
        v9.read_f32().unwrap();
        assert_eq!(v9.read_u8().unwrap(), 0x00);
        assert_eq!(v9.read_var_int().unwrap(), 7);
        assert!(v9.is_empty());

        // The dismount flag exists only in 1.17..1.19.3.
        assert_eq!(teleport(Version::V1_17).remaining(), teleport(Version::V1_9).remaining() + 1);
        assert_eq!(teleport(Version::V1_19_4).remaining(), teleport(Version::V1_9).remaining());
    }
}
