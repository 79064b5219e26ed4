//! Small clientbound packets of the spawn sequence.

use crate::codec::{ByteMessage, PacketEncode};
use crate::nbt::Tag;
use crate::version::Version;

/// Compass target, packed-position form (1.19.3+, where the limbo
/// sends it).
#[derive(Debug, Clone, Copy)]
pub struct PacketSpawnPosition {
    pub x: i64,
    pub y: i64,
    pub z: i64,
    pub angle: f32,
}

impl PacketEncode for PacketSpawnPosition {
    fn encode(&self, buf: &mut ByteMessage, _version: Version) {
        let packed =
            ((self.x & 0x3FF_FFFF) << 38) | ((self.z & 0x3FF_FFFF) << 12) | (self.y & 0xFFF);
        buf.write_i64(packed);
        buf.write_f32(self.angle);
    }
}

/// Game state change (1.20.2+ requires event 13, "start waiting for
/// level chunks", before the client will leave the loading screen).
#[derive(Debug, Clone, Copy)]
pub struct PacketGameEvent {
    pub event: u8,
    pub value: f32,
}

impl PacketGameEvent {
    pub const START_WAITING_FOR_CHUNKS: u8 = 13;
}

impl PacketEncode for PacketGameEvent {
    fn encode(&self, buf: &mut ByteMessage, _version: Version) {
        buf.write_u8(self.event);
        buf.write_f32(self.value);
    }
}

/// Ability flags; the limbo uses flying + invulnerable to suppress
/// fall damage while the client hangs in the void.
#[derive(Debug, Clone, Copy)]
pub struct PacketPlayerAbilities {
    pub flags: u8,
    pub flying_speed: f32,
    pub fov_modifier: f32,
}

impl PacketPlayerAbilities {
    pub const INVULNERABLE: u8 = 0x01;
    pub const FLYING: u8 = 0x02;

    pub fn no_fall() -> Self {
        Self {
            flags: Self::INVULNERABLE | Self::FLYING,
            flying_speed: 0.0,
            fov_modifier: 0.1,
        }
    }
}

impl PacketEncode for PacketPlayerAbilities {
    fn encode(&self, buf: &mut ByteMessage, _version: Version) {
        buf.write_u8(self.flags);
        buf.write_f32(self.flying_speed);
        buf.write_f32(self.fov_modifier);
    }
}

/// World clock. Keeps the held session's daylight frozen.
#[derive(Debug, Clone, Copy)]
pub struct PacketUpdateTime {
    pub world_age: i64,
    pub time_of_day: i64,
}

impl PacketEncode for PacketUpdateTime {
    fn encode(&self, buf: &mut ByteMessage, _version: Version) {
        buf.write_i64(self.world_age);
        buf.write_i64(self.time_of_day);
    }
}

/// A chunk with no sections at the spawn column. The body is the
/// minimal form each version's client accepts for a column it will
/// never interact with.
#[derive(Debug, Clone, Copy)]
pub struct PacketEmptyChunk {
    pub x: i32,
    pub z: i32,
}

const BIOME_COLUMNS: usize = 1024;

fn heightmaps() -> Tag {
    Tag::compound()
        .put("MOTION_BLOCKING", Tag::LongArray(vec![0; 36]))
        .build()
}

impl PacketEncode for PacketEmptyChunk {
    fn encode(&self, buf: &mut ByteMessage, version: Version) {
        use Version::*;
        let v = version;

        buf.write_i32(self.x);
        buf.write_i32(self.z);
        if v.less(V1_17) {
            buf.write_bool(true); // full chunk
        }
        if v.from_to(V1_16, V1_16_1) {
            buf.write_bool(true); // ignore old data
        }
        // Section mask: short, then varint, then an empty BitSet.
        if v.less(V1_9) {
            buf.write_u16(0);
        } else if v.less(V1_17) {
            buf.write_var_int(0);
        } else if v.less(V1_18) {
            buf.write_var_int(0); // empty long array
        }
        if v.more_or_equal(V1_14) {
            heightmaps().write_named(buf);
        }
        // Biomes moved into the chunk body in 1.15 and out again in 1.18.
        if v.from_to(V1_15, V1_16_1) {
            for _ in 0..BIOME_COLUMNS {
                buf.write_i32(0);
            }
        } else if v.from_to(V1_16_2, V1_17_1) {
            buf.write_var_int(BIOME_COLUMNS as i32);
            for _ in 0..BIOME_COLUMNS {
                buf.write_var_int(0);
            }
        }
        buf.write_bytes_array(&[]); // section data
        if v.more_or_equal(V1_9_4) {
            buf.write_var_int(0); // block entities
        }
        // 1.18 merged light data into the chunk packet.
        if v.more_or_equal(V1_18) {
            if v.less(V1_20) {
                buf.write_bool(true); // trust edges
            }
            for _ in 0..4 {
                buf.write_var_int(0); // sky/block light masks
            }
            buf.write_var_int(0); // sky light arrays
            buf.write_var_int(0); // block light arrays
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_position_packing() {
        let packet = PacketSpawnPosition {
            x: 1,
            y: 2,
            z: 3,
            angle: 0.0,
        };
        let mut buf = ByteMessage::new();
        packet.encode(&mut buf, Version::V1_20);
        let packed = buf.read_i64().unwrap();
        assert_eq!(packed >> 38, 1);
        assert_eq!((packed >> 12) & 0x3FF_FFFF, 3);
        assert_eq!(packed & 0xFFF, 2);
    }

    #[test]
    fn spawn_position_negative_coordinates_masked() {
        let packet = PacketSpawnPosition {
            x: -1,
            y: -1,
            z: -1,
            angle: 0.0,
        };
        let mut buf = ByteMessage::new();
        packet.encode(&mut buf, Version::V1_20);
        let packed = buf.read_i64().unwrap();
        assert_eq!((packed >> 38) & 0x3FF_FFFF, 0x3FF_FFFF);
        assert_eq!(packed & 0xFFF, 0xFFF);
    }

    #[test]
    fn abilities_no_fall_sets_both_flags() {
        let packet = PacketPlayerAbilities::no_fall();
        assert_eq!(packet.flags, 0x03);
        let mut buf = ByteMessage::new();
        packet.encode(&mut buf, Version::V1_8);
        assert_eq!(buf.remaining(), 1 + 4 + 4);
    }

    #[test]
    fn empty_chunk_encodes_for_every_version() {
        for version in Version::ALL {
            let mut buf = ByteMessage::new();
            PacketEmptyChunk { x: 0, z: 0 }.encode(&mut buf, *version);
            let mut check = buf;
            assert_eq!(check.read_i32().unwrap(), 0);
            assert_eq!(check.read_i32().unwrap(), 0);
        }
    }

    #[test]
    fn game_event_start_waiting() {
        let mut buf = ByteMessage::new();
        PacketGameEvent {
            event: PacketGameEvent::START_WAITING_FOR_CHUNKS,
            value: 0.0,
        }
        .encode(&mut buf, Version::V1_20_2);
        assert_eq!(buf.read_u8().unwrap(), 13);
    }
}
