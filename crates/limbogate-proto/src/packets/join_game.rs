//! The join-game (login) packet, the most heavily version-gated body
//! the limbo sends. Field order follows the client's play-login layout
//! for each version; the dimension section is where the two codec
//! back-ends diverge.

use crate::codec::{ByteMessage, PacketEncode};
use crate::dimension::{self, DimensionBackend, DimensionType};
use crate::version::Version;

#[derive(Debug, Clone)]
pub struct PacketJoinGame {
    pub entity_id: i32,
    pub hardcore: bool,
    /// 0 survival .. 3 spectator. Spectator does not exist before 1.8
    /// and is downgraded to creative there.
    pub gamemode: u8,
    pub previous_gamemode: i8,
    pub backend: DimensionBackend,
    pub dimension: DimensionType,
    pub hashed_seed: i64,
    pub max_players: u8,
    pub view_distance: i32,
    pub reduced_debug_info: bool,
    pub enable_respawn_screen: bool,
    pub is_debug: bool,
    pub is_flat: bool,
}

impl PacketJoinGame {
    pub fn new(backend: DimensionBackend, dimension: DimensionType) -> Self {
        Self {
            entity_id: 0,
            hardcore: true,
            gamemode: 3,
            previous_gamemode: -1,
            backend,
            dimension,
            hashed_seed: 0,
            max_players: 1,
            view_distance: 2,
            reduced_debug_info: true,
            enable_respawn_screen: true,
            is_debug: false,
            is_flat: true,
        }
    }

    fn world_name(&self) -> &'static str {
        self.dimension.key()
    }

    fn effective_gamemode(&self, version: Version) -> u8 {
        // No spectator before 1.8.
        if version.less(Version::V1_8) && self.gamemode == 3 {
            1
        } else {
            self.gamemode
        }
    }

    fn write_dimension_section(&self, buf: &mut ByteMessage, version: Version) {
        use Version::*;
        let v = version;
        match self.backend {
            DimensionBackend::Registry => {
                if v.less(V1_9_1) {
                    buf.write_i8(self.dimension.legacy_id());
                } else if v.from_to(V1_9_1, V1_15_2) {
                    buf.write_i32(self.dimension.legacy_id() as i32);
                } else if v.less(V1_20_2) {
                    let codec = dimension::codec_for(self.backend, self.dimension, v);
                    codec.write_named(buf);
                    if v.from_to(V1_16, V1_16_1) {
                        buf.write_string(self.world_name());
                    } else if v.less(V1_19) {
                        dimension::dimension_attributes(self.dimension, v).write_named(buf);
                    }
                }
            }
            DimensionBackend::Static => {
                if v.more_or_equal(V1_16) && v.less(V1_20_2) {
                    let codec = dimension::codec_for(self.backend, self.dimension, v);
                    codec.write_named(buf);
                    if v.from_to(V1_16, V1_16_1) || v.more_or_equal(V1_19) {
                        buf.write_string(self.world_name());
                    } else {
                        dimension::dimension_attributes(self.dimension, v).write_named(buf);
                    }
                    buf.write_string(self.world_name());
                }
                if v.less(V1_9_1) {
                    buf.write_i8(self.dimension.legacy_id());
                } else if v.from_to(V1_9_1, V1_15_2) {
                    buf.write_i32(self.dimension.legacy_id() as i32);
                }
            }
        }
    }
}

impl PacketEncode for PacketJoinGame {
    fn encode(&self, buf: &mut ByteMessage, version: Version) {
        use Version::*;
        let v = version;

        buf.write_i32(self.entity_id);
        if v.more_or_equal(V1_16_2) {
            buf.write_bool(self.hardcore);
        }
        if v.less(V1_20_2) {
            buf.write_u8(self.effective_gamemode(v));
        }
        if v.more_or_equal(V1_16) {
            if v.less(V1_20_2) {
                buf.write_i8(self.previous_gamemode);
            }
            buf.write_string_array(&[self.world_name()]);
        }

        self.write_dimension_section(buf, v);

        // World name (registry back-end writes it outside the
        // dimension section).
        if self.backend == DimensionBackend::Registry
            && v.more_or_equal(V1_16)
            && v.less(V1_20_2)
        {
            if v.more_or_equal(V1_19) || v.from_to(V1_16, V1_16_1) {
                buf.write_string(self.world_name()); // world type
            }
            buf.write_string(self.world_name());
        }

        if v.more_or_equal(V1_15) && v.less(V1_20_2) {
            buf.write_i64(self.hashed_seed);
        }
        if v.less(V1_14) {
            buf.write_u8(0); // difficulty
        }
        if v.more_or_equal(V1_16_2) {
            buf.write_var_int(self.max_players as i32);
        } else {
            buf.write_u8(self.max_players);
        }
        if v.less(V1_16) {
            buf.write_string("flat"); // level type
        }
        if v.more_or_equal(V1_14) {
            buf.write_var_int(self.view_distance);
        }
        if v.more_or_equal(V1_18) {
            buf.write_var_int(self.view_distance); // simulation distance
        }
        if v.more_or_equal(V1_8) {
            buf.write_bool(self.reduced_debug_info);
        }
        if v.more_or_equal(V1_15) {
            buf.write_bool(self.enable_respawn_screen);
        }

        if v.more_or_equal(V1_20_2) {
            buf.write_bool(true); // limited crafting
            buf.write_string(self.world_name()); // dimension type
            buf.write_string(self.world_name());
            buf.write_i64(self.hashed_seed);
            buf.write_u8(self.gamemode);
            buf.write_i8(self.previous_gamemode);
        }
        if v.more_or_equal(V1_16) {
            buf.write_bool(self.is_debug);
            buf.write_bool(self.is_flat);
        }
        if v.more_or_equal(V1_19) {
            buf.write_bool(false); // last death position
            if v.more_or_equal(V1_20) {
                buf.write_var_int(0); // portal cooldown
            }
        }
    }
}
