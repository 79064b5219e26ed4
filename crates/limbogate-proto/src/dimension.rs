//! Dimension metadata for the synthetic world.
//!
//! Two parallel back-ends exist for the dimension-codec blobs, selected
//! by configuration: `Static` writes precomputed minimal tags, while
//! `Registry` builds the full structured codec (dimension type, biome
//! and, for 1.19+, chat type registries). Both feed the same
//! version-gated field order in the join-game packet.

use serde::Deserialize;

use crate::nbt::Tag;
use crate::version::Version;

/// Which codec builder the join-game/registry packets use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionBackend {
    Static,
    Registry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionType {
    Overworld,
    Nether,
    End,
}

impl DimensionType {
    pub fn key(self) -> &'static str {
        match self {
            DimensionType::Overworld => "minecraft:overworld",
            DimensionType::Nether => "minecraft:the_nether",
            DimensionType::End => "minecraft:the_end",
        }
    }

    /// Pre-1.16 numeric dimension id.
    pub fn legacy_id(self) -> i8 {
        match self {
            DimensionType::Overworld => 0,
            DimensionType::Nether => -1,
            DimensionType::End => 1,
        }
    }

    fn has_skylight(self) -> bool {
        matches!(self, DimensionType::Overworld)
    }
}

/// Per-dimension attribute compound ("element" body of the registry
/// entry). Field set grew over the version span; gates follow the
/// client's codec schema changes.
pub fn dimension_attributes(dimension: DimensionType, version: Version) -> Tag {
    let mut tag = Tag::compound()
        .put_string("infiniburn", infiniburn(version))
        .put_byte("natural", 1)
        .put_float("ambient_light", 0.0)
        .put_byte("has_skylight", dimension.has_skylight() as i8)
        .put_byte("has_ceiling", 0)
        .put_byte("ultrawarm", 0)
        .put_byte("has_raids", 1)
        .put_byte("respawn_anchor_works", 0)
        .put_byte("bed_works", 1)
        .put_byte("piglin_safe", 0)
        .put_double("coordinate_scale", 1.0)
        .put_long("fixed_time", 6000)
        .put_int("logical_height", 256);
    if version.more_or_equal(Version::V1_17) {
        tag = tag.put_int("min_y", 0).put_int("height", 256);
    }
    if version.more_or_equal(Version::V1_16_2) {
        tag = tag.put_string("effects", dimension.key());
    }
    if version.more_or_equal(Version::V1_19) {
        tag = tag
            .put_int("monster_spawn_block_light_limit", 0)
            .put_int("monster_spawn_light_level", 0);
    }
    tag.build()
}

fn infiniburn(version: Version) -> &'static str {
    if version.more_or_equal(Version::V1_18_2) {
        "#minecraft:infiniburn_overworld"
    } else {
        "minecraft:infiniburn_overworld"
    }
}

/// Registry entry wrapper: {name, id, element}.
fn registry_entry(name: &str, id: i32, element: Tag) -> Tag {
    Tag::compound()
        .put_string("name", name)
        .put_int("id", id)
        .put("element", element)
        .build()
}

fn biome_element(version: Version) -> Tag {
    let mut tag = Tag::compound()
        .put_string("precipitation", "rain")
        .put_float("temperature", 0.8)
        .put_float("downfall", 0.4)
        .put(
            "effects",
            Tag::compound()
                .put_int("sky_color", 7907327)
                .put_int("fog_color", 12638463)
                .put_int("water_color", 4159204)
                .put_int("water_fog_color", 329011)
                .build(),
        );
    if version.more_or_equal(Version::V1_19_4) {
        tag = tag.put_byte("has_precipitation", 1);
    }
    tag.build()
}

fn chat_type_decoration(translation_key: &str) -> Tag {
    Tag::compound()
        .put_string("translation_key", translation_key)
        .put(
            "parameters",
            Tag::List(vec![
                Tag::String("sender".into()),
                Tag::String("content".into()),
            ]),
        )
        .build()
}

fn chat_type_element() -> Tag {
    Tag::compound()
        .put("chat", chat_type_decoration("chat.type.text"))
        .put("narration", chat_type_decoration("chat.type.text.narrate"))
        .build()
}

/// Full registry codec ("registry" back-end), the compound written in
/// join-game (<1.20.2) and registry-data (1.20.2+).
pub fn registry_codec(dimension: DimensionType, version: Version) -> Tag {
    let mut root = Tag::compound().put(
        "minecraft:dimension_type",
        Tag::compound()
            .put_string("type", "minecraft:dimension_type")
            .put(
                "value",
                Tag::List(vec![registry_entry(
                    dimension.key(),
                    0,
                    dimension_attributes(dimension, version),
                )]),
            )
            .build(),
    );
    root = root.put(
        "minecraft:worldgen/biome",
        Tag::compound()
            .put_string("type", "minecraft:worldgen/biome")
            .put(
                "value",
                Tag::List(vec![registry_entry(
                    "minecraft:plains",
                    0,
                    biome_element(version),
                )]),
            )
            .build(),
    );
    if version.more_or_equal(Version::V1_19) {
        root = root.put(
            "minecraft:chat_type",
            Tag::compound()
                .put_string("type", "minecraft:chat_type")
                .put(
                    "value",
                    Tag::List(vec![registry_entry(
                        "minecraft:chat",
                        0,
                        chat_type_element(),
                    )]),
                )
                .build(),
        );
    }
    root.build()
}

/// Minimal codec for the "static" back-end: dimension list only, no
/// biome/chat registries. Old clients accept this for a held session.
pub fn static_codec(dimension: DimensionType, version: Version) -> Tag {
    Tag::compound()
        .put(
            "minecraft:dimension_type",
            Tag::compound()
                .put_string("type", "minecraft:dimension_type")
                .put(
                    "value",
                    Tag::List(vec![registry_entry(
                        dimension.key(),
                        0,
                        dimension_attributes(dimension, version),
                    )]),
                )
                .build(),
        )
        .build()
}

/// Codec tag for a version under a given back-end. The 1.19.4 tag is
/// produced with the 1.20 schema, matching observed client tolerance.
pub fn codec_for(backend: DimensionBackend, dimension: DimensionType, version: Version) -> Tag {
    let effective = if version == Version::V1_19_4 {
        Version::V1_20
    } else {
        version
    };
    match backend {
        DimensionBackend::Static => static_codec(dimension, effective),
        DimensionBackend::Registry => registry_codec(dimension, effective),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ByteMessage;

    fn encoded_len(tag: &Tag) -> usize {
        let mut buf = ByteMessage::new();
        tag.write_named(&mut buf);
        buf.remaining()
    }

    #[test]
    fn registry_codec_grows_with_chat_types() {
        let old = registry_codec(DimensionType::Overworld, Version::V1_16_2);
        let new = registry_codec(DimensionType::Overworld, Version::V1_19);
        assert!(encoded_len(&new) > encoded_len(&old));
    }

    #[test]
    fn static_codec_is_smaller_than_registry() {
        let v = Version::V1_18_2;
        let full = registry_codec(DimensionType::Overworld, v);
        let min = static_codec(DimensionType::Overworld, v);
        assert!(encoded_len(&min) < encoded_len(&full));
    }

    #[test]
    fn v1_19_4_uses_v1_20_schema() {
        let flagged = codec_for(
            DimensionBackend::Registry,
            DimensionType::Overworld,
            Version::V1_19_4,
        );
        let v20 = registry_codec(DimensionType::Overworld, Version::V1_20);
        assert_eq!(encoded_len(&flagged), encoded_len(&v20));
    }

    #[test]
    fn legacy_dimension_ids() {
        assert_eq!(DimensionType::Overworld.legacy_id(), 0);
        assert_eq!(DimensionType::Nether.legacy_id(), -1);
        assert_eq!(DimensionType::End.legacy_id(), 1);
    }
}
