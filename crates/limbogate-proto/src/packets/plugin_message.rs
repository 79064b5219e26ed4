use crate::codec::{ByteMessage, PacketDecode, PacketEncode};
use crate::error::ProtoError;
use crate::version::Version;

/// Channel name carrying the client brand. Renamed with the 1.13
/// resource-location flattening.
pub fn brand_channel(version: Version) -> &'static str {
    if version.more_or_equal(Version::V1_13) {
        "minecraft:brand"
    } else {
        "MC|Brand"
    }
}

/// Namespaced custom payload. The data is everything after the channel
/// name, unprefixed.
#[derive(Debug, Clone)]
pub struct PacketPluginMessage {
    pub channel: String,
    pub data: Vec<u8>,
}

impl PacketPluginMessage {
    /// Server brand announcement on the version's brand channel.
    pub fn brand(version: Version, brand: &str) -> Self {
        let mut data = ByteMessage::new();
        data.write_string(brand);
        Self {
            channel: brand_channel(version).to_owned(),
            data: data.into_bytes().to_vec(),
        }
    }

    pub fn is_brand(&self, version: Version) -> bool {
        self.channel == brand_channel(version)
    }

    /// Brand string carried in the payload, if it parses as one.
    pub fn brand_payload(&self) -> Option<String> {
        let mut buf = ByteMessage::from_slice(&self.data);
        buf.read_string_limited(128).ok()
    }
}

impl PacketDecode for PacketPluginMessage {
    fn decode(buf: &mut ByteMessage, _version: Version) -> Result<Self, ProtoError> {
        Ok(Self {
            channel: buf.read_string_limited(128)?,
            data: buf.read_remaining(),
        })
    }
}

impl PacketEncode for PacketPluginMessage {
    fn encode(&self, buf: &mut ByteMessage, _version: Version) {
        buf.write_string(&self.channel);
        buf.write_slice(&self.data);
    }
}
