use crate::codec::{ByteMessage, PacketDecode, PacketEncode};
use crate::error::ProtoError;
use crate::nbt::Tag;
use crate::version::Version;

/// Registry payload sent on entering CONFIGURATION (1.20.2+). The body
/// is one nameless NBT compound.
#[derive(Debug, Clone)]
pub struct PacketRegistryData {
    pub codec: Tag,
}

impl PacketEncode for PacketRegistryData {
    fn encode(&self, buf: &mut ByteMessage, _version: Version) {
        self.codec.write_nameless(buf);
    }
}

/// Empty body, both directions: the server signals it is done
/// configuring, the client acknowledges.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketFinishConfiguration;

impl PacketDecode for PacketFinishConfiguration {
    fn decode(_buf: &mut ByteMessage, _version: Version) -> Result<Self, ProtoError> {
        Ok(Self)
    }
}

impl PacketEncode for PacketFinishConfiguration {
    fn encode(&self, _buf: &mut ByteMessage, _version: Version) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_data_is_nameless_nbt() {
        let packet = PacketRegistryData {
            codec: Tag::compound().put_byte("x", 1).build(),
        };
        let mut buf = ByteMessage::new();
        packet.encode(&mut buf, Version::V1_20_2);
        // Type id immediately followed by the first entry, no root name.
        assert_eq!(buf.as_slice()[0], 10);
        assert_eq!(buf.as_slice()[1], 1); // TAG_Byte of "x"
    }

    #[test]
    fn finish_configuration_is_empty() {
        let mut buf = ByteMessage::new();
        PacketFinishConfiguration.encode(&mut buf, Version::V1_20_2);
        assert!(buf.is_empty());
        assert!(PacketFinishConfiguration::decode(&mut buf, Version::V1_20_2).is_ok());
    }
}
