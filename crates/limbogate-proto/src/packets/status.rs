use crate::codec::{ByteMessage, PacketDecode, PacketEncode};
use crate::error::ProtoError;
use crate::version::Version;

/// Empty body; asks for the server-list JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketStatusRequest;

impl PacketDecode for PacketStatusRequest {
    fn decode(_buf: &mut ByteMessage, _version: Version) -> Result<Self, ProtoError> {
        Ok(Self)
    }
}

/// Server-list JSON payload.
#[derive(Debug, Clone)]
pub struct PacketStatusResponse {
    pub status: String,
}

impl PacketEncode for PacketStatusResponse {
    fn encode(&self, buf: &mut ByteMessage, _version: Version) {
        buf.write_string(&self.status);
    }
}

/// Latency probe; the payload is echoed back verbatim.
#[derive(Debug, Clone, Copy)]
pub struct PacketStatusPing {
    pub randomized: i64,
}

impl PacketDecode for PacketStatusPing {
    fn decode(buf: &mut ByteMessage, _version: Version) -> Result<Self, ProtoError> {
        Ok(Self {
            randomized: buf.read_i64()?,
        })
    }
}

impl PacketEncode for PacketStatusPing {
    fn encode(&self, buf: &mut ByteMessage, _version: Version) {
        buf.write_i64(self.randomized);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_echo_roundtrip() {
        let mut buf = ByteMessage::new();
        PacketStatusPing {
            randomized: -77_123_456,
        }
        .encode(&mut buf, Version::V1_8);
        let decoded = PacketStatusPing::decode(&mut buf, Version::V1_8).unwrap();
        assert_eq!(decoded.randomized, -77_123_456);
    }

    #[test]
    fn response_is_a_plain_string() {
        let mut buf = ByteMessage::new();
        PacketStatusResponse {
            status: "{\"description\":\"hi\"}".into(),
        }
        .encode(&mut buf, Version::V1_8);
        assert_eq!(buf.read_string().unwrap(), "{\"description\":\"hi\"}");
    }
}
