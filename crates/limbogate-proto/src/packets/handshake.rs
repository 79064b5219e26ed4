use crate::codec::{ByteMessage, PacketDecode, PacketEncode};
use crate::error::ProtoError;
use crate::registry::State;
use crate::version::Version;

/// First packet of every connection. Declares the protocol number and
/// which state the client wants next.
#[derive(Debug, Clone)]
pub struct PacketHandshake {
    pub protocol: i32,
    pub host: String,
    pub port: u16,
    pub next_state: i32,
}

impl PacketHandshake {
    pub const INTENT_STATUS: i32 = 1;
    pub const INTENT_LOGIN: i32 = 2;

    pub fn version(&self) -> Version {
        Version::from_protocol_id(self.protocol)
    }

    /// Requested next state, if it is one the protocol defines.
    pub fn intent(&self) -> Option<State> {
        match self.next_state {
            Self::INTENT_STATUS => Some(State::Status),
            Self::INTENT_LOGIN => Some(State::Login),
            _ => None,
        }
    }
}

impl PacketDecode for PacketHandshake {
    fn decode(buf: &mut ByteMessage, _version: Version) -> Result<Self, ProtoError> {
        Ok(Self {
            protocol: buf.read_var_int()?,
            host: buf.read_string_limited(255)?,
            port: buf.read_u16()?,
            next_state: buf.read_var_int()?,
        })
    }
}

impl PacketEncode for PacketHandshake {
    fn encode(&self, buf: &mut ByteMessage, _version: Version) {
        buf.write_var_int(self.protocol);
        buf.write_string(&self.host);
        buf.write_u16(self.port);
        buf.write_var_int(self.next_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let packet = PacketHandshake {
            protocol: 763,
            host: "play.example.net".into(),
            port: 25565,
            next_state: 2,
        };
        let mut buf = ByteMessage::new();
        packet.encode(&mut buf, Version::Undefined);
        let decoded = PacketHandshake::decode(&mut buf, Version::Undefined).unwrap();
        assert_eq!(decoded.protocol, 763);
        assert_eq!(decoded.version(), Version::V1_20);
        assert_eq!(decoded.host, "play.example.net");
        assert_eq!(decoded.port, 25565);
        assert_eq!(decoded.intent(), Some(State::Login));
    }

    #[test]
    fn unknown_intent_is_none() {
        let packet = PacketHandshake {
            protocol: 47,
            host: "h".into(),
            port: 1,
            next_state: 9,
        };
        assert_eq!(packet.intent(), None);
    }

    #[test]
    fn oversized_hostname_rejected() {
        let mut buf = ByteMessage::new();
        buf.write_var_int(47);
        buf.write_string(&"x".repeat(2000));
        buf.write_u16(25565);
        buf.write_var_int(1);
        assert!(matches!(
            PacketHandshake::decode(&mut buf, Version::Undefined),
            Err(ProtoError::StringTooLong { .. })
        ));
    }
}
