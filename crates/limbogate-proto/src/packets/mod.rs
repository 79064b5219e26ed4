//! Packet bodies the limbo speaks.
//!
//! Serverbound packets implement [`PacketDecode`]; clientbound ones
//! implement [`PacketEncode`]. A few (keepalive, ping) travel both
//! ways and implement both. Decoded packets surface as the [`Packet`]
//! sum type so session code can match on them directly.

pub mod chat;
pub mod configuration;
pub mod handshake;
pub mod join_game;
pub mod keep_alive;
pub mod login;
pub mod play_misc;
pub mod plugin_message;
pub mod position;
pub mod status;

use crate::codec::{ByteMessage, PacketDecode};
use crate::error::ProtoError;
use crate::registry::PacketKind;
use crate::version::Version;

pub use chat::PacketClientChat;
pub use configuration::{PacketFinishConfiguration, PacketRegistryData};
pub use handshake::PacketHandshake;
pub use join_game::PacketJoinGame;
pub use keep_alive::PacketKeepAlive;
pub use login::{PacketDisconnect, PacketLoginAcknowledged, PacketLoginStart, PacketLoginSuccess};
pub use play_misc::{
    PacketEmptyChunk, PacketGameEvent, PacketPlayerAbilities, PacketSpawnPosition,
    PacketUpdateTime,
};
pub use plugin_message::PacketPluginMessage;
pub use position::{PacketPosition, PacketPositionLook, PacketServerPositionLook};
pub use status::{PacketStatusPing, PacketStatusRequest, PacketStatusResponse};

/// A decoded serverbound packet.
#[derive(Debug, Clone)]
pub enum Packet {
    Handshake(PacketHandshake),
    StatusRequest(PacketStatusRequest),
    StatusPing(PacketStatusPing),
    LoginStart(PacketLoginStart),
    LoginAcknowledged(PacketLoginAcknowledged),
    FinishConfiguration(PacketFinishConfiguration),
    KeepAlive(PacketKeepAlive),
    PluginMessage(PacketPluginMessage),
    Position(PacketPosition),
    PositionLook(PacketPositionLook),
    ClientChat(PacketClientChat),
}

impl Packet {
    /// Decode the body for a kind the registry already resolved.
    /// Kinds the limbo never receives yield a malformed-field error.
    pub fn decode(
        kind: PacketKind,
        buf: &mut ByteMessage,
        version: Version,
    ) -> Result<Packet, ProtoError> {
        Ok(match kind {
            PacketKind::Handshake => Packet::Handshake(PacketHandshake::decode(buf, version)?),
            PacketKind::StatusRequest => {
                Packet::StatusRequest(PacketStatusRequest::decode(buf, version)?)
            }
            PacketKind::StatusPing => Packet::StatusPing(PacketStatusPing::decode(buf, version)?),
            PacketKind::LoginStart => Packet::LoginStart(PacketLoginStart::decode(buf, version)?),
            PacketKind::LoginAcknowledged => {
                Packet::LoginAcknowledged(PacketLoginAcknowledged::decode(buf, version)?)
            }
            PacketKind::FinishConfiguration => {
                Packet::FinishConfiguration(PacketFinishConfiguration::decode(buf, version)?)
            }
            PacketKind::KeepAlive => Packet::KeepAlive(PacketKeepAlive::decode(buf, version)?),
            PacketKind::PluginMessage => {
                Packet::PluginMessage(PacketPluginMessage::decode(buf, version)?)
            }
            PacketKind::Position => Packet::Position(PacketPosition::decode(buf, version)?),
            PacketKind::PositionLook => {
                Packet::PositionLook(PacketPositionLook::decode(buf, version)?)
            }
            PacketKind::ClientChat => Packet::ClientChat(PacketClientChat::decode(buf, version)?),
            other => {
                return Err(ProtoError::MalformedField(format!(
                    "clientbound-only packet {other:?} cannot be decoded"
                )))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clientbound_kinds_refuse_decode() {
        let mut buf = ByteMessage::new();
        assert!(matches!(
            Packet::decode(PacketKind::JoinGame, &mut buf, Version::V1_8),
            Err(ProtoError::MalformedField(_))
        ));
    }
}
