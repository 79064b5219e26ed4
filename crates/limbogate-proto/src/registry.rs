//! Per-version packet id mappings.
//!
//! Each (protocol state, direction) pair owns its own id space. The
//! tables are built once at startup from (version range, id) rows; the
//! last registration for a (version, id) wins, which lets a broad range
//! be corrected by a narrower one registered after it.

use std::collections::HashMap;

use crate::error::ProtoError;
use crate::version::{Version, VersionRange};

/// Protocol state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Handshake,
    Status,
    Login,
    Configuration,
    Play,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Clientbound,
    Serverbound,
}

/// Logical identity of a packet, independent of wire id and version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    // handshake
    Handshake,
    // status
    StatusRequest,
    StatusResponse,
    StatusPing,
    // login
    LoginStart,
    LoginSuccess,
    LoginAcknowledged,
    Disconnect,
    // configuration
    RegistryData,
    FinishConfiguration,
    // shared / play
    KeepAlive,
    PluginMessage,
    JoinGame,
    SpawnPosition,
    ClientboundPositionLook,
    GameEvent,
    EmptyChunk,
    PlayerAbilities,
    UpdateTime,
    Position,
    PositionLook,
    ClientChat,
}

#[derive(Default)]
struct VersionRegistry {
    to_kind: HashMap<i32, PacketKind>,
    to_id: HashMap<PacketKind, i32>,
}

/// Bidirectional {id <-> kind} table for one (state, direction).
#[derive(Default)]
pub struct ProtocolMappings {
    by_version: HashMap<Version, VersionRegistry>,
}

impl ProtocolMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one packet's id rows into the table. Later registrations
    /// overwrite earlier ones per (version, id).
    pub fn register(&mut self, kind: PacketKind, rows: &[(VersionRange, i32)]) {
        for (range, id) in rows {
            for version in range.versions() {
                let registry = self.by_version.entry(version).or_default();
                if let Some(previous) = registry.to_id.insert(kind, *id) {
                    registry.to_kind.remove(&previous);
                }
                registry.to_kind.insert(*id, kind);
            }
        }
    }

    pub fn packet_id(&self, version: Version, kind: PacketKind) -> Result<i32, ProtoError> {
        self.by_version
            .get(&version)
            .and_then(|r| r.to_id.get(&kind))
            .copied()
            .ok_or(ProtoError::UnknownPacketKind { version, kind })
    }

    pub fn packet_kind(&self, version: Version, id: i32) -> Result<PacketKind, ProtoError> {
        self.by_version
            .get(&version)
            .and_then(|r| r.to_kind.get(&id))
            .copied()
            .ok_or(ProtoError::UnknownPacketId { version, id })
    }
}

/// Mappings for one protocol state, both directions.
#[derive(Default)]
pub struct StateRegistry {
    pub clientbound: ProtocolMappings,
    pub serverbound: ProtocolMappings,
}

impl StateRegistry {
    pub fn direction(&self, direction: Direction) -> &ProtocolMappings {
        match direction {
            Direction::Clientbound => &self.clientbound,
            Direction::Serverbound => &self.serverbound,
        }
    }
}

/// The full registry the limbo speaks, one `StateRegistry` per state.
pub struct LimboRegistry {
    handshake: StateRegistry,
    status: StateRegistry,
    login: StateRegistry,
    configuration: StateRegistry,
    play: StateRegistry,
}

impl LimboRegistry {
    pub fn state(&self, state: State) -> &StateRegistry {
        match state {
            State::Handshake => &self.handshake,
            State::Status => &self.status,
            State::Login => &self.login,
            State::Configuration => &self.configuration,
            State::Play => &self.play,
        }
    }

    pub fn build() -> Self {
        use PacketKind::*;
        use Version::*;

        let all = VersionRange::ALL;
        let config_era = VersionRange::of(V1_20_2, V1_20_4);

        let mut handshake = StateRegistry::default();
        handshake.serverbound.register(Handshake, &[(all, 0x00)]);

        let mut status = StateRegistry::default();
        status.serverbound.register(StatusRequest, &[(all, 0x00)]);
        status.serverbound.register(StatusPing, &[(all, 0x01)]);
        status.clientbound.register(StatusResponse, &[(all, 0x00)]);
        status.clientbound.register(StatusPing, &[(all, 0x01)]);

        let mut login = StateRegistry::default();
        login.serverbound.register(LoginStart, &[(all, 0x00)]);
        login
            .serverbound
            .register(LoginAcknowledged, &[(config_era, 0x03)]);
        login.clientbound.register(Disconnect, &[(all, 0x00)]);
        login.clientbound.register(LoginSuccess, &[(all, 0x02)]);

        let mut configuration = StateRegistry::default();
        configuration
            .serverbound
            .register(PluginMessage, &[(config_era, 0x01)]);
        configuration
            .serverbound
            .register(FinishConfiguration, &[(config_era, 0x02)]);
        configuration
            .serverbound
            .register(KeepAlive, &[(config_era, 0x03)]);
        configuration
            .clientbound
            .register(PluginMessage, &[(config_era, 0x00)]);
        configuration
            .clientbound
            .register(Disconnect, &[(config_era, 0x01)]);
        configuration
            .clientbound
            .register(FinishConfiguration, &[(config_era, 0x02)]);
        configuration
            .clientbound
            .register(KeepAlive, &[(config_era, 0x03)]);
        configuration
            .clientbound
            .register(RegistryData, &[(config_era, 0x05)]);

        let mut play = StateRegistry::default();
        let sb = &mut play.serverbound;
        sb.register(
            KeepAlive,
            &[
                (VersionRange::of(V1_7_2, V1_8), 0x00),
                (VersionRange::of(V1_9, V1_11_1), 0x0B),
                (VersionRange::single(V1_12), 0x0C),
                (VersionRange::of(V1_12_1, V1_12_2), 0x0B),
                (VersionRange::of(V1_13, V1_13_2), 0x0E),
                (VersionRange::of(V1_14, V1_15_2), 0x0F),
                (VersionRange::of(V1_16, V1_16_4), 0x10),
                (VersionRange::of(V1_17, V1_18_2), 0x0F),
                (VersionRange::single(V1_19), 0x11),
                (VersionRange::single(V1_19_1), 0x12),
                (VersionRange::single(V1_19_3), 0x11),
                (VersionRange::of(V1_19_4, V1_20), 0x12),
                (VersionRange::single(V1_20_2), 0x14),
                (VersionRange::of(V1_20_3, V1_20_4), 0x15),
            ],
        );
        sb.register(
            Position,
            &[
                (VersionRange::of(V1_7_2, V1_8), 0x04),
                (VersionRange::of(V1_9, V1_11_1), 0x0C),
                (VersionRange::single(V1_12), 0x0E),
                (VersionRange::of(V1_12_1, V1_12_2), 0x0D),
                (VersionRange::of(V1_13, V1_13_2), 0x10),
                (VersionRange::of(V1_14, V1_15_2), 0x11),
                (VersionRange::of(V1_16, V1_16_4), 0x12),
                (VersionRange::of(V1_17, V1_18_2), 0x11),
                (VersionRange::single(V1_19), 0x13),
                (VersionRange::single(V1_19_1), 0x14),
                (VersionRange::single(V1_19_3), 0x13),
                (VersionRange::of(V1_19_4, V1_20), 0x14),
                (VersionRange::single(V1_20_2), 0x16),
                (VersionRange::of(V1_20_3, V1_20_4), 0x17),
            ],
        );
        sb.register(
            PositionLook,
            &[
                (VersionRange::of(V1_7_2, V1_8), 0x06),
                (VersionRange::of(V1_9, V1_11_1), 0x0D),
                (VersionRange::single(V1_12), 0x0F),
                (VersionRange::of(V1_12_1, V1_12_2), 0x0E),
                (VersionRange::of(V1_13, V1_13_2), 0x11),
                (VersionRange::of(V1_14, V1_15_2), 0x12),
                (VersionRange::of(V1_16, V1_16_4), 0x13),
                (VersionRange::of(V1_17, V1_18_2), 0x12),
                (VersionRange::single(V1_19), 0x14),
                (VersionRange::single(V1_19_1), 0x15),
                (VersionRange::single(V1_19_3), 0x14),
                (VersionRange::of(V1_19_4, V1_20), 0x15),
                (VersionRange::single(V1_20_2), 0x17),
                (VersionRange::of(V1_20_3, V1_20_4), 0x18),
            ],
        );
        sb.register(
            ClientChat,
            &[
                (VersionRange::of(V1_7_2, V1_8), 0x01),
                (VersionRange::of(V1_9, V1_11_1), 0x02),
                (VersionRange::single(V1_12), 0x03),
                (VersionRange::of(V1_12_1, V1_13_2), 0x02),
                (VersionRange::of(V1_14, V1_18_2), 0x03),
                (VersionRange::single(V1_19), 0x04),
                (VersionRange::of(V1_19_1, V1_20_2), 0x05),
                (VersionRange::of(V1_20_3, V1_20_4), 0x06),
            ],
        );
        sb.register(
            PluginMessage,
            &[
                (VersionRange::of(V1_7_2, V1_8), 0x17),
                (VersionRange::of(V1_9, V1_11_1), 0x09),
                (VersionRange::single(V1_12), 0x0A),
                (VersionRange::of(V1_12_1, V1_12_2), 0x09),
                (VersionRange::of(V1_13, V1_13_2), 0x0A),
                (VersionRange::of(V1_14, V1_18_2), 0x0B),
                (VersionRange::single(V1_19), 0x0C),
                (VersionRange::single(V1_19_1), 0x0D),
                (VersionRange::single(V1_19_3), 0x0C),
                (VersionRange::of(V1_19_4, V1_20), 0x0D),
                (VersionRange::single(V1_20_2), 0x0F),
                (VersionRange::of(V1_20_3, V1_20_4), 0x10),
            ],
        );

        let cb = &mut play.clientbound;
        cb.register(
            JoinGame,
            &[
                (VersionRange::of(V1_7_2, V1_8), 0x01),
                (VersionRange::of(V1_9, V1_12_2), 0x23),
                (VersionRange::of(V1_13, V1_14_4), 0x25),
                (VersionRange::of(V1_15, V1_15_2), 0x26),
                (VersionRange::of(V1_16, V1_16_1), 0x25),
                (VersionRange::of(V1_16_2, V1_16_4), 0x24),
                (VersionRange::of(V1_17, V1_18_2), 0x26),
                (VersionRange::single(V1_19), 0x23),
                (VersionRange::single(V1_19_1), 0x25),
                (VersionRange::single(V1_19_3), 0x24),
                (VersionRange::of(V1_19_4, V1_20), 0x28),
                (VersionRange::of(V1_20_2, V1_20_4), 0x29),
            ],
        );
        cb.register(
            KeepAlive,
            &[
                (VersionRange::of(V1_7_2, V1_8), 0x00),
                (VersionRange::of(V1_9, V1_12_2), 0x1F),
                (VersionRange::of(V1_13, V1_13_2), 0x21),
                (VersionRange::of(V1_14, V1_14_4), 0x20),
                (VersionRange::of(V1_15, V1_15_2), 0x21),
                (VersionRange::of(V1_16, V1_16_1), 0x20),
                (VersionRange::of(V1_16_2, V1_16_4), 0x1F),
                (VersionRange::of(V1_17, V1_18_2), 0x21),
                (VersionRange::single(V1_19), 0x1E),
                (VersionRange::single(V1_19_1), 0x20),
                (VersionRange::single(V1_19_3), 0x1F),
                (VersionRange::of(V1_19_4, V1_20), 0x23),
                (VersionRange::of(V1_20_2, V1_20_4), 0x24),
            ],
        );
        cb.register(
            Disconnect,
            &[
                (VersionRange::of(V1_7_2, V1_8), 0x40),
                (VersionRange::of(V1_9, V1_12_2), 0x1A),
                (VersionRange::of(V1_13, V1_13_2), 0x1B),
                (VersionRange::of(V1_14, V1_14_4), 0x1A),
                (VersionRange::of(V1_15, V1_15_2), 0x1B),
                (VersionRange::of(V1_16, V1_16_1), 0x1A),
                (VersionRange::of(V1_16_2, V1_16_4), 0x19),
                (VersionRange::of(V1_17, V1_18_2), 0x1A),
                (VersionRange::single(V1_19), 0x17),
                (VersionRange::single(V1_19_1), 0x19),
                (VersionRange::single(V1_19_3), 0x17),
                (VersionRange::of(V1_19_4, V1_20), 0x1A),
                (VersionRange::of(V1_20_2, V1_20_4), 0x1B),
            ],
        );
        cb.register(
            PluginMessage,
            &[
                (VersionRange::of(V1_7_2, V1_8), 0x3F),
                (VersionRange::of(V1_9, V1_12_2), 0x18),
                (VersionRange::of(V1_13, V1_13_2), 0x19),
                (VersionRange::of(V1_14, V1_14_4), 0x18),
                (VersionRange::of(V1_15, V1_15_2), 0x19),
                (VersionRange::of(V1_16, V1_16_1), 0x18),
                (VersionRange::of(V1_16_2, V1_16_4), 0x17),
                (VersionRange::of(V1_17, V1_18_2), 0x18),
                (VersionRange::single(V1_19), 0x15),
                (VersionRange::single(V1_19_1), 0x16),
                (VersionRange::single(V1_19_3), 0x15),
                (VersionRange::of(V1_19_4, V1_20), 0x17),
                (VersionRange::of(V1_20_2, V1_20_4), 0x18),
            ],
        );
        cb.register(
            ClientboundPositionLook,
            &[
                (VersionRange::of(V1_7_2, V1_8), 0x08),
                (VersionRange::of(V1_9, V1_12), 0x2E),
                (VersionRange::of(V1_12_1, V1_12_2), 0x2F),
                (VersionRange::of(V1_13, V1_13_2), 0x32),
                (VersionRange::of(V1_14, V1_14_4), 0x35),
                (VersionRange::of(V1_15, V1_15_2), 0x36),
                (VersionRange::of(V1_16, V1_16_1), 0x35),
                (VersionRange::of(V1_16_2, V1_16_4), 0x34),
                (VersionRange::of(V1_17, V1_18_2), 0x38),
                (VersionRange::single(V1_19), 0x36),
                (VersionRange::single(V1_19_1), 0x39),
                (VersionRange::single(V1_19_3), 0x38),
                (VersionRange::of(V1_19_4, V1_20), 0x3C),
                (VersionRange::of(V1_20_2, V1_20_4), 0x3E),
            ],
        );
        cb.register(
            EmptyChunk,
            &[
                (VersionRange::of(V1_7_2, V1_8), 0x21),
                (VersionRange::of(V1_9, V1_12_2), 0x20),
                (VersionRange::of(V1_13, V1_13_2), 0x22),
                (VersionRange::of(V1_14, V1_14_4), 0x21),
                (VersionRange::of(V1_15, V1_15_2), 0x22),
                (VersionRange::of(V1_16, V1_16_1), 0x21),
                (VersionRange::of(V1_16_2, V1_16_4), 0x20),
                (VersionRange::of(V1_17, V1_18_2), 0x22),
                (VersionRange::single(V1_19), 0x1F),
                (VersionRange::single(V1_19_1), 0x21),
                (VersionRange::single(V1_19_3), 0x20),
                (VersionRange::of(V1_19_4, V1_20), 0x24),
                (VersionRange::of(V1_20_2, V1_20_4), 0x25),
            ],
        );
        cb.register(
            PlayerAbilities,
            &[
                (VersionRange::of(V1_7_2, V1_8), 0x39),
                (VersionRange::of(V1_9, V1_12_2), 0x2B),
                (VersionRange::of(V1_13, V1_13_2), 0x2E),
                (VersionRange::of(V1_14, V1_14_4), 0x31),
                (VersionRange::of(V1_15, V1_15_2), 0x32),
                (VersionRange::of(V1_16, V1_16_1), 0x31),
                (VersionRange::of(V1_16_2, V1_16_4), 0x30),
                (VersionRange::of(V1_17, V1_18_2), 0x32),
                (VersionRange::single(V1_19), 0x2F),
                (VersionRange::single(V1_19_1), 0x31),
                (VersionRange::single(V1_19_3), 0x30),
                (VersionRange::of(V1_19_4, V1_20), 0x34),
                (VersionRange::of(V1_20_2, V1_20_4), 0x36),
            ],
        );
        cb.register(
            SpawnPosition,
            &[
                (VersionRange::single(V1_19_3), 0x4C),
                (VersionRange::of(V1_19_4, V1_20), 0x50),
                (VersionRange::of(V1_20_2, V1_20_4), 0x54),
            ],
        );
        cb.register(GameEvent, &[(VersionRange::of(V1_20_2, V1_20_4), 0x20)]);
        cb.register(
            UpdateTime,
            &[
                (VersionRange::of(V1_7_2, V1_8), 0x03),
                (VersionRange::of(V1_9, V1_11_1), 0x44),
                (VersionRange::single(V1_12), 0x46),
                (VersionRange::of(V1_12_1, V1_12_2), 0x47),
                (VersionRange::of(V1_13, V1_13_2), 0x4A),
                (VersionRange::of(V1_14, V1_14_4), 0x4E),
                (VersionRange::of(V1_15, V1_15_2), 0x4F),
                (VersionRange::of(V1_16, V1_16_4), 0x4E),
                (VersionRange::of(V1_17, V1_19), 0x59),
                (VersionRange::single(V1_19_1), 0x5C),
                (VersionRange::single(V1_19_3), 0x5A),
                (VersionRange::of(V1_19_4, V1_20), 0x5E),
                (VersionRange::single(V1_20_2), 0x60),
                (VersionRange::of(V1_20_3, V1_20_4), 0x62),
            ],
        );

        Self {
            handshake,
            status,
            login,
            configuration,
            play,
        }
    }
}
