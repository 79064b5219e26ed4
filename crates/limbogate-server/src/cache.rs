//! Prebuilt outgoing packets.
//!
//! Everything the limbo sends that does not depend on per-connection
//! state is encoded and framed once per version at startup. Versions
//! whose wire bytes come out identical share one buffer. Rebuilt on
//! config reload; entries are immutable in between.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use serde_json::json;

use limbogate_filter::reason::BlockReason;
use limbogate_proto::codec::{ByteMessage, PacketEncode};
use limbogate_proto::dimension;
use limbogate_proto::error::ProtoError;
use limbogate_proto::packets::{
    PacketEmptyChunk, PacketFinishConfiguration, PacketGameEvent, PacketJoinGame,
    PacketPlayerAbilities, PacketPluginMessage, PacketRegistryData, PacketServerPositionLook,
    PacketSpawnPosition, PacketStatusResponse, PacketUpdateTime,
};
use limbogate_proto::registry::{LimboRegistry, PacketKind, ProtocolMappings, State};
use limbogate_proto::snapshot::PacketSnapshot;
use limbogate_proto::version::Version;

use crate::config::ServerConfig;

/// Logical identity of a cacheable clientbound packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CachedPacket {
    JoinGame,
    SpawnPosition,
    BrandPlay,
    BrandConfiguration,
    PositionLook,
    GameEvent,
    EmptyChunk,
    Abilities,
    UpdateTime,
    RegistryData,
    FinishConfiguration,
}

/// Encode a packet body and wrap it in the id + length frame.
pub fn frame(
    mappings: &ProtocolMappings,
    kind: PacketKind,
    packet: &impl PacketEncode,
    version: Version,
) -> Result<Bytes, ProtoError> {
    frame_dyn(mappings, kind, packet, version)
}

struct StatusInfo {
    motd: String,
    max_players: u32,
}

pub struct PacketCache {
    registry: Arc<LimboRegistry>,
    entries: RwLock<HashMap<(CachedPacket, Version), Bytes>>,
    status: RwLock<StatusInfo>,
    status_frames: RwLock<HashMap<Version, Bytes>>,
}

impl PacketCache {
    pub fn new(registry: Arc<LimboRegistry>, config: &ServerConfig) -> Self {
        let cache = Self {
            registry,
            entries: RwLock::new(HashMap::new()),
            status: RwLock::new(StatusInfo {
                motd: config.server.motd.clone(),
                max_players: config.server.max_players,
            }),
            status_frames: RwLock::new(HashMap::new()),
        };
        cache.rebuild(config);
        cache
    }

    /// Re-encode every entry. Called at startup and on config reload.
    pub fn rebuild(&self, config: &ServerConfig) {
        *self.status.write() = StatusInfo {
            motd: config.server.motd.clone(),
            max_players: config.server.max_players,
        };

        let backend = config.limbo.backend;
        let dimension = config.limbo.dimension;
        let spawn_y = config.limbo.spawn_y;
        let brand = config.server.brand.as_str();

        let mut entries = HashMap::new();
        // Identical frames across versions share one allocation.
        let mut dedup: HashMap<Vec<u8>, Bytes> = HashMap::new();
        let mut insert = |entries: &mut HashMap<(CachedPacket, Version), Bytes>,
                          key: (CachedPacket, Version),
                          framed: Bytes| {
            let shared = dedup
                .entry(framed.to_vec())
                .or_insert_with(|| framed)
                .clone();
            entries.insert(key, shared);
        };

        let play = self.registry.state(State::Play);
        let configuration = self.registry.state(State::Configuration);
        for &version in Version::ALL {
            let mut put = |state_mappings: &ProtocolMappings,
                           entries: &mut HashMap<(CachedPacket, Version), Bytes>,
                           cached: CachedPacket,
                           kind: PacketKind,
                           packet: &dyn DynEncode| {
                // Versions without a mapping simply skip the packet.
                if let Ok(framed) = frame_dyn(state_mappings, kind, packet, version) {
                    insert(entries, (cached, version), framed);
                }
            };

            put(
                &play.clientbound,
                &mut entries,
                CachedPacket::JoinGame,
                PacketKind::JoinGame,
                &PacketJoinGame::new(backend, dimension),
            );
            put(
                &play.clientbound,
                &mut entries,
                CachedPacket::SpawnPosition,
                PacketKind::SpawnPosition,
                &PacketSpawnPosition {
                    x: 0,
                    y: spawn_y as i64,
                    z: 0,
                    angle: 0.0,
                },
            );
            put(
                &play.clientbound,
                &mut entries,
                CachedPacket::BrandPlay,
                PacketKind::PluginMessage,
                &PacketPluginMessage::brand(version, brand),
            );
            put(
                &play.clientbound,
                &mut entries,
                CachedPacket::PositionLook,
                PacketKind::ClientboundPositionLook,
                &PacketServerPositionLook {
                    x: 0.5,
                    y: spawn_y,
                    z: 0.5,
                    yaw: 0.0,
                    pitch: 0.0,
                    teleport_id: 1,
                },
            );
            put(
                &play.clientbound,
                &mut entries,
                CachedPacket::GameEvent,
                PacketKind::GameEvent,
                &PacketGameEvent {
                    event: PacketGameEvent::START_WAITING_FOR_CHUNKS,
                    value: 0.0,
                },
            );
            put(
                &play.clientbound,
                &mut entries,
                CachedPacket::EmptyChunk,
                PacketKind::EmptyChunk,
                &PacketEmptyChunk { x: 0, z: 0 },
            );
            put(
                &play.clientbound,
                &mut entries,
                CachedPacket::Abilities,
                PacketKind::PlayerAbilities,
                &PacketPlayerAbilities::no_fall(),
            );
            put(
                &play.clientbound,
                &mut entries,
                CachedPacket::UpdateTime,
                PacketKind::UpdateTime,
                &PacketUpdateTime {
                    world_age: 0,
                    time_of_day: 6000,
                },
            );
            put(
                &configuration.clientbound,
                &mut entries,
                CachedPacket::RegistryData,
                PacketKind::RegistryData,
                &PacketRegistryData {
                    codec: dimension::codec_for(backend, dimension, version),
                },
            );
            put(
                &configuration.clientbound,
                &mut entries,
                CachedPacket::BrandConfiguration,
                PacketKind::PluginMessage,
                &PacketPluginMessage::brand(version, brand),
            );
            put(
                &configuration.clientbound,
                &mut entries,
                CachedPacket::FinishConfiguration,
                PacketKind::FinishConfiguration,
                &PacketFinishConfiguration,
            );
        }
        *self.entries.write() = entries;
        self.rebuild_status_frames();
    }

    fn rebuild_status_frames(&self) {
        let status_state = self.registry.state(State::Status);
        let mut frames = HashMap::new();
        for &version in Version::ALL {
            let response = PacketStatusResponse {
                status: self.status_json(version),
            };
            if let Ok(framed) = frame(
                &status_state.clientbound,
                PacketKind::StatusResponse,
                &response,
                version,
            ) {
                frames.insert(version, framed);
            }
        }
        *self.status_frames.write() = frames;
    }

    pub fn get(&self, packet: CachedPacket, version: Version) -> Option<Bytes> {
        self.entries.read().get(&(packet, version)).cloned()
    }

    /// Prebuilt, framed status response for cache-only mode.
    pub fn status_frame(&self, version: Version) -> Option<Bytes> {
        self.status_frames.read().get(&version).cloned()
    }

    /// Server-list JSON, computed fresh. The protocol number echoes the
    /// client's so every supported version shows as compatible.
    pub fn status_json(&self, version: Version) -> String {
        let status = self.status.read();
        json!({
            "version": {
                "name": version.display_name(),
                "protocol": version.protocol_id(),
            },
            "players": {
                "max": status.max_players,
                "online": 0,
            },
            "description": { "text": status.motd },
        })
        .to_string()
    }
}

/// Disconnect body for a refused connection, as a JSON chat component.
pub fn kick_json(prefix: &str, reason: BlockReason) -> String {
    json!({ "text": format!("{prefix}{}", reason.as_str()) }).to_string()
}

// Object-safe encode shim so the rebuild loop can iterate packets of
// different types.
trait DynEncode {
    fn encode_dyn(&self, buf: &mut ByteMessage, version: Version);
}

impl<T: PacketEncode> DynEncode for T {
    fn encode_dyn(&self, buf: &mut ByteMessage, version: Version) {
        self.encode(buf, version);
    }
}

fn frame_dyn(
    mappings: &ProtocolMappings,
    kind: PacketKind,
    packet: &dyn DynEncode,
    version: Version,
) -> Result<Bytes, ProtoError> {
    let mut body = ByteMessage::new();
    packet.encode_dyn(&mut body, version);
    let snapshot = PacketSnapshot {
        kind,
        body: body.into_bytes(),
    };
    frame_snapshot(mappings, &snapshot, version)
}

/// Frame a pre-encoded body. The wire id is resolved from the wrapped
/// kind, so a snapshot stays usable for any version sharing its layout.
pub fn frame_snapshot(
    mappings: &ProtocolMappings,
    snapshot: &PacketSnapshot,
    version: Version,
) -> Result<Bytes, ProtoError> {
    let id = mappings.packet_id(version, snapshot.kind)?;
    let mut out = ByteMessage::new();
    out.write_var_int((ByteMessage::var_int_len(id) + snapshot.len()) as i32);
    out.write_var_int(id);
    out.write_slice(&snapshot.body);
    Ok(out.into_bytes())
}
