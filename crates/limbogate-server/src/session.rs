//! Per-connection limbo session.
//!
//! One session owns one connection's protocol state machine and is
//! driven from exactly one task: `handle_frame` for every inbound
//! frame, `tick` from the coarse scheduler. Outbound bytes accumulate
//! in an internal buffer the I/O task drains after each call. Shared
//! services (registry, cache, checks, statistics, attack state) are
//! injected once at construction.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use limbogate_filter::checks::{
    CheckPipeline, CheckVerdict, KeepAliveState, MovementState, MovementUpdate, PacketLimitState,
    TimerState,
};
use limbogate_filter::checks::join::JoinInfo;
use limbogate_filter::reason::BlockReason;
use limbogate_filter::{AttackManager, ConnectionStatistics};
use limbogate_proto::codec::{ByteMessage, PacketDecode, PacketEncode, Uuid};
use limbogate_proto::error::ProtoError;
use limbogate_proto::packets::{
    Packet, PacketDisconnect, PacketHandshake, PacketKeepAlive, PacketLoginSuccess,
    PacketPluginMessage, PacketStatusPing, PacketStatusResponse,
};
use limbogate_proto::registry::{LimboRegistry, PacketKind, State};
use limbogate_proto::version::Version;

use crate::cache::{self, CachedPacket, PacketCache};
use crate::config::ServerConfig;

/// Session-facing slice of the configuration, swapped on reload.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub use_cache: bool,
    pub disable_fall: bool,
    pub keep_alive_interval: Duration,
    pub login_timeout: Duration,
    pub kick_prefix: String,
}

impl SessionSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_cache: config.limbo.use_cache,
            disable_fall: config.limbo.disable_fall,
            keep_alive_interval: Duration::from_secs(config.limbo.keep_alive_interval_secs),
            login_timeout: Duration::from_secs(config.limbo.login_timeout_secs),
            kick_prefix: config.messages.kick_prefix.clone(),
        }
    }
}

/// Everything a session shares with the rest of the process.
pub struct Services {
    pub registry: Arc<LimboRegistry>,
    pub cache: Arc<PacketCache>,
    pub checks: Arc<CheckPipeline>,
    pub stats: Arc<ConnectionStatistics>,
    pub attack: Arc<AttackManager>,
    pub settings: RwLock<SessionSettings>,
}

/// Why the connection is being closed. Everything here is terminal:
/// the limbo never retries a suspect connection.
#[derive(Debug, Error)]
pub enum SessionClose {
    #[error("malformed packet: {0}")]
    Protocol(#[from] ProtoError),
    #[error("blocked: {}", .0.as_str())]
    Blocked(BlockReason),
    /// Status probe answered; close without a disconnect packet.
    #[error("status probe complete")]
    Complete,
}

impl SessionClose {
    /// Reason to attribute in the blocked counters, if any.
    pub fn block_reason(&self) -> Option<BlockReason> {
        match self {
            SessionClose::Protocol(_) => Some(BlockReason::ProtocolViolation),
            SessionClose::Blocked(reason) => Some(*reason),
            SessionClose::Complete => None,
        }
    }
}

pub struct LimboSession {
    services: Arc<Services>,
    address: IpAddr,
    state: State,
    version: Version,
    username: Option<String>,
    brand: Option<String>,
    last_position: Option<(f64, f64, f64)>,
    status_requested: bool,
    login_received: bool,
    disconnecting: bool,
    registered: bool,
    movement: MovementState,
    timer: TimerState,
    keep_alive: KeepAliveState,
    limits: PacketLimitState,
    last_keep_alive: Instant,
    created_at: Instant,
    out: BytesMut,
}

impl LimboSession {
    pub fn new(services: Arc<Services>, address: IpAddr, now: Instant) -> Self {
        Self {
            services,
            address,
            state: State::Handshake,
            version: Version::Undefined,
            username: None,
            brand: None,
            last_position: None,
            status_requested: false,
            login_received: false,
            disconnecting: false,
            registered: false,
            movement: MovementState::default(),
            timer: TimerState::default(),
            keep_alive: KeepAliveState::default(),
            limits: PacketLimitState::new(now),
            last_keep_alive: now,
            created_at: now,
            out: BytesMut::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Version used for registry lookups and encodes. Status probes
    /// from unknown versions are answered with the newest layout.
    fn wire_version(&self) -> Version {
        if self.version.is_supported() {
            self.version
        } else {
            Version::MAX
        }
    }

    /// Drain bytes queued for the socket.
    pub fn take_output(&mut self) -> Bytes {
        let out = self.out.split().freeze();
        self.services.stats.count_bytes_out(out.len() as u64);
        out
    }

    pub fn has_output(&self) -> bool {
        !self.out.is_empty()
    }

    /// Process one length-stripped inbound frame.
    pub fn handle_frame(&mut self, frame: &[u8], now: Instant) -> Result<(), SessionClose> {
        if self.disconnecting {
            // Draining: the close is already decided.
            return Ok(());
        }
        self.services.stats.count_bytes_in(frame.len() as u64);
        if let CheckVerdict::Fail(reason) =
            self.services
                .checks
                .packet_limit
                .record(&mut self.limits, frame.len(), now)
        {
            return Err(SessionClose::Blocked(reason));
        }

        let mut buf = ByteMessage::from_slice(frame);
        let id = buf.read_var_int()?;

        if self.state == State::Handshake {
            if id != 0x00 {
                debug!(id, "ignoring pre-handshake packet");
                return Ok(());
            }
            let handshake = PacketHandshake::decode(&mut buf, self.version)?;
            return self.on_handshake(handshake);
        }

        let mappings = &self.services.registry.state(self.state).serverbound;
        let kind = match mappings.packet_kind(self.wire_version(), id) {
            Ok(kind) => kind,
            Err(err) if !err.is_fatal() => {
                // Version drift produces ids we never registered; they
                // are not an attack signal.
                debug!(%err, "ignoring unmapped packet id");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let packet = match Packet::decode(kind, &mut buf, self.version) {
            Ok(packet) => packet,
            Err(err) if !err.is_fatal() => {
                debug!(%err, "ignoring undecodable packet");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        match self.state {
            State::Status => self.on_status_packet(packet),
            State::Login => self.on_login_packet(packet, now),
            State::Configuration => self.on_configuration_packet(packet, now),
            State::Play => self.on_play_packet(packet, now),
            State::Handshake => unreachable!("handled above"),
        }
    }

    fn on_handshake(&mut self, handshake: PacketHandshake) -> Result<(), SessionClose> {
        self.version = handshake.version();
        match handshake.intent() {
            Some(State::Status) => {
                self.state = State::Status;
                Ok(())
            }
            Some(State::Login) => {
                if !self.version.is_supported() {
                    return Err(SessionClose::Blocked(BlockReason::UnsupportedVersion));
                }
                let info = JoinInfo {
                    address: self.address,
                    host: handshake.host,
                    version: self.version,
                };
                if let CheckVerdict::Fail(reason) = self.services.checks.join.evaluate(&info) {
                    return Err(SessionClose::Blocked(reason));
                }
                // Claim the address now, not at login-start: two
                // connections racing between the two packets must not
                // both pass.
                if let CheckVerdict::Fail(reason) = self.services.checks.join.claim(self.address) {
                    return Err(SessionClose::Blocked(reason));
                }
                self.registered = true;
                self.state = State::Login;
                Ok(())
            }
            _ => Err(SessionClose::Protocol(ProtoError::MalformedField(format!(
                "handshake next-state {}",
                handshake.next_state
            )))),
        }
    }

    fn on_status_packet(&mut self, packet: Packet) -> Result<(), SessionClose> {
        match packet {
            Packet::StatusRequest(_) => {
                if self.status_requested {
                    return Err(SessionClose::Blocked(BlockReason::ProtocolViolation));
                }
                self.status_requested = true;
                let use_cache = self.services.settings.read().use_cache;
                if use_cache && self.services.attack.in_attack() {
                    if let Some(frame) = self.services.cache.status_frame(self.wire_version()) {
                        self.out.extend_from_slice(&frame);
                        return Ok(());
                    }
                }
                let response = PacketStatusResponse {
                    status: self.services.cache.status_json(self.wire_version()),
                };
                self.write_packet(PacketKind::StatusResponse, &response);
                Ok(())
            }
            Packet::StatusPing(ping) => {
                if !self.status_requested {
                    return Err(SessionClose::Blocked(BlockReason::ProtocolViolation));
                }
                self.write_packet(
                    PacketKind::StatusPing,
                    &PacketStatusPing {
                        randomized: ping.randomized,
                    },
                );
                // Status probes are single-shot.
                Err(SessionClose::Complete)
            }
            _ => Ok(()),
        }
    }

    fn on_login_packet(&mut self, packet: Packet, now: Instant) -> Result<(), SessionClose> {
        match packet {
            Packet::LoginStart(start) => {
                if self.login_received {
                    return Err(SessionClose::Blocked(BlockReason::ProtocolViolation));
                }
                self.login_received = true;
                if let CheckVerdict::Fail(reason) =
                    self.services.checks.name.evaluate(&start.username)
                {
                    return Err(SessionClose::Blocked(reason));
                }
                let uuid = start.uuid.unwrap_or_else(|| offline_uuid(&start.username));
                self.services.checks.name.register(&start.username);
                self.write_packet(
                    PacketKind::LoginSuccess,
                    &PacketLoginSuccess {
                        uuid,
                        username: start.username.clone(),
                    },
                );
                self.username = Some(start.username);
                if self.version.more_or_equal(Version::V1_20_2) {
                    // Wait for the explicit acknowledgement.
                    Ok(())
                } else {
                    self.enter_play(now);
                    Ok(())
                }
            }
            Packet::LoginAcknowledged(_) => {
                if !self.login_received {
                    return Err(SessionClose::Blocked(BlockReason::ProtocolViolation));
                }
                self.enter_configuration();
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn on_configuration_packet(&mut self, packet: Packet, now: Instant) -> Result<(), SessionClose> {
        match packet {
            Packet::FinishConfiguration(_) => {
                self.enter_play(now);
                Ok(())
            }
            Packet::KeepAlive(echo) => {
                self.keep_alive.received(echo.id);
                Ok(())
            }
            Packet::PluginMessage(message) => self.capture_brand(message),
            _ => Ok(()),
        }
    }

    fn on_play_packet(&mut self, packet: Packet, now: Instant) -> Result<(), SessionClose> {
        match packet {
            Packet::KeepAlive(echo) => {
                self.keep_alive.received(echo.id);
                Ok(())
            }
            Packet::PluginMessage(message) => self.capture_brand(message),
            Packet::Position(position) => self.on_movement(
                position.x,
                position.y,
                position.z,
                0.0,
                position.on_ground,
                now,
            ),
            Packet::PositionLook(position) => self.on_movement(
                position.x,
                position.y,
                position.z,
                position.pitch,
                position.on_ground,
                now,
            ),
            Packet::ClientChat(_) => {
                if let CheckVerdict::Fail(reason) = self.services.checks.chat.evaluate() {
                    return Err(SessionClose::Blocked(reason));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn capture_brand(&mut self, message: PacketPluginMessage) -> Result<(), SessionClose> {
        if !message.is_brand(self.version) {
            return Ok(());
        }
        if self.brand.is_some() {
            // The brand is announced exactly once.
            return Err(SessionClose::Blocked(BlockReason::ProtocolViolation));
        }
        let brand = message.brand_payload().unwrap_or_default();
        debug!(%brand, "client brand captured");
        self.brand = Some(brand);
        Ok(())
    }

    fn on_movement(
        &mut self,
        x: f64,
        y: f64,
        z: f64,
        pitch: f32,
        on_ground: bool,
        now: Instant,
    ) -> Result<(), SessionClose> {
        let (dx, dy, dz) = match self.last_position {
            Some((lx, ly, lz)) => (x - lx, y - ly, z - lz),
            None => (0.0, 0.0, 0.0),
        };
        self.last_position = Some((x, y, z));
        let update = MovementUpdate {
            delta_x: dx,
            delta_y: dy,
            delta_z: dz,
            y,
            pitch,
            on_ground,
        };
        if let CheckVerdict::Fail(reason) =
            self.services.checks.falling.evaluate(&mut self.movement, update)
        {
            return Err(SessionClose::Blocked(reason));
        }
        if let CheckVerdict::Fail(reason) =
            self.services.checks.timer.evaluate_at(&mut self.timer, now)
        {
            return Err(SessionClose::Blocked(reason));
        }
        Ok(())
    }

    fn enter_configuration(&mut self) {
        self.state = State::Configuration;
        self.write_cached(CachedPacket::RegistryData);
        self.write_cached(CachedPacket::BrandConfiguration);
        self.write_cached(CachedPacket::FinishConfiguration);
    }

    /// The scripted spawn sequence.
    fn enter_play(&mut self, now: Instant) {
        self.state = State::Play;
        let disable_fall = {
            let settings = self.services.settings.read();
            settings.disable_fall
        };
        self.write_cached(CachedPacket::JoinGame);
        if self.version.more_or_equal(Version::V1_19_3) {
            self.write_cached(CachedPacket::SpawnPosition);
        }
        if self.version.less(Version::V1_20_2) {
            self.write_cached(CachedPacket::BrandPlay);
        }
        self.write_cached(CachedPacket::PositionLook);
        if self.version.more_or_equal(Version::V1_20_2) {
            self.write_cached(CachedPacket::GameEvent);
        }
        self.write_cached(CachedPacket::EmptyChunk);
        if disable_fall {
            self.write_cached(CachedPacket::Abilities);
        }
        self.write_cached(CachedPacket::UpdateTime);
        self.send_keep_alive(now);
    }

    fn send_keep_alive(&mut self, now: Instant) {
        let id = rand::random::<i32>() as i64;
        self.keep_alive.sent(id, now);
        self.last_keep_alive = now;
        self.write_packet(PacketKind::KeepAlive, &PacketKeepAlive { id });
    }

    /// Driven from the coarse 1 Hz scheduler tick.
    pub fn tick(&mut self, now: Instant) -> Result<(), SessionClose> {
        if self.disconnecting {
            return Ok(());
        }
        if self.state != State::Play {
            // A connection must reach the spawn sequence within the
            // login deadline; a client idling in any earlier state is
            // closed, whether or not it answers keepalives.
            let timeout = self.services.settings.read().login_timeout;
            if now.duration_since(self.created_at) >= timeout {
                return Err(SessionClose::Blocked(BlockReason::KeepAliveTimeout));
            }
        }
        if !matches!(self.state, State::Configuration | State::Play) {
            return Ok(());
        }
        if let CheckVerdict::Fail(reason) =
            self.services.checks.keep_alive.evaluate(&self.keep_alive, now)
        {
            return Err(SessionClose::Blocked(reason));
        }
        let interval = self.services.settings.read().keep_alive_interval;
        if !self.keep_alive.awaiting() && now.duration_since(self.last_keep_alive) >= interval {
            self.send_keep_alive(now);
        }
        Ok(())
    }

    /// Queue the disconnect packet for `reason` if the current state
    /// has one, and put the session into its draining state.
    pub fn begin_disconnect(&mut self, reason: BlockReason) {
        if self.disconnecting {
            return;
        }
        self.disconnecting = true;
        if matches!(
            self.state,
            State::Login | State::Configuration | State::Play
        ) {
            let prefix = self.services.settings.read().kick_prefix.clone();
            self.write_packet(
                PacketKind::Disconnect,
                &PacketDisconnect {
                    reason: cache::kick_json(&prefix, reason),
                },
            );
        }
    }

    /// Release cross-connection claims. Called once when the channel
    /// closes.
    pub fn finish(&mut self) {
        if self.registered {
            self.registered = false;
            self.services.checks.join.unregister(self.address);
            if let Some(name) = &self.username {
                self.services.checks.name.unregister(name);
            }
        }
    }

    fn write_cached(&mut self, packet: CachedPacket) {
        match self.services.cache.get(packet, self.wire_version()) {
            Some(frame) => self.out.extend_from_slice(&frame),
            None => debug!(?packet, version = %self.version, "no cached frame for version"),
        }
    }

    fn write_packet(&mut self, kind: PacketKind, packet: &impl PacketEncode) {
        let mappings = &self.services.registry.state(self.state).clientbound;
        match cache::frame(mappings, kind, packet, self.wire_version()) {
            Ok(frame) => self.out.extend_from_slice(&frame),
            // A missing mapping for an outbound packet is a cache/table
            // gap, not a reason to drop the connection.
            Err(err) => warn!(%err, ?kind, "dropping unmappable clientbound packet"),
        }
    }
}

/// Stable offline-mode profile id derived from the name.
fn offline_uuid(name: &str) -> Uuid {
    let mut high = DefaultHasher::new();
    ("OfflinePlayer:", name).hash(&mut high);
    let mut low = DefaultHasher::new();
    (name, ":OfflinePlayer").hash(&mut low);
    Uuid::new(high.finish(), low.finish())
}
