//! The check pipeline.
//!
//! Each check keeps its own cross-connection state and judges the
//! packets it declares interest in; per-connection working state (for
//! movement, timing and rate checks) lives in the session and is
//! passed in by reference. Every check exposes `reload` so thresholds
//! can change without dropping connections.

pub mod chat;
pub mod falling;
pub mod join;
pub mod keep_alive;
pub mod name;
pub mod packet_limit;
pub mod timer;

use std::sync::Arc;

use serde::Deserialize;

use crate::lookup::{GeoLookup, ProxyLookup};
use crate::reason::BlockReason;

pub use chat::ChatCheck;
pub use falling::{FallingCheck, MovementState, MovementUpdate};
pub use join::{JoinCheck, JoinInfo};
pub use keep_alive::{KeepAliveCheck, KeepAliveState};
pub use name::NameCheck;
pub use packet_limit::{PacketLimitCheck, PacketLimitState};
pub use timer::{TimerCheck, TimerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckVerdict {
    Pass,
    Fail(BlockReason),
}

impl CheckVerdict {
    pub fn passed(self) -> bool {
        self == CheckVerdict::Pass
    }
}

/// Aggregate settings for every check, one section per check.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckSettings {
    pub join: join::JoinSettings,
    pub name: name::NameSettings,
    pub falling: falling::FallingSettings,
    pub timer: timer::TimerSettings,
    pub keep_alive: keep_alive::KeepAliveSettings,
    pub packet_limit: packet_limit::PacketLimitSettings,
    pub chat: chat::ChatSettings,
}

pub struct CheckPipeline {
    pub join: JoinCheck,
    pub name: NameCheck,
    pub falling: FallingCheck,
    pub timer: TimerCheck,
    pub keep_alive: KeepAliveCheck,
    pub packet_limit: PacketLimitCheck,
    pub chat: ChatCheck,
}

impl CheckPipeline {
    pub fn new(
        settings: &CheckSettings,
        geo: Arc<dyn GeoLookup>,
        proxy: Arc<dyn ProxyLookup>,
    ) -> Self {
        Self {
            join: JoinCheck::new(settings.join.clone(), geo, proxy),
            name: NameCheck::new(settings.name.clone()),
            falling: FallingCheck::new(settings.falling.clone()),
            timer: TimerCheck::new(settings.timer.clone()),
            keep_alive: KeepAliveCheck::new(settings.keep_alive.clone()),
            packet_limit: PacketLimitCheck::new(settings.packet_limit.clone()),
            chat: ChatCheck::new(settings.chat.clone()),
        }
    }

    pub fn reload(&self, settings: &CheckSettings) {
        self.join.reload(settings.join.clone());
        self.name.reload(settings.name.clone());
        self.falling.reload(settings.falling.clone());
        self.timer.reload(settings.timer.clone());
        self.keep_alive.reload(settings.keep_alive.clone());
        self.packet_limit.reload(settings.packet_limit.clone());
        self.chat.reload(settings.chat.clone());
    }
}
