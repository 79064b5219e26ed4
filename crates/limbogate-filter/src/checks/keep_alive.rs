//! Keepalive liveness: the session sends a probe with a random id and
//! the client must echo it inside the window. Driven by the session's
//! coarse tick rather than a per-connection timer.

use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Deserialize;

use super::CheckVerdict;
use crate::reason::BlockReason;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeepAliveSettings {
    /// How long the client has to echo a probe.
    pub timeout_ms: u64,
}

impl Default for KeepAliveSettings {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

/// Per-session probe state.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAliveState {
    pending: Option<(i64, Instant)>,
}

impl KeepAliveState {
    pub fn sent(&mut self, id: i64, now: Instant) {
        self.pending = Some((id, now));
    }

    /// Returns true when the echo matches the outstanding probe.
    pub fn received(&mut self, id: i64) -> bool {
        match self.pending {
            Some((expected, _)) if expected == id => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn awaiting(&self) -> bool {
        self.pending.is_some()
    }
}

pub struct KeepAliveCheck {
    settings: RwLock<KeepAliveSettings>,
}

impl KeepAliveCheck {
    pub fn new(settings: KeepAliveSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    pub fn reload(&self, settings: KeepAliveSettings) {
        *self.settings.write() = settings;
    }

    /// Called from the scheduler tick.
    pub fn evaluate(&self, state: &KeepAliveState, now: Instant) -> CheckVerdict {
        let timeout = Duration::from_millis(self.settings.read().timeout_ms);
        match state.pending {
            Some((_, sent)) if now.duration_since(sent) > timeout => {
                CheckVerdict::Fail(BlockReason::KeepAliveTimeout)
            }
            _ => CheckVerdict::Pass,
        }
    }
}
