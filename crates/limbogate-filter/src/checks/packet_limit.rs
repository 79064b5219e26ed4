//! Per-connection packet size and rate ceilings.

use std::time::Instant;

use parking_lot::RwLock;
use serde::Deserialize;

use super::CheckVerdict;
use crate::reason::BlockReason;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacketLimitSettings {
    /// Largest single packet body accepted.
    pub max_packet_bytes: usize,
    /// Incoming packets allowed per second per connection.
    pub max_packets_per_sec: u32,
    /// Incoming bytes allowed per second per connection.
    pub max_bytes_per_sec: u64,
}

impl Default for PacketLimitSettings {
    fn default() -> Self {
        Self {
            max_packet_bytes: 4096,
            max_packets_per_sec: 200,
            max_bytes_per_sec: 64 * 1024,
        }
    }
}

/// Per-session rolling one-second window.
#[derive(Debug, Clone, Copy)]
pub struct PacketLimitState {
    window_start: Instant,
    packets: u32,
    bytes: u64,
}

impl PacketLimitState {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            packets: 0,
            bytes: 0,
        }
    }
}

pub struct PacketLimitCheck {
    settings: RwLock<PacketLimitSettings>,
}

impl PacketLimitCheck {
    pub fn new(settings: PacketLimitSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    pub fn reload(&self, settings: PacketLimitSettings) {
        *self.settings.write() = settings;
    }

    pub fn record(&self, state: &mut PacketLimitState, size: usize, now: Instant) -> CheckVerdict {
        let settings = self.settings.read();
        if size > settings.max_packet_bytes {
            return CheckVerdict::Fail(BlockReason::PacketLimit);
        }
        if now.duration_since(state.window_start).as_secs() >= 1 {
            state.window_start = now;
            state.packets = 0;
            state.bytes = 0;
        }
        state.packets += 1;
        state.bytes += size as u64;
        if state.packets > settings.max_packets_per_sec || state.bytes > settings.max_bytes_per_sec
        {
            return CheckVerdict::Fail(BlockReason::PacketLimit);
        }
        CheckVerdict::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn check() -> PacketLimitCheck {
        PacketLimitCheck::new(PacketLimitSettings {
            max_packet_bytes: 100,
            max_packets_per_sec: 5,
            max_bytes_per_sec: 300,
        })
    }

    #[test]
    fn oversized_packet_rejected_outright() {
        let check = check();
        let now = Instant::now();
        let mut state = PacketLimitState::new(now);
        assert_eq!(
            check.record(&mut state, 101, now),
            CheckVerdict::Fail(BlockReason::PacketLimit)
        );
    }

    #[test]
    fn packet_rate_ceiling() {
        let check = check();
        let now = Instant::now();
        let mut state = PacketLimitState::new(now);
        for _ in 0..5 {
            assert!(check.record(&mut state, 10, now).passed());
        }
        assert_eq!(
            check.record(&mut state, 10, now),
            CheckVerdict::Fail(BlockReason::PacketLimit)
        );
    }

    #[test]
    fn byte_rate_ceiling() {
        let check = check();
        let now = Instant::now();
        let mut state = PacketLimitState::new(now);
        assert!(check.record(&mut state, 100, now).passed());
        assert!(check.record(&mut state, 100, now).passed());
        assert!(check.record(&mut state, 100, now).passed());
        assert_eq!(
            check.record(&mut state, 10, now),
            CheckVerdict::Fail(BlockReason::PacketLimit)
        );
    }

    #[test]
    fn window_resets_after_a_second() {
        let check = check();
        let start = Instant::now();
        let mut state = PacketLimitState::new(start);
        for _ in 0..5 {
            check.record(&mut state, 10, start);
        }
        let later = start + Duration::from_millis(1100);
        assert!(check.record(&mut state, 10, later).passed());
    }
}
