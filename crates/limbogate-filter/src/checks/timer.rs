//! Timer check: movement packets arriving faster than a client tick
//! accumulate violations; sustained legitimate spacing decays them.

use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Deserialize;

use super::CheckVerdict;
use crate::reason::BlockReason;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimerSettings {
    /// Minimum allowed spacing between movement packets.
    pub min_delay_ms: u64,
    /// Violation score at which the connection is kicked.
    pub kick_vl: u32,
    /// Compliant time needed to decay one violation point.
    pub decay_interval_ms: u64,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            min_delay_ms: 40,
            kick_vl: 8,
            decay_interval_ms: 1000,
        }
    }
}

/// Per-session timing context.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimerState {
    last_packet: Option<Instant>,
    last_decay: Option<Instant>,
    vl: u32,
}

impl TimerState {
    pub fn violations(&self) -> u32 {
        self.vl
    }
}

pub struct TimerCheck {
    settings: RwLock<TimerSettings>,
}

impl TimerCheck {
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    pub fn reload(&self, settings: TimerSettings) {
        *self.settings.write() = settings;
    }

    pub fn evaluate(&self, state: &mut TimerState) -> CheckVerdict {
        self.evaluate_at(state, Instant::now())
    }

    pub fn evaluate_at(&self, state: &mut TimerState, now: Instant) -> CheckVerdict {
        let settings = self.settings.read();
        let min_delay = Duration::from_millis(settings.min_delay_ms);
        let decay_interval = Duration::from_millis(settings.decay_interval_ms);

        if let Some(last) = state.last_packet {
            if now.duration_since(last) < min_delay {
                state.vl = (state.vl + 1).min(settings.kick_vl);
                state.last_decay = Some(now);
            } else {
                let since_decay = state.last_decay.map_or(Duration::ZERO, |d| {
                    now.duration_since(d)
                });
                if since_decay >= decay_interval && state.vl > 0 {
                    state.vl -= 1;
                    state.last_decay = Some(now);
                }
            }
        } else {
            state.last_decay = Some(now);
        }
        state.last_packet = Some(now);

        if state.vl >= settings.kick_vl {
            CheckVerdict::Fail(BlockReason::Timer)
        } else {
            CheckVerdict::Pass
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(kick_vl: u32) -> TimerCheck {
        TimerCheck::new(TimerSettings {
            min_delay_ms: 40,
            kick_vl,
            decay_interval_ms: 1000,
        })
    }

    #[test]
    fn fast_packets_accumulate_and_kick() {
        let check = check(3);
        let mut state = TimerState::default();
        let start = Instant::now();
        assert!(check.evaluate_at(&mut state, start).passed());
        let mut now = start;
        for i in 0..2 {
            now += Duration::from_millis(10);
            assert!(check.evaluate_at(&mut state, now).passed(), "packet {i}");
        }
        now += Duration::from_millis(10);
        assert_eq!(
            check.evaluate_at(&mut state, now),
            CheckVerdict::Fail(BlockReason::Timer)
        );
        assert_eq!(state.violations(), 3);
    }

    #[test]
    fn violations_cap_at_kick_vl() {
        let check = check(2);
        let mut state = TimerState::default();
        let mut now = Instant::now();
        check.evaluate_at(&mut state, now);
        for _ in 0..10 {
            now += Duration::from_millis(5);
            check.evaluate_at(&mut state, now);
        }
        assert_eq!(state.violations(), 2);
    }

    #[test]
    fn compliant_spacing_decays_one_point_per_interval() {
        let check = check(10);
        let mut state = TimerState::default();
        let mut now = Instant::now();
        check.evaluate_at(&mut state, now);
        for _ in 0..4 {
            now += Duration::from_millis(10);
            check.evaluate_at(&mut state, now);
        }
        assert_eq!(state.violations(), 4);

        // One second of clean 50 ms spacing drops exactly one point.
        for _ in 0..20 {
            now += Duration::from_millis(50);
            assert!(check.evaluate_at(&mut state, now).passed());
        }
        assert_eq!(state.violations(), 3);
    }
}
