//! Global attack/idle state machine.
//!
//! Fed one sample per second with the connections-per-second figure
//! from [`ConnectionStatistics`]. Entering attack resets the per-session
//! counters; leaving follows either the instant policy (first sample
//! below the trigger) or a countdown of consecutive quiet samples.
//! Transitions and method-attribution changes are published on a
//! broadcast channel.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::info;

use crate::reason::BlockReason;
use crate::statistics::ConnectionStatistics;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AttackSettings {
    /// Connections-per-second above which an attack starts.
    pub trigger_cps: u64,
    /// End the attack on the first quiet sample instead of counting
    /// down.
    pub instant_end: bool,
    /// Consecutive quiet samples required to end the attack when
    /// `instant_end` is off.
    pub wait_seconds: u64,
}

impl Default for AttackSettings {
    fn default() -> Self {
        Self {
            trigger_cps: 8,
            instant_end: false,
            wait_seconds: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub enum AttackEvent {
    Started { methods: Vec<BlockReason> },
    MethodsChanged { methods: Vec<BlockReason> },
    Stopped { duration: Duration },
}

pub struct AttackManager {
    in_attack: AtomicBool,
    trigger_cps: AtomicU64,
    instant_end: AtomicBool,
    wait_seconds: AtomicU64,
    countdown: AtomicU64,
    methods: RwLock<Vec<BlockReason>>,
    started_at: Mutex<Option<Instant>>,
    events: broadcast::Sender<AttackEvent>,
}

impl AttackManager {
    pub fn new(settings: &AttackSettings) -> Self {
        let (events, _) = broadcast::channel(16);
        let manager = Self {
            in_attack: AtomicBool::new(false),
            trigger_cps: AtomicU64::new(0),
            instant_end: AtomicBool::new(false),
            wait_seconds: AtomicU64::new(0),
            countdown: AtomicU64::new(0),
            methods: RwLock::new(Vec::new()),
            started_at: Mutex::new(None),
            events,
        };
        manager.reload(settings);
        manager
    }

    pub fn reload(&self, settings: &AttackSettings) {
        self.trigger_cps.store(settings.trigger_cps, Ordering::Relaxed);
        self.instant_end
            .store(settings.instant_end, Ordering::Relaxed);
        self.wait_seconds
            .store(settings.wait_seconds, Ordering::Relaxed);
    }

    pub fn in_attack(&self) -> bool {
        self.in_attack.load(Ordering::Relaxed)
    }

    /// Currently attributed attack methods; empty while idle.
    pub fn methods(&self) -> Vec<BlockReason> {
        self.methods.read().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AttackEvent> {
        self.events.subscribe()
    }

    /// Consume one 1 Hz sample. `stats` provides the per-second blocked
    /// counters used for method attribution.
    pub fn sample(&self, cps: u64, stats: &ConnectionStatistics) {
        let trigger = self.trigger_cps.load(Ordering::Relaxed);
        if !self.in_attack() {
            if cps > trigger {
                self.enter(cps, stats);
            }
            return;
        }

        if cps > trigger {
            // Still hot: refresh attribution and reset any countdown.
            self.countdown
                .store(self.wait_seconds.load(Ordering::Relaxed), Ordering::Relaxed);
            self.refresh_methods(cps, stats);
            return;
        }

        if self.instant_end.load(Ordering::Relaxed) {
            self.leave();
        } else if self.countdown.fetch_sub(1, Ordering::Relaxed) <= 1 {
            self.leave();
        }
    }

    fn enter(&self, cps: u64, stats: &ConnectionStatistics) {
        self.in_attack.store(true, Ordering::Relaxed);
        self.countdown
            .store(self.wait_seconds.load(Ordering::Relaxed), Ordering::Relaxed);
        stats.reset_session();
        *self.started_at.lock() = Some(Instant::now());
        let methods = attribute(cps, stats);
        *self.methods.write() = methods.clone();
        info!(cps, ?methods, "attack detected");
        let _ = self.events.send(AttackEvent::Started { methods });
    }

    fn leave(&self) {
        self.in_attack.store(false, Ordering::Relaxed);
        let duration = self
            .started_at
            .lock()
            .take()
            .map(|t| t.elapsed())
            .unwrap_or_default();
        self.methods.write().clear();
        info!(?duration, "attack ended");
        let _ = self.events.send(AttackEvent::Stopped { duration });
    }

    fn refresh_methods(&self, cps: u64, stats: &ConnectionStatistics) {
        // Attribution needs enough volume to be meaningful.
        if cps <= 2 * BlockReason::COUNT as u64 {
            return;
        }
        let methods = attribute(cps, stats);
        let mut current = self.methods.write();
        if *current != methods {
            *current = methods.clone();
            info!(?methods, "attack methods changed");
            let _ = self.events.send(AttackEvent::MethodsChanged { methods });
        }
    }
}

/// Reasons whose last-second blocked count exceeds an even share of the
/// current cps.
fn attribute(cps: u64, stats: &ConnectionStatistics) -> Vec<BlockReason> {
    let share = cps / BlockReason::COUNT as u64;
    BlockReason::ALL
        .iter()
        .copied()
        .filter(|r| stats.blocked_last_second(*r) > share)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(trigger: u64, instant: bool, wait: u64) -> AttackManager {
        AttackManager::new(&AttackSettings {
            trigger_cps: trigger,
            instant_end: instant,
            wait_seconds: wait,
        })
    }

    #[test]
    fn instant_end_sequence() {
        let stats = ConnectionStatistics::new();
        let manager = manager(5, true, 0);
        let expected = [false, false, true, true, false];
        for (cps, in_attack) in [2u64, 3, 6, 7, 1].into_iter().zip(expected) {
            manager.sample(cps, &stats);
            assert_eq!(manager.in_attack(), in_attack, "cps sample {cps}");
        }
    }

    #[test]
    fn countdown_end_requires_consecutive_quiet_samples() {
        let stats = ConnectionStatistics::new();
        let manager = manager(5, false, 3);
        manager.sample(10, &stats);
        assert!(manager.in_attack());
        manager.sample(1, &stats);
        manager.sample(1, &stats);
        assert!(manager.in_attack());
        // A hot sample resets the countdown.
        manager.sample(9, &stats);
        manager.sample(1, &stats);
        manager.sample(1, &stats);
        assert!(manager.in_attack());
        manager.sample(1, &stats);
        assert!(!manager.in_attack());
    }

    #[test]
    fn trigger_is_exclusive() {
        let stats = ConnectionStatistics::new();
        let manager = manager(5, true, 0);
        manager.sample(5, &stats);
        assert!(!manager.in_attack());
        manager.sample(6, &stats);
        assert!(manager.in_attack());
    }

    #[test]
    fn entering_attack_resets_session_counters() {
        let stats = ConnectionStatistics::new();
        stats.count_connection("10.0.0.1".parse().unwrap());
        assert_eq!(stats.session_total(), 1);
        let manager = manager(1, true, 0);
        manager.sample(2, &stats);
        assert_eq!(stats.session_total(), 0);
        assert_eq!(stats.total(), 1);
    }

    #[test]
    fn attribution_selects_dominant_reasons() {
        let stats = ConnectionStatistics::new();
        let cps = 100u64;
        for _ in 0..50 {
            stats.count_blocked(BlockReason::Proxy);
        }
        for _ in 0..3 {
            stats.count_blocked(BlockReason::Timer);
        }
        stats.tick_second();
        let methods = attribute(cps, &stats);
        assert!(methods.contains(&BlockReason::Proxy));
        assert!(!methods.contains(&BlockReason::Timer));
    }

    #[test]
    fn events_are_published() {
        let stats = ConnectionStatistics::new();
        let manager = manager(1, true, 0);
        let mut events = manager.subscribe();
        manager.sample(5, &stats);
        manager.sample(0, &stats);
        assert!(matches!(
            events.try_recv().unwrap(),
            AttackEvent::Started { .. }
        ));
        assert!(matches!(
            events.try_recv().unwrap(),
            AttackEvent::Stopped { .. }
        ));
    }
}
