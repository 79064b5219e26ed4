//! Shared connection-rate counters.
//!
//! Written from every connection task, read by the 1 Hz sampler and
//! the attack manager. Everything is atomics plus a concurrent address
//! set; `tick_second` is the only place the per-second counters roll
//! over, and it runs from exactly one task.

use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashSet;

use crate::reason::BlockReason;

/// Cap on the distinct-address set. Past this many entries the unique
/// count saturates; a spoofed-source flood cannot grow the set further.
pub const MAX_TRACKED_ADDRESSES: usize = 1 << 20;

pub struct ConnectionStatistics {
    total: AtomicU64,
    session_total: AtomicU64,
    current_second: AtomicU64,
    cps: AtomicU64,
    peak_cps: AtomicU64,
    session_peak_cps: AtomicU64,
    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
    unique_addresses: DashSet<IpAddr>,
    blocked: [AtomicU64; BlockReason::COUNT],
    session_blocked: [AtomicU64; BlockReason::COUNT],
    blocked_this_second: [AtomicU64; BlockReason::COUNT],
    blocked_last_second: [AtomicU64; BlockReason::COUNT],
}

fn zeroed() -> [AtomicU64; BlockReason::COUNT] {
    std::array::from_fn(|_| AtomicU64::new(0))
}

impl ConnectionStatistics {
    pub fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            session_total: AtomicU64::new(0),
            current_second: AtomicU64::new(0),
            cps: AtomicU64::new(0),
            peak_cps: AtomicU64::new(0),
            session_peak_cps: AtomicU64::new(0),
            bytes_in: AtomicU64::new(0),
            bytes_out: AtomicU64::new(0),
            unique_addresses: DashSet::new(),
            blocked: zeroed(),
            session_blocked: zeroed(),
            blocked_this_second: zeroed(),
            blocked_last_second: zeroed(),
        }
    }

    pub fn count_connection(&self, address: IpAddr) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.session_total.fetch_add(1, Ordering::Relaxed);
        self.current_second.fetch_add(1, Ordering::Relaxed);
        if self.unique_addresses.len() < MAX_TRACKED_ADDRESSES {
            self.unique_addresses.insert(address);
        }
    }

    pub fn count_blocked(&self, reason: BlockReason) {
        let i = reason.index();
        self.blocked[i].fetch_add(1, Ordering::Relaxed);
        self.session_blocked[i].fetch_add(1, Ordering::Relaxed);
        self.blocked_this_second[i].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count_bytes_in(&self, n: u64) {
        self.bytes_in.fetch_add(n, Ordering::Relaxed);
    }

    pub fn count_bytes_out(&self, n: u64) {
        self.bytes_out.fetch_add(n, Ordering::Relaxed);
    }

    /// Roll the per-second window. Returns the connections seen in the
    /// second that just closed.
    pub fn tick_second(&self) -> u64 {
        let cps = self.current_second.swap(0, Ordering::Relaxed);
        self.cps.store(cps, Ordering::Relaxed);
        self.peak_cps.fetch_max(cps, Ordering::Relaxed);
        self.session_peak_cps.fetch_max(cps, Ordering::Relaxed);
        for i in 0..BlockReason::COUNT {
            let n = self.blocked_this_second[i].swap(0, Ordering::Relaxed);
            self.blocked_last_second[i].store(n, Ordering::Relaxed);
        }
        cps
    }

    /// Clear the per-attack-session counters. Lifetime counters are
    /// never reset.
    pub fn reset_session(&self) {
        self.session_total.store(0, Ordering::Relaxed);
        self.session_peak_cps.store(0, Ordering::Relaxed);
        for counter in &self.session_blocked {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub fn cps(&self) -> u64 {
        self.cps.load(Ordering::Relaxed)
    }

    pub fn peak_cps(&self) -> u64 {
        self.peak_cps.load(Ordering::Relaxed)
    }

    pub fn session_peak_cps(&self) -> u64 {
        self.session_peak_cps.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn session_total(&self) -> u64 {
        self.session_total.load(Ordering::Relaxed)
    }

    pub fn unique_addresses(&self) -> usize {
        self.unique_addresses.len()
    }

    pub fn blocked(&self, reason: BlockReason) -> u64 {
        self.blocked[reason.index()].load(Ordering::Relaxed)
    }

    pub fn session_blocked(&self, reason: BlockReason) -> u64 {
        self.session_blocked[reason.index()].load(Ordering::Relaxed)
    }

    /// Blocked count for the last completed one-second window.
    pub fn blocked_last_second(&self, reason: BlockReason) -> u64 {
        self.blocked_last_second[reason.index()].load(Ordering::Relaxed)
    }

    pub fn bytes_in(&self) -> u64 {
        self.bytes_in.load(Ordering::Relaxed)
    }

    pub fn bytes_out(&self) -> u64 {
        self.bytes_out.load(Ordering::Relaxed)
    }
}

impl Default for ConnectionStatistics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_window_rolls_over() {
        let stats = ConnectionStatistics::new();
        for _ in 0..3 {
            stats.count_connection("10.0.0.1".parse().unwrap());
        }
        stats.count_connection("10.0.0.2".parse().unwrap());
        assert_eq!(stats.tick_second(), 4);
        assert_eq!(stats.cps(), 4);
        assert_eq!(stats.peak_cps(), 4);
        assert_eq!(stats.unique_addresses(), 2);
        assert_eq!(stats.tick_second(), 0);
        assert_eq!(stats.peak_cps(), 4); // peak survives quiet seconds
    }

    #[test]
    fn blocked_counters_split_by_window() {
        let stats = ConnectionStatistics::new();
        stats.count_blocked(BlockReason::Proxy);
        stats.count_blocked(BlockReason::Proxy);
        stats.count_blocked(BlockReason::Timer);
        assert_eq!(stats.blocked_last_second(BlockReason::Proxy), 0);
        stats.tick_second();
        assert_eq!(stats.blocked_last_second(BlockReason::Proxy), 2);
        assert_eq!(stats.blocked_last_second(BlockReason::Timer), 1);
        assert_eq!(stats.blocked(BlockReason::Proxy), 2);
    }

    #[test]
    fn unique_address_set_saturates_at_cap() {
        let stats = ConnectionStatistics::new();
        for i in 0..(MAX_TRACKED_ADDRESSES as u32 + 8) {
            stats.count_connection(std::net::Ipv4Addr::from(i).into());
        }
        assert_eq!(stats.unique_addresses(), MAX_TRACKED_ADDRESSES);
        // Totals keep counting past the cap.
        assert_eq!(stats.total(), MAX_TRACKED_ADDRESSES as u64 + 8);
    }

    #[test]
    fn session_reset_keeps_lifetime_counters() {
        let stats = ConnectionStatistics::new();
        stats.count_connection("10.0.0.1".parse().unwrap());
        stats.count_blocked(BlockReason::InvalidName);
        stats.tick_second();
        stats.reset_session();
        assert_eq!(stats.session_total(), 0);
        assert_eq!(stats.session_blocked(BlockReason::InvalidName), 0);
        assert_eq!(stats.total(), 1);
        assert_eq!(stats.blocked(BlockReason::InvalidName), 1);
    }
}
