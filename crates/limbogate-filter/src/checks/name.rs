//! Login-name validation: pattern, already-online and a similarity
//! probe over a bounded sample of recent names that catches the
//! name-with-incrementing-suffix pattern bot kits produce.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashSet;
use parking_lot::{Mutex, RwLock};
use regex::Regex;
use serde::Deserialize;

use super::CheckVerdict;
use crate::reason::BlockReason;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NameSettings {
    pub pattern: String,
    /// Names sharing a stem with this many recent names get rejected.
    pub similarity_threshold: usize,
    /// How many recent names to keep for the similarity probe.
    pub similarity_sample: usize,
    /// How long a recent name stays relevant.
    pub similarity_window_secs: u64,
}

impl Default for NameSettings {
    fn default() -> Self {
        Self {
            pattern: "^[A-Za-z0-9_]{3,16}$".into(),
            similarity_threshold: 5,
            similarity_sample: 32,
            similarity_window_secs: 60,
        }
    }
}

pub struct NameCheck {
    settings: RwLock<NameSettings>,
    pattern: RwLock<Regex>,
    online_names: DashSet<String>,
    recent: Mutex<VecDeque<(String, Instant)>>,
}

impl NameCheck {
    pub fn new(settings: NameSettings) -> Self {
        let pattern = compile(&settings.pattern);
        Self {
            settings: RwLock::new(settings),
            pattern: RwLock::new(pattern),
            online_names: DashSet::new(),
            recent: Mutex::new(VecDeque::new()),
        }
    }

    pub fn reload(&self, settings: NameSettings) {
        *self.pattern.write() = compile(&settings.pattern);
        *self.settings.write() = settings;
    }

    pub fn evaluate(&self, name: &str) -> CheckVerdict {
        self.evaluate_at(name, Instant::now())
    }

    fn evaluate_at(&self, name: &str, now: Instant) -> CheckVerdict {
        if !self.pattern.read().is_match(name) {
            return CheckVerdict::Fail(BlockReason::InvalidName);
        }
        if self.online_names.contains(&name.to_lowercase()) {
            return CheckVerdict::Fail(BlockReason::AlreadyOnline);
        }

        let settings = self.settings.read();
        let window = Duration::from_secs(settings.similarity_window_secs);
        let stem = stem_of(name);
        let mut recent = self.recent.lock();
        while let Some((_, seen)) = recent.front() {
            if now.duration_since(*seen) > window {
                recent.pop_front();
            } else {
                break;
            }
        }
        let similar = recent.iter().filter(|(s, _)| *s == stem).count();
        recent.push_back((stem, now));
        while recent.len() > settings.similarity_sample {
            recent.pop_front();
        }
        if similar >= settings.similarity_threshold {
            return CheckVerdict::Fail(BlockReason::NameSimilarity);
        }
        CheckVerdict::Pass
    }

    pub fn register(&self, name: &str) {
        self.online_names.insert(name.to_lowercase());
    }

    pub fn unregister(&self, name: &str) {
        self.online_names.remove(&name.to_lowercase());
    }
}

fn compile(pattern: &str) -> Regex {
    // Fall back to the default pattern rather than panic on a bad
    // reload.
    Regex::new(pattern)
        .unwrap_or_else(|_| Regex::new(&NameSettings::default().pattern).unwrap())
}

/// Digit-stripped lowercase stem: "Player123" and "Player777" collide.
fn stem_of(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_ascii_digit())
        .collect::<String>()
        .to_lowercase()
}
