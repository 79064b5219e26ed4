//! Chat gate: a held session has no business talking.

use parking_lot::RwLock;
use serde::Deserialize;

use super::CheckVerdict;
use crate::reason::BlockReason;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Kick sessions that send chat while still in the limbo.
    pub block_chat: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self { block_chat: true }
    }
}

pub struct ChatCheck {
    settings: RwLock<ChatSettings>,
}

impl ChatCheck {
    pub fn new(settings: ChatSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    pub fn reload(&self, settings: ChatSettings) {
        *self.settings.write() = settings;
    }

    pub fn evaluate(&self) -> CheckVerdict {
        if self.settings.read().block_chat {
            CheckVerdict::Fail(BlockReason::ChatDisabled)
        } else {
            CheckVerdict::Pass
        }
    }
}
