//! Movement sanity. The limbo spawns the client high in an empty
//! column, so legitimate movement is a fall: pitch stays inside ±90°,
//! vertical movement goes down, the ground flag stays clear and the
//! per-packet displacement stays under the per-tick maximum.

use parking_lot::RwLock;
use serde::Deserialize;

use super::CheckVerdict;
use crate::reason::BlockReason;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FallingSettings {
    /// Maximum per-packet horizontal displacement per axis.
    pub max_delta_xz: f64,
    /// Maximum per-packet vertical displacement.
    pub max_delta_y: f64,
    /// Reject any upward movement.
    pub disallow_up: bool,
    /// Movement packets ignored before enforcement starts.
    pub grace_packets: u32,
}

impl Default for FallingSettings {
    fn default() -> Self {
        Self {
            max_delta_xz: 10.0,
            max_delta_y: 10.0,
            disallow_up: true,
            grace_packets: 3,
        }
    }
}

/// Per-session movement context, owned by the connection task.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementState {
    packets: u32,
    last_y: Option<f64>,
    repeated_y: u32,
}

/// One decoded movement packet, reduced to what the check needs.
#[derive(Debug, Clone, Copy)]
pub struct MovementUpdate {
    pub delta_x: f64,
    pub delta_y: f64,
    pub delta_z: f64,
    pub y: f64,
    pub pitch: f32,
    pub on_ground: bool,
}

pub struct FallingCheck {
    settings: RwLock<FallingSettings>,
}

impl FallingCheck {
    pub fn new(settings: FallingSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    pub fn reload(&self, settings: FallingSettings) {
        *self.settings.write() = settings;
    }

    pub fn evaluate(&self, state: &mut MovementState, update: MovementUpdate) -> CheckVerdict {
        let settings = self.settings.read();

        if !(-90.0..=90.0).contains(&update.pitch) {
            return CheckVerdict::Fail(BlockReason::InvalidMovement);
        }

        state.packets += 1;
        if state.packets <= settings.grace_packets {
            state.last_y = Some(update.y);
            return CheckVerdict::Pass;
        }

        if settings.disallow_up && update.delta_y > 0.0 {
            return CheckVerdict::Fail(BlockReason::InvalidMovement);
        }
        if update.on_ground {
            // The column under the client is empty; it can never land.
            return CheckVerdict::Fail(BlockReason::InvalidMovement);
        }
        if update.delta_x.abs() > settings.max_delta_xz
            || update.delta_z.abs() > settings.max_delta_xz
            || update.delta_y.abs() > settings.max_delta_y
        {
            return CheckVerdict::Fail(BlockReason::InvalidMovement);
        }

        if state.last_y == Some(update.y) {
            state.repeated_y += 1;
            if state.repeated_y >= 2 {
                return CheckVerdict::Fail(BlockReason::InvalidMovement);
            }
        } else {
            state.repeated_y = 0;
        }
        state.last_y = Some(update.y);
        CheckVerdict::Pass
    }
}
