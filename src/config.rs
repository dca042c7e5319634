//! Global configuration for the Kinetica core.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Default gravity vector applied in the physics world (Y-up).
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.81, 0.0];

/// Default integration timestep (in seconds).
pub const DEFAULT_TIME_STEP: f32 = 1.0 / 60.0;

/// Default number of velocity iterations per island per step.
pub const DEFAULT_VELOCITY_STEPS: u32 = 8;

/// Default number of position iterations per island per step.
pub const DEFAULT_POSITION_STEPS: u32 = 3;

/// Tunable solver and sleeping parameters shared by every island.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorldSettings {
    /// Velocity iterations used by islands without a larger override.
    pub num_velocity_steps: u32,
    /// Position iterations used by islands without a larger override.
    pub num_position_steps: u32,
    /// Baumgarte gain applied to positional residuals.
    pub baumgarte: f32,
    /// Penetration tolerated before position correction kicks in.
    pub penetration_slop: f32,
    /// Per-iteration cap on linear position correction (meters).
    pub max_position_correction: f32,
    /// Per-iteration cap on angular position correction (radians).
    pub max_angular_correction: f32,
    /// Approach speed below which restitution produces no bounce (m/s).
    pub restitution_threshold: f32,
    /// Largest point velocity still counted as quiescent (m/s).
    pub point_velocity_sleep_threshold: f32,
    /// Time a body must stay quiescent before it may sleep (seconds).
    pub time_before_sleep: f32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            num_velocity_steps: DEFAULT_VELOCITY_STEPS,
            num_position_steps: DEFAULT_POSITION_STEPS,
            baumgarte: 0.2,
            penetration_slop: 5.0e-4,
            max_position_correction: 0.2,
            max_angular_correction: 8.0_f32.to_radians(),
            restitution_threshold: 1.0,
            point_velocity_sleep_threshold: 0.03,
            time_before_sleep: 0.5,
        }
    }
}

impl WorldSettings {
    pub fn default_gravity() -> Vec3 {
        Vec3::from_slice(&DEFAULT_GRAVITY)
    }
}
