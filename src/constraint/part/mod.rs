//! Reusable algebraic blocks composed into concrete constraints.
//!
//! Each part follows the same contract: `setup` computes and caches the
//! effective mass at the current pose, `warm_start` re-applies the scaled
//! impulse accumulated last step, `solve_velocity` performs one
//! Gauss-Seidel iteration, and `solve_position` applies a Baumgarte-scaled
//! direct pose correction using the cached effective mass. A part whose
//! effective mass is singular deactivates itself for the frame and applies
//! nothing.

pub mod angle;
pub mod axis;
pub mod point;
pub mod rotation;

pub use angle::AnglePart;
pub use axis::AxisPart;
pub use point::PointPart;
pub use rotation::RotationPart;

/// Per-iteration bounds on direct pose corrections, preventing tunneling
/// under large Baumgarte gains.
#[derive(Debug, Clone, Copy)]
pub struct CorrectionLimits {
    pub max_linear: f32,
    pub max_angular: f32,
}

impl CorrectionLimits {
    pub fn clamp_linear(&self, step: glam::Vec3) -> glam::Vec3 {
        let len = step.length();
        if len > self.max_linear {
            step * (self.max_linear / len)
        } else {
            step
        }
    }

    pub fn clamp_angular(&self, step: glam::Vec3) -> glam::Vec3 {
        let len = step.length();
        if len > self.max_angular {
            step * (self.max_angular / len)
        } else {
            step
        }
    }
}
