use glam::Vec3;

use crate::core::bodies::BodyId;
use crate::core::body::Body;
use crate::core::types::Pose;

use super::part::{CorrectionLimits, PointPart};

/// Pins a world-space anchor point on both bodies together, leaving all
/// rotation free.
#[derive(Debug, Clone)]
pub struct PointSettings {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Shared anchor, world space at bind time.
    pub anchor: Vec3,
}

#[derive(Debug, Clone)]
pub struct PointConstraint {
    r1_local: Vec3,
    r2_local: Vec3,
    part: PointPart,
}

impl PointConstraint {
    pub fn new(settings: &PointSettings, pose_a: &Pose, pose_b: &Pose) -> Self {
        Self {
            r1_local: pose_a.world_to_local(settings.anchor),
            r2_local: pose_b.world_to_local(settings.anchor),
            part: PointPart::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_local_anchors(r1_local: Vec3, r2_local: Vec3) -> Self {
        Self {
            r1_local,
            r2_local,
            part: PointPart::new(),
        }
    }

    pub fn setup(&mut self, body_a: &Body, body_b: &Body) -> bool {
        self.part
            .setup(body_a, body_b, self.r1_local, self.r2_local)
    }

    pub fn warm_start(&mut self, body_a: &mut Body, body_b: &mut Body, ratio: f32) {
        self.part.warm_start(body_a, body_b, ratio);
    }

    pub fn solve_velocity(&mut self, body_a: &mut Body, body_b: &mut Body) -> bool {
        self.part.solve_velocity(body_a, body_b)
    }

    pub fn solve_position(
        &mut self,
        body_a: &mut Body,
        body_b: &mut Body,
        baumgarte: f32,
        limits: &CorrectionLimits,
    ) -> bool {
        self.part.solve_position(body_a, body_b, baumgarte, limits)
    }

    pub fn reset_warm_start(&mut self) {
        self.part.reset_lambda();
    }

    pub fn total_lambda(&self) -> Vec3 {
        self.part.total_lambda()
    }
}
