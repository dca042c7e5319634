use glam::{Quat, Vec3};

use crate::core::bodies::BodyId;
use crate::core::body::Body;
use crate::core::types::Pose;

use super::part::{CorrectionLimits, PointPart, RotationPart};

/// Welds two bodies together: the anchor points coincide and the relative
/// orientation stays at its bind-time value.
#[derive(Debug, Clone)]
pub struct FixedSettings {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Weld point, world space at bind time.
    pub anchor: Vec3,
}

#[derive(Debug, Clone)]
pub struct FixedConstraint {
    r1_local: Vec3,
    r2_local: Vec3,
    /// `q_B⁻¹ · q_A` captured at bind time.
    inv_initial_orientation: Quat,
    point: PointPart,
    rotation: RotationPart,
}

impl FixedConstraint {
    pub fn new(settings: &FixedSettings, pose_a: &Pose, pose_b: &Pose) -> Self {
        Self {
            r1_local: pose_a.world_to_local(settings.anchor),
            r2_local: pose_b.world_to_local(settings.anchor),
            inv_initial_orientation: pose_b.rotation.inverse() * pose_a.rotation,
            point: PointPart::new(),
            rotation: RotationPart::new(),
        }
    }

    pub fn setup(&mut self, body_a: &Body, body_b: &Body) -> bool {
        let point_ok = self
            .point
            .setup(body_a, body_b, self.r1_local, self.r2_local);
        let rotation_ok = self.rotation.setup(body_a, body_b);
        point_ok && rotation_ok
    }

    pub fn warm_start(&mut self, body_a: &mut Body, body_b: &mut Body, ratio: f32) {
        self.point.warm_start(body_a, body_b, ratio);
        self.rotation.warm_start(body_a, body_b, ratio);
    }

    pub fn solve_velocity(&mut self, body_a: &mut Body, body_b: &mut Body) -> bool {
        let rotation = self.rotation.solve_velocity(body_a, body_b);
        let point = self.point.solve_velocity(body_a, body_b);
        rotation || point
    }

    pub fn solve_position(
        &mut self,
        body_a: &mut Body,
        body_b: &mut Body,
        baumgarte: f32,
        limits: &CorrectionLimits,
    ) -> bool {
        let rotation = self.rotation.solve_position(
            body_a,
            body_b,
            self.inv_initial_orientation,
            baumgarte,
            limits,
        );
        let point = self.point.solve_position(body_a, body_b, baumgarte, limits);
        rotation || point
    }

    pub fn reset_warm_start(&mut self) {
        self.point.reset_lambda();
        self.rotation.reset_lambda();
    }
}
