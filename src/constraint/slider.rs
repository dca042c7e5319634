use glam::{Quat, Vec3};

use crate::core::bodies::BodyId;
use crate::core::body::Body;
use crate::core::types::Pose;
use crate::utils::math::tangent_basis;

use super::part::{AxisPart, CorrectionLimits, RotationPart};

/// Translation limits along the slide axis, inclusive, in meters.
#[derive(Debug, Clone, Copy)]
pub struct SliderLimits {
    pub min: f32,
    pub max: f32,
}

/// A piston: all rotation locked, translation free along one axis fixed in
/// body A's frame, optionally limited.
#[derive(Debug, Clone)]
pub struct SliderSettings {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Reference point on the slide axis, world space at bind time.
    pub anchor: Vec3,
    /// Slide axis, world space at bind time.
    pub axis: Vec3,
    pub limits: Option<SliderLimits>,
}

#[derive(Debug, Clone)]
pub struct SliderConstraint {
    r1_local: Vec3,
    r2_local: Vec3,
    axis_local: Vec3,
    /// `q_B⁻¹ · q_A` captured at bind time.
    inv_initial_orientation: Quat,
    limits: Option<SliderLimits>,
    rotation: RotationPart,
    perpendicular: [AxisPart; 2],
    limit: AxisPart,
}

impl SliderConstraint {
    pub fn new(settings: &SliderSettings, pose_a: &Pose, pose_b: &Pose) -> Self {
        Self {
            r1_local: pose_a.world_to_local(settings.anchor),
            r2_local: pose_b.world_to_local(settings.anchor),
            axis_local: pose_a.rotation.inverse() * settings.axis.normalize(),
            inv_initial_orientation: pose_b.rotation.inverse() * pose_a.rotation,
            limits: settings.limits,
            rotation: RotationPart::new(),
            perpendicular: [AxisPart::new(), AxisPart::new()],
            limit: AxisPart::new(),
        }
    }

    fn geometry(&self, body_a: &Body, body_b: &Body) -> (Vec3, Vec3, Vec3, Vec3, Vec3) {
        let p1 = body_a.pose.local_to_world(self.r1_local);
        let p2 = body_b.pose.local_to_world(self.r2_local);
        let axis = body_a.pose.rotation * self.axis_local;
        // Both Jacobians reference B's anchor so the pair cannot torque
        // itself through the free axis.
        let r1 = p2 - body_a.pose.position;
        let r2 = p2 - body_b.pose.position;
        (p1, p2, axis, r1, r2)
    }

    pub fn setup(&mut self, body_a: &Body, body_b: &Body) -> bool {
        let mut ok = self.rotation.setup(body_a, body_b);

        let (p1, p2, axis, r1, r2) = self.geometry(body_a, body_b);
        let (u, v) = tangent_basis(axis);
        ok &= self.perpendicular[0].setup(
            body_a,
            body_b,
            r1,
            r2,
            u,
            f32::NEG_INFINITY,
            f32::INFINITY,
        );
        ok &= self.perpendicular[1].setup(
            body_a,
            body_b,
            r1,
            r2,
            v,
            f32::NEG_INFINITY,
            f32::INFINITY,
        );

        if let Some(limits) = self.limits {
            let translation = axis.dot(p2 - p1);
            if translation >= limits.max {
                ok &= self.limit.setup(
                    body_a,
                    body_b,
                    r1,
                    r2,
                    axis,
                    f32::NEG_INFINITY,
                    0.0,
                );
            } else if translation <= limits.min {
                ok &= self
                    .limit
                    .setup(body_a, body_b, r1, r2, axis, 0.0, f32::INFINITY);
            } else {
                self.limit.deactivate();
            }
        } else {
            self.limit.deactivate();
        }
        ok
    }

    pub fn warm_start(&mut self, body_a: &mut Body, body_b: &mut Body, ratio: f32) {
        self.rotation.warm_start(body_a, body_b, ratio);
        for part in &mut self.perpendicular {
            part.warm_start(body_a, body_b, ratio);
        }
        self.limit.warm_start(body_a, body_b, ratio);
    }

    pub fn solve_velocity(&mut self, body_a: &mut Body, body_b: &mut Body) -> bool {
        let mut applied = self.rotation.solve_velocity(body_a, body_b);
        for part in &mut self.perpendicular {
            applied |= part.solve_velocity(body_a, body_b, 0.0);
        }
        applied |= self.limit.solve_velocity(body_a, body_b, 0.0);
        applied
    }

    pub fn solve_position(
        &mut self,
        body_a: &mut Body,
        body_b: &mut Body,
        baumgarte: f32,
        limits: &CorrectionLimits,
    ) -> bool {
        let mut applied = self.rotation.solve_position(
            body_a,
            body_b,
            self.inv_initial_orientation,
            baumgarte,
            limits,
        );

        let (p1, p2, axis, _, _) = self.geometry(body_a, body_b);
        let separation = p2 - p1;
        for part in &mut self.perpendicular {
            let c = -separation.dot(part.axis());
            if c.abs() > 1e-6 {
                applied |= part.solve_position(body_a, body_b, c, baumgarte, limits);
            }
        }

        if let Some(limit_range) = self.limits {
            let translation = axis.dot(separation);
            let c = if translation > limit_range.max {
                limit_range.max - translation
            } else if translation < limit_range.min {
                limit_range.min - translation
            } else {
                0.0
            };
            if c != 0.0 {
                applied |= self.limit.solve_position(body_a, body_b, c, baumgarte, limits);
            }
        }
        applied
    }

    pub fn reset_warm_start(&mut self) {
        self.rotation.reset_lambda();
        for part in &mut self.perpendicular {
            part.reset_lambda();
        }
        self.limit.reset_lambda();
    }

    pub fn current_translation(&self, body_a: &Body, body_b: &Body) -> f32 {
        let (p1, p2, axis, _, _) = self.geometry(body_a, body_b);
        axis.dot(p2 - p1)
    }
}
