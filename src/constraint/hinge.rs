use glam::Vec3;

use crate::core::bodies::BodyId;
use crate::core::body::Body;
use crate::core::types::Pose;
use crate::utils::math::tangent_basis;

use super::part::{AnglePart, CorrectionLimits, PointPart};

/// Rotation limits about the hinge axis, inclusive, in radians.
#[derive(Debug, Clone, Copy)]
pub struct HingeLimits {
    pub min: f32,
    pub max: f32,
}

/// A door hinge: anchor points pinned, rotation free about one axis fixed
/// in each body's local frame, optionally limited.
#[derive(Debug, Clone)]
pub struct HingeSettings {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Hinge point, world space at bind time.
    pub anchor: Vec3,
    /// Hinge axis, world space at bind time.
    pub axis: Vec3,
    pub limits: Option<HingeLimits>,
}

#[derive(Debug, Clone)]
pub struct HingeConstraint {
    r1_local: Vec3,
    r2_local: Vec3,
    axis1_local: Vec3,
    axis2_local: Vec3,
    /// Reference vectors perpendicular to the axis, used to measure the
    /// hinge angle; captured in each body's frame at bind time.
    basis1_local: Vec3,
    basis2_local: Vec3,
    limits: Option<HingeLimits>,
    point: PointPart,
    off_axis: [AnglePart; 2],
    limit: AnglePart,
}

impl HingeConstraint {
    pub fn new(settings: &HingeSettings, pose_a: &Pose, pose_b: &Pose) -> Self {
        let axis = settings.axis.normalize();
        let (basis, _) = tangent_basis(axis);
        Self {
            r1_local: pose_a.world_to_local(settings.anchor),
            r2_local: pose_b.world_to_local(settings.anchor),
            axis1_local: pose_a.rotation.inverse() * axis,
            axis2_local: pose_b.rotation.inverse() * axis,
            basis1_local: pose_a.rotation.inverse() * basis,
            basis2_local: pose_b.rotation.inverse() * basis,
            limits: settings.limits,
            point: PointPart::new(),
            off_axis: [AnglePart::new(), AnglePart::new()],
            limit: AnglePart::new(),
        }
    }

    fn world_axes(&self, body_a: &Body, body_b: &Body) -> (Vec3, Vec3) {
        (
            body_a.pose.rotation * self.axis1_local,
            body_b.pose.rotation * self.axis2_local,
        )
    }

    /// Angle of B's basis relative to A's, measured about A's hinge axis.
    fn angle(&self, body_a: &Body, body_b: &Body) -> f32 {
        let (a1, _) = self.world_axes(body_a, body_b);
        let b1 = body_a.pose.rotation * self.basis1_local;
        let b2 = body_b.pose.rotation * self.basis2_local;
        f32::atan2(b1.cross(b2).dot(a1), b1.dot(b2))
    }

    pub fn setup(&mut self, body_a: &Body, body_b: &Body) -> bool {
        let mut ok = self
            .point
            .setup(body_a, body_b, self.r1_local, self.r2_local);

        let (a1, _) = self.world_axes(body_a, body_b);
        let (b, c) = tangent_basis(a1);
        ok &= self.off_axis[0].setup(
            body_a,
            body_b,
            b,
            f32::NEG_INFINITY,
            f32::INFINITY,
        );
        ok &= self.off_axis[1].setup(
            body_a,
            body_b,
            c,
            f32::NEG_INFINITY,
            f32::INFINITY,
        );

        if let Some(limits) = self.limits {
            let angle = self.angle(body_a, body_b);
            if angle >= limits.max {
                // Past the upper stop: only impulses pulling the angle back
                // are admissible.
                ok &= self
                    .limit
                    .setup(body_a, body_b, a1, f32::NEG_INFINITY, 0.0);
            } else if angle <= limits.min {
                ok &= self.limit.setup(body_a, body_b, a1, 0.0, f32::INFINITY);
            } else {
                self.limit.deactivate();
            }
        } else {
            self.limit.deactivate();
        }
        ok
    }

    pub fn warm_start(&mut self, body_a: &mut Body, body_b: &mut Body, ratio: f32) {
        self.point.warm_start(body_a, body_b, ratio);
        for part in &mut self.off_axis {
            part.warm_start(body_a, body_b, ratio);
        }
        self.limit.warm_start(body_a, body_b, ratio);
    }

    pub fn solve_velocity(&mut self, body_a: &mut Body, body_b: &mut Body) -> bool {
        let mut applied = false;
        for part in &mut self.off_axis {
            applied |= part.solve_velocity(body_a, body_b);
        }
        applied |= self.limit.solve_velocity(body_a, body_b);
        applied |= self.point.solve_velocity(body_a, body_b);
        applied
    }

    pub fn solve_position(
        &mut self,
        body_a: &mut Body,
        body_b: &mut Body,
        baumgarte: f32,
        limits: &CorrectionLimits,
    ) -> bool {
        let mut applied = false;

        // Re-align the hinge axes: the rotation vector taking a1 onto a2 is
        // a1×a2, split across the two off-axis parts.
        let (a1, a2) = self.world_axes(body_a, body_b);
        let misalignment = a1.cross(a2);
        for part in &mut self.off_axis {
            let c = -misalignment.dot(part.axis());
            if c.abs() > 1e-6 {
                applied |= part.solve_position(body_a, body_b, c, baumgarte, limits);
            }
        }

        if let Some(limit_range) = self.limits {
            let angle = self.angle(body_a, body_b);
            let c = if angle > limit_range.max {
                limit_range.max - angle
            } else if angle < limit_range.min {
                limit_range.min - angle
            } else {
                0.0
            };
            if c != 0.0 {
                applied |= self.limit.solve_position(body_a, body_b, c, baumgarte, limits);
            }
        }

        applied |= self.point.solve_position(body_a, body_b, baumgarte, limits);
        applied
    }

    pub fn reset_warm_start(&mut self) {
        self.point.reset_lambda();
        for part in &mut self.off_axis {
            part.reset_lambda();
        }
        self.limit.reset_lambda();
    }

    pub fn current_angle(&self, body_a: &Body, body_b: &Body) -> f32 {
        self.angle(body_a, body_b)
    }
}
