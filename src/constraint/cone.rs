use glam::Vec3;

use crate::core::bodies::BodyId;
use crate::core::body::Body;
use crate::core::types::Pose;

use super::part::{AnglePart, CorrectionLimits, PointPart};

/// Pins an anchor point and keeps the twist axes of both bodies within a
/// cone: `t₁·t₂ ≥ cos(half_angle)`.
#[derive(Debug, Clone)]
pub struct ConeSettings {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Cone apex, world space at bind time.
    pub anchor: Vec3,
    /// Twist axis, world space at bind time (shared by both bodies).
    pub twist_axis: Vec3,
    /// Half opening angle of the cone, radians.
    pub half_angle: f32,
}

#[derive(Debug, Clone)]
pub struct ConeConstraint {
    r1_local: Vec3,
    r2_local: Vec3,
    twist1_local: Vec3,
    twist2_local: Vec3,
    cos_half_angle: f32,
    half_angle: f32,
    /// Rotation axis from the previous frame, the fallback when the twist
    /// axes are parallel.
    prev_axis: Vec3,
    point: PointPart,
    limit: AnglePart,
}

impl ConeConstraint {
    pub fn new(settings: &ConeSettings, pose_a: &Pose, pose_b: &Pose) -> Self {
        let twist = settings.twist_axis.normalize();
        Self {
            r1_local: pose_a.world_to_local(settings.anchor),
            r2_local: pose_b.world_to_local(settings.anchor),
            twist1_local: pose_a.rotation.inverse() * twist,
            twist2_local: pose_b.rotation.inverse() * twist,
            cos_half_angle: settings.half_angle.cos(),
            half_angle: settings.half_angle,
            prev_axis: Vec3::X,
            point: PointPart::new(),
            limit: AnglePart::new(),
        }
    }

    fn twist_axes(&self, body_a: &Body, body_b: &Body) -> (Vec3, Vec3) {
        (
            body_a.pose.rotation * self.twist1_local,
            body_b.pose.rotation * self.twist2_local,
        )
    }

    /// Rotation axis of the cone limit, `t₂×t₁`; the previous frame's axis
    /// stands in when the twist axes are (anti)parallel.
    fn limit_axis(&mut self, t1: Vec3, t2: Vec3) -> Vec3 {
        let cross = t2.cross(t1);
        let len = cross.length();
        if len < 1e-6 {
            self.prev_axis
        } else {
            let axis = cross / len;
            self.prev_axis = axis;
            axis
        }
    }

    pub fn setup(&mut self, body_a: &Body, body_b: &Body) -> bool {
        let mut ok = self
            .point
            .setup(body_a, body_b, self.r1_local, self.r2_local);

        let (t1, t2) = self.twist_axes(body_a, body_b);
        if t1.dot(t2) < self.cos_half_angle {
            let axis = self.limit_axis(t1, t2);
            ok &= self.limit.setup(body_a, body_b, axis, 0.0, f32::INFINITY);
        } else {
            self.limit.deactivate();
        }
        ok
    }

    pub fn warm_start(&mut self, body_a: &mut Body, body_b: &mut Body, ratio: f32) {
        self.point.warm_start(body_a, body_b, ratio);
        self.limit.warm_start(body_a, body_b, ratio);
    }

    pub fn solve_velocity(&mut self, body_a: &mut Body, body_b: &mut Body) -> bool {
        let mut applied = self.limit.solve_velocity(body_a, body_b);
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
        let (t1, t2) = self.twist_axes(body_a, body_b);
        let dot = t1.dot(t2).clamp(-1.0, 1.0);
        if dot < self.cos_half_angle {
            let c = dot.acos() - self.half_angle;
            applied |= self.limit.solve_position(body_a, body_b, c, baumgarte, limits);
        }
        applied |= self.point.solve_position(body_a, body_b, baumgarte, limits);
        applied
    }

    pub fn reset_warm_start(&mut self) {
        self.point.reset_lambda();
        self.limit.reset_lambda();
    }

    /// Current opening angle between the twist axes, radians.
    pub fn current_angle(&self, body_a: &Body, body_b: &Body) -> f32 {
        let (t1, t2) = self.twist_axes(body_a, body_b);
        t1.dot(t2).clamp(-1.0, 1.0).acos()
    }
}
