use glam::{Quat, Vec3};

use crate::core::bodies::BodyId;
use crate::core::body::Body;
use crate::core::types::Pose;
use crate::utils::math::swing_twist;

use super::part::{AnglePart, CorrectionLimits, PointPart};

/// A shoulder joint: anchor pinned, swing of the twist axis limited to a
/// cone, rotation about the twist axis limited to a range.
#[derive(Debug, Clone)]
pub struct SwingTwistSettings {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Joint point, world space at bind time.
    pub anchor: Vec3,
    /// Twist axis, world space at bind time (shared by both bodies).
    pub twist_axis: Vec3,
    /// Half opening angle of the swing cone, radians.
    pub swing_half_angle: f32,
    /// Twist range about the axis, inclusive, radians.
    pub twist_min: f32,
    pub twist_max: f32,
}

#[derive(Debug, Clone)]
pub struct SwingTwistConstraint {
    r1_local: Vec3,
    r2_local: Vec3,
    twist1_local: Vec3,
    twist2_local: Vec3,
    /// `q_A⁻¹ · q_B` captured at bind time; twist is measured against it.
    initial_relative: Quat,
    swing_half_angle: f32,
    cos_swing_half_angle: f32,
    twist_min: f32,
    twist_max: f32,
    prev_swing_axis: Vec3,
    point: PointPart,
    swing: AnglePart,
    twist: AnglePart,
}

impl SwingTwistConstraint {
    pub fn new(settings: &SwingTwistSettings, pose_a: &Pose, pose_b: &Pose) -> Self {
        let twist = settings.twist_axis.normalize();
        Self {
            r1_local: pose_a.world_to_local(settings.anchor),
            r2_local: pose_b.world_to_local(settings.anchor),
            twist1_local: pose_a.rotation.inverse() * twist,
            twist2_local: pose_b.rotation.inverse() * twist,
            initial_relative: pose_a.rotation.inverse() * pose_b.rotation,
            swing_half_angle: settings.swing_half_angle,
            cos_swing_half_angle: settings.swing_half_angle.cos(),
            twist_min: settings.twist_min,
            twist_max: settings.twist_max,
            prev_swing_axis: Vec3::X,
            point: PointPart::new(),
            swing: AnglePart::new(),
            twist: AnglePart::new(),
        }
    }

    fn twist_axes(&self, body_a: &Body, body_b: &Body) -> (Vec3, Vec3) {
        (
            body_a.pose.rotation * self.twist1_local,
            body_b.pose.rotation * self.twist2_local,
        )
    }

    /// Twist of B relative to A about the twist axis, measured against the
    /// bind pose, in `[-π, π]`.
    fn twist_angle(&self, body_a: &Body, body_b: &Body) -> f32 {
        let relative = body_a.pose.rotation.inverse() * body_b.pose.rotation;
        let residual = self.initial_relative.inverse() * relative;
        let (_, twist) = swing_twist(residual, self.twist1_local);
        let mut angle = 2.0 * f32::atan2(
            Vec3::new(twist.x, twist.y, twist.z).dot(self.twist1_local),
            twist.w,
        );
        if angle > std::f32::consts::PI {
            angle -= 2.0 * std::f32::consts::PI;
        } else if angle < -std::f32::consts::PI {
            angle += 2.0 * std::f32::consts::PI;
        }
        angle
    }

    fn swing_limit_axis(&mut self, t1: Vec3, t2: Vec3) -> Vec3 {
        let cross = t2.cross(t1);
        let len = cross.length();
        if len < 1e-6 {
            self.prev_swing_axis
        } else {
            let axis = cross / len;
            self.prev_swing_axis = axis;
            axis
        }
    }

    pub fn setup(&mut self, body_a: &Body, body_b: &Body) -> bool {
        let mut ok = self
            .point
            .setup(body_a, body_b, self.r1_local, self.r2_local);

        let (t1, t2) = self.twist_axes(body_a, body_b);
        if t1.dot(t2) < self.cos_swing_half_angle {
            let axis = self.swing_limit_axis(t1, t2);
            ok &= self.swing.setup(body_a, body_b, axis, 0.0, f32::INFINITY);
        } else {
            self.swing.deactivate();
        }

        let twist_angle = self.twist_angle(body_a, body_b);
        // The twist axis in AnglePart convention: positive lambda rotates A
        // forward, reducing B's relative twist.
        if twist_angle >= self.twist_max {
            ok &= self
                .twist
                .setup(body_a, body_b, t1, f32::NEG_INFINITY, 0.0);
        } else if twist_angle <= self.twist_min {
            ok &= self.twist.setup(body_a, body_b, t1, 0.0, f32::INFINITY);
        } else {
            self.twist.deactivate();
        }
        ok
    }

    pub fn warm_start(&mut self, body_a: &mut Body, body_b: &mut Body, ratio: f32) {
        self.point.warm_start(body_a, body_b, ratio);
        self.swing.warm_start(body_a, body_b, ratio);
        self.twist.warm_start(body_a, body_b, ratio);
    }

    pub fn solve_velocity(&mut self, body_a: &mut Body, body_b: &mut Body) -> bool {
        let mut applied = self.swing.solve_velocity(body_a, body_b);
        applied |= self.twist.solve_velocity(body_a, body_b);
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
        if dot < self.cos_swing_half_angle {
            let c = dot.acos() - self.swing_half_angle;
            applied |= self.swing.solve_position(body_a, body_b, c, baumgarte, limits);
        }

        let twist_angle = self.twist_angle(body_a, body_b);
        let c = if twist_angle > self.twist_max {
            self.twist_max - twist_angle
        } else if twist_angle < self.twist_min {
            self.twist_min - twist_angle
        } else {
            0.0
        };
        if c != 0.0 {
            applied |= self.twist.solve_position(body_a, body_b, c, baumgarte, limits);
        }

        applied |= self.point.solve_position(body_a, body_b, baumgarte, limits);
        applied
    }

    pub fn reset_warm_start(&mut self) {
        self.point.reset_lambda();
        self.swing.reset_lambda();
        self.twist.reset_lambda();
    }

    pub fn current_twist(&self, body_a: &Body, body_b: &Body) -> f32 {
        self.twist_angle(body_a, body_b)
    }
}
