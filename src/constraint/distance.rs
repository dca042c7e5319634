use glam::Vec3;

use crate::core::bodies::BodyId;
use crate::core::body::Body;
use crate::core::types::Pose;

use super::part::{AxisPart, CorrectionLimits};

/// Keeps two anchor points at a fixed rest distance along the line that
/// currently connects them.
#[derive(Debug, Clone)]
pub struct DistanceSettings {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Anchor on body A, world space at bind time.
    pub anchor_a: Vec3,
    /// Anchor on body B, world space at bind time.
    pub anchor_b: Vec3,
    /// Distance to hold; `None` binds the current anchor separation.
    pub rest_length: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct DistanceConstraint {
    r1_local: Vec3,
    r2_local: Vec3,
    rest_length: f32,
    /// Axis from the previous frame, reused while the anchors coincide.
    prev_axis: Vec3,
    part: AxisPart,
}

impl DistanceConstraint {
    pub fn new(settings: &DistanceSettings, pose_a: &Pose, pose_b: &Pose) -> Self {
        let rest_length = settings
            .rest_length
            .unwrap_or_else(|| (settings.anchor_b - settings.anchor_a).length());
        Self {
            r1_local: pose_a.world_to_local(settings.anchor_a),
            r2_local: pose_b.world_to_local(settings.anchor_b),
            rest_length,
            prev_axis: Vec3::Y,
            part: AxisPart::new(),
        }
    }

    fn anchors(&self, body_a: &Body, body_b: &Body) -> (Vec3, Vec3) {
        (
            body_a.pose.local_to_world(self.r1_local),
            body_b.pose.local_to_world(self.r2_local),
        )
    }

    fn axis(&mut self, p1: Vec3, p2: Vec3) -> Vec3 {
        let delta = p2 - p1;
        let len = delta.length();
        if len < 1e-6 {
            self.prev_axis
        } else {
            let axis = delta / len;
            self.prev_axis = axis;
            axis
        }
    }

    pub fn setup(&mut self, body_a: &Body, body_b: &Body) -> bool {
        let (p1, p2) = self.anchors(body_a, body_b);
        let axis = self.axis(p1, p2);
        let r1 = p1 - body_a.pose.position;
        let r2 = p2 - body_b.pose.position;
        self.part.setup(
            body_a,
            body_b,
            r1,
            r2,
            axis,
            f32::NEG_INFINITY,
            f32::INFINITY,
        )
    }

    pub fn warm_start(&mut self, body_a: &mut Body, body_b: &mut Body, ratio: f32) {
        self.part.warm_start(body_a, body_b, ratio);
    }

    pub fn solve_velocity(&mut self, body_a: &mut Body, body_b: &mut Body) -> bool {
        self.part.solve_velocity(body_a, body_b, 0.0)
    }

    pub fn solve_position(
        &mut self,
        body_a: &mut Body,
        body_b: &mut Body,
        baumgarte: f32,
        limits: &CorrectionLimits,
    ) -> bool {
        let (p1, p2) = self.anchors(body_a, body_b);
        let distance = (p2 - p1).length();
        // The axis points A→B, so the violation with `ċ = J·v` is
        // `rest − distance`.
        let c = self.rest_length - distance;
        if c.abs() < 1e-6 {
            return false;
        }
        self.part.solve_position(body_a, body_b, c, baumgarte, limits)
    }

    pub fn reset_warm_start(&mut self) {
        self.part.reset_lambda();
    }

    pub fn rest_length(&self) -> f32 {
        self.rest_length
    }
}
