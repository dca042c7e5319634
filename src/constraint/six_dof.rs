use glam::{Quat, Vec3};

use crate::core::bodies::BodyId;
use crate::core::body::Body;
use crate::core::types::Pose;

use super::part::{AnglePart, AxisPart, CorrectionLimits, PointPart, RotationPart};

/// Per-axis behavior of a six-degree-of-freedom constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisState {
    Locked,
    Free,
    /// Inclusive range: meters for translation axes, radians for rotation
    /// axes.
    Limited(f32, f32),
}

/// The union of all other joints: every translational and rotational axis
/// can independently be locked, free, or limited. Axes are taken from
/// `frame` at bind time and follow body A.
#[derive(Debug, Clone)]
pub struct SixDofSettings {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Constraint reference point, world space at bind time.
    pub anchor: Vec3,
    /// Constraint axes frame, world space at bind time.
    pub frame: Quat,
    pub translation: [AxisState; 3],
    pub rotation: [AxisState; 3],
}

impl SixDofSettings {
    /// A fully locked configuration, behaving like a Fixed constraint.
    pub fn locked(body_a: BodyId, body_b: BodyId, anchor: Vec3) -> Self {
        Self {
            body_a,
            body_b,
            anchor,
            frame: Quat::IDENTITY,
            translation: [AxisState::Locked; 3],
            rotation: [AxisState::Locked; 3],
        }
    }
}

#[derive(Debug, Clone)]
pub struct SixDofConstraint {
    r1_local: Vec3,
    r2_local: Vec3,
    frame1_local: Quat,
    translation_states: [AxisState; 3],
    rotation_states: [AxisState; 3],
    all_translation_locked: bool,
    all_rotation_locked: bool,
    /// `q_B⁻¹ · q_A` captured at bind time.
    inv_initial_orientation: Quat,
    point: PointPart,
    rotation_lock: RotationPart,
    translation_parts: [AxisPart; 3],
    rotation_parts: [AnglePart; 3],
}

impl SixDofConstraint {
    pub fn new(settings: &SixDofSettings, pose_a: &Pose, pose_b: &Pose) -> Self {
        let all_translation_locked = settings
            .translation
            .iter()
            .all(|s| *s == AxisState::Locked);
        let all_rotation_locked = settings.rotation.iter().all(|s| *s == AxisState::Locked);
        Self {
            r1_local: pose_a.world_to_local(settings.anchor),
            r2_local: pose_b.world_to_local(settings.anchor),
            frame1_local: (pose_a.rotation.inverse() * settings.frame).normalize(),
            translation_states: settings.translation,
            rotation_states: settings.rotation,
            all_translation_locked,
            all_rotation_locked,
            inv_initial_orientation: pose_b.rotation.inverse() * pose_a.rotation,
            point: PointPart::new(),
            rotation_lock: RotationPart::new(),
            translation_parts: [AxisPart::new(); 3],
            rotation_parts: [AnglePart::new(); 3],
        }
    }

    fn frame_axes(&self, body_a: &Body) -> [Vec3; 3] {
        let frame = body_a.pose.rotation * self.frame1_local;
        [frame * Vec3::X, frame * Vec3::Y, frame * Vec3::Z]
    }

    /// Rotation residual of B relative to A as a doubled small-angle vector.
    fn rotation_error(&self, body_a: &Body, body_b: &Body) -> Vec3 {
        let mut residual =
            body_b.pose.rotation * self.inv_initial_orientation * body_a.pose.rotation.inverse();
        if residual.w < 0.0 {
            residual = -residual;
        }
        2.0 * Vec3::new(residual.x, residual.y, residual.z)
    }

    pub fn setup(&mut self, body_a: &Body, body_b: &Body) -> bool {
        let mut ok = true;
        let axes = self.frame_axes(body_a);
        let p1 = body_a.pose.local_to_world(self.r1_local);
        let p2 = body_b.pose.local_to_world(self.r2_local);
        let r1 = p1 - body_a.pose.position;
        let r2 = p2 - body_b.pose.position;
        let separation = p2 - p1;

        if self.all_translation_locked {
            ok &= self
                .point
                .setup(body_a, body_b, self.r1_local, self.r2_local);
            for part in &mut self.translation_parts {
                part.deactivate();
            }
        } else {
            self.point.deactivate();
            for (i, part) in self.translation_parts.iter_mut().enumerate() {
                match self.translation_states[i] {
                    AxisState::Locked => {
                        ok &= part.setup(
                            body_a,
                            body_b,
                            r1,
                            r2,
                            axes[i],
                            f32::NEG_INFINITY,
                            f32::INFINITY,
                        );
                    }
                    AxisState::Free => part.deactivate(),
                    AxisState::Limited(min, max) => {
                        let t = axes[i].dot(separation);
                        if t >= max {
                            ok &= part.setup(
                                body_a,
                                body_b,
                                r1,
                                r2,
                                axes[i],
                                f32::NEG_INFINITY,
                                0.0,
                            );
                        } else if t <= min {
                            ok &= part.setup(
                                body_a,
                                body_b,
                                r1,
                                r2,
                                axes[i],
                                0.0,
                                f32::INFINITY,
                            );
                        } else {
                            part.deactivate();
                        }
                    }
                }
            }
        }

        if self.all_rotation_locked {
            ok &= self.rotation_lock.setup(body_a, body_b);
            for part in &mut self.rotation_parts {
                part.deactivate();
            }
        } else {
            self.rotation_lock.deactivate();
            let error = self.rotation_error(body_a, body_b);
            for (i, part) in self.rotation_parts.iter_mut().enumerate() {
                match self.rotation_states[i] {
                    AxisState::Locked => {
                        ok &= part.setup(
                            body_a,
                            body_b,
                            axes[i],
                            f32::NEG_INFINITY,
                            f32::INFINITY,
                        );
                    }
                    AxisState::Free => part.deactivate(),
                    AxisState::Limited(min, max) => {
                        let angle = error.dot(axes[i]);
                        if angle >= max {
                            ok &= part.setup(
                                body_a,
                                body_b,
                                axes[i],
                                f32::NEG_INFINITY,
                                0.0,
                            );
                        } else if angle <= min {
                            ok &= part.setup(body_a, body_b, axes[i], 0.0, f32::INFINITY);
                        } else {
                            part.deactivate();
                        }
                    }
                }
            }
        }
        ok
    }

    pub fn warm_start(&mut self, body_a: &mut Body, body_b: &mut Body, ratio: f32) {
        self.point.warm_start(body_a, body_b, ratio);
        self.rotation_lock.warm_start(body_a, body_b, ratio);
        for part in &mut self.translation_parts {
            part.warm_start(body_a, body_b, ratio);
        }
        for part in &mut self.rotation_parts {
            part.warm_start(body_a, body_b, ratio);
        }
    }

    pub fn solve_velocity(&mut self, body_a: &mut Body, body_b: &mut Body) -> bool {
        let mut applied = self.rotation_lock.solve_velocity(body_a, body_b);
        for part in &mut self.rotation_parts {
            applied |= part.solve_velocity(body_a, body_b);
        }
        for part in &mut self.translation_parts {
            applied |= part.solve_velocity(body_a, body_b, 0.0);
        }
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
        let mut applied = self.rotation_lock.solve_position(
            body_a,
            body_b,
            self.inv_initial_orientation,
            baumgarte,
            limits,
        );

        if !self.all_rotation_locked {
            let error = self.rotation_error(body_a, body_b);
            for (i, part) in self.rotation_parts.iter_mut().enumerate() {
                let c = match self.rotation_states[i] {
                    AxisState::Locked => -error.dot(part.axis()),
                    AxisState::Limited(min, max) => {
                        let angle = error.dot(part.axis());
                        if angle > max {
                            max - angle
                        } else if angle < min {
                            min - angle
                        } else {
                            0.0
                        }
                    }
                    AxisState::Free => 0.0,
                };
                if c.abs() > 1e-6 {
                    applied |= part.solve_position(body_a, body_b, c, baumgarte, limits);
                }
            }
        }

        applied |= self.point.solve_position(body_a, body_b, baumgarte, limits);

        if !self.all_translation_locked {
            let p1 = body_a.pose.local_to_world(self.r1_local);
            let p2 = body_b.pose.local_to_world(self.r2_local);
            let separation = p2 - p1;
            for (i, part) in self.translation_parts.iter_mut().enumerate() {
                let c = match self.translation_states[i] {
                    AxisState::Locked => -separation.dot(part.axis()),
                    AxisState::Limited(min, max) => {
                        let t = separation.dot(part.axis());
                        if t > max {
                            max - t
                        } else if t < min {
                            min - t
                        } else {
                            0.0
                        }
                    }
                    AxisState::Free => 0.0,
                };
                if c.abs() > 1e-6 {
                    applied |= part.solve_position(body_a, body_b, c, baumgarte, limits);
                }
            }
        }
        applied
    }

    pub fn reset_warm_start(&mut self) {
        self.point.reset_lambda();
        self.rotation_lock.reset_lambda();
        for part in &mut self.translation_parts {
            part.reset_lambda();
        }
        for part in &mut self.rotation_parts {
            part.reset_lambda();
        }
    }
}
