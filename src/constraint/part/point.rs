use glam::{Mat3, Vec3};

use crate::core::body::Body;
use crate::utils::math::skew;

use super::CorrectionLimits;

/// Constrains three translational degrees of freedom: the world-space
/// anchors on both bodies are driven to coincide.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointPart {
    r1_local: Vec3,
    r2_local: Vec3,
    r1: Vec3,
    r2: Vec3,
    im1: f32,
    im2: f32,
    inv_i1_r1x: Mat3,
    inv_i2_r2x: Mat3,
    effective_mass: Mat3,
    total_lambda: Vec3,
    active: bool,
}

impl PointPart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the world moment arms and the 3×3 effective mass
    /// `K = ((m₁⁻¹+m₂⁻¹)·E + [r₁]×·I₁⁻¹·[r₁]×ᵀ + [r₂]×·I₂⁻¹·[r₂]×ᵀ)⁻¹`.
    /// Returns false (and deactivates for the frame) when K⁻¹ is singular.
    pub fn setup(&mut self, body_a: &Body, body_b: &Body, r1_local: Vec3, r2_local: Vec3) -> bool {
        self.r1_local = r1_local;
        self.r2_local = r2_local;
        self.r1 = body_a.pose.rotation * r1_local;
        self.r2 = body_b.pose.rotation * r2_local;
        self.im1 = body_a.inverse_mass;
        self.im2 = body_b.inverse_mass;

        let inv_i1 = body_a.world_inverse_inertia();
        let inv_i2 = body_b.world_inverse_inertia();
        let r1x = skew(self.r1);
        let r2x = skew(self.r2);
        self.inv_i1_r1x = inv_i1 * r1x;
        self.inv_i2_r2x = inv_i2 * r2x;

        let k_inv = Mat3::IDENTITY * (self.im1 + self.im2)
            + r1x * inv_i1 * r1x.transpose()
            + r2x * inv_i2 * r2x.transpose();

        if k_inv.determinant().abs() < 1e-12 {
            self.active = false;
            return false;
        }
        self.effective_mass = k_inv.inverse();
        self.active = true;
        true
    }

    fn apply_impulse(&self, body_a: &mut Body, body_b: &mut Body, lambda: Vec3) {
        body_a.velocity.linear -= lambda * self.im1;
        body_a.velocity.angular -= self.inv_i1_r1x * lambda;
        body_b.velocity.linear += lambda * self.im2;
        body_b.velocity.angular += self.inv_i2_r2x * lambda;
    }

    pub fn warm_start(&mut self, body_a: &mut Body, body_b: &mut Body, ratio: f32) {
        self.total_lambda *= ratio;
        if self.active && self.total_lambda.length_squared() > 0.0 {
            self.apply_impulse(body_a, body_b, self.total_lambda);
        }
    }

    /// One velocity iteration. Returns true iff an impulse was applied.
    pub fn solve_velocity(&mut self, body_a: &mut Body, body_b: &mut Body) -> bool {
        if !self.active {
            return false;
        }
        let jv = body_a.velocity.point_velocity(self.r1) - body_b.velocity.point_velocity(self.r2);
        let lambda = self.effective_mass * jv;
        if lambda.length_squared() == 0.0 {
            return false;
        }
        self.total_lambda += lambda;
        self.apply_impulse(body_a, body_b, lambda);
        true
    }

    /// One position iteration: `λ = −β·K·C` with `C = (x₂+r₂)−(x₁+r₁)`,
    /// applied as a bounded direct pose step.
    pub fn solve_position(
        &mut self,
        body_a: &mut Body,
        body_b: &mut Body,
        baumgarte: f32,
        limits: &CorrectionLimits,
    ) -> bool {
        if !self.active {
            return false;
        }
        let r1 = body_a.pose.rotation * self.r1_local;
        let r2 = body_b.pose.rotation * self.r2_local;
        let c = (body_b.pose.position + r2) - (body_a.pose.position + r1);
        if c.length_squared() < 1e-12 {
            return false;
        }
        let lambda = -(self.effective_mass * c) * baumgarte;

        body_a.apply_position_step(
            limits.clamp_linear(-lambda * self.im1),
            limits.clamp_angular(-(self.inv_i1_r1x * lambda)),
        );
        body_b.apply_position_step(
            limits.clamp_linear(lambda * self.im2),
            limits.clamp_angular(self.inv_i2_r2x * lambda),
        );
        true
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.total_lambda = Vec3::ZERO;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn total_lambda(&self) -> Vec3 {
        self.total_lambda
    }

    pub fn reset_lambda(&mut self) {
        self.total_lambda = Vec3::ZERO;
    }
}
