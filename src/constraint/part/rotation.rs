use glam::{Mat3, Quat, Vec3};

use crate::core::body::Body;

use super::CorrectionLimits;

/// Locks all three rotational degrees of freedom between two bodies.
///
/// The position error is the rotation vector of the residual quaternion,
/// `2·vec(q₂·r₀·q₁⁻¹)` — for small angles a quaternion's vector part is
/// `sin(θ/2)·axis ≈ θ/2·axis`, hence the doubling.
#[derive(Debug, Clone, Copy, Default)]
pub struct RotationPart {
    inv_i1: Mat3,
    inv_i2: Mat3,
    effective_mass: Mat3,
    total_lambda: Vec3,
    active: bool,
}

impl RotationPart {
    pub fn new() -> Self {
        Self::default()
    }

    /// `K⁻¹ = I₁⁻¹ + I₂⁻¹`. Returns false when singular (e.g. two
    /// non-dynamic bodies).
    pub fn setup(&mut self, body_a: &Body, body_b: &Body) -> bool {
        self.inv_i1 = body_a.world_inverse_inertia();
        self.inv_i2 = body_b.world_inverse_inertia();
        let k_inv = self.inv_i1 + self.inv_i2;
        if k_inv.determinant().abs() < 1e-12 {
            self.active = false;
            return false;
        }
        self.effective_mass = k_inv.inverse();
        self.active = true;
        true
    }

    fn apply_impulse(&self, body_a: &mut Body, body_b: &mut Body, lambda: Vec3) {
        body_a.velocity.angular -= self.inv_i1 * lambda;
        body_b.velocity.angular += self.inv_i2 * lambda;
    }

    pub fn warm_start(&mut self, body_a: &mut Body, body_b: &mut Body, ratio: f32) {
        self.total_lambda *= ratio;
        if self.active && self.total_lambda.length_squared() > 0.0 {
            self.apply_impulse(body_a, body_b, self.total_lambda);
        }
    }

    pub fn solve_velocity(&mut self, body_a: &mut Body, body_b: &mut Body) -> bool {
        if !self.active {
            return false;
        }
        let jv = body_a.velocity.angular - body_b.velocity.angular;
        let lambda = self.effective_mass * jv;
        if lambda.length_squared() == 0.0 {
            return false;
        }
        self.total_lambda += lambda;
        self.apply_impulse(body_a, body_b, lambda);
        true
    }

    /// `inv_initial` is the bind-time residual `r₀ = q_B⁻¹·q_A`.
    pub fn solve_position(
        &mut self,
        body_a: &mut Body,
        body_b: &mut Body,
        inv_initial: Quat,
        baumgarte: f32,
        limits: &CorrectionLimits,
    ) -> bool {
        if !self.active {
            return false;
        }
        let mut residual = body_b.pose.rotation * inv_initial * body_a.pose.rotation.inverse();
        if residual.w < 0.0 {
            residual = -residual;
        }
        let error = 2.0 * Vec3::new(residual.x, residual.y, residual.z);
        if error.length_squared() < 1e-12 {
            return false;
        }
        let lambda = -(self.effective_mass * error) * baumgarte;
        body_a.apply_position_step(Vec3::ZERO, limits.clamp_angular(-(self.inv_i1 * lambda)));
        body_b.apply_position_step(Vec3::ZERO, limits.clamp_angular(self.inv_i2 * lambda));
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
