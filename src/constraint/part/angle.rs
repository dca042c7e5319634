use glam::Vec3;

use crate::core::body::Body;

use super::CorrectionLimits;

/// Constrains one rotational degree of freedom about a world-space axis,
/// with an inclusive lambda range for one-sided limits.
#[derive(Debug, Clone, Copy)]
pub struct AnglePart {
    axis: Vec3,
    inv_i1_axis: Vec3,
    inv_i2_axis: Vec3,
    effective_mass: f32,
    total_lambda: f32,
    min_lambda: f32,
    max_lambda: f32,
    active: bool,
}

impl Default for AnglePart {
    fn default() -> Self {
        Self {
            axis: Vec3::ZERO,
            inv_i1_axis: Vec3::ZERO,
            inv_i2_axis: Vec3::ZERO,
            effective_mass: 0.0,
            total_lambda: 0.0,
            min_lambda: f32::NEG_INFINITY,
            max_lambda: f32::INFINITY,
            active: false,
        }
    }
}

impl AnglePart {
    pub fn new() -> Self {
        Self::default()
    }

    /// `K⁻¹ = nᵀ·(I₁⁻¹+I₂⁻¹)·n`. Returns false for a degenerate axis or a
    /// pair that cannot rotate.
    pub fn setup(
        &mut self,
        body_a: &Body,
        body_b: &Body,
        axis: Vec3,
        min_lambda: f32,
        max_lambda: f32,
    ) -> bool {
        self.axis = axis;
        self.min_lambda = min_lambda;
        self.max_lambda = max_lambda;
        let inv_i1 = body_a.world_inverse_inertia();
        let inv_i2 = body_b.world_inverse_inertia();
        self.inv_i1_axis = inv_i1 * axis;
        self.inv_i2_axis = inv_i2 * axis;
        let k_inv = axis.dot(self.inv_i1_axis + self.inv_i2_axis);
        if k_inv < 1e-12 || axis.length_squared() < 1e-12 {
            self.active = false;
            return false;
        }
        self.effective_mass = 1.0 / k_inv;
        self.active = true;
        true
    }

    fn apply_impulse(&self, body_a: &mut Body, body_b: &mut Body, lambda: f32) {
        body_a.velocity.angular -= self.inv_i1_axis * lambda;
        body_b.velocity.angular += self.inv_i2_axis * lambda;
    }

    pub fn warm_start(&mut self, body_a: &mut Body, body_b: &mut Body, ratio: f32) {
        self.total_lambda *= ratio;
        if self.active && self.total_lambda != 0.0 {
            self.apply_impulse(body_a, body_b, self.total_lambda);
        }
    }

    /// One velocity iteration driving `n·(ω₁−ω₂)` to zero, clamping the
    /// accumulated lambda into `[min, max]` and applying the corrected
    /// delta.
    pub fn solve_velocity(&mut self, body_a: &mut Body, body_b: &mut Body) -> bool {
        if !self.active {
            return false;
        }
        let jv = self
            .axis
            .dot(body_a.velocity.angular - body_b.velocity.angular);
        let lambda = self.effective_mass * jv;
        let new_total = (self.total_lambda + lambda).clamp(self.min_lambda, self.max_lambda);
        let delta = new_total - self.total_lambda;
        if delta == 0.0 {
            return false;
        }
        self.total_lambda = new_total;
        self.apply_impulse(body_a, body_b, delta);
        true
    }

    /// One position iteration against the angular violation `c`, measured so
    /// that its time derivative is `n·(ω₁−ω₂)`.
    pub fn solve_position(
        &mut self,
        body_a: &mut Body,
        body_b: &mut Body,
        c: f32,
        baumgarte: f32,
        limits: &CorrectionLimits,
    ) -> bool {
        if !self.active || c == 0.0 {
            return false;
        }
        let lambda = (self.effective_mass * c * baumgarte).clamp(self.min_lambda, self.max_lambda);
        if lambda == 0.0 {
            return false;
        }
        body_a.apply_position_step(
            Vec3::ZERO,
            limits.clamp_angular(-self.inv_i1_axis * lambda),
        );
        body_b.apply_position_step(Vec3::ZERO, limits.clamp_angular(self.inv_i2_axis * lambda));
        true
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.total_lambda = 0.0;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn total_lambda(&self) -> f32 {
        self.total_lambda
    }

    pub fn reset_lambda(&mut self) {
        self.total_lambda = 0.0;
    }

    pub fn axis(&self) -> Vec3 {
        self.axis
    }
}
