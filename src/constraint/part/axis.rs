use glam::Vec3;

use crate::core::body::Body;

use super::CorrectionLimits;

/// Constrains one translational degree of freedom along a world-space axis
/// with moment arms on both bodies. Limited variants clamp the accumulated
/// lambda into an inclusive range.
#[derive(Debug, Clone, Copy)]
pub struct AxisPart {
    axis: Vec3,
    r1: Vec3,
    r2: Vec3,
    im1: f32,
    im2: f32,
    inv_i1_r1xn: Vec3,
    inv_i2_r2xn: Vec3,
    effective_mass: f32,
    total_lambda: f32,
    min_lambda: f32,
    max_lambda: f32,
    active: bool,
}

impl Default for AxisPart {
    fn default() -> Self {
        Self {
            axis: Vec3::ZERO,
            r1: Vec3::ZERO,
            r2: Vec3::ZERO,
            im1: 0.0,
            im2: 0.0,
            inv_i1_r1xn: Vec3::ZERO,
            inv_i2_r2xn: Vec3::ZERO,
            effective_mass: 0.0,
            total_lambda: 0.0,
            min_lambda: f32::NEG_INFINITY,
            max_lambda: f32::INFINITY,
            active: false,
        }
    }
}

impl AxisPart {
    pub fn new() -> Self {
        Self::default()
    }

    /// `K⁻¹ = m₁⁻¹+m₂⁻¹ + (r₁×n)·I₁⁻¹·(r₁×n) + (r₂×n)·I₂⁻¹·(r₂×n)`.
    pub fn setup(
        &mut self,
        body_a: &Body,
        body_b: &Body,
        r1: Vec3,
        r2: Vec3,
        axis: Vec3,
        min_lambda: f32,
        max_lambda: f32,
    ) -> bool {
        self.axis = axis;
        self.r1 = r1;
        self.r2 = r2;
        self.im1 = body_a.inverse_mass;
        self.im2 = body_b.inverse_mass;
        self.min_lambda = min_lambda;
        self.max_lambda = max_lambda;

        if axis.length_squared() < 1e-12 {
            self.active = false;
            return false;
        }
        let u1 = r1.cross(axis);
        let u2 = r2.cross(axis);
        self.inv_i1_r1xn = body_a.world_inverse_inertia() * u1;
        self.inv_i2_r2xn = body_b.world_inverse_inertia() * u2;
        let k_inv =
            self.im1 + self.im2 + u1.dot(self.inv_i1_r1xn) + u2.dot(self.inv_i2_r2xn);
        if k_inv < 1e-12 {
            self.active = false;
            return false;
        }
        self.effective_mass = 1.0 / k_inv;
        self.active = true;
        true
    }

    /// Rebinds the lambda range without touching the cached effective mass.
    /// Friction parts use this every iteration as the normal lambda moves.
    pub fn set_lambda_range(&mut self, min_lambda: f32, max_lambda: f32) {
        self.min_lambda = min_lambda;
        self.max_lambda = max_lambda;
    }

    fn apply_impulse(&self, body_a: &mut Body, body_b: &mut Body, lambda: f32) {
        let impulse = self.axis * lambda;
        body_a.velocity.linear -= impulse * self.im1;
        body_a.velocity.angular -= self.inv_i1_r1xn * lambda;
        body_b.velocity.linear += impulse * self.im2;
        body_b.velocity.angular += self.inv_i2_r2xn * lambda;
    }

    pub fn warm_start(&mut self, body_a: &mut Body, body_b: &mut Body, ratio: f32) {
        self.total_lambda *= ratio;
        if self.active && self.total_lambda != 0.0 {
            self.apply_impulse(body_a, body_b, self.total_lambda);
        }
    }

    fn relative_velocity(&self, body_a: &Body, body_b: &Body) -> f32 {
        self.axis.dot(
            body_a.velocity.point_velocity(self.r1) - body_b.velocity.point_velocity(self.r2),
        )
    }

    /// One velocity iteration driving the relative point velocity along the
    /// axis to `target_velocity`.
    pub fn solve_velocity(
        &mut self,
        body_a: &mut Body,
        body_b: &mut Body,
        target_velocity: f32,
    ) -> bool {
        if !self.active {
            return false;
        }
        let jv = self.relative_velocity(body_a, body_b);
        let lambda = self.effective_mass * (jv - target_velocity);
        let new_total = (self.total_lambda + lambda).clamp(self.min_lambda, self.max_lambda);
        let delta = new_total - self.total_lambda;
        if delta == 0.0 {
            return false;
        }
        self.total_lambda = new_total;
        self.apply_impulse(body_a, body_b, delta);
        true
    }

    /// One position iteration against the violation `c`, measured so that
    /// its time derivative is the relative axis velocity.
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
        let impulse = self.axis * lambda;
        body_a.apply_position_step(
            limits.clamp_linear(-impulse * self.im1),
            limits.clamp_angular(-self.inv_i1_r1xn * lambda),
        );
        body_b.apply_position_step(
            limits.clamp_linear(impulse * self.im2),
            limits.clamp_angular(self.inv_i2_r2xn * lambda),
        );
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

    /// Seeds the accumulated lambda from a cache entry; `warm_start` scales
    /// and applies it.
    pub(crate) fn set_total_lambda(&mut self, lambda: f32) {
        self.total_lambda = lambda;
    }

    pub fn axis(&self) -> Vec3 {
        self.axis
    }
}
