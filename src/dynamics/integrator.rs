//! Explicit Euler integration: gravity and damping into velocities before
//! the solve, velocities into poses inside the per-island solve.

use glam::Vec3;

use crate::core::bodies::Bodies;
use crate::core::body::Body;
use crate::core::types::MotionType;
use crate::utils::math::integrate_quat;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Applies gravity and damping to every awake dynamic body.
pub fn integrate_velocities(bodies: &mut Bodies, gravity: Vec3, dt: f32, parallel: bool) {
    #[cfg(feature = "parallel")]
    if parallel {
        bodies.par_iter_mut().for_each(|body| {
            integrate_body_velocity(body, gravity, dt);
        });
        return;
    }
    let _ = parallel;
    for body in bodies.iter_mut() {
        integrate_body_velocity(body, gravity, dt);
    }
}

fn integrate_body_velocity(body: &mut Body, gravity: Vec3, dt: f32) {
    if body.motion_type != MotionType::Dynamic || body.is_sleeping() {
        return;
    }
    body.velocity.linear += gravity * body.gravity_scale * dt;
    body.velocity.linear *= (1.0 - body.linear_damping * dt).max(0.0);
    body.velocity.angular *= (1.0 - body.angular_damping * dt).max(0.0);
}

/// Advances one body's pose: `x += v·dt`, `q = normalize(Exp(ω·dt)·q)`,
/// honoring the DOF mask. Kinematic bodies follow their prescribed
/// velocity; static bodies are frozen.
pub fn integrate_body_position(body: &mut Body, dt: f32) {
    if body.motion_type == MotionType::Static {
        return;
    }
    let linear = body.dof_mask.mask_translation(body.velocity.linear * dt);
    let angular = body.dof_mask.mask_rotation(body.velocity.angular);
    body.pose.position += linear;
    body.pose.rotation = integrate_quat(body.pose.rotation, angular, dt);
}
