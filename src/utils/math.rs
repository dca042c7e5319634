//! Additional math helpers layered on top of `glam`.

use glam::{Mat3, Quat, Vec3};

/// Builds the skew-symmetric cross-product matrix `[v]×` such that
/// `skew(v) * u == v.cross(u)`.
pub fn skew(v: Vec3) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(0.0, v.z, -v.y),
        Vec3::new(-v.z, 0.0, v.x),
        Vec3::new(v.y, -v.x, 0.0),
    )
}

/// Converts an angular step (radians, axis scaled by angle) into a delta
/// quaternion via the exponential map. Falls back to the first-order
/// expansion for small angles to avoid `sin(0)/0`.
pub fn quat_exp(theta: Vec3) -> Quat {
    let angle = theta.length();
    if angle < 1e-6 {
        Quat::from_xyzw(theta.x * 0.5, theta.y * 0.5, theta.z * 0.5, 1.0).normalize()
    } else {
        Quat::from_axis_angle(theta / angle, angle)
    }
}

/// Integrates a unit quaternion by an angular velocity over `dt`:
/// `normalize(Exp(ω·dt) · q)`.
pub fn integrate_quat(q: Quat, angular: Vec3, dt: f32) -> Quat {
    let step = angular * dt;
    if step.length_squared() < 1e-14 {
        return q;
    }
    (quat_exp(step) * q).normalize()
}

/// Returns two unit vectors spanning the plane orthogonal to `normal`.
/// `normal` must be unit length.
pub fn tangent_basis(normal: Vec3) -> (Vec3, Vec3) {
    let t1 = if normal.x.abs() > 0.9 {
        normal.cross(Vec3::Y)
    } else {
        normal.cross(Vec3::X)
    }
    .normalize();
    let t2 = normal.cross(t1);
    (t1, t2)
}

/// Decomposes `q` into twist about the unit `axis` and the remaining swing,
/// with `q == swing * twist`.
pub fn swing_twist(q: Quat, axis: Vec3) -> (Quat, Quat) {
    let r = Vec3::new(q.x, q.y, q.z);
    let proj = axis * r.dot(axis);
    let twist = Quat::from_xyzw(proj.x, proj.y, proj.z, q.w);
    let twist = if twist.length_squared() < 1e-12 {
        Quat::IDENTITY
    } else {
        twist.normalize()
    };
    let swing = q * twist.inverse();
    (swing.normalize(), twist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn skew_matches_cross_product() {
        let v = Vec3::new(1.0, -2.0, 3.0);
        let u = Vec3::new(-0.5, 4.0, 2.0);
        assert!((skew(v) * u - v.cross(u)).length() < 1e-5);
    }

    #[test]
    fn quat_exp_small_angle_is_stable() {
        let q = quat_exp(Vec3::new(1e-9, 0.0, 0.0));
        assert!(q.is_normalized());
        assert_relative_eq!(q.w, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn swing_twist_recomposes() {
        let q = Quat::from_euler(glam::EulerRot::XYZ, 0.4, 0.8, -0.3);
        let (swing, twist) = swing_twist(q, Vec3::X);
        let back = swing * twist;
        assert!(back.dot(q).abs() > 1.0 - 1e-5);
        // Twist is a rotation purely about the axis.
        assert_relative_eq!(twist.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(twist.z, 0.0, epsilon = 1e-6);
    }
}
