//! Mass-property algebra: inertia tensor composition under translation,
//! rotation, and scaling.
//!
//! All tensors are 3×3 and expressed about the center of mass unless a
//! translation moves the reference point explicitly.

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Mass and inertia tensor data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MassProperties {
    pub mass: f32,
    pub inertia: Mat3,
}

impl Default for MassProperties {
    fn default() -> Self {
        Self {
            mass: 1.0,
            inertia: Mat3::IDENTITY,
        }
    }
}

fn outer(v: Vec3, w: Vec3) -> Mat3 {
    Mat3::from_cols(v * w.x, v * w.y, v * w.z)
}

impl MassProperties {
    pub fn zero() -> Self {
        Self {
            mass: 0.0,
            inertia: Mat3::ZERO,
        }
    }

    /// Solid box of the given full extents: `m = density·x·y·z` with the
    /// diagonal inertia `m/12 · (y²+z², x²+z², x²+y²)`.
    pub fn solid_box(extents: Vec3, density: f32) -> Self {
        let mass = density * extents.x * extents.y * extents.z;
        let factor = mass / 12.0;
        let sq = extents * extents;
        Self {
            mass,
            inertia: Mat3::from_diagonal(Vec3::new(
                factor * (sq.y + sq.z),
                factor * (sq.x + sq.z),
                factor * (sq.x + sq.y),
            )),
        }
    }

    /// Solid sphere: `m = density·4/3·π·r³`, inertia `2/5·m·r²·E`.
    pub fn solid_sphere(radius: f32, density: f32) -> Self {
        let mass = density * 4.0 / 3.0 * std::f32::consts::PI * radius * radius * radius;
        Self {
            mass,
            inertia: Mat3::from_diagonal(Vec3::splat(0.4 * mass * radius * radius)),
        }
    }

    /// Moves the reference point by `t` (parallel-axis theorem):
    /// `I' = I + m·(‖t‖²·E − t·tᵀ)`.
    pub fn translated(&self, t: Vec3) -> Self {
        let shift = Mat3::IDENTITY * t.length_squared() - outer(t, t);
        Self {
            mass: self.mass,
            inertia: self.inertia + shift * self.mass,
        }
    }

    /// Rotates the tensor into a new frame: `I' = R · I · Rᵀ`.
    pub fn rotated(&self, rotation: Quat) -> Self {
        let r = Mat3::from_quat(rotation);
        Self {
            mass: self.mass,
            inertia: r * self.inertia * r.transpose(),
        }
    }

    /// Applies a non-uniform scale. The diagonal is rebuilt from the
    /// per-axis size² contributions `s² = ½·tr(I) − diag(I)`, off-diagonals
    /// scale by `sᵢ·sⱼ`, and mass (and inertia with it) by `|sx·sy·sz|`.
    pub fn scaled(&self, scale: Vec3) -> Self {
        let i = self.inertia;
        let diag = Vec3::new(i.x_axis.x, i.y_axis.y, i.z_axis.z);
        let half_trace = 0.5 * (diag.x + diag.y + diag.z);
        let size_sq = Vec3::splat(half_trace) - diag;
        let scaled_sq = size_sq * scale * scale;

        let new_diag = Vec3::new(
            scaled_sq.y + scaled_sq.z,
            scaled_sq.x + scaled_sq.z,
            scaled_sq.x + scaled_sq.y,
        );
        let mut inertia = Mat3::from_diagonal(new_diag);

        // Off-diagonals, kept symmetric.
        let xy = i.y_axis.x * scale.x * scale.y;
        let xz = i.z_axis.x * scale.x * scale.z;
        let yz = i.z_axis.y * scale.y * scale.z;
        inertia.y_axis.x = xy;
        inertia.x_axis.y = xy;
        inertia.z_axis.x = xz;
        inertia.x_axis.z = xz;
        inertia.z_axis.y = yz;
        inertia.y_axis.z = yz;

        let mass_factor = (scale.x * scale.y * scale.z).abs();
        Self {
            mass: self.mass * mass_factor,
            inertia: inertia * mass_factor,
        }
    }

    /// Rescales to a new total mass, scaling the inertia linearly with it.
    pub fn with_mass(&self, new_mass: f32) -> Self {
        if self.mass.abs() < f32::EPSILON {
            return Self {
                mass: new_mass,
                inertia: self.inertia,
            };
        }
        let factor = new_mass / self.mass;
        Self {
            mass: new_mass,
            inertia: self.inertia * factor,
        }
    }

    /// Accumulates a child's mass properties into a compound: rotate into the
    /// parent frame, translate from the child's COM to the parent reference
    /// point, add.
    pub fn accumulate(&mut self, child: &MassProperties, child_rotation: Quat, child_offset: Vec3) {
        let placed = child.rotated(child_rotation).translated(child_offset);
        self.mass += placed.mass;
        self.inertia += placed.inertia;
    }

    /// World-space inverse inertia for a body at orientation `rotation`:
    /// `R · I⁻¹ · Rᵀ`.
    pub fn world_inverse_inertia(inverse_local: Mat3, rotation: Quat) -> Mat3 {
        let r = Mat3::from_quat(rotation);
        r * inverse_local * r.transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_mat_eq(a: Mat3, b: Mat3, eps: f32) {
        for c in 0..3 {
            let diff = (a.col(c) - b.col(c)).length();
            let scale = a.col(c).length().max(1.0);
            assert!(diff <= eps * scale, "column {c} differs: {} vs {}", a.col(c), b.col(c));
        }
    }

    #[test]
    fn solid_box_matches_closed_form() {
        let props = MassProperties::solid_box(Vec3::new(2.0, 4.0, 6.0), 10.0);
        assert_relative_eq!(props.mass, 480.0, epsilon = 1e-3);
        assert_relative_eq!(props.inertia.x_axis.x, 480.0 / 12.0 * (16.0 + 36.0), epsilon = 1e-2);
    }

    #[test]
    fn rotation_preserves_trace_and_symmetry() {
        let props = MassProperties::solid_box(Vec3::new(1.0, 2.0, 3.0), 1.0);
        let q = Quat::from_euler(glam::EulerRot::XYZ, 0.5, -0.2, 1.3);
        let rotated = props.rotated(q);
        let trace = |m: Mat3| m.x_axis.x + m.y_axis.y + m.z_axis.z;
        assert_relative_eq!(trace(rotated.inertia), trace(props.inertia), epsilon = 1e-3);
        assert_mat_eq(rotated.inertia, rotated.inertia.transpose(), 1e-4);
    }

    #[test]
    fn translation_and_scale_commute() {
        // Scaling a translated tensor lands exactly where translating the
        // scaled tensor by the scaled offset does.
        let props = MassProperties::solid_box(Vec3::new(1.0, 2.0, 0.5), 3.0);
        let t = Vec3::new(0.3, -0.7, 1.1);
        let s = Vec3::new(2.0, 1.5, 1.0);

        let a = props.translated(t).scaled(s);
        let b = props.scaled(s).translated(s * t);
        assert_relative_eq!(a.mass, b.mass, epsilon = 1e-4);
        assert_mat_eq(a.inertia, b.inertia, 1e-2);
    }

    #[test]
    fn with_mass_rescales_linearly() {
        let props = MassProperties::solid_sphere(1.0, 1000.0);
        let rescaled = props.with_mass(props.mass * 2.0);
        assert_mat_eq(rescaled.inertia, props.inertia * 2.0, 1e-3);
    }

    #[test]
    fn uniform_scale_matches_analytic_box() {
        let props = MassProperties::solid_box(Vec3::new(1.0, 2.0, 3.0), 1.0);
        let scaled = props.scaled(Vec3::splat(2.0));
        let direct = MassProperties::solid_box(Vec3::new(2.0, 4.0, 6.0), 1.0);
        // Mass scales by the volume factor, inertia by volume·length².
        assert_relative_eq!(scaled.mass, direct.mass, epsilon = 1e-3);
        assert_mat_eq(scaled.inertia, direct.inertia, 1e-2);
    }
}
