//! Contact constraints lifted from manifolds: per point one non-penetration
//! part and two friction parts whose budget is re-derived from the normal
//! impulse every iteration.

use glam::Vec3;

use crate::collision::contact::{CachedContactPoint, ContactCache, ContactManifold};
use crate::constraint::part::{AxisPart, CorrectionLimits};
use crate::core::bodies::BodyId;
use crate::core::body::Body;
use crate::core::types::Material;
use crate::utils::math::tangent_basis;

#[derive(Debug, Clone)]
struct ContactPointConstraint {
    feature_id: u32,
    r1_local: Vec3,
    r2_local: Vec3,
    penetration: f32,
    /// Part-space velocity target; non-zero only when restitution fires.
    restitution_target: f32,
    normal: AxisPart,
    friction: [AxisPart; 2],
}

/// Solver-side constraint for one contact manifold.
#[derive(Debug, Clone)]
pub struct ContactConstraint {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Manifold normal, pointing from B towards A.
    normal: Vec3,
    friction: f32,
    points: Vec<ContactPointConstraint>,
}

impl ContactConstraint {
    /// Builds the constraint at the current poses, seeding accumulated
    /// impulses from the cache where feature ids match last frame.
    pub fn new(
        manifold: &ContactManifold,
        body_a: &Body,
        body_b: &Body,
        cache: &ContactCache,
        restitution_threshold: f32,
    ) -> Self {
        let material = Material::combine(&body_a.material, &body_b.material);
        let normal = manifold.normal;
        // The part axis points A→B so a positive (clamped) lambda pushes the
        // bodies apart.
        let part_axis = -normal;
        let (t1, t2) = tangent_basis(normal);

        let mut points = Vec::with_capacity(manifold.points.len());
        for point in &manifold.points {
            let r1 = point.position - body_a.pose.position;
            let r2 = point.position - body_b.pose.position;

            let mut normal_part = AxisPart::new();
            normal_part.setup(body_a, body_b, r1, r2, part_axis, 0.0, f32::INFINITY);

            let mut friction_parts = [AxisPart::new(), AxisPart::new()];
            friction_parts[0].setup(body_a, body_b, r1, r2, t1, 0.0, 0.0);
            friction_parts[1].setup(body_a, body_b, r1, r2, t2, 0.0, 0.0);

            if let Some(cached) = cache.lookup(body_a.id, body_b.id, point.feature_id) {
                normal_part.set_total_lambda(cached.normal_lambda);
                friction_parts[0].set_total_lambda(cached.friction_lambda[0]);
                friction_parts[1].set_total_lambda(cached.friction_lambda[1]);
            }

            // Pre-step separation rate along the manifold normal; bounce only
            // above the threshold.
            let vn = normal.dot(
                body_a.velocity.point_velocity(r1) - body_b.velocity.point_velocity(r2),
            );
            let restitution_target = if vn < -restitution_threshold {
                material.restitution * vn
            } else {
                0.0
            };

            points.push(ContactPointConstraint {
                feature_id: point.feature_id,
                r1_local: body_a.pose.rotation.inverse() * r1,
                r2_local: body_b.pose.rotation.inverse() * r2,
                penetration: point.penetration,
                restitution_target,
                normal: normal_part,
                friction: friction_parts,
            });
        }

        Self {
            body_a: body_a.id,
            body_b: body_b.id,
            normal,
            friction: material.friction,
            points,
        }
    }

    pub fn warm_start(&mut self, body_a: &mut Body, body_b: &mut Body, ratio: f32) {
        for point in &mut self.points {
            point.normal.warm_start(body_a, body_b, ratio);
            // Friction ranges start at zero; open them up to the warmed
            // normal impulse before re-applying tangential lambdas.
            let budget = self.friction * point.normal.total_lambda().max(0.0);
            for part in &mut point.friction {
                part.set_lambda_range(-budget, budget);
                part.warm_start(body_a, body_b, ratio);
            }
        }
    }

    /// One Gauss-Seidel iteration: all normal parts first, then the friction
    /// parts clamped against the just-updated normal lambdas.
    pub fn solve_velocity(&mut self, body_a: &mut Body, body_b: &mut Body) -> bool {
        let mut applied = false;
        for point in &mut self.points {
            applied |= point
                .normal
                .solve_velocity(body_a, body_b, point.restitution_target);
        }
        for point in &mut self.points {
            let budget = self.friction * point.normal.total_lambda().max(0.0);
            for part in &mut point.friction {
                part.set_lambda_range(-budget, budget);
                applied |= part.solve_velocity(body_a, body_b, 0.0);
            }
        }
        applied
    }

    /// One position iteration applying Baumgarte to `max(pen − slop, 0)`,
    /// with the penetration re-derived from the stored local anchors.
    pub fn solve_position(
        &mut self,
        body_a: &mut Body,
        body_b: &mut Body,
        baumgarte: f32,
        slop: f32,
        limits: &CorrectionLimits,
    ) -> bool {
        let mut applied = false;
        for point in &mut self.points {
            let p1 = body_a.pose.local_to_world(point.r1_local);
            let p2 = body_b.pose.local_to_world(point.r2_local);
            let penetration = point.penetration - self.normal.dot(p1 - p2);
            let c = (penetration - slop).max(0.0);
            if c > 0.0 {
                applied |= point.normal.solve_position(body_a, body_b, c, baumgarte, limits);
            }
        }
        applied
    }

    /// Accumulated impulses for the persistent cache.
    pub fn cached_points(&self) -> Vec<CachedContactPoint> {
        self.points
            .iter()
            .map(|p| CachedContactPoint {
                feature_id: p.feature_id,
                normal_lambda: p.normal.total_lambda(),
                friction_lambda: [p.friction[0].total_lambda(), p.friction[1].total_lambda()],
            })
            .collect()
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Largest `|λ_t|/λ_n` ratio across points and tangents; stays within
    /// the friction coefficient up to one iteration's slack.
    pub fn max_friction_ratio(&self) -> f32 {
        let mut ratio = 0.0_f32;
        for point in &self.points {
            let normal = point.normal.total_lambda();
            if normal > 1e-6 {
                for part in &point.friction {
                    ratio = ratio.max(part.total_lambda().abs() / normal);
                }
            }
        }
        ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::contact::{CachedContactPoint, ContactManifold, ManifoldPoint};
    use crate::core::body::BodySettings;
    use crate::core::types::{Material, MotionType};
    use crate::shape::subshape::SubShapeId;
    use crate::shape::{compound::shared, HalfSpace, Sphere};
    use crate::world::build_body;
    use glam::Vec3;

    fn sliding_pair() -> (crate::core::body::Body, crate::core::body::Body) {
        let material = Material {
            friction: 0.4,
            restitution: 0.0,
        };
        let mut sphere = build_body(
            &BodySettings::new(shared(Sphere::new(0.5).unwrap()))
                .position(Vec3::new(0.0, 0.49, 0.0))
                .velocity(Vec3::new(2.0, -0.5, 0.0), Vec3::ZERO)
                .material(material),
        );
        sphere.id = crate::core::bodies::BodyId::new(0, 1);
        let mut plane = build_body(
            &BodySettings::new(shared(HalfSpace::new(Vec3::Y).unwrap()))
                .motion_type(MotionType::Static)
                .material(material),
        );
        plane.id = crate::core::bodies::BodyId::new(1, 1);
        (sphere, plane)
    }

    fn manifold(
        sphere: &crate::core::body::Body,
        plane: &crate::core::body::Body,
    ) -> ContactManifold {
        ContactManifold {
            body_a: sphere.id,
            body_b: plane.id,
            normal: Vec3::Y,
            points: vec![ManifoldPoint {
                position: Vec3::new(sphere.pose.position.x, 0.0, sphere.pose.position.z),
                penetration: 0.01,
                feature_id: 0,
            }],
            sub_shape_a: SubShapeId::EMPTY,
            sub_shape_b: SubShapeId::EMPTY,
        }
    }

    #[test]
    fn friction_stays_within_the_coulomb_budget() {
        let (mut sphere, mut plane) = sliding_pair();
        let cache = ContactCache::new();
        let mut contact =
            ContactConstraint::new(&manifold(&sphere, &plane), &sphere, &plane, &cache, 1.0);

        for _ in 0..8 {
            contact.solve_velocity(&mut sphere, &mut plane);
        }

        assert!(
            contact.max_friction_ratio() <= 0.4 + 1e-4,
            "friction impulse exceeded μ·λn, ratio = {}",
            contact.max_friction_ratio()
        );
        // Penetrating approach is gone, sliding has slowed but not reversed.
        assert!(sphere.velocity.linear.y > -1e-4);
        assert!(sphere.velocity.linear.x > 0.0);
        assert!(sphere.velocity.linear.x < 2.0);
    }

    #[test]
    fn warm_start_reapplies_cached_impulses() {
        let (mut sphere, mut plane) = sliding_pair();
        let mut cache = ContactCache::new();
        cache.begin_frame();
        cache.store(
            sphere.id,
            plane.id,
            vec![CachedContactPoint {
                feature_id: 0,
                normal_lambda: 3.0,
                friction_lambda: [0.5, 0.0],
            }],
        );

        let mut contact =
            ContactConstraint::new(&manifold(&sphere, &plane), &sphere, &plane, &cache, 1.0);
        let vy_before = sphere.velocity.linear.y;
        contact.warm_start(&mut sphere, &mut plane, 1.0);
        assert!(
            sphere.velocity.linear.y > vy_before,
            "cached normal impulse should push the sphere out"
        );

        // Ratio zero drops the cache entirely.
        let (mut sphere2, mut plane2) = sliding_pair();
        let mut contact2 =
            ContactConstraint::new(&manifold(&sphere2, &plane2), &sphere2, &plane2, &cache, 1.0);
        let v_before = sphere2.velocity.linear;
        contact2.warm_start(&mut sphere2, &mut plane2, 0.0);
        assert_eq!(sphere2.velocity.linear, v_before);
    }
}
