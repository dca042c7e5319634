//! Test-side narrowphase: a [`ContactProvider`] producing manifolds for the
//! few shape pairings the scenarios need. The engine core treats collision
//! detection as an external collaborator, so the tests supply one.

use glam::Vec3;
use kinetica::core::bodies::Bodies;
use kinetica::{BodyId, ContactManifold, ContactProvider, ManifoldPoint, SubShapeId};

#[derive(Debug, Clone, Copy)]
pub enum TestCollider {
    Sphere { radius: f32 },
    /// Solid half-space below a plane through the body origin with the
    /// given normal.
    HalfSpace { normal: Vec3 },
    BoxShape { half_extents: Vec3 },
}

/// Brute-force pair provider over a registered collider list.
#[derive(Debug, Default)]
pub struct TestContactProvider {
    colliders: Vec<(BodyId, TestCollider)>,
}

impl TestContactProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, body: BodyId, collider: TestCollider) {
        self.colliders.push((body, collider));
    }
}

impl ContactProvider for TestContactProvider {
    fn collect(&mut self, bodies: &Bodies, sink: &mut dyn FnMut(ContactManifold)) {
        for i in 0..self.colliders.len() {
            for j in (i + 1)..self.colliders.len() {
                let (id_a, col_a) = self.colliders[i];
                let (id_b, col_b) = self.colliders[j];
                let (Some(body_a), Some(body_b)) = (bodies.get(id_a), bodies.get(id_b)) else {
                    continue;
                };
                let manifold = match (col_a, col_b) {
                    (TestCollider::Sphere { radius }, TestCollider::HalfSpace { normal }) => {
                        sphere_halfspace(id_a, id_b, body_a.pose.position, radius, body_b.pose.position, normal)
                    }
                    (TestCollider::HalfSpace { normal }, TestCollider::Sphere { radius }) => {
                        sphere_halfspace(id_b, id_a, body_b.pose.position, radius, body_a.pose.position, normal)
                    }
                    (TestCollider::Sphere { radius: ra }, TestCollider::Sphere { radius: rb }) => {
                        sphere_sphere(id_a, id_b, body_a.pose.position, ra, body_b.pose.position, rb)
                    }
                    (TestCollider::BoxShape { half_extents }, TestCollider::HalfSpace { normal }) => {
                        box_halfspace(id_a, id_b, body_a, half_extents, body_b.pose.position, normal)
                    }
                    (TestCollider::HalfSpace { normal }, TestCollider::BoxShape { half_extents }) => {
                        box_halfspace(id_b, id_a, body_b, half_extents, body_a.pose.position, normal)
                    }
                    _ => None,
                };
                if let Some(manifold) = manifold {
                    sink(manifold);
                }
            }
        }
    }
}

fn sphere_halfspace(
    sphere_id: BodyId,
    plane_id: BodyId,
    center: Vec3,
    radius: f32,
    plane_origin: Vec3,
    normal: Vec3,
) -> Option<ContactManifold> {
    let distance = normal.dot(center - plane_origin);
    let penetration = radius - distance;
    if penetration < 0.0 {
        return None;
    }
    Some(ContactManifold {
        body_a: sphere_id,
        body_b: plane_id,
        normal,
        points: vec![ManifoldPoint {
            position: center - normal * distance,
            penetration,
            feature_id: 0,
        }],
        sub_shape_a: SubShapeId::EMPTY,
        sub_shape_b: SubShapeId::EMPTY,
    })
}

fn sphere_sphere(
    id_a: BodyId,
    id_b: BodyId,
    center_a: Vec3,
    radius_a: f32,
    center_b: Vec3,
    radius_b: f32,
) -> Option<ContactManifold> {
    let delta = center_a - center_b;
    let distance = delta.length();
    let penetration = radius_a + radius_b - distance;
    if penetration < 0.0 || distance < 1e-6 {
        return None;
    }
    let normal = delta / distance;
    Some(ContactManifold {
        body_a: id_a,
        body_b: id_b,
        normal,
        points: vec![ManifoldPoint {
            position: center_b + normal * (radius_b - penetration * 0.5),
            penetration,
            feature_id: 0,
        }],
        sub_shape_a: SubShapeId::EMPTY,
        sub_shape_b: SubShapeId::EMPTY,
    })
}

fn box_halfspace(
    box_id: BodyId,
    plane_id: BodyId,
    body: &kinetica::Body,
    half_extents: Vec3,
    plane_origin: Vec3,
    normal: Vec3,
) -> Option<ContactManifold> {
    let mut points = Vec::new();
    for corner in 0..8u32 {
        let local = Vec3::new(
            if corner & 1 == 0 { -half_extents.x } else { half_extents.x },
            if corner & 2 == 0 { -half_extents.y } else { half_extents.y },
            if corner & 4 == 0 { -half_extents.z } else { half_extents.z },
        );
        let world = body.pose.local_to_world(local);
        let penetration = -normal.dot(world - plane_origin);
        if penetration >= 0.0 {
            points.push(ManifoldPoint {
                position: world,
                penetration,
                feature_id: corner,
            });
        }
    }
    if points.is_empty() {
        return None;
    }
    points.sort_by(|a, b| b.penetration.total_cmp(&a.penetration));
    points.truncate(4);
    Some(ContactManifold {
        body_a: box_id,
        body_b: plane_id,
        normal,
        points,
        sub_shape_a: SubShapeId::EMPTY,
        sub_shape_b: SubShapeId::EMPTY,
    })
}
