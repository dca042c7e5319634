//! The shape interface the core consumes, plus the reference primitives.
//!
//! The narrowphase proper lives outside the core; what the core needs from a
//! shape is mass-property derivation, the quiescence radius for the sleep
//! machine, and sub-shape resolution for queries dispatched through
//! composite shapes.

pub mod compound;
pub mod subshape;

use std::fmt;
use std::sync::Arc;

use glam::Vec3;

use crate::core::mass::MassProperties;
use crate::error::{PhysicsError, Result};
use subshape::{SubShapeId, SubShapePath};

pub use compound::{Compound, OffsetCenterOfMass, Scaled, Transformed};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_half_extents(half_extents: Vec3) -> Self {
        Self {
            min: -half_extents,
            max: half_extents,
        }
    }

    pub fn merge(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }
}

/// A ray cast over `[0, 1]` of `direction`; `direction` is not normalized.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn point_at(&self, fraction: f32) -> Vec3 {
        self.origin + self.direction * fraction
    }
}

/// A ray intersection, carrying the sub-shape path to the leaf that was hit.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub fraction: f32,
    pub sub_shape: SubShapeId,
}

/// Callback contract shared by the shape queries. Implementations may lower
/// `early_out_fraction` as hits arrive to prune the remaining traversal.
pub trait RayCastCollector {
    fn add_hit(&mut self, hit: RayHit);
    fn add_miss(&mut self) {}
    fn early_out_fraction(&self) -> f32;
    fn should_early_out(&self) -> bool {
        false
    }
}

/// Keeps only the nearest hit and early-outs everything behind it.
#[derive(Debug, Default)]
pub struct ClosestHitCollector {
    pub hit: Option<RayHit>,
}

impl RayCastCollector for ClosestHitCollector {
    fn add_hit(&mut self, hit: RayHit) {
        if self.hit.map_or(true, |best| hit.fraction < best.fraction) {
            self.hit = Some(hit);
        }
    }

    fn early_out_fraction(&self) -> f32 {
        self.hit.map_or(f32::MAX, |h| h.fraction)
    }
}

/// Collects every hit, in traversal order.
#[derive(Debug, Default)]
pub struct AllHitsCollector {
    pub hits: Vec<RayHit>,
}

impl RayCastCollector for AllHitsCollector {
    fn add_hit(&mut self, hit: RayHit) {
        self.hits.push(hit);
    }

    fn early_out_fraction(&self) -> f32 {
        f32::MAX
    }
}

/// Collector for point containment queries.
pub trait PointCollector {
    fn add_hit(&mut self, sub_shape: SubShapeId);
}

impl PointCollector for Vec<SubShapeId> {
    fn add_hit(&mut self, sub_shape: SubShapeId) {
        self.push(sub_shape);
    }
}

/// Geometry interface consumed by the core and by the external narrowphase.
/// Shape-vs-shape sweeps stay with the narrowphase collaborator.
pub trait Shape: fmt::Debug + Send + Sync {
    fn local_aabb(&self) -> Aabb;
    fn volume(&self) -> f32;
    fn mass_properties(&self, density: f32) -> MassProperties;
    /// Radius of the largest sphere that fits inside the shape, used for the
    /// sleep machine's characteristic points.
    fn inner_radius(&self) -> f32;
    fn surface_normal(&self, sub_shape: SubShapeId, local_point: Vec3) -> Vec3;
    /// Convex hull of support points in `local_direction`; empty for shapes
    /// without flat faces.
    fn supporting_face(&self, sub_shape: SubShapeId, local_direction: Vec3) -> Vec<Vec3>;
    fn cast_ray(&self, ray: &Ray, path: SubShapePath, collector: &mut dyn RayCastCollector);
    fn collide_point(&self, point: Vec3, path: SubShapePath, collector: &mut dyn PointCollector);
}

pub type ShapeRef = Arc<dyn Shape>;

/// Solid sphere centered on the origin.
#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    radius: f32,
}

impl Sphere {
    pub fn new(radius: f32) -> Result<Self> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(PhysicsError::InvalidConfiguration(format!(
                "sphere radius must be positive and finite, got {radius}"
            )));
        }
        Ok(Self { radius })
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }
}

impl Shape for Sphere {
    fn local_aabb(&self) -> Aabb {
        Aabb::from_half_extents(Vec3::splat(self.radius))
    }

    fn volume(&self) -> f32 {
        4.0 / 3.0 * std::f32::consts::PI * self.radius.powi(3)
    }

    fn mass_properties(&self, density: f32) -> MassProperties {
        MassProperties::solid_sphere(self.radius, density)
    }

    fn inner_radius(&self) -> f32 {
        self.radius
    }

    fn surface_normal(&self, _sub_shape: SubShapeId, local_point: Vec3) -> Vec3 {
        local_point.normalize_or_zero()
    }

    fn supporting_face(&self, _sub_shape: SubShapeId, _local_direction: Vec3) -> Vec<Vec3> {
        Vec::new()
    }

    fn cast_ray(&self, ray: &Ray, path: SubShapePath, collector: &mut dyn RayCastCollector) {
        // Solve |o + t·d|² = r².
        let a = ray.direction.length_squared();
        if a < 1e-12 {
            collector.add_miss();
            return;
        }
        let b = 2.0 * ray.origin.dot(ray.direction);
        let c = ray.origin.length_squared() - self.radius * self.radius;
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            collector.add_miss();
            return;
        }
        let t = (-b - disc.sqrt()) / (2.0 * a);
        if (0.0..=1.0).contains(&t) && t < collector.early_out_fraction() {
            collector.add_hit(RayHit {
                fraction: t,
                sub_shape: path.id(),
            });
        } else {
            collector.add_miss();
        }
    }

    fn collide_point(&self, point: Vec3, path: SubShapePath, collector: &mut dyn PointCollector) {
        if point.length_squared() <= self.radius * self.radius {
            collector.add_hit(path.id());
        }
    }
}

/// Solid box centered on the origin.
#[derive(Debug, Clone, Copy)]
pub struct BoxShape {
    half_extents: Vec3,
}

impl BoxShape {
    pub fn new(half_extents: Vec3) -> Result<Self> {
        if !half_extents.is_finite() || half_extents.min_element() <= 0.0 {
            return Err(PhysicsError::InvalidConfiguration(format!(
                "box half extents must be positive and finite, got {half_extents}"
            )));
        }
        Ok(Self { half_extents })
    }

    pub fn half_extents(&self) -> Vec3 {
        self.half_extents
    }
}

impl Shape for BoxShape {
    fn local_aabb(&self) -> Aabb {
        Aabb::from_half_extents(self.half_extents)
    }

    fn volume(&self) -> f32 {
        8.0 * self.half_extents.x * self.half_extents.y * self.half_extents.z
    }

    fn mass_properties(&self, density: f32) -> MassProperties {
        MassProperties::solid_box(self.half_extents * 2.0, density)
    }

    fn inner_radius(&self) -> f32 {
        self.half_extents.min_element()
    }

    fn surface_normal(&self, _sub_shape: SubShapeId, local_point: Vec3) -> Vec3 {
        // Face whose plane the point is closest to.
        let d = (local_point.abs() - self.half_extents).abs();
        if d.x <= d.y && d.x <= d.z {
            Vec3::new(local_point.x.signum(), 0.0, 0.0)
        } else if d.y <= d.z {
            Vec3::new(0.0, local_point.y.signum(), 0.0)
        } else {
            Vec3::new(0.0, 0.0, local_point.z.signum())
        }
    }

    fn supporting_face(&self, _sub_shape: SubShapeId, local_direction: Vec3) -> Vec<Vec3> {
        let h = self.half_extents;
        let a = local_direction.abs();
        let (axis, sign) = if a.x >= a.y && a.x >= a.z {
            (0, local_direction.x.signum())
        } else if a.y >= a.z {
            (1, local_direction.y.signum())
        } else {
            (2, local_direction.z.signum())
        };
        let mut face = Vec::with_capacity(4);
        for (u, v) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let corner = match axis {
                0 => Vec3::new(sign * h.x, u * h.y, v * h.z),
                1 => Vec3::new(u * h.x, sign * h.y, v * h.z),
                _ => Vec3::new(u * h.x, v * h.y, sign * h.z),
            };
            face.push(corner);
        }
        face
    }

    fn cast_ray(&self, ray: &Ray, path: SubShapePath, collector: &mut dyn RayCastCollector) {
        // Slab test.
        let mut t_min = 0.0_f32;
        let mut t_max = 1.0_f32;
        for axis in 0..3 {
            let o = ray.origin[axis];
            let d = ray.direction[axis];
            let h = self.half_extents[axis];
            if d.abs() < 1e-12 {
                if o.abs() > h {
                    collector.add_miss();
                    return;
                }
                continue;
            }
            let inv = 1.0 / d;
            let (t0, t1) = {
                let a = (-h - o) * inv;
                let b = (h - o) * inv;
                if a < b {
                    (a, b)
                } else {
                    (b, a)
                }
            };
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                collector.add_miss();
                return;
            }
        }
        if t_min < collector.early_out_fraction() {
            collector.add_hit(RayHit {
                fraction: t_min,
                sub_shape: path.id(),
            });
        } else {
            collector.add_miss();
        }
    }

    fn collide_point(&self, point: Vec3, path: SubShapePath, collector: &mut dyn PointCollector) {
        if point.abs().cmple(self.half_extents).all() {
            collector.add_hit(path.id());
        }
    }
}

/// The solid region below a plane through the origin. Static bodies only.
#[derive(Debug, Clone, Copy)]
pub struct HalfSpace {
    normal: Vec3,
}

impl HalfSpace {
    pub fn new(normal: Vec3) -> Result<Self> {
        if !normal.is_finite() || normal.length_squared() < 1e-12 {
            return Err(PhysicsError::InvalidConfiguration(
                "half-space normal must be non-zero and finite".to_string(),
            ));
        }
        Ok(Self {
            normal: normal.normalize(),
        })
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }
}

impl Shape for HalfSpace {
    fn local_aabb(&self) -> Aabb {
        Aabb::from_half_extents(Vec3::splat(f32::MAX * 0.5))
    }

    fn volume(&self) -> f32 {
        0.0
    }

    fn mass_properties(&self, _density: f32) -> MassProperties {
        MassProperties::zero()
    }

    fn inner_radius(&self) -> f32 {
        0.0
    }

    fn surface_normal(&self, _sub_shape: SubShapeId, _local_point: Vec3) -> Vec3 {
        self.normal
    }

    fn supporting_face(&self, _sub_shape: SubShapeId, _local_direction: Vec3) -> Vec<Vec3> {
        Vec::new()
    }

    fn cast_ray(&self, ray: &Ray, path: SubShapePath, collector: &mut dyn RayCastCollector) {
        let denom = ray.direction.dot(self.normal);
        let dist = ray.origin.dot(self.normal);
        if denom.abs() < 1e-12 {
            if dist <= 0.0 {
                collector.add_hit(RayHit {
                    fraction: 0.0,
                    sub_shape: path.id(),
                });
            } else {
                collector.add_miss();
            }
            return;
        }
        let t = -dist / denom;
        let t = if dist <= 0.0 { 0.0 } else { t };
        if (0.0..=1.0).contains(&t) && t < collector.early_out_fraction() {
            collector.add_hit(RayHit {
                fraction: t,
                sub_shape: path.id(),
            });
        } else {
            collector.add_miss();
        }
    }

    fn collide_point(&self, point: Vec3, path: SubShapePath, collector: &mut dyn PointCollector) {
        if point.dot(self.normal) <= 0.0 {
            collector.add_hit(path.id());
        }
    }
}
