//! Composite shapes: the compound container and the decorator shapes that
//! wrap a single child while adjusting its frame, scale, or mass reference.
//!
//! Decorators consume zero sub-shape bits; the compound consumes the bit
//! width of its child count while dispatching queries, so hits can be
//! resolved back to leaves with [`SubShapeId::pop`].

use std::sync::Arc;

use glam::{Quat, Vec3};

use crate::core::mass::MassProperties;
use crate::error::{PhysicsError, Result};

use super::subshape::{SubShapeId, SubShapePath};
use super::{Aabb, PointCollector, Ray, RayCastCollector, Shape, ShapeRef};

#[derive(Debug, Clone)]
pub struct CompoundChild {
    pub shape: ShapeRef,
    pub position: Vec3,
    pub rotation: Quat,
}

/// A fixed collection of child shapes, each placed by a local transform.
#[derive(Debug, Clone)]
pub struct Compound {
    children: Vec<CompoundChild>,
}

impl Compound {
    pub fn new(children: Vec<CompoundChild>) -> Result<Self> {
        if children.is_empty() {
            return Err(PhysicsError::InvalidConfiguration(
                "compound shape needs at least one child".to_string(),
            ));
        }
        Ok(Self { children })
    }

    pub fn children(&self) -> &[CompoundChild] {
        &self.children
    }

    fn child_count(&self) -> u32 {
        self.children.len() as u32
    }
}

impl Shape for Compound {
    fn local_aabb(&self) -> Aabb {
        let mut bounds: Option<Aabb> = None;
        for child in &self.children {
            let child_aabb = child.shape.local_aabb();
            // Conservative: rotate the eight corners into the parent frame.
            let mut placed = Aabb::new(Vec3::splat(f32::MAX), Vec3::splat(f32::MIN));
            for i in 0..8 {
                let corner = Vec3::new(
                    if i & 1 == 0 { child_aabb.min.x } else { child_aabb.max.x },
                    if i & 2 == 0 { child_aabb.min.y } else { child_aabb.max.y },
                    if i & 4 == 0 { child_aabb.min.z } else { child_aabb.max.z },
                );
                placed.include(child.position + child.rotation * corner);
            }
            bounds = Some(match bounds {
                Some(b) => b.merge(&placed),
                None => placed,
            });
        }
        bounds.unwrap_or(Aabb::new(Vec3::ZERO, Vec3::ZERO))
    }

    fn volume(&self) -> f32 {
        self.children.iter().map(|c| c.shape.volume()).sum()
    }

    fn mass_properties(&self, density: f32) -> MassProperties {
        let mut total = MassProperties::zero();
        for child in &self.children {
            let props = child.shape.mass_properties(density);
            total.accumulate(&props, child.rotation, child.position);
        }
        total
    }

    fn inner_radius(&self) -> f32 {
        self.children
            .iter()
            .map(|c| c.shape.inner_radius())
            .fold(f32::MAX, f32::min)
    }

    fn surface_normal(&self, sub_shape: SubShapeId, local_point: Vec3) -> Vec3 {
        let (index, rest) = sub_shape.pop(self.child_count());
        let Some(child) = self.children.get(index as usize) else {
            return Vec3::ZERO;
        };
        let child_point = child.rotation.inverse() * (local_point - child.position);
        child.rotation * child.shape.surface_normal(rest, child_point)
    }

    fn supporting_face(&self, sub_shape: SubShapeId, local_direction: Vec3) -> Vec<Vec3> {
        let (index, rest) = sub_shape.pop(self.child_count());
        let Some(child) = self.children.get(index as usize) else {
            return Vec::new();
        };
        let child_dir = child.rotation.inverse() * local_direction;
        child
            .shape
            .supporting_face(rest, child_dir)
            .into_iter()
            .map(|v| child.position + child.rotation * v)
            .collect()
    }

    fn cast_ray(&self, ray: &Ray, path: SubShapePath, collector: &mut dyn RayCastCollector) {
        let count = self.child_count();
        for (index, child) in self.children.iter().enumerate() {
            if collector.should_early_out() {
                return;
            }
            let child_path = match path.push(index as u32, count) {
                Ok(p) => p,
                Err(_) => {
                    collector.add_miss();
                    continue;
                }
            };
            let inv_rot = child.rotation.inverse();
            let child_ray = Ray {
                origin: inv_rot * (ray.origin - child.position),
                direction: inv_rot * ray.direction,
            };
            child.shape.cast_ray(&child_ray, child_path, collector);
        }
    }

    fn collide_point(&self, point: Vec3, path: SubShapePath, collector: &mut dyn PointCollector) {
        let count = self.child_count();
        for (index, child) in self.children.iter().enumerate() {
            let Ok(child_path) = path.push(index as u32, count) else {
                continue;
            };
            let child_point = child.rotation.inverse() * (point - child.position);
            child.shape.collide_point(child_point, child_path, collector);
        }
    }
}

/// Re-frames a child shape by a local position and rotation.
#[derive(Debug, Clone)]
pub struct Transformed {
    inner: ShapeRef,
    position: Vec3,
    rotation: Quat,
}

impl Transformed {
    pub fn new(inner: ShapeRef, position: Vec3, rotation: Quat) -> Self {
        Self {
            inner,
            position,
            rotation: rotation.normalize(),
        }
    }
}

impl Shape for Transformed {
    fn local_aabb(&self) -> Aabb {
        let inner = self.inner.local_aabb();
        let mut placed = Aabb::new(Vec3::splat(f32::MAX), Vec3::splat(f32::MIN));
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { inner.min.x } else { inner.max.x },
                if i & 2 == 0 { inner.min.y } else { inner.max.y },
                if i & 4 == 0 { inner.min.z } else { inner.max.z },
            );
            placed.include(self.position + self.rotation * corner);
        }
        placed
    }

    fn volume(&self) -> f32 {
        self.inner.volume()
    }

    fn mass_properties(&self, density: f32) -> MassProperties {
        self.inner
            .mass_properties(density)
            .rotated(self.rotation)
            .translated(self.position)
    }

    fn inner_radius(&self) -> f32 {
        self.inner.inner_radius()
    }

    fn surface_normal(&self, sub_shape: SubShapeId, local_point: Vec3) -> Vec3 {
        let inner_point = self.rotation.inverse() * (local_point - self.position);
        self.rotation * self.inner.surface_normal(sub_shape, inner_point)
    }

    fn supporting_face(&self, sub_shape: SubShapeId, local_direction: Vec3) -> Vec<Vec3> {
        let inner_dir = self.rotation.inverse() * local_direction;
        self.inner
            .supporting_face(sub_shape, inner_dir)
            .into_iter()
            .map(|v| self.position + self.rotation * v)
            .collect()
    }

    fn cast_ray(&self, ray: &Ray, path: SubShapePath, collector: &mut dyn RayCastCollector) {
        let inv_rot = self.rotation.inverse();
        let inner_ray = Ray {
            origin: inv_rot * (ray.origin - self.position),
            direction: inv_rot * ray.direction,
        };
        self.inner.cast_ray(&inner_ray, path, collector);
    }

    fn collide_point(&self, point: Vec3, path: SubShapePath, collector: &mut dyn PointCollector) {
        let inner_point = self.rotation.inverse() * (point - self.position);
        self.inner.collide_point(inner_point, path, collector);
    }
}

/// Applies a per-axis scale to a child shape.
#[derive(Debug, Clone)]
pub struct Scaled {
    inner: ShapeRef,
    scale: Vec3,
}

impl Scaled {
    pub fn new(inner: ShapeRef, scale: Vec3) -> Result<Self> {
        if !scale.is_finite() || scale.abs().min_element() < 1e-6 {
            return Err(PhysicsError::InvalidConfiguration(format!(
                "scale components must be finite and non-zero, got {scale}"
            )));
        }
        Ok(Self { inner, scale })
    }
}

impl Shape for Scaled {
    fn local_aabb(&self) -> Aabb {
        let inner = self.inner.local_aabb();
        let a = inner.min * self.scale;
        let b = inner.max * self.scale;
        Aabb::new(a.min(b), a.max(b))
    }

    fn volume(&self) -> f32 {
        self.inner.volume() * (self.scale.x * self.scale.y * self.scale.z).abs()
    }

    fn mass_properties(&self, density: f32) -> MassProperties {
        self.inner.mass_properties(density).scaled(self.scale)
    }

    fn inner_radius(&self) -> f32 {
        self.inner.inner_radius() * self.scale.abs().min_element()
    }

    fn surface_normal(&self, sub_shape: SubShapeId, local_point: Vec3) -> Vec3 {
        let inner_normal = self
            .inner
            .surface_normal(sub_shape, local_point / self.scale);
        (inner_normal / self.scale).normalize_or_zero()
    }

    fn supporting_face(&self, sub_shape: SubShapeId, local_direction: Vec3) -> Vec<Vec3> {
        let inner_dir = local_direction * self.scale;
        self.inner
            .supporting_face(sub_shape, inner_dir)
            .into_iter()
            .map(|v| v * self.scale)
            .collect()
    }

    fn cast_ray(&self, ray: &Ray, path: SubShapePath, collector: &mut dyn RayCastCollector) {
        let inner_ray = Ray {
            origin: ray.origin / self.scale,
            direction: ray.direction / self.scale,
        };
        self.inner.cast_ray(&inner_ray, path, collector);
    }

    fn collide_point(&self, point: Vec3, path: SubShapePath, collector: &mut dyn PointCollector) {
        self.inner.collide_point(point / self.scale, path, collector);
    }
}

/// Shifts where the child's mass is considered to sit without moving its
/// geometry.
#[derive(Debug, Clone)]
pub struct OffsetCenterOfMass {
    inner: ShapeRef,
    offset: Vec3,
}

impl OffsetCenterOfMass {
    pub fn new(inner: ShapeRef, offset: Vec3) -> Self {
        Self { inner, offset }
    }
}

impl Shape for OffsetCenterOfMass {
    fn local_aabb(&self) -> Aabb {
        self.inner.local_aabb()
    }

    fn volume(&self) -> f32 {
        self.inner.volume()
    }

    fn mass_properties(&self, density: f32) -> MassProperties {
        self.inner.mass_properties(density).translated(self.offset)
    }

    fn inner_radius(&self) -> f32 {
        self.inner.inner_radius()
    }

    fn surface_normal(&self, sub_shape: SubShapeId, local_point: Vec3) -> Vec3 {
        self.inner.surface_normal(sub_shape, local_point)
    }

    fn supporting_face(&self, sub_shape: SubShapeId, local_direction: Vec3) -> Vec<Vec3> {
        self.inner.supporting_face(sub_shape, local_direction)
    }

    fn cast_ray(&self, ray: &Ray, path: SubShapePath, collector: &mut dyn RayCastCollector) {
        self.inner.cast_ray(ray, path, collector);
    }

    fn collide_point(&self, point: Vec3, path: SubShapePath, collector: &mut dyn PointCollector) {
        self.inner.collide_point(point, path, collector);
    }
}

/// Builds an `Arc`-shared shape handle. Leaves may be shared across bodies.
pub fn shared<S: Shape + 'static>(shape: S) -> ShapeRef {
    Arc::new(shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{ClosestHitCollector, Sphere};

    fn two_sphere_compound() -> Compound {
        let leaf = shared(Sphere::new(0.5).unwrap());
        Compound::new(vec![
            CompoundChild {
                shape: leaf.clone(),
                position: Vec3::new(-1.0, 0.0, 0.0),
                rotation: Quat::IDENTITY,
            },
            CompoundChild {
                shape: leaf,
                position: Vec3::new(1.0, 0.0, 0.0),
                rotation: Quat::IDENTITY,
            },
        ])
        .unwrap()
    }

    #[test]
    fn compound_ray_hits_resolve_to_child() {
        let compound = two_sphere_compound();
        let ray = Ray::new(Vec3::new(1.0, 5.0, 0.0), Vec3::new(0.0, -10.0, 0.0));
        let mut collector = ClosestHitCollector::default();
        compound.cast_ray(&ray, SubShapePath::new(), &mut collector);

        let hit = collector.hit.expect("ray should hit the +x child");
        let (index, rest) = hit.sub_shape.pop(2);
        assert_eq!(index, 1);
        assert!(rest.is_empty());
    }

    #[test]
    fn compound_mass_matches_summed_children() {
        let compound = two_sphere_compound();
        let props = compound.mass_properties(1000.0);
        let single = Sphere::new(0.5).unwrap().mass_properties(1000.0);
        assert!((props.mass - 2.0 * single.mass).abs() < 1e-2);
        // Parallel axis: the x-offset children add m·d² to Iyy and Izz.
        let expected_yy = 2.0 * (single.inertia.y_axis.y + single.mass);
        assert!((props.inertia.y_axis.y - expected_yy).abs() < 1.0);
    }

    #[test]
    fn decorators_consume_zero_path_bits() {
        let inner = shared(Sphere::new(1.0).unwrap());
        let decorated = Transformed::new(
            shared(Scaled::new(inner, Vec3::splat(2.0)).unwrap()),
            Vec3::new(0.0, 3.0, 0.0),
            Quat::IDENTITY,
        );
        let ray = Ray::new(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -10.0, 0.0));
        let mut collector = ClosestHitCollector::default();
        decorated.cast_ray(&ray, SubShapePath::new(), &mut collector);
        let hit = collector.hit.expect("ray should hit the decorated sphere");
        assert!(hit.sub_shape.is_empty());
        // Scaled radius 2 around y=3: top surface at y=5, so fraction 0.5.
        assert!((hit.fraction - 0.5).abs() < 1e-3);
    }
}
