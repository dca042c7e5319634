//! Kinetica – an island-based rigid-body constraint solver core.
//!
//! Given a set of rigid bodies and the contacts and joints coupling them,
//! each step groups the active bodies into independent islands, resolves
//! velocities by warm-started sequential impulses, stabilizes positions
//! with Baumgarte correction, and retires quiescent islands to sleep.
//! Collision detection stays outside: manifolds enter through a pluggable
//! [`collision::contact::ContactProvider`].

pub mod collision;
pub mod config;
pub mod constraint;
pub mod core;
pub mod dynamics;
pub mod error;
pub mod shape;
pub mod utils;
pub mod world;

pub use glam::{Mat3, Mat4, Quat, Vec3};

pub use collision::contact::{ContactManifold, ContactProvider, ManifoldPoint, NoopContactProvider};
pub use config::WorldSettings;
pub use constraint::{
    AxisState, ConeSettings, ConstraintId, ConstraintSettings, DistanceSettings, FixedSettings,
    HingeLimits, HingeSettings, PointSettings, SixDofSettings, SliderLimits, SliderSettings,
    SwingTwistSettings,
};
pub use crate::core::bodies::BodyId;
pub use crate::core::body::{Body, BodySettings};
pub use crate::core::mass::MassProperties;
pub use crate::core::types::{DofMask, Material, MotionType, Pose, Velocity};
pub use error::{PhysicsError, Result};
pub use shape::{
    compound::{shared, CompoundChild},
    subshape::{SubShapeId, SubShapePath},
    Aabb, BoxShape, Compound, HalfSpace, Ray, Shape, ShapeRef, Sphere,
};
pub use world::{PhysicsWorld, PhysicsWorldBuilder};

/// High-level convenience wrapper that owns a [`PhysicsWorld`].
pub struct PhysicsEngine {
    world: PhysicsWorld,
}

impl Default for PhysicsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsEngine {
    pub fn new() -> Self {
        Self {
            world: PhysicsWorld::new(),
        }
    }

    /// Adds a rigid body to the world and returns its [`BodyId`].
    pub fn add_body(&mut self, settings: &BodySettings) -> Result<BodyId> {
        self.world.create_body(settings)
    }

    /// Adds a constraint between two bodies and returns its [`ConstraintId`].
    pub fn add_constraint(&mut self, settings: &ConstraintSettings) -> Result<ConstraintId> {
        self.world.create_constraint(settings)
    }

    /// Advances the simulation by the provided delta time.
    pub fn step(&mut self, dt: f32) {
        self.world.step(dt);
    }

    /// Enables or disables the per-island parallel solve.
    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.world.set_parallel_enabled(enabled);
    }

    pub fn parallel_enabled(&self) -> bool {
        self.world.parallel_enabled()
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.world.body(id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.world.body_mut(id)
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }
}
