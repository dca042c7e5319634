use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// How a body participates in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MotionType {
    /// Never integrates, never receives impulses.
    Static,
    /// Follows a prescribed velocity; contributes to Jacobians but receives
    /// no impulses.
    Kinematic,
    /// Participates fully.
    #[default]
    Dynamic,
}

/// Center-of-mass position and orientation of a body in world space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation: rotation.normalize(),
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Builds a homogeneous matrix representation of the pose.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    pub fn local_to_world(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    pub fn world_to_local(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse() * (world - self.position)
    }
}

/// Linear and angular velocity of a rigid body, world space.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub linear: Vec3,
    pub angular: Vec3,
}

impl Velocity {
    /// Velocity of the world-space point `com + r` on the body.
    pub fn point_velocity(&self, r: Vec3) -> Vec3 {
        self.linear + self.angular.cross(r)
    }
}

/// Surface coefficients used by contact constraints. Friction is isotropic
/// Coulomb.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Material {
    pub friction: f32,
    pub restitution: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.0,
        }
    }
}

impl Material {
    /// Combines the coefficients of two touching materials: geometric mean
    /// for friction, max for restitution.
    pub fn combine(a: &Material, b: &Material) -> Material {
        Material {
            friction: (a.friction.max(0.0) * b.friction.max(0.0)).sqrt(),
            restitution: a.restitution.max(b.restitution),
        }
    }
}

/// Six-bit mask enabling translational and rotational axes of a body. Locked
/// axes are skipped when integrating position steps; impulses themselves are
/// not masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DofMask(u8);

impl Default for DofMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl DofMask {
    pub const TRANSLATION_X: DofMask = DofMask(1 << 0);
    pub const TRANSLATION_Y: DofMask = DofMask(1 << 1);
    pub const TRANSLATION_Z: DofMask = DofMask(1 << 2);
    pub const ROTATION_X: DofMask = DofMask(1 << 3);
    pub const ROTATION_Y: DofMask = DofMask(1 << 4);
    pub const ROTATION_Z: DofMask = DofMask(1 << 5);
    pub const ALL: DofMask = DofMask(0b11_1111);
    pub const NONE: DofMask = DofMask(0);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn from_bits(bits: u8) -> Self {
        Self(bits & 0b11_1111)
    }

    pub fn contains(self, other: DofMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: DofMask) -> DofMask {
        DofMask(self.0 | other.0)
    }

    /// Zeroes the locked components of a translation step.
    pub fn mask_translation(self, step: Vec3) -> Vec3 {
        Vec3::new(
            if self.contains(Self::TRANSLATION_X) { step.x } else { 0.0 },
            if self.contains(Self::TRANSLATION_Y) { step.y } else { 0.0 },
            if self.contains(Self::TRANSLATION_Z) { step.z } else { 0.0 },
        )
    }

    /// Zeroes the locked components of a rotation step.
    pub fn mask_rotation(self, step: Vec3) -> Vec3 {
        Vec3::new(
            if self.contains(Self::ROTATION_X) { step.x } else { 0.0 },
            if self.contains(Self::ROTATION_Y) { step.y } else { 0.0 },
            if self.contains(Self::ROTATION_Z) { step.z } else { 0.0 },
        )
    }
}
