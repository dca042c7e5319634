use glam::{Mat3, Quat, Vec3};

use crate::core::mass::MassProperties;
use crate::core::types::{DofMask, Material, MotionType, Pose, Velocity};
use crate::shape::ShapeRef;
use crate::utils::math::quat_exp;

use super::bodies::BodyId;
use crate::constraint::ConstraintId;

/// Number of motion snapshots kept for quiescence detection.
pub const SLEEP_RING_LEN: usize = 3;

/// Number of characteristic points tracked per body.
const TRACKED_POINTS: usize = 3;

/// Ring buffer of recent positions of a body's characteristic points. The
/// body counts as quiescent while the axis-aligned box enclosing each
/// tracked point's recent history stays small.
#[derive(Debug, Clone, Copy)]
pub struct SleepState {
    entries: [[Vec3; TRACKED_POINTS]; SLEEP_RING_LEN],
    len: usize,
    head: usize,
    pub time_quiescent: f32,
}

impl Default for SleepState {
    fn default() -> Self {
        Self {
            entries: [[Vec3::ZERO; TRACKED_POINTS]; SLEEP_RING_LEN],
            len: 0,
            head: 0,
            time_quiescent: 0.0,
        }
    }
}

impl SleepState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn push(&mut self, points: [Vec3; TRACKED_POINTS]) {
        self.entries[self.head] = points;
        self.head = (self.head + 1) % SLEEP_RING_LEN;
        self.len = (self.len + 1).min(SLEEP_RING_LEN);
    }

    /// Largest dimension of any tracked point's motion box over the window.
    /// Returns `f32::MAX` until the ring has filled once.
    pub fn motion_extent(&self) -> f32 {
        if self.len < SLEEP_RING_LEN {
            return f32::MAX;
        }
        let mut extent = 0.0_f32;
        for point in 0..TRACKED_POINTS {
            let mut min = Vec3::splat(f32::MAX);
            let mut max = Vec3::splat(f32::MIN);
            for entry in &self.entries {
                min = min.min(entry[point]);
                max = max.max(entry[point]);
            }
            extent = extent.max((max - min).max_element());
        }
        extent
    }
}

/// Sentinel for bodies not enrolled in the active array.
pub const INACTIVE: u32 = u32::MAX;

/// Core rigid body record: pose, velocities, mass properties, motion type,
/// sleep state, and constraint back-references.
#[derive(Debug, Clone)]
pub struct Body {
    pub id: BodyId,
    pub pose: Pose,
    pub velocity: Velocity,
    pub motion_type: MotionType,
    pub shape: ShapeRef,
    pub mass_properties: MassProperties,
    pub inverse_mass: f32,
    pub inverse_inertia_local: Mat3,
    pub material: Material,
    pub dof_mask: DofMask,
    pub gravity_scale: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub num_velocity_steps_override: u32,
    pub num_position_steps_override: u32,
    pub allow_sleeping: bool,
    pub user_data: u64,

    pub(crate) sleep: SleepState,
    pub(crate) sleeping: bool,
    pub(crate) active_index: u32,
    /// Back-references to constraints touching this body, kept unordered;
    /// removal swap-removes by value.
    pub(crate) constraints: Vec<ConstraintId>,
}

impl Body {
    pub fn is_dynamic(&self) -> bool {
        self.motion_type == MotionType::Dynamic
    }

    pub fn is_static(&self) -> bool {
        self.motion_type == MotionType::Static
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    /// Seconds this body has been below the quiescence threshold.
    pub fn time_quiescent(&self) -> f32 {
        self.sleep.time_quiescent
    }

    pub fn is_active(&self) -> bool {
        self.active_index != INACTIVE
    }

    pub fn active_index(&self) -> u32 {
        self.active_index
    }

    pub fn constraints(&self) -> &[ConstraintId] {
        &self.constraints
    }

    /// World-space inverse inertia `R · I⁻¹ · Rᵀ`; zero for anything that
    /// cannot receive impulses.
    pub fn world_inverse_inertia(&self) -> Mat3 {
        if !self.is_dynamic() {
            return Mat3::ZERO;
        }
        MassProperties::world_inverse_inertia(self.inverse_inertia_local, self.pose.rotation)
    }

    pub(crate) fn recompute_inverses(&mut self) {
        if !self.is_dynamic() {
            self.inverse_mass = 0.0;
            self.inverse_inertia_local = Mat3::ZERO;
            return;
        }
        self.inverse_mass = if self.mass_properties.mass.abs() < f32::EPSILON {
            0.0
        } else {
            1.0 / self.mass_properties.mass
        };
        let det = self.mass_properties.inertia.determinant();
        self.inverse_inertia_local = if det.abs() < f32::EPSILON {
            Mat3::ZERO
        } else {
            self.mass_properties.inertia.inverse()
        };
    }

    pub fn apply_impulse(&mut self, impulse: Vec3, world_point: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.velocity.linear += impulse * self.inverse_mass;
        let torque = (world_point - self.pose.position).cross(impulse);
        self.velocity.angular += self.world_inverse_inertia() * torque;
    }

    pub fn apply_angular_impulse(&mut self, angular_impulse: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.velocity.angular += self.world_inverse_inertia() * angular_impulse;
    }

    /// Applies a direct pose correction, honoring the DOF mask and
    /// integrating the rotation by the exponential map.
    pub(crate) fn apply_position_step(&mut self, linear: Vec3, angular: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.pose.position += self.dof_mask.mask_translation(linear);
        let masked = self.dof_mask.mask_rotation(angular);
        if masked.length_squared() > 1e-14 {
            self.pose.rotation = (quat_exp(masked) * self.pose.rotation).normalize();
        }
    }

    /// Points whose recent motion bounds feed the sleep check: the COM plus
    /// two offsets at the shape's inner radius so rotation registers too.
    pub(crate) fn characteristic_points(&self) -> [Vec3; TRACKED_POINTS] {
        let r = self.shape.inner_radius().max(0.1);
        let com = self.pose.position;
        [
            com,
            com + self.pose.rotation * Vec3::new(r, 0.0, 0.0),
            com + self.pose.rotation * Vec3::new(0.0, r, 0.0),
        ]
    }
}

/// Construction settings for [`crate::world::PhysicsWorld::create_body`].
#[derive(Debug, Clone)]
pub struct BodySettings {
    pub shape: ShapeRef,
    pub pose: Pose,
    pub velocity: Velocity,
    pub motion_type: MotionType,
    pub material: Material,
    pub dof_mask: DofMask,
    pub density: f32,
    /// Replaces the shape-derived mass while keeping its inertia ratios.
    pub mass_override: Option<f32>,
    pub gravity_scale: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Velocity iterations this body asks for; 0 uses the world default.
    pub num_velocity_steps_override: u32,
    /// Position iterations this body asks for; 0 uses the world default.
    pub num_position_steps_override: u32,
    pub allow_sleeping: bool,
    pub user_data: u64,
}

impl BodySettings {
    pub fn new(shape: ShapeRef) -> Self {
        Self {
            shape,
            pose: Pose::default(),
            velocity: Velocity::default(),
            motion_type: MotionType::Dynamic,
            material: Material::default(),
            dof_mask: DofMask::ALL,
            density: 1000.0,
            mass_override: None,
            gravity_scale: 1.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            num_velocity_steps_override: 0,
            num_position_steps_override: 0,
            allow_sleeping: true,
            user_data: 0,
        }
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.pose.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.pose.rotation = rotation.normalize();
        self
    }

    pub fn motion_type(mut self, motion_type: MotionType) -> Self {
        self.motion_type = motion_type;
        self
    }

    pub fn velocity(mut self, linear: Vec3, angular: Vec3) -> Self {
        self.velocity = Velocity { linear, angular };
        self
    }

    pub fn material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn dof_mask(mut self, mask: DofMask) -> Self {
        self.dof_mask = mask;
        self
    }

    pub fn allow_sleeping(mut self, allow: bool) -> Self {
        self.allow_sleeping = allow;
        self
    }

    pub fn gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    pub fn damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    pub fn solver_steps(mut self, velocity: u32, position: u32) -> Self {
        self.num_velocity_steps_override = velocity;
        self.num_position_steps_override = position;
        self
    }

    pub fn user_data(mut self, data: u64) -> Self {
        self.user_data = data;
        self
    }
}
