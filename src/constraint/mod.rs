//! User constraints: packed identifiers, the slab pool, and the concrete
//! joint payloads composed from constraint parts.

pub mod part;

mod cone;
mod distance;
mod fixed;
mod hinge;
mod point;
mod six_dof;
mod slider;
mod swing_twist;

pub use cone::{ConeConstraint, ConeSettings};
pub use distance::{DistanceConstraint, DistanceSettings};
pub use fixed::{FixedConstraint, FixedSettings};
pub use hinge::{HingeConstraint, HingeLimits, HingeSettings};
pub use point::{PointConstraint, PointSettings};
pub use six_dof::{AxisState, SixDofConstraint, SixDofSettings};
pub use slider::{SliderConstraint, SliderLimits, SliderSettings};
pub use swing_twist::{SwingTwistConstraint, SwingTwistSettings};

use serde::{Deserialize, Serialize};

use crate::core::bodies::BodyId;
use crate::core::body::Body;
use crate::error::{PhysicsError, Result};

use part::CorrectionLimits;

const INDEX_BITS: u64 = 24;
const TYPE_BITS: u64 = 4;
const SEQUENCE_BITS: u64 = 24;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;
const TYPE_MASK: u64 = (1 << TYPE_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

pub const MAX_CONSTRAINTS: u32 = 1 << INDEX_BITS;

/// Packed constraint identifier: `{index:24, type:4, sequence:24}`. The
/// sequence comes from a per-type counter that advances on creation and
/// wraps at 2^24, so a reused slot is detectable as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintId(u64);

impl ConstraintId {
    pub const INVALID: ConstraintId = ConstraintId(u64::MAX);

    fn new(index: u32, type_id: u8, sequence: u32) -> Self {
        Self(
            (index as u64 & INDEX_MASK)
                | ((type_id as u64 & TYPE_MASK) << INDEX_BITS)
                | ((sequence as u64 & SEQUENCE_MASK) << (INDEX_BITS + TYPE_BITS)),
        )
    }

    pub fn index(&self) -> u32 {
        (self.0 & INDEX_MASK) as u32
    }

    pub fn type_id(&self) -> u8 {
        ((self.0 >> INDEX_BITS) & TYPE_MASK) as u8
    }

    pub fn sequence(&self) -> u32 {
        ((self.0 >> (INDEX_BITS + TYPE_BITS)) & SEQUENCE_MASK) as u32
    }

    pub fn is_invalid(&self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for ConstraintId {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Construction settings, tagged per constraint type. Anchors and axes are
/// given in WORLD space and converted to body-local terms at bind time.
#[derive(Debug, Clone)]
pub enum ConstraintSettings {
    Point(PointSettings),
    Distance(DistanceSettings),
    Hinge(HingeSettings),
    Slider(SliderSettings),
    Fixed(FixedSettings),
    Cone(ConeSettings),
    SwingTwist(SwingTwistSettings),
    SixDof(SixDofSettings),
}

impl ConstraintSettings {
    pub fn body_a(&self) -> BodyId {
        match self {
            Self::Point(s) => s.body_a,
            Self::Distance(s) => s.body_a,
            Self::Hinge(s) => s.body_a,
            Self::Slider(s) => s.body_a,
            Self::Fixed(s) => s.body_a,
            Self::Cone(s) => s.body_a,
            Self::SwingTwist(s) => s.body_a,
            Self::SixDof(s) => s.body_a,
        }
    }

    pub fn body_b(&self) -> BodyId {
        match self {
            Self::Point(s) => s.body_b,
            Self::Distance(s) => s.body_b,
            Self::Hinge(s) => s.body_b,
            Self::Slider(s) => s.body_b,
            Self::Fixed(s) => s.body_b,
            Self::Cone(s) => s.body_b,
            Self::SwingTwist(s) => s.body_b,
            Self::SixDof(s) => s.body_b,
        }
    }
}

/// Type-specific payload, dispatched by pattern match.
#[derive(Debug, Clone)]
pub enum ConstraintKind {
    Point(PointConstraint),
    Distance(DistanceConstraint),
    Hinge(HingeConstraint),
    Slider(SliderConstraint),
    Fixed(FixedConstraint),
    Cone(ConeConstraint),
    SwingTwist(SwingTwistConstraint),
    SixDof(SixDofConstraint),
}

impl ConstraintKind {
    pub fn type_id(&self) -> u8 {
        match self {
            Self::Point(_) => 0,
            Self::Distance(_) => 1,
            Self::Hinge(_) => 2,
            Self::Slider(_) => 3,
            Self::Fixed(_) => 4,
            Self::Cone(_) => 5,
            Self::SwingTwist(_) => 6,
            Self::SixDof(_) => 7,
        }
    }

    /// Computes effective masses at the current pose. Returns false when any
    /// part went degenerate and was deactivated for the frame.
    pub fn setup(&mut self, body_a: &Body, body_b: &Body) -> bool {
        match self {
            Self::Point(c) => c.setup(body_a, body_b),
            Self::Distance(c) => c.setup(body_a, body_b),
            Self::Hinge(c) => c.setup(body_a, body_b),
            Self::Slider(c) => c.setup(body_a, body_b),
            Self::Fixed(c) => c.setup(body_a, body_b),
            Self::Cone(c) => c.setup(body_a, body_b),
            Self::SwingTwist(c) => c.setup(body_a, body_b),
            Self::SixDof(c) => c.setup(body_a, body_b),
        }
    }

    pub fn warm_start(&mut self, body_a: &mut Body, body_b: &mut Body, ratio: f32) {
        match self {
            Self::Point(c) => c.warm_start(body_a, body_b, ratio),
            Self::Distance(c) => c.warm_start(body_a, body_b, ratio),
            Self::Hinge(c) => c.warm_start(body_a, body_b, ratio),
            Self::Slider(c) => c.warm_start(body_a, body_b, ratio),
            Self::Fixed(c) => c.warm_start(body_a, body_b, ratio),
            Self::Cone(c) => c.warm_start(body_a, body_b, ratio),
            Self::SwingTwist(c) => c.warm_start(body_a, body_b, ratio),
            Self::SixDof(c) => c.warm_start(body_a, body_b, ratio),
        }
    }

    pub fn solve_velocity(&mut self, body_a: &mut Body, body_b: &mut Body) -> bool {
        match self {
            Self::Point(c) => c.solve_velocity(body_a, body_b),
            Self::Distance(c) => c.solve_velocity(body_a, body_b),
            Self::Hinge(c) => c.solve_velocity(body_a, body_b),
            Self::Slider(c) => c.solve_velocity(body_a, body_b),
            Self::Fixed(c) => c.solve_velocity(body_a, body_b),
            Self::Cone(c) => c.solve_velocity(body_a, body_b),
            Self::SwingTwist(c) => c.solve_velocity(body_a, body_b),
            Self::SixDof(c) => c.solve_velocity(body_a, body_b),
        }
    }

    pub fn solve_position(
        &mut self,
        body_a: &mut Body,
        body_b: &mut Body,
        baumgarte: f32,
        limits: &CorrectionLimits,
    ) -> bool {
        match self {
            Self::Point(c) => c.solve_position(body_a, body_b, baumgarte, limits),
            Self::Distance(c) => c.solve_position(body_a, body_b, baumgarte, limits),
            Self::Hinge(c) => c.solve_position(body_a, body_b, baumgarte, limits),
            Self::Slider(c) => c.solve_position(body_a, body_b, baumgarte, limits),
            Self::Fixed(c) => c.solve_position(body_a, body_b, baumgarte, limits),
            Self::Cone(c) => c.solve_position(body_a, body_b, baumgarte, limits),
            Self::SwingTwist(c) => c.solve_position(body_a, body_b, baumgarte, limits),
            Self::SixDof(c) => c.solve_position(body_a, body_b, baumgarte, limits),
        }
    }

    /// Drops all cached impulses; called when an adjacent body wakes.
    pub fn reset_warm_start(&mut self) {
        match self {
            Self::Point(c) => c.reset_warm_start(),
            Self::Distance(c) => c.reset_warm_start(),
            Self::Hinge(c) => c.reset_warm_start(),
            Self::Slider(c) => c.reset_warm_start(),
            Self::Fixed(c) => c.reset_warm_start(),
            Self::Cone(c) => c.reset_warm_start(),
            Self::SwingTwist(c) => c.reset_warm_start(),
            Self::SixDof(c) => c.reset_warm_start(),
        }
    }
}

/// Base constraint record wrapping the type-specific payload.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub id: ConstraintId,
    pub enabled: bool,
    pub priority: u32,
    /// Velocity iterations this constraint asks for; 0 uses the world
    /// default.
    pub num_velocity_steps_override: u32,
    pub num_position_steps_override: u32,
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub user_data: u64,
    pub kind: ConstraintKind,
}

struct Slot {
    constraint: Option<Constraint>,
    sequence: u32,
}

/// Slab pool for constraints. The sequence counter is per type and advances
/// on creation, never on destroy, so stale ids from a reused slot fail the
/// lookup check.
#[derive(Default)]
pub struct Constraints {
    slots: Vec<Slot>,
    free: Vec<u32>,
    sequence_counters: [u32; 16],
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ConstraintKind, body_a: BodyId, body_b: BodyId) -> Result<ConstraintId> {
        let type_id = kind.type_id();
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = self.slots.len() as u32;
                if index >= MAX_CONSTRAINTS {
                    return Err(PhysicsError::CapacityExceeded(format!(
                        "constraint pool is limited to {MAX_CONSTRAINTS} entries"
                    )));
                }
                self.slots.push(Slot {
                    constraint: None,
                    sequence: 0,
                });
                index
            }
        };

        let counter = &mut self.sequence_counters[type_id as usize];
        *counter = (*counter + 1) & SEQUENCE_MASK as u32;
        let sequence = *counter;

        let id = ConstraintId::new(index, type_id, sequence);
        let slot = &mut self.slots[index as usize];
        slot.sequence = sequence;
        slot.constraint = Some(Constraint {
            id,
            enabled: true,
            priority: 0,
            num_velocity_steps_override: 0,
            num_position_steps_override: 0,
            body_a,
            body_b,
            user_data: 0,
            kind,
        });
        Ok(id)
    }

    pub fn remove(&mut self, id: ConstraintId) -> Option<Constraint> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.sequence != id.sequence() || slot.constraint.is_none() {
            return None;
        }
        let constraint = slot.constraint.take();
        self.free.push(id.index());
        constraint
    }

    pub fn get(&self, id: ConstraintId) -> Option<&Constraint> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.sequence != id.sequence() {
            return None;
        }
        slot.constraint
            .as_ref()
            .filter(|c| c.id.type_id() == id.type_id())
    }

    pub fn get_mut(&mut self, id: ConstraintId) -> Option<&mut Constraint> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.sequence != id.sequence() {
            return None;
        }
        slot.constraint
            .as_mut()
            .filter(|c| c.id.type_id() == id.type_id())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.slots.iter().filter_map(|s| s.constraint.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Constraint> {
        self.slots.iter_mut().filter_map(|s| s.constraint.as_mut())
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.constraint.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn id_packing_round_trips() {
        let id = ConstraintId::new(123_456, 7, 9_876_543);
        assert_eq!(id.index(), 123_456);
        assert_eq!(id.type_id(), 7);
        assert_eq!(id.sequence(), 9_876_543);
    }

    #[test]
    fn reused_slots_invalidate_old_ids() {
        let mut pool = Constraints::new();
        let kind = ConstraintKind::Point(PointConstraint::from_local_anchors(
            Vec3::ZERO,
            Vec3::ZERO,
        ));
        let a = BodyId::new(0, 1);
        let b = BodyId::new(1, 1);

        let first = pool.insert(kind.clone(), a, b).unwrap();
        pool.remove(first).unwrap();
        let second = pool.insert(kind, a, b).unwrap();

        assert_eq!(first.index(), second.index());
        assert_ne!(first.sequence(), second.sequence());
        assert!(pool.get(first).is_none());
        assert!(pool.get(second).is_some());
    }
}
