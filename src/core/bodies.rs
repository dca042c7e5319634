//! Slab storage for bodies with packed generational identifiers and the
//! dense active-body array the island builder runs over.

use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, Result};

use super::body::{Body, INACTIVE};

const INDEX_BITS: u32 = 24;
const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;
pub const MAX_BODIES: u32 = 1 << INDEX_BITS;

/// Packed 32-bit body identifier: `{index:24, generation:8}`. The
/// generation is fed by a monotonically increasing creation counter so a
/// reused slot hands out a different id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(u32);

impl BodyId {
    pub const INVALID: BodyId = BodyId(u32::MAX);

    pub(crate) fn new(index: u32, generation: u8) -> Self {
        debug_assert!(index < MAX_BODIES);
        Self(index | ((generation as u32) << INDEX_BITS))
    }

    pub fn index(&self) -> u32 {
        self.0 & INDEX_MASK
    }

    pub fn generation(&self) -> u8 {
        (self.0 >> INDEX_BITS) as u8
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn is_invalid(&self) -> bool {
        self.0 == u32::MAX
    }
}

impl Default for BodyId {
    fn default() -> Self {
        Self::INVALID
    }
}

struct Slot {
    body: Option<Body>,
    generation: u8,
}

/// Slab-allocated body records with a free-index stack, plus the dense
/// `active_body_indices` array maintained by swap-remove.
#[derive(Default)]
pub struct Bodies {
    slots: Vec<Slot>,
    free: Vec<u32>,
    creation_counter: u32,
    active_body_indices: Vec<u32>,
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            body: None,
            generation: 0,
        }
    }
}

impl Bodies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `body`, assigning its id. Fails with `CapacityExceeded` past
    /// 2^24 slots.
    pub fn insert(&mut self, mut body: Body) -> Result<BodyId> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = self.slots.len() as u32;
                if index >= MAX_BODIES {
                    return Err(PhysicsError::CapacityExceeded(format!(
                        "body pool is limited to {MAX_BODIES} entries"
                    )));
                }
                self.slots.push(Slot::default());
                index
            }
        };

        self.creation_counter = self.creation_counter.wrapping_add(1);
        let generation = (self.creation_counter & 0xff) as u8;
        let id = BodyId::new(index, generation);

        body.id = id;
        let slot = &mut self.slots[index as usize];
        slot.generation = generation;
        slot.body = Some(body);
        Ok(id)
    }

    /// Removes the body, pushing its slot onto the free stack. The caller is
    /// responsible for deactivating it first.
    pub fn remove(&mut self, id: BodyId) -> Option<Body> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() || slot.body.is_none() {
            return None;
        }
        let body = slot.body.take();
        self.free.push(id.index());
        body
    }

    pub fn get(&self, id: BodyId) -> Option<&Body> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.body.as_ref()
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.body.as_mut()
    }

    /// Mutable access to two distinct bodies at once.
    pub fn get2_mut(&mut self, a: BodyId, b: BodyId) -> Option<(&mut Body, &mut Body)> {
        if a.index() == b.index() {
            return None;
        }
        self.get(a)?;
        self.get(b)?;

        let (first, second, flipped) = if a.index() < b.index() {
            (a, b, false)
        } else {
            (b, a, true)
        };
        let (left, right) = self.slots.split_at_mut(second.index() as usize);
        let first_body = left[first.index() as usize].body.as_mut()?;
        let second_body = right[0].body.as_mut()?;
        if flipped {
            Some((second_body, first_body))
        } else {
            Some((first_body, second_body))
        }
    }

    /// Direct slot access by slab index, e.g. from `active_body_indices`.
    /// Panics on a dead slot.
    pub fn at(&self, index: u32) -> &Body {
        self.slots[index as usize].body.as_ref().expect("live body slot")
    }

    pub(crate) fn at_mut(&mut self, index: u32) -> &mut Body {
        self.slots[index as usize].body.as_mut().expect("live body slot")
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.body.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.slots.iter().filter_map(|s| s.body.as_ref().map(|b| b.id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Body> {
        self.slots.iter().filter_map(|s| s.body.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Body> {
        self.slots.iter_mut().filter_map(|s| s.body.as_mut())
    }

    #[cfg(feature = "parallel")]
    pub(crate) fn par_iter_mut(
        &mut self,
    ) -> impl rayon::iter::ParallelIterator<Item = &mut Body> {
        use rayon::prelude::*;
        self.slots.par_iter_mut().filter_map(|s| s.body.as_mut())
    }

    pub fn active_body_indices(&self) -> &[u32] {
        &self.active_body_indices
    }

    pub fn num_active(&self) -> usize {
        self.active_body_indices.len()
    }

    /// Enrolls a body in the active array. No-op when already enrolled.
    pub(crate) fn activate(&mut self, index: u32) {
        let body = self.at(index);
        if body.is_static() || body.active_index() != INACTIVE {
            return;
        }
        let slot = self.active_body_indices.len() as u32;
        self.active_body_indices.push(index);
        let body = self.at_mut(index);
        body.active_index = slot;
        body.sleeping = false;
        body.sleep.reset();
    }

    /// Swap-removes a body from the active array, fixing up the body that
    /// got swapped into its slot.
    pub(crate) fn deactivate(&mut self, index: u32) {
        let active_index = self.at(index).active_index;
        if active_index == INACTIVE {
            return;
        }
        let last = self
            .active_body_indices
            .pop()
            .expect("active array cannot be empty here");
        let slot = active_index as usize;
        if slot < self.active_body_indices.len() {
            self.active_body_indices[slot] = last;
            self.at_mut(last).active_index = active_index;
        }
        self.at_mut(index).active_index = INACTIVE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::body::BodySettings;
    use crate::core::types::MotionType;
    use crate::shape::{compound::shared, Sphere};

    fn make_body(motion_type: MotionType) -> Body {
        let settings =
            BodySettings::new(shared(Sphere::new(1.0).unwrap())).motion_type(motion_type);
        crate::world::build_body(&settings)
    }

    #[test]
    fn stale_ids_return_none_after_slot_reuse() {
        let mut bodies = Bodies::new();
        let id = bodies.insert(make_body(MotionType::Dynamic)).unwrap();
        assert!(bodies.get(id).is_some());

        bodies.remove(id).unwrap();
        assert!(bodies.get(id).is_none());

        let reused = bodies.insert(make_body(MotionType::Dynamic)).unwrap();
        assert_eq!(reused.index(), id.index());
        assert_ne!(reused.generation(), id.generation());
        assert!(bodies.get(id).is_none());
        assert!(bodies.get(reused).is_some());
    }

    #[test]
    fn active_array_swap_remove_keeps_back_pointers() {
        let mut bodies = Bodies::new();
        let mut ids = Vec::new();
        for _ in 0..4 {
            let id = bodies.insert(make_body(MotionType::Dynamic)).unwrap();
            bodies.activate(id.index());
            ids.push(id);
        }

        bodies.deactivate(ids[1].index());
        assert_eq!(bodies.num_active(), 3);
        for &index in bodies.active_body_indices() {
            let body = bodies.at(index);
            assert_eq!(
                bodies.active_body_indices()[body.active_index() as usize],
                index
            );
        }
        assert_eq!(bodies.at(ids[1].index()).active_index(), INACTIVE);
    }

    #[test]
    fn static_bodies_never_enroll() {
        let mut bodies = Bodies::new();
        let id = bodies.insert(make_body(MotionType::Static)).unwrap();
        bodies.activate(id.index());
        assert_eq!(bodies.num_active(), 0);
    }
}
