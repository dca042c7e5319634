//! Groups the active bodies coupled by joints and contact constraints into
//! independent islands via a union-find over the active-body set.
//!
//! Raw contact manifolds only decide which island a contact list entry lands
//! in; they do not union their two bodies. Contacts lifted into constraint
//! form and user constraints do union. Two overlapping bodies whose manifold
//! was never lifted (e.g. filtered out by the caller) can therefore end up
//! in different islands; that is intentional and asserted below.

use log::debug;

use crate::config::WorldSettings;
use crate::constraint::{ConstraintId, Constraints};
use crate::core::bodies::Bodies;
use crate::core::body::INACTIVE;
use crate::core::types::MotionType;

/// A maximal set of active bodies transitively coupled by constraints,
/// solvable independently of every other island.
#[derive(Debug, Default, Clone)]
pub struct Island {
    /// Slab indices of the member bodies.
    pub body_indices: Vec<u32>,
    /// Indices into the step's contact constraint array.
    pub contact_indices: Vec<u32>,
    pub constraint_ids: Vec<ConstraintId>,
    pub num_velocity_steps: u32,
    pub num_position_steps: u32,
}

impl Island {
    pub fn workload(&self) -> usize {
        self.contact_indices.len() + self.constraint_ids.len()
    }

    fn clear(&mut self) {
        self.body_indices.clear();
        self.contact_indices.clear();
        self.constraint_ids.clear();
        self.num_velocity_steps = 0;
        self.num_position_steps = 0;
    }
}

/// Union-find state, indexed by ACTIVE body index. All buffers are owned by
/// the world and reused across steps.
#[derive(Debug, Default)]
pub struct IslandBuilder {
    body_links: Vec<u32>,
    body_islands: Vec<u32>,
    contact_links: Vec<u32>,
    constraint_ids: Vec<ConstraintId>,
    constraint_links: Vec<u32>,
    islands: Vec<Island>,
    num_islands: usize,
}

impl IslandBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the link state for `num_active` bodies and up to
    /// `max_contacts` contacts.
    pub fn prepare(&mut self, num_active: usize, max_contacts: usize) {
        self.body_links.clear();
        self.body_links.extend(0..num_active as u32);
        self.body_islands.clear();
        self.body_islands.resize(num_active, 0);
        self.contact_links.clear();
        self.contact_links.resize(max_contacts, INACTIVE);
        self.constraint_ids.clear();
        self.constraint_links.clear();
        self.num_islands = 0;
    }

    fn root(&self, mut index: u32) -> u32 {
        while self.body_links[index as usize] != index {
            index = self.body_links[index as usize];
        }
        index
    }

    /// Unions the components of two active bodies. The larger root is made
    /// to point at the smaller; only the caller-side pointers are path
    /// compressed.
    pub fn link_bodies(&mut self, active_a: u32, active_b: u32) {
        if active_a == INACTIVE || active_b == INACTIVE {
            return;
        }
        let root_a = self.root(active_a);
        let root_b = self.root(active_b);
        let lo = root_a.min(root_b);
        if root_a != root_b {
            let hi = root_a.max(root_b);
            self.body_links[hi as usize] = lo;
        }
        self.body_links[active_a as usize] = lo;
        self.body_links[active_b as usize] = lo;
    }

    /// Assigns a raw contact to the component of its lowest active body.
    /// Does NOT union the bodies: a manifold alone does not couple them.
    pub fn link_contact(&mut self, contact_index: u32, active_a: u32, active_b: u32) {
        // INACTIVE is u32::MAX, so min() picks the active side of an
        // active-vs-sleeping pair and INACTIVE for a fully sleeping one.
        self.contact_links[contact_index as usize] = active_a.min(active_b);
    }

    /// A contact lifted into constraint form both assigns and couples.
    pub fn link_contact_constraint(&mut self, contact_index: u32, active_a: u32, active_b: u32) {
        self.link_contact(contact_index, active_a, active_b);
        if active_a != INACTIVE && active_b != INACTIVE {
            self.link_bodies(active_a, active_b);
        }
    }

    /// User constraints couple their bodies and are assigned like contacts.
    pub fn link_constraint(&mut self, id: ConstraintId, active_a: u32, active_b: u32) {
        if active_a != INACTIVE && active_b != INACTIVE {
            self.link_bodies(active_a, active_b);
        }
        self.constraint_ids.push(id);
        self.constraint_links.push(active_a.min(active_b));
    }

    /// Numbers the islands, materializes their member lists, resolves the
    /// per-island iteration counts, and orders islands longest-job-first.
    pub fn finalize(
        &mut self,
        bodies: &Bodies,
        constraints: &Constraints,
        settings: &WorldSettings,
    ) {
        let num_active = self.body_links.len();
        let active_indices = bodies.active_body_indices();

        // Single low-to-high pass: a self-link starts a new island, anything
        // else inherits from its (already numbered, strictly lower) target.
        self.num_islands = 0;
        for i in 0..num_active {
            let link = self.body_links[i] as usize;
            if link == i {
                self.body_islands[i] = self.num_islands as u32;
                self.num_islands += 1;
            } else {
                debug_assert!(link < i);
                self.body_islands[i] = self.body_islands[link];
            }
        }

        for island in &mut self.islands {
            island.clear();
        }
        self.islands
            .resize_with(self.num_islands.max(self.islands.len()), Island::default);

        for i in 0..num_active {
            let island = self.body_islands[i] as usize;
            self.islands[island].body_indices.push(active_indices[i]);
        }

        for (contact_index, &link) in self.contact_links.iter().enumerate() {
            if link == INACTIVE {
                continue;
            }
            let island = self.body_islands[link as usize] as usize;
            debug_assert!(island < self.num_islands);
            self.islands[island]
                .contact_indices
                .push(contact_index as u32);
        }

        for (slot, &link) in self.constraint_links.iter().enumerate() {
            if link == INACTIVE {
                continue;
            }
            let island = self.body_islands[link as usize] as usize;
            self.islands[island]
                .constraint_ids
                .push(self.constraint_ids[slot]);
        }

        // Iteration counts: max of the member overrides; if any member
        // leaves its override at zero the world default joins the max.
        for island in self.islands.iter_mut().take(self.num_islands) {
            let mut velocity = 0u32;
            let mut position = 0u32;
            let mut velocity_default = island.body_indices.is_empty();
            let mut position_default = velocity_default;
            for &body_index in &island.body_indices {
                let body = bodies.at(body_index);
                if body.motion_type != MotionType::Dynamic {
                    continue;
                }
                velocity = velocity.max(body.num_velocity_steps_override);
                position = position.max(body.num_position_steps_override);
                velocity_default |= body.num_velocity_steps_override == 0;
                position_default |= body.num_position_steps_override == 0;
            }
            for id in &island.constraint_ids {
                if let Some(constraint) = constraints.get(*id) {
                    velocity = velocity.max(constraint.num_velocity_steps_override);
                    position = position.max(constraint.num_position_steps_override);
                    velocity_default |= constraint.num_velocity_steps_override == 0;
                    position_default |= constraint.num_position_steps_override == 0;
                }
            }
            if velocity_default {
                velocity = velocity.max(settings.num_velocity_steps);
            }
            if position_default {
                position = position.max(settings.num_position_steps);
            }
            island.num_velocity_steps = velocity;
            island.num_position_steps = position;
        }

        // Longest job first; the stable sort keeps equal-workload islands in
        // first-body order since numbering followed ascending active index.
        self.islands.truncate(self.num_islands);
        self.islands
            .sort_by(|a, b| b.workload().cmp(&a.workload()));

        debug!(
            "island builder: {} islands over {} active bodies",
            self.num_islands, num_active
        );
    }

    pub fn islands(&self) -> &[Island] {
        &self.islands[..self.num_islands]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder_with_links(num_active: usize, links: &[(u32, u32)]) -> IslandBuilder {
        let mut builder = IslandBuilder::new();
        builder.prepare(num_active, 0);
        for &(a, b) in links {
            builder.link_bodies(a, b);
        }
        builder
    }

    #[test]
    fn union_reduces_to_lowest_root() {
        let builder = builder_with_links(6, &[(4, 5), (1, 4), (2, 3)]);
        assert_eq!(builder.root(5), 1);
        assert_eq!(builder.root(4), 1);
        assert_eq!(builder.root(3), 2);
        assert_eq!(builder.root(0), 0);
    }

    #[test]
    fn contact_link_prefers_active_side() {
        let mut builder = IslandBuilder::new();
        builder.prepare(3, 2);
        builder.link_contact(0, 2, INACTIVE);
        builder.link_contact(1, INACTIVE, INACTIVE);
        assert_eq!(builder.contact_links[0], 2);
        assert_eq!(builder.contact_links[1], INACTIVE);
    }
}
