//! Contact manifolds as delivered by the narrowphase collaborator, and the
//! persistent cache that correlates contact points across frames by feature
//! id so their impulses can be warm-started.

use std::collections::HashMap;

use glam::Vec3;

use crate::core::bodies::{Bodies, BodyId};
use crate::shape::subshape::SubShapeId;

/// One contact point inside a manifold.
#[derive(Debug, Clone, Copy)]
pub struct ManifoldPoint {
    /// Contact position, world space.
    pub position: Vec3,
    /// Penetration depth along the normal; positive when overlapping.
    pub penetration: f32,
    /// Stable identifier of the generating feature pair, used to correlate
    /// this point with last frame's.
    pub feature_id: u32,
}

/// A contact manifold for one pair of sub-shapes, up to four points sharing
/// a normal. The normal points from body B towards body A.
#[derive(Debug, Clone)]
pub struct ContactManifold {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub normal: Vec3,
    pub points: Vec<ManifoldPoint>,
    pub sub_shape_a: SubShapeId,
    pub sub_shape_b: SubShapeId,
}

/// The narrowphase hook: the world calls this once per step to collect the
/// frame's manifolds. Body poses and velocities are readable through
/// `bodies`, which lets a provider forward movement hints into its queries.
pub trait ContactProvider: Send {
    fn collect(&mut self, bodies: &Bodies, sink: &mut dyn FnMut(ContactManifold));
}

/// Default provider producing no contacts.
#[derive(Debug, Default)]
pub struct NoopContactProvider;

impl ContactProvider for NoopContactProvider {
    fn collect(&mut self, _bodies: &Bodies, _sink: &mut dyn FnMut(ContactManifold)) {}
}

/// Impulses accumulated by one contact point last step.
#[derive(Debug, Clone, Copy, Default)]
pub struct CachedContactPoint {
    pub feature_id: u32,
    pub normal_lambda: f32,
    pub friction_lambda: [f32; 2],
}

#[derive(Debug, Clone, Default)]
struct CachedManifold {
    points: Vec<CachedContactPoint>,
    last_frame: u64,
}

/// Persistent warm-start storage keyed by body pair. Entries not refreshed
/// for a few frames are pruned; waking a body drops every entry touching it.
#[derive(Debug, Default)]
pub struct ContactCache {
    manifolds: HashMap<(BodyId, BodyId), CachedManifold>,
    frame: u64,
}

const CACHE_MAX_AGE: u64 = 2;

fn pair_key(a: BodyId, b: BodyId) -> (BodyId, BodyId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl ContactCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_frame(&mut self) {
        self.frame = self.frame.wrapping_add(1);
    }

    /// Looks up the impulse a feature accumulated last step.
    pub fn lookup(&self, body_a: BodyId, body_b: BodyId, feature_id: u32) -> Option<CachedContactPoint> {
        let manifold = self.manifolds.get(&pair_key(body_a, body_b))?;
        manifold
            .points
            .iter()
            .find(|p| p.feature_id == feature_id)
            .copied()
    }

    /// Records this step's accumulated impulses for a pair.
    pub fn store(&mut self, body_a: BodyId, body_b: BodyId, points: Vec<CachedContactPoint>) {
        let entry = self
            .manifolds
            .entry(pair_key(body_a, body_b))
            .or_default();
        entry.points = points;
        entry.last_frame = self.frame;
    }

    /// Drops entries that have not been refreshed recently.
    pub fn prune_stale(&mut self) {
        let frame = self.frame;
        self.manifolds
            .retain(|_, m| frame.wrapping_sub(m.last_frame) <= CACHE_MAX_AGE);
    }

    /// Drops every entry touching `body`; called when the body wakes so the
    /// next solve starts from scratch.
    pub fn clear_body(&mut self, body: BodyId) {
        self.manifolds
            .retain(|(a, b), _| *a != body && *b != body);
    }

    pub fn len(&self) -> usize {
        self.manifolds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifolds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_round_trips_and_prunes() {
        let mut cache = ContactCache::new();
        let a = BodyId::new(1, 0);
        let b = BodyId::new(2, 0);

        cache.begin_frame();
        cache.store(
            a,
            b,
            vec![CachedContactPoint {
                feature_id: 7,
                normal_lambda: 1.5,
                friction_lambda: [0.1, -0.2],
            }],
        );

        // Key order does not matter.
        let hit = cache.lookup(b, a, 7).expect("cached point");
        assert_eq!(hit.normal_lambda, 1.5);
        assert!(cache.lookup(a, b, 8).is_none());

        for _ in 0..4 {
            cache.begin_frame();
        }
        cache.prune_stale();
        assert!(cache.lookup(a, b, 7).is_none());
    }

    #[test]
    fn clear_body_drops_adjacent_entries() {
        let mut cache = ContactCache::new();
        let a = BodyId::new(1, 0);
        let b = BodyId::new(2, 0);
        let c = BodyId::new(3, 0);
        cache.begin_frame();
        cache.store(a, b, vec![CachedContactPoint::default()]);
        cache.store(b, c, vec![CachedContactPoint::default()]);

        cache.clear_body(a);
        assert!(cache.lookup(a, b, 0).is_none());
        assert!(cache.lookup(b, c, 0).is_some());
    }
}
