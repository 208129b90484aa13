//! The contact solver and its persistent manifold store.
//!
//! [`ContactSolver`] owns every [`ContactManifold`] alive in the world,
//! keyed by the body pair. Manifolds live through a mark-and-sweep
//! cycle each step:
//!
//! 1. **Mark**: every stored manifold is flagged obsolete.
//! 2. **Sweep**: each non-empty narrow-phase result either updates the
//!    pair's manifold (clearing the flag and warm-starting matching
//!    contact points) or inserts a fresh one.
//! 3. **Reap**: manifolds still flagged are removed.
//!
//! Storage is a dense vector plus a map from the packed pair key to the
//! vector slot. All solving iterates the vector, so the iteration order
//! is a deterministic function of the store's mutation history, and
//! identical runs produce identical results.

use hashbrown::HashMap;

use crate::body::{Body, BodyIndex};
use crate::contact::ContactManifold;
use crate::narrow_phase::CollisionManifold;

/// Pack an ordered body pair into a single map key.
fn pair_key(body_a: BodyIndex, body_b: BodyIndex) -> u64 {
    debug_assert!(body_a < body_b);
    (u64::from(body_a.raw()) << 32) | u64::from(body_b.raw())
}

/// Borrow two distinct bodies mutably from the array.
///
/// Relies on the manifold invariant `body_a < body_b`.
fn body_pair_mut(bodies: &mut [Body], body_a: BodyIndex, body_b: BodyIndex) -> (&mut Body, &mut Body) {
    let (index_a, index_b) = (body_a.raw() as usize, body_b.raw() as usize);
    debug_assert!(index_a < index_b);
    let (head, tail) = bodies.split_at_mut(index_b);
    (&mut head[index_a], &mut tail[0])
}

/// Sequential-impulse solver over the persistent contact manifolds.
#[derive(Debug, Clone, Default)]
pub struct ContactSolver {
    /// Dense manifold storage; solving iterates this in order.
    manifolds: Vec<ContactManifold>,
    /// Packed pair key to slot in `manifolds`.
    slots: HashMap<u64, usize>,
}

impl ContactSolver {
    /// Create an empty solver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored manifolds, in solving order.
    #[must_use]
    pub fn manifolds(&self) -> &[ContactManifold] {
        &self.manifolds
    }

    /// Remove every stored manifold.
    pub fn clear(&mut self) {
        self.manifolds.clear();
        self.slots.clear();
    }

    /// Flag every manifold obsolete ahead of the narrow phase.
    pub(crate) fn mark_all_obsolete(&mut self) {
        for manifold in &mut self.manifolds {
            manifold.mark_obsolete();
        }
    }

    /// Fold one narrow-phase result into the store: update the existing
    /// manifold for the pair, or insert a new one.
    pub(crate) fn merge(&mut self, bodies: &[Body], manifold: &CollisionManifold) {
        debug_assert!(manifold.count > 0);

        let key = pair_key(manifold.body_a, manifold.body_b);
        if let Some(&slot) = self.slots.get(&key) {
            self.manifolds[slot].update(manifold);
        } else {
            let body_a = &bodies[manifold.body_a.raw() as usize];
            let body_b = &bodies[manifold.body_b.raw() as usize];
            self.slots.insert(key, self.manifolds.len());
            self.manifolds
                .push(ContactManifold::new(body_a, body_b, manifold));
        }
    }

    /// Drop all manifolds still flagged obsolete; returns how many were
    /// removed.
    pub(crate) fn remove_obsolete(&mut self) -> usize {
        let mut removed = 0;
        let mut slot = 0;
        while slot < self.manifolds.len() {
            if self.manifolds[slot].is_obsolete() {
                let stale = &self.manifolds[slot];
                self.slots.remove(&pair_key(stale.body_a(), stale.body_b()));
                self.manifolds.swap_remove(slot);
                removed += 1;

                // Rewire the slot of the manifold that filled the hole
                if let Some(moved) = self.manifolds.get(slot) {
                    let moved_key = pair_key(moved.body_a(), moved.body_b());
                    if let Some(entry) = self.slots.get_mut(&moved_key) {
                        *entry = slot;
                    }
                }
            } else {
                slot += 1;
            }
        }
        removed
    }

    /// Compute arms and effective masses and apply warm-start impulses
    /// for every contact.
    pub(crate) fn prepare(&mut self, bodies: &mut [Body]) {
        for manifold in &mut self.manifolds {
            let (body_a, body_b) = body_pair_mut(bodies, manifold.body_a(), manifold.body_b());
            manifold.prepare(body_a, body_b);
        }
    }

    /// Run the sequential-impulse velocity passes.
    pub(crate) fn solve_velocities(&mut self, bodies: &mut [Body], iterations: u32) {
        for _ in 0..iterations {
            for manifold in &mut self.manifolds {
                let (body_a, body_b) = body_pair_mut(bodies, manifold.body_a(), manifold.body_b());
                manifold.solve_velocities(body_a, body_b);
            }
        }
    }

    /// Run the position-correction passes.
    pub(crate) fn solve_positions(&mut self, bodies: &mut [Body], iterations: u32) {
        for _ in 0..iterations {
            for manifold in &mut self.manifolds {
                let (body_a, body_b) = body_pair_mut(bodies, manifold.body_a(), manifold.body_b());
                manifold.solve_positions(body_a, body_b);
            }
        }
    }
}
