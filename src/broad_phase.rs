//! Broad-phase collision detection: sweep-and-prune along the x-axis.
//!
//! The broad phase rebuilds every body's world-space [`Aabb`] each step,
//! keeps one sorted endpoint list (two endpoints per body) for the
//! x-axis, and sweeps it to emit candidate pairs. Because inter-step
//! motion is small, the endpoint list stays nearly sorted between steps
//! and re-sorting is cheap.
//!
//! Candidate pairs are filtered during the sweep: static-static pairs
//! are dropped, as are pairs whose y-extents do not overlap. Surviving
//! pairs are reported with the smaller body index first, in an order
//! that is a deterministic function of the endpoint ordering.

use crate::body::Body;
use crate::math::{Rotation, Vec2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box.
///
/// # Example
///
/// ```
/// use rigid2d::{Aabb, Vec2};
///
/// let a = Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0));
/// let b = Aabb::from_center(Vec2::new(1.0, 1.0), Vec2::new(0.5, 0.5));
/// assert!(a.overlaps(&b));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec2,
    /// Maximum corner.
    pub max: Vec2,
}

impl Aabb {
    /// Create an AABB from its corners.
    ///
    /// Debug builds assert `min <= max` componentwise.
    #[must_use]
    pub fn new(min: Vec2, max: Vec2) -> Self {
        debug_assert!(min.x <= max.x && min.y <= max.y);
        Self { min, max }
    }

    /// Create an AABB centered at a point with the given half-extents.
    #[must_use]
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Compute the world-space AABB of an oriented box.
    ///
    /// The world-aligned half-extents are `|R| · h`, the componentwise
    /// absolute value of the rotation matrix applied to the half-size.
    /// This is exact for axis-aligned boxes.
    #[must_use]
    pub fn of_oriented_box(position: Vec2, rotation: &Rotation, half_size: Vec2) -> Self {
        let extents = rotation.mat().abs() * half_size;
        Self::from_center(position, extents)
    }

    /// Check whether this AABB overlaps another.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

/// One end of a body's x-axis interval.
#[derive(Debug, Clone, Copy)]
struct Endpoint {
    /// Coordinate on the sweep axis.
    position: f32,
    /// Body index owning this endpoint.
    index: u32,
    /// Whether this is the interval start (`min.x`) or end (`max.x`).
    is_start: bool,
}

impl Endpoint {
    /// Sort order: ascending position; at equal positions, ends precede
    /// starts so that touching-but-disjoint intervals do not overlap.
    fn sort_key(&self) -> (f32, bool) {
        (self.position, self.is_start)
    }
}

/// Sweep-and-prune broad phase over the world's body array.
///
/// Holds the per-body AABBs, the persistent endpoint list, the active
/// set used during the sweep, and the candidate pairs produced by the
/// last [`SweepAndPrune::update`].
#[derive(Debug, Clone, Default)]
pub struct SweepAndPrune {
    /// AABB per body, rebuilt from scratch each update.
    aabbs: Vec<Aabb>,
    /// Two endpoints per body, kept across updates for sort coherence.
    endpoints: Vec<Endpoint>,
    /// Bodies whose start has been swept but not their end.
    active: Vec<u32>,
    /// Slot of each live body within `active`, for O(1) removal.
    active_mapping: Vec<u32>,
    /// Candidate pairs from the last update, smaller index first.
    pairs: Vec<(u32, u32)>,
}

impl SweepAndPrune {
    /// Create an empty broad phase.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// AABBs computed by the last update, indexed by body.
    #[must_use]
    pub fn aabbs(&self) -> &[Aabb] {
        &self.aabbs
    }

    /// Candidate pairs from the last update, smaller index first.
    #[must_use]
    pub fn pairs(&self) -> &[(u32, u32)] {
        &self.pairs
    }

    /// Drop all cached state.
    pub fn clear(&mut self) {
        self.aabbs.clear();
        self.endpoints.clear();
        self.active.clear();
        self.active_mapping.clear();
        self.pairs.clear();
    }

    /// Recompute AABBs and candidate pairs for the current body array.
    pub fn update(&mut self, bodies: &[Body]) {
        self.aabbs.clear();
        self.aabbs.reserve(bodies.len());
        for body in bodies {
            self.aabbs.push(Aabb::of_oriented_box(
                body.position,
                &body.rotation,
                body.half_size(),
            ));
        }

        self.active_mapping.resize(bodies.len(), 0);
        // The endpoint list can only exceed two per body after a clear()
        if self.endpoints.len() > bodies.len() * 2 {
            self.endpoints.clear();
        }

        // Append endpoints for bodies added since the last update
        debug_assert!(self.endpoints.len() % 2 == 0);
        for index in (self.endpoints.len() / 2)..bodies.len() {
            let index = index as u32;
            self.endpoints.push(Endpoint {
                position: 0.0,
                index,
                is_start: true,
            });
            self.endpoints.push(Endpoint {
                position: 0.0,
                index,
                is_start: false,
            });
        }

        for endpoint in &mut self.endpoints {
            let aabb = &self.aabbs[endpoint.index as usize];
            endpoint.position = if endpoint.is_start {
                aabb.min.x
            } else {
                aabb.max.x
            };
        }

        // Nearly sorted from the previous step; the standard adaptive
        // sort handles that in close to linear time
        self.endpoints.sort_by(|a, b| {
            a.sort_key()
                .partial_cmp(&b.sort_key())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        self.sweep(bodies);
    }

    /// Walk the sorted endpoints, maintaining the active set and
    /// emitting filtered candidate pairs.
    fn sweep(&mut self, bodies: &[Body]) {
        self.pairs.clear();
        self.active.clear();

        for endpoint in &self.endpoints {
            if endpoint.is_start {
                let i1 = endpoint.index;
                let body_a = &bodies[i1 as usize];
                let aabb_a = &self.aabbs[i1 as usize];

                for &i2 in &self.active {
                    if body_a.is_static() && bodies[i2 as usize].is_static() {
                        continue;
                    }

                    let aabb_b = &self.aabbs[i2 as usize];
                    if aabb_a.max.y < aabb_b.min.y || aabb_b.max.y < aabb_a.min.y {
                        continue;
                    }

                    self.pairs.push(if i1 < i2 { (i1, i2) } else { (i2, i1) });
                }
                self.active_mapping[i1 as usize] = self.active.len() as u32;
                self.active.push(i1);
            } else {
                // Swap and pop
                let slot = self.active_mapping[endpoint.index as usize] as usize;
                let last = self.active[self.active.len() - 1];
                self.active[slot] = last;
                self.active_mapping[last as usize] = slot as u32;
                self.active.pop();
            }
        }
    }
}
