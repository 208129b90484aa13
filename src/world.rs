//! The simulation world and its step pipeline.
//!
//! [`World`] owns the append-only body array, the broad phase, and the
//! contact solver, and drives one fixed step through
//! [`World::step`]:
//!
//! 1. Apply gravity to dynamic bodies
//! 2. Mark all persistent manifolds obsolete
//! 3. Broad phase, then narrow phase on each candidate pair, folding
//!    non-empty results into the persistent store
//! 4. Reap manifolds that did not re-collide
//! 5. Prepare contacts (arms, effective masses, warm-start impulses)
//! 6. Sequential-impulse velocity iterations
//! 7. Integrate poses (semi-implicit Euler)
//! 8. Position-correction iterations
//!
//! A step is synchronous and single-threaded; it returns only once
//! positions have been corrected. Callers wanting parallelism run
//! independent worlds.

use crate::body::{Body, BodyIndex};
use crate::broad_phase::{Aabb, SweepAndPrune};
use crate::contact::ContactManifold;
use crate::error::PhysicsError;
use crate::math::{Rotation, Vec2};
use crate::narrow_phase::{box_box_collision, CollisionManifold};
use crate::solver::ContactSolver;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration of a [`World`].
///
/// # Example
///
/// ```
/// use rigid2d::{Vec2, WorldConfig};
///
/// let config = WorldConfig::default().with_gravity(Vec2::new(0.0, -9.81));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorldConfig {
    /// Gravity acceleration applied to dynamic bodies each step.
    pub gravity: Vec2,
    /// Number of sequential-impulse velocity iterations; must be positive.
    pub velocity_iterations: u32,
    /// Number of position-correction iterations; may be zero.
    pub position_iterations: u32,
    /// Body slots to pre-allocate.
    pub reserve_capacity: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -10.0),
            velocity_iterations: 15,
            position_iterations: 5,
            reserve_capacity: 0,
        }
    }
}

impl WorldConfig {
    /// Set the gravity vector.
    #[must_use]
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    /// Disable gravity.
    #[must_use]
    pub fn zero_gravity(mut self) -> Self {
        self.gravity = Vec2::zeros();
        self
    }

    /// Set both solver iteration counts.
    #[must_use]
    pub fn with_iterations(mut self, velocity: u32, position: u32) -> Self {
        self.velocity_iterations = velocity;
        self.position_iterations = position;
        self
    }

    /// Pre-allocate body storage.
    #[must_use]
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.reserve_capacity = capacity;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidConfig`] if the gravity vector is
    /// not finite or `velocity_iterations` is zero.
    pub fn validate(&self) -> crate::Result<()> {
        if !(self.gravity.x.is_finite() && self.gravity.y.is_finite()) {
            return Err(PhysicsError::invalid_config("gravity must be finite"));
        }
        if self.velocity_iterations == 0 {
            return Err(PhysicsError::invalid_config(
                "velocity iterations must be positive",
            ));
        }
        Ok(())
    }
}

/// A 2D rigid-body simulation world.
///
/// # Example
///
/// ```
/// use rigid2d::{Vec2, World, WorldConfig};
///
/// let mut world = World::new(WorldConfig::default());
///
/// // A static floor and a box dropped onto it
/// world.add_body(Vec2::new(100.0, 1.0), 0.0, 0.5, Vec2::new(0.0, -0.5), 0.0);
/// let falling = world
///     .add_body(Vec2::new(1.0, 1.0), 1.0, 0.5, Vec2::new(0.0, 2.0), 0.0)
///     .unwrap();
///
/// for _ in 0..300 {
///     world.step(1.0 / 60.0);
/// }
///
/// // The box has come to rest on the floor
/// let body = world.body(falling).unwrap();
/// assert!((body.position.y - 0.5).abs() < 0.02);
/// ```
#[derive(Debug, Clone)]
pub struct World {
    /// Append-only body storage; indices are stable handles.
    bodies: Vec<Body>,
    /// Gravity acceleration.
    gravity: Vec2,
    /// Sequential-impulse velocity iterations per step.
    velocity_iterations: u32,
    /// Position-correction iterations per step.
    position_iterations: u32,
    /// Broad-phase state.
    broad_phase: SweepAndPrune,
    /// Persistent contact store and solver.
    contact_solver: ContactSolver,
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl World {
    /// Create a world from a configuration.
    ///
    /// Debug builds assert the configuration is valid; use
    /// [`WorldConfig::validate`] first when handling untrusted input.
    #[must_use]
    pub fn new(config: WorldConfig) -> Self {
        debug_assert!(config.validate().is_ok());
        Self {
            bodies: Vec::with_capacity(config.reserve_capacity as usize),
            gravity: config.gravity,
            velocity_iterations: config.velocity_iterations,
            position_iterations: config.position_iterations,
            broad_phase: SweepAndPrune::new(),
            contact_solver: ContactSolver::new(),
        }
    }

    /// Add a box-shaped body and return its index.
    ///
    /// A mass of 0 creates a static body. Returns `None` once the body
    /// count has reached `u32::MAX`; no state changes in that case.
    ///
    /// Debug builds assert the body preconditions (see [`Body::new`]).
    pub fn add_body(
        &mut self,
        size: Vec2,
        mass: f32,
        friction: f32,
        position: Vec2,
        angle: f32,
    ) -> Option<BodyIndex> {
        if self.bodies.len() >= u32::MAX as usize {
            return None;
        }

        let index = BodyIndex(self.bodies.len() as u32);
        let mut body = Body::new(size, mass, friction);
        body.position = position;
        body.rotation = Rotation::new(angle);
        self.bodies.push(body);
        Some(index)
    }

    /// Remove all bodies and contacts.
    pub fn clear(&mut self) {
        tracing::debug!(bodies = self.bodies.len(), "clearing world");
        self.bodies.clear();
        self.broad_phase.clear();
        self.contact_solver.clear();
    }

    /// Gravity acceleration.
    #[must_use]
    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    /// Number of velocity iterations per step.
    #[must_use]
    pub fn velocity_iterations(&self) -> u32 {
        self.velocity_iterations
    }

    /// Number of position iterations per step.
    #[must_use]
    pub fn position_iterations(&self) -> u32 {
        self.position_iterations
    }

    /// Set the number of velocity iterations; must be positive.
    pub fn set_velocity_iterations(&mut self, iterations: u32) {
        debug_assert!(iterations > 0);
        self.velocity_iterations = iterations;
    }

    /// Set the number of position iterations.
    pub fn set_position_iterations(&mut self, iterations: u32) {
        self.position_iterations = iterations;
    }

    /// All bodies, indexed by [`BodyIndex`].
    #[must_use]
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Number of bodies in the world.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// A body by index.
    #[must_use]
    pub fn body(&self, index: BodyIndex) -> Option<&Body> {
        self.bodies.get(index.raw() as usize)
    }

    /// Mutable access to a body's kinematic state.
    #[must_use]
    pub fn body_mut(&mut self, index: BodyIndex) -> Option<&mut Body> {
        self.bodies.get_mut(index.raw() as usize)
    }

    /// Broad-phase AABBs from the last step, indexed by body.
    ///
    /// Empty until the first [`World::step`].
    #[must_use]
    pub fn aabbs(&self) -> &[Aabb] {
        self.broad_phase.aabbs()
    }

    /// The persistent contact manifolds after the last step.
    #[must_use]
    pub fn manifolds(&self) -> &[ContactManifold] {
        self.contact_solver.manifolds()
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// Debug builds assert `dt > 0`.
    pub fn step(&mut self, dt: f32) {
        debug_assert!(dt > 0.0);

        let gravity = self.gravity;
        let velocity_iterations = self.velocity_iterations;
        let position_iterations = self.position_iterations;

        let bodies = &mut self.bodies;
        let broad_phase = &mut self.broad_phase;
        let solver = &mut self.contact_solver;

        // 1. Apply gravity
        for body in bodies.iter_mut() {
            if !body.is_static() {
                body.linear_velocity += dt * gravity;
            }
        }

        // 2-3. Mark manifolds, detect collisions, fold into the store
        solver.mark_all_obsolete();
        broad_phase.update(bodies);
        for &(index_a, index_b) in broad_phase.pairs() {
            let body_a = &bodies[index_a as usize];
            let body_b = &bodies[index_b as usize];

            let mut manifold = CollisionManifold::new(BodyIndex(index_a), BodyIndex(index_b));
            manifold.count = box_box_collision(
                [body_a.position, body_b.position],
                [&body_a.rotation, &body_b.rotation],
                [body_a.half_size(), body_b.half_size()],
                &mut manifold.points,
            );

            if manifold.count > 0 {
                solver.merge(bodies, &manifold);
            }
        }

        // 4. Reap manifolds whose pair no longer collides
        let reaped = solver.remove_obsolete();
        tracing::trace!(
            pairs = broad_phase.pairs().len(),
            manifolds = solver.manifolds().len(),
            reaped,
            "collision update"
        );

        // 5-6. Solve velocities
        solver.prepare(bodies);
        solver.solve_velocities(bodies, velocity_iterations);

        // 7. Integrate poses
        for body in bodies.iter_mut() {
            body.position += dt * body.linear_velocity;
            let angle = body.rotation.angle() + dt * body.angular_velocity;
            body.rotation.set_angle(angle);
        }

        // 8. Correct residual penetration
        solver.solve_positions(bodies, position_iterations);
    }
}
