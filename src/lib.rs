//! Impulse-based 2D rigid-body physics core.
//!
//! This crate simulates oriented boxes under gravity with persistent,
//! warm-started contacts: a sweep-and-prune broad phase, a box-box
//! SAT-with-clipping narrow phase producing feature-tagged manifolds of
//! up to two points, a Gauss–Seidel sequential-impulse velocity solver
//! with dry Coulomb friction, and a position-based penetration
//! corrector.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          World                               │
//! │  step(dt): gravity → collision → solve → integrate → correct │
//! └───────┬──────────────────┬──────────────────────┬────────────┘
//!         │                  │                      │
//!         ▼                  ▼                      ▼
//! ┌───────────────┐  ┌───────────────┐  ┌────────────────────────┐
//! │  SweepAndPrune│  │  narrow phase │  │     ContactSolver      │
//! │  AABBs, pairs │  │  SAT+clipping │  │  persistent manifolds, │
//! │  along x-axis │  │  feature tags │  │  warm-started impulses │
//! └───────────────┘  └───────────────┘  └────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```
//! use rigid2d::{Vec2, World, WorldConfig};
//!
//! let mut world = World::new(WorldConfig::default());
//!
//! // A static floor (mass 0) and a dynamic box above it
//! world.add_body(Vec2::new(100.0, 1.0), 0.0, 0.5, Vec2::new(0.0, -0.5), 0.0);
//! let body = world
//!     .add_body(Vec2::new(1.0, 1.0), 1.0, 0.5, Vec2::new(0.0, 3.0), 0.0)
//!     .unwrap();
//!
//! // Simulate five seconds at 60 Hz
//! for _ in 0..300 {
//!     world.step(1.0 / 60.0);
//! }
//!
//! // The box rests on the floor with its contacts available for
//! // inspection
//! assert!((world.body(body).unwrap().position.y - 0.5).abs() < 0.02);
//! assert!(!world.manifolds().is_empty());
//! ```
//!
//! # Determinism
//!
//! A step is synchronous and allocation-light; contact manifolds are
//! stored densely and solved in a deterministic order, so two runs with
//! identical inputs and iteration counts produce bit-identical body
//! states on the same platform.
//!
//! # Preconditions
//!
//! Invalid inputs (non-positive sizes, negative mass, friction outside
//! `[0, 1]`, non-positive timesteps, zero velocity iterations) are
//! programming errors: they are asserted in debug builds and undefined
//! past the assertion in release builds. The checked paths
//! ([`WorldConfig::validate`], [`Body::validate`]) are available for
//! untrusted input. The only runtime condition reported to callers is
//! capacity exhaustion: [`World::add_body`] returns `None` once the
//! body count reaches `u32::MAX`.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,   // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,       // mul_add style changes aren't always clearer
)]

mod body;
mod broad_phase;
mod contact;
mod error;
mod math;
mod narrow_phase;
mod solver;
mod world;

pub use body::{Body, BodyIndex};
pub use broad_phase::{Aabb, SweepAndPrune};
pub use contact::{ContactManifold, ContactPoint};
pub use error::PhysicsError;
pub use math::{cross, cross_vz, cross_zv, Mat2, Rotation, Vec2};
pub use narrow_phase::{
    box_box_collision, CollisionManifold, CollisionPoint, FeaturePair, GeometryFeature,
    MAX_CONTACT_POINTS,
};
pub use solver::ContactSolver;
pub use world::{World, WorldConfig};

/// Result type for checked configuration paths.
pub type Result<T> = std::result::Result<T, PhysicsError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn dropped_box_comes_to_rest() {
        let mut world = World::new(WorldConfig::default());
        world.add_body(Vec2::new(100.0, 1.0), 0.0, 0.5, Vec2::new(0.0, -0.5), 0.0);
        let body = world
            .add_body(Vec2::new(1.0, 1.0), 1.0, 0.5, Vec2::new(0.0, 2.0), 0.0)
            .unwrap();

        for _ in 0..240 {
            world.step(DT);
        }

        let body = world.body(body).unwrap();
        assert!(
            (body.position.y - 0.5).abs() < 0.02,
            "box should rest on the floor: y = {}",
            body.position.y
        );
        assert!(
            body.linear_velocity.norm() < 0.05,
            "box should have settled: speed = {}",
            body.linear_velocity.norm()
        );
    }

    #[test]
    fn momentum_is_conserved_without_gravity_or_statics() {
        let mut world = World::new(WorldConfig::default().zero_gravity());
        let left = world
            .add_body(Vec2::new(1.0, 1.0), 1.0, 0.2, Vec2::new(-1.0, 0.0), 0.0)
            .unwrap();
        let right = world
            .add_body(Vec2::new(1.0, 1.0), 1.0, 0.2, Vec2::new(1.0, 0.0), 0.0)
            .unwrap();
        world.body_mut(left).unwrap().linear_velocity = Vec2::new(2.0, 0.0);
        world.body_mut(right).unwrap().linear_velocity = Vec2::new(-2.0, 0.0);

        for _ in 0..120 {
            world.step(DT);
        }

        let total = world
            .bodies()
            .iter()
            .fold(Vec2::zeros(), |acc, b| acc + b.mass() * b.linear_velocity);
        assert!(
            total.norm() < 1e-4,
            "momentum should be conserved: {total:?}"
        );
    }

    #[test]
    fn contact_invariants_hold_while_settling() {
        let mut world = World::new(WorldConfig::default());
        world.add_body(Vec2::new(100.0, 1.0), 0.0, 0.5, Vec2::new(0.0, -0.5), 0.0);
        world.add_body(Vec2::new(1.0, 1.0), 1.0, 0.5, Vec2::new(0.1, 1.0), 0.05);

        for _ in 0..120 {
            world.step(DT);
            for manifold in world.manifolds() {
                assert!(manifold.body_a() < manifold.body_b());
                for contact in manifold.contacts() {
                    let point = contact.point();
                    assert!((point.normal.norm() - 1.0).abs() < 1e-4);
                    assert!(point.penetration >= 0.0);
                    assert!(point.feature_pair[0] <= point.feature_pair[1]);
                    assert!(contact.normal_impulse() >= 0.0);
                    assert!(
                        contact.tangent_impulse().abs()
                            <= manifold.friction() * contact.normal_impulse() + 1e-5
                    );
                }
            }
        }
    }
}
