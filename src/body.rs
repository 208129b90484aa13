//! Box-shaped rigid bodies.
//!
//! A [`Body`] couples immutable shape and mass attributes (fixed at
//! construction, with their derived inverses) with mutable kinematic
//! state (pose and velocities). Bodies live in an append-only array
//! owned by the world and are referenced everywhere else by
//! [`BodyIndex`], which stays valid across storage growth.

use crate::error::PhysicsError;
use crate::math::{Rotation, Vec2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable handle of a body within a world.
///
/// Bodies are never removed individually (only [`crate::World::clear`]
/// empties the world), so an index handed out by
/// [`crate::World::add_body`] stays valid for the world's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyIndex(pub u32);

impl BodyIndex {
    /// Create a body index from a raw slot number.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the raw slot number.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for BodyIndex {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

impl std::fmt::Display for BodyIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "body({})", self.0)
    }
}

/// A box-shaped rigid body.
///
/// Shape and mass attributes are fixed at construction and exposed
/// through getters; kinematic state is public and freely mutable.
/// A body with zero mass is *static*: its inverse mass and inverse
/// inertia are zero, so it absorbs impulses without moving, and the
/// world skips it when applying gravity.
///
/// # Example
///
/// ```
/// use rigid2d::{Body, Vec2};
///
/// let body = Body::new(Vec2::new(1.0, 1.0), 1.0, 0.5);
/// // Moment of inertia of a unit-mass unit box
/// assert!((body.inertia() - 1.0 / 6.0).abs() < 1e-6);
/// assert!(!body.is_static());
///
/// let wall = Body::new(Vec2::new(10.0, 1.0), 0.0, 0.5);
/// assert!(wall.is_static());
/// assert_eq!(wall.inv_mass(), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// Half extents (width / 2, height / 2).
    half_size: Vec2,
    /// Mass in kg; 0 denotes a static body.
    mass: f32,
    /// Inverse mass; 0 for static bodies.
    inv_mass: f32,
    /// Moment of inertia about the center of mass; 0 for static bodies.
    inertia: f32,
    /// Inverse moment of inertia; 0 for static bodies.
    inv_inertia: f32,
    /// Friction coefficient in [0, 1].
    friction: f32,

    /// Position of the center of mass in world space.
    pub position: Vec2,
    /// Orientation.
    pub rotation: Rotation,
    /// Linear velocity (m/s).
    pub linear_velocity: Vec2,
    /// Angular velocity (rad/s).
    pub angular_velocity: f32,
}

impl Body {
    /// Create a body from its full size, mass, and friction coefficient.
    ///
    /// A mass of 0 produces a static body. The moment of inertia of the
    /// box is `mass * (width² + height²) / 12`.
    ///
    /// Debug builds assert the preconditions: `size > 0` componentwise,
    /// `mass >= 0`, `friction` in `[0, 1]`.
    #[must_use]
    pub fn new(size: Vec2, mass: f32, friction: f32) -> Self {
        debug_assert!(size.x > 0.0 && size.y > 0.0);
        debug_assert!(mass >= 0.0);
        debug_assert!((0.0..=1.0).contains(&friction));

        let inertia = box_inertia(size, mass);
        Self {
            half_size: 0.5 * size,
            mass,
            inv_mass: if mass == 0.0 { 0.0 } else { 1.0 / mass },
            inertia,
            inv_inertia: if mass == 0.0 { 0.0 } else { 1.0 / inertia },
            friction,
            position: Vec2::zeros(),
            rotation: Rotation::default(),
            linear_velocity: Vec2::zeros(),
            angular_velocity: 0.0,
        }
    }

    /// Half extents (width / 2, height / 2).
    #[must_use]
    pub fn half_size(&self) -> Vec2 {
        self.half_size
    }

    /// Mass in kg; 0 for static bodies.
    #[must_use]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Inverse mass; 0 for static bodies.
    #[must_use]
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Moment of inertia about the center of mass; 0 for static bodies.
    #[must_use]
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    /// Inverse moment of inertia; 0 for static bodies.
    #[must_use]
    pub fn inv_inertia(&self) -> f32 {
        self.inv_inertia
    }

    /// Friction coefficient in [0, 1].
    #[must_use]
    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// Whether the body is static (immovable).
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.mass == 0.0
    }

    /// Validate the body attributes.
    ///
    /// The same conditions are debug-asserted by [`Body::new`]; this
    /// checked form is for callers constructing bodies from untrusted
    /// input.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidBody`] if the size is not strictly
    /// positive, the mass is negative or non-finite, or the friction
    /// coefficient lies outside `[0, 1]`.
    pub fn validate(&self) -> crate::Result<()> {
        if !(self.half_size.x > 0.0 && self.half_size.y > 0.0) {
            return Err(PhysicsError::invalid_body("size must be positive"));
        }
        if !self.mass.is_finite() || self.mass < 0.0 {
            return Err(PhysicsError::invalid_body(
                "mass must be finite and non-negative",
            ));
        }
        if !(0.0..=1.0).contains(&self.friction) {
            return Err(PhysicsError::invalid_body("friction must be in [0, 1]"));
        }
        Ok(())
    }
}

/// Moment of inertia of a solid box from its full size.
fn box_inertia(size: Vec2, mass: f32) -> f32 {
    mass * size.norm_squared() / 12.0
}
