//! 2D math primitives for the physics core.
//!
//! The heavy lifting is delegated to [`nalgebra`]; this module adds only
//! what a planar rigid-body engine needs on top of a general-purpose
//! linear-algebra crate:
//!
//! - the two scalar-z cross products of the xy-plane convention
//! - [`Rotation`], an angle paired with its cached rotation matrix
//!
//! # Coordinate conventions
//!
//! Vectors live in the xy-plane; angular quantities are the z-component
//! of the corresponding 3D vector. Positive angles rotate counter-clockwise.

use nalgebra::{Matrix2, Vector2};

/// 2D vector of single-precision floats.
pub type Vec2 = Vector2<f32>;

/// 2×2 matrix of single-precision floats.
pub type Mat2 = Matrix2<f32>;

/// Cross product of two xy vectors.
///
/// Returns the scalar z-component of the 3D cross product.
///
/// # Example
///
/// ```
/// use rigid2d::{cross, Vec2};
///
/// assert_eq!(cross(Vec2::x(), Vec2::y()), 1.0);
/// assert_eq!(cross(Vec2::y(), Vec2::x()), -1.0);
/// ```
#[must_use]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.perp(&b)
}

/// Cross product of an xy vector and a z-axis scalar.
///
/// Rotates `v` by -90° for positive `z`, scaled by `|z|`.
#[must_use]
pub fn cross_vz(v: Vec2, z: f32) -> Vec2 {
    Vec2::new(v.y * z, -v.x * z)
}

/// Cross product of a z-axis scalar and an xy vector.
///
/// Rotates `v` by +90° for positive `z`, scaled by `|z|`. This is the
/// velocity contribution of an angular velocity `z` at the arm `v`.
#[must_use]
pub fn cross_zv(z: f32, v: Vec2) -> Vec2 {
    Vec2::new(-v.y * z, v.x * z)
}

/// A planar rotation: an angle in radians together with its cached
/// rotation matrix.
///
/// The matrix is recomputed on every angle mutation, so the two
/// representations can never drift apart. There is deliberately no way
/// to set the matrix independently of the angle.
///
/// # Example
///
/// ```
/// use rigid2d::{Rotation, Vec2};
///
/// let mut rotation = Rotation::new(0.0);
/// rotation.set_angle(std::f32::consts::FRAC_PI_2);
///
/// let rotated = rotation.mat() * Vec2::x();
/// assert!((rotated.y - 1.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    /// Angle in radians.
    angle: f32,
    /// Cached rotation matrix for `angle`.
    mat: Mat2,
}

impl Default for Rotation {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Rotation {
    /// Create a rotation from an angle in radians.
    #[must_use]
    pub fn new(angle: f32) -> Self {
        Self {
            angle,
            mat: rotation_mat(angle),
        }
    }

    /// Get the rotation angle in radians.
    #[must_use]
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Set the rotation angle in radians, refreshing the cached matrix.
    pub fn set_angle(&mut self, angle: f32) {
        self.angle = angle;
        self.mat = rotation_mat(angle);
    }

    /// Get the rotation matrix.
    #[must_use]
    pub fn mat(&self) -> &Mat2 {
        &self.mat
    }

    /// Get the inverse rotation matrix (the transpose).
    #[must_use]
    pub fn inverse_mat(&self) -> Mat2 {
        self.mat.transpose()
    }

    /// Get a local axis (matrix column) in world space.
    ///
    /// Axis 0 is the rotated local x-axis, axis 1 the rotated local y-axis.
    #[must_use]
    pub fn axis(&self, index: usize) -> Vec2 {
        self.mat.column(index).into_owned()
    }
}

/// Build the rotation matrix for an angle in radians.
fn rotation_mat(angle: f32) -> Mat2 {
    let (sin, cos) = angle.sin_cos();
    Mat2::new(cos, -sin, sin, cos)
}
