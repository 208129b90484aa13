//! Narrow-phase collision detection for oriented boxes.
//!
//! [`box_box_collision`] runs the separating-axis test over the four
//! face normals of the two boxes, picks the face of minimum penetration
//! as the reference face, selects the most anti-parallel face of the
//! other box as the incident edge, and clips that edge against the
//! reference side planes (Sutherland–Hodgman). Up to two contact points
//! survive, each tagged with the pair of geometry features (box index +
//! edge index) that produced it.
//!
//! The feature tags are what make contacts *persistent*: a point whose
//! feature pair matches one from the previous step is the same physical
//! contact, and the solver can warm-start it with last step's impulses.
//!
//! Edge and vertex numbering on a box, in its local frame:
//!
//! ```text
//!        e0
//!    v1      v0
//!    |        |
//! e1 |        | e3
//!    |        |
//!    v2      v3
//!        e2
//! ```

use crate::body::BodyIndex;
use crate::math::{Rotation, Vec2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum number of contact points between two boxes.
pub const MAX_CONTACT_POINTS: usize = 2;

/// One geometric feature of a box pair: which box, which edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeometryFeature {
    /// Box index within the pair (0 or 1).
    pub geometry: u8,
    /// Edge index on that box (0-3).
    pub edge: u8,
}

impl GeometryFeature {
    /// Create a feature from a box index and an edge index.
    #[must_use]
    pub const fn new(geometry: u8, edge: u8) -> Self {
        Self { geometry, edge }
    }
}

/// The two features that produced a contact point, in canonical
/// (lexicographic) order so lookups are orientation-independent.
pub type FeaturePair = [GeometryFeature; 2];

/// A single contact point produced by the narrow phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionPoint {
    /// Contact position in world space, on the reference face.
    pub position: Vec2,
    /// Unit contact normal, pointing from body A to body B.
    pub normal: Vec2,
    /// Penetration depth (non-negative).
    pub penetration: f32,
    /// The features yielding this point, in canonical order.
    pub feature_pair: FeaturePair,
    /// Which box of the pair provided the reference face (0 or 1).
    pub clip_box_index: usize,
    /// Contact position in each body's local frame.
    pub local_points: [Vec2; 2],
    /// Unit contact normal in the reference box's local frame.
    pub local_contact_normal: Vec2,
}

impl CollisionPoint {
    /// Create a collision point.
    ///
    /// Debug builds assert a unit-length normal and a non-negative
    /// penetration.
    #[must_use]
    pub fn new(
        position: Vec2,
        normal: Vec2,
        penetration: f32,
        feature_pair: FeaturePair,
        clip_box_index: usize,
        local_points: [Vec2; 2],
        local_contact_normal: Vec2,
    ) -> Self {
        debug_assert!((normal.norm() - 1.0).abs() <= 1e-5);
        debug_assert!(penetration >= 0.0);
        debug_assert!(clip_box_index < 2);
        Self {
            position,
            normal,
            penetration,
            feature_pair,
            clip_box_index,
            local_points,
            local_contact_normal,
        }
    }
}

impl Default for CollisionPoint {
    /// Placeholder value for the unused slots of a fixed-size point
    /// array; never read past a manifold's point count.
    fn default() -> Self {
        Self {
            position: Vec2::zeros(),
            normal: Vec2::zeros(),
            penetration: 0.0,
            feature_pair: FeaturePair::default(),
            clip_box_index: 0,
            local_points: [Vec2::zeros(); 2],
            local_contact_normal: Vec2::zeros(),
        }
    }
}

/// Contact manifold between two bodies for one step, as reported by the
/// narrow phase.
#[derive(Debug, Clone, Copy)]
pub struct CollisionManifold {
    /// First body of the pair; always the smaller index.
    pub body_a: BodyIndex,
    /// Second body of the pair.
    pub body_b: BodyIndex,
    /// Contact points; only the first `count` entries are meaningful.
    pub points: [CollisionPoint; MAX_CONTACT_POINTS],
    /// Number of valid contact points (0-2).
    pub count: usize,
}

impl CollisionManifold {
    /// Create an empty manifold for a body pair.
    ///
    /// Debug builds assert `body_a < body_b`.
    #[must_use]
    pub fn new(body_a: BodyIndex, body_b: BodyIndex) -> Self {
        debug_assert!(body_a < body_b);
        Self {
            body_a,
            body_b,
            points: [CollisionPoint::default(); MAX_CONTACT_POINTS],
            count: 0,
        }
    }

    /// The valid contact points.
    #[must_use]
    pub fn points(&self) -> &[CollisionPoint] {
        &self.points[..self.count]
    }
}

/// A line in the plane: unit normal and signed offset from the origin.
#[derive(Debug, Clone, Copy)]
struct Plane {
    normal: Vec2,
    offset: f32,
}

impl Plane {
    /// Plane through `origin`, pushed `extra` along `normal`.
    fn new(normal: Vec2, origin: Vec2, extra: f32) -> Self {
        Self {
            normal,
            offset: normal.dot(&origin) + extra,
        }
    }

    /// Signed distance from the plane to a point.
    fn distance(&self, point: Vec2) -> f32 {
        self.normal.dot(&point) - self.offset
    }
}

/// An endpoint of the incident edge as it is clipped.
#[derive(Debug, Clone, Copy, Default)]
struct ClippedPoint {
    position: Vec2,
    feature_pair: FeaturePair,
}

/// The incident edge: two endpoints.
type ClippedEdge = [ClippedPoint; 2];

/// Clip an edge against a half-space, keeping points with signed
/// distance <= 0.
///
/// When the edge straddles the plane, the intersection point is emitted
/// in place of the outside endpoint; its feature pair is taken from the
/// outside endpoint with that endpoint's slot overwritten by the
/// clipping box and edge. Returns whether two points survived.
fn clip_edge_by_plane(
    source: &ClippedEdge,
    plane: &Plane,
    clip_box: u8,
    clip_edge: u8,
    target: &mut ClippedEdge,
) -> bool {
    let distances = [
        plane.distance(source[0].position),
        plane.distance(source[1].position),
    ];

    let mut count = 0;
    for pi in 0..2 {
        if distances[pi] <= 0.0 {
            target[count] = source[pi];
            count += 1;
        }
    }

    if count == 1 && distances[0] * distances[1] < 0.0 {
        let lerp_factor = distances[0] / (distances[0] - distances[1]);
        let outside = usize::from(distances[0] <= 0.0);

        let point = &mut target[count];
        point.position =
            source[0].position + lerp_factor * (source[1].position - source[0].position);
        point.feature_pair = source[outside].feature_pair;
        point.feature_pair[outside] = GeometryFeature::new(clip_box, clip_edge);
        count += 1;
    }
    count == 2
}

/// Vertex sign conventions: v0(+,+), v1(-,+), v2(-,-), v3(+,-).
const VERTEX_SIGNS: [[f32; 2]; 4] = [[1.0, 1.0], [-1.0, 1.0], [-1.0, -1.0], [1.0, -1.0]];

/// Compute the contact points between two oriented boxes.
///
/// Writes up to [`MAX_CONTACT_POINTS`] points into `out` and returns
/// how many were produced; 0 means the boxes are separated (a
/// separating axis exists, i.e. some axis overlap is not strictly
/// positive).
///
/// Debug builds assert strictly positive half-sizes.
#[allow(clippy::similar_names)]
pub fn box_box_collision(
    positions: [Vec2; 2],
    rotations: [&Rotation; 2],
    half_sizes: [Vec2; 2],
    out: &mut [CollisionPoint; MAX_CONTACT_POINTS],
) -> usize {
    debug_assert!(half_sizes[0].x > 0.0 && half_sizes[0].y > 0.0);
    debug_assert!(half_sizes[1].x > 0.0 && half_sizes[1].y > 0.0);

    let inv_rotations = [rotations[0].inverse_mat(), rotations[1].inverse_mat()];
    let centers_vec = positions[1] - positions[0];

    // Step 1: find the axis of minimum penetration, or a separating axis.
    // Fixed iteration order (box 0 x, box 0 y, box 1 x, box 1 y) with
    // first-minimum-wins keeps the reference face deterministic when
    // overlaps tie.
    let mut clip_box = 0;
    let mut clip_axis = 0;
    let mut min_penetration = f32::MAX;
    for bi in 0..2 {
        let rel_abs = (inv_rotations[bi] * rotations[1 - bi].mat()).abs();
        let local_centers = (inv_rotations[bi] * centers_vec).abs();
        let other_extents = rel_abs * half_sizes[1 - bi];

        for ai in 0..2 {
            let penetration = half_sizes[bi][ai] + other_extents[ai] - local_centers[ai];
            if penetration <= 0.0 {
                return 0;
            }
            if penetration < min_penetration {
                min_penetration = penetration;
                clip_box = bi;
                clip_axis = ai;
            }
        }
    }

    // Reference normal, directed from box 0 to box 1
    let mut min_penetration_dir = rotations[clip_box].axis(clip_axis);
    if min_penetration_dir.dot(&centers_vec) < 0.0 {
        min_penetration_dir = -min_penetration_dir;
    }

    // The clip normal points out of the reference face toward the
    // incident box, so it flips when box 1 is the reference
    let clip_normal = if clip_box == 0 {
        min_penetration_dir
    } else {
        -min_penetration_dir
    };

    // Step 2: pick the incident edge, the face of the other box most
    // anti-parallel to the clip normal.
    let incident_box = 1 - clip_box;
    let mut edge = ClippedEdge::default();
    {
        let incident_dir = -(inv_rotations[incident_box] * clip_normal);
        let incident_edge = if incident_dir.x.abs() > incident_dir.y.abs() {
            if incident_dir.x > 0.0 {
                3
            } else {
                1
            }
        } else if incident_dir.y > 0.0 {
            0
        } else {
            2
        };

        for (pi, point) in edge.iter_mut().enumerate() {
            let vertex = (incident_edge + pi) % 4;
            let local_position = Vec2::new(
                VERTEX_SIGNS[vertex][0] * half_sizes[incident_box].x,
                VERTEX_SIGNS[vertex][1] * half_sizes[incident_box].y,
            );
            // A vertex is where its edge meets the previous one
            point.feature_pair = [
                GeometryFeature::new(incident_box as u8, ((vertex + 3) % 4) as u8),
                GeometryFeature::new(incident_box as u8, vertex as u8),
            ];
            point.position =
                positions[incident_box] + rotations[incident_box].mat() * local_position;
        }
    }

    // Step 3: clip the incident edge against the two side planes of the
    // reference face.
    {
        let side_axis = 1 - clip_axis;
        let side_normal = rotations[clip_box].axis(side_axis);
        let side_extent = half_sizes[clip_box][side_axis];

        let side_plane_1 = Plane::new(side_normal, positions[clip_box], side_extent);
        // clip axis 0 (x-direction) -> edge 2, clip axis 1 -> edge 1
        let side_edge_1 = 2 - clip_axis;

        let side_plane_2 = Plane::new(-side_normal, positions[clip_box], side_extent);
        let side_edge_2 = (side_edge_1 + 2) % 4;

        let mut clipped = ClippedEdge::default();
        if !clip_edge_by_plane(
            &edge,
            &side_plane_1,
            clip_box as u8,
            side_edge_1 as u8,
            &mut clipped,
        ) || !clip_edge_by_plane(
            &clipped,
            &side_plane_2,
            clip_box as u8,
            side_edge_2 as u8,
            &mut edge,
        ) {
            return 0;
        }
    }

    // Step 4: keep the surviving points behind the reference face and
    // emit them as collision points.
    let clip_plane = Plane::new(
        clip_normal,
        positions[clip_box],
        half_sizes[clip_box][clip_axis],
    );

    let mut count = 0;
    for point in &mut edge {
        let penetration = -clip_plane.distance(point.position);
        if penetration < 0.0 {
            continue;
        }

        // Project the contact onto the reference face; the incident
        // body keeps the unprojected point in its local frame
        let position = point.position + penetration * clip_normal;
        let mut local_points = [Vec2::zeros(); 2];
        local_points[clip_box] = inv_rotations[clip_box] * (position - positions[clip_box]);
        local_points[incident_box] =
            inv_rotations[incident_box] * (point.position - positions[incident_box]);

        // Canonical feature order makes the pair independent of which
        // box ended up as the reference
        if point.feature_pair[1] < point.feature_pair[0] {
            point.feature_pair.swap(0, 1);
        }

        out[count] = CollisionPoint::new(
            position,
            min_penetration_dir,
            penetration,
            point.feature_pair,
            clip_box,
            local_points,
            inv_rotations[clip_box] * clip_normal,
        );
        count += 1;
    }
    count
}
