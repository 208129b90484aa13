//! Contact constraints and the impulse math that resolves them.
//!
//! A [`ContactPoint`] wraps a narrow-phase [`CollisionPoint`] with the
//! solver-side state derived from it: contact arms, effective masses
//! along the normal and tangent, and the *accumulated* impulses that
//! survive across steps for warm starting.
//!
//! A [`ContactManifold`] is the persistent per-pair record: up to two
//! contact points, the pair's cached friction coefficient, and the
//! obsolescence flag driven by the store's mark-and-sweep lifecycle.
//!
//! The velocity pass is a Gauss–Seidel sequential-impulse scheme: the
//! accumulated normal impulse is clamped non-negative (unilateral
//! contact), and the accumulated tangent impulse is clamped into the
//! Coulomb cone of the *current* normal accumulator. The position pass
//! corrects residual penetration by moving poses directly; it never
//! touches velocities.

use crate::body::{Body, BodyIndex};
use crate::math::{cross, cross_vz, cross_zv, Vec2};
use crate::narrow_phase::{CollisionManifold, CollisionPoint, MAX_CONTACT_POINTS};

/// Fraction of the excess penetration corrected per position pass.
const POSITION_CORRECTION_FACTOR: f32 = 0.2;

/// Penetration below this is left alone, preventing jitter at rest.
const PENETRATION_SLOP: f32 = 0.001;

/// Apply an impulse to a body at an arm from its center of mass.
fn apply_at(body: &mut Body, arm: Vec2, impulse: Vec2) {
    body.linear_velocity += body.inv_mass() * impulse;
    body.angular_velocity += body.inv_inertia() * cross(arm, impulse);
}

/// Effective mass of the body pair along `direction` at the given arms.
///
/// Finite whenever at least one body is dynamic; static-static pairs
/// are filtered out upstream.
fn effective_mass(body_a: &Body, body_b: &Body, arm_a: Vec2, arm_b: Vec2, direction: Vec2) -> f32 {
    let cross_a = cross(arm_a, direction);
    let cross_b = cross(arm_b, direction);
    let inv_result = body_a.inv_mass()
        + body_b.inv_mass()
        + body_a.inv_inertia() * cross_a * cross_a
        + body_b.inv_inertia() * cross_b * cross_b;
    debug_assert!(inv_result > 0.0);
    1.0 / inv_result
}

/// A contact point under solver control.
#[derive(Debug, Clone, Copy)]
pub struct ContactPoint {
    /// The underlying narrow-phase point.
    point: CollisionPoint,
    /// Tangent direction (normal rotated -90°).
    tangent: Vec2,
    /// Arm from body A's center of mass to the contact.
    offset_a: Vec2,
    /// Arm from body B's center of mass to the contact.
    offset_b: Vec2,
    /// Effective mass along the normal.
    normal_mass: f32,
    /// Effective mass along the tangent.
    tangent_mass: f32,
    /// Accumulated normal impulse; never negative.
    normal_impulse: f32,
    /// Accumulated friction impulse; bounded by the friction cone.
    tangent_impulse: f32,
}

impl ContactPoint {
    /// Wrap a narrow-phase point with zeroed impulses.
    ///
    /// The derived quantities are filled in by [`ContactPoint::prepare`]
    /// before the first solver pass.
    #[must_use]
    pub fn new(point: CollisionPoint) -> Self {
        Self {
            point,
            tangent: Vec2::zeros(),
            offset_a: Vec2::zeros(),
            offset_b: Vec2::zeros(),
            normal_mass: 0.0,
            tangent_mass: 0.0,
            normal_impulse: 0.0,
            tangent_impulse: 0.0,
        }
    }

    /// The underlying narrow-phase point.
    #[must_use]
    pub fn point(&self) -> &CollisionPoint {
        &self.point
    }

    /// Accumulated normal impulse.
    #[must_use]
    pub fn normal_impulse(&self) -> f32 {
        self.normal_impulse
    }

    /// Accumulated friction impulse.
    #[must_use]
    pub fn tangent_impulse(&self) -> f32 {
        self.tangent_impulse
    }

    /// Copy the accumulated impulses from a matching point of the
    /// previous step (warm starting).
    pub(crate) fn inherit_impulses(&mut self, other: &ContactPoint) {
        self.normal_impulse = other.normal_impulse;
        self.tangent_impulse = other.tangent_impulse;
    }

    /// Compute arms and effective masses for the current poses, then
    /// re-apply the accumulated impulse from the previous step.
    pub(crate) fn prepare(&mut self, body_a: &mut Body, body_b: &mut Body) {
        self.offset_a = self.point.position - body_a.position;
        self.offset_b = self.point.position - body_b.position;

        self.normal_mass =
            effective_mass(body_a, body_b, self.offset_a, self.offset_b, self.point.normal);
        self.tangent = cross_vz(self.point.normal, 1.0);
        self.tangent_mass =
            effective_mass(body_a, body_b, self.offset_a, self.offset_b, self.tangent);

        // Warm start
        self.apply_impulse(
            body_a,
            body_b,
            self.normal_impulse * self.point.normal + self.tangent_impulse * self.tangent,
        );
    }

    /// One sequential-impulse iteration: normal impulse, then dry
    /// friction.
    pub(crate) fn solve_velocities(&mut self, body_a: &mut Body, body_b: &mut Body, friction: f32) {
        debug_assert!((0.0..=1.0).contains(&friction));

        // Normal impulse, accumulator clamped non-negative
        {
            let impulse = -self.normal_mass
                * self.velocity_at_contact(body_a, body_b).dot(&self.point.normal);

            let old_impulse = self.normal_impulse;
            self.normal_impulse = (old_impulse + impulse).max(0.0);
            self.apply_impulse(
                body_a,
                body_b,
                (self.normal_impulse - old_impulse) * self.point.normal,
            );
        }

        // Friction impulse, accumulator clamped into the Coulomb cone
        {
            let max_friction = friction * self.normal_impulse;

            let impulse =
                -self.tangent_mass * self.velocity_at_contact(body_a, body_b).dot(&self.tangent);

            let old_impulse = self.tangent_impulse;
            self.tangent_impulse = (old_impulse + impulse).clamp(-max_friction, max_friction);
            self.apply_impulse(
                body_a,
                body_b,
                (self.tangent_impulse - old_impulse) * self.tangent,
            );
        }
    }

    /// One position-correction pass: recompute the penetration from the
    /// persisted local contact data under the *current* poses and push
    /// the poses apart along the contact normal.
    ///
    /// Pure pose modification; velocities are untouched, and each
    /// body's rotation matrix is refreshed after its angle changes.
    pub(crate) fn solve_positions(&self, body_a: &mut Body, body_b: &mut Body) {
        let positions = [body_a.position, body_b.position];
        let rotations = [body_a.rotation, body_b.rotation];

        let ind_1 = self.point.clip_box_index;
        let ind_2 = 1 - ind_1;

        let clipped_point = positions[ind_2] + rotations[ind_2].mat() * self.point.local_points[ind_2];
        let mut normal = rotations[ind_1].mat() * self.point.local_contact_normal;
        let plane_point = positions[ind_1] + rotations[ind_1].mat() * self.point.local_points[ind_1];

        let penetration = (plane_point - clipped_point).dot(&normal);

        // The reference-local normal points out of the reference box;
        // flip so it points from A to B
        if ind_1 == 1 {
            normal = -normal;
        }

        let bias = (POSITION_CORRECTION_FACTOR * (penetration - PENETRATION_SLOP)).max(0.0);

        let arm_a = plane_point - body_a.position;
        let arm_b = plane_point - body_b.position;
        let mass = effective_mass(body_a, body_b, arm_a, arm_b, normal);
        let impulse = (mass * bias).max(0.0) * normal;

        body_a.position -= body_a.inv_mass() * impulse;
        let angle_a = body_a.rotation.angle() - body_a.inv_inertia() * cross(arm_a, impulse);
        body_a.rotation.set_angle(angle_a);

        body_b.position += body_b.inv_mass() * impulse;
        let angle_b = body_b.rotation.angle() + body_b.inv_inertia() * cross(arm_b, impulse);
        body_b.rotation.set_angle(angle_b);
    }

    /// Relative velocity of the contact point as carried by body B with
    /// respect to body A.
    fn velocity_at_contact(&self, body_a: &Body, body_b: &Body) -> Vec2 {
        body_b.linear_velocity + cross_zv(body_b.angular_velocity, self.offset_b)
            - body_a.linear_velocity
            - cross_zv(body_a.angular_velocity, self.offset_a)
    }

    /// Apply an impulse at the contact: equal and opposite on the pair.
    fn apply_impulse(&self, body_a: &mut Body, body_b: &mut Body, impulse: Vec2) {
        apply_at(body_a, self.offset_a, -impulse);
        apply_at(body_b, self.offset_b, impulse);
    }
}

/// Persistent contact manifold between two bodies.
///
/// Exploits temporal coherence: contacts whose feature pairs match the
/// previous step keep their accumulated impulses, so the solver starts
/// each step close to the converged solution.
#[derive(Debug, Clone)]
pub struct ContactManifold {
    /// First body of the pair; always the smaller index.
    body_a: BodyIndex,
    /// Second body of the pair.
    body_b: BodyIndex,
    /// Contact points; only the first `count` are live.
    contacts: [ContactPoint; MAX_CONTACT_POINTS],
    /// Number of live contact points.
    count: usize,
    /// Pair friction coefficient, the geometric mean of the two bodies'
    /// coefficients, cached at creation.
    friction: f32,
    /// Mark of the store's mark-and-sweep pass; a manifold still marked
    /// after the narrow phase is reaped.
    obsolete: bool,
}

impl ContactManifold {
    /// Create a manifold from a non-empty narrow-phase result.
    pub(crate) fn new(body_a: &Body, body_b: &Body, manifold: &CollisionManifold) -> Self {
        debug_assert!(manifold.count > 0 && manifold.count <= MAX_CONTACT_POINTS);
        Self {
            body_a: manifold.body_a,
            body_b: manifold.body_b,
            contacts: [
                ContactPoint::new(manifold.points[0]),
                ContactPoint::new(manifold.points[1]),
            ],
            count: manifold.count,
            friction: (body_a.friction() * body_b.friction()).sqrt(),
            obsolete: false,
        }
    }

    /// First body of the pair (the smaller index).
    #[must_use]
    pub fn body_a(&self) -> BodyIndex {
        self.body_a
    }

    /// Second body of the pair.
    #[must_use]
    pub fn body_b(&self) -> BodyIndex {
        self.body_b
    }

    /// The live contact points.
    #[must_use]
    pub fn contacts(&self) -> &[ContactPoint] {
        &self.contacts[..self.count]
    }

    /// Pair friction coefficient.
    #[must_use]
    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// Whether the manifold is currently marked obsolete.
    #[must_use]
    pub fn is_obsolete(&self) -> bool {
        self.obsolete
    }

    /// Mark the manifold obsolete; cleared again by
    /// [`ContactManifold::update`] if the pair re-collides.
    pub(crate) fn mark_obsolete(&mut self) {
        self.obsolete = true;
    }

    /// Replace the contacts with this step's narrow-phase result,
    /// warm-starting every point whose feature pair matches an old one.
    pub(crate) fn update(&mut self, manifold: &CollisionManifold) {
        let old_contacts = self.contacts;
        let old_count = self.count;

        for (i, point) in manifold.points().iter().enumerate() {
            self.contacts[i] = ContactPoint::new(*point);
            if let Some(matching) = old_contacts[..old_count]
                .iter()
                .find(|old| old.point().feature_pair == point.feature_pair)
            {
                self.contacts[i].inherit_impulses(matching);
            }
        }
        self.count = manifold.count;
        self.obsolete = false;
    }

    /// Prepare every contact for solving (arms, masses, warm start).
    pub(crate) fn prepare(&mut self, body_a: &mut Body, body_b: &mut Body) {
        for contact in &mut self.contacts[..self.count] {
            contact.prepare(body_a, body_b);
        }
    }

    /// Run one velocity iteration over the contacts, in order.
    pub(crate) fn solve_velocities(&mut self, body_a: &mut Body, body_b: &mut Body) {
        let friction = self.friction;
        for contact in &mut self.contacts[..self.count] {
            contact.solve_velocities(body_a, body_b, friction);
        }
    }

    /// Run one position-correction iteration over the contacts.
    pub(crate) fn solve_positions(&mut self, body_a: &mut Body, body_b: &mut Body) {
        for contact in &self.contacts[..self.count] {
            contact.solve_positions(body_a, body_b);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::narrow_phase::{box_box_collision, GeometryFeature};
    use approx::assert_relative_eq;

    fn overlapping_pair() -> (Body, Body, CollisionManifold) {
        let mut body_a = Body::new(Vec2::new(1.0, 1.0), 1.0, 0.5);
        let mut body_b = Body::new(Vec2::new(1.0, 1.0), 1.0, 0.5);
        body_a.position = Vec2::new(0.0, 0.0);
        body_b.position = Vec2::new(0.0, 0.95);

        let mut manifold = CollisionManifold::new(BodyIndex(0), BodyIndex(1));
        manifold.count = box_box_collision(
            [body_a.position, body_b.position],
            [&body_a.rotation, &body_b.rotation],
            [body_a.half_size(), body_b.half_size()],
            &mut manifold.points,
        );
        assert!(manifold.count > 0);
        (body_a, body_b, manifold)
    }

    #[test]
    fn effective_mass_of_central_contact() {
        let body_a = Body::new(Vec2::new(1.0, 1.0), 2.0, 0.0);
        let body_b = Body::new(Vec2::new(1.0, 1.0), 2.0, 0.0);
        // Arms aligned with the direction contribute no angular term
        let mass = effective_mass(&body_a, &body_b, Vec2::y(), -Vec2::y(), Vec2::y());
        assert_relative_eq!(mass, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn effective_mass_with_static_partner() {
        let dynamic = Body::new(Vec2::new(1.0, 1.0), 1.0, 0.0);
        let wall = Body::new(Vec2::new(10.0, 1.0), 0.0, 0.0);
        let mass = effective_mass(&dynamic, &wall, Vec2::y(), Vec2::zeros(), Vec2::y());
        // Only the dynamic body's inverse mass contributes
        assert_relative_eq!(mass, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn impulses_are_equal_and_opposite() {
        let (mut body_a, mut body_b, manifold) = overlapping_pair();
        body_b.linear_velocity = Vec2::new(0.0, -1.0);

        let mut contact = ContactPoint::new(manifold.points[0]);
        contact.prepare(&mut body_a, &mut body_b);
        contact.solve_velocities(&mut body_a, &mut body_b, 0.5);

        let momentum = body_a.mass() * body_a.linear_velocity + body_b.mass() * body_b.linear_velocity;
        // Started with total momentum (0, -1)
        assert_relative_eq!(momentum.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(momentum.y, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn normal_impulse_accumulator_stays_non_negative() {
        let (mut body_a, mut body_b, manifold) = overlapping_pair();
        // Separating fast: the solver must not pull the bodies together
        body_b.linear_velocity = Vec2::new(0.0, 5.0);

        let mut contact = ContactPoint::new(manifold.points[0]);
        contact.prepare(&mut body_a, &mut body_b);
        for _ in 0..10 {
            contact.solve_velocities(&mut body_a, &mut body_b, 0.5);
            assert!(contact.normal_impulse() >= 0.0);
        }
        assert_eq!(contact.normal_impulse(), 0.0);
    }

    #[test]
    fn friction_respects_coulomb_cone() {
        let (mut body_a, mut body_b, manifold) = overlapping_pair();
        body_b.linear_velocity = Vec2::new(3.0, -1.0);

        let friction = 0.5;
        let mut contact = ContactPoint::new(manifold.points[0]);
        contact.prepare(&mut body_a, &mut body_b);
        for _ in 0..10 {
            contact.solve_velocities(&mut body_a, &mut body_b, friction);
            assert!(contact.tangent_impulse().abs() <= friction * contact.normal_impulse() + 1e-6);
        }
    }

    #[test]
    fn manifold_friction_is_geometric_mean() {
        let (body_a, _, manifold) = overlapping_pair();
        let mut rough = Body::new(Vec2::new(1.0, 1.0), 1.0, 0.125);
        rough.position = Vec2::new(0.0, 0.95);

        let persistent = ContactManifold::new(&body_a, &rough, &manifold);
        assert_relative_eq!(persistent.friction(), (0.5f32 * 0.125).sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn update_warm_starts_matching_features() {
        let (body_a, body_b, manifold) = overlapping_pair();
        let mut persistent = ContactManifold::new(&body_a, &body_b, &manifold);

        // Pretend the solver accumulated some impulse last step
        persistent.contacts[0].normal_impulse = 1.25;
        persistent.contacts[0].tangent_impulse = -0.5;
        let warm_features = persistent.contacts[0].point().feature_pair;

        persistent.mark_obsolete();
        persistent.update(&manifold);

        assert!(!persistent.is_obsolete());
        let inherited = persistent
            .contacts()
            .iter()
            .find(|c| c.point().feature_pair == warm_features)
            .unwrap();
        assert_eq!(inherited.normal_impulse(), 1.25);
        assert_eq!(inherited.tangent_impulse(), -0.5);
    }

    #[test]
    fn update_resets_unmatched_features() {
        let (body_a, body_b, manifold) = overlapping_pair();
        let mut persistent = ContactManifold::new(&body_a, &body_b, &manifold);
        persistent.contacts[0].normal_impulse = 2.0;

        // A manifold from a different face: no features match
        let mut sideways = manifold;
        for point in &mut sideways.points {
            point.feature_pair = [GeometryFeature::new(1, 3); 2];
        }

        persistent.update(&sideways);
        for contact in persistent.contacts() {
            assert_eq!(contact.normal_impulse(), 0.0);
        }
    }

    #[test]
    fn position_pass_reduces_penetration() {
        let (mut body_a, mut body_b, manifold) = overlapping_pair();
        let gap_before = body_b.position.y - body_a.position.y;

        let mut persistent = ContactManifold::new(&body_a, &body_b, &manifold);
        for _ in 0..20 {
            persistent.solve_positions(&mut body_a, &mut body_b);
        }

        let gap_after = body_b.position.y - body_a.position.y;
        assert!(gap_after > gap_before);
        // Corrected toward touching (separation 1.0), minus the slop
        assert!(gap_after <= 1.0);
    }

    #[test]
    fn position_pass_leaves_velocities_alone() {
        let (mut body_a, mut body_b, manifold) = overlapping_pair();
        body_b.linear_velocity = Vec2::new(0.7, -0.3);
        body_b.angular_velocity = 0.2;

        let mut persistent = ContactManifold::new(&body_a, &body_b, &manifold);
        persistent.solve_positions(&mut body_a, &mut body_b);

        assert_eq!(body_b.linear_velocity, Vec2::new(0.7, -0.3));
        assert_eq!(body_b.angular_velocity, 0.2);
        assert_eq!(body_a.linear_velocity, Vec2::zeros());
    }

    #[test]
    fn position_pass_ignores_penetration_below_slop() {
        let mut body_a = Body::new(Vec2::new(1.0, 1.0), 1.0, 0.5);
        let mut body_b = Body::new(Vec2::new(1.0, 1.0), 1.0, 0.5);
        body_a.position = Vec2::zeros();
        body_b.position = Vec2::new(0.0, 1.0 - 0.0005);

        let mut manifold = CollisionManifold::new(BodyIndex(0), BodyIndex(1));
        manifold.count = box_box_collision(
            [body_a.position, body_b.position],
            [&body_a.rotation, &body_b.rotation],
            [body_a.half_size(), body_b.half_size()],
            &mut manifold.points,
        );
        assert!(manifold.count > 0);

        let before = body_b.position;
        let mut persistent = ContactManifold::new(&body_a, &body_b, &manifold);
        persistent.solve_positions(&mut body_a, &mut body_b);
        assert_eq!(body_b.position, before);
    }
}
