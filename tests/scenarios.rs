//! End-to-end simulation scenarios.
//!
//! Each test builds a small scene, runs it for a fixed number of steps
//! at 60 Hz, and checks the physically expected outcome within loose
//! tolerances: free fall against the closed-form trajectory, resting
//! and stacking stability, friction decay, and contact persistence.

use rigid2d::{Vec2, World, WorldConfig};

const DT: f32 = 1.0 / 60.0;

fn world_with_iterations(velocity: u32, position: u32) -> World {
    World::new(WorldConfig::default().with_iterations(velocity, position))
}

/// Add the standard wide static floor with its top surface at y = 0.
fn add_floor(world: &mut World) {
    world.add_body(Vec2::new(100.0, 1.0), 0.0, 0.5, Vec2::new(0.0, -0.5), 0.0);
}

#[test]
fn free_fall_matches_closed_form() {
    let mut world = world_with_iterations(10, 0);
    let body = world
        .add_body(Vec2::new(1.0, 1.0), 1.0, 0.5, Vec2::new(0.0, 10.0), 0.0)
        .unwrap();

    for _ in 0..60 {
        world.step(DT);
    }

    let body = world.body(body).unwrap();
    // After one second: y ≈ 10 - g/2, v ≈ -g (semi-implicit Euler lands
    // slightly below the continuous trajectory)
    assert!(
        (body.position.y - 5.0).abs() < 0.2,
        "free fall off trajectory: y = {}",
        body.position.y
    );
    assert!(
        (body.linear_velocity.y + 10.0).abs() < 1e-3,
        "free fall velocity: v_y = {}",
        body.linear_velocity.y
    );
    assert!(body.position.x.abs() < 1e-6);
}

#[test]
fn box_rests_on_floor() {
    let mut world = world_with_iterations(15, 5);
    add_floor(&mut world);
    let body = world
        .add_body(Vec2::new(1.0, 1.0), 1.0, 0.5, Vec2::new(0.0, 0.51), 0.0)
        .unwrap();

    for _ in 0..600 {
        world.step(DT);
    }

    let body = world.body(body).unwrap();
    assert!(
        (body.position.y - 0.5).abs() < 0.01,
        "box should rest at y = 0.5: y = {}",
        body.position.y
    );
    assert!(
        body.linear_velocity.norm() < 0.05,
        "box should be at rest: speed = {}",
        body.linear_velocity.norm()
    );
}

#[test]
fn friction_stops_a_sliding_box() {
    let mut world = world_with_iterations(15, 5);
    add_floor(&mut world);
    let slider = world
        .add_body(Vec2::new(1.0, 1.0), 1.0, 0.5, Vec2::new(0.0, 0.5), 0.0)
        .unwrap();
    world.body_mut(slider).unwrap().linear_velocity = Vec2::new(5.0, 0.0);

    let mut previous_speed = 5.0f32;
    let mut slowed_below_threshold = false;
    for _ in 0..120 {
        world.step(DT);
        let speed = world.body(slider).unwrap().linear_velocity.x.abs();
        assert!(
            speed <= previous_speed + 1e-3,
            "sliding speed must not increase: {speed} > {previous_speed}"
        );
        previous_speed = speed;
        if speed < 0.1 {
            slowed_below_threshold = true;
        }
    }
    assert!(
        slowed_below_threshold,
        "friction should bring the box below 0.1 m/s within two seconds"
    );
}

#[test]
fn stack_of_three_is_stable() {
    let mut world = world_with_iterations(20, 10);
    add_floor(&mut world);
    for level in 0..3 {
        world.add_body(
            Vec2::new(1.0, 1.0),
            1.0,
            0.5,
            Vec2::new(0.0, 0.51 + 1.01 * level as f32),
            0.0,
        );
    }

    for _ in 0..300 {
        world.step(DT);
    }

    let max_penetration = world
        .manifolds()
        .iter()
        .flat_map(|manifold| manifold.contacts())
        .map(|contact| contact.point().penetration)
        .fold(0.0f32, f32::max);
    assert!(
        max_penetration < 0.01,
        "stack penetration too deep: {max_penetration}"
    );

    let max_speed = world
        .bodies()
        .iter()
        .filter(|body| !body.is_static())
        .map(|body| body.linear_velocity.norm())
        .fold(0.0f32, f32::max);
    assert!(max_speed < 0.05, "stack still moving: {max_speed}");
}

#[test]
fn resting_impulses_carry_over_between_steps() {
    let mut world = world_with_iterations(15, 5);
    add_floor(&mut world);
    world.add_body(Vec2::new(1.0, 1.0), 1.0, 0.5, Vec2::new(0.0, 0.51), 0.0);

    // Let the contact converge
    for _ in 0..120 {
        world.step(DT);
    }

    // At rest, the accumulated impulse balances gravity each step; warm
    // starting keeps it steady from one step to the next
    let impulse_before: f32 = world
        .manifolds()
        .iter()
        .flat_map(|m| m.contacts())
        .map(|c| c.normal_impulse())
        .sum();
    world.step(DT);
    let impulse_after: f32 = world
        .manifolds()
        .iter()
        .flat_map(|m| m.contacts())
        .map(|c| c.normal_impulse())
        .sum();

    let weight_per_step = 10.0 * DT;
    assert!(
        (impulse_before - weight_per_step).abs() < 0.1 * weight_per_step,
        "resting impulse should balance gravity: {impulse_before}"
    );
    assert!(
        (impulse_after - impulse_before).abs() < 0.05 * weight_per_step,
        "warm-started impulse should be steady: {impulse_before} -> {impulse_after}"
    );
}

#[test]
fn slowly_rotating_contact_stays_persistent() {
    let mut world = world_with_iterations(15, 5);
    add_floor(&mut world);
    let spinner = world
        .add_body(Vec2::new(1.0, 1.0), 1.0, 0.5, Vec2::new(0.0, 0.51), 0.0)
        .unwrap();

    // Settle first, then keep imparting a slow spin (0.01 rad per step)
    for _ in 0..60 {
        world.step(DT);
    }
    for _ in 0..300 {
        world.body_mut(spinner).unwrap().angular_velocity = 0.01 / DT;
        world.step(DT);

        assert_eq!(
            world.manifolds().len(),
            1,
            "the floor contact must survive the rotation"
        );
        let manifold = &world.manifolds()[0];
        assert!(!manifold.is_obsolete());
        assert!(!manifold.contacts().is_empty());
    }
}

#[test]
fn static_bodies_never_move() {
    let mut world = world_with_iterations(15, 5);
    add_floor(&mut world);
    let wall = world
        .add_body(Vec2::new(1.0, 6.0), 0.0, 0.5, Vec2::new(2.0, 3.0), 0.0)
        .unwrap();
    // A dynamic box dropped onto the floor next to the wall
    world.add_body(Vec2::new(1.0, 1.0), 1.0, 0.5, Vec2::new(1.2, 2.0), 0.0);

    for _ in 0..300 {
        world.step(DT);
    }

    let wall = world.body(wall).unwrap();
    assert_eq!(wall.position, Vec2::new(2.0, 3.0));
    assert_eq!(wall.rotation.angle(), 0.0);
    assert_eq!(wall.linear_velocity, Vec2::zeros());
    assert_eq!(wall.angular_velocity, 0.0);
}
