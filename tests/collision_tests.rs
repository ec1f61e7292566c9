use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glam::Vec2;
use soft2d::*;

const TIME_STEP: f32 = 1.0 / 60.0;

fn soft_ball(position: Vec2) -> Body {
    let mut body = Body::new(ClosedShape::circle(1.0, 12), position, 0.0, Vec2::ONE, 1.0);
    body.add_component(&ComponentCreator::shape_matched_springs(200.0, 10.0));
    body
}

#[test]
fn overlapping_bodies_separate() {
    let mut world = World::new();

    let left = world.add_body(soft_ball(Vec2::new(-0.9, 0.0)));
    let right = world.add_body(soft_ball(Vec2::new(0.9, 0.0)));

    world.update(TIME_STEP);
    assert!(
        !world.collision_list().is_empty(),
        "overlapping bodies must report contacts"
    );

    let initial_distance = 1.8;
    for _ in 0..120 {
        world.update(TIME_STEP);
    }

    let distance = world
        .body(left)
        .unwrap()
        .derived_position
        .distance(world.body(right).unwrap().derived_position);
    assert!(
        distance > initial_distance,
        "bodies should push apart, distance = {}",
        distance
    );
}

#[test]
fn collision_list_identifies_both_bodies() {
    let mut world = World::new();

    let left = world.add_body(soft_ball(Vec2::new(-0.9, 0.0)));
    let right = world.add_body(soft_ball(Vec2::new(0.9, 0.0)));

    world.update(TIME_STEP);

    for info in world.collision_list() {
        assert!(info.body_a == left || info.body_a == right);
        assert!(info.body_b == left || info.body_b == right);
        assert_ne!(info.body_a, info.body_b);
        assert!(info.penetration >= 0.0);
    }
}

#[test]
fn disjoint_collision_bitmasks_prevent_contact() {
    let mut world = World::new();

    let mut a = soft_ball(Vec2::new(-0.9, 0.0));
    a.bitmask = 0b01;
    let mut b = soft_ball(Vec2::new(0.9, 0.0));
    b.bitmask = 0b10;
    world.add_body(a);
    world.add_body(b);

    world.update(TIME_STEP);
    assert!(
        world.collision_list().is_empty(),
        "bodies with disjoint bitmasks must not collide"
    );
}

#[test]
fn materials_can_disable_collision() {
    let mut world = World::new();

    let ghost_material = world.add_material();
    world.set_material_pair_collide(0, ghost_material, false);

    let mut ghost = soft_ball(Vec2::new(-0.9, 0.0));
    ghost.material = ghost_material;
    world.add_body(ghost);
    world.add_body(soft_ball(Vec2::new(0.9, 0.0)));

    world.update(TIME_STEP);
    assert!(
        world.collision_list().is_empty(),
        "materials set not to collide must produce no contacts"
    );
}

#[test]
fn material_filter_can_veto_contacts() {
    let mut world = World::new();

    let vetoed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&vetoed);
    world.set_material_pair_filter(
        0,
        0,
        Arc::new(move |_info, _relative_dot| {
            counter.fetch_add(1, Ordering::Relaxed);
            false
        }),
    );

    world.add_body(soft_ball(Vec2::new(-0.9, 0.0)));
    world.add_body(soft_ball(Vec2::new(0.9, 0.0)));

    world.update(TIME_STEP);

    assert!(vetoed.load(Ordering::Relaxed) > 0, "filter was never consulted");
    assert!(
        world.collision_list().is_empty(),
        "vetoed contacts must not be resolved"
    );
}

struct CountingObserver {
    contacts: Arc<AtomicUsize>,
    deep: Arc<AtomicUsize>,
}

impl CollisionObserver for CountingObserver {
    fn bodies_did_collide(&mut self, contacts: &[CollisionInfo]) {
        self.contacts.fetch_add(contacts.len(), Ordering::Relaxed);
    }

    fn collision_exceeded_threshold(&mut self, _contact: &CollisionInfo, _penetration: f32) {
        self.deep.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn observer_receives_contacts() {
    let mut world = World::new();

    let contacts = Arc::new(AtomicUsize::new(0));
    let deep = Arc::new(AtomicUsize::new(0));
    world.set_collision_observer(Box::new(CountingObserver {
        contacts: Arc::clone(&contacts),
        deep: Arc::clone(&deep),
    }));

    world.add_body(soft_ball(Vec2::new(-0.9, 0.0)));
    world.add_body(soft_ball(Vec2::new(0.9, 0.0)));

    world.update(TIME_STEP);
    assert!(contacts.load(Ordering::Relaxed) > 0, "observer saw no contacts");
}

#[test]
fn observer_sees_contacts_a_filter_vetoes() {
    let mut world = World::new();

    world.set_material_pair_filter(0, 0, Arc::new(|_info, _relative_dot| false));

    let contacts = Arc::new(AtomicUsize::new(0));
    world.set_collision_observer(Box::new(CountingObserver {
        contacts: Arc::clone(&contacts),
        deep: Arc::new(AtomicUsize::new(0)),
    }));

    world.add_body(soft_ball(Vec2::new(-0.9, 0.0)));
    world.add_body(soft_ball(Vec2::new(0.9, 0.0)));

    world.update(TIME_STEP);

    assert!(
        contacts.load(Ordering::Relaxed) > 0,
        "the observer is notified of detected contacts before filtering"
    );
    assert!(
        world.collision_list().is_empty(),
        "vetoed contacts still stay out of the resolved list"
    );
}

#[test]
fn deep_penetrations_are_reported_not_resolved() {
    let mut world = World::new();

    let deep = Arc::new(AtomicUsize::new(0));
    world.set_collision_observer(Box::new(CountingObserver {
        contacts: Arc::new(AtomicUsize::new(0)),
        deep: Arc::clone(&deep),
    }));

    // Each body has points near the other's center, far past the threshold.
    world.add_body(soft_ball(Vec2::new(-0.5, 0.0)));
    world.add_body(soft_ball(Vec2::new(0.5, 0.0)));

    world.update(TIME_STEP);
    assert!(
        deep.load(Ordering::Relaxed) > 0,
        "deep contacts should be reported through the observer"
    );
}

#[test]
fn body_under_point_finds_the_right_body() {
    let mut world = World::new();

    let left = world.add_body(soft_ball(Vec2::new(-3.0, 0.0)));
    let right = world.add_body(soft_ball(Vec2::new(3.0, 0.0)));

    assert_eq!(world.body_under_point(Vec2::new(-3.0, 0.0), 0), Some(left));
    assert_eq!(world.body_under_point(Vec2::new(3.0, 0.0), 0), Some(right));
    assert_eq!(world.body_under_point(Vec2::new(0.0, 5.0), 0), None);
}

#[test]
fn ray_cast_returns_the_closest_body() {
    let mut world = World::new();

    let near = world.add_body(soft_ball(Vec2::new(-2.0, 0.0)));
    world.add_body(soft_ball(Vec2::new(4.0, 0.0)));

    let (hit, body) = world
        .ray_cast(Vec2::new(-8.0, 0.0), Vec2::new(8.0, 0.0), 0, None)
        .expect("ray should hit a body");

    assert_eq!(body, near);
    assert!(
        (hit.x + 3.0).abs() < 0.1,
        "hit should land on the near body's left edge, x = {}",
        hit.x
    );
}

#[test]
fn ray_cast_skips_ignored_bodies() {
    let mut world = World::new();

    let near = world.add_body(soft_ball(Vec2::new(-2.0, 0.0)));
    let far = world.add_body(soft_ball(Vec2::new(4.0, 0.0)));

    let skip_near: &dyn Fn(BodyId) -> bool = &|id| id == near;
    let (hit, body) = world
        .ray_cast(Vec2::new(-8.0, 0.0), Vec2::new(8.0, 0.0), 0, Some(skip_near))
        .expect("ray should hit the body behind the ignored one");

    assert_eq!(body, far);
    assert!(
        (hit.x - 3.0).abs() < 0.1,
        "hit should land on the far body's left edge, x = {}",
        hit.x
    );
}

#[test]
fn bodies_intersecting_line_reports_crossings() {
    let mut world = World::new();

    let ball = world.add_body(soft_ball(Vec2::new(0.0, 0.0)));
    world.add_body(soft_ball(Vec2::new(0.0, 6.0)));

    let hits = world.bodies_intersecting_line(Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0), 0);
    assert_eq!(hits, vec![ball]);
}

#[test]
fn closest_point_mass_scans_all_bodies() {
    let mut world = World::new();

    world.add_body(soft_ball(Vec2::new(-5.0, 0.0)));
    let near = world.add_body(soft_ball(Vec2::new(1.0, 0.0)));

    let (body, _, distance) = world
        .closest_point_mass(Vec2::new(2.5, 0.0))
        .expect("world has bodies");

    assert_eq!(body, near);
    assert!(distance < 1.0, "distance = {}", distance);
}
