mod common;

use common::{TestCollider, TestContactProvider};
use glam::Vec3;
use kinetica::{BodySettings, HalfSpace, MotionType, PhysicsWorld, Sphere, shared};

const DT: f32 = 1.0 / 60.0;

fn stack_world(sphere_heights: &[f32]) -> (PhysicsWorld, Vec<kinetica::BodyId>) {
    let mut provider = TestContactProvider::new();
    let mut world = PhysicsWorld::builder()
        .gravity(Vec3::new(0.0, -9.81, 0.0))
        .build();

    let plane = world
        .create_body(
            &BodySettings::new(shared(HalfSpace::new(Vec3::Y).unwrap()))
                .motion_type(MotionType::Static),
        )
        .unwrap();
    provider.register(plane, TestCollider::HalfSpace { normal: Vec3::Y });

    let mut ids = Vec::new();
    for &height in sphere_heights {
        let id = world
            .create_body(
                &BodySettings::new(shared(Sphere::new(0.5).unwrap()))
                    .position(Vec3::new(0.0, height, 0.0)),
            )
            .unwrap();
        provider.register(id, TestCollider::Sphere { radius: 0.5 });
        ids.push(id);
    }
    world.set_contact_provider(provider);
    (world, ids)
}

#[test]
fn resting_island_falls_asleep() {
    let (mut world, ids) = stack_world(&[0.5, 1.5]);

    for _ in 0..240 {
        world.step(DT);
    }

    for id in &ids {
        let body = world.body(*id).unwrap();
        assert!(body.is_sleeping(), "resting body should be asleep");
        assert_eq!(body.velocity.linear, Vec3::ZERO);
    }
    assert_eq!(
        world.bodies.num_active(),
        0,
        "sleeping bodies must leave the active array"
    );
}

#[test]
fn impact_wakes_a_sleeping_stack() {
    let (mut world, ids) = stack_world(&[0.5, 1.5]);

    for _ in 0..240 {
        world.step(DT);
    }
    assert!(world.body(ids[0]).unwrap().is_sleeping());
    assert!(world.body(ids[1]).unwrap().is_sleeping());

    // Drop a third sphere onto the stack; its contact manifold must pull
    // the whole pile back into the simulation within one step of touching.
    let intruder = world
        .create_body(
            &BodySettings::new(shared(Sphere::new(0.5).unwrap()))
                .position(Vec3::new(0.0, 2.45, 0.0)),
        )
        .unwrap();
    // Reuse the provider by registering through a fresh one.
    let mut provider = TestContactProvider::new();
    let plane_normal = Vec3::Y;
    let all = world.bodies.ids().collect::<Vec<_>>();
    for id in all {
        let body = world.bodies.get(id).unwrap();
        if body.motion_type == MotionType::Static {
            provider.register(id, TestCollider::HalfSpace { normal: plane_normal });
        } else {
            provider.register(id, TestCollider::Sphere { radius: 0.5 });
        }
    }
    world.set_contact_provider(provider);

    let mut woke_at = None;
    for step in 0..30 {
        world.step(DT);
        if world.body(ids[0]).unwrap().is_sleeping() == false
            && world.body(ids[1]).unwrap().is_sleeping() == false
        {
            woke_at = Some(step);
            break;
        }
    }
    let woke_at = woke_at.expect("the stack never woke up");
    assert!(
        !world.body(intruder).unwrap().is_sleeping(),
        "the falling sphere should be awake at impact"
    );
    assert!(woke_at < 30, "wake took too long: {woke_at} steps");
}

#[test]
fn sleep_accumulator_does_not_advance_at_zero_dt() {
    let (mut world, ids) = stack_world(&[0.5]);

    for _ in 0..30 {
        world.step(DT);
    }
    let quiescent = world.body(ids[0]).unwrap().time_quiescent();
    for _ in 0..600 {
        world.step(0.0);
    }
    assert_eq!(
        world.body(ids[0]).unwrap().time_quiescent(),
        quiescent,
        "zero-dt steps must not advance the sleep clock"
    );
    assert!(!world.body(ids[0]).unwrap().is_sleeping() || quiescent >= 0.5);
}

#[test]
fn waking_resets_quiescence_and_warm_start() {
    let (mut world, ids) = stack_world(&[0.5]);

    for _ in 0..240 {
        world.step(DT);
    }
    assert!(world.body(ids[0]).unwrap().is_sleeping());

    assert!(world.wake_body(ids[0]));
    let body = world.body(ids[0]).unwrap();
    assert!(!body.is_sleeping());
    assert_eq!(body.time_quiescent(), 0.0);
    assert!(body.active_index() != kinetica::core::body::INACTIVE);

    // It settles and sleeps again.
    for _ in 0..240 {
        world.step(DT);
    }
    assert!(world.body(ids[0]).unwrap().is_sleeping());
}
