use glam::Vec3;
use kinetica::{
    BodySettings, BoxShape, ConstraintSettings, DistanceSettings, PhysicsError, PhysicsWorld,
    PointSettings, Sphere, shared,
};

fn dynamic_sphere(world: &mut PhysicsWorld, position: Vec3) -> kinetica::BodyId {
    world
        .create_body(&BodySettings::new(shared(Sphere::new(0.5).unwrap())).position(position))
        .unwrap()
}

#[test]
fn destroyed_body_ids_go_stale() {
    let mut world = PhysicsWorld::new();
    let id = dynamic_sphere(&mut world, Vec3::ZERO);
    assert!(world.body(id).is_some());

    assert!(world.destroy_body(id));
    assert!(world.body(id).is_none());
    assert!(!world.destroy_body(id), "double destroy must be a no-op");

    // The reused slot hands out a different generation.
    let reused = dynamic_sphere(&mut world, Vec3::ZERO);
    assert_eq!(reused.index(), id.index());
    assert!(world.body(id).is_none());
    assert!(world.body(reused).is_some());
}

#[test]
fn destroying_a_body_cascades_to_its_constraints() {
    let mut world = PhysicsWorld::new();
    let a = dynamic_sphere(&mut world, Vec3::ZERO);
    let b = dynamic_sphere(&mut world, Vec3::new(2.0, 0.0, 0.0));
    let c = dynamic_sphere(&mut world, Vec3::new(4.0, 0.0, 0.0));

    let ab = world
        .create_constraint(&ConstraintSettings::Point(PointSettings {
            body_a: a,
            body_b: b,
            anchor: Vec3::new(1.0, 0.0, 0.0),
        }))
        .unwrap();
    let bc = world
        .create_constraint(&ConstraintSettings::Distance(DistanceSettings {
            body_a: b,
            body_b: c,
            anchor_a: Vec3::new(2.0, 0.0, 0.0),
            anchor_b: Vec3::new(4.0, 0.0, 0.0),
            rest_length: None,
        }))
        .unwrap();

    assert!(world.destroy_body(b));
    assert!(world.constraint(ab).is_none(), "constraint must die with its body");
    assert!(world.constraint(bc).is_none(), "constraint must die with its body");
    // Back-references on the surviving bodies were cleaned up.
    assert!(world.body(a).unwrap().constraints().is_empty());
    assert!(world.body(c).unwrap().constraints().is_empty());
}

#[test]
fn stale_constraint_ids_fail_lookup() {
    let mut world = PhysicsWorld::new();
    let a = dynamic_sphere(&mut world, Vec3::ZERO);
    let b = dynamic_sphere(&mut world, Vec3::new(2.0, 0.0, 0.0));

    let id = world
        .create_constraint(&ConstraintSettings::Point(PointSettings {
            body_a: a,
            body_b: b,
            anchor: Vec3::new(1.0, 0.0, 0.0),
        }))
        .unwrap();
    assert!(world.constraint(id).is_some());
    assert!(world.destroy_constraint(id));
    assert!(world.constraint(id).is_none());

    let reused = world
        .create_constraint(&ConstraintSettings::Point(PointSettings {
            body_a: a,
            body_b: b,
            anchor: Vec3::new(1.0, 0.0, 0.0),
        }))
        .unwrap();
    assert_eq!(reused.index(), id.index());
    assert_ne!(reused.sequence(), id.sequence());
    assert!(world.constraint(id).is_none());
}

#[test]
fn invalid_settings_fail_creation() {
    let mut world = PhysicsWorld::new();

    assert!(matches!(
        Sphere::new(-1.0),
        Err(PhysicsError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        BoxShape::new(Vec3::new(1.0, 0.0, 1.0)),
        Err(PhysicsError::InvalidConfiguration(_))
    ));

    let bad_position =
        BodySettings::new(shared(Sphere::new(1.0).unwrap())).position(Vec3::splat(f32::NAN));
    assert!(matches!(
        world.create_body(&bad_position),
        Err(PhysicsError::InvalidConfiguration(_))
    ));

    let bad_density = BodySettings::new(shared(Sphere::new(1.0).unwrap())).density(-2.0);
    assert!(matches!(
        world.create_body(&bad_density),
        Err(PhysicsError::InvalidConfiguration(_))
    ));
}

#[test]
fn constraints_against_stale_bodies_are_rejected() {
    let mut world = PhysicsWorld::new();
    let a = dynamic_sphere(&mut world, Vec3::ZERO);
    let b = dynamic_sphere(&mut world, Vec3::new(2.0, 0.0, 0.0));
    world.destroy_body(b);

    let result = world.create_constraint(&ConstraintSettings::Point(PointSettings {
        body_a: a,
        body_b: b,
        anchor: Vec3::ZERO,
    }));
    assert!(matches!(result, Err(PhysicsError::InvalidConfiguration(_))));

    let self_coupled = world.create_constraint(&ConstraintSettings::Point(PointSettings {
        body_a: a,
        body_b: a,
        anchor: Vec3::ZERO,
    }));
    assert!(matches!(
        self_coupled,
        Err(PhysicsError::InvalidConfiguration(_))
    ));
}

#[test]
fn disabled_constraints_are_skipped_but_stay_allocated() {
    let mut world = PhysicsWorld::builder().gravity(Vec3::ZERO).build();
    let a = world
        .create_body(
            &BodySettings::new(shared(Sphere::new(0.5).unwrap()))
                .position(Vec3::ZERO)
                .velocity(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO)
                .allow_sleeping(false),
        )
        .unwrap();
    let b = world
        .create_body(
            &BodySettings::new(shared(Sphere::new(0.5).unwrap()))
                .position(Vec3::new(2.0, 0.0, 0.0))
                .allow_sleeping(false),
        )
        .unwrap();
    let id = world
        .create_constraint(&ConstraintSettings::Point(PointSettings {
            body_a: a,
            body_b: b,
            anchor: Vec3::new(1.0, 0.0, 0.0),
        }))
        .unwrap();

    world.constraint_mut(id).unwrap().enabled = false;
    for _ in 0..30 {
        world.step(1.0 / 60.0);
    }
    // Disabled: A drifts freely, B never moves.
    assert!(world.body(a).unwrap().pose.position.x > 0.4);
    assert_eq!(world.body(b).unwrap().velocity.linear, Vec3::ZERO);
    assert!(world.constraint(id).is_some(), "disabled is not destroyed");

    world.constraint_mut(id).unwrap().enabled = true;
    for _ in 0..30 {
        world.step(1.0 / 60.0);
    }
    assert!(
        world.body(b).unwrap().velocity.linear.length() > 1e-3,
        "re-enabled constraint should pull B along"
    );
}
