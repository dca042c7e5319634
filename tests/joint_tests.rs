use glam::{Quat, Vec3};
use kinetica::constraint::ConstraintKind;
use kinetica::{
    AxisState, BodySettings, BoxShape, ConeSettings, ConstraintSettings, DistanceSettings,
    FixedSettings, HingeLimits, HingeSettings, MotionType, PhysicsWorld, PointSettings,
    SixDofSettings, SliderLimits, SliderSettings, Sphere, SwingTwistSettings, shared,
};

const DT: f32 = 1.0 / 60.0;

fn zero_gravity_world() -> PhysicsWorld {
    PhysicsWorld::builder().gravity(Vec3::ZERO).build()
}

/// Unit-mass cube so test impulses translate directly into velocities.
fn unit_box(world: &mut PhysicsWorld, position: Vec3) -> kinetica::BodyId {
    world
        .create_body(
            &BodySettings::new(shared(BoxShape::new(Vec3::splat(0.5)).unwrap()))
                .position(position)
                .density(1.0)
                .allow_sleeping(false),
        )
        .unwrap()
}

fn static_box(world: &mut PhysicsWorld, position: Vec3) -> kinetica::BodyId {
    world
        .create_body(
            &BodySettings::new(shared(BoxShape::new(Vec3::splat(0.5)).unwrap()))
                .position(position)
                .motion_type(MotionType::Static),
        )
        .unwrap()
}

#[test]
fn fixed_constraint_welds_orientation() {
    let mut world = zero_gravity_world();
    let a = unit_box(&mut world, Vec3::new(-0.5, 0.0, 0.0));
    let b = unit_box(&mut world, Vec3::new(0.5, 0.0, 0.0));
    world
        .create_constraint(&ConstraintSettings::Fixed(FixedSettings {
            body_a: a,
            body_b: b,
            anchor: Vec3::ZERO,
        }))
        .unwrap();

    world
        .body_mut(a)
        .unwrap()
        .apply_angular_impulse(Vec3::new(0.0, 1.0, 0.0));

    for _ in 0..30 {
        world.step(DT);
    }

    let qa = world.body(a).unwrap().pose.rotation;
    let qb = world.body(b).unwrap().pose.rotation;
    let mut residual = qa * qb.inverse();
    if residual.w < 0.0 {
        residual = -residual;
    }
    let error = (residual - Quat::IDENTITY).length();
    assert!(error < 5e-3, "weld drifted, ‖qA·qB⁻¹ − I‖ = {error}");
}

#[test]
fn hinge_limit_saturates_and_releases() {
    let mut world = zero_gravity_world();
    let base = static_box(&mut world, Vec3::ZERO);
    let arm = unit_box(&mut world, Vec3::new(0.0, -1.0, 0.0));
    let limit = std::f32::consts::FRAC_PI_4;
    let hinge = world
        .create_constraint(&ConstraintSettings::Hinge(HingeSettings {
            body_a: base,
            body_b: arm,
            anchor: Vec3::ZERO,
            axis: Vec3::X,
            limits: Some(HingeLimits {
                min: -limit,
                max: limit,
            }),
        }))
        .unwrap();

    let angle_of = |world: &PhysicsWorld| -> f32 {
        let constraint = world.constraint(hinge).unwrap();
        match &constraint.kind {
            ConstraintKind::Hinge(h) => {
                h.current_angle(world.body(base).unwrap(), world.body(arm).unwrap())
            }
            _ => unreachable!(),
        }
    };

    // Drive the arm towards the upper stop with a gentle steady torque.
    for _ in 0..240 {
        world
            .body_mut(arm)
            .unwrap()
            .apply_angular_impulse(Vec3::new(0.005, 0.0, 0.0));
        world.step(DT);
    }
    let angle = angle_of(&world);
    assert!(
        (angle - limit).abs() < 1e-3,
        "hinge angle should saturate at the limit, angle = {angle}"
    );

    // Reverse: the limit must release within one step.
    let before = angle_of(&world);
    world
        .body_mut(arm)
        .unwrap()
        .apply_angular_impulse(Vec3::new(-0.1, 0.0, 0.0));
    world.step(DT);
    let after = angle_of(&world);
    assert!(
        after < before - 1e-4,
        "reversed torque should release the limit within one step ({before} -> {after})"
    );
}

#[test]
fn distance_constraint_holds_rest_length() {
    let mut world = zero_gravity_world();
    let a = unit_box(&mut world, Vec3::new(-1.5, 0.0, 0.0));
    let b = unit_box(&mut world, Vec3::new(1.5, 0.0, 0.0));
    world
        .create_constraint(&ConstraintSettings::Distance(DistanceSettings {
            body_a: a,
            body_b: b,
            anchor_a: Vec3::new(-1.5, 0.0, 0.0),
            anchor_b: Vec3::new(1.5, 0.0, 0.0),
            rest_length: None,
        }))
        .unwrap();

    world.body_mut(a).unwrap().velocity.linear = Vec3::new(0.0, 0.5, 0.0);
    for _ in 0..120 {
        world.step(DT);
    }

    let pa = world.body(a).unwrap().pose.position;
    let pb = world.body(b).unwrap().pose.position;
    let distance = (pa - pb).length();
    assert!(
        (distance - 3.0).abs() < 5e-3,
        "rest length drifted to {distance}"
    );
}

#[test]
fn slider_constrains_off_axis_motion() {
    let mut world = zero_gravity_world();
    let base = static_box(&mut world, Vec3::ZERO);
    let carriage = unit_box(&mut world, Vec3::ZERO);
    world
        .create_constraint(&ConstraintSettings::Slider(SliderSettings {
            body_a: base,
            body_b: carriage,
            anchor: Vec3::ZERO,
            axis: Vec3::X,
            limits: Some(SliderLimits { min: -2.0, max: 2.0 }),
        }))
        .unwrap();

    // Push along the axis and sideways; only the axial part should survive.
    world.body_mut(carriage).unwrap().velocity.linear = Vec3::new(1.0, 1.0, 0.0);
    for _ in 0..150 {
        world.step(DT);
    }

    let body = world.body(carriage).unwrap();
    assert!(
        body.pose.position.y.abs() < 1e-2,
        "slider should cancel off-axis drift, y = {}",
        body.pose.position.y
    );
    assert!(
        body.pose.position.x <= 2.0 + 1e-2,
        "slider limit overrun, x = {}",
        body.pose.position.x
    );
    assert!(
        body.pose.position.x > 1.5,
        "carriage should have slid along the free axis, x = {}",
        body.pose.position.x
    );
    let angle = body.pose.rotation.to_axis_angle().1;
    assert!(
        angle.abs() < 1e-2,
        "slider should lock rotation, angle = {angle}"
    );
}

#[test]
fn cone_constraint_caps_the_swing() {
    let mut world = zero_gravity_world();
    let base = static_box(&mut world, Vec3::ZERO);
    let arm = unit_box(&mut world, Vec3::new(0.0, -1.0, 0.0));
    let half_angle = 0.4;
    let cone = world
        .create_constraint(&ConstraintSettings::Cone(ConeSettings {
            body_a: base,
            body_b: arm,
            anchor: Vec3::ZERO,
            twist_axis: Vec3::NEG_Y,
            half_angle,
        }))
        .unwrap();

    for _ in 0..240 {
        world
            .body_mut(arm)
            .unwrap()
            .apply_angular_impulse(Vec3::new(0.01, 0.0, 0.0));
        world.step(DT);
    }

    let constraint = world.constraint(cone).unwrap();
    let angle = match &constraint.kind {
        ConstraintKind::Cone(c) => {
            c.current_angle(world.body(base).unwrap(), world.body(arm).unwrap())
        }
        _ => unreachable!(),
    };
    assert!(
        angle <= half_angle + 5e-3,
        "cone opened past its limit, angle = {angle}"
    );
    assert!(angle > 0.2, "arm should have swung out, angle = {angle}");
}

#[test]
fn swing_twist_limits_the_twist() {
    let mut world = zero_gravity_world();
    let base = static_box(&mut world, Vec3::ZERO);
    let arm = unit_box(&mut world, Vec3::new(0.0, -1.0, 0.0));
    let twist_max = 0.3;
    let joint = world
        .create_constraint(&ConstraintSettings::SwingTwist(SwingTwistSettings {
            body_a: base,
            body_b: arm,
            anchor: Vec3::ZERO,
            twist_axis: Vec3::NEG_Y,
            swing_half_angle: 0.5,
            twist_min: -twist_max,
            twist_max,
        }))
        .unwrap();

    // Torque purely about the twist axis.
    for _ in 0..240 {
        world
            .body_mut(arm)
            .unwrap()
            .apply_angular_impulse(Vec3::new(0.0, -0.01, 0.0));
        world.step(DT);
    }

    let constraint = world.constraint(joint).unwrap();
    let twist = match &constraint.kind {
        ConstraintKind::SwingTwist(c) => {
            c.current_twist(world.body(base).unwrap(), world.body(arm).unwrap())
        }
        _ => unreachable!(),
    };
    assert!(
        twist.abs() <= twist_max + 1e-2,
        "twist ran past its limit, twist = {twist}"
    );
    assert!(twist.abs() > 0.1, "arm should have twisted, twist = {twist}");
}

#[test]
fn locked_six_dof_behaves_like_fixed() {
    let mut world = zero_gravity_world();
    let a = unit_box(&mut world, Vec3::new(-0.5, 0.0, 0.0));
    let b = unit_box(&mut world, Vec3::new(0.5, 0.0, 0.0));
    world
        .create_constraint(&ConstraintSettings::SixDof(SixDofSettings::locked(
            a,
            b,
            Vec3::ZERO,
        )))
        .unwrap();

    world
        .body_mut(a)
        .unwrap()
        .apply_impulse(Vec3::new(0.0, 1.0, 0.0), Vec3::new(-0.5, 0.0, 0.0));
    for _ in 0..60 {
        world.step(DT);
    }

    let pa = world.body(a).unwrap().pose.position;
    let pb = world.body(b).unwrap().pose.position;
    assert!(
        ((pa - pb).length() - 1.0).abs() < 1e-2,
        "welded pair separated, distance = {}",
        (pa - pb).length()
    );
}

#[test]
fn six_dof_free_axis_slides() {
    let mut world = zero_gravity_world();
    let base = static_box(&mut world, Vec3::ZERO);
    let body = unit_box(&mut world, Vec3::ZERO);
    world
        .create_constraint(&ConstraintSettings::SixDof(SixDofSettings {
            body_a: base,
            body_b: body,
            anchor: Vec3::ZERO,
            frame: Quat::IDENTITY,
            translation: [AxisState::Free, AxisState::Locked, AxisState::Locked],
            rotation: [AxisState::Locked; 3],
        }))
        .unwrap();

    world.body_mut(body).unwrap().velocity.linear = Vec3::new(1.0, 1.0, 0.0);
    for _ in 0..60 {
        world.step(DT);
    }

    let pose = world.body(body).unwrap().pose;
    assert!(
        pose.position.x > 0.5,
        "free axis should slide, x = {}",
        pose.position.x
    );
    assert!(
        pose.position.y.abs() < 1e-2,
        "locked axis should hold, y = {}",
        pose.position.y
    );
}

#[test]
fn point_constraint_pins_the_anchor() {
    let mut world = zero_gravity_world();
    let base = static_box(&mut world, Vec3::ZERO);
    let pin = Vec3::new(0.0, -0.5, 0.0);
    let bob = world
        .create_body(
            &BodySettings::new(shared(Sphere::new(0.25).unwrap()))
                .position(Vec3::new(0.0, -1.0, 0.0))
                .density(1.0)
                .allow_sleeping(false),
        )
        .unwrap();
    world
        .create_constraint(&ConstraintSettings::Point(PointSettings {
            body_a: base,
            body_b: bob,
            anchor: pin,
        }))
        .unwrap();

    world.body_mut(bob).unwrap().velocity.linear = Vec3::new(1.0, 0.0, 0.0);
    for _ in 0..120 {
        world.step(DT);
    }

    // r2_local was captured as the offset from the bob's COM to the pin.
    let pose = world.body(bob).unwrap().pose;
    let anchor_world = pose.local_to_world(Vec3::new(0.0, 0.5, 0.0));
    let drift = (anchor_world - pin).length();
    assert!(drift < 1e-2, "anchor wandered {drift} from the pin point");
}
