use std::time::Instant;

use glam::Vec3;
use log::debug;

use crate::collision::contact::{ContactCache, ContactManifold, ContactProvider, NoopContactProvider};
use crate::config::WorldSettings;
use crate::constraint::{
    ConeConstraint, ConstraintId, ConstraintKind, ConstraintSettings, Constraints,
    DistanceConstraint, FixedConstraint, HingeConstraint, PointConstraint, SixDofConstraint,
    SliderConstraint, SwingTwistConstraint,
};
use crate::core::bodies::{Bodies, BodyId};
use crate::core::body::{Body, BodySettings, SleepState, INACTIVE};
use crate::core::types::MotionType;
use crate::dynamics::contact::ContactConstraint;
use crate::dynamics::integrator::integrate_velocities;
use crate::dynamics::island::IslandBuilder;
use crate::dynamics::solver::{solve_islands, SolverContext, SolverStepMetrics};
use crate::error::{PhysicsError, Result};
use crate::utils::logging::PhaseSpan;
use crate::utils::profiling::StepProfiler;
use crate::utils::telemetry::TelemetrySink;

/// Central simulation container orchestrating body and constraint
/// lifecycles and the per-step island solve.
pub struct PhysicsWorld {
    pub bodies: Bodies,
    pub constraints: Constraints,
    pub gravity: Vec3,
    pub settings: WorldSettings,
    pub profiler: StepProfiler,
    islands: IslandBuilder,
    contact_cache: ContactCache,
    contact_provider: Box<dyn ContactProvider>,
    contacts: Vec<ContactConstraint>,
    manifolds: Vec<ContactManifold>,
    telemetry: TelemetrySink,
    last_solver_metrics: SolverStepMetrics,
    solver_metrics_logging: bool,
    parallel_enabled: bool,
    previous_dt: f32,
}

pub struct PhysicsWorldBuilder {
    gravity: Vec3,
    settings: WorldSettings,
    parallel_enabled: bool,
    contact_provider: Option<Box<dyn ContactProvider>>,
}

impl Default for PhysicsWorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorldBuilder {
    pub fn new() -> Self {
        Self {
            gravity: WorldSettings::default_gravity(),
            settings: WorldSettings::default(),
            parallel_enabled: false,
            contact_provider: None,
        }
    }

    pub fn gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn settings(mut self, settings: WorldSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel_enabled = enabled;
        self
    }

    pub fn contact_provider<P: ContactProvider + 'static>(mut self, provider: P) -> Self {
        self.contact_provider = Some(Box::new(provider));
        self
    }

    pub fn build(self) -> PhysicsWorld {
        PhysicsWorld {
            bodies: Bodies::new(),
            constraints: Constraints::new(),
            gravity: self.gravity,
            settings: self.settings,
            profiler: StepProfiler::default(),
            islands: IslandBuilder::new(),
            contact_cache: ContactCache::new(),
            contact_provider: self
                .contact_provider
                .unwrap_or_else(|| Box::new(NoopContactProvider)),
            contacts: Vec::new(),
            manifolds: Vec::new(),
            telemetry: TelemetrySink::new(),
            last_solver_metrics: SolverStepMetrics::default(),
            solver_metrics_logging: false,
            parallel_enabled: self.parallel_enabled,
            previous_dt: 0.0,
        }
    }
}

fn ensure_finite(value: Vec3, what: &str) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PhysicsError::InvalidConfiguration(format!(
            "{what} must be finite, got {value}"
        )))
    }
}

fn ensure_axis(value: Vec3, what: &str) -> Result<()> {
    ensure_finite(value, what)?;
    if value.length_squared() < 1e-12 {
        return Err(PhysicsError::InvalidConfiguration(format!(
            "{what} must be non-zero"
        )));
    }
    Ok(())
}

/// Builds a body record from settings; mass properties come from the shape
/// at the requested density unless overridden.
pub(crate) fn build_body(settings: &BodySettings) -> Body {
    let mut props = settings.shape.mass_properties(settings.density);
    if let Some(mass) = settings.mass_override {
        props = props.with_mass(mass);
    }
    let mut body = Body {
        id: BodyId::INVALID,
        pose: settings.pose,
        velocity: settings.velocity,
        motion_type: settings.motion_type,
        shape: settings.shape.clone(),
        mass_properties: props,
        inverse_mass: 0.0,
        inverse_inertia_local: glam::Mat3::ZERO,
        material: settings.material,
        dof_mask: settings.dof_mask,
        gravity_scale: settings.gravity_scale,
        linear_damping: settings.linear_damping,
        angular_damping: settings.angular_damping,
        num_velocity_steps_override: settings.num_velocity_steps_override,
        num_position_steps_override: settings.num_position_steps_override,
        allow_sleeping: settings.allow_sleeping,
        user_data: settings.user_data,
        sleep: SleepState::default(),
        sleeping: false,
        active_index: INACTIVE,
        constraints: Vec::new(),
    };
    body.recompute_inverses();
    body
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> PhysicsWorldBuilder {
        PhysicsWorldBuilder::new()
    }

    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.parallel_enabled = enabled;
    }

    pub fn parallel_enabled(&self) -> bool {
        self.parallel_enabled
    }

    pub fn set_contact_provider<P: ContactProvider + 'static>(&mut self, provider: P) {
        self.contact_provider = Box::new(provider);
    }

    pub fn set_solver_metrics_logging(&mut self, enabled: bool) {
        self.solver_metrics_logging = enabled;
    }

    pub fn last_solver_metrics(&self) -> &SolverStepMetrics {
        &self.last_solver_metrics
    }

    pub fn telemetry(&self) -> &TelemetrySink {
        &self.telemetry
    }

    /// Islands formed by the most recent step.
    pub fn islands(&self) -> &[crate::dynamics::island::Island] {
        self.islands.islands()
    }

    // ----- body lifecycle ---------------------------------------------------

    pub fn create_body(&mut self, settings: &BodySettings) -> Result<BodyId> {
        ensure_finite(settings.pose.position, "body position")?;
        ensure_finite(settings.velocity.linear, "body linear velocity")?;
        ensure_finite(settings.velocity.angular, "body angular velocity")?;
        if !settings.pose.rotation.is_finite() {
            return Err(PhysicsError::InvalidConfiguration(
                "body rotation must be finite".to_string(),
            ));
        }
        if !settings.density.is_finite() || settings.density <= 0.0 {
            return Err(PhysicsError::InvalidConfiguration(format!(
                "body density must be positive and finite, got {}",
                settings.density
            )));
        }

        let body = build_body(settings);
        if body.motion_type == MotionType::Dynamic && body.mass_properties.mass <= 0.0 {
            return Err(PhysicsError::InvalidConfiguration(
                "dynamic body needs positive mass".to_string(),
            ));
        }

        let id = self.bodies.insert(body)?;
        if settings.motion_type != MotionType::Static {
            self.bodies.activate(id.index());
        }
        Ok(id)
    }

    /// Destroys a body, cascading destruction of every constraint that
    /// references it.
    pub fn destroy_body(&mut self, id: BodyId) -> bool {
        let Some(body) = self.bodies.get(id) else {
            return false;
        };
        // Backward over the back-references, since each removal swap-edits
        // the list.
        let refs: Vec<ConstraintId> = body.constraints.iter().rev().copied().collect();
        for constraint_id in refs {
            self.destroy_constraint(constraint_id);
        }
        self.bodies.deactivate(id.index());
        self.bodies.remove(id).is_some()
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(id)
    }

    /// Wakes a sleeping body, dropping the warm-start state of everything
    /// attached to it.
    pub fn wake_body(&mut self, id: BodyId) -> bool {
        let Some(body) = self.bodies.get(id) else {
            return false;
        };
        if body.motion_type == MotionType::Static || !body.is_sleeping() {
            return false;
        }
        self.wake_body_at(id.index());
        true
    }

    fn wake_body_at(&mut self, slab_index: u32) {
        let id = self.bodies.at(slab_index).id;
        self.bodies.activate(slab_index);
        self.contact_cache.clear_body(id);
        let refs: Vec<ConstraintId> = self.bodies.at(slab_index).constraints.clone();
        for constraint_id in refs {
            if let Some(constraint) = self.constraints.get_mut(constraint_id) {
                constraint.kind.reset_warm_start();
            }
        }
    }

    // ----- constraint lifecycle --------------------------------------------

    pub fn create_constraint(&mut self, settings: &ConstraintSettings) -> Result<ConstraintId> {
        let body_a = settings.body_a();
        let body_b = settings.body_b();
        if body_a == body_b {
            return Err(PhysicsError::InvalidConfiguration(
                "constraint needs two distinct bodies".to_string(),
            ));
        }
        let (pose_a, pose_b) = {
            let a = self.bodies.get(body_a).ok_or_else(|| {
                PhysicsError::InvalidConfiguration("body A is stale or destroyed".to_string())
            })?;
            let b = self.bodies.get(body_b).ok_or_else(|| {
                PhysicsError::InvalidConfiguration("body B is stale or destroyed".to_string())
            })?;
            (a.pose, b.pose)
        };

        let kind = match settings {
            ConstraintSettings::Point(s) => {
                ensure_finite(s.anchor, "point anchor")?;
                ConstraintKind::Point(PointConstraint::new(s, &pose_a, &pose_b))
            }
            ConstraintSettings::Distance(s) => {
                ensure_finite(s.anchor_a, "distance anchor A")?;
                ensure_finite(s.anchor_b, "distance anchor B")?;
                ConstraintKind::Distance(DistanceConstraint::new(s, &pose_a, &pose_b))
            }
            ConstraintSettings::Hinge(s) => {
                ensure_finite(s.anchor, "hinge anchor")?;
                ensure_axis(s.axis, "hinge axis")?;
                ConstraintKind::Hinge(HingeConstraint::new(s, &pose_a, &pose_b))
            }
            ConstraintSettings::Slider(s) => {
                ensure_finite(s.anchor, "slider anchor")?;
                ensure_axis(s.axis, "slider axis")?;
                ConstraintKind::Slider(SliderConstraint::new(s, &pose_a, &pose_b))
            }
            ConstraintSettings::Fixed(s) => {
                ensure_finite(s.anchor, "fixed anchor")?;
                ConstraintKind::Fixed(FixedConstraint::new(s, &pose_a, &pose_b))
            }
            ConstraintSettings::Cone(s) => {
                ensure_finite(s.anchor, "cone anchor")?;
                ensure_axis(s.twist_axis, "cone twist axis")?;
                ConstraintKind::Cone(ConeConstraint::new(s, &pose_a, &pose_b))
            }
            ConstraintSettings::SwingTwist(s) => {
                ensure_finite(s.anchor, "swing-twist anchor")?;
                ensure_axis(s.twist_axis, "swing-twist axis")?;
                ConstraintKind::SwingTwist(SwingTwistConstraint::new(s, &pose_a, &pose_b))
            }
            ConstraintSettings::SixDof(s) => {
                ensure_finite(s.anchor, "six-dof anchor")?;
                ConstraintKind::SixDof(SixDofConstraint::new(s, &pose_a, &pose_b))
            }
        };

        let id = self.constraints.insert(kind, body_a, body_b)?;
        self.bodies.get_mut(body_a).expect("checked").constraints.push(id);
        self.bodies.get_mut(body_b).expect("checked").constraints.push(id);

        // New coupling invalidates any sleep decision on either side.
        for body_id in [body_a, body_b] {
            let body = self.bodies.get(body_id).expect("checked");
            if body.motion_type != MotionType::Static && body.is_sleeping() {
                self.wake_body_at(body_id.index());
            }
        }
        Ok(id)
    }

    pub fn destroy_constraint(&mut self, id: ConstraintId) -> bool {
        let Some(constraint) = self.constraints.remove(id) else {
            return false;
        };
        for body_id in [constraint.body_a, constraint.body_b] {
            if let Some(body) = self.bodies.get_mut(body_id) {
                if let Some(pos) = body.constraints.iter().position(|c| *c == id) {
                    body.constraints.swap_remove(pos);
                }
            }
        }
        true
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<&crate::constraint::Constraint> {
        self.constraints.get(id)
    }

    pub fn constraint_mut(&mut self, id: ConstraintId) -> Option<&mut crate::constraint::Constraint> {
        self.constraints.get_mut(id)
    }

    // ----- stepping ---------------------------------------------------------

    /// Advances the simulation by `dt`. A zero `dt` is a no-op: nothing
    /// integrates and the sleep accumulators do not advance.
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let step_start = Instant::now();
        self.profiler.reset();
        self.contact_cache.begin_frame();

        // Gravity and damping first so the velocity solve sees them.
        integrate_velocities(&mut self.bodies, self.gravity, dt, self.parallel_enabled);

        // Narrowphase results, then wake-on-contact propagated to a fixpoint
        // so an impact pulls a whole sleeping pile back in one step.
        let contact_start = Instant::now();
        self.collect_manifolds();
        self.propagate_wakes();
        self.profiler.contact_collect_time = contact_start.elapsed();

        // Islands.
        let island_start = Instant::now();
        {
            let _span = PhaseSpan::enter("island build", self.manifolds.len());
            self.build_islands();
        }
        self.profiler.island_build_time = island_start.elapsed();

        // Per-island solve.
        let solver_start = Instant::now();
        let ratio = if self.previous_dt > 0.0 {
            (dt / self.previous_dt).clamp(0.0, 2.0)
        } else {
            0.0
        };
        let ctx = SolverContext::new(&self.settings, dt, ratio);
        let (metrics, sleeping_islands) = {
            let _span = PhaseSpan::enter("island solve", self.islands.islands().len());
            solve_islands(
                self.islands.islands(),
                &mut self.bodies,
                &mut self.constraints,
                &mut self.contacts,
                &ctx,
                &self.telemetry,
                self.parallel_enabled,
            )
        };
        self.last_solver_metrics = metrics;
        self.profiler.solver_time = solver_start.elapsed();

        for island_index in sleeping_islands {
            let members = self.islands.islands()[island_index].body_indices.clone();
            for slab_index in members {
                let body = self.bodies.at(slab_index);
                if body.motion_type == MotionType::Static {
                    continue;
                }
                self.bodies.deactivate(slab_index);
                let body = self.bodies.at_mut(slab_index);
                body.sleeping = true;
                body.velocity.linear = Vec3::ZERO;
                body.velocity.angular = Vec3::ZERO;
            }
            debug!("island {island_index} went to sleep");
        }

        // Persist accumulated impulses for next frame's warm start.
        for contact in &self.contacts {
            self.contact_cache
                .store(contact.body_a, contact.body_b, contact.cached_points());
        }
        self.contact_cache.prune_stale();

        self.previous_dt = dt;
        self.profiler.total_step_time = step_start.elapsed();
        self.profiler.body_count = self.bodies.len();
        self.profiler.active_body_count = self.bodies.num_active();
        self.profiler.contact_count = self.contacts.len();
        self.profiler.island_count = self.islands.islands().len();
        self.profiler.report();
        if self.solver_metrics_logging {
            self.last_solver_metrics.log();
        }
    }

    fn collect_manifolds(&mut self) {
        self.manifolds.clear();
        let manifolds = &mut self.manifolds;
        self.contact_provider
            .collect(&self.bodies, &mut |manifold| manifolds.push(manifold));
    }

    /// Wakes every sleeper reachable from an awake non-static body through a
    /// manifold or an enabled constraint. Runs to a fixpoint so a chain of
    /// sleeping bodies comes back in a single step.
    fn propagate_wakes(&mut self) {
        loop {
            let mut to_wake = Vec::new();
            let mut queue = |bodies: &Bodies, id_a: BodyId, id_b: BodyId, out: &mut Vec<u32>| {
                let (Some(a), Some(b)) = (bodies.get(id_a), bodies.get(id_b)) else {
                    return;
                };
                let a_pushes = a.motion_type != MotionType::Static && !a.is_sleeping();
                let b_pushes = b.motion_type != MotionType::Static && !b.is_sleeping();
                if a_pushes && b.is_sleeping() && b.motion_type != MotionType::Static {
                    out.push(id_b.index());
                }
                if b_pushes && a.is_sleeping() && a.motion_type != MotionType::Static {
                    out.push(id_a.index());
                }
            };
            for manifold in &self.manifolds {
                queue(&self.bodies, manifold.body_a, manifold.body_b, &mut to_wake);
            }
            for constraint in self.constraints.iter() {
                if constraint.enabled {
                    queue(&self.bodies, constraint.body_a, constraint.body_b, &mut to_wake);
                }
            }
            if to_wake.is_empty() {
                break;
            }
            for index in to_wake {
                if self.bodies.at(index).is_sleeping() {
                    self.wake_body_at(index);
                }
            }
        }
    }

    fn build_islands(&mut self) {
        self.islands
            .prepare(self.bodies.num_active(), self.manifolds.len());
        self.contacts.clear();

        for manifold in &self.manifolds {
            let Some((body_a, body_b)) = self
                .bodies
                .get(manifold.body_a)
                .zip(self.bodies.get(manifold.body_b))
            else {
                continue;
            };
            let active_a = body_a.active_index();
            let active_b = body_b.active_index();

            let has_awake_dynamic = (body_a.is_dynamic() && !body_a.is_sleeping())
                || (body_b.is_dynamic() && !body_b.is_sleeping());
            if !has_awake_dynamic {
                // Not lifted into a constraint; assignment only. A fully
                // sleeping pair stores INACTIVE and is dropped at finalize.
                continue;
            }

            let contact_index = self.contacts.len() as u32;
            self.contacts.push(ContactConstraint::new(
                manifold,
                body_a,
                body_b,
                &self.contact_cache,
                self.settings.restitution_threshold,
            ));
            self.islands
                .link_contact_constraint(contact_index, active_a, active_b);
        }

        for constraint in self.constraints.iter() {
            if !constraint.enabled {
                continue;
            }
            let Some((body_a, body_b)) = self
                .bodies
                .get(constraint.body_a)
                .zip(self.bodies.get(constraint.body_b))
            else {
                continue;
            };
            self.islands.link_constraint(
                constraint.id,
                body_a.active_index(),
                body_b.active_index(),
            );
        }

        self.islands
            .finalize(&self.bodies, &self.constraints, &self.settings);
    }
}
