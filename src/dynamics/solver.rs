//! Per-island sequential-impulse driver.
//!
//! Each island is packaged into a job holding clones of its bodies,
//! contacts, and constraint payloads. Jobs never share a mutable body, so
//! they can run on rayon workers; results are written back serially after
//! the fan-out. Inside a job the iterations are strict Gauss-Seidel: every
//! constraint sees the impulses applied before it in the same iteration.

use std::collections::HashMap;

use log::debug;

use crate::config::WorldSettings;
use crate::constraint::part::CorrectionLimits;
use crate::constraint::{ConstraintId, ConstraintKind, Constraints};
use crate::core::bodies::{Bodies, BodyId};
use crate::core::body::Body;
use crate::core::types::MotionType;
use crate::dynamics::contact::ContactConstraint;
use crate::dynamics::integrator::integrate_body_position;
use crate::dynamics::island::Island;
use crate::utils::telemetry::{DegeneracyEvent, TelemetrySink};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Per-step solver inputs shared by every island.
#[derive(Debug, Clone, Copy)]
pub struct SolverContext {
    pub dt: f32,
    /// `clamp(dt_new/dt_old, 0, 2)`; zero on the first step.
    pub warm_start_ratio: f32,
    pub baumgarte: f32,
    pub penetration_slop: f32,
    pub limits: CorrectionLimits,
    pub point_velocity_sleep_threshold: f32,
    pub time_before_sleep: f32,
}

impl SolverContext {
    pub fn new(settings: &WorldSettings, dt: f32, warm_start_ratio: f32) -> Self {
        Self {
            dt,
            warm_start_ratio,
            baumgarte: settings.baumgarte,
            penetration_slop: settings.penetration_slop,
            limits: CorrectionLimits {
                max_linear: settings.max_position_correction,
                max_angular: settings.max_angular_correction,
            },
            point_velocity_sleep_threshold: settings.point_velocity_sleep_threshold,
            time_before_sleep: settings.time_before_sleep,
        }
    }
}

/// Workload counters logged after each step when metrics logging is on.
#[derive(Debug, Default, Clone)]
pub struct SolverStepMetrics {
    pub islands_solved: usize,
    pub contacts_solved: usize,
    pub constraints_solved: usize,
    pub normal_impulse_sum: f32,
    pub friction_impulse_sum: f32,
}

impl SolverStepMetrics {
    pub fn merge(&mut self, other: &Self) {
        self.islands_solved += other.islands_solved;
        self.contacts_solved += other.contacts_solved;
        self.constraints_solved += other.constraints_solved;
        self.normal_impulse_sum += other.normal_impulse_sum;
        self.friction_impulse_sum += other.friction_impulse_sum;
    }

    pub fn log(&self) {
        debug!(
            "solver metrics: islands={} contacts={} constraints={} normal_sum={:.4} friction_sum={:.4}",
            self.islands_solved,
            self.contacts_solved,
            self.constraints_solved,
            self.normal_impulse_sum,
            self.friction_impulse_sum
        );
    }
}

/// Everything one island needs, detached from the world so islands can be
/// solved concurrently.
pub struct IslandJob {
    /// Slab indices of the member bodies, parallel to the leading entries of
    /// `bodies`.
    member_indices: Vec<u32>,
    bodies: Vec<Body>,
    index_of: HashMap<BodyId, usize>,
    contacts: Vec<(u32, ContactConstraint)>,
    constraints: Vec<(ConstraintId, BodyId, BodyId, ConstraintKind)>,
    num_velocity_steps: u32,
    num_position_steps: u32,
    /// Filled by `solve`: true when every non-static member is a sleep
    /// candidate.
    pub can_sleep: bool,
    pub metrics: SolverStepMetrics,
}

fn pair_mut(
    bodies: &mut [Body],
    index_of: &HashMap<BodyId, usize>,
    a: BodyId,
    b: BodyId,
) -> Option<(usize, usize)> {
    let ia = *index_of.get(&a)?;
    let ib = *index_of.get(&b)?;
    if ia == ib || ia >= bodies.len() || ib >= bodies.len() {
        return None;
    }
    Some((ia, ib))
}

fn split_pair(bodies: &mut [Body], ia: usize, ib: usize) -> (&mut Body, &mut Body) {
    if ia < ib {
        let (left, right) = bodies.split_at_mut(ib);
        (&mut left[ia], &mut right[0])
    } else {
        let (left, right) = bodies.split_at_mut(ia);
        (&mut right[0], &mut left[ib])
    }
}

impl IslandJob {
    /// Clones the island's bodies, contacts, and constraint payloads out of
    /// the world. Static partners referenced by a contact or constraint ride
    /// along read-only.
    pub fn prepare(
        island: &Island,
        bodies: &Bodies,
        constraints: &Constraints,
        contacts: &[ContactConstraint],
    ) -> Self {
        let mut job = Self {
            member_indices: island.body_indices.clone(),
            bodies: Vec::with_capacity(island.body_indices.len()),
            index_of: HashMap::with_capacity(island.body_indices.len()),
            contacts: Vec::with_capacity(island.contact_indices.len()),
            constraints: Vec::with_capacity(island.constraint_ids.len()),
            num_velocity_steps: island.num_velocity_steps,
            num_position_steps: island.num_position_steps,
            can_sleep: false,
            metrics: SolverStepMetrics::default(),
        };

        for &index in &island.body_indices {
            let body = bodies.at(index);
            job.index_of.insert(body.id, job.bodies.len());
            job.bodies.push(body.clone());
        }

        let mut add_partner = |job: &mut Self, id: BodyId| {
            if !job.index_of.contains_key(&id) {
                if let Some(body) = bodies.get(id) {
                    job.index_of.insert(id, job.bodies.len());
                    job.bodies.push(body.clone());
                }
            }
        };

        for &contact_index in &island.contact_indices {
            let contact = &contacts[contact_index as usize];
            add_partner(&mut job, contact.body_a);
            add_partner(&mut job, contact.body_b);
            job.contacts.push((contact_index, contact.clone()));
        }

        // Stable in-island ordering: priority first, then pool index.
        let mut ids: Vec<(u32, u32, ConstraintId)> = island
            .constraint_ids
            .iter()
            .filter_map(|id| {
                let constraint = constraints.get(*id)?;
                if !constraint.enabled {
                    return None;
                }
                Some((constraint.priority, id.index(), *id))
            })
            .collect();
        ids.sort_unstable_by_key(|&(priority, index, _)| (priority, index));

        for (_, _, id) in ids {
            let constraint = constraints.get(id).expect("validated above");
            add_partner(&mut job, constraint.body_a);
            add_partner(&mut job, constraint.body_b);
            job.constraints.push((
                id,
                constraint.body_a,
                constraint.body_b,
                constraint.kind.clone(),
            ));
        }

        job
    }

    /// Runs the full island pipeline: setup, warm start, velocity
    /// iterations, position integration, position iterations, sleep check.
    pub fn solve(&mut self, ctx: &SolverContext, telemetry: &TelemetrySink) {
        self.metrics.islands_solved = 1;
        self.metrics.contacts_solved = self.contacts.len();
        self.metrics.constraints_solved = self.constraints.len();

        // Setup.
        for (_, body_a, body_b, kind) in &mut self.constraints {
            if let Some((ia, ib)) = pair_mut(&mut self.bodies, &self.index_of, *body_a, *body_b) {
                let (a, b) = split_pair(&mut self.bodies, ia, ib);
                if !kind.setup(a, b) {
                    telemetry.record(DegeneracyEvent::SingularEffectiveMass {
                        context: "constraint setup",
                    });
                }
            }
        }

        // Warm start.
        for (_, body_a, body_b, kind) in &mut self.constraints {
            if let Some((ia, ib)) = pair_mut(&mut self.bodies, &self.index_of, *body_a, *body_b) {
                let (a, b) = split_pair(&mut self.bodies, ia, ib);
                kind.warm_start(a, b, ctx.warm_start_ratio);
            }
        }
        for (_, contact) in &mut self.contacts {
            if let Some((ia, ib)) =
                pair_mut(&mut self.bodies, &self.index_of, contact.body_a, contact.body_b)
            {
                let (a, b) = split_pair(&mut self.bodies, ia, ib);
                contact.warm_start(a, b, ctx.warm_start_ratio);
            }
        }

        // Velocity iterations, Gauss-Seidel within the island.
        for _ in 0..self.num_velocity_steps {
            for (_, body_a, body_b, kind) in &mut self.constraints {
                if let Some((ia, ib)) =
                    pair_mut(&mut self.bodies, &self.index_of, *body_a, *body_b)
                {
                    let (a, b) = split_pair(&mut self.bodies, ia, ib);
                    kind.solve_velocity(a, b);
                }
            }
            for (_, contact) in &mut self.contacts {
                if let Some((ia, ib)) = pair_mut(
                    &mut self.bodies,
                    &self.index_of,
                    contact.body_a,
                    contact.body_b,
                ) {
                    let (a, b) = split_pair(&mut self.bodies, ia, ib);
                    contact.solve_velocity(a, b);
                }
            }
        }

        // Integrate member poses; ride-along partners are static.
        let num_members = self.member_indices.len();
        for body in &mut self.bodies[..num_members] {
            integrate_body_position(body, ctx.dt);
        }

        // Position iterations with early-out.
        for _ in 0..self.num_position_steps {
            let mut applied = false;
            for (_, body_a, body_b, kind) in &mut self.constraints {
                if let Some((ia, ib)) =
                    pair_mut(&mut self.bodies, &self.index_of, *body_a, *body_b)
                {
                    let (a, b) = split_pair(&mut self.bodies, ia, ib);
                    applied |= kind.solve_position(a, b, ctx.baumgarte, &ctx.limits);
                }
            }
            for (_, contact) in &mut self.contacts {
                if let Some((ia, ib)) = pair_mut(
                    &mut self.bodies,
                    &self.index_of,
                    contact.body_a,
                    contact.body_b,
                ) {
                    let (a, b) = split_pair(&mut self.bodies, ia, ib);
                    applied |= contact.solve_position(
                        a,
                        b,
                        ctx.baumgarte,
                        ctx.penetration_slop,
                        &ctx.limits,
                    );
                }
            }
            if !applied {
                break;
            }
        }

        let mut normal_sum = 0.0;
        let mut friction_sum = 0.0;
        for (_, contact) in &self.contacts {
            for point in contact.cached_points() {
                normal_sum += point.normal_lambda.abs();
                friction_sum += point.friction_lambda[0].abs() + point.friction_lambda[1].abs();
            }
        }
        self.metrics.normal_impulse_sum += normal_sum;
        self.metrics.friction_impulse_sum += friction_sum;

        // Sleep check: every non-static member must have been quiescent for
        // long enough.
        let mut all_quiescent = num_members > 0;
        for body in &mut self.bodies[..num_members] {
            if body.motion_type == MotionType::Static {
                continue;
            }
            let points = body.characteristic_points();
            body.sleep.push(points);
            let threshold = ctx.point_velocity_sleep_threshold * ctx.time_before_sleep;
            if body.sleep.motion_extent() < threshold {
                body.sleep.time_quiescent += ctx.dt;
            } else {
                body.sleep.time_quiescent = 0.0;
            }
            let candidate =
                body.allow_sleeping && body.sleep.time_quiescent >= ctx.time_before_sleep;
            all_quiescent &= candidate;
        }
        self.can_sleep = all_quiescent;
    }

    /// Copies the solved state back into the world: member body state,
    /// contact impulses for the cache, and constraint warm-start lambdas.
    pub fn write_back(
        self,
        bodies: &mut Bodies,
        constraints: &mut Constraints,
        contacts: &mut [ContactConstraint],
    ) {
        for (local, &slab_index) in self.member_indices.iter().enumerate() {
            let solved = &self.bodies[local];
            let body = bodies.at_mut(slab_index);
            body.pose = solved.pose;
            body.velocity = solved.velocity;
            body.sleep = solved.sleep;
        }
        for (contact_index, contact) in self.contacts {
            contacts[contact_index as usize] = contact;
        }
        for (id, _, _, kind) in self.constraints {
            if let Some(constraint) = constraints.get_mut(id) {
                constraint.kind = kind;
            }
        }
    }
}

/// Solves every island, fanning out across rayon workers when the
/// `parallel` feature is enabled and requested.
#[allow(clippy::too_many_arguments)]
pub fn solve_islands(
    islands: &[Island],
    bodies: &mut Bodies,
    constraints: &mut Constraints,
    contacts: &mut [ContactConstraint],
    ctx: &SolverContext,
    telemetry: &TelemetrySink,
    parallel: bool,
) -> (SolverStepMetrics, Vec<usize>) {
    let mut jobs: Vec<IslandJob> = islands
        .iter()
        .map(|island| IslandJob::prepare(island, bodies, constraints, contacts))
        .collect();

    #[cfg(feature = "parallel")]
    if parallel {
        jobs.par_iter_mut().for_each(|job| job.solve(ctx, telemetry));
    } else {
        for job in &mut jobs {
            job.solve(ctx, telemetry);
        }
    }
    #[cfg(not(feature = "parallel"))]
    {
        let _ = parallel;
        for job in &mut jobs {
            job.solve(ctx, telemetry);
        }
    }

    let mut metrics = SolverStepMetrics::default();
    let mut sleeping_islands = Vec::new();
    for (island_index, job) in jobs.into_iter().enumerate() {
        metrics.merge(&job.metrics);
        if job.can_sleep {
            sleeping_islands.push(island_index);
        }
        job.write_back(bodies, constraints, contacts);
    }
    (metrics, sleeping_islands)
}
