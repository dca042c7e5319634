use std::time::Duration;

use log::debug;

/// Per-step timing and workload counters, attached to the world and filled
/// in as the step pipeline runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct StepProfiler {
    pub contact_collect_time: Duration,
    pub island_build_time: Duration,
    pub solver_time: Duration,
    pub integrate_time: Duration,
    pub total_step_time: Duration,

    pub body_count: usize,
    pub active_body_count: usize,
    pub contact_count: usize,
    pub island_count: usize,
}

impl StepProfiler {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn report(&self) {
        let total_us = self.total_step_time.as_micros() as f32;
        if total_us < 1.0 {
            return;
        }

        debug!(
            "step: bodies={} (active {}), contacts={}, islands={}",
            self.body_count, self.active_body_count, self.contact_count, self.island_count
        );
        debug!(
            "step timing: total {:.2} ms | contacts {:.2} ms ({:.1}%) | islands {:.2} ms ({:.1}%) | solver {:.2} ms ({:.1}%) | integrate {:.2} ms ({:.1}%)",
            self.total_step_time.as_secs_f32() * 1000.0,
            self.contact_collect_time.as_secs_f32() * 1000.0,
            self.contact_collect_time.as_micros() as f32 / total_us * 100.0,
            self.island_build_time.as_secs_f32() * 1000.0,
            self.island_build_time.as_micros() as f32 / total_us * 100.0,
            self.solver_time.as_secs_f32() * 1000.0,
            self.solver_time.as_micros() as f32 / total_us * 100.0,
            self.integrate_time.as_secs_f32() * 1000.0,
            self.integrate_time.as_micros() as f32 / total_us * 100.0,
        );
    }
}
