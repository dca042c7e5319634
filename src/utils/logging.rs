use log::{log_enabled, trace, Level};
use std::time::Instant;

/// Trace-level span over one phase of the step pipeline, recording how much
/// work the phase covered alongside its duration. Timing is only taken when
/// trace logging is enabled, so the span is free in production.
pub struct PhaseSpan {
    phase: &'static str,
    workload: usize,
    start: Option<Instant>,
}

impl PhaseSpan {
    /// Opens a span for `phase` covering `workload` items (islands for the
    /// solve, manifolds for the island build).
    pub fn enter(phase: &'static str, workload: usize) -> Self {
        Self {
            phase,
            workload,
            start: log_enabled!(Level::Trace).then(Instant::now),
        }
    }
}

impl Drop for PhaseSpan {
    fn drop(&mut self) {
        if let Some(start) = self.start {
            trace!(
                "{}: {} items in {} µs",
                self.phase,
                self.workload,
                start.elapsed().as_micros()
            );
        }
    }
}
