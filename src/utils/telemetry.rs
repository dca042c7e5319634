use parking_lot::Mutex;

use log::warn;

/// Numeric trouble encountered while solving. These never abort a step; the
/// offending part is deactivated for the frame and an event is recorded here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegeneracyEvent {
    /// Effective-mass matrix could not be inverted.
    SingularEffectiveMass { context: &'static str },
    /// A reference axis collapsed to zero length.
    ZeroLengthAxis { context: &'static str },
}

/// Sink for per-frame degeneracy events. Solver workers may push from rayon
/// threads, so the buffer sits behind a mutex.
#[derive(Default)]
pub struct TelemetrySink {
    events: Mutex<Vec<DegeneracyEvent>>,
}

impl TelemetrySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: DegeneracyEvent) {
        match &event {
            DegeneracyEvent::SingularEffectiveMass { context } => {
                warn!("singular effective mass in {context}; part deactivated for this frame");
            }
            DegeneracyEvent::ZeroLengthAxis { context } => {
                warn!("zero-length axis in {context}; part deactivated for this frame");
            }
        }
        self.events.lock().push(event);
    }

    /// Removes and returns all recorded events.
    pub fn drain(&self) -> Vec<DegeneracyEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}
