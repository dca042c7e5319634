pub mod logging;
pub mod math;
pub mod profiling;
pub mod telemetry;
