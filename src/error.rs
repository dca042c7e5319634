//! Error types for the Kinetica core.
//!
//! This module provides a unified error type [`PhysicsError`] and a
//! convenient [`Result`] alias. Two failure classes deliberately stay out
//! of the enum: per-frame numeric degeneracies deactivate the offending
//! constraint part and are reported through the telemetry sink, and stale
//! identifiers are expected control flow surfaced as absent results from
//! the getters.

use std::fmt;

/// Main error type for the physics core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhysicsError {
    /// A body or constraint was created from invalid settings (stale body
    /// reference, non-finite value, non-positive dimension).
    InvalidConfiguration(String),
    /// A bit-packed value ran out of room (sub-shape path, constraint type
    /// space).
    Overflow(String),
    /// A pool reached its 2^24 slot capacity.
    CapacityExceeded(String),
}

impl fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidConfiguration(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Overflow(msg) => write!(f, "overflow: {msg}"),
            Self::CapacityExceeded(msg) => write!(f, "capacity exceeded: {msg}"),
        }
    }
}

impl std::error::Error for PhysicsError {}

/// Convenient Result type alias for core operations.
pub type Result<T> = std::result::Result<T, PhysicsError>;
