//! Errors reported when constructing a simulation, attaching forces or
//! changing force parameters.
//!
//! Degenerate geometry at step time is never an error; see
//! [`crate::jitter`].

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// The same external ID was given for two nodes.
    #[error("duplicate node id {0}")]
    DuplicateNode(String),

    /// A referenced external ID was not part of the simulation.
    #[error("unknown node id {0}")]
    UnknownNode(String),

    /// A force parameter is out of its allowed range.
    #[error("invalid {name}: {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// A link refers to a dense index outside `0..len`.
    #[error("link {link} references node index {index}, but there are only {len} nodes")]
    LinkOutOfRange {
        link: usize,
        index: usize,
        len: usize,
    },

    /// An axis outside `0..DIM` was configured.
    #[error("axis {axis} out of range for {dim}-dimensional vectors")]
    InvalidAxis { axis: usize, dim: usize },

    /// A [`crate::config::SimulationConfig`] value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for simulation setup operations.
pub type SimResult<T> = Result<T, SimulationError>;

/// Accepts any finite value.
pub(crate) fn finite(name: &'static str, value: f64) -> SimResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SimulationError::InvalidParameter {
            name,
            value,
            reason: "must be finite",
        })
    }
}

/// Accepts finite values `>= 0`.
pub(crate) fn non_negative(name: &'static str, value: f64) -> SimResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(SimulationError::InvalidParameter {
            name,
            value,
            reason: "must be finite and non-negative",
        })
    }
}

/// Accepts values in `[0, 1]`.
pub(crate) fn unit_interval(name: &'static str, value: f64) -> SimResult<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(SimulationError::InvalidParameter {
            name,
            value,
            reason: "must be within [0, 1]",
        })
    }
}

/// Accepts values `>= 1`.
pub(crate) fn at_least_one(name: &'static str, value: usize) -> SimResult<usize> {
    if value >= 1 {
        Ok(value)
    } else {
        Err(SimulationError::InvalidParameter {
            name,
            value: value as f64,
            reason: "must be at least 1",
        })
    }
}
