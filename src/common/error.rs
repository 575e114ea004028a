//! Error types for voxel_planner

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Which end of a planning request could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    Goal,
    /// Intermediate point of a multi-leg request
    ViaPoint(usize),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Start => write!(f, "start"),
            Endpoint::Goal => write!(f, "goal"),
            Endpoint::ViaPoint(i) => write!(f, "via point {}", i),
        }
    }
}

/// Main error type for planning requests
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanningError {
    /// Start or goal does not resolve to a usable key
    #[error("Invalid {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: Endpoint, reason: String },
    /// Frontier exhausted before the goal was reached
    #[error("Goal unreachable, frontier exhausted after {expansions} expansions")]
    Unreachable { expansions: usize },
    /// Wall-clock budget exceeded without a best-effort fallback
    #[error("Planning timed out after {elapsed:?} ({expansions} expansions)")]
    Timeout { elapsed: Duration, expansions: usize },
    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl PlanningError {
    pub fn invalid_endpoint(endpoint: Endpoint, reason: impl Into<String>) -> Self {
        PlanningError::InvalidEndpoint {
            endpoint,
            reason: reason.into(),
        }
    }
}

/// Result type alias for planning operations
pub type PlanningResult<T> = Result<T, PlanningError>;
