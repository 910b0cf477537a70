//! Error types for the flocking core.

use crate::agent::AgentId;
use thiserror::Error;

/// Errors raised by the flocking core.
///
/// Zero neighbors and zero speed are defined edge cases, not errors;
/// everything here is a caller contract violation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlockError {
    /// Configuration violates an invariant (bounds order, negative weight, ...)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A population must contain at least one agent
    #[error("Population is empty")]
    EmptyPopulation,

    /// Two agents share an identifier
    #[error("Duplicate agent id: {0}")]
    DuplicateId(AgentId),

    /// Position or velocity is NaN or infinite
    #[error("Non-finite state for agent {0}")]
    NonFiniteState(AgentId),
}

impl FlockError {
    /// Creates an invalid-configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
