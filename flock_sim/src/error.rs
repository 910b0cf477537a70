//! Error types for the simulation harness.

use flock_core::FlockError;
use flock_env::EnvError;
use thiserror::Error;

/// Errors raised while driving or evaluating a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// Model or configuration error from the core
    #[error(transparent)]
    Flock(#[from] FlockError),

    /// Driver/environment error
    #[error(transparent)]
    Env(#[from] EnvError),

    /// Export file could not be written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Driver task panicked or was aborted
    #[error("Driver task failed: {0}")]
    DriverTask(#[from] tokio::task::JoinError),

    /// Scenario name not recognised
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),
}
