//! Common types for the flock environment abstraction.

use crate::error::EnvError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on the step rate. Anything faster is a busy loop.
const MAX_STEPS_PER_SECOND: f64 = 10_000.0;

/// How often the driver invokes the step function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepRate(f64);

impl StepRate {
    /// Creates a step rate in steps per second.
    ///
    /// Rejects non-finite, non-positive and absurdly large rates.
    pub fn per_second(steps: f64) -> Result<Self, EnvError> {
        if !steps.is_finite() || steps <= 0.0 {
            return Err(EnvError::invalid_rate(format!(
                "{steps} steps/s must be positive and finite"
            )));
        }
        if steps > MAX_STEPS_PER_SECOND {
            return Err(EnvError::invalid_rate(format!(
                "{steps} steps/s exceeds {MAX_STEPS_PER_SECOND}"
            )));
        }
        Ok(Self(steps))
    }

    /// Returns the rate in steps per second.
    pub fn steps_per_second(&self) -> f64 {
        self.0
    }

    /// Returns the delay between two consecutive steps.
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.0)
    }
}

impl Default for StepRate {
    fn default() -> Self {
        Self(50.0)
    }
}

impl std::fmt::Display for StepRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} steps/s", self.0)
    }
}

/// Lifecycle of a driver.
///
/// `Finished` and `Cancelled` are terminal; `Running` and `Paused` toggle
/// freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DriverState {
    /// Created, never started
    #[default]
    Idle,
    /// Scheduling steps
    Running,
    /// Stopped scheduling, may resume
    Paused,
    /// Reached its step budget
    Finished,
    /// Stopped for good
    Cancelled,
}

impl DriverState {
    /// Returns true once the driver can no longer be resumed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DriverState::Finished | DriverState::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_rate_interval() {
        let rate = StepRate::per_second(50.0).unwrap();
        assert_eq!(rate.interval(), Duration::from_millis(20));
    }

    #[test]
    fn test_step_rate_rejects_invalid() {
        assert!(StepRate::per_second(0.0).is_err());
        assert!(StepRate::per_second(-3.0).is_err());
        assert!(StepRate::per_second(f64::NAN).is_err());
        assert!(StepRate::per_second(1e9).is_err());
    }

    #[test]
    fn test_driver_state_terminal() {
        assert!(!DriverState::Idle.is_terminal());
        assert!(!DriverState::Paused.is_terminal());
        assert!(DriverState::Finished.is_terminal());
        assert!(DriverState::Cancelled.is_terminal());
    }
}
