//! Invariant oracle for simulation runs.
//!
//! The Oracle watches every step of a run and records each place where the
//! result breaks a property that must hold regardless of parameters:
//! - Population size and id order are preserved
//! - Every bot ends inside the bounds
//! - No speed exceeds the policy maximum
//! - All state stays finite

use flock_core::{AgentId, Population, SimulationConfig};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Relative slack on the speed bound for rounding in the rescale.
const SPEED_TOLERANCE: f64 = 1e-9;

/// A broken invariant observed after a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    SizeChanged { step: u64, before: usize, after: usize },
    IdsChanged { step: u64 },
    OutOfBounds { step: u64, id: AgentId, x: f64, y: f64 },
    SpeedExceeded { step: u64, id: AgentId, speed: f64, max: f64 },
    NonFinite { step: u64, id: AgentId },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::SizeChanged { step, before, after } => {
                write!(f, "step {}: population size changed {} -> {}", step, before, after)
            }
            Violation::IdsChanged { step } => write!(f, "step {}: ids or their order changed", step),
            Violation::OutOfBounds { step, id, x, y } => {
                write!(f, "step {}: {} out of bounds at ({:.3}, {:.3})", step, id, x, y)
            }
            Violation::SpeedExceeded { step, id, speed, max } => {
                write!(f, "step {}: {} speed {:.6} exceeds {:.6}", step, id, speed, max)
            }
            Violation::NonFinite { step, id } => write!(f, "step {}: {} has non-finite state", step, id),
        }
    }
}

/// Records invariant violations across a run.
#[derive(Debug, Default)]
pub struct Oracle {
    violations: Vec<Violation>,
    checks: u64,
}

impl Oracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks one step's result against the configuration it ran under.
    ///
    /// Returns the number of new violations.
    pub fn check_step(
        &mut self,
        step: u64,
        before: &Population,
        after: &Population,
        config: &SimulationConfig,
    ) -> usize {
        self.checks += 1;
        let start = self.violations.len();

        if before.len() != after.len() {
            self.violations.push(Violation::SizeChanged {
                step,
                before: before.len(),
                after: after.len(),
            });
        } else if before.iter().zip(after.iter()).any(|(a, b)| a.id != b.id) {
            self.violations.push(Violation::IdsChanged { step });
        }

        let max = config.speed.max();
        for agent in after {
            if !agent.is_finite() {
                self.violations.push(Violation::NonFinite { step, id: agent.id });
                continue;
            }
            if !config.bounds.contains(&agent.position) {
                self.violations.push(Violation::OutOfBounds {
                    step,
                    id: agent.id,
                    x: agent.position.x,
                    y: agent.position.y,
                });
            }
            let speed = agent.speed();
            if speed > max * (1.0 + SPEED_TOLERANCE) {
                self.violations.push(Violation::SpeedExceeded {
                    step,
                    id: agent.id,
                    speed,
                    max,
                });
            }
        }

        let found = self.violations.len() - start;
        if found > 0 {
            warn!(step, found, "invariant violations");
        }
        found
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of steps checked.
    pub fn checks(&self) -> u64 {
        self.checks
    }
}
