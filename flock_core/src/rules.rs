//! Interaction rule evaluator.
//!
//! For one agent, classifies every other agent of the pre-step snapshot:
//! - **too close** (`d² < protected²`): contributes `self - other` to the
//!   repulsion accumulator
//! - **visible** (`protected² ≤ d² < visual²`): contributes position and
//!   velocity to the cohesion/alignment averages
//!
//! "Other" is decided by snapshot index, so co-located agents still see
//! each other. Only squared distances are compared.

use crate::agent::Agent;
use crate::config::SimulationConfig;
use nalgebra::Vector2;

/// Squared interaction radii, computed once per step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranges {
    pub visual_squared: f64,
    pub protected_squared: f64,
}

impl From<&SimulationConfig> for Ranges {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            visual_squared: config.visual_range_squared(),
            protected_squared: config.protected_range_squared(),
        }
    }
}

/// Everything the integrator needs to know about one agent's surroundings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborSummary {
    /// Σ (self − other) over too-close agents
    pub close_delta: Vector2<f64>,

    /// Σ position over visible agents
    pub position_sum: Vector2<f64>,

    /// Σ velocity over visible agents
    pub velocity_sum: Vector2<f64>,

    /// Number of visible agents
    pub neighbor_count: usize,
}

impl Default for NeighborSummary {
    fn default() -> Self {
        Self {
            close_delta: Vector2::zeros(),
            position_sum: Vector2::zeros(),
            velocity_sum: Vector2::zeros(),
            neighbor_count: 0,
        }
    }
}

impl NeighborSummary {
    /// Classifies `other` relative to `agent` and accumulates it.
    #[inline]
    pub fn observe(&mut self, agent: &Agent, other: &Agent, ranges: &Ranges) {
        let offset = agent.position - other.position;
        let squared_distance = offset.norm_squared();

        if squared_distance < ranges.protected_squared {
            self.close_delta += offset;
        } else if squared_distance < ranges.visual_squared {
            self.position_sum += other.position;
            self.velocity_sum += other.velocity;
            self.neighbor_count += 1;
        }
    }

    /// Mean position of visible agents; `None` when there are none.
    pub fn average_position(&self) -> Option<Vector2<f64>> {
        (self.neighbor_count > 0).then(|| self.position_sum / self.neighbor_count as f64)
    }

    /// Mean velocity of visible agents; `None` when there are none.
    pub fn average_velocity(&self) -> Option<Vector2<f64>> {
        (self.neighbor_count > 0).then(|| self.velocity_sum / self.neighbor_count as f64)
    }
}

/// All-pairs scan for the agent at `index`.
pub fn evaluate(index: usize, snapshot: &[Agent], ranges: &Ranges) -> NeighborSummary {
    let agent = &snapshot[index];
    let mut summary = NeighborSummary::default();

    for (j, other) in snapshot.iter().enumerate() {
        if j != index {
            summary.observe(agent, other, ranges);
        }
    }
    summary
}

/// Scan restricted to `candidates` (snapshot indices, ascending).
///
/// Gives the same result as [`evaluate`] as long as every agent within
/// visual range is among the candidates.
pub fn evaluate_candidates(
    index: usize,
    snapshot: &[Agent],
    candidates: &[usize],
    ranges: &Ranges,
) -> NeighborSummary {
    let agent = &snapshot[index];
    let mut summary = NeighborSummary::default();

    for &j in candidates {
        if j != index {
            summary.observe(agent, &snapshot[j], ranges);
        }
    }
    summary
}

/// Agents of the snapshot other than `index` that are too close.
pub fn close_neighbors<'a>(
    index: usize,
    snapshot: &'a [Agent],
    ranges: &'a Ranges,
) -> impl Iterator<Item = &'a Agent> + 'a {
    let agent = &snapshot[index];
    snapshot
        .iter()
        .enumerate()
        .filter(move |(j, other)| {
            *j != index && agent.squared_distance_to(other) < ranges.protected_squared
        })
        .map(|(_, other)| other)
}

/// Agents of the snapshot other than `index` in the visible band.
pub fn visible_neighbors<'a>(
    index: usize,
    snapshot: &'a [Agent],
    ranges: &'a Ranges,
) -> impl Iterator<Item = &'a Agent> + 'a {
    let agent = &snapshot[index];
    snapshot
        .iter()
        .enumerate()
        .filter(move |(j, other)| {
            let squared_distance = agent.squared_distance_to(other);
            *j != index
                && squared_distance >= ranges.protected_squared
                && squared_distance < ranges.visual_squared
        })
        .map(|(_, other)| other)
}
