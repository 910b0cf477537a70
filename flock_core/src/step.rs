//! The step function: one simultaneous update of the whole population.
//!
//! Every agent reads only the pre-step snapshot. No agent's new state is
//! visible to any other agent within the same step, so the result does not
//! depend on iteration order and the per-agent work can fan out across
//! threads, each writing its own output slot.

use crate::agent::{Agent, Population};
use crate::boundary;
use crate::config::SimulationConfig;
use crate::error::FlockError;
use crate::integrator::{clamp_speed, steer};
use crate::rules::{evaluate, evaluate_candidates, NeighborSummary, Ranges};
use crate::spatial_grid::SpatialGrid;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Execution strategy for a step. Observable results are identical for
/// every combination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOptions {
    /// Fan the per-agent work out over the rayon pool
    pub parallel: bool,

    /// Use a uniform grid instead of the all-pairs scan for neighbor lookup
    pub spatial_grid: bool,
}

impl StepOptions {
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn spatial_grid(mut self, enabled: bool) -> Self {
        self.spatial_grid = enabled;
        self
    }
}

/// Monotonic count of completed steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StepCounter(u64);

impl StepCounter {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// Counter after one more completed step.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Back to zero; only done when the population is recreated.
    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

impl std::fmt::Display for StepCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Computes the next population from `population` under `config`.
///
/// Fails fast on an invalid configuration, and if the arithmetic ever
/// produced a non-finite value.
pub fn step(
    population: &Population,
    config: &SimulationConfig,
    options: StepOptions,
) -> Result<Population, FlockError> {
    config.validate()?;

    let snapshot = population.agents();
    let ranges = Ranges::from(config);
    let grid = if options.spatial_grid {
        SpatialGrid::build(snapshot, config.visual_range)
    } else {
        None
    };

    let next: Vec<Agent> = if options.parallel {
        (0..snapshot.len())
            .into_par_iter()
            .map_init(Vec::new, |scratch, index| {
                let summary = summarize(index, snapshot, grid.as_ref(), scratch, &ranges);
                advance_agent(&snapshot[index], &summary, config)
            })
            .collect()
    } else {
        let mut scratch = Vec::new();
        (0..snapshot.len())
            .map(|index| {
                let summary = summarize(index, snapshot, grid.as_ref(), &mut scratch, &ranges);
                advance_agent(&snapshot[index], &summary, config)
            })
            .collect()
    };

    trace!(
        agents = next.len(),
        grid_cells = grid.as_ref().map_or(0, SpatialGrid::cell_count),
        parallel = options.parallel,
        "step computed"
    );

    Population::from_step(next)
}

fn summarize(
    index: usize,
    snapshot: &[Agent],
    grid: Option<&SpatialGrid>,
    scratch: &mut Vec<usize>,
    ranges: &Ranges,
) -> NeighborSummary {
    match grid {
        Some(grid) => {
            grid.candidates_into(&snapshot[index].position, scratch);
            evaluate_candidates(index, snapshot, scratch, ranges)
        }
        None => evaluate(index, snapshot, ranges),
    }
}

/// Integrates one agent given its neighbor summary: steer, clamp speed,
/// advance position, then apply the boundary policy.
pub fn advance_agent(agent: &Agent, summary: &NeighborSummary, config: &SimulationConfig) -> Agent {
    let mut velocity = clamp_speed(steer(agent, summary, config), &config.speed);
    let mut position = agent.position + velocity;
    boundary::apply(&mut position, &mut velocity, config);

    Agent::new(agent.id, position, velocity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentId;
    use crate::config::{Bounds, SpeedPolicy};
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    fn population(agents: Vec<Agent>) -> Population {
        Population::new(agents).unwrap()
    }

    #[test]
    fn test_lone_agent_moves_by_velocity() {
        let config = SimulationConfig::default();
        let before = population(vec![Agent::at(0, 0.0, 0.0, 1.0, 0.0)]);

        let after = step(&before, &config, StepOptions::default()).unwrap();
        let agent = &after.agents()[0];

        assert_eq!(agent.position, Vector2::new(1.0, 0.0));
        assert_eq!(agent.velocity, Vector2::new(1.0, 0.0));
    }

    #[test]
    fn test_close_pair_pushed_apart() {
        let config = SimulationConfig::default()
            .with_ranges(40.0, 5.0)
            .with_weights(0.0, 0.1, 0.0)
            .with_speed(SpeedPolicy::MaxOnly { max: 2.0 });
        let before = population(vec![
            Agent::at(0, 0.0, 0.0, 0.0, 0.0),
            Agent::at(1, 1.0, 0.0, 0.0, 0.0),
        ]);

        let after = step(&before, &config, StepOptions::default()).unwrap();

        assert_relative_eq!(after.agents()[0].velocity.x, -0.1, epsilon = 1e-12);
        assert_relative_eq!(after.agents()[1].velocity.x, 0.1, epsilon = 1e-12);
        assert_eq!(after.agents()[0].velocity.y, 0.0);
    }

    #[test]
    fn test_wall_bounce() {
        let config = SimulationConfig::default().with_bounds(Bounds::square(100.0));
        let before = population(vec![Agent::at(0, 99.9, 0.0, 1.0, 0.0)]);

        let after = step(&before, &config, StepOptions::default()).unwrap();
        let agent = &after.agents()[0];

        assert_eq!(agent.position.x, 100.0);
        assert!(agent.velocity.x <= 0.0);
    }

    #[test]
    fn test_update_is_simultaneous() {
        // A chain where in-place updating would let agent 1 react to agent 0's new position
        let config = SimulationConfig::default()
            .with_ranges(10.0, 3.0)
            .with_weights(0.01, 0.05, 0.05);
        let agents = vec![
            Agent::at(0, 0.0, 0.0, 1.5, 0.0),
            Agent::at(1, 2.0, 0.0, 0.0, 1.0),
            Agent::at(2, 6.0, 0.0, -1.0, 0.0),
        ];
        let forward = step(&population(agents.clone()), &config, StepOptions::default()).unwrap();

        let mut reversed_input = agents;
        reversed_input.reverse();
        let mut backward = step(&population(reversed_input), &config, StepOptions::default())
            .unwrap()
            .into_agents();
        backward.reverse();

        assert_eq!(forward.agents(), backward.as_slice());
    }

    #[test]
    fn test_preserves_order_and_ids() {
        let config = SimulationConfig::default();
        let before = population(vec![
            Agent::at(9, 0.0, 0.0, 1.0, 0.0),
            Agent::at(3, 5.0, 5.0, 0.0, 1.0),
            Agent::at(5, -5.0, 5.0, -1.0, 0.0),
        ]);

        let after = step(&before, &config, StepOptions::default()).unwrap();
        assert_eq!(after.ids(), vec![AgentId(9), AgentId(3), AgentId(5)]);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = SimulationConfig::default();
        config.bounds.x_min = 500.0;
        let before = population(vec![Agent::at(0, 0.0, 0.0, 1.0, 0.0)]);

        assert!(matches!(
            step(&before, &config, StepOptions::default()),
            Err(FlockError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_strategies_agree() {
        let config = SimulationConfig::default();
        let before = crate::population::random_population(120, 7).unwrap();

        let plain = step(&before, &config, StepOptions::default()).unwrap();
        for options in [
            StepOptions::default().parallel(true),
            StepOptions::default().spatial_grid(true),
            StepOptions::default().parallel(true).spatial_grid(true),
        ] {
            assert_eq!(step(&before, &config, options).unwrap(), plain, "{options:?}");
        }
    }

    #[test]
    fn test_grid_falls_back_for_sparse_population() {
        let config = SimulationConfig::default().with_bounds(Bounds::square(1.0e31));
        let before = Population::new(vec![
            Agent::at(0, 0.0, 0.0, 1.0, 0.0),
            Agent::at(1, 5.0, 0.0, -1.0, 0.0),
            Agent::at(2, 1.0e30, 0.0, 0.0, 1.0),
        ])
        .unwrap();

        let plain = step(&before, &config, StepOptions::default()).unwrap();
        let gridded = step(&before, &config, StepOptions::default().spatial_grid(true)).unwrap();
        assert_eq!(gridded, plain);
    }

    #[test]
    fn test_step_counter() {
        let mut counter = StepCounter::new();
        counter = counter.next().next();
        assert_eq!(counter.get(), 2);
        counter.reset();
        assert_eq!(counter, StepCounter::default());
    }
}
