//! Agents and the population they live in.
//!
//! A [`Population`] can only be built through a validating constructor,
//! so every population handed to a model is non-empty, has distinct ids
//! and finite state.

use crate::error::FlockError;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Stable identifier of an agent within its population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A simulated point with position and velocity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique identifier
    pub id: AgentId,

    /// Position [x, y] in world units
    pub position: Vector2<f64>,

    /// Velocity [vx, vy] in world units per step
    pub velocity: Vector2<f64>,
}

impl Agent {
    /// Creates a new agent.
    pub fn new(id: AgentId, position: Vector2<f64>, velocity: Vector2<f64>) -> Self {
        Self {
            id,
            position,
            velocity,
        }
    }

    /// Shorthand for building agents from raw components.
    pub fn at(id: u32, x: f64, y: f64, vx: f64, vy: f64) -> Self {
        Self::new(AgentId(id), Vector2::new(x, y), Vector2::new(vx, vy))
    }

    /// Magnitude of the velocity.
    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    /// Heading in radians, `atan2(vy, vx)` in a y-up world frame.
    ///
    /// Renderers with a y-down screen frame must negate the angle.
    pub fn heading(&self) -> f64 {
        self.velocity.y.atan2(self.velocity.x)
    }

    /// Squared Euclidean distance to another agent.
    #[inline]
    pub fn squared_distance_to(&self, other: &Agent) -> f64 {
        (self.position - other.position).norm_squared()
    }

    /// Returns true if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.position.iter().chain(self.velocity.iter()).all(|c| c.is_finite())
    }
}

/// Ordered, fixed-size collection of agents with distinct ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Population {
    agents: Vec<Agent>,
}

impl Population {
    /// Creates a population, rejecting empty input, duplicate ids and
    /// non-finite state.
    pub fn new(agents: Vec<Agent>) -> Result<Self, FlockError> {
        let population = Self { agents };
        population.validate()?;
        Ok(population)
    }

    /// Wraps agents produced by a step over an already validated population.
    ///
    /// The step preserves order and ids, so the id invariant carries over.
    pub(crate) fn from_step(agents: Vec<Agent>) -> Result<Self, FlockError> {
        if let Some(bad) = agents.iter().find(|a| !a.is_finite()) {
            return Err(FlockError::NonFiniteState(bad.id));
        }
        Ok(Self { agents })
    }

    /// Checks the population invariants.
    pub fn validate(&self) -> Result<(), FlockError> {
        if self.agents.is_empty() {
            return Err(FlockError::EmptyPopulation);
        }

        let mut seen = HashSet::with_capacity(self.agents.len());
        for agent in &self.agents {
            if !seen.insert(agent.id) {
                return Err(FlockError::DuplicateId(agent.id));
            }
            if !agent.is_finite() {
                return Err(FlockError::NonFiniteState(agent.id));
            }
        }
        Ok(())
    }

    /// Number of agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Always false for a validated population; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Read-only view of the agents, in population order.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Iterates over the agents in population order.
    pub fn iter(&self) -> std::slice::Iter<'_, Agent> {
        self.agents.iter()
    }

    /// Looks up an agent by id.
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    /// Ids in population order.
    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.iter().map(|a| a.id).collect()
    }

    /// Consumes the population and returns its agents.
    pub fn into_agents(self) -> Vec<Agent> {
        self.agents
    }
}

impl TryFrom<Vec<Agent>> for Population {
    type Error = FlockError;

    fn try_from(agents: Vec<Agent>) -> Result<Self, Self::Error> {
        Self::new(agents)
    }
}

impl<'a> IntoIterator for &'a Population {
    type Item = &'a Agent;
    type IntoIter = std::slice::Iter<'a, Agent>;

    fn into_iter(self) -> Self::IntoIter {
        self.agents.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_population_rejects_empty() {
        assert_eq!(Population::new(vec![]), Err(FlockError::EmptyPopulation));
    }

    #[test]
    fn test_population_rejects_duplicate_ids() {
        let agents = vec![
            Agent::at(1, 0.0, 0.0, 0.0, 0.0),
            Agent::at(2, 1.0, 0.0, 0.0, 0.0),
            Agent::at(1, 2.0, 0.0, 0.0, 0.0),
        ];
        assert_eq!(
            Population::new(agents),
            Err(FlockError::DuplicateId(AgentId(1)))
        );
    }

    #[test]
    fn test_population_rejects_nan() {
        let agents = vec![Agent::at(7, f64::NAN, 0.0, 0.0, 0.0)];
        assert_eq!(
            Population::new(agents),
            Err(FlockError::NonFiniteState(AgentId(7)))
        );
    }

    #[test]
    fn test_population_lookup() {
        let population = Population::new(vec![
            Agent::at(10, 1.0, 2.0, 0.0, 0.0),
            Agent::at(20, 3.0, 4.0, 0.0, 0.0),
        ])
        .unwrap();

        assert_eq!(population.len(), 2);
        assert_eq!(population.ids(), vec![AgentId(10), AgentId(20)]);
        assert_eq!(population.get(AgentId(20)).unwrap().position.x, 3.0);
        assert!(population.get(AgentId(30)).is_none());
    }

    #[test]
    fn test_agent_heading_and_distance() {
        let a = Agent::at(0, 0.0, 0.0, 0.0, 1.0);
        let b = Agent::at(1, 3.0, 4.0, -1.0, 0.0);

        assert_relative_eq!(a.heading(), std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(b.heading(), std::f64::consts::PI, epsilon = 1e-12);
        assert_relative_eq!(a.squared_distance_to(&b), 25.0, epsilon = 1e-12);
        assert_relative_eq!(b.speed(), 1.0, epsilon = 1e-12);
    }
}
