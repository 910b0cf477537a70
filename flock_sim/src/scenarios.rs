//! Flocking scenarios with known outcomes.

use flock_core::{
    random_population, Agent, AgentId, Bounds, FlockError, FlockStats, Population,
    SimulationConfig, SpeedPolicy,
};
use nalgebra::Vector2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::SimError;
use crate::world::physics_seed;

/// Tolerance for exact-outcome checks.
const EPSILON: f64 = 1e-12;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// A single bot drifts without influence
    LoneBot,

    /// Two touching bots push each other apart
    ClosePair,

    /// A bot hits the right wall and bounces inward
    WallBounce,

    /// Random flock under default parameters
    OpenFlock,

    /// Dense cluster in a corner spreads out
    CrowdedCorner,

    /// Soft margin turns a bot around before the wall
    MarginTurn,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::LoneBot,
            ScenarioId::ClosePair,
            ScenarioId::WallBounce,
            ScenarioId::OpenFlock,
            ScenarioId::CrowdedCorner,
            ScenarioId::MarginTurn,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::LoneBot => "lone_bot",
            ScenarioId::ClosePair => "close_pair",
            ScenarioId::WallBounce => "wall_bounce",
            ScenarioId::OpenFlock => "open_flock",
            ScenarioId::CrowdedCorner => "crowded_corner",
            ScenarioId::MarginTurn => "margin_turn",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::LoneBot => "One bot at the origin moving (1,0) keeps its velocity",
            ScenarioId::ClosePair => "Bots at (0,0) and (1,0) repel to velocities (-0.1,0) / (0.1,0)",
            ScenarioId::WallBounce => "Bot at (99.9,0) moving (1,0) is clamped to x=100 and turned inward",
            ScenarioId::OpenFlock => "Random flock, invariants only",
            ScenarioId::CrowdedCorner => "Bots packed into the top-right corner end up further apart",
            ScenarioId::MarginTurn => "Margin band turns a bot around before it reaches the wall",
        }
    }

    /// Builds the initial configuration and population.
    ///
    /// `num_bots` only applies to the random scenarios.
    pub fn setup(
        &self,
        seed: u64,
        num_bots: usize,
    ) -> Result<(SimulationConfig, Population), FlockError> {
        match self {
            ScenarioId::LoneBot => Ok((
                SimulationConfig::default(),
                Population::new(vec![Agent::at(0, 0.0, 0.0, 1.0, 0.0)])?,
            )),
            ScenarioId::ClosePair => {
                let config = SimulationConfig::default()
                    .with_ranges(40.0, 5.0)
                    .with_weights(0.0005, 0.1, 0.05)
                    .with_speed(SpeedPolicy::MaxOnly { max: 2.0 });
                let population = Population::new(vec![
                    Agent::at(0, 0.0, 0.0, 0.0, 0.0),
                    Agent::at(1, 1.0, 0.0, 0.0, 0.0),
                ])?;
                Ok((config, population))
            }
            ScenarioId::WallBounce => Ok((
                SimulationConfig::default().with_bounds(Bounds::square(100.0)),
                Population::new(vec![Agent::at(0, 99.9, 0.0, 1.0, 0.0)])?,
            )),
            ScenarioId::OpenFlock => Ok((
                SimulationConfig::default(),
                random_population(num_bots, physics_seed(seed))?,
            )),
            ScenarioId::CrowdedCorner => Ok((
                SimulationConfig::default(),
                crowded_corner(seed, num_bots.max(2))?,
            )),
            ScenarioId::MarginTurn => {
                let config = SimulationConfig::default()
                    .with_speed(SpeedPolicy::MaxOnly { max: 2.0 })
                    .with_margin(20.0, 0.2);
                let population = Population::new(vec![Agent::at(0, 85.0, 0.0, 1.0, 0.0)])?;
                Ok((config, population))
            }
        }
    }

    /// Checks the scenario-specific outcome after `step` (1-based).
    pub fn check_step(&self, step: u64, population: &Population) -> Result<(), String> {
        let agents = population.agents();
        match self {
            ScenarioId::LoneBot => {
                let bot = &agents[0];
                if step == 1 {
                    expect_vector("position", bot.position, Vector2::new(1.0, 0.0))?;
                    expect_vector("velocity", bot.velocity, Vector2::new(1.0, 0.0))?;
                }
                if (bot.speed() - 1.0).abs() > EPSILON {
                    return Err(format!("lone bot speed changed to {}", bot.speed()));
                }
                Ok(())
            }
            ScenarioId::ClosePair => {
                let (a, b) = (&agents[0], &agents[1]);
                if step == 1 {
                    expect_vector("velocity of #0", a.velocity, Vector2::new(-0.1, 0.0))?;
                    expect_vector("velocity of #1", b.velocity, Vector2::new(0.1, 0.0))?;
                }
                if a.position.y != 0.0 || b.position.y != 0.0 {
                    return Err("pair left the x axis".to_string());
                }
                let midpoint = (a.position.x + b.position.x) / 2.0;
                if (midpoint - 0.5).abs() > 1e-6 {
                    return Err(format!("pair midpoint drifted to {}", midpoint));
                }
                Ok(())
            }
            ScenarioId::WallBounce => {
                let bot = &agents[0];
                if step == 1 {
                    if bot.position.x != 100.0 {
                        return Err(format!("expected x = 100, got {}", bot.position.x));
                    }
                    if bot.velocity.x > 0.0 {
                        return Err(format!("expected vx <= 0, got {}", bot.velocity.x));
                    }
                }
                Ok(())
            }
            ScenarioId::MarginTurn => {
                let bot = &agents[0];
                if step == 1 && (bot.velocity.x - 0.8).abs() > EPSILON {
                    return Err(format!("expected vx = 0.8 after the nudge, got {}", bot.velocity.x));
                }
                if bot.position.x.abs() >= 100.0 {
                    return Err(format!("bot reached the wall at x = {}", bot.position.x));
                }
                Ok(())
            }
            ScenarioId::OpenFlock | ScenarioId::CrowdedCorner => Ok(()),
        }
    }

    /// Compares the statistics before the first and after the last step.
    pub fn check_final(&self, initial: &FlockStats, last: &FlockStats) -> Result<(), String> {
        match self {
            ScenarioId::CrowdedCorner => match (initial.mean_nearest_distance, last.mean_nearest_distance) {
                (Some(before), Some(after)) if after > before => Ok(()),
                (before, after) => Err(format!(
                    "cluster did not spread: mean nearest distance {:?} -> {:?}",
                    before, after
                )),
            },
            _ => Ok(()),
        }
    }
}

fn expect_vector(what: &str, actual: Vector2<f64>, expected: Vector2<f64>) -> Result<(), String> {
    if (actual - expected).norm() > EPSILON {
        return Err(format!(
            "{}: expected ({}, {}), got ({}, {})",
            what, expected.x, expected.y, actual.x, actual.y
        ));
    }
    Ok(())
}

/// Stationary bots scattered over `[85, 99]²`.
fn crowded_corner(seed: u64, count: usize) -> Result<Population, FlockError> {
    let mut rng = ChaCha8Rng::seed_from_u64(physics_seed(seed));
    let count = u32::try_from(count)
        .map_err(|_| FlockError::invalid_config(format!("population of {count} agents is too large")))?;

    let agents = (0..count)
        .map(|id| {
            let position = Vector2::new(rng.gen_range(85.0..99.0), rng.gen_range(85.0..99.0));
            Agent::new(AgentId(id), position, Vector2::zeros())
        })
        .collect();
    Population::new(agents)
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lone_bot" | "lonebot" | "a" => Ok(ScenarioId::LoneBot),
            "close_pair" | "closepair" | "b" => Ok(ScenarioId::ClosePair),
            "wall_bounce" | "wallbounce" | "c" => Ok(ScenarioId::WallBounce),
            "open_flock" | "openflock" => Ok(ScenarioId::OpenFlock),
            "crowded_corner" | "crowdedcorner" => Ok(ScenarioId::CrowdedCorner),
            "margin_turn" | "marginturn" => Ok(ScenarioId::MarginTurn),
            _ => Err(SimError::UnknownScenario(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>().unwrap(), scenario);
        }
        assert!(matches!(
            "warp_drive".parse::<ScenarioId>(),
            Err(SimError::UnknownScenario(name)) if name == "warp_drive"
        ));
    }

    #[test]
    fn test_setups_are_valid() {
        for scenario in ScenarioId::all() {
            let (config, population) = scenario.setup(42, 12).unwrap();
            assert!(config.validate().is_ok(), "{}", scenario);
            assert!(!population.is_empty(), "{}", scenario);
        }
    }

    #[test]
    fn test_crowded_corner_is_packed() {
        let (config, population) = ScenarioId::CrowdedCorner.setup(3, 20).unwrap();
        assert_eq!(population.len(), 20);
        assert!(population.iter().all(|a| a.position.x >= 85.0 && a.position.y >= 85.0));
        assert!(population.iter().all(|a| config.bounds.contains(&a.position)));
    }

    #[test]
    fn test_check_step_reports_wrong_outcome() {
        let wrong = Population::new(vec![Agent::at(0, 2.0, 0.0, 1.0, 0.0)]).unwrap();
        assert!(ScenarioId::LoneBot.check_step(1, &wrong).is_err());
        assert!(ScenarioId::LoneBot.check_step(2, &wrong).is_ok());
    }
}
