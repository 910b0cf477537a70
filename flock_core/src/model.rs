//! Interchangeable step-function variants.
//!
//! Every variant implements [`FlockModel`]; [`ModelKind`] picks one at
//! configuration time.

use crate::agent::{Agent, Population};
use crate::config::SharedConfig;
use crate::error::FlockError;
use crate::integrator::clamp_speed;
use crate::rules::{close_neighbors, visible_neighbors, Ranges};
use crate::step::{self, StepCounter, StepOptions};
use crate::boundary;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The capability every simulation variant provides.
pub trait FlockModel: Send + Sync {
    /// Short name for logs and exports.
    fn name(&self) -> &'static str;

    /// Computes the next population. Never mutates the input.
    fn update(&self, population: &Population) -> Result<Population, FlockError>;
}

/// Runs one step and advances the counter; the counter only moves on success.
pub fn run_step(
    model: &dyn FlockModel,
    population: &Population,
    counter: StepCounter,
) -> Result<(Population, StepCounter), FlockError> {
    let next = model.update(population)?;
    Ok((next, counter.next()))
}

/// Full rule-based model reading its parameters from a shared config.
pub struct BoidModel {
    config: SharedConfig,
    options: StepOptions,
}

impl BoidModel {
    pub fn new(config: SharedConfig) -> Self {
        Self {
            config,
            options: StepOptions::default(),
        }
    }

    /// Sets the execution strategy (parallel fan-out, spatial grid).
    pub fn with_options(mut self, options: StepOptions) -> Self {
        self.options = options;
        self
    }

    /// Handle for external parameter changes.
    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    /// Replaces the rule weights, effective from the next step.
    pub fn update_weights(&self, cohesion: f64, separation: f64, alignment: f64) -> Result<(), FlockError> {
        self.config.update_weights(cohesion, separation, alignment)
    }

    /// Replaces the containment rectangle, effective from the next step.
    pub fn update_boundaries(&self, x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Result<(), FlockError> {
        self.config.update_boundaries(x_min, y_min, x_max, y_max)
    }
}

impl FlockModel for BoidModel {
    fn name(&self) -> &'static str {
        "boid"
    }

    fn update(&self, population: &Population) -> Result<Population, FlockError> {
        let config = self.config.snapshot();
        step::step(population, &config, self.options)
    }
}

/// Passthrough model: returns the population unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityModel;

impl FlockModel for IdentityModel {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn update(&self, population: &Population) -> Result<Population, FlockError> {
        Ok(population.clone())
    }
}

/// Rule-by-rule formulation: cohesion, alignment and separation each run
/// their own scan over the snapshot before being combined.
///
/// Slower than [`BoidModel`] (three scans instead of one) but produces the
/// same populations; useful as a cross-check.
pub struct DecomposedBoidModel {
    config: SharedConfig,
}

impl DecomposedBoidModel {
    pub fn new(config: SharedConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }
}

/// Mean of the visible neighbors' positions.
fn center_of_mass(index: usize, snapshot: &[Agent], ranges: &Ranges) -> Option<Vector2<f64>> {
    mean(visible_neighbors(index, snapshot, ranges).map(|n| n.position))
}

/// Mean of the visible neighbors' velocities.
fn mean_heading(index: usize, snapshot: &[Agent], ranges: &Ranges) -> Option<Vector2<f64>> {
    mean(visible_neighbors(index, snapshot, ranges).map(|n| n.velocity))
}

/// Σ (self − other) over too-close neighbors.
fn repulsion(index: usize, snapshot: &[Agent], ranges: &Ranges) -> Vector2<f64> {
    let agent = &snapshot[index];
    close_neighbors(index, snapshot, ranges).fold(Vector2::zeros(), |acc, n| {
        acc + (agent.position - n.position)
    })
}

fn mean(values: impl Iterator<Item = Vector2<f64>>) -> Option<Vector2<f64>> {
    let (sum, count) = values.fold((Vector2::zeros(), 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

impl FlockModel for DecomposedBoidModel {
    fn name(&self) -> &'static str {
        "decomposed"
    }

    fn update(&self, population: &Population) -> Result<Population, FlockError> {
        let config = self.config.snapshot();
        config.validate()?;

        let snapshot = population.agents();
        let ranges = Ranges::from(&config);

        let next = snapshot
            .iter()
            .enumerate()
            .map(|(index, agent)| {
                let cohesion = center_of_mass(index, snapshot, &ranges)
                    .map(|center| (center - agent.position) * config.centering_factor);
                let alignment = mean_heading(index, snapshot, &ranges)
                    .map(|heading| (heading - agent.velocity) * config.matching_factor);
                let separation = repulsion(index, snapshot, &ranges) * config.avoid_factor;

                let mut velocity = agent.velocity;
                if let (Some(cohesion), Some(alignment)) = (cohesion, alignment) {
                    velocity += cohesion + alignment;
                }
                velocity += separation;

                let mut velocity = clamp_speed(velocity, &config.speed);
                let mut position = agent.position + velocity;
                boundary::apply(&mut position, &mut velocity, &config);
                Agent::new(agent.id, position, velocity)
            })
            .collect();

        Population::from_step(next)
    }
}

/// Selects a model variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    Boid,
    Identity,
    Decomposed,
}

impl ModelKind {
    pub fn all() -> Vec<ModelKind> {
        vec![ModelKind::Boid, ModelKind::Identity, ModelKind::Decomposed]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Boid => "boid",
            ModelKind::Identity => "identity",
            ModelKind::Decomposed => "decomposed",
        }
    }

    /// Builds the selected model around a shared config.
    ///
    /// `options` only affects [`BoidModel`].
    pub fn build(&self, config: SharedConfig, options: StepOptions) -> Box<dyn FlockModel> {
        debug!(model = self.name(), ?options, "building model");
        match self {
            ModelKind::Boid => Box::new(BoidModel::new(config).with_options(options)),
            ModelKind::Identity => Box::new(IdentityModel),
            ModelKind::Decomposed => Box::new(DecomposedBoidModel::new(config)),
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "boid" | "boids" | "full" => Ok(ModelKind::Boid),
            "identity" | "noop" | "passthrough" => Ok(ModelKind::Identity),
            "decomposed" | "rules" => Ok(ModelKind::Decomposed),
            _ => Err(format!("Unknown model: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::population::random_population;

    #[test]
    fn test_identity_returns_input() {
        let population = random_population(10, 1).unwrap();
        let next = IdentityModel.update(&population).unwrap();
        assert_eq!(next, population);
    }

    #[test]
    fn test_decomposed_matches_boid() {
        let config = SharedConfig::new(
            SimulationConfig::default()
                .with_weights(0.005, 0.05, 0.05)
                .with_margin(15.0, 0.2),
        )
        .unwrap();
        let boid = BoidModel::new(config.clone());
        let decomposed = DecomposedBoidModel::new(config);

        let mut a = random_population(60, 11).unwrap();
        let mut b = a.clone();
        for _ in 0..25 {
            a = boid.update(&a).unwrap();
            b = decomposed.update(&b).unwrap();
        }
        assert_eq!(a, b);
    }

    #[test]
    fn test_run_step_advances_counter() {
        let model = BoidModel::new(SharedConfig::default());
        let population = random_population(5, 3).unwrap();

        let (next, counter) = run_step(&model, &population, StepCounter::new()).unwrap();
        assert_eq!(counter.get(), 1);
        assert_eq!(next.len(), 5);

        let (_, counter) = run_step(&IdentityModel, &next, counter).unwrap();
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn test_weight_update_takes_effect_next_step() {
        let model = BoidModel::new(SharedConfig::default());
        let population = random_population(30, 5).unwrap();

        let before = model.update(&population).unwrap();
        model.update_weights(0.0, 0.0, 0.0).unwrap();
        let after = model.update(&population).unwrap();

        assert_ne!(before, after);
        assert!(model.update_weights(-1.0, 0.0, 0.0).is_err());
        assert!(model.update_boundaries(0.0, 0.0, -1.0, 1.0).is_err());
    }

    #[test]
    fn test_model_kind_parse() {
        assert_eq!("boid".parse::<ModelKind>(), Ok(ModelKind::Boid));
        assert_eq!("NOOP".parse::<ModelKind>(), Ok(ModelKind::Identity));
        assert_eq!("rules".parse::<ModelKind>(), Ok(ModelKind::Decomposed));
        assert!("quadtree".parse::<ModelKind>().is_err());

        for kind in ModelKind::all() {
            let model = kind.build(SharedConfig::default(), StepOptions::default());
            assert_eq!(model.name(), kind.name());
        }
    }
}
