//! Simulation - the population, its step counter and the model that moves it.

use flock_core::{
    random_population, run_step, FlockModel, ModelKind, Population, SharedConfig,
    SimulationConfig, StepCounter, StepOptions,
};
use tracing::{debug, info};

use crate::error::SimError;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Number of bots to spawn
    pub num_bots: usize,

    /// Driver pacing in steps per second
    pub steps_per_second: f64,

    /// Maximum number of steps (0 = unlimited)
    pub max_steps: u64,

    /// Model variant
    pub model: ModelKind,

    /// Parallel fan-out / spatial grid
    pub options: StepOptions,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_bots: 10,
            steps_per_second: 50.0,
            max_steps: 0,
            model: ModelKind::Boid,
            options: StepOptions::default(),
        }
    }
}

/// Derives the population seed from a master seed.
pub(crate) fn physics_seed(seed: u64) -> u64 {
    seed.wrapping_mul(0x9e3779b97f4a7c15)
}

/// A running flock: current population, step counter and model.
///
/// The population is replaced wholesale after every successful step; the
/// counter only moves when a step succeeds and only resets on
/// [`Simulation::reinitialize`].
pub struct Simulation {
    model: Box<dyn FlockModel>,
    model_kind: ModelKind,
    config: SharedConfig,
    population: Population,
    counter: StepCounter,
    generation: u64,
}

impl Simulation {
    /// Creates a simulation with a random population and default parameters.
    pub fn new(sim_config: &SimConfig) -> Result<Self, SimError> {
        let population = random_population(sim_config.num_bots, physics_seed(sim_config.seed))?;
        Self::from_population(
            sim_config.model,
            sim_config.options,
            SimulationConfig::default(),
            population,
        )
    }

    /// Creates a simulation around an explicit population and configuration.
    pub fn from_population(
        model_kind: ModelKind,
        options: StepOptions,
        config: SimulationConfig,
        population: Population,
    ) -> Result<Self, SimError> {
        population.validate()?;
        let config = SharedConfig::new(config)?;
        let model = model_kind.build(config.clone(), options);

        info!(
            model = model_kind.name(),
            bots = population.len(),
            "simulation created"
        );

        Ok(Self {
            model,
            model_kind,
            config,
            population,
            counter: StepCounter::new(),
            generation: 0,
        })
    }

    /// Advances the flock by one step and returns the new count.
    ///
    /// On error the population and counter are left untouched.
    pub fn step(&mut self) -> Result<StepCounter, SimError> {
        let (next, counter) = run_step(self.model.as_ref(), &self.population, self.counter)?;
        self.population = next;
        self.counter = counter;
        Ok(counter)
    }

    /// Replaces the population with a fresh random one and resets the counter.
    pub fn reinitialize(&mut self, num_bots: usize, seed: u64) -> Result<(), SimError> {
        self.population = random_population(num_bots, seed)?;
        self.counter.reset();
        self.generation += 1;
        debug!(generation = self.generation, bots = num_bots, "population reinitialized");
        Ok(())
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn counter(&self) -> StepCounter {
        self.counter
    }

    /// Number of reinitializations so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn model_kind(&self) -> ModelKind {
        self.model_kind
    }

    /// Shared handle for parameter changes between steps.
    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    #[cfg(test)]
    pub(crate) fn replace_model(&mut self, model: Box<dyn FlockModel>) {
        self.model = model;
    }
}
