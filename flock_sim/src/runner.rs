//! Scenario runner - executes flocking scenarios under the oracle.

use flock_core::{FlockStats, ModelKind, StepOptions};
use tracing::{debug, info, warn};

use crate::error::SimError;
use crate::exporter::{SimExport, SimFrame};
use crate::oracle::{Oracle, Violation};
use crate::scenarios::ScenarioId;
use crate::world::Simulation;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Model variant
    pub model: ModelKind,

    /// Whether the scenario held its outcome and every invariant
    pub passed: bool,

    /// Steps executed
    pub total_steps: u64,

    /// Invariant violations observed by the oracle
    pub violations: Vec<Violation>,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Statistics before the first step
    pub initial_stats: FlockStats,

    /// Statistics after the last step
    pub final_stats: FlockStats,
}

/// Runs scenarios.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    seed: u64,
    num_bots: usize,
    steps: u64,
    model: ModelKind,
    options: StepOptions,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64, num_bots: usize) -> Self {
        Self {
            seed,
            num_bots,
            steps: 500,
            model: ModelKind::Boid,
            options: StepOptions::default(),
        }
    }

    /// Sets the number of steps per scenario.
    pub fn with_steps(mut self, steps: u64) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_model(mut self, model: ModelKind) -> Self {
        self.model = model;
        self
    }

    pub fn with_options(mut self, options: StepOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> Result<ScenarioResult, SimError> {
        self.execute(scenario, None)
    }

    /// Runs a scenario, adding a frame to `export` every `interval` steps
    /// (and always for the initial and final state).
    pub fn run_with_export(
        &self,
        scenario: ScenarioId,
        export: &mut SimExport,
        interval: u64,
    ) -> Result<ScenarioResult, SimError> {
        self.execute(scenario, Some((export, interval.max(1))))
    }

    fn execute(
        &self,
        scenario: ScenarioId,
        mut export: Option<(&mut SimExport, u64)>,
    ) -> Result<ScenarioResult, SimError> {
        info!(
            "Starting scenario: {} (seed={}, model={})",
            scenario.name(),
            self.seed,
            self.model
        );

        let (config, population) = scenario.setup(self.seed, self.num_bots)?;
        let mut simulation =
            Simulation::from_population(self.model, self.options, config, population)?;
        let mut oracle = Oracle::new();
        let initial_stats = FlockStats::measure(simulation.population());
        let mut failure_reason = None;

        if let Some((export, _)) = export.as_mut() {
            export.add_frame(SimFrame::capture(0, simulation.population()));
        }

        for _ in 0..self.steps {
            let before = simulation.population().clone();
            let config = simulation.config().snapshot();
            let step = simulation.step()?.get();

            oracle.check_step(step, &before, simulation.population(), &config);
            if failure_reason.is_none() {
                if let Err(reason) = scenario.check_step(step, simulation.population()) {
                    warn!(step, "{}: {}", scenario.name(), reason);
                    failure_reason = Some(reason);
                }
            }

            if let Some((export, interval)) = export.as_mut() {
                if step % *interval == 0 || step == self.steps {
                    export.add_frame(SimFrame::capture(step, simulation.population()));
                }
            }

            if step % 100 == 0 {
                debug!("  step={} | bots={}", step, simulation.population().len());
            }
        }

        let final_stats = FlockStats::measure(simulation.population());
        if failure_reason.is_none() {
            if let Err(reason) = scenario.check_final(&initial_stats, &final_stats) {
                failure_reason = Some(reason);
            }
        }
        if failure_reason.is_none() {
            if let Some(first) = oracle.violations().first() {
                failure_reason = Some(format!(
                    "{} invariant violation(s), first: {}",
                    oracle.violations().len(),
                    first
                ));
            }
        }

        let passed = failure_reason.is_none();
        if let Some((export, _)) = export {
            export.finalize(passed, oracle.violations());
        }

        Ok(ScenarioResult {
            scenario,
            seed: self.seed,
            model: self.model,
            passed,
            total_steps: simulation.counter().get(),
            violations: oracle.violations().to_vec(),
            failure_reason,
            initial_stats,
            final_stats,
        })
    }
}
