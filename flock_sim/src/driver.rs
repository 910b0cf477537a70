//! Driver - paces a [`Simulation`] against a [`FlockContext`] clock.
//!
//! The driver owns the simulation and runs it on a single task, so at
//! most one step is ever in flight. Control goes in through an unbounded
//! command channel; the latest population comes out through a `watch`
//! channel that renderers and exporters read without blocking the loop.

use std::sync::Arc;

use flock_core::{Population, SharedConfig};
use flock_env::{DriverState, EnvError, FlockContext, StepRate};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::SimError;
use crate::world::Simulation;

/// Control messages accepted by a running driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCommand {
    /// Begin or resume scheduling steps
    Start,
    /// Stop scheduling; the simulation keeps its state
    Stop,
    /// Replace the population with `num_bots` fresh bots
    Reinitialize { num_bots: usize },
    /// Stop for good and hand the simulation back
    Cancel,
}

/// What the driver publishes after every step or state change.
#[derive(Debug, Clone)]
pub struct DriverSnapshot {
    pub state: DriverState,
    pub step_count: u64,
    pub generation: u64,
    pub population: Arc<Population>,
}

impl DriverSnapshot {
    fn capture(state: DriverState, simulation: &Simulation) -> Self {
        Self {
            state,
            step_count: simulation.counter().get(),
            generation: simulation.generation(),
            population: Arc::new(simulation.population().clone()),
        }
    }
}

/// Caller side of a driver.
#[derive(Debug, Clone)]
pub struct DriverHandle {
    commands: mpsc::UnboundedSender<DriverCommand>,
    snapshots: watch::Receiver<DriverSnapshot>,
    config: SharedConfig,
}

impl DriverHandle {
    fn send(&self, command: DriverCommand) -> Result<(), EnvError> {
        self.commands
            .send(command)
            .map_err(|_| EnvError::closed("driver command channel"))
    }

    pub fn start(&self) -> Result<(), EnvError> {
        self.send(DriverCommand::Start)
    }

    pub fn stop(&self) -> Result<(), EnvError> {
        self.send(DriverCommand::Stop)
    }

    pub fn cancel(&self) -> Result<(), EnvError> {
        self.send(DriverCommand::Cancel)
    }

    pub fn reinitialize(&self, num_bots: usize) -> Result<(), EnvError> {
        self.send(DriverCommand::Reinitialize { num_bots })
    }

    /// Most recently published snapshot.
    pub fn latest(&self) -> DriverSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Waits until a published snapshot satisfies `predicate`.
    ///
    /// Checks the current snapshot first. Fails once the driver has exited
    /// without ever satisfying the predicate.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&DriverSnapshot) -> bool,
    ) -> Result<DriverSnapshot, EnvError> {
        let snapshot = self
            .snapshots
            .wait_for(predicate)
            .await
            .map_err(|_| EnvError::closed("driver snapshot channel"))?;
        Ok(snapshot.clone())
    }

    /// Parameter handle; changes apply from the next step on.
    pub fn config(&self) -> &SharedConfig {
        &self.config
    }
}

/// Steps a simulation at a fixed rate until finished or cancelled.
pub struct Driver<Ctx: FlockContext> {
    ctx: Arc<Ctx>,
    simulation: Simulation,
    rate: StepRate,
    max_steps: u64,
    state: DriverState,
    commands: mpsc::UnboundedReceiver<DriverCommand>,
    snapshots: watch::Sender<DriverSnapshot>,
}

impl<Ctx: FlockContext> Driver<Ctx> {
    /// Creates an idle driver and the handle that controls it.
    pub fn new(ctx: Arc<Ctx>, simulation: Simulation, rate: StepRate) -> (Self, DriverHandle) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) =
            watch::channel(DriverSnapshot::capture(DriverState::Idle, &simulation));

        let handle = DriverHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            config: simulation.config().clone(),
        };

        let driver = Self {
            ctx,
            simulation,
            rate,
            max_steps: 0,
            state: DriverState::Idle,
            commands: command_rx,
            snapshots: snapshot_tx,
        };

        (driver, handle)
    }

    /// Finishes after this many steps (0 = unlimited).
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Runs until the step budget is spent, a `Cancel` arrives or every
    /// handle is dropped. Returns the simulation in its final state.
    ///
    /// A step error cancels the driver, publishes the terminal snapshot
    /// and is then returned as is.
    pub async fn run(mut self) -> Result<Simulation, SimError> {
        info!(
            rate = %self.rate,
            max_steps = self.max_steps,
            seed = self.ctx.seed(),
            "driver started"
        );

        loop {
            self.drain_commands();
            if self.state.is_terminal() {
                break;
            }

            match self.state {
                DriverState::Idle | DriverState::Paused => match self.commands.recv().await {
                    Some(command) => self.apply(command),
                    None => self.set_state(DriverState::Cancelled),
                },
                DriverState::Running => {
                    let counter = match self.simulation.step() {
                        Ok(counter) => counter,
                        Err(e) => {
                            error!(
                                steps = self.simulation.counter().get(),
                                "step failed, cancelling driver: {}", e
                            );
                            self.set_state(DriverState::Cancelled);
                            return Err(e);
                        }
                    };
                    if self.max_steps > 0 && counter.get() >= self.max_steps {
                        self.state = DriverState::Finished;
                    }
                    self.publish();

                    if self.state == DriverState::Running {
                        self.ctx.sleep(self.rate.interval()).await;
                        tokio::task::yield_now().await;
                    }
                }
                DriverState::Finished | DriverState::Cancelled => break,
            }
        }

        info!(
            state = ?self.state,
            steps = self.simulation.counter().get(),
            elapsed_ms = self.ctx.now().as_millis() as u64,
            "driver exited"
        );
        self.publish();
        Ok(self.simulation)
    }

    fn drain_commands(&mut self) {
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.apply(command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.state.is_terminal() {
                        self.set_state(DriverState::Cancelled);
                    }
                    break;
                }
            }
        }
    }

    fn apply(&mut self, command: DriverCommand) {
        if self.state.is_terminal() {
            return;
        }
        debug!(?command, state = ?self.state, "driver command");

        match command {
            DriverCommand::Start => self.set_state(DriverState::Running),
            DriverCommand::Stop => {
                if self.state == DriverState::Running {
                    self.set_state(DriverState::Paused);
                }
            }
            DriverCommand::Cancel => self.set_state(DriverState::Cancelled),
            DriverCommand::Reinitialize { num_bots } => {
                let seed = self.ctx.derive_seed(self.simulation.generation() + 1);
                match self.simulation.reinitialize(num_bots, seed) {
                    Ok(()) => self.publish(),
                    Err(e) => warn!(num_bots, "reinitialize rejected: {}", e),
                }
            }
        }
    }

    fn set_state(&mut self, state: DriverState) {
        if self.state != state {
            self.state = state;
            self.publish();
        }
    }

    fn publish(&self) {
        self.snapshots
            .send_replace(DriverSnapshot::capture(self.state, &self.simulation));
    }
}

/// Awaits a spawned [`Driver::run`], turning a panic or abort of the task
/// into [`SimError::DriverTask`].
pub async fn join_driver(
    task: JoinHandle<Result<Simulation, SimError>>,
) -> Result<Simulation, SimError> {
    task.await?
}
