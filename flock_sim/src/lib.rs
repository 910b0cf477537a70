//! Flock Simulation Harness
//!
//! This crate wraps the pure step function of `flock_core` in everything
//! needed to actually run a flock:
//! - **Simulation**: population + step counter + shared parameters
//! - **Driver**: paces steps against a [`flock_env::FlockContext`] clock,
//!   controlled through start/stop/reinitialize/cancel commands
//! - **Oracle**: checks size, ids, containment, speed and finiteness after
//!   every step
//! - **Scenarios**: small setups with known outcomes, run by the
//!   [`ScenarioRunner`]
//!
//! # Determinism
//!
//! All entropy derives from one 64-bit seed and [`SimContext`] replaces the
//! wall clock with a virtual one, so any run can be replayed from its seed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  commands   ┌──────────────────────────────────┐
//! │ DriverHandle │────────────►│ Driver<Ctx: FlockContext>        │
//! │              │◄────────────│   loop { step; publish; sleep }  │
//! └──────────────┘  snapshots  │          │                       │
//!                              │   ┌──────▼──────┐                │
//!                              │   │ Simulation  │ SharedConfig ◄─┼── update_weights
//!                              │   │ (FlockModel)│                │   update_boundaries
//!                              │   └─────────────┘                │
//!                              └──────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use flock_sim::{Driver, SimConfig, SimContext, Simulation};
//! use flock_env::StepRate;
//!
//! let simulation = Simulation::new(&SimConfig::default())?;
//! let (driver, handle) = Driver::new(SimContext::shared(42), simulation, StepRate::default());
//! tokio::spawn(driver.run());
//! handle.start()?;
//! ```

mod context;
mod driver;
mod error;
mod exporter;
mod oracle;
mod runner;
pub mod scenarios;
mod world;

pub use context::SimContext;
pub use driver::{join_driver, Driver, DriverCommand, DriverHandle, DriverSnapshot};
pub use error::SimError;
pub use exporter::{AgentRow, SimExport, SimFrame};
pub use oracle::{Oracle, Violation};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use world::{SimConfig, Simulation};
