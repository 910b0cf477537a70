//! Flock Core - simultaneous-update flocking model
//!
//! A population of point agents moves under three local rules:
//! 1. **Separation**: push away from agents inside the protected range
//! 2. **Cohesion**: steer toward the mean position of visible agents
//! 3. **Alignment**: steer toward the mean velocity of visible agents
//!
//! followed by a speed policy and a rectangular boundary policy.
//!
//! # Step semantics
//!
//! ```text
//!   snapshot ──► evaluate (rules) ──► steer + clamp (integrator)
//!      │                                      │
//!      │                              position += velocity
//!      │                                      │
//!      └────── read only ──────────► nudge + contain (boundary) ──► next
//! ```
//!
//! Every agent reads the same pre-step snapshot, so a step is a pure
//! function of `(population, config)` and independent of iteration order.

pub mod agent;
pub mod boundary;
pub mod config;
pub mod error;
pub mod integrator;
pub mod metrics;
pub mod model;
pub mod population;
pub mod rules;
pub mod spatial_grid;
pub mod step;

// Re-export key types for convenience
pub use agent::{Agent, AgentId, Population};
pub use config::{Bounds, SharedConfig, SimulationConfig, SpeedPolicy};
pub use error::FlockError;
pub use metrics::FlockStats;
pub use model::{run_step, BoidModel, DecomposedBoidModel, FlockModel, IdentityModel, ModelKind};
pub use population::random_population;
pub use step::{step, StepCounter, StepOptions};
