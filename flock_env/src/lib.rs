//! Flock Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" abstraction allowing a flock driver
//! to run against either a **wall clock** (tokio) or a **virtual clock**
//! (deterministic simulation harness).
//!
//! # Core Concept
//!
//! The step function in `flock_core` is pure. Everything around it that
//! would introduce non-determinism is routed through [`FlockContext`]:
//! - Time (`now()`, `sleep()`)
//! - Task spawning (`spawn()`)
//! - Randomness (`derive_seed()`)
//!
//! By deriving all entropy from a single 64-bit seed, any run becomes
//! reproducible via its seed number.
//!
//! # Example
//!
//! ```ignore
//! use flock_env::{FlockContext, StepRate};
//!
//! async fn drive<Ctx: FlockContext>(ctx: &Ctx, rate: StepRate) {
//!     loop {
//!         step();
//!         ctx.sleep(rate.interval()).await;
//!     }
//! }
//! ```

mod context;
mod types;
mod error;
mod tokio_impl;

pub use context::FlockContext;
pub use types::{DriverState, StepRate};
pub use error::EnvError;
pub use tokio_impl::TokioContext;
