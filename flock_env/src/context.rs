//! Core environment context trait for flock drivers.

use async_trait::async_trait;
use std::future::Future;
use std::time::{Duration, SystemTime};

/// The central interface for environment interaction.
///
/// This trait abstracts the "real world" so that the same driver loop can
/// pace a flock against the wall clock or against a virtual clock.
///
/// # Implementations
///
/// - **Live**: `TokioContext` - wraps `tokio::time`, seeds from `OsRng` or a fixed seed
/// - **Simulation**: `SimContext` (in `flock_sim`) - virtual clock, `ChaCha8Rng(seed)`
///
/// # Determinism
///
/// For deterministic runs, all methods that would normally introduce
/// non-determinism (time, randomness) are controlled by the implementation.
#[async_trait]
pub trait FlockContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Returns the wall-clock time used for export timestamps.
    ///
    /// In simulation, this is derived from virtual clock + epoch offset.
    fn system_time(&self) -> SystemTime;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual clock
    async fn sleep(&self, duration: Duration);

    /// Spawns a background task.
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;

    /// Derives a 64-bit seed for population initialization.
    ///
    /// The implementation combines the global seed with `seed_extension`
    /// so that every reinitialization gets a distinct but reproducible
    /// stream.
    ///
    /// # Arguments
    /// * `seed_extension` - A value to combine with the global seed
    fn derive_seed(&self, seed_extension: u64) -> u64;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    /// In simulation, returns the master seed.
    fn seed(&self) -> u64;
}
