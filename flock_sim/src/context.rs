//! Virtual-clock context for reproducible driver runs.

use async_trait::async_trait;
use flock_env::FlockContext;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// 2024-01-01 00:00:00 UTC; virtual time 0 maps here.
const EPOCH_SECS: u64 = 1_704_067_200;

#[derive(Debug, Default)]
struct VirtualClock {
    elapsed: Duration,
    sleeps: u64,
}

/// Driver context whose clock only moves when something sleeps on it.
///
/// A driver paced by this context runs as fast as the host allows while
/// the recorded time still reads as if it had been paced in real time.
/// Clones share one clock.
#[derive(Debug, Clone)]
pub struct SimContext {
    seed: u64,
    clock: Arc<Mutex<VirtualClock>>,
}

impl SimContext {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            clock: Arc::new(Mutex::new(VirtualClock::default())),
        }
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }

    /// Moves the clock forward without counting a sleep.
    pub fn advance_time(&self, duration: Duration) {
        self.clock().elapsed += duration;
    }

    /// Number of sleeps served so far.
    pub fn sleep_count(&self) -> u64 {
        self.clock().sleeps
    }

    fn clock(&self) -> std::sync::MutexGuard<'_, VirtualClock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl FlockContext for SimContext {
    fn now(&self) -> Duration {
        self.clock().elapsed
    }

    fn system_time(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(EPOCH_SECS) + self.now()
    }

    async fn sleep(&self, duration: Duration) {
        let mut clock = self.clock();
        clock.elapsed += duration;
        clock.sleeps += 1;
    }

    fn spawn<F>(&self, _name: &str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(future);
    }

    fn derive_seed(&self, seed_extension: u64) -> u64 {
        let combined = self.seed.wrapping_mul(0x517cc1b727220a95) ^ seed_extension;
        ChaCha8Rng::seed_from_u64(combined).next_u64()
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}
