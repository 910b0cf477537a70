//! Random population initialization.
//!
//! Positions are uniform in a fixed square around the origin and
//! velocities uniform per component, floored to a minimum magnitude so no
//! agent starts stationary. Ids are sequential, hence strictly unique.

use crate::agent::{Agent, AgentId, Population};
use crate::error::FlockError;
use nalgebra::Vector2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Half side of the spawn square, `[-50, 50]²`.
pub const SPAWN_HALF_EXTENT: f64 = 50.0;

/// Velocity components are drawn from `[-1, 1]`.
pub const SPAWN_MAX_COMPONENT: f64 = 1.0;

/// Smallest initial speed.
pub const MIN_SPAWN_SPEED: f64 = 0.3;

/// Creates `count` agents from a seeded ChaCha8 stream.
///
/// The same seed always yields the same population.
pub fn random_population(count: usize, seed: u64) -> Result<Population, FlockError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let population = random_population_with(count, &mut rng)?;
    debug!(count, seed, "population initialized");
    Ok(population)
}

/// Creates `count` agents drawing from the given RNG.
pub fn random_population_with<R: Rng>(
    count: usize,
    rng: &mut R,
) -> Result<Population, FlockError> {
    if count == 0 {
        return Err(FlockError::EmptyPopulation);
    }
    let count = u32::try_from(count)
        .map_err(|_| FlockError::invalid_config(format!("population of {count} agents is too large")))?;

    let agents = (0..count).map(|id| random_agent(AgentId(id), rng)).collect();
    Population::new(agents)
}

fn random_agent<R: Rng>(id: AgentId, rng: &mut R) -> Agent {
    let position = Vector2::new(
        rng.gen_range(-SPAWN_HALF_EXTENT..SPAWN_HALF_EXTENT),
        rng.gen_range(-SPAWN_HALF_EXTENT..SPAWN_HALF_EXTENT),
    );
    let velocity = Vector2::new(
        rng.gen_range(-SPAWN_MAX_COMPONENT..SPAWN_MAX_COMPONENT),
        rng.gen_range(-SPAWN_MAX_COMPONENT..SPAWN_MAX_COMPONENT),
    );

    Agent::new(id, position, floor_speed(velocity, MIN_SPAWN_SPEED))
}

/// Scales `velocity` up to `min_speed` if slower. An exact zero vector
/// has no direction and becomes `(min_speed, 0)`.
fn floor_speed(velocity: Vector2<f64>, min_speed: f64) -> Vector2<f64> {
    let speed = velocity.norm();
    if speed == 0.0 {
        Vector2::new(min_speed, 0.0)
    } else if speed < min_speed {
        velocity * (min_speed / speed)
    } else {
        velocity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_random_population_shape() {
        let population = random_population(100, 42).unwrap();

        assert_eq!(population.len(), 100);
        for (i, agent) in population.iter().enumerate() {
            assert_eq!(agent.id, AgentId(i as u32));
            assert!(agent.position.x.abs() <= SPAWN_HALF_EXTENT);
            assert!(agent.position.y.abs() <= SPAWN_HALF_EXTENT);
            assert!(agent.speed() >= MIN_SPAWN_SPEED - 1e-12);
        }
    }

    #[test]
    fn test_random_population_deterministic() {
        assert_eq!(random_population(20, 9).unwrap(), random_population(20, 9).unwrap());
        assert_ne!(random_population(20, 9).unwrap(), random_population(20, 10).unwrap());
    }

    #[test]
    fn test_random_population_rejects_zero() {
        assert_eq!(random_population(0, 1), Err(FlockError::EmptyPopulation));
    }

    #[test]
    fn test_floor_speed() {
        let slow = floor_speed(Vector2::new(0.1, 0.0), 0.3);
        assert_relative_eq!(slow.x, 0.3, epsilon = 1e-12);

        assert_eq!(floor_speed(Vector2::zeros(), 0.3), Vector2::new(0.3, 0.0));

        let fast = Vector2::new(0.8, -0.6);
        assert_eq!(floor_speed(fast, 0.3), fast);
    }
}
