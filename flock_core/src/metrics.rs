//! Flock Statistics
//! ================
//!
//! Aggregate observables of a population, used for reporting:
//! - **Centroid**: mean position
//! - **Speed**: mean / min / max velocity magnitude
//! - **Polarization**: |Σ v̂| / n, 1 when everyone heads the same way,
//!   near 0 for a disordered flock
//! - **Spacing**: mean nearest-neighbour distance

use crate::agent::Population;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Snapshot statistics of a population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlockStats {
    /// Number of agents measured
    pub count: usize,
    /// Mean position
    pub centroid: Vector2<f64>,
    /// Mean speed
    pub mean_speed: f64,
    /// Slowest agent's speed
    pub min_speed: f64,
    /// Fastest agent's speed
    pub max_speed: f64,
    /// Order parameter in [0, 1]
    pub polarization: f64,
    /// Mean distance to the nearest other agent (`None` below two agents)
    pub mean_nearest_distance: Option<f64>,
}

impl FlockStats {
    /// Measures a population. O(n²) because of the spacing term.
    pub fn measure(population: &Population) -> Self {
        let agents = population.agents();
        let n = agents.len() as f64;

        let mut centroid = Vector2::zeros();
        let mut heading_sum = Vector2::zeros();
        let mut speed_sum = 0.0;
        let mut min_speed = f64::MAX;
        let mut max_speed = 0.0_f64;

        for agent in agents {
            let speed = agent.speed();
            centroid += agent.position;
            speed_sum += speed;
            min_speed = min_speed.min(speed);
            max_speed = max_speed.max(speed);
            if speed > 0.0 {
                heading_sum += agent.velocity / speed;
            }
        }

        Self {
            count: agents.len(),
            centroid: centroid / n,
            mean_speed: speed_sum / n,
            min_speed,
            max_speed,
            polarization: heading_sum.norm() / n,
            mean_nearest_distance: mean_nearest_distance(population),
        }
    }
}

fn mean_nearest_distance(population: &Population) -> Option<f64> {
    let agents = population.agents();
    if agents.len() < 2 {
        return None;
    }

    let total: f64 = agents
        .iter()
        .enumerate()
        .map(|(i, agent)| {
            agents
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, other)| agent.squared_distance_to(other))
                .fold(f64::MAX, f64::min)
                .sqrt()
        })
        .sum();

    Some(total / agents.len() as f64)
}
