//! Velocity integrator: turns a neighbor summary into a new velocity and
//! enforces the speed policy.

use crate::agent::Agent;
use crate::config::{SimulationConfig, SpeedPolicy};
use crate::rules::NeighborSummary;
use nalgebra::Vector2;

/// Applies cohesion, alignment and separation to the agent's velocity.
///
/// Cohesion and alignment are skipped entirely when nothing is visible.
pub fn steer(agent: &Agent, summary: &NeighborSummary, config: &SimulationConfig) -> Vector2<f64> {
    let mut velocity = agent.velocity;

    if let (Some(center), Some(heading)) = (summary.average_position(), summary.average_velocity()) {
        velocity += (center - agent.position) * config.centering_factor
            + (heading - agent.velocity) * config.matching_factor;
    }

    velocity += summary.close_delta * config.avoid_factor;
    velocity
}

/// Rescales the velocity into the band allowed by `policy`.
///
/// A zero velocity is returned unchanged under every policy.
pub fn clamp_speed(velocity: Vector2<f64>, policy: &SpeedPolicy) -> Vector2<f64> {
    let speed = velocity.norm();
    if speed == 0.0 {
        return velocity;
    }

    let max = policy.max();
    if speed > max {
        return velocity / speed * max;
    }
    match policy.min() {
        Some(min) if speed < min => velocity / speed * min,
        _ => velocity,
    }
}

/// Scales the velocity down to `max` if it is faster; never scales up.
pub fn limit_speed(velocity: Vector2<f64>, max: f64) -> Vector2<f64> {
    let speed = velocity.norm();
    if speed > max {
        velocity / speed * max
    } else {
        velocity
    }
}
