//! Boundary policy: soft margin steering followed by hard containment.
//!
//! Edges use bounce-inward semantics: a clamped velocity component takes
//! the sign pointing back into the rectangle, so an agent sliding along a
//! wall keeps its speed and never flips outward.

use crate::config::{Bounds, SimulationConfig};
use crate::integrator::limit_speed;
use nalgebra::Vector2;

/// Adds `turn_factor` toward the interior for every wall whose margin band
/// contains `position`. Returns true if any nudge was applied.
pub fn nudge(
    position: &Vector2<f64>,
    velocity: &mut Vector2<f64>,
    bounds: &Bounds,
    margin: f64,
    turn_factor: f64,
) -> bool {
    let mut nudged = false;

    if position.x < bounds.x_min + margin {
        velocity.x += turn_factor;
        nudged = true;
    }
    if position.x > bounds.x_max - margin {
        velocity.x -= turn_factor;
        nudged = true;
    }
    if position.y < bounds.y_min + margin {
        velocity.y += turn_factor;
        nudged = true;
    }
    if position.y > bounds.y_max - margin {
        velocity.y -= turn_factor;
        nudged = true;
    }
    nudged
}

/// Clamps `position` into `bounds`, pointing the clamped velocity
/// component inward.
pub fn contain(position: &mut Vector2<f64>, velocity: &mut Vector2<f64>, bounds: &Bounds) {
    if position.x < bounds.x_min {
        position.x = bounds.x_min;
        velocity.x = velocity.x.abs();
    } else if position.x > bounds.x_max {
        position.x = bounds.x_max;
        velocity.x = -velocity.x.abs();
    }

    if position.y < bounds.y_min {
        position.y = bounds.y_min;
        velocity.y = velocity.y.abs();
    } else if position.y > bounds.y_max {
        position.y = bounds.y_max;
        velocity.y = -velocity.y.abs();
    }
}

/// Runs both behaviors on an already advanced position.
///
/// A margin nudge may push the speed past the policy maximum; it is scaled
/// back down so the speed bound holds after every step.
pub fn apply(position: &mut Vector2<f64>, velocity: &mut Vector2<f64>, config: &SimulationConfig) {
    if config.margin > 0.0
        && nudge(position, velocity, &config.bounds, config.margin, config.turn_factor)
    {
        *velocity = limit_speed(*velocity, config.speed.max());
    }
    contain(position, velocity, &config.bounds);
}
