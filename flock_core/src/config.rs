//! Behavioral parameters of the flock.
//!
//! A [`SimulationConfig`] is a plain value: a step reads one snapshot and
//! uses it for its whole duration. [`SharedConfig`] is the handle external
//! controls mutate between steps. Invalid values are rejected, never
//! clamped, and a rejected update leaves the previous values in place.

use crate::error::FlockError;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Axis-aligned containment rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Bounds {
    /// Creates a validated rectangle.
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Result<Self, FlockError> {
        let bounds = Self {
            x_min,
            y_min,
            x_max,
            y_max,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Square centered on the origin, `[-half, half]²`.
    pub fn square(half_extent: f64) -> Self {
        Self {
            x_min: -half_extent,
            y_min: -half_extent,
            x_max: half_extent,
            y_max: half_extent,
        }
    }

    /// Checks `x_min < x_max`, `y_min < y_max` and finiteness.
    pub fn validate(&self) -> Result<(), FlockError> {
        let all_finite = [self.x_min, self.y_min, self.x_max, self.y_max]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(FlockError::invalid_config("bounds must be finite"));
        }
        if self.x_min >= self.x_max {
            return Err(FlockError::invalid_config(format!(
                "x_min ({}) must be below x_max ({})",
                self.x_min, self.x_max
            )));
        }
        if self.y_min >= self.y_max {
            return Err(FlockError::invalid_config(format!(
                "y_min ({}) must be below y_max ({})",
                self.y_min, self.y_max
            )));
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Returns true if the point lies inside the closed rectangle.
    pub fn contains(&self, point: &Vector2<f64>) -> bool {
        point.x >= self.x_min && point.x <= self.x_max && point.y >= self.y_min && point.y <= self.y_max
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::square(100.0)
    }
}

/// Speed clamping policy. Exactly one is active per configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SpeedPolicy {
    /// Only scale down speeds above `max`
    MaxOnly { max: f64 },

    /// Scale down above `max`, scale up non-zero speeds below `min`
    MinMax { min: f64, max: f64 },
}

impl SpeedPolicy {
    /// Upper speed limit.
    pub fn max(&self) -> f64 {
        match *self {
            SpeedPolicy::MaxOnly { max } | SpeedPolicy::MinMax { max, .. } => max,
        }
    }

    /// Lower speed limit, if the policy has one.
    pub fn min(&self) -> Option<f64> {
        match *self {
            SpeedPolicy::MaxOnly { .. } => None,
            SpeedPolicy::MinMax { min, .. } => Some(min),
        }
    }

    pub fn validate(&self) -> Result<(), FlockError> {
        let max = self.max();
        if !max.is_finite() || max <= 0.0 {
            return Err(FlockError::invalid_config(format!(
                "max speed must be positive and finite, got {max}"
            )));
        }
        if let Some(min) = self.min() {
            if !min.is_finite() || min <= 0.0 || min > max {
                return Err(FlockError::invalid_config(format!(
                    "min speed must lie in (0, {max}], got {min}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for SpeedPolicy {
    fn default() -> Self {
        SpeedPolicy::MinMax { min: 0.3, max: 2.0 }
    }
}

/// Behavioral parameters read by every step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Radius within which others count for cohesion/alignment
    pub visual_range: f64,

    /// Radius within which others trigger separation (a.k.a. min distance)
    pub protected_range: f64,

    /// Cohesion weight
    pub centering_factor: f64,

    /// Separation weight
    pub avoid_factor: f64,

    /// Alignment weight
    pub matching_factor: f64,

    /// Speed clamping policy
    pub speed: SpeedPolicy,

    /// Hard containment rectangle
    pub bounds: Bounds,

    /// Width of the soft steering band along each wall (0 disables it)
    pub margin: f64,

    /// Velocity nudge applied per step inside the margin band
    pub turn_factor: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            visual_range: 40.0,
            protected_range: 8.0,
            centering_factor: 0.0005,
            avoid_factor: 0.05,
            matching_factor: 0.05,
            speed: SpeedPolicy::default(),
            bounds: Bounds::default(),
            margin: 0.0,
            turn_factor: 0.2,
        }
    }
}

impl SimulationConfig {
    /// Checks every invariant of the configuration.
    pub fn validate(&self) -> Result<(), FlockError> {
        let named = [
            ("visual_range", self.visual_range),
            ("protected_range", self.protected_range),
            ("centering_factor", self.centering_factor),
            ("avoid_factor", self.avoid_factor),
            ("matching_factor", self.matching_factor),
            ("margin", self.margin),
            ("turn_factor", self.turn_factor),
        ];
        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                return Err(FlockError::invalid_config(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if self.protected_range > self.visual_range {
            return Err(FlockError::invalid_config(format!(
                "protected_range ({}) exceeds visual_range ({})",
                self.protected_range, self.visual_range
            )));
        }
        self.speed.validate()?;
        self.bounds.validate()
    }

    pub fn visual_range_squared(&self) -> f64 {
        self.visual_range * self.visual_range
    }

    pub fn protected_range_squared(&self) -> f64 {
        self.protected_range * self.protected_range
    }

    /// Replaces the three rule weights. Effective from the next step.
    pub fn update_weights(
        &mut self,
        cohesion: f64,
        separation: f64,
        alignment: f64,
    ) -> Result<(), FlockError> {
        let candidate = self.clone().with_weights(cohesion, separation, alignment);
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }

    /// Replaces the containment rectangle. Effective from the next step.
    pub fn update_boundaries(
        &mut self,
        x_min: f64,
        y_min: f64,
        x_max: f64,
        y_max: f64,
    ) -> Result<(), FlockError> {
        self.bounds = Bounds::new(x_min, y_min, x_max, y_max)?;
        Ok(())
    }

    /// Sets visual and protected ranges.
    pub fn with_ranges(mut self, visual_range: f64, protected_range: f64) -> Self {
        self.visual_range = visual_range;
        self.protected_range = protected_range;
        self
    }

    /// Sets cohesion, separation and alignment weights.
    pub fn with_weights(mut self, cohesion: f64, separation: f64, alignment: f64) -> Self {
        self.centering_factor = cohesion;
        self.avoid_factor = separation;
        self.matching_factor = alignment;
        self
    }

    pub fn with_speed(mut self, speed: SpeedPolicy) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Enables the soft margin band.
    pub fn with_margin(mut self, margin: f64, turn_factor: f64) -> Self {
        self.margin = margin;
        self.turn_factor = turn_factor;
        self
    }
}

/// Handle to a configuration shared between external controls and the
/// stepping loop.
///
/// Readers take a full copy under the read lock, so a step never observes
/// a half-applied update.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    inner: Arc<RwLock<SimulationConfig>>,
}

impl SharedConfig {
    /// Wraps a validated configuration.
    pub fn new(config: SimulationConfig) -> Result<Self, FlockError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(RwLock::new(config)),
        })
    }

    /// Copy of the current configuration.
    pub fn snapshot(&self) -> SimulationConfig {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the whole configuration atomically.
    pub fn replace(&self, config: SimulationConfig) -> Result<(), FlockError> {
        config.validate()?;
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = config;
        debug!("configuration replaced");
        Ok(())
    }

    /// See [`SimulationConfig::update_weights`].
    pub fn update_weights(
        &self,
        cohesion: f64,
        separation: f64,
        alignment: f64,
    ) -> Result<(), FlockError> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.update_weights(cohesion, separation, alignment)?;
        debug!(cohesion, separation, alignment, "weights updated");
        Ok(())
    }

    /// See [`SimulationConfig::update_boundaries`].
    pub fn update_boundaries(
        &self,
        x_min: f64,
        y_min: f64,
        x_max: f64,
        y_max: f64,
    ) -> Result<(), FlockError> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.update_boundaries(x_min, y_min, x_max, y_max)?;
        debug!(x_min, y_min, x_max, y_max, "boundaries updated");
        Ok(())
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SimulationConfig::default())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.visual_range, 40.0);
        assert_eq!(config.protected_range, 8.0);
        assert_eq!(config.speed, SpeedPolicy::MinMax { min: 0.3, max: 2.0 });
        assert_eq!(config.bounds, Bounds::square(100.0));
    }

    #[test]
    fn test_bounds_rejects_inverted() {
        assert!(Bounds::new(10.0, 0.0, 10.0, 5.0).is_err());
        assert!(Bounds::new(0.0, 5.0, 10.0, -5.0).is_err());
        assert!(Bounds::new(0.0, 0.0, f64::INFINITY, 5.0).is_err());
        assert!(Bounds::new(-1.0, -1.0, 1.0, 1.0).is_ok());
    }

    #[test]
    fn test_config_rejects_negative_weight() {
        let config = SimulationConfig::default().with_weights(0.1, -0.5, 0.1);
        assert!(matches!(config.validate(), Err(FlockError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_rejects_protected_above_visual() {
        let config = SimulationConfig::default().with_ranges(5.0, 10.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_speed_policy_validation() {
        assert!(SpeedPolicy::MaxOnly { max: 0.0 }.validate().is_err());
        assert!(SpeedPolicy::MinMax { min: 3.0, max: 2.0 }.validate().is_err());
        assert!(SpeedPolicy::MinMax { min: 0.0, max: 2.0 }.validate().is_err());
        assert!(SpeedPolicy::MinMax { min: 2.0, max: 2.0 }.validate().is_ok());
        assert_eq!(SpeedPolicy::MaxOnly { max: 4.0 }.min(), None);
    }

    #[test]
    fn test_rejected_update_keeps_previous_values() {
        let mut config = SimulationConfig::default();
        let before = config.clone();

        assert!(config.update_weights(0.1, f64::NAN, 0.1).is_err());
        assert!(config.update_boundaries(5.0, 0.0, 1.0, 1.0).is_err());
        assert_eq!(config, before);

        config.update_weights(0.01, 0.2, 0.3).unwrap();
        assert_eq!(config.centering_factor, 0.01);
        assert_eq!(config.avoid_factor, 0.2);
        assert_eq!(config.matching_factor, 0.3);
    }

    #[test]
    fn test_shared_config_updates_visible_in_next_snapshot() {
        let shared = SharedConfig::default();
        let clone = shared.clone();
        let first = shared.snapshot();

        clone.update_boundaries(-50.0, -50.0, 50.0, 50.0).unwrap();

        // Earlier snapshots are values, untouched by the update
        assert_eq!(first.bounds, Bounds::square(100.0));
        assert_eq!(shared.snapshot().bounds, Bounds::square(50.0));
    }

    #[test]
    fn test_shared_config_rejects_invalid_replacement() {
        let shared = SharedConfig::default();
        let bad = SimulationConfig::default().with_ranges(-1.0, 0.0);
        assert!(shared.replace(bad).is_err());
        assert!(SharedConfig::new(SimulationConfig::default().with_margin(-2.0, 0.1)).is_err());
        assert_eq!(shared.snapshot(), SimulationConfig::default());
    }

    #[test]
    fn test_speed_policy_serde_tag() {
        let json = serde_json::to_string(&SpeedPolicy::MaxOnly { max: 3.0 }).unwrap();
        assert_eq!(json, r#"{"policy":"max_only","max":3.0}"#);
    }
}
