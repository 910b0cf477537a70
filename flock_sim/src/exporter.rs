//! JSON exporter for external renderers.
//!
//! Dumps periodic population snapshots as JSON. Each bot carries its
//! heading in radians, measured counter-clockwise from +x in a y-up frame.

use flock_core::{Bounds, FlockStats, Population};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

use crate::oracle::Violation;

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Step count after which the frame was taken
    pub step: u64,

    /// Per-bot state
    pub agents: Vec<AgentRow>,

    /// Aggregate statistics
    pub stats: FlockStats,
}

impl SimFrame {
    /// Captures a population after `step`.
    pub fn capture(step: u64, population: &Population) -> Self {
        Self {
            step,
            agents: population
                .iter()
                .map(|agent| AgentRow {
                    id: agent.id.0,
                    x: agent.position.x,
                    y: agent.position.y,
                    vx: agent.velocity.x,
                    vy: agent.velocity.y,
                    heading: agent.heading(),
                })
                .collect(),
            stats: FlockStats::measure(population),
        }
    }
}

/// One bot as the renderer needs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRow {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub heading: f64,
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Model variant name
    pub model: String,

    /// World rectangle for the renderer's viewport
    pub bounds: Bounds,

    /// Steps executed
    pub total_steps: u64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub violations: Vec<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64, model: &str, bounds: Bounds) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            model: model.to_string(),
            bounds,
            total_steps: 0,
            frames: Vec::new(),
            passed: false,
            violations: Vec::new(),
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.total_steps = self.total_steps.max(frame.step);
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, violations: &[Violation]) {
        self.passed = passed;
        self.violations = violations.iter().map(ToString::to_string).collect();
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flock_core::Agent;

    #[test]
    fn test_frame_capture() {
        let population = Population::new(vec![
            Agent::at(0, 1.0, 2.0, 0.0, 1.0),
            Agent::at(1, -1.0, 0.0, -1.0, 0.0),
        ])
        .unwrap();

        let frame = SimFrame::capture(7, &population);
        assert_eq!(frame.step, 7);
        assert_eq!(frame.agents.len(), 2);
        assert_eq!(frame.agents[0].heading, std::f64::consts::FRAC_PI_2);
        assert_eq!(frame.agents[1].heading, std::f64::consts::PI);
        assert_eq!(frame.stats.count, 2);
    }

    #[test]
    fn test_export_json_shape() {
        let population = Population::new(vec![Agent::at(0, 0.0, 0.0, 1.0, 0.0)]).unwrap();
        let mut export = SimExport::new("lone_bot", 42, "boid", Bounds::default());
        export.add_frame(SimFrame::capture(10, &population));
        export.finalize(true, &[]);

        let value = serde_json::to_value(&export).unwrap();
        assert_eq!(value["scenario"], "lone_bot");
        assert_eq!(value["total_steps"], 10);
        assert_eq!(value["frames"][0]["agents"][0]["vx"], 1.0);
        assert!(value.get("violations").is_none());
    }
}
