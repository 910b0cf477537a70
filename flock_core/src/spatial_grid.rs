//! Uniform grid over the pre-step snapshot for neighbor lookups.
//!
//! Cells are one visual range wide, so every agent within visual range of
//! a query point sits in the query cell or one of its eight neighbors.
//! Candidate lists come back sorted by snapshot index, which keeps the
//! accumulation order (and therefore every float sum) identical to the
//! brute-force scan.

use crate::agent::Agent;
use nalgebra::Vector2;

/// Grids with more cells than this fall back to the all-pairs scan.
const MAX_CELLS: usize = 1 << 20;

/// Cells are marginally wider than the visual range so float rounding in
/// the cell computation can never put an in-range pair two cells apart.
const CELL_SLACK: f64 = 1.000_001;

pub struct SpatialGrid {
    cell_size: f64,
    origin: Vector2<f64>,
    cols: usize,
    rows: usize,
    cells: Vec<Vec<usize>>,
}

impl SpatialGrid {
    /// Buckets every agent of the snapshot by cell.
    ///
    /// Returns `None` when the grid would not help (zero visual range) or
    /// would be unreasonably large for the population's extent.
    pub fn build(agents: &[Agent], visual_range: f64) -> Option<Self> {
        if agents.is_empty() || visual_range <= 0.0 || !visual_range.is_finite() {
            return None;
        }
        let cell_size = visual_range * CELL_SLACK;

        let mut min = agents[0].position;
        let mut max = agents[0].position;
        for agent in &agents[1..] {
            min = min.inf(&agent.position);
            max = max.sup(&agent.position);
        }

        // Sized in f64 first: a sparse population can span more cells than
        // fit in a usize.
        let cols = ((max.x - min.x) / cell_size).floor() + 1.0;
        let rows = ((max.y - min.y) / cell_size).floor() + 1.0;
        if !cols.is_finite() || !rows.is_finite() || cols * rows > MAX_CELLS as f64 {
            return None;
        }
        let (cols, rows) = (cols as usize, rows as usize);
        let cell_count = cols * rows;

        let mut grid = Self {
            cell_size,
            origin: min,
            cols,
            rows,
            cells: vec![Vec::new(); cell_count],
        };
        for (index, agent) in agents.iter().enumerate() {
            let (cx, cy) = grid.cell_of(&agent.position);
            grid.cells[cy * cols + cx].push(index);
        }
        Some(grid)
    }

    #[inline]
    fn cell_of(&self, position: &Vector2<f64>) -> (usize, usize) {
        let cx = ((position.x - self.origin.x) / self.cell_size).floor().max(0.0) as usize;
        let cy = ((position.y - self.origin.y) / self.cell_size).floor().max(0.0) as usize;
        (cx.min(self.cols - 1), cy.min(self.rows - 1))
    }

    /// Fills `out` with the snapshot indices in the 3x3 block of cells
    /// around `position`, sorted ascending.
    pub fn candidates_into(&self, position: &Vector2<f64>, out: &mut Vec<usize>) {
        out.clear();
        let (cx, cy) = self.cell_of(position);

        for y in cy.saturating_sub(1)..=(cy + 1).min(self.rows - 1) {
            let row = y * self.cols;
            for x in cx.saturating_sub(1)..=(cx + 1).min(self.cols - 1) {
                out.extend_from_slice(&self.cells[row + x]);
            }
        }
        out.sort_unstable();
    }

    /// Number of cells (for diagnostics).
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}
