//! Quadtree map configuration.

use serde::{Deserialize, Serialize};

use crate::core::Cost;

/// Settings for building a [`QuadtreeMap`](super::QuadtreeMap).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadtreeMapConfig {
    /// Grid width in cells.
    pub width: i32,

    /// Grid height in cells.
    pub height: i32,

    /// Cost of an axis-aligned unit step.
    pub ortho_cost: Cost,

    /// Cost of a diagonal unit step.
    pub diag_cost: Cost,

    /// Spacing between gate pairs along a shared leaf border. With 1,
    /// every adjacent cell pair across a border becomes a gate.
    pub gate_step: i32,
}

impl Default for QuadtreeMapConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            ortho_cost: 10,
            diag_cost: 14,
            gate_step: 1,
        }
    }
}

impl QuadtreeMapConfig {
    /// Create a config for a `width x height` grid with default costs.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Override the orthogonal/diagonal unit costs.
    pub fn with_costs(mut self, ortho: Cost, diag: Cost) -> Self {
        self.ortho_cost = ortho;
        self.diag_cost = diag;
        self
    }

    /// Override the gate spacing along shared borders.
    pub fn with_gate_step(mut self, step: i32) -> Self {
        self.gate_step = step.max(1);
        self
    }
}
