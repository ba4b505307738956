//! # Marga-Nav: Flow-Field Pathfinding on Quadtree Maps
//!
//! A pathfinding library for 2D grid maps that computes dense flow
//! fields toward a single target, suitable for steering many agents to
//! a common goal without per-agent searches.
//!
//! The map is decomposed into a quadtree of obstacle-free rectangular
//! leaves connected by *gates* on their shared borders. A query floods
//! outward from the target in up to three stages: over the leaf graph
//! (to prune work), over the sparse gate graph (for inter-leaf costs),
//! and finally across every cell of a caller-supplied query rectangle
//! (a dense relaxation that exploits leaves being obstacle-free).
//!
//! ## Quick Start
//!
//! ```rust
//! use marga_nav::{FlowFieldPathfinder, QuadtreeMap, QuadtreeMapConfig, Rect};
//!
//! // A 16x16 map with a small wall.
//! let map = QuadtreeMap::build(QuadtreeMapConfig::new(16, 16), |x, y| x == 8 && y < 12);
//!
//! // Everything in the left half should flow toward (12, 3).
//! let mut pathfinder = FlowFieldPathfinder::new();
//! pathfinder.reset(&map, 12, 3, Rect::new(0, 0, 7, 15))?;
//! pathfinder.compute_node_flow_field()?;
//! pathfinder.compute_gate_flow_field(true)?;
//! pathfinder.compute_final_flow_field()?;
//!
//! pathfinder.visit_cell_flow_field(pathfinder.final_flow_field(), |x, y, nx, ny, cost| {
//!     // (nx, ny) is the neighbouring cell to step to from (x, y).
//!     assert!((nx - x).abs() <= 1 && (ny - y).abs() <= 1);
//!     assert!(cost >= 0);
//! });
//! # Ok::<(), marga_nav::QueryError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: cell/leaf identifiers, costs, rectangles
//! - [`map`]: the [`NavMap`] contract and the [`QuadtreeMap`] reference
//!   implementation (decomposition, gates, gate graph)
//! - [`flowfield`]: the generic flood solver, the per-query overlay
//!   graph, field storage and the [`FlowFieldPathfinder`] facade
//!
//! ## Concurrency
//!
//! All computation is synchronous and single-threaded. A pathfinder
//! holds per-query scratch and must not be shared across threads;
//! distinct pathfinders may borrow the same map concurrently since the
//! map surface is read-only.

pub mod core;
pub mod error;
pub mod flowfield;
pub mod map;

pub use crate::core::{CellId, Cost, NodeId, Rect, UNREACHABLE};
pub use error::{QueryError, Result};
pub use flowfield::{CellFlowField, FieldEntry, FlowField, FlowFieldPathfinder, NodeFlowField};
pub use map::{Gate, NavMap, QuadtreeMap, QuadtreeMapConfig};
