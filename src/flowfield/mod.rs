//! Flow-field computation: generic flood solver, per-query overlay,
//! field storage, dense relaxation and the pathfinder facade.

pub mod field;
pub mod overlay;
pub mod pathfinder;
pub mod solver;

mod densify;

pub use field::{CellFlowField, FieldEntry, FlowField, NodeFlowField};
pub use overlay::OverlayGraph;
pub use pathfinder::FlowFieldPathfinder;
pub use solver::FlowFieldSolver;
