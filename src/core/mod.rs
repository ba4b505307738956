//! Core types shared by the map and flow-field layers.
//!
//! - [`CellId`] / [`NodeId`]: packed cell and leaf-arena identifiers
//! - [`Cost`] / [`UNREACHABLE`]: integer path costs
//! - [`Rect`]: inclusive integer rectangle

pub mod cell;
pub mod rect;

pub use cell::{CellId, Cost, NodeId, UNREACHABLE};
pub use rect::Rect;
