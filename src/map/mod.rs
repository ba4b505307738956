//! Map abstraction consumed by the flow-field pipeline.
//!
//! The pathfinder never inspects map internals; everything it needs is
//! behind the read-only [`NavMap`] trait: cell id packing, leaf lookup,
//! gate enumeration, and neighbour iteration on the leaf and gate
//! graphs. [`QuadtreeMap`] is the reference implementation.

pub mod config;
pub mod quadtree;

pub use config::QuadtreeMapConfig;
pub use quadtree::QuadtreeMap;

use crate::core::{CellId, Cost, NodeId, Rect};

/// A connection between two cells on the shared border of two adjacent
/// obstacle-free leaves.
///
/// Gates are mirrored: each leaf's gate list holds the variant whose `a`
/// cell lies inside that leaf, so `a_node` is always the owning leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Gate {
    /// Cell on the owning leaf's side of the border.
    pub a: CellId,
    /// Paired cell inside the adjacent leaf.
    pub b: CellId,
    /// Leaf containing `a`.
    pub a_node: NodeId,
    /// Leaf containing `b`.
    pub b_node: NodeId,
}

/// Read-only query interface of a hierarchical grid map.
///
/// Implementations must be internally consistent: `unpack_xy(pack_xy(x,
/// y)) == (x, y)` for in-bounds cells, `distance` must be non-negative
/// and symmetric, and every gate's cells must belong to the leaves its
/// `a_node`/`b_node` name. The pathfinder borrows the map for the whole
/// query, so the map must not change underneath it.
pub trait NavMap {
    /// Grid width in cells.
    fn width(&self) -> i32;

    /// Grid height in cells.
    fn height(&self) -> i32;

    /// Pack grid coordinates into a cell id.
    fn pack_xy(&self, x: i32, y: i32) -> CellId;

    /// Unpack a cell id into `(x, y)`.
    fn unpack_xy(&self, cell: CellId) -> (i32, i32);

    /// Leaf containing `(x, y)`, or `None` when out of bounds.
    ///
    /// Cells on obstacles still resolve to their (blocked) leaf; whether
    /// a cell is usable is a separate [`NavMap::is_obstacle`] question.
    fn find_node(&self, x: i32, y: i32) -> Option<NodeId>;

    /// Extent of a leaf.
    fn node_rect(&self, node: NodeId) -> Rect;

    /// Whether a leaf contains no obstacles.
    fn node_is_empty(&self, node: NodeId) -> bool;

    /// Whether the cell at `(x, y)` is blocked.
    fn is_obstacle(&self, x: i32, y: i32) -> bool;

    /// Whether `cell` is one of `node`'s own gate cells.
    fn is_gate_cell(&self, node: NodeId, cell: CellId) -> bool;

    /// Distance between two cells. Non-negative; `distance(0, 0, 0, 1)`
    /// and `distance(0, 0, 1, 1)` are the orthogonal and diagonal unit
    /// costs.
    fn distance(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> Cost;

    /// Distance between two packed cells.
    fn distance_between(&self, a: CellId, b: CellId) -> Cost {
        let (x1, y1) = self.unpack_xy(a);
        let (x2, y2) = self.unpack_xy(b);
        self.distance(x1, y1, x2, y2)
    }

    /// Visit every leaf whose rectangle intersects `range`, including
    /// blocked leaves.
    fn nodes_in_range(&self, range: &Rect, visit: &mut dyn FnMut(NodeId));

    /// Visit every gate owned by `node`.
    fn for_each_gate_in_node(&self, node: NodeId, visit: &mut dyn FnMut(&Gate));

    /// Visit every leaf adjacent to `node` on the leaf graph, with the
    /// connecting edge weight.
    fn for_each_neighbour_nodes(&self, node: NodeId, visit: &mut dyn FnMut(NodeId, Cost));

    /// Visit every neighbour of `cell` on the static gate graph, with
    /// the connecting edge weight.
    fn for_each_gate_neighbours(&self, cell: CellId, visit: &mut dyn FnMut(CellId, Cost));
}
