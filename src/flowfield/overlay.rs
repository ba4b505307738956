//! Query-scoped overlay edges on top of the static gate graph.
//!
//! The gate graph only knows cells that sit on leaf borders. A query's
//! target (and, when the target leaf overlaps the query range, the
//! surrounding in-leaf cells) must nevertheless act as gate vertices.
//! Rather than mutating the map, those connections live here for the
//! lifetime of one query and are cleared on the next reset.

use std::collections::HashMap;

use crate::core::{CellId, Cost, NodeId};
use crate::map::NavMap;

/// Ephemeral bidirectional edges keyed by cell id.
#[derive(Debug, Default)]
pub struct OverlayGraph {
    edges: HashMap<CellId, Vec<(CellId, Cost)>>,
}

impl OverlayGraph {
    /// Create an empty overlay.
    pub fn new() -> Self {
        Self {
            edges: HashMap::new(),
        }
    }

    /// Drop all overlay edges.
    pub fn clear(&mut self) {
        self.edges.clear();
    }

    /// Whether the overlay holds no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Cells that have at least one overlay edge.
    pub fn cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.edges.keys().copied()
    }

    /// Connect `cell` bidirectionally to every gate cell of `node`,
    /// weighted by map distance. This is how a non-gate cell becomes a
    /// virtual gate of its leaf.
    pub fn add_cell_to_node<M: NavMap>(&mut self, m: &M, cell: CellId, node: NodeId) {
        m.for_each_gate_in_node(node, &mut |gate| {
            if gate.a != cell {
                let w = m.distance_between(cell, gate.a);
                self.insert(cell, gate.a, w);
                self.insert(gate.a, cell, w);
            }
        });
    }

    /// Connect two cells bidirectionally, weighted by map distance.
    pub fn connect_cells<M: NavMap>(&mut self, m: &M, a: CellId, b: CellId) {
        let w = m.distance_between(a, b);
        self.insert(a, b, w);
        self.insert(b, a, w);
    }

    /// Visit every overlay neighbour of `cell`.
    pub fn for_each_neighbours(&self, cell: CellId, visit: &mut dyn FnMut(CellId, Cost)) {
        if let Some(edges) = self.edges.get(&cell) {
            for &(neighbour, w) in edges {
                visit(neighbour, w);
            }
        }
    }

    #[inline]
    fn insert(&mut self, from: CellId, to: CellId, w: Cost) {
        self.edges.entry(from).or_default().push((to, w));
    }
}
