//! Flow-field pathfinder facade.
//!
//! One instance serves one query at a time. `reset` binds the map,
//! target and query rectangle and prepares the per-query collections;
//! the three compute stages then run in order:
//!
//! 1. [`compute_node_flow_field`](FlowFieldPathfinder::compute_node_flow_field)
//!    (optional) floods the leaf graph from the target's leaf, stopping
//!    as soon as every leaf overlapping the query range is settled;
//! 2. [`compute_gate_flow_field`](FlowFieldPathfinder::compute_gate_flow_field)
//!    floods the gate graph plus the query overlay from the target
//!    cell, optionally restricted to gate cells lying on the node
//!    field;
//! 3. [`compute_final_flow_field`](FlowFieldPathfinder::compute_final_flow_field)
//!    densifies the gate costs into every query-range cell.
//!
//! Stages may be re-run between resets and recompute from scratch,
//! producing identical fields. Running stage 3 without a prior stage 2
//! is a contract violation and yields an empty field.
//!
//! The pathfinder holds mutable scratch and is not meant for concurrent
//! use; several instances may share one map.

use std::collections::BTreeSet;

use log::{debug, trace};

use crate::core::{CellId, Cost, NodeId, Rect, UNREACHABLE};
use crate::error::{QueryError, Result};
use crate::map::NavMap;

use super::densify::{DenseRelaxer, adjacent_step};
use super::field::{CellFlowField, NodeFlowField};
use super::overlay::OverlayGraph;
use super::solver::FlowFieldSolver;

/// Computes flow fields toward a single target over a [`NavMap`].
///
/// The lifetime ties the pathfinder to the map bound by
/// [`reset`](FlowFieldPathfinder::reset): it cannot outlive it.
pub struct FlowFieldPathfinder<'m, M: NavMap> {
    m: Option<&'m M>,
    x2: i32,
    y2: i32,
    /// Packed target cell; only meaningful while `t_node` is set.
    t: CellId,
    t_node: Option<NodeId>,
    qrange: Rect,
    /// Failure recorded by the last `reset`, replayed by the stages.
    query_err: Option<QueryError>,
    /// Free leaves intersecting the query range.
    nodes_overlapping: BTreeSet<NodeId>,
    /// Gate cells (static or virtual) inside the query range, driving
    /// the gate stage's early stop.
    gates_in_range: BTreeSet<CellId>,
    /// Gate cells allowed by the node-field restriction.
    gate_cells_on_node_field: BTreeSet<CellId>,
    overlay: OverlayGraph,
    node_solver: FlowFieldSolver<NodeId>,
    gate_solver: FlowFieldSolver<CellId>,
    node_field: NodeFlowField,
    gate_field: CellFlowField,
    final_field: CellFlowField,
}

impl<'m, M: NavMap> FlowFieldPathfinder<'m, M> {
    /// Create a pathfinder with no bound query.
    pub fn new() -> Self {
        Self {
            m: None,
            x2: 0,
            y2: 0,
            t: CellId(0),
            t_node: None,
            qrange: Rect::default(),
            query_err: Some(QueryError::UnresolvedTarget),
            nodes_overlapping: BTreeSet::new(),
            gates_in_range: BTreeSet::new(),
            gate_cells_on_node_field: BTreeSet::new(),
            overlay: OverlayGraph::new(),
            node_solver: FlowFieldSolver::new(),
            gate_solver: FlowFieldSolver::new(),
            node_field: NodeFlowField::new(),
            gate_field: CellFlowField::new(),
            final_field: CellFlowField::new(),
        }
    }

    /// Bind a new query: map, target cell and query rectangle.
    ///
    /// Clears every field and the overlay from the previous query
    /// before validating, so a failed reset leaves no stale results.
    /// The error (ill-formed rectangle, out-of-bounds target) is also
    /// replayed by any compute call until the next successful reset.
    pub fn reset(&mut self, m: &'m M, x2: i32, y2: i32, qrange: Rect) -> Result<()> {
        let result = self.bind_query(m, x2, y2, qrange);
        self.query_err = result.err();
        result
    }

    fn bind_query(&mut self, m: &'m M, x2: i32, y2: i32, qrange: Rect) -> Result<()> {
        self.m = Some(m);
        self.x2 = x2;
        self.y2 = y2;
        self.qrange = qrange;
        self.t_node = None;

        self.node_field.clear();
        self.gate_field.clear();
        self.final_field.clear();
        self.nodes_overlapping.clear();
        self.gates_in_range.clear();
        self.gate_cells_on_node_field.clear();
        self.overlay.clear();

        if !qrange.is_valid() {
            return Err(QueryError::InvalidRange);
        }

        let t_node = m.find_node(x2, y2).ok_or(QueryError::UnresolvedTarget)?;
        self.t_node = Some(t_node);
        self.t = m.pack_xy(x2, y2);

        // Free leaves overlapping the query range.
        let overlapping = &mut self.nodes_overlapping;
        m.nodes_in_range(&qrange, &mut |node| {
            if m.node_is_empty(node) {
                overlapping.insert(node);
            }
        });

        // Their gate cells, counted toward the gate stage's early stop
        // only when they lie inside the query range.
        let gates = &mut self.gates_in_range;
        for &node in self.nodes_overlapping.iter() {
            m.for_each_gate_in_node(node, &mut |gate| {
                let (gx, gy) = m.unpack_xy(gate.a);
                if qrange.contains(gx, gy) {
                    gates.insert(gate.a);
                }
            });
        }

        // Expose the target as a virtual gate of its leaf unless the
        // static graph already classifies it as one.
        if !m.is_gate_cell(t_node, self.t) {
            self.overlay.add_cell_to_node(m, self.t, t_node);
            if qrange.contains(x2, y2) {
                self.gates_in_range.insert(self.t);
            }
        }

        // Query-range cells inside the target's own leaf reach the
        // target along a straight line; connect them directly. Static
        // gate cells are already connected through the overlay above.
        if let Some(overlap) = m.node_rect(t_node).intersection(&qrange) {
            for y in overlap.y1..=overlap.y2 {
                for x in overlap.x1..=overlap.x2 {
                    let u = m.pack_xy(x, y);
                    if u != self.t && !m.is_gate_cell(t_node, u) {
                        self.overlay.connect_cells(m, u, self.t);
                        self.gates_in_range.insert(u);
                    }
                }
            }
        }

        trace!(
            "[FlowField] reset: target=({}, {}) qrange=({}, {})-({}, {}) leaves={} stop_gates={}",
            x2,
            y2,
            qrange.x1,
            qrange.y1,
            qrange.x2,
            qrange.y2,
            self.nodes_overlapping.len(),
            self.gates_in_range.len()
        );
        Ok(())
    }

    /// Validate the bound query for a compute stage.
    fn ensure_target(&self) -> Result<(&'m M, NodeId)> {
        if let Some(err) = self.query_err {
            return Err(err);
        }
        let m = self.m.ok_or(QueryError::UnresolvedTarget)?;
        let t_node = self.t_node.ok_or(QueryError::UnresolvedTarget)?;
        if m.is_obstacle(self.x2, self.y2) {
            return Err(QueryError::TargetOnObstacle);
        }
        Ok((m, t_node))
    }

    /// Flood the leaf graph from the target's leaf.
    ///
    /// Stops once every free leaf overlapping the query range is
    /// settled. Only needed when the gate stage will run with the
    /// node-field restriction; skipping it merely foregoes that
    /// pruning.
    pub fn compute_node_flow_field(&mut self) -> Result<()> {
        let (m, t_node) = self.ensure_target()?;
        self.node_field.clear();

        let overlapping = &self.nodes_overlapping;
        let total = overlapping.len();
        let mut settled_in_range = 0usize;
        self.node_solver.compute(
            t_node,
            &mut self.node_field,
            |u, visit| m.for_each_neighbour_nodes(u, visit),
            |_| true,
            |u| {
                if overlapping.contains(&u) {
                    settled_in_range += 1;
                }
                settled_in_range >= total
            },
        );

        debug!(
            "[FlowField] node stage: {} leaves settled ({} in range)",
            self.node_field.len(),
            settled_in_range
        );
        Ok(())
    }

    /// Flood the gate graph plus the query overlay from the target
    /// cell.
    ///
    /// With `use_node_flow_field` the flood only expands gate cells
    /// lying on the node field computed by
    /// [`compute_node_flow_field`](Self::compute_node_flow_field); the
    /// result then covers a (possibly costlier) subset of the
    /// unrestricted field. Stops once every gate cell of the query
    /// range is settled.
    pub fn compute_gate_flow_field(&mut self, use_node_flow_field: bool) -> Result<()> {
        let (m, t_node) = self.ensure_target()?;
        self.gate_field.clear();

        if use_node_flow_field {
            self.gate_cells_on_node_field.clear();
            self.collect_gate_cells_on_node_field(m, t_node);
        }

        let gates_in_range = &self.gates_in_range;
        let on_node_field = &self.gate_cells_on_node_field;
        let overlay = &self.overlay;
        let total = gates_in_range.len();
        let mut settled_in_range = 0usize;

        self.gate_solver.compute(
            self.t,
            &mut self.gate_field,
            |u, visit| {
                overlay.for_each_neighbours(u, visit);
                m.for_each_gate_neighbours(u, visit);
            },
            |v| !use_node_flow_field || on_node_field.contains(&v),
            |u| {
                if gates_in_range.contains(&u) {
                    settled_in_range += 1;
                }
                settled_in_range >= total
            },
        );

        debug!(
            "[FlowField] gate stage: {} cells settled ({} in range, restricted={})",
            self.gate_field.len(),
            settled_in_range,
            use_node_flow_field
        );
        Ok(())
    }

    /// Gate cells lying on some leaf-to-leaf path of the node field:
    /// the target, its in-leaf virtual gates, and for every settled
    /// leaf the gates bridging it to its successor leaf.
    fn collect_gate_cells_on_node_field(&mut self, m: &M, t_node: NodeId) {
        let set = &mut self.gate_cells_on_node_field;
        set.insert(self.t);

        self.overlay.for_each_neighbours(self.t, &mut |v, _| {
            if !m.is_gate_cell(t_node, v) {
                set.insert(v);
            }
        });

        for (node, entry) in self.node_field.iter() {
            // The target's leaf points to itself and has no bridge.
            if node == t_node {
                continue;
            }
            m.for_each_gate_in_node(node, &mut |gate| {
                if gate.b_node == entry.next {
                    set.insert(gate.a);
                    set.insert(gate.b);
                }
            });
        }
    }

    /// Densify the gate field into every cell of the query range.
    ///
    /// Two chamfer sweeps per overlapping leaf spread the seeded gate
    /// costs; leaves being obstacle-free makes the sweeps exact.
    /// Requires a prior [`compute_gate_flow_field`](Self::compute_gate_flow_field);
    /// without one the result is empty.
    pub fn compute_final_flow_field(&mut self) -> Result<()> {
        let (m, _) = self.ensure_target()?;
        self.final_field.clear();

        // Working domain: query range plus every overlapping leaf,
        // padded one cell so sweeps can read seeded border cells of
        // adjacent leaves, clamped to the map.
        let mut domain = self.qrange;
        for &node in &self.nodes_overlapping {
            domain = domain.union(&m.node_rect(node));
        }
        let bounds = Rect::new(0, 0, m.width() - 1, m.height() - 1);
        let Some(domain) = domain.expand(1).intersection(&bounds) else {
            return Ok(());
        };

        let mut relaxer = DenseRelaxer::new(domain);

        // Seed every gate-field cell. Inside the query range the seed
        // also records the grid-adjacent step toward its successor.
        for (v, entry) in self.gate_field.iter() {
            let (x, y) = m.unpack_xy(v);
            let (nx, ny) = m.unpack_xy(entry.next);
            let step = self
                .qrange
                .contains(x, y)
                .then(|| adjacent_step(x, y, nx, ny));
            relaxer.seed(x, y, entry.cost, step);
        }

        let c1 = m.distance(0, 0, 0, 1);
        let c2 = m.distance(0, 0, 1, 1);
        for &node in &self.nodes_overlapping {
            let rect = m.node_rect(node);
            relaxer.sweep_forward(&rect, c1, c2);
            relaxer.sweep_backward(&rect, c1, c2);
        }

        // Emit the query range; cells without a cost or source stay
        // out of the field.
        if let Some(emit) = self.qrange.intersection(&bounds) {
            for y in emit.y1..=emit.y2 {
                for x in emit.x1..=emit.x2 {
                    let cost = relaxer.cost(x, y);
                    if cost == UNREACHABLE {
                        continue;
                    }
                    let Some((fx, fy)) = relaxer.from(x, y) else {
                        continue;
                    };
                    self.final_field
                        .set(m.pack_xy(x, y), cost, m.pack_xy(fx, fy));
                }
            }
        }

        debug!(
            "[FlowField] final stage: {} cells in range",
            self.final_field.len()
        );
        Ok(())
    }

    /// Leaf-level flow field produced by the node stage.
    pub fn node_flow_field(&self) -> &NodeFlowField {
        &self.node_field
    }

    /// Gate-level flow field produced by the gate stage.
    pub fn gate_flow_field(&self) -> &CellFlowField {
        &self.gate_field
    }

    /// Dense cell-level flow field over the query range.
    pub fn final_flow_field(&self) -> &CellFlowField {
        &self.final_field
    }

    /// Overlay edges of the current query.
    pub fn overlay(&self) -> &OverlayGraph {
        &self.overlay
    }

    /// Gate cells admitted by the node-field restriction of the last
    /// restricted gate stage.
    pub fn gate_cells_on_node_field(&self) -> &BTreeSet<CellId> {
        &self.gate_cells_on_node_field
    }

    /// Packed target cell of the bound query, if any.
    pub fn target_cell(&self) -> Option<CellId> {
        self.t_node.map(|_| self.t)
    }

    /// Query rectangle of the bound query.
    pub fn query_range(&self) -> &Rect {
        &self.qrange
    }

    /// Visit a cell field's entries as unpacked coordinates:
    /// `visit(x, y, next_x, next_y, cost)`.
    pub fn visit_cell_flow_field(
        &self,
        field: &CellFlowField,
        mut visit: impl FnMut(i32, i32, i32, i32, Cost),
    ) {
        let Some(m) = self.m else { return };
        for (v, entry) in field.iter() {
            let (x, y) = m.unpack_xy(v);
            let (nx, ny) = m.unpack_xy(entry.next);
            visit(x, y, nx, ny, entry.cost);
        }
    }

    /// Visit the node field's entries: `visit(leaf, next_leaf, cost)`.
    pub fn visit_node_flow_field(&self, mut visit: impl FnMut(NodeId, NodeId, Cost)) {
        for (node, entry) in self.node_field.iter() {
            visit(node, entry.next, entry.cost);
        }
    }
}

impl<'m, M: NavMap> Default for FlowFieldPathfinder<'m, M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{QuadtreeMap, QuadtreeMapConfig};

    fn open_map(size: i32) -> QuadtreeMap {
        QuadtreeMap::build(QuadtreeMapConfig::new(size, size), |_, _| false)
    }

    #[test]
    fn test_source_entries() {
        let map = open_map(6);
        let mut pf = FlowFieldPathfinder::new();
        pf.reset(&map, 3, 3, Rect::new(0, 0, 5, 5)).unwrap();
        pf.compute_node_flow_field().unwrap();
        pf.compute_gate_flow_field(false).unwrap();
        pf.compute_final_flow_field().unwrap();

        let t_node = map.find_node(3, 3).unwrap();
        let t = map.pack_xy(3, 3);
        assert_eq!(pf.node_flow_field().cost(t_node), Some(0));
        assert_eq!(pf.node_flow_field().next(t_node), Some(t_node));
        assert_eq!(pf.gate_flow_field().cost(t), Some(0));
        assert_eq!(pf.gate_flow_field().next(t), Some(t));
        assert_eq!(pf.final_flow_field().cost(t), Some(0));
        assert_eq!(pf.final_flow_field().next(t), Some(t));
    }

    #[test]
    fn test_compute_before_reset() {
        let mut pf: FlowFieldPathfinder<'_, QuadtreeMap> = FlowFieldPathfinder::new();
        assert_eq!(
            pf.compute_gate_flow_field(false),
            Err(QueryError::UnresolvedTarget)
        );
        assert_eq!(
            pf.compute_final_flow_field(),
            Err(QueryError::UnresolvedTarget)
        );
    }

    #[test]
    fn test_final_without_gate_stage_is_empty() {
        let map = open_map(6);
        let mut pf = FlowFieldPathfinder::new();
        pf.reset(&map, 3, 3, Rect::new(0, 0, 5, 5)).unwrap();
        pf.compute_final_flow_field().unwrap();
        assert!(pf.final_flow_field().is_empty());
    }

    #[test]
    fn test_reset_clears_previous_query() {
        let map = open_map(6);
        let mut pf = FlowFieldPathfinder::new();
        pf.reset(&map, 3, 3, Rect::new(0, 0, 5, 5)).unwrap();
        pf.compute_gate_flow_field(false).unwrap();
        pf.compute_final_flow_field().unwrap();
        assert!(!pf.final_flow_field().is_empty());

        // A failed reset must leave nothing behind.
        assert_eq!(
            pf.reset(&map, 3, 3, Rect::new(5, 5, 4, 4)),
            Err(QueryError::InvalidRange)
        );
        assert!(pf.gate_flow_field().is_empty());
        assert!(pf.final_flow_field().is_empty());
        assert!(pf.overlay().is_empty());
        assert_eq!(
            pf.compute_gate_flow_field(false),
            Err(QueryError::InvalidRange)
        );
    }
}
