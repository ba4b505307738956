//! Quadtree decomposition of a 2D grid, with the gate graph connecting
//! obstacle-free leaves.
//!
//! The grid is recursively split into *pure* leaves: every cell of a
//! leaf is either free or blocked. Adjacent free leaves are stitched
//! together by gates, paired cells straddling the shared border. Two
//! sparse graphs are derived at build time:
//!
//! - the **leaf graph**: one vertex per free leaf, edges between leaves
//!   that share at least one gate;
//! - the **gate graph**: one vertex per gate cell, edges between all
//!   gate cells of the same leaf plus one edge across each gate pair.
//!
//! Obstacles are fixed at build time. All queries are read-only, so a
//! built map can be shared by any number of pathfinders.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::debug;

use crate::core::{CellId, Cost, NodeId, Rect};

use super::{Gate, NavMap, QuadtreeMapConfig};

/// A terminal rectangle of the decomposition.
#[derive(Clone, Debug)]
struct Leaf {
    rect: Rect,
    empty: bool,
}

/// Quadtree grid map implementing [`NavMap`].
pub struct QuadtreeMap {
    config: QuadtreeMapConfig,
    /// Per-cell blocked flag, row-major.
    blocked: Vec<bool>,
    /// Leaf arena; `NodeId` indexes into this.
    leaves: Vec<Leaf>,
    /// Cell index -> leaf arena index, for O(1) lookup.
    cell_leaf: Vec<u32>,
    /// Per-leaf gates, mirrored so `a` is always inside the owning leaf.
    gates: Vec<Vec<Gate>>,
    /// Per-leaf set of own gate cells.
    gate_cells: Vec<BTreeSet<CellId>>,
    /// Static gate graph adjacency.
    gate_edges: HashMap<CellId, Vec<(CellId, Cost)>>,
    /// Leaf graph adjacency.
    node_edges: Vec<Vec<(NodeId, Cost)>>,
}

impl QuadtreeMap {
    /// Build a map from a blocked-cell predicate.
    ///
    /// # Arguments
    /// * `config` - grid dimensions, unit costs, gate spacing
    /// * `is_blocked` - returns true for obstacle cells
    pub fn build(config: QuadtreeMapConfig, is_blocked: impl Fn(i32, i32) -> bool) -> Self {
        assert!(config.width > 0 && config.height > 0, "map must be non-empty");

        let (w, h) = (config.width, config.height);
        let mut blocked = vec![false; (w * h) as usize];
        for y in 0..h {
            for x in 0..w {
                blocked[(y * w + x) as usize] = is_blocked(x, y);
            }
        }

        let mut map = Self {
            config,
            blocked,
            leaves: Vec::new(),
            cell_leaf: vec![0; (w * h) as usize],
            gates: Vec::new(),
            gate_cells: Vec::new(),
            gate_edges: HashMap::new(),
            node_edges: Vec::new(),
        };

        map.subdivide(Rect::new(0, 0, w - 1, h - 1));
        map.gates = vec![Vec::new(); map.leaves.len()];
        map.gate_cells = vec![BTreeSet::new(); map.leaves.len()];
        map.build_gates();
        map.build_gate_graph();
        map.build_node_graph();

        debug!(
            "[QuadtreeMap] built {}x{}: {} leaves ({} free), {} gate cells",
            w,
            h,
            map.leaves.len(),
            map.leaves.iter().filter(|l| l.empty).count(),
            map.gate_edges.len()
        );
        map
    }

    /// Number of leaves in the decomposition.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Number of obstacle-free leaves.
    pub fn empty_leaf_count(&self) -> usize {
        self.leaves.iter().filter(|l| l.empty).count()
    }

    /// The build configuration.
    pub fn config(&self) -> &QuadtreeMapConfig {
        &self.config
    }

    #[inline]
    fn cell_index(&self, x: i32, y: i32) -> usize {
        (y * self.config.width + x) as usize
    }

    fn rect_purity(&self, rect: &Rect) -> (bool, bool) {
        let mut any_blocked = false;
        let mut all_blocked = true;
        for y in rect.y1..=rect.y2 {
            for x in rect.x1..=rect.x2 {
                if self.blocked[self.cell_index(x, y)] {
                    any_blocked = true;
                } else {
                    all_blocked = false;
                }
            }
        }
        (any_blocked, all_blocked)
    }

    /// Recursively split `rect` until every leaf is pure.
    fn subdivide(&mut self, rect: Rect) {
        let (any_blocked, all_blocked) = self.rect_purity(&rect);
        let single = rect.width() == 1 && rect.height() == 1;
        if !any_blocked || all_blocked || single {
            let id = self.leaves.len() as u32;
            for y in rect.y1..=rect.y2 {
                for x in rect.x1..=rect.x2 {
                    let idx = self.cell_index(x, y);
                    self.cell_leaf[idx] = id;
                }
            }
            self.leaves.push(Leaf {
                rect,
                empty: !any_blocked,
            });
            return;
        }

        let mx = (rect.x1 + rect.x2) / 2;
        let my = (rect.y1 + rect.y2) / 2;
        if rect.width() == 1 {
            self.subdivide(Rect::new(rect.x1, rect.y1, rect.x2, my));
            self.subdivide(Rect::new(rect.x1, my + 1, rect.x2, rect.y2));
        } else if rect.height() == 1 {
            self.subdivide(Rect::new(rect.x1, rect.y1, mx, rect.y2));
            self.subdivide(Rect::new(mx + 1, rect.y1, rect.x2, rect.y2));
        } else {
            self.subdivide(Rect::new(rect.x1, rect.y1, mx, my));
            self.subdivide(Rect::new(mx + 1, rect.y1, rect.x2, my));
            self.subdivide(Rect::new(rect.x1, my + 1, mx, rect.y2));
            self.subdivide(Rect::new(mx + 1, my + 1, rect.x2, rect.y2));
        }
    }

    /// Create mirrored gate pairs along every shared border of adjacent
    /// free leaves. Scanning only east and south borders visits each
    /// adjacency once.
    fn build_gates(&mut self) {
        let step = self.config.gate_step.max(1) as usize;
        let (w, h) = (self.config.width, self.config.height);

        for a_id in 0..self.leaves.len() {
            if !self.leaves[a_id].empty {
                continue;
            }
            let rect = self.leaves[a_id].rect;

            // East border: pair (x2, y) with (x2 + 1, y).
            if rect.x2 + 1 < w {
                let mut by_neighbour: BTreeMap<u32, Vec<(i32, i32)>> = BTreeMap::new();
                for y in rect.y1..=rect.y2 {
                    let b_id = self.cell_leaf[self.cell_index(rect.x2 + 1, y)];
                    if self.leaves[b_id as usize].empty {
                        by_neighbour.entry(b_id).or_default().push((rect.x2, y));
                    }
                }
                self.emit_gates(a_id as u32, by_neighbour, step, (1, 0));
            }

            // South border: pair (x, y2) with (x, y2 + 1).
            if rect.y2 + 1 < h {
                let mut by_neighbour: BTreeMap<u32, Vec<(i32, i32)>> = BTreeMap::new();
                for x in rect.x1..=rect.x2 {
                    let b_id = self.cell_leaf[self.cell_index(x, rect.y2 + 1)];
                    if self.leaves[b_id as usize].empty {
                        by_neighbour.entry(b_id).or_default().push((x, rect.y2));
                    }
                }
                self.emit_gates(a_id as u32, by_neighbour, step, (0, 1));
            }
        }
    }

    /// Turn grouped border cells into gates, keeping every `step`-th
    /// pair plus the last one of each run so corners stay connected.
    fn emit_gates(
        &mut self,
        a_id: u32,
        by_neighbour: BTreeMap<u32, Vec<(i32, i32)>>,
        step: usize,
        dir: (i32, i32),
    ) {
        for (b_id, cells) in by_neighbour {
            let last = cells.len() - 1;
            for (i, &(x, y)) in cells.iter().enumerate() {
                if i % step != 0 && i != last {
                    continue;
                }
                let a = self.pack_xy(x, y);
                let b = self.pack_xy(x + dir.0, y + dir.1);
                self.gates[a_id as usize].push(Gate {
                    a,
                    b,
                    a_node: NodeId(a_id),
                    b_node: NodeId(b_id),
                });
                self.gates[b_id as usize].push(Gate {
                    a: b,
                    b: a,
                    a_node: NodeId(b_id),
                    b_node: NodeId(a_id),
                });
                self.gate_cells[a_id as usize].insert(a);
                self.gate_cells[b_id as usize].insert(b);
            }
        }
    }

    /// Connect all gate cells of each leaf pairwise, and each gate pair
    /// across its border. The mirrored gate supplies the reverse cross
    /// edge.
    fn build_gate_graph(&mut self) {
        let mut edges: HashMap<CellId, Vec<(CellId, Cost)>> = HashMap::new();

        for id in 0..self.leaves.len() {
            if !self.leaves[id].empty {
                continue;
            }
            let cells: Vec<CellId> = self.gate_cells[id].iter().copied().collect();
            for i in 0..cells.len() {
                for j in (i + 1)..cells.len() {
                    let w = self.cell_distance(cells[i], cells[j]);
                    edges.entry(cells[i]).or_default().push((cells[j], w));
                    edges.entry(cells[j]).or_default().push((cells[i], w));
                }
            }
            for gate in &self.gates[id] {
                let w = self.cell_distance(gate.a, gate.b);
                edges.entry(gate.a).or_default().push((gate.b, w));
            }
        }

        self.gate_edges = edges;
    }

    /// Leaf graph edges between free leaves sharing at least one gate,
    /// weighted by the distance between leaf centers.
    fn build_node_graph(&mut self) {
        let mut node_edges = vec![Vec::new(); self.leaves.len()];

        for id in 0..self.leaves.len() {
            if !self.leaves[id].empty {
                continue;
            }
            let neighbours: BTreeSet<u32> = self.gates[id].iter().map(|g| g.b_node.0).collect();
            let (cx, cy) = self.leaves[id].rect.center();
            for b in neighbours {
                let (bx, by) = self.leaves[b as usize].rect.center();
                node_edges[id].push((NodeId(b), self.octile(cx, cy, bx, by)));
            }
        }

        self.node_edges = node_edges;
    }

    #[inline]
    fn octile(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> Cost {
        let dx = (x1 - x2).abs();
        let dy = (y1 - y2).abs();
        let (lo, hi) = if dx < dy { (dx, dy) } else { (dy, dx) };
        self.config.ortho_cost * (hi - lo) + self.config.diag_cost * lo
    }

    #[inline]
    fn cell_distance(&self, a: CellId, b: CellId) -> Cost {
        let (x1, y1) = self.unpack_xy(a);
        let (x2, y2) = self.unpack_xy(b);
        self.octile(x1, y1, x2, y2)
    }
}

impl NavMap for QuadtreeMap {
    fn width(&self) -> i32 {
        self.config.width
    }

    fn height(&self) -> i32 {
        self.config.height
    }

    fn pack_xy(&self, x: i32, y: i32) -> CellId {
        debug_assert!(x >= 0 && x < self.config.width && y >= 0 && y < self.config.height);
        CellId((y * self.config.width + x) as u32)
    }

    fn unpack_xy(&self, cell: CellId) -> (i32, i32) {
        let raw = cell.0 as i32;
        (raw % self.config.width, raw / self.config.width)
    }

    fn find_node(&self, x: i32, y: i32) -> Option<NodeId> {
        if x < 0 || x >= self.config.width || y < 0 || y >= self.config.height {
            return None;
        }
        Some(NodeId(self.cell_leaf[self.cell_index(x, y)]))
    }

    fn node_rect(&self, node: NodeId) -> Rect {
        self.leaves[node.index()].rect
    }

    fn node_is_empty(&self, node: NodeId) -> bool {
        self.leaves[node.index()].empty
    }

    fn is_obstacle(&self, x: i32, y: i32) -> bool {
        if x < 0 || x >= self.config.width || y < 0 || y >= self.config.height {
            return true;
        }
        self.blocked[self.cell_index(x, y)]
    }

    fn is_gate_cell(&self, node: NodeId, cell: CellId) -> bool {
        self.gate_cells[node.index()].contains(&cell)
    }

    fn distance(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> Cost {
        self.octile(x1, y1, x2, y2)
    }

    fn nodes_in_range(&self, range: &Rect, visit: &mut dyn FnMut(NodeId)) {
        for (id, leaf) in self.leaves.iter().enumerate() {
            if leaf.rect.intersects(range) {
                visit(NodeId(id as u32));
            }
        }
    }

    fn for_each_gate_in_node(&self, node: NodeId, visit: &mut dyn FnMut(&Gate)) {
        for gate in &self.gates[node.index()] {
            visit(gate);
        }
    }

    fn for_each_neighbour_nodes(&self, node: NodeId, visit: &mut dyn FnMut(NodeId, Cost)) {
        for &(neighbour, w) in &self.node_edges[node.index()] {
            visit(neighbour, w);
        }
    }

    fn for_each_gate_neighbours(&self, cell: CellId, visit: &mut dyn FnMut(CellId, Cost)) {
        if let Some(edges) = self.gate_edges.get(&cell) {
            for &(neighbour, w) in edges {
                visit(neighbour, w);
            }
        }
    }
}
