//! End-to-end tests for the flow-field pipeline on quadtree maps.
//!
//! Covers the documented query scenarios (open maps, obstacle targets,
//! ill-formed ranges, wall-bisected maps, node-field restriction) and
//! the field invariants: source consistency, successor telescoping,
//! adjacency of final-field successors, cost monotonicity along next
//! chains, idempotent recomputation, and agreement with a brute-force
//! grid Dijkstra on randomized maps.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use rand::prelude::*;

use marga_nav::{
    CellFlowField, FlowFieldPathfinder, NavMap, QuadtreeMap, QuadtreeMapConfig, QueryError, Rect,
};

const C1: i32 = 10;
const C2: i32 = 14;

fn open_map(w: i32, h: i32) -> QuadtreeMap {
    QuadtreeMap::build(QuadtreeMapConfig::new(w, h), |_, _| false)
}

fn ascii_map(rows: &[&str]) -> QuadtreeMap {
    let h = rows.len() as i32;
    let w = rows[0].len() as i32;
    let rows: Vec<Vec<u8>> = rows.iter().map(|r| r.as_bytes().to_vec()).collect();
    QuadtreeMap::build(QuadtreeMapConfig::new(w, h), |x, y| {
        rows[y as usize][x as usize] == b'#'
    })
}

/// 10x10 map bisected by a wall at x = 4 with a gap at (4, 9).
fn wall_map() -> QuadtreeMap {
    QuadtreeMap::build(QuadtreeMapConfig::new(10, 10), |x, y| x == 4 && y <= 8)
}

fn octile(dx: i32, dy: i32) -> i32 {
    let (dx, dy) = (dx.abs(), dy.abs());
    C1 * (dx.max(dy) - dx.min(dy)) + C2 * dx.min(dy)
}

fn cost_at(map: &QuadtreeMap, field: &CellFlowField, x: i32, y: i32) -> Option<i32> {
    field.cost(map.pack_xy(x, y))
}

/// Follow next pointers from `(x, y)` to the target, asserting strictly
/// decreasing costs and 8-adjacency of every hop. Returns the visited
/// cells including both endpoints.
fn follow_chain(map: &QuadtreeMap, field: &CellFlowField, x: i32, y: i32) -> Vec<(i32, i32)> {
    let mut path = vec![(x, y)];
    let (mut cx, mut cy) = (x, y);
    loop {
        let entry = field
            .get(map.pack_xy(cx, cy))
            .unwrap_or_else(|| panic!("chain left the field at ({cx},{cy})"));
        if entry.cost == 0 {
            return path;
        }
        let (nx, ny) = map.unpack_xy(entry.next);
        assert!(
            (nx - cx).abs() <= 1 && (ny - cy).abs() <= 1,
            "non-adjacent hop ({cx},{cy}) -> ({nx},{ny})"
        );
        let next_cost = field
            .cost(entry.next)
            .unwrap_or_else(|| panic!("chain left the field at ({nx},{ny})"));
        assert!(
            next_cost < entry.cost,
            "cost must fall along the chain: {} -> {} at ({nx},{ny})",
            entry.cost,
            next_cost
        );
        path.push((nx, ny));
        (cx, cy) = (nx, ny);
        assert!(path.len() <= 10_000, "chain does not terminate");
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Brute-force reference: Dijkstra on the raw 8-connected cell grid.
// With `cut_corners` a diagonal step only needs its destination free;
// without it, both flanking orthogonal cells must be free as well (the
// moves that gate crossings and in-leaf straight lines can express).
// ─────────────────────────────────────────────────────────────────────────

#[derive(PartialEq, Eq)]
struct GridState {
    cost: i32,
    cell: (i32, i32),
}

impl Ord for GridState {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.cmp(&self.cost).then_with(|| self.cell.cmp(&other.cell))
    }
}

impl PartialOrd for GridState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn reference_costs(
    map: &QuadtreeMap,
    tx: i32,
    ty: i32,
    cut_corners: bool,
) -> HashMap<(i32, i32), i32> {
    let mut dist = HashMap::new();
    let mut heap = BinaryHeap::new();
    dist.insert((tx, ty), 0);
    heap.push(GridState {
        cost: 0,
        cell: (tx, ty),
    });

    while let Some(GridState { cost, cell: (x, y) }) = heap.pop() {
        if dist.get(&(x, y)).copied() != Some(cost) {
            continue;
        }
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let (nx, ny) = (x + dx, y + dy);
                if map.is_obstacle(nx, ny) {
                    continue;
                }
                let diagonal = dx != 0 && dy != 0;
                if diagonal
                    && !cut_corners
                    && (map.is_obstacle(x + dx, y) || map.is_obstacle(x, y + dy))
                {
                    continue;
                }
                let w = if diagonal { C2 } else { C1 };
                let next = cost + w;
                if next < dist.get(&(nx, ny)).copied().unwrap_or(i32::MAX) {
                    dist.insert((nx, ny), next);
                    heap.push(GridState {
                        cost: next,
                        cell: (nx, ny),
                    });
                }
            }
        }
    }
    dist
}

// ─────────────────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn test_open_map_full_range() {
    let map = open_map(10, 10);
    let mut pf = FlowFieldPathfinder::new();
    pf.reset(&map, 5, 5, Rect::new(0, 0, 9, 9)).unwrap();
    pf.compute_gate_flow_field(false).unwrap();
    pf.compute_final_flow_field().unwrap();

    let field = pf.final_flow_field();
    assert_eq!(field.len(), 100);
    assert_eq!(cost_at(&map, field, 5, 5), Some(0));
    assert_eq!(cost_at(&map, field, 0, 0), Some(5 * C2));
    assert_eq!(cost_at(&map, field, 5, 0), Some(5 * C1));

    // Every cell holds the exact octile distance and an adjacent next.
    for y in 0..10 {
        for x in 0..10 {
            assert_eq!(
                cost_at(&map, field, x, y),
                Some(octile(x - 5, y - 5)),
                "wrong cost at ({x},{y})"
            );
            follow_chain(&map, field, x, y);
        }
    }
}

#[test]
fn test_target_on_obstacle() {
    let map = ascii_map(&[
        "..........",
        "..........",
        "..........",
        "..........",
        "..........",
        ".....#....",
        "..........",
        "..........",
        "..........",
        "..........",
    ]);
    let mut pf = FlowFieldPathfinder::new();
    pf.reset(&map, 5, 5, Rect::new(0, 0, 9, 9)).unwrap();

    assert_eq!(pf.compute_node_flow_field(), Err(QueryError::TargetOnObstacle));
    assert_eq!(
        pf.compute_gate_flow_field(false),
        Err(QueryError::TargetOnObstacle)
    );
    assert_eq!(pf.compute_final_flow_field(), Err(QueryError::TargetOnObstacle));
    assert!(pf.node_flow_field().is_empty());
    assert!(pf.gate_flow_field().is_empty());
    assert!(pf.final_flow_field().is_empty());
}

#[test]
fn test_invalid_range() {
    let map = open_map(10, 10);
    let mut pf = FlowFieldPathfinder::new();
    assert_eq!(
        pf.reset(&map, 5, 5, Rect::new(5, 5, 4, 4)),
        Err(QueryError::InvalidRange)
    );
    assert_eq!(pf.compute_node_flow_field(), Err(QueryError::InvalidRange));
    assert_eq!(
        pf.compute_gate_flow_field(false),
        Err(QueryError::InvalidRange)
    );
    assert_eq!(pf.compute_final_flow_field(), Err(QueryError::InvalidRange));
}

#[test]
fn test_out_of_bounds_target() {
    let map = open_map(10, 10);
    let mut pf = FlowFieldPathfinder::new();
    assert_eq!(
        pf.reset(&map, 12, 3, Rect::new(0, 0, 9, 9)),
        Err(QueryError::UnresolvedTarget)
    );
    assert_eq!(pf.compute_node_flow_field(), Err(QueryError::UnresolvedTarget));
}

#[test]
fn test_wall_bisected_map() {
    let map = wall_map();
    let mut pf = FlowFieldPathfinder::new();
    pf.reset(&map, 0, 0, Rect::new(0, 0, 9, 9)).unwrap();
    pf.compute_gate_flow_field(false).unwrap();
    pf.compute_final_flow_field().unwrap();

    let field = pf.final_flow_field();

    // The route from the far side must squeeze through the gap.
    let chain = follow_chain(&map, field, 9, 0);
    assert!(chain.contains(&(4, 9)), "chain must pass through the gap");

    let far = cost_at(&map, field, 9, 0).unwrap();
    let near_gap = cost_at(&map, field, 9, 9).unwrap();
    assert!(far > near_gap);

    // No successor crosses the wall column except at the gap.
    for (v, entry) in field.iter() {
        let (x, y) = map.unpack_xy(v);
        if x == 4 {
            assert_eq!(y, 9, "only the gap cell may appear on the wall column");
        }
        let (nx, ny) = map.unpack_xy(entry.next);
        if nx == 4 {
            assert_eq!(ny, 9, "({x},{y}) points into the wall");
        }
    }
}

#[test]
fn test_target_leaf_covers_query_range() {
    let map = open_map(20, 20);
    let qrange = Rect::new(0, 0, 4, 4);
    let mut pf = FlowFieldPathfinder::new();
    pf.reset(&map, 2, 2, qrange).unwrap();
    pf.compute_gate_flow_field(false).unwrap();
    pf.compute_final_flow_field().unwrap();

    let field = pf.final_flow_field();
    assert_eq!(field.len(), 25);
    assert_eq!(cost_at(&map, field, 0, 0), Some(2 * C2));
    assert_eq!(cost_at(&map, field, 4, 4), Some(2 * C2));
    assert_eq!(cost_at(&map, field, 2, 0), Some(2 * C1));

    // Every next is the straight-line adjacent step toward the target.
    for (v, entry) in field.iter() {
        let (x, y) = map.unpack_xy(v);
        let (nx, ny) = map.unpack_xy(entry.next);
        assert_eq!((nx, ny), (x + (2 - x).signum(), y + (2 - y).signum()));
    }
}

#[test]
fn test_node_field_restriction() {
    let map = wall_map();
    let qrange = Rect::new(0, 0, 9, 9);

    let mut base = FlowFieldPathfinder::new();
    base.reset(&map, 0, 0, qrange).unwrap();
    base.compute_gate_flow_field(false).unwrap();
    base.compute_final_flow_field().unwrap();
    let base_final = base.final_flow_field().clone();

    let mut pf = FlowFieldPathfinder::new();
    pf.reset(&map, 0, 0, qrange).unwrap();
    pf.compute_node_flow_field().unwrap();
    pf.compute_gate_flow_field(true).unwrap();
    pf.compute_final_flow_field().unwrap();

    // Every settled gate vertex was admitted by the restriction.
    let admitted = pf.gate_cells_on_node_field();
    for (v, _) in pf.gate_flow_field().iter() {
        assert!(admitted.contains(&v), "vertex {v:?} escaped the restriction");
    }

    // The restricted run still covers every reachable query cell, at
    // equal or higher cost.
    let restricted_final = pf.final_flow_field();
    assert_eq!(restricted_final.len(), base_final.len());
    for (v, entry) in base_final.iter() {
        let restricted = restricted_final
            .cost(v)
            .expect("restricted field lost a reachable cell");
        assert!(restricted >= entry.cost);
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Field invariants
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn test_gate_field_telescoping() {
    let map = wall_map();
    let mut pf = FlowFieldPathfinder::new();
    pf.reset(&map, 0, 0, Rect::new(0, 0, 9, 9)).unwrap();
    pf.compute_gate_flow_field(false).unwrap();

    let t = pf.target_cell().unwrap();
    for (v, entry) in pf.gate_flow_field().iter() {
        if v == t {
            assert_eq!(entry.cost, 0);
            assert_eq!(entry.next, t);
            continue;
        }
        // Every gate-graph and overlay edge is weighted by octile map
        // distance, so the successor relation telescopes exactly.
        let w = map.distance_between(v, entry.next);
        assert_eq!(
            entry.cost,
            pf.gate_flow_field().cost(entry.next).unwrap() + w,
            "telescoping broken at {v:?}"
        );
    }
}

#[test]
fn test_node_field_covers_query_leaves() {
    let map = wall_map();
    let qrange = Rect::new(0, 0, 9, 9);
    let mut pf = FlowFieldPathfinder::new();
    pf.reset(&map, 0, 0, qrange).unwrap();
    pf.compute_node_flow_field().unwrap();

    let mut missing = Vec::new();
    map.nodes_in_range(&qrange, &mut |node| {
        if map.node_is_empty(node) && !pf.node_flow_field().contains(node) {
            missing.push(node);
        }
    });
    assert!(missing.is_empty(), "leaves missing from node field: {missing:?}");

    // Leaf-graph edges are weighted by center distance, so the node
    // field telescopes the same way the cell fields do.
    let t_node = map.find_node(0, 0).unwrap();
    for (node, entry) in pf.node_flow_field().iter() {
        if node == t_node {
            assert_eq!(entry.cost, 0);
            assert_eq!(entry.next, t_node);
            continue;
        }
        let (cx, cy) = map.node_rect(node).center();
        let (nx, ny) = map.node_rect(entry.next).center();
        assert_eq!(
            entry.cost,
            pf.node_flow_field().cost(entry.next).unwrap() + map.distance(cx, cy, nx, ny)
        );
    }
}

#[test]
fn test_overlay_purity() {
    let map = wall_map();
    let qrange = Rect::new(0, 0, 6, 6);
    let mut pf = FlowFieldPathfinder::new();
    pf.reset(&map, 1, 1, qrange).unwrap();

    let t = pf.target_cell().unwrap();
    let t_node = map.find_node(1, 1).unwrap();
    let t_rect = map.node_rect(t_node);
    for cell in pf.overlay().cells() {
        let (x, y) = map.unpack_xy(cell);
        let in_overlap = t_rect.contains(x, y) && qrange.contains(x, y);
        let is_gate_of_t_node = map.is_gate_cell(t_node, cell);
        assert!(
            cell == t || in_overlap || is_gate_of_t_node,
            "overlay touches unrelated cell ({x},{y})"
        );
    }
}

#[test]
fn test_recompute_is_identical() {
    let map = wall_map();
    let mut pf = FlowFieldPathfinder::new();
    pf.reset(&map, 0, 0, Rect::new(0, 0, 9, 9)).unwrap();

    pf.compute_node_flow_field().unwrap();
    let node_first = pf.node_flow_field().clone();
    pf.compute_gate_flow_field(true).unwrap();
    let gate_first = pf.gate_flow_field().clone();
    pf.compute_final_flow_field().unwrap();
    let final_first = pf.final_flow_field().clone();

    pf.compute_node_flow_field().unwrap();
    pf.compute_gate_flow_field(true).unwrap();
    pf.compute_final_flow_field().unwrap();

    assert_eq!(*pf.node_flow_field(), node_first);
    assert_eq!(*pf.gate_flow_field(), gate_first);
    assert_eq!(*pf.final_flow_field(), final_first);
}

#[test]
fn test_visitors_report_every_entry() {
    let map = open_map(8, 8);
    let mut pf = FlowFieldPathfinder::new();
    pf.reset(&map, 4, 4, Rect::new(2, 2, 6, 6)).unwrap();
    pf.compute_node_flow_field().unwrap();
    pf.compute_gate_flow_field(false).unwrap();
    pf.compute_final_flow_field().unwrap();

    let mut cells = 0;
    pf.visit_cell_flow_field(pf.final_flow_field(), |x, y, nx, ny, cost| {
        assert!((nx - x).abs() <= 1 && (ny - y).abs() <= 1);
        assert!(cost >= 0);
        cells += 1;
    });
    assert_eq!(cells, pf.final_flow_field().len());

    let mut nodes = 0;
    pf.visit_node_flow_field(|_, _, cost| {
        assert!(cost >= 0);
        nodes += 1;
    });
    assert_eq!(nodes, pf.node_flow_field().len());
}

// ─────────────────────────────────────────────────────────────────────────
// Randomized comparison against the reference grid search
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn test_open_random_targets_match_octile() {
    let mut rng = StdRng::seed_from_u64(7);
    let map = open_map(16, 16);
    let mut pf = FlowFieldPathfinder::new();

    for _ in 0..10 {
        let (tx, ty) = (rng.random_range(0..16), rng.random_range(0..16));
        pf.reset(&map, tx, ty, Rect::new(0, 0, 15, 15)).unwrap();
        pf.compute_gate_flow_field(false).unwrap();
        pf.compute_final_flow_field().unwrap();

        let field = pf.final_flow_field();
        assert_eq!(field.len(), 256);
        for (v, entry) in field.iter() {
            let (x, y) = map.unpack_xy(v);
            assert_eq!(entry.cost, octile(x - tx, y - ty));
        }
    }
}

#[test]
fn test_random_maps_bounded_by_reference() {
    let mut rng = StdRng::seed_from_u64(42);

    for round in 0..20 {
        let (w, h) = (12, 12);
        let mut blocked = vec![false; (w * h) as usize];
        for cell in blocked.iter_mut() {
            *cell = rng.random_range(0..100) < 20;
        }
        // Pick a free target.
        let (tx, ty) = loop {
            let (x, y) = (rng.random_range(0..w), rng.random_range(0..h));
            if !blocked[(y * w + x) as usize] {
                break (x, y);
            }
        };

        let map = QuadtreeMap::build(QuadtreeMapConfig::new(w, h), |x, y| {
            blocked[(y * w + x) as usize]
        });
        // Lower bound on any realizable cost, and the coverage floor.
        let loose = reference_costs(&map, tx, ty, true);
        let strict = reference_costs(&map, tx, ty, false);

        let mut pf = FlowFieldPathfinder::new();
        pf.reset(&map, tx, ty, Rect::new(0, 0, w - 1, h - 1)).unwrap();
        pf.compute_node_flow_field().unwrap();
        pf.compute_gate_flow_field(false).unwrap();
        pf.compute_final_flow_field().unwrap();

        let field = pf.final_flow_field();

        // Every cell reachable without corner-cutting must be covered:
        // those are exactly the cells the gate graph can route to.
        for (&(x, y), _) in strict.iter() {
            assert!(
                field.contains(map.pack_xy(x, y)),
                "round {round}: ({x},{y}) missing from the field"
            );
        }

        for (v, entry) in field.iter() {
            let (x, y) = map.unpack_xy(v);
            // Field entries always correspond to realizable paths, so
            // the permissive grid optimum bounds them from below.
            let floor = loose
                .get(&(x, y))
                .unwrap_or_else(|| panic!("round {round}: ({x},{y}) unreachable on the grid"));
            assert!(
                entry.cost >= *floor,
                "round {round}: ({x},{y}) cost {} beats the grid optimum {}",
                entry.cost,
                floor
            );
            follow_chain(&map, field, x, y);
        }
    }
}
