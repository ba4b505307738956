//! Generic single-target flood solver.
//!
//! Dijkstra from a target vertex over an arbitrary non-negative weighted
//! graph, recording for every settled vertex its cost to the target and
//! the neighbour through which the shortest path leaves it. The caller
//! supplies neighbour iteration, an optional-in-spirit vertex filter,
//! and an early-stop predicate checked after each vertex settles.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::hash::Hash;

use super::field::FlowField;
use crate::core::{Cost, UNREACHABLE};

/// Priority-queue entry; ordered by cost only, reversed so the default
/// max-heap pops the cheapest vertex first.
#[derive(Clone, Copy, Debug)]
struct QueueEntry<V> {
    cost: Cost,
    vertex: V,
}

impl<V> PartialEq for QueueEntry<V> {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}

impl<V> Eq for QueueEntry<V> {}

impl<V> Ord for QueueEntry<V> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.cmp(&self.cost)
    }
}

impl<V> PartialOrd for QueueEntry<V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reusable single-target flood solver.
///
/// Holds its scratch (queue, tentative costs, predecessors, closed set)
/// across calls; every [`compute`](FlowFieldSolver::compute) starts by
/// clearing it, so results never leak between runs.
#[derive(Debug, Default)]
pub struct FlowFieldSolver<V> {
    heap: BinaryHeap<QueueEntry<V>>,
    dist: HashMap<V, Cost>,
    came_from: HashMap<V, V>,
    settled: HashSet<V>,
}

impl<V: Copy + Eq + Hash> FlowFieldSolver<V> {
    /// Create a solver with empty scratch.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            dist: HashMap::new(),
            came_from: HashMap::new(),
            settled: HashSet::new(),
        }
    }

    /// Flood from `source`, writing every settled vertex into `field`.
    ///
    /// # Arguments
    /// * `neighbours` - invokes its callback for every outgoing
    ///   neighbour of a vertex with the (non-negative) edge weight
    /// * `filter` - vertices for which this returns false are never
    ///   relaxed; pass `|_| true` for no filtering
    /// * `stop_after` - checked once per settled vertex; returning true
    ///   halts the flood, keeping everything settled so far
    ///
    /// The source is recorded with cost 0 and itself as successor.
    /// Vertices unreachable from the source are absent from the field.
    pub fn compute(
        &mut self,
        source: V,
        field: &mut FlowField<V>,
        mut neighbours: impl FnMut(V, &mut dyn FnMut(V, Cost)),
        mut filter: impl FnMut(V) -> bool,
        mut stop_after: impl FnMut(V) -> bool,
    ) {
        self.heap.clear();
        self.dist.clear();
        self.came_from.clear();
        self.settled.clear();

        self.dist.insert(source, 0);
        self.heap.push(QueueEntry {
            cost: 0,
            vertex: source,
        });

        while let Some(QueueEntry { cost, vertex: u }) = self.heap.pop() {
            // Stale queue entry for an already-settled vertex.
            if !self.settled.insert(u) {
                continue;
            }

            let next = self.came_from.get(&u).copied().unwrap_or(u);
            field.set(u, cost, next);

            if stop_after(u) {
                break;
            }

            let dist = &mut self.dist;
            let came_from = &mut self.came_from;
            let heap = &mut self.heap;
            let settled = &self.settled;
            neighbours(u, &mut |v, w| {
                debug_assert!(w >= 0, "edge weights must be non-negative");
                if settled.contains(&v) || !filter(v) {
                    return;
                }
                let tentative = cost + w;
                if tentative < dist.get(&v).copied().unwrap_or(UNREACHABLE) {
                    dist.insert(v, tentative);
                    came_from.insert(v, u);
                    heap.push(QueueEntry {
                        cost: tentative,
                        vertex: v,
                    });
                }
            });
        }
    }
}
