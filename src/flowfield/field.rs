//! Flow-field storage: vertex -> (cost, next hop toward the target).

use std::collections::HashMap;
use std::hash::Hash;

use crate::core::{CellId, Cost, NodeId};

/// One visited vertex of a flow field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldEntry<V> {
    /// Total cost from this vertex to the target.
    pub cost: Cost,
    /// Successor vertex on the shortest path toward the target. The
    /// target itself points to itself.
    pub next: V,
}

/// Mapping from visited vertices to their cost and successor.
///
/// Generic over the vertex type so the same container backs the leaf
/// field (`V = NodeId`) and the cell fields (`V = CellId`).
#[derive(Clone, Debug)]
pub struct FlowField<V> {
    entries: HashMap<V, FieldEntry<V>>,
}

impl<V> Default for FlowField<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V: Eq + Hash> PartialEq for FlowField<V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

/// Flow field over leaves of the map decomposition.
pub type NodeFlowField = FlowField<NodeId>;

/// Flow field over packed cells (gate cells or final query cells).
pub type CellFlowField = FlowField<CellId>;

impl<V: Copy + Eq + Hash> FlowField<V> {
    /// Create an empty field.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Remove all entries, keeping the allocation.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of visited vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the field holds no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `vertex` was visited.
    #[inline]
    pub fn contains(&self, vertex: V) -> bool {
        self.entries.contains_key(&vertex)
    }

    /// Entry for `vertex`, if visited.
    #[inline]
    pub fn get(&self, vertex: V) -> Option<FieldEntry<V>> {
        self.entries.get(&vertex).copied()
    }

    /// Cost for `vertex`, if visited.
    #[inline]
    pub fn cost(&self, vertex: V) -> Option<Cost> {
        self.get(vertex).map(|e| e.cost)
    }

    /// Successor for `vertex`, if visited.
    #[inline]
    pub fn next(&self, vertex: V) -> Option<V> {
        self.get(vertex).map(|e| e.next)
    }

    /// Insert or overwrite an entry.
    #[inline]
    pub fn set(&mut self, vertex: V, cost: Cost, next: V) {
        self.entries.insert(vertex, FieldEntry { cost, next });
    }

    /// Iterate all entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (V, FieldEntry<V>)> + '_ {
        self.entries.iter().map(|(&v, &e)| (v, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get() {
        let mut field: FlowField<u32> = FlowField::new();
        assert!(field.is_empty());

        field.set(7, 20, 3);
        field.set(3, 0, 3);
        assert_eq!(field.len(), 2);
        assert_eq!(field.get(7), Some(FieldEntry { cost: 20, next: 3 }));
        assert_eq!(field.cost(3), Some(0));
        assert_eq!(field.next(3), Some(3));
        assert_eq!(field.get(4), None);
    }

    #[test]
    fn test_overwrite() {
        let mut field: FlowField<u32> = FlowField::new();
        field.set(7, 20, 3);
        field.set(7, 15, 5);
        assert_eq!(field.len(), 1);
        assert_eq!(field.get(7), Some(FieldEntry { cost: 15, next: 5 }));
    }

    #[test]
    fn test_clear() {
        let mut field: FlowField<u32> = FlowField::new();
        field.set(1, 10, 2);
        field.clear();
        assert!(field.is_empty());
        assert!(!field.contains(1));
    }
}
