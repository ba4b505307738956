//! Cell and leaf identifiers used across the map and flow-field layers.

/// Integer path cost. Unit costs are map-defined; the conventional
/// octile pair is 10 (orthogonal) and 14 (diagonal).
pub type Cost = i32;

/// Sentinel for "no path found yet". Kept well below `i32::MAX` so a
/// single edge-weight addition cannot overflow during relaxation.
pub const UNREACHABLE: Cost = i32::MAX / 2;

/// Packed identifier of a single grid cell.
///
/// The packing scheme is owned by the map (`NavMap::pack_xy` /
/// `NavMap::unpack_xy`); everything else treats the value as opaque.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(pub u32);

/// Stable index of a leaf in the map's leaf arena.
///
/// Leaf identity is an arena index rather than a reference so that
/// per-query collections can key on it cheaply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl CellId {
    /// Raw packed value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl NodeId {
    /// Arena index of the leaf.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
