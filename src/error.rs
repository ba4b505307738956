//! Error types for flow-field queries.

use thiserror::Error;

/// Recoverable query failures surfaced by the pathfinder entry points.
///
/// All three degrade to "no field produced"; the per-query state is left
/// cleared and the next `reset` starts fresh.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryError {
    /// The target cell is outside the map, or no query has been bound yet.
    #[error("target cell is outside the map bounds")]
    UnresolvedTarget,

    /// The target cell lies on an obstacle.
    #[error("target cell lies on an obstacle")]
    TargetOnObstacle,

    /// The query rectangle has `x1 > x2` or `y1 > y2`.
    #[error("query rectangle is ill-formed")]
    InvalidRange,
}

/// Crate result alias.
pub type Result<T> = std::result::Result<T, QueryError>;
