//! Dense relaxation scratch for the final flow-field stage.
//!
//! Costs seeded on gate cells are spread to every cell of the query
//! range with two chamfer-style sweeps per leaf:
//!
//! 1. forward (top-left to bottom-right), relaxing from the four
//!    already-visited predecessor directions;
//! 2. backward (bottom-right to top-left), relaxing from the other
//!    four.
//!
//! Because every relaxed leaf is obstacle-free, the shortest in-leaf
//! path from any cell to the best seeded border cell is a straight
//! octile line, and the two sweeps recover it exactly. Continuity
//! between leaves comes from the seeds on shared borders, not from the
//! sweeps themselves.

use crate::core::{Cost, Rect, UNREACHABLE};

/// Dense `f`/`from`/`sealed` arrays over the working domain, offset so
/// index 0 maps to the domain's low corner.
pub(crate) struct DenseRelaxer {
    domain: Rect,
    stride: i32,
    /// Cost to target per cell; `UNREACHABLE` until relaxed or seeded.
    f: Vec<Cost>,
    /// Neighbour cell the cost came from.
    from: Vec<Option<(i32, i32)>>,
    /// Seeded from the gate field; sweeps must not overwrite these.
    sealed: Vec<bool>,
}

impl DenseRelaxer {
    pub fn new(domain: Rect) -> Self {
        debug_assert!(domain.is_valid());
        let size = domain.area() as usize;
        Self {
            domain,
            stride: domain.width(),
            f: vec![UNREACHABLE; size],
            from: vec![None; size],
            sealed: vec![false; size],
        }
    }

    #[inline]
    pub fn domain(&self) -> &Rect {
        &self.domain
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> usize {
        ((y - self.domain.y1) * self.stride + (x - self.domain.x1)) as usize
    }

    /// Cost at `(x, y)`, or `UNREACHABLE` outside the domain.
    #[inline]
    pub fn cost(&self, x: i32, y: i32) -> Cost {
        if !self.domain.contains(x, y) {
            return UNREACHABLE;
        }
        self.f[self.index(x, y)]
    }

    /// Source cell the cost at `(x, y)` came from, if any.
    #[inline]
    pub fn from(&self, x: i32, y: i32) -> Option<(i32, i32)> {
        if !self.domain.contains(x, y) {
            return None;
        }
        self.from[self.index(x, y)]
    }

    /// Seed a gate-field cell. Sealed cells keep their cost through the
    /// sweeps. `from` stays unset unless a step is provided.
    pub fn seed(&mut self, x: i32, y: i32, cost: Cost, step: Option<(i32, i32)>) {
        if !self.domain.contains(x, y) {
            return;
        }
        let idx = self.index(x, y);
        self.f[idx] = cost;
        self.sealed[idx] = true;
        if step.is_some() {
            self.from[idx] = step;
        }
    }

    /// Forward sweep over one leaf rectangle.
    ///
    /// Predecessor offsets `(-1,-1)`, `(-1,0)`, `(0,-1)`, `(-1,+1)` in
    /// the outer-axis direction; all were finalized earlier in this
    /// sweep (or are seeds), which is what makes the pass exact.
    pub fn sweep_forward(&mut self, rect: &Rect, c1: Cost, c2: Cost) {
        for x in rect.x1..=rect.x2 {
            for y in rect.y1..=rect.y2 {
                if self.sealed[self.index(x, y)] {
                    continue;
                }
                self.relax(x, y, &[(-1, -1, c2), (-1, 0, c1), (0, -1, c1), (-1, 1, c2)]);
            }
        }
    }

    /// Backward sweep over one leaf rectangle, covering the predecessor
    /// directions the forward sweep cannot.
    pub fn sweep_backward(&mut self, rect: &Rect, c1: Cost, c2: Cost) {
        for x in (rect.x1..=rect.x2).rev() {
            for y in (rect.y1..=rect.y2).rev() {
                if self.sealed[self.index(x, y)] {
                    continue;
                }
                self.relax(x, y, &[(1, 1, c2), (1, 0, c1), (0, 1, c1), (1, -1, c2)]);
            }
        }
    }

    #[inline]
    fn relax(&mut self, x: i32, y: i32, offsets: &[(i32, i32, Cost)]) {
        let idx = self.index(x, y);
        let mut best_from = None;
        for &(dx, dy, w) in offsets {
            let (px, py) = (x + dx, y + dy);
            if !self.domain.contains(px, py) {
                continue;
            }
            let candidate = self.f[self.index(px, py)] + w;
            if self.f[idx] > candidate {
                self.f[idx] = candidate;
                best_from = Some((px, py));
            }
        }
        if best_from.is_some() {
            self.from[idx] = best_from;
        }
    }
}

/// Grid-adjacent step from `(x, y)` toward `(nx, ny)`.
///
/// When the next cell is already in the 8-neighbourhood it is used
/// directly; otherwise the move is the signum projection of the
/// direction, which for the octile metric always steps onto the
/// straight line toward the next cell.
#[inline]
pub(crate) fn adjacent_step(x: i32, y: i32, nx: i32, ny: i32) -> (i32, i32) {
    let (dx, dy) = (nx - x, ny - y);
    if dx.abs() <= 1 && dy.abs() <= 1 {
        (nx, ny)
    } else {
        (x + dx.signum(), y + dy.signum())
    }
}
