use crate::grid::{Grid, Hole};
use crate::traits::Geometry;

/// Fraction of the width at which the default wall stands (`width / 4`).
pub const WALL_POSITION: usize = 4;
/// Half-height of the default gap around the middle row.
pub const HOLE_SIZE: usize = 7;

/// Vertical wall spanning every row of `column` except the inclusive gap
/// `hole_start..=hole_end`.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub struct Wall {
    column: usize,
    hole_start: usize,
    hole_end: usize,
}

impl Wall {
    pub fn new(column: usize, hole_start: usize, hole_end: usize) -> Wall {
        Wall {
            column,
            hole_start,
            hole_end,
        }
    }

    /// Wall at a quarter of the width with a gap of `2 * HOLE_SIZE + 1` rows
    /// centred on the middle row, clipped to the grid.
    pub fn centered(grid: Grid) -> Wall {
        let mid = grid.height / 2;
        Wall {
            column: grid.width / WALL_POSITION,
            hole_start: mid.saturating_sub(HOLE_SIZE),
            hole_end: (mid + HOLE_SIZE).min(grid.height - 1),
        }
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn hole(&self) -> Hole {
        Hole {
            column: self.column,
            start: self.hole_start,
            end: self.hole_end,
        }
    }

    #[inline(always)]
    fn in_hole(&self, row: usize) -> bool {
        row >= self.hole_start && row <= self.hole_end
    }
}

impl Geometry for Wall {
    #[inline(always)]
    fn contains(&self, row: usize, col: usize) -> bool {
        col == self.column && !self.in_hole(row)
    }
}
