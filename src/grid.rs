use ndarray::Array2;

use crate::error::{LbmError, Result};
use crate::traits::Geometry;

/// Rectangular 2-D grid of `height` rows by `width` columns.
#[derive(Eq, Ord, PartialEq, PartialOrd, Copy, Clone, Debug)]
pub struct Grid {
    pub height: usize,
    pub width: usize,
}

impl Grid {
    pub fn new(height: usize, width: usize) -> Result<Self> {
        if height == 0 || width == 0 {
            return Err(LbmError::InvalidGrid { height, width });
        }
        Ok(Grid { height, width })
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.height * self.width
    }

    #[inline(always)]
    pub fn dim(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    #[inline(always)]
    pub fn contains(&self, row: isize, col: isize) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.height && (col as usize) < self.width
    }

    /// Cell reached from (`row`, `col`) by one step along `c = [cx, cy]`.
    #[inline(always)]
    pub fn neighbor(&self, row: usize, col: usize, c: [i32; 2]) -> Option<(usize, usize)> {
        let r = row as isize + c[1] as isize;
        let q = col as isize + c[0] as isize;
        if self.contains(r, q) {
            Some((r as usize, q as usize))
        } else {
            None
        }
    }

    /// Row-major iterator over all cells.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> {
        let width = self.width;
        (0..self.size()).map(move |n| (n / width, n % width))
    }
}

/// Inclusive row range of the gap left open in a vertical wall.
#[derive(Eq, PartialEq, Copy, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Hole {
    pub column: usize,
    pub start: usize,
    pub end: usize,
}

/// Boolean grid marking solid cells, `true` where transport is blocked.
#[derive(PartialEq, Clone, Debug)]
pub struct ObstacleMask {
    mask: Array2<bool>,
    hole: Option<Hole>,
}

impl ObstacleMask {
    /// An all-fluid mask.
    pub fn empty(grid: Grid) -> Self {
        ObstacleMask {
            mask: Array2::from_elem(grid.dim(), false),
            hole: None,
        }
    }

    pub fn from_array(mask: Array2<bool>, hole: Option<Hole>) -> Self {
        ObstacleMask { mask, hole }
    }

    /// Out-of-grid coordinates are never obstacles.
    #[inline(always)]
    pub fn is_obstacle(&self, row: usize, col: usize) -> bool {
        self.mask.get((row, col)).copied().unwrap_or(false)
    }

    /// Marks or clears a single cell; out-of-grid coordinates are ignored.
    pub fn set(&mut self, row: usize, col: usize, solid: bool) {
        if let Some(cell) = self.mask.get_mut((row, col)) {
            *cell = solid;
        }
    }

    /// Marks every cell covered by `geometry` as solid.
    pub fn paint(&mut self, geometry: &dyn Geometry) {
        for ((row, col), cell) in self.mask.indexed_iter_mut() {
            if geometry.contains(row, col) {
                *cell = true;
            }
        }
    }

    pub fn set_hole(&mut self, hole: Option<Hole>) {
        self.hole = hole;
    }

    pub fn hole(&self) -> Option<Hole> {
        self.hole
    }

    pub fn count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    pub fn as_array(&self) -> &Array2<bool> {
        &self.mask
    }

    pub fn dim(&self) -> (usize, usize) {
        self.mask.dim()
    }
}
