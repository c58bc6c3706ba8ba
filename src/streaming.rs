use ndarray::Array3;

use crate::distribution::D2Q9;
use crate::grid::{Grid, ObstacleMask};
use crate::FloatNum;

/// Propagates post-collision populations one lattice step.
///
/// Population `k` of cell `(i, j)` moves to `(i + cy, j + cx)`. When that
/// cell is outside the grid or solid, it is bounced back into the origin's
/// `opposite[k]` slot instead. Obstacle cells emit nothing and end up empty.
///
/// `f_next` is overwritten completely; it must not alias `f_out`.
pub fn stream_2d(
    lattice: &D2Q9,
    grid: Grid,
    mask: &ObstacleMask,
    f_out: &Array3<FloatNum>,
    f_next: &mut Array3<FloatNum>,
) {
    f_next.fill(0.0);
    for (i, j) in grid.cells() {
        if mask.is_obstacle(i, j) {
            continue;
        }
        for k in 0..lattice.size() {
            let f = f_out[[i, j, k]];
            match grid.neighbor(i, j, lattice.velocities[k]) {
                Some((ni, nj)) if !mask.is_obstacle(ni, nj) => f_next[[ni, nj, k]] += f,
                _ => f_next[[i, j, lattice.opposite[k]]] += f,
            }
        }
    }
}
