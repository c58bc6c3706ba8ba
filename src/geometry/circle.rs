use crate::traits::Geometry;
use crate::FloatNum;

/// Disc-shaped obstacle centred on a cell.
pub struct Circle {
    row_c: FloatNum,
    col_c: FloatNum,
    r: FloatNum,
}

impl Circle {
    pub fn new(row_c: FloatNum, col_c: FloatNum, r: FloatNum) -> Self {
        Self { row_c, col_c, r }
    }

    /// The classic channel cylinder: left of centre, radius an eighth of the height.
    pub fn channel(height: usize, width: usize) -> Self {
        let ly = height as FloatNum;
        let lx = width as FloatNum;
        Self {
            row_c: ly / 2.,
            col_c: lx / 2. - 0.2 * lx,
            r: 0.125 * ly,
        }
    }
}

impl Geometry for Circle {
    #[inline(always)]
    fn contains(&self, row: usize, col: usize) -> bool {
        let dy = row as FloatNum - self.row_c;
        let dx = col as FloatNum - self.col_c;
        dx * dx + dy * dy <= self.r * self.r
    }
}
