use ndarray::Array3;

use crate::diagnostics::TickReport;
use crate::FloatNum;

/// Relaxation of the populations toward their local equilibrium.
pub trait Collision: Copy + Sync + Send {
    /// Writes post-collision populations into `f_out`. `f_in` is left untouched.
    fn collision(
        &self,
        f_in: &Array3<FloatNum>,
        f_eq: &Array3<FloatNum>,
        f_out: &mut Array3<FloatNum>,
    );

    fn tau(&self) -> FloatNum;
}

/// A solid shape that can be painted into an obstacle mask.
pub trait Geometry {
    /// Does the cell at (`row`, `col`) belong to the shape?
    fn contains(&self, row: usize, col: usize) -> bool;
}

/// Observer invoked after every completed tick.
pub trait DiagnosticsHook: Send {
    fn on_tick(&mut self, report: &TickReport);
}

impl<F> DiagnosticsHook for F
where
    F: FnMut(&TickReport) + Send,
{
    fn on_tick(&mut self, report: &TickReport) {
        self(report)
    }
}
