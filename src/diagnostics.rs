//! Per-tick health checks.
//!
//! Nothing here stops a tick. Problems are collected into a [`TickReport`],
//! logged, and handed to the solver's hook.

use std::fmt;

use log::{debug, warn};
use ndarray::{Array2, Array3};
use serde::Serialize;

use crate::distribution::Direction;
use crate::grid::ObstacleMask;
use crate::FloatNum;

/// Upper bound on the number of offending cells listed per tick.
pub const MAX_REPORTED: usize = 16;

/// Which macroscopic field held a non-finite value.
#[derive(Serialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Field {
    Population,
    Density,
    VelocityX,
    VelocityY,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Instability {
    /// A population went below zero; usually `tau` too close to 0.5.
    NegativePopulation {
        row: usize,
        col: usize,
        direction: Direction,
        value: FloatNum,
    },
    NonFinite { row: usize, col: usize, field: Field },
    /// Total fluid mass moved by more than the tolerance in a regime that
    /// should conserve it.
    MassDrift {
        before: FloatNum,
        after: FloatNum,
        relative: FloatNum,
    },
    /// More offending cells than [`MAX_REPORTED`]; only a count is kept.
    Truncated { omitted: usize },
}

impl fmt::Display for Instability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instability::NegativePopulation {
                row,
                col,
                direction,
                value,
            } => write!(f, "negative population {:?}={:e} at ({}, {})", direction, value, row, col),
            Instability::NonFinite { row, col, field } => {
                write!(f, "non-finite {:?} at ({}, {})", field, row, col)
            }
            Instability::MassDrift {
                before,
                after,
                relative,
            } => write!(f, "mass drift {:.6} -> {:.6} (relative {:e})", before, after, relative),
            Instability::Truncated { omitted } => write!(f, "{} further cells omitted", omitted),
        }
    }
}

/// Outcome of one tick.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TickReport {
    /// Iteration count after the tick.
    pub iteration: u64,
    pub mass_before: FloatNum,
    pub mass_after: FloatNum,
    /// Mass left of the wall column (or of `width / 4` when there is no wall).
    pub left_mass: FloatNum,
    pub right_mass: FloatNum,
    pub instabilities: Vec<Instability>,
}

impl TickReport {
    pub fn is_stable(&self) -> bool {
        self.instabilities.is_empty()
    }

    pub fn mass_drift(&self) -> FloatNum {
        relative_change(self.mass_before, self.mass_after)
    }

    /// Emits the report through `log`: the split at debug, every instability
    /// at warn.
    pub fn log(&self) {
        debug!(
            "tick {}: mass {:.6} (left {:.6}, right {:.6})",
            self.iteration, self.mass_after, self.left_mass, self.right_mass
        );
        for instability in &self.instabilities {
            warn!("tick {}: {}", self.iteration, instability);
        }
    }
}

/// Sum of all populations over fluid cells.
pub fn total_mass(f: &Array3<FloatNum>, mask: &ObstacleMask) -> FloatNum {
    split_mass(f, mask, usize::MAX).0
}

/// Fluid mass on columns `< column` and on the rest.
pub fn split_mass(f: &Array3<FloatNum>, mask: &ObstacleMask, column: usize) -> (FloatNum, FloatNum) {
    let mut left = 0.0;
    let mut right = 0.0;
    for ((i, j, _), v) in f.indexed_iter() {
        if mask.is_obstacle(i, j) {
            continue;
        }
        if j < column {
            left += *v;
        } else {
            right += *v;
        }
    }
    (left, right)
}

pub fn relative_change(before: FloatNum, after: FloatNum) -> FloatNum {
    let scale = before.abs().max(FloatNum::MIN_POSITIVE);
    (after - before).abs() / scale
}

/// Checks the mass balance of a tick; returns a drift entry when the
/// relative change exceeds `tolerance`.
pub fn check_mass(before: FloatNum, after: FloatNum, tolerance: FloatNum) -> Option<Instability> {
    let relative = relative_change(before, after);
    if relative > tolerance || !relative.is_finite() {
        Some(Instability::MassDrift {
            before,
            after,
            relative,
        })
    } else {
        None
    }
}

/// Collects bounded per-cell findings.
struct Collector<'a> {
    out: &'a mut Vec<Instability>,
    found: usize,
}

impl<'a> Collector<'a> {
    fn push(&mut self, instability: Instability) {
        if self.found < MAX_REPORTED {
            self.out.push(instability);
        }
        self.found += 1;
    }

    fn finish(self) {
        if self.found > MAX_REPORTED {
            self.out.push(Instability::Truncated {
                omitted: self.found - MAX_REPORTED,
            });
        }
    }
}

/// Appends negative and non-finite populations and non-finite macroscopic
/// values found on fluid cells.
pub fn scan_fields(
    f: &Array3<FloatNum>,
    rho: &Array2<FloatNum>,
    ux: &Array2<FloatNum>,
    uy: &Array2<FloatNum>,
    mask: &ObstacleMask,
    out: &mut Vec<Instability>,
) {
    let mut collector = Collector { out, found: 0 };
    for ((row, col, k), &value) in f.indexed_iter() {
        if mask.is_obstacle(row, col) {
            continue;
        }
        if !value.is_finite() {
            collector.push(Instability::NonFinite {
                row,
                col,
                field: Field::Population,
            });
        } else if value < 0.0 {
            if let Some(direction) = Direction::from_index(k) {
                collector.push(Instability::NegativePopulation {
                    row,
                    col,
                    direction,
                    value,
                });
            }
        }
    }
    for (field, values) in [(Field::Density, rho), (Field::VelocityX, ux), (Field::VelocityY, uy)] {
        for ((row, col), value) in values.indexed_iter() {
            if !value.is_finite() && !mask.is_obstacle(row, col) {
                collector.push(Instability::NonFinite { row, col, field });
            }
        }
    }
    collector.finish();
}
