//! Two-dimensional Lattice Boltzmann (D2Q9) fluid solver.
//!
//! A [`Solver`] owns the population fields of a rectangular grid and
//! advances them one tick at a time: macroscopic update, BGK collision,
//! mask-aware streaming with bounce-back, then the selected
//! [`BoundaryRegime`]. Passive tracer particles can be advected through the
//! resulting velocity field.
//!
//! ```no_run
//! use lbm2d::{BoundaryRegime, Solver};
//!
//! let mut solver = Solver::new(60, 80, 1.0, BoundaryRegime::Custom)?;
//! for _ in 0..100 {
//!     let report = solver.step()?;
//!     if !report.is_stable() {
//!         eprintln!("{:?}", report.instabilities);
//!     }
//! }
//! # Ok::<(), lbm2d::LbmError>(())
//! ```

pub mod boundary;
pub mod config;
pub mod diagnostics;
pub mod distribution;
pub mod error;
pub mod ffi;
pub mod geometry;
pub mod grid;
pub mod particle;
pub mod physics;
pub mod solver;
pub mod state;
pub mod streaming;
pub mod traits;

pub type FloatNum = f64;

pub use boundary::{BoundaryProfile, BoundaryRegime};
pub use config::{InitialCondition, ParticleConfig, SimConfig, WallPlacement};
pub use diagnostics::{Instability, TickReport};
pub use distribution::{Direction, D2Q9};
pub use error::{LbmError, Result};
pub use grid::{Grid, Hole, ObstacleMask};
pub use particle::{Particle, Particles};
pub use physics::SingleRelaxationTime;
pub use solver::{Phase, RunSummary, Solver};
pub use state::Snapshot;
pub use traits::{Collision, DiagnosticsHook, Geometry};
