//! Save and resume of a running simulation as JSON.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::info;
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::boundary::BoundaryRegime;
use crate::config::{SimConfig, WallPlacement};
use crate::error::{LbmError, Result};
use crate::geometry::WALL_POSITION;
use crate::grid::{Hole, ObstacleMask};
use crate::particle::{self, Particle, Particles};
use crate::physics::{equilibrium_field, SingleRelaxationTime};
use crate::solver::Solver;
use crate::traits::Collision;
use crate::FloatNum;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WallState {
    pub wall_matrix: Array2<bool>,
    pub hole: Option<Hole>,
}

/// Everything needed to resume a run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub iteration: u64,
    pub height: usize,
    pub width: usize,
    pub tau: FloatNum,
    pub boundary_condition: BoundaryRegime,
    pub rho: Array2<FloatNum>,
    pub ux: Array2<FloatNum>,
    pub uy: Array2<FloatNum>,
    pub f_in: Array3<FloatNum>,
    pub f_out: Array3<FloatNum>,
    pub wall: Option<WallState>,
    pub particles: Vec<Particle>,
}

impl Snapshot {
    fn check(&self) -> Result<()> {
        let cells = (self.height, self.width);
        let populations = (self.height, self.width, 9);
        for (name, dim) in [("rho", self.rho.dim()), ("ux", self.ux.dim()), ("uy", self.uy.dim())] {
            if dim != cells {
                return Err(mismatch(format!("{} has shape {:?}, expected {:?}", name, dim, cells)));
            }
        }
        for (name, dim) in [("f_in", self.f_in.dim()), ("f_out", self.f_out.dim())] {
            if dim != populations {
                return Err(mismatch(format!(
                    "{} has shape {:?}, expected {:?}",
                    name, dim, populations
                )));
            }
        }
        if let Some(wall) = &self.wall {
            if wall.wall_matrix.dim() != cells {
                return Err(mismatch(format!(
                    "wall matrix has shape {:?}, expected {:?}",
                    wall.wall_matrix.dim(),
                    cells
                )));
            }
        }
        for (n, p) in self.particles.iter().enumerate() {
            if particle::check_mass(p.mass).is_err() {
                return Err(mismatch(format!("particle {} has unusable mass {}", n, p.mass)));
            }
        }
        Ok(())
    }
}

const TAU_TOLERANCE: FloatNum = 1e-12;

fn mismatch(message: String) -> LbmError {
    LbmError::SnapshotMismatch(message)
}

impl<C: Collision> Solver<C> {
    pub fn snapshot(&self) -> Snapshot {
        let wall = if self.mask.count() > 0 || self.mask.hole().is_some() {
            Some(WallState {
                wall_matrix: self.mask.as_array().clone(),
                hole: self.mask.hole(),
            })
        } else {
            None
        };
        Snapshot {
            iteration: self.iteration,
            height: self.grid.height,
            width: self.grid.width,
            tau: self.collision.tau(),
            boundary_condition: self.bcs.regime(),
            rho: self.rho.clone(),
            ux: self.ux.clone(),
            uy: self.uy.clone(),
            f_in: self.f_in.clone(),
            f_out: self.f_out.clone(),
            wall,
            particles: self.particles.as_slice().to_vec(),
        }
    }

    /// Replaces the whole simulation state. The snapshot must come from a
    /// solver with the same grid, relaxation time and boundary regime.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<()> {
        snapshot.check()?;
        if (snapshot.height, snapshot.width) != self.grid.dim() {
            return Err(mismatch(format!(
                "snapshot grid {}x{} differs from solver grid {}x{}",
                snapshot.height, snapshot.width, self.grid.height, self.grid.width
            )));
        }
        if (snapshot.tau - self.collision.tau()).abs() > TAU_TOLERANCE {
            return Err(mismatch(format!(
                "snapshot tau {} differs from solver tau {}",
                snapshot.tau,
                self.collision.tau()
            )));
        }
        if snapshot.boundary_condition != self.bcs.regime() {
            return Err(mismatch(format!(
                "snapshot regime {} differs from solver regime {}",
                snapshot.boundary_condition,
                self.bcs.regime()
            )));
        }

        self.mask = match snapshot.wall {
            Some(wall) => ObstacleMask::from_array(wall.wall_matrix, wall.hole),
            None => ObstacleMask::empty(self.grid),
        };
        self.split_column = self
            .mask
            .hole()
            .map(|h| h.column)
            .unwrap_or(self.grid.width / WALL_POSITION);
        self.rho = snapshot.rho;
        self.ux = snapshot.ux;
        self.uy = snapshot.uy;
        self.f_in = snapshot.f_in;
        self.f_out = snapshot.f_out;
        equilibrium_field(&self.lattice, &self.rho, &self.ux, &self.uy, &mut self.f_eq);
        self.particles = Particles::from_list(snapshot.particles, self.particles.max_history())?;
        self.iteration = snapshot.iteration;
        Ok(())
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer(writer, &self.snapshot())?;
        info!("Simulation state saved to {}", path.as_ref().display());
        Ok(())
    }
}

pub fn read_snapshot<P: AsRef<Path>>(path: P) -> Result<Snapshot> {
    let reader = BufReader::new(File::open(path)?);
    let snapshot: Snapshot = serde_json::from_reader(reader)?;
    snapshot.check()?;
    Ok(snapshot)
}

impl Solver<SingleRelaxationTime> {
    /// Builds a solver around a saved state. Grid, `tau` and regime come from
    /// the file; everything else from `config`.
    pub fn load_json<P: AsRef<Path>>(path: P, config: &SimConfig) -> Result<Self> {
        let snapshot = read_snapshot(path.as_ref())?;
        let mut config = config.clone();
        config.height = snapshot.height;
        config.width = snapshot.width;
        config.tau = snapshot.tau;
        config.regime = snapshot.boundary_condition;
        config.wall = WallPlacement::Absent;
        config.particles = None;

        let mut solver = Solver::from_config(&config)?;
        solver.restore(snapshot)?;
        info!(
            "Simulation state loaded from {}, iteration {}",
            path.as_ref().display(),
            solver.iteration()
        );
        Ok(solver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParticleConfig;

    fn running_solver() -> Solver {
        let config = SimConfig::new(24, 30, 0.8, BoundaryRegime::Custom).with_particles(ParticleConfig {
            spots: 2,
            ..ParticleConfig::default()
        });
        let mut solver = Solver::from_config(&config).unwrap();
        for _ in 0..3 {
            solver.step().unwrap();
            solver.advect_particles(50.0);
        }
        solver
    }

    #[test]
    fn snapshot_restores_into_fresh_solver() {
        let solver = running_solver();
        let snapshot = solver.snapshot();
        assert_eq!(snapshot.iteration, 3);
        assert!(snapshot.wall.is_some());

        let config = SimConfig::new(24, 30, 0.8, BoundaryRegime::Custom).without_wall();
        let mut fresh = Solver::from_config(&config).unwrap();
        fresh.restore(snapshot).unwrap();
        assert_eq!(fresh.iteration(), 3);
        assert_eq!(fresh.f_in(), solver.f_in());
        assert_eq!(fresh.density(), solver.density());
        assert_eq!(fresh.mask(), solver.mask());
        assert_eq!(fresh.particles(), solver.particles());
    }

    #[test]
    fn restore_rejects_other_grid_tau_or_regime() {
        let snapshot = running_solver().snapshot();
        let mut other = Solver::new(20, 30, 0.8, BoundaryRegime::Custom).unwrap();
        assert!(matches!(
            other.restore(snapshot.clone()),
            Err(LbmError::SnapshotMismatch(_))
        ));
        let mut other = Solver::new(24, 30, 0.8, BoundaryRegime::BounceBack).unwrap();
        assert!(matches!(
            other.restore(snapshot.clone()),
            Err(LbmError::SnapshotMismatch(_))
        ));
        let mut other = Solver::new(24, 30, 1.2, BoundaryRegime::Custom).unwrap();
        assert!(matches!(other.restore(snapshot), Err(LbmError::SnapshotMismatch(_))));
        assert_eq!(other.iteration(), 0);
    }

    #[test]
    fn particles_without_positive_mass_are_rejected() {
        let mut snapshot = running_solver().snapshot();
        snapshot.particles[0].mass = -3.0;
        let mut solver = Solver::new(24, 30, 0.8, BoundaryRegime::Custom).unwrap();
        assert!(matches!(
            solver.restore(snapshot.clone()),
            Err(LbmError::SnapshotMismatch(_))
        ));
        assert!(solver.particles().is_empty());

        snapshot.particles[0].mass = 0.0;
        assert!(solver.restore(snapshot).is_err());
    }

    #[test]
    fn truncated_arrays_are_rejected() {
        let mut snapshot = running_solver().snapshot();
        snapshot.ux = Array2::zeros((3, 3));
        let mut solver = Solver::new(24, 30, 0.8, BoundaryRegime::Custom).unwrap();
        assert!(solver.restore(snapshot).unwrap_err().is_configuration());
    }

    #[test]
    fn json_file_round_trip_resumes_run() {
        let path = std::env::temp_dir().join(format!("lbm2d-state-{}.json", std::process::id()));
        let mut solver = running_solver();
        solver.save_json(&path).unwrap();

        let mut loaded = Solver::load_json(&path, &SimConfig::default()).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.regime(), BoundaryRegime::Custom);
        assert_eq!(loaded.iteration(), 3);
        assert_eq!(loaded.particles().len(), 4);

        solver.step().unwrap();
        loaded.step().unwrap();
        let close = loaded
            .density()
            .iter()
            .zip(solver.density().iter())
            .all(|(a, b)| (a - b).abs() < 1e-12);
        assert!(close);
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = std::env::temp_dir().join("lbm2d-state-does-not-exist.json");
        assert!(matches!(read_snapshot(path), Err(LbmError::Io(_))));
    }
}
