//! Simulation parameters.
//!
//! Every field has a default so a JSON file only needs to name what it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::boundary::BoundaryRegime;
use crate::error::{LbmError, Result};
use crate::geometry::Wall;
use crate::grid::Grid;
use crate::FloatNum;

/// Where the vertical wall goes.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum WallPlacement {
    /// No wall: the domain is all fluid.
    Absent,
    /// [`Wall::centered`] for whatever grid the config describes.
    Centered,
    /// Wall at `column`, open on rows `hole_start..=hole_end`.
    At {
        column: usize,
        hole_start: usize,
        hole_end: usize,
    },
}

impl Default for WallPlacement {
    fn default() -> Self {
        WallPlacement::Centered
    }
}

impl WallPlacement {
    pub fn resolve(self, grid: Grid) -> Option<Wall> {
        match self {
            WallPlacement::Absent => None,
            WallPlacement::Centered => Some(Wall::centered(grid)),
            WallPlacement::At {
                column,
                hole_start,
                hole_end,
            } => Some(Wall::new(column, hole_start, hole_end)),
        }
    }
}

/// Macroscopic state the populations are seeded from.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum InitialCondition {
    /// Same density everywhere, fluid at rest.
    Uniform { rho: FloatNum },
    /// `left` density on the columns before the wall, `right` from the wall on.
    Dam { left: FloatNum, right: FloatNum },
}

impl Default for InitialCondition {
    fn default() -> Self {
        InitialCondition::Uniform { rho: 1.0 }
    }
}

/// Spatial distribution of the tracer particles created with the solver.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ParticleConfig {
    /// Number of seeding rows, evenly spaced between `y_min` and `y_max`.
    pub spots: usize,
    pub per_spot: usize,
    pub start_x: FloatNum,
    pub y_min: FloatNum,
    /// Defaults to `height - 2`.
    pub y_max: Option<FloatNum>,
    pub mass_range: (FloatNum, FloatNum),
    pub seed: u64,
    /// Keep at most this many path entries per particle (oldest dropped).
    pub max_history: Option<usize>,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        ParticleConfig {
            spots: 10,
            per_spot: 2,
            start_x: 1.0,
            y_min: 2.0,
            y_max: None,
            mass_range: (1.0, 5.0),
            seed: 0,
            max_history: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub height: usize,
    pub width: usize,
    pub tau: FloatNum,
    pub regime: BoundaryRegime,
    /// Velocity clamp applied after every macroscopic update.
    pub u_max: FloatNum,
    /// Peak speed of the linear edge inflow profile.
    pub inflow_speed: FloatNum,
    /// Density imposed on edges in the `constant` regime.
    pub edge_density: FloatNum,
    /// Target density of the `custom` regime outlet.
    pub outlet_density: FloatNum,
    pub wall: WallPlacement,
    pub initial: InitialCondition,
    /// Relative mass drift tolerated in mass-conserving regimes.
    pub mass_tolerance: FloatNum,
    pub particles: Option<ParticleConfig>,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig::new(60, 80, 1.0, BoundaryRegime::BounceBack)
    }
}

impl SimConfig {
    /// Defaults for everything but the grid, relaxation time and regime.
    pub fn new(height: usize, width: usize, tau: FloatNum, regime: BoundaryRegime) -> Self {
        SimConfig {
            height,
            width,
            tau,
            regime,
            u_max: 0.1,
            inflow_speed: 0.02,
            edge_density: 1.0,
            outlet_density: 1.0,
            wall: WallPlacement::Centered,
            initial: InitialCondition::default(),
            mass_tolerance: 1e-5,
            particles: None,
        }
    }

    pub fn without_wall(mut self) -> Self {
        self.wall = WallPlacement::Absent;
        self
    }

    pub fn with_wall(mut self, column: usize, hole_start: usize, hole_end: usize) -> Self {
        self.wall = WallPlacement::At {
            column,
            hole_start,
            hole_end,
        };
        self
    }

    pub fn with_initial(mut self, initial: InitialCondition) -> Self {
        self.initial = initial;
        self
    }

    pub fn with_particles(mut self, particles: ParticleConfig) -> Self {
        self.particles = Some(particles);
        self
    }

    pub fn grid(&self) -> Result<Grid> {
        Grid::new(self.height, self.width)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let grid = self.grid()?;
        if !self.tau.is_finite() || self.tau <= 0.0 {
            return Err(LbmError::InvalidTau(self.tau));
        }
        positive("u_max", self.u_max)?;
        positive("outlet_density", self.outlet_density)?;
        positive("mass_tolerance", self.mass_tolerance)?;
        non_negative("edge_density", self.edge_density)?;
        if !self.inflow_speed.is_finite() {
            return Err(invalid(format!("inflow_speed must be finite, got {}", self.inflow_speed)));
        }
        match self.initial {
            InitialCondition::Uniform { rho } => non_negative("initial rho", rho)?,
            InitialCondition::Dam { left, right } => {
                non_negative("initial left density", left)?;
                non_negative("initial right density", right)?;
            }
        }
        if let Some(wall) = self.wall.resolve(grid) {
            let hole = wall.hole();
            if hole.column >= grid.width {
                return Err(invalid(format!(
                    "wall column {} outside grid of width {}",
                    hole.column, grid.width
                )));
            }
            if hole.start > hole.end {
                return Err(invalid(format!(
                    "wall hole start {} after end {}",
                    hole.start, hole.end
                )));
            }
        }
        if let Some(p) = &self.particles {
            let (lo, hi) = p.mass_range;
            if !(lo > 0.0 && hi >= lo && hi.is_finite()) {
                return Err(invalid(format!("particle mass range {:?} must be positive", p.mass_range)));
            }
            if p.max_history == Some(0) {
                return Err(invalid("particle max_history must be at least 1".to_owned()));
            }
        }
        Ok(())
    }
}

fn invalid(message: String) -> LbmError {
    LbmError::InvalidConfig(message)
}

fn positive(name: &str, value: FloatNum) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{} must be positive, got {}", name, value)))
    }
}

fn non_negative(name: &str, value: FloatNum) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{} must be non-negative, got {}", name, value)))
    }
}
