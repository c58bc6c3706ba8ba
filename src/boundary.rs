use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::distribution::{Direction, D2Q9};
use crate::error::{LbmError, Result};
use crate::grid::ObstacleMask;
use crate::physics::equilibrium;
use crate::FloatNum;

/// Edge treatment, fixed for the lifetime of a solver.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryRegime {
    /// No-slip everywhere: domain edges behave like internal walls.
    BounceBack,
    /// Every edge re-imposed to equilibrium at a fixed velocity profile.
    Constant,
    /// Velocity inlet (left), density outlet (right), symmetry (top),
    /// bounce-back (bottom).
    Custom,
}

impl BoundaryRegime {
    pub const ALL: [BoundaryRegime; 3] = [
        BoundaryRegime::BounceBack,
        BoundaryRegime::Constant,
        BoundaryRegime::Custom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BoundaryRegime::BounceBack => "bounce-back",
            BoundaryRegime::Constant => "constant",
            BoundaryRegime::Custom => "custom",
        }
    }

    /// Regimes that neither inject nor remove mass at the edges.
    pub fn conserves_mass(self) -> bool {
        matches!(self, BoundaryRegime::BounceBack)
    }
}

impl Default for BoundaryRegime {
    fn default() -> Self {
        BoundaryRegime::BounceBack
    }
}

impl fmt::Display for BoundaryRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BoundaryRegime {
    type Err = LbmError;

    fn from_str(s: &str) -> Result<Self> {
        BoundaryRegime::ALL
            .iter()
            .copied()
            .find(|r| r.name() == s)
            .ok_or_else(|| LbmError::UnknownRegime(s.to_owned()))
    }
}

/// Prescribed edge state, built once when the solver is constructed.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundaryProfile {
    /// Inflow `ux` per row: 0 on the bottom row rising linearly to the peak
    /// speed on the top row.
    pub inflow_ux: Vec<FloatNum>,
    pub edge_density: FloatNum,
    pub outlet_density: FloatNum,
}

impl BoundaryProfile {
    pub fn new(
        height: usize,
        inflow_speed: FloatNum,
        edge_density: FloatNum,
        outlet_density: FloatNum,
    ) -> Self {
        let span = height.saturating_sub(1).max(1) as FloatNum;
        let inflow_ux = (0..height)
            .map(|row| inflow_speed * (height - 1 - row) as FloatNum / span)
            .collect();
        BoundaryProfile {
            inflow_ux,
            edge_density,
            outlet_density,
        }
    }
}

/// Applies the selected regime to the edges after streaming.
#[derive(Clone, Debug)]
pub struct Handler {
    regime: BoundaryRegime,
    profile: BoundaryProfile,
}

/// Mutable views of the fields a boundary regime may touch.
pub struct Fields<'a> {
    pub f_in: &'a mut Array3<FloatNum>,
    pub rho: &'a mut Array2<FloatNum>,
    pub ux: &'a mut Array2<FloatNum>,
    pub uy: &'a mut Array2<FloatNum>,
}

impl Handler {
    pub fn new(regime: BoundaryRegime, profile: BoundaryProfile) -> Handler {
        Handler { regime, profile }
    }

    pub fn regime(&self) -> BoundaryRegime {
        self.regime
    }

    pub fn profile(&self) -> &BoundaryProfile {
        &self.profile
    }

    /// Sets the macroscopic edge state a freshly initialized solver starts from.
    pub fn impose_initial(
        &self,
        mask: &ObstacleMask,
        rho: &mut Array2<FloatNum>,
        ux: &mut Array2<FloatNum>,
        uy: &mut Array2<FloatNum>,
    ) {
        let (height, width) = rho.dim();
        let last = width - 1;
        match self.regime {
            BoundaryRegime::BounceBack => {}
            BoundaryRegime::Constant => {
                for j in 0..width {
                    for i in [0, height - 1] {
                        rho[[i, j]] = self.profile.edge_density;
                        ux[[i, j]] = 0.0;
                        uy[[i, j]] = 0.0;
                    }
                }
                for i in 0..height {
                    for j in [0, last] {
                        rho[[i, j]] = self.profile.edge_density;
                        ux[[i, j]] = self.profile.inflow_ux[i];
                        uy[[i, j]] = 0.0;
                    }
                }
            }
            BoundaryRegime::Custom => {
                for i in 0..height {
                    ux[[i, 0]] = self.profile.inflow_ux[i];
                    uy[[i, 0]] = 0.0;
                    rho[[i, last]] = self.profile.outlet_density;
                    ux[[i, last]] = 0.0;
                    uy[[i, last]] = 0.0;
                }
            }
        }
        for ((i, j), solid) in mask.as_array().indexed_iter() {
            if *solid {
                rho[[i, j]] = 0.0;
                ux[[i, j]] = 0.0;
                uy[[i, j]] = 0.0;
            }
        }
    }

    /// Overrides edge populations according to the regime. Obstacle cells are
    /// never touched.
    pub fn apply(&self, lattice: &D2Q9, mask: &ObstacleMask, fields: Fields<'_>) -> Result<()> {
        match self.regime {
            BoundaryRegime::BounceBack => Ok(()),
            BoundaryRegime::Constant => {
                self.apply_constant(lattice, mask, fields.f_in);
                Ok(())
            }
            BoundaryRegime::Custom => self.apply_custom(lattice, mask, fields),
        }
    }

    fn apply_constant(&self, lattice: &D2Q9, mask: &ObstacleMask, f_in: &mut Array3<FloatNum>) {
        let (height, width, _) = f_in.dim();
        let rho = self.profile.edge_density;
        let still = equilibrium(lattice, rho, 0.0, 0.0);
        for j in 0..width {
            for i in [0, height - 1] {
                if !mask.is_obstacle(i, j) {
                    set_cell(f_in, i, j, &still);
                }
            }
        }
        for i in 0..height {
            let feq = equilibrium(lattice, rho, self.profile.inflow_ux[i], 0.0);
            for j in [0, width - 1] {
                if !mask.is_obstacle(i, j) {
                    set_cell(f_in, i, j, &feq);
                }
            }
        }
    }

    fn apply_custom(&self, lattice: &D2Q9, mask: &ObstacleMask, fields: Fields<'_>) -> Result<()> {
        use self::Direction::*;

        let Fields { f_in, rho, ux, uy } = fields;
        let (height, width, _) = f_in.dim();
        let last_col = width - 1;
        let last_row = height - 1;

        // Right: density outlet. Leftward populations are unknown after streaming.
        let rho_t = self.profile.outlet_density;
        for i in 0..height {
            if mask.is_obstacle(i, last_col) {
                continue;
            }
            if !(rho_t.is_finite() && rho_t > 0.0) {
                return Err(LbmError::ZeroOutletDensity { row: i, rho: rho_t });
            }
            let f = |d: Direction| f_in[[i, last_col, d.index()]];
            let known = f(C) + f(N) + f(S) + 2.0 * (f(E) + f(NE) + f(SE));
            let u = known / rho_t - 1.0;
            let transverse = 0.5 * (f(N) - f(S));
            let w = f(E) - 2.0 / 3.0 * rho_t * u;
            let nw = f(SE) - transverse - 1.0 / 6.0 * rho_t * u;
            let sw = f(NE) + transverse - 1.0 / 6.0 * rho_t * u;
            f_in[[i, last_col, W.index()]] = w;
            f_in[[i, last_col, NW.index()]] = nw;
            f_in[[i, last_col, SW.index()]] = sw;
            rho[[i, last_col]] = rho_t;
            ux[[i, last_col]] = u;
            uy[[i, last_col]] = 0.0;
        }

        // Left: velocity inlet at the cell's current density.
        for i in 0..height {
            if mask.is_obstacle(i, 0) {
                continue;
            }
            let feq = equilibrium(lattice, rho[[i, 0]], self.profile.inflow_ux[i], 0.0);
            set_cell(f_in, i, 0, &feq);
        }

        // Top: symmetry, downward populations mirror the upward ones.
        for j in 0..width {
            if mask.is_obstacle(0, j) {
                continue;
            }
            for (down, up) in [(S, N), (SE, NE), (SW, NW)] {
                f_in[[0, j, down.index()]] = f_in[[0, j, up.index()]];
            }
            uy[[0, j]] = 0.0;
        }

        // Bottom: bounce-back, upward populations take their opposites.
        for j in 0..width {
            if mask.is_obstacle(last_row, j) {
                continue;
            }
            for up in [N, NE, NW] {
                f_in[[last_row, j, up.index()]] = f_in[[last_row, j, up.opposite().index()]];
            }
        }
        Ok(())
    }
}

#[inline(always)]
fn set_cell(f: &mut Array3<FloatNum>, i: usize, j: usize, values: &[FloatNum; 9]) {
    for (k, v) in values.iter().enumerate() {
        f[[i, j, k]] = *v;
    }
}
