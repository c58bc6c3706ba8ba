use log::warn;
use ndarray::{Array2, Array3, Zip};

use crate::distribution::D2Q9;
use crate::error::{LbmError, Result};
use crate::traits::Collision;
use crate::FloatNum;

/// Distance from the 0.5 stability limit below which `tau` is called fragile.
pub const FRAGILE_TAU_MARGIN: FloatNum = 0.02;

/// Second-order equilibrium distribution for a cell at (`rho`, `ux`, `uy`).
///
/// `f_eq[k] = w_k rho (1 + 3 (c_k.u) + 4.5 (c_k.u)^2 - 1.5 |u|^2)`
#[inline(always)]
pub fn equilibrium(lattice: &D2Q9, rho: FloatNum, ux: FloatNum, uy: FloatNum) -> [FloatNum; 9] {
    let u_sq = ux * ux + uy * uy;
    let mut f_eq = [0.0; 9];
    for (k, f) in f_eq.iter_mut().enumerate() {
        let eu = lattice.dot(k, ux, uy);
        *f = lattice.weights[k] * rho * (1.0 + 3.0 * eu + 4.5 * eu * eu - 1.5 * u_sq);
    }
    f_eq
}

/// Fills `f_eq` with the equilibrium of every cell's macroscopic state.
pub fn equilibrium_field(
    lattice: &D2Q9,
    rho: &Array2<FloatNum>,
    ux: &Array2<FloatNum>,
    uy: &Array2<FloatNum>,
    f_eq: &mut Array3<FloatNum>,
) {
    let (height, width) = rho.dim();
    for i in 0..height {
        for j in 0..width {
            let eq = equilibrium(lattice, rho[[i, j]], ux[[i, j]], uy[[i, j]]);
            for (k, v) in eq.iter().enumerate() {
                f_eq[[i, j, k]] = *v;
            }
        }
    }
}

/// Recomputes density and velocity as moments of `f_in`.
///
/// Cells with zero density keep their previous velocity. Velocities are
/// clamped to `[-u_max, u_max]`.
pub fn compute_macroscopic(
    lattice: &D2Q9,
    f_in: &Array3<FloatNum>,
    rho: &mut Array2<FloatNum>,
    ux: &mut Array2<FloatNum>,
    uy: &mut Array2<FloatNum>,
    u_max: FloatNum,
) {
    let (height, width, q) = f_in.dim();
    for i in 0..height {
        for j in 0..width {
            let mut density = 0.0;
            let mut mx = 0.0;
            let mut my = 0.0;
            for k in 0..q {
                let f = f_in[[i, j, k]];
                density += f;
                mx += f * lattice.cx(k);
                my += f * lattice.cy(k);
            }
            rho[[i, j]] = density;
            if density > 0.0 {
                ux[[i, j]] = mx / density;
                uy[[i, j]] = my / density;
            }
            ux[[i, j]] = ux[[i, j]].clamp(-u_max, u_max);
            uy[[i, j]] = uy[[i, j]].clamp(-u_max, u_max);
        }
    }
}

/// Single relaxation time (BGK) collision.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SingleRelaxationTime {
    pub tau: FloatNum,
    pub omega: FloatNum,
}

impl SingleRelaxationTime {
    /// Values of `tau` near 0.5 are accepted but logged as fragile.
    pub fn new(tau: FloatNum) -> Result<Self> {
        if !tau.is_finite() || tau <= 0.0 {
            return Err(LbmError::InvalidTau(tau));
        }
        let srt = SingleRelaxationTime {
            tau,
            omega: 1.0 / tau,
        };
        if srt.is_fragile() {
            warn!(
                "relaxation time tau = {} is at or near the 0.5 stability limit; expect instability",
                tau
            );
        }
        Ok(srt)
    }

    pub fn is_fragile(&self) -> bool {
        self.tau < 0.5 + FRAGILE_TAU_MARGIN
    }

    /// Kinematic viscosity in lattice units, `(tau - 0.5) / 3`.
    pub fn viscosity(&self) -> FloatNum {
        D2Q9::c_squ() * (self.tau - 0.5)
    }
}

impl Collision for SingleRelaxationTime {
    #[inline(always)]
    fn collision(
        &self,
        f_in: &Array3<FloatNum>,
        f_eq: &Array3<FloatNum>,
        f_out: &mut Array3<FloatNum>,
    ) {
        let omega = self.omega;
        Zip::from(f_out)
            .and(f_in)
            .and(f_eq)
            .for_each(|out, &fi, &fe| *out = fi + (fe - fi) * omega);
    }

    fn tau(&self) -> FloatNum {
        self.tau
    }
}
