//! Passive tracer particles carried by the velocity field.

use std::collections::VecDeque;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::ParticleConfig;
use crate::error::{LbmError, Result};
use crate::FloatNum;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Particle {
    pub x: FloatNum,
    pub y: FloatNum,
    /// Inverse speed factor, always positive.
    pub mass: FloatNum,
    pub color: [u8; 3],
    /// Visited positions, oldest first, starting with the spawn point.
    pub path: VecDeque<(FloatNum, FloatNum)>,
}

/// Rejects a mass that would turn `advect` into a division by zero or flip
/// the direction of travel.
pub(crate) fn check_mass(mass: FloatNum) -> Result<()> {
    if mass.is_finite() && mass > 0.0 {
        Ok(())
    } else {
        Err(LbmError::InvalidConfig(format!(
            "particle mass must be positive and finite, got {}",
            mass
        )))
    }
}

impl Particle {
    pub fn new(x: FloatNum, y: FloatNum, mass: FloatNum, color: [u8; 3]) -> Result<Particle> {
        check_mass(mass)?;
        let mut path = VecDeque::new();
        path.push_back((x, y));
        Ok(Particle {
            x,
            y,
            mass,
            color,
            path,
        })
    }

    /// Cell the particle currently samples, `None` when outside the grid.
    #[inline(always)]
    pub fn cell(&self, height: usize, width: usize) -> Option<(usize, usize)> {
        let row = self.y.floor();
        let col = self.x.floor();
        if row < 0.0 || col < 0.0 || !row.is_finite() || !col.is_finite() {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        if row < height && col < width {
            Some((row, col))
        } else {
            None
        }
    }

    fn record(&mut self, max_history: Option<usize>) {
        self.path.push_back((self.x, self.y));
        if let Some(cap) = max_history {
            while self.path.len() > cap.max(1) {
                self.path.pop_front();
            }
        }
    }
}

/// The particle list of one solver.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Particles {
    list: Vec<Particle>,
    max_history: Option<usize>,
}

impl Particles {
    pub fn new(max_history: Option<usize>) -> Particles {
        Particles {
            list: Vec::new(),
            max_history,
        }
    }

    pub fn from_list(list: Vec<Particle>, max_history: Option<usize>) -> Result<Particles> {
        for p in &list {
            check_mass(p.mass)?;
        }
        Ok(Particles { list, max_history })
    }

    /// Columns of particles at `start_x`, `per_spot` of them on each of
    /// `spots` rows spread over `y_min..y_max`.
    pub fn seed(config: &ParticleConfig, height: usize) -> Result<Particles> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut particles = Particles::new(config.max_history);
        let y_max = config.y_max.unwrap_or(height as FloatNum - 2.0);
        let (lo, hi) = config.mass_range;
        for spot in 0..config.spots {
            let y = config.y_min + (spot as FloatNum * (y_max - config.y_min) / config.spots as FloatNum).floor();
            for _ in 0..config.per_spot {
                let mass = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
                let color = [rng.gen(), rng.gen(), rng.gen()];
                particles.spawn(Particle::new(config.start_x, y, mass, color)?)?;
            }
        }
        Ok(particles)
    }

    pub fn spawn(&mut self, particle: Particle) -> Result<()> {
        check_mass(particle.mass)?;
        self.list.push(particle);
        Ok(())
    }

    /// Moves every in-grid particle by `u * scale / mass`, sampling the
    /// velocity at its truncated cell. Particles outside the grid stay put
    /// and record nothing.
    pub fn advect(&mut self, ux: &Array2<FloatNum>, uy: &Array2<FloatNum>, scale: FloatNum) {
        let (height, width) = ux.dim();
        let max_history = self.max_history;
        for p in self.list.iter_mut() {
            if let Some((row, col)) = p.cell(height, width) {
                p.x += ux[[row, col]] * scale / p.mass;
                p.y += uy[[row, col]] * scale / p.mass;
                p.record(max_history);
            }
        }
    }

    pub fn max_history(&self) -> Option<usize> {
        self.max_history
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.list.iter()
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.list
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }
}
