use serde::Serialize;

use crate::FloatNum;

//  c6  c2   c5
//    \  |  /
//  c3 -c0 - c1
//    /  |  \
//  c7  c4   c8
//
// Vectors are (cx, cy) in grid axes: cx along columns, cy along rows,
// rows growing downward. "North" is therefore cy = -1.

const T1: FloatNum = 4. / 9.;
const T2: FloatNum = 1. / 9.;
const T3: FloatNum = 1. / 36.;

/// Named discrete directions of the D2Q9 lattice.
#[derive(Serialize, Eq, Ord, PartialEq, PartialOrd, Copy, Clone, Debug, Hash)]
#[repr(usize)]
pub enum Direction {
    C = 0,
    E = 1,
    N = 2,
    W = 3,
    S = 4,
    NE = 5,
    NW = 6,
    SW = 7,
    SE = 8,
}

impl Direction {
    pub const ALL: [Direction; 9] = [
        Direction::C,
        Direction::E,
        Direction::N,
        Direction::W,
        Direction::S,
        Direction::NE,
        Direction::NW,
        Direction::SW,
        Direction::SE,
    ];

    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline(always)]
    pub fn from_index(k: usize) -> Option<Self> {
        Self::ALL.get(k).copied()
    }

    #[inline(always)]
    pub fn opposite(self) -> Self {
        use self::Direction::*;
        match self {
            C => C,
            E => W,
            N => S,
            W => E,
            S => N,
            NE => SW,
            NW => SE,
            SW => NE,
            SE => NW,
        }
    }

    #[inline(always)]
    pub fn vector(self) -> [i32; 2] {
        VELOCITIES[self.index()]
    }

    /// Axis-aligned unit steps (directions 1-4).
    pub fn axis() -> impl Iterator<Item = Direction> {
        Self::ALL[1..5].iter().copied()
    }

    /// Diagonal steps (directions 5-8).
    pub fn diagonal() -> impl Iterator<Item = Direction> {
        Self::ALL[5..9].iter().copied()
    }
}

const VELOCITIES: [[i32; 2]; 9] = [
    [0, 0],
    [1, 0],
    [0, -1],
    [-1, 0],
    [0, 1],
    [1, -1],
    [-1, -1],
    [-1, 1],
    [1, 1],
];

const WEIGHTS: [FloatNum; 9] = [T1, T2, T2, T2, T2, T3, T3, T3, T3];

const OPPOSITE: [usize; 9] = [0, 3, 4, 1, 2, 7, 8, 5, 6];

/// Constant tables of the D2Q9 velocity set.
///
/// The solver receives its own copy at construction; nothing here is global
/// mutable state.
#[derive(PartialEq, Copy, Clone, Debug)]
pub struct D2Q9 {
    pub velocities: [[i32; 2]; 9],
    pub weights: [FloatNum; 9],
    pub opposite: [usize; 9],
}

impl D2Q9 {
    pub const Q: usize = 9;

    pub fn new() -> Self {
        D2Q9 {
            velocities: VELOCITIES,
            weights: WEIGHTS,
            opposite: OPPOSITE,
        }
    }

    /// Lattice speed of sound squared.
    #[inline(always)]
    pub fn c_squ() -> FloatNum {
        1. / 3.
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        Self::Q
    }

    #[inline(always)]
    pub fn cx(&self, k: usize) -> FloatNum {
        self.velocities[k][0] as FloatNum
    }

    #[inline(always)]
    pub fn cy(&self, k: usize) -> FloatNum {
        self.velocities[k][1] as FloatNum
    }

    /// `c_k . u`
    #[inline(always)]
    pub fn dot(&self, k: usize, ux: FloatNum, uy: FloatNum) -> FloatNum {
        self.cx(k) * ux + self.cy(k) * uy
    }
}

impl Default for D2Q9 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        let lattice = D2Q9::new();
        let sum: FloatNum = lattice.weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-15);
        assert!(lattice.weights.iter().all(|&w| w > 0.0));
    }

    #[test]
    fn opposite_is_an_involution() {
        let lattice = D2Q9::new();
        for k in 0..D2Q9::Q {
            let o = lattice.opposite[k];
            assert_eq!(lattice.opposite[o], k);
            assert_eq!(lattice.velocities[o][0], -lattice.velocities[k][0]);
            assert_eq!(lattice.velocities[o][1], -lattice.velocities[k][1]);
        }
    }

    #[test]
    fn direction_table_matches_constants() {
        let lattice = D2Q9::new();
        for d in Direction::ALL {
            assert_eq!(d.opposite().index(), lattice.opposite[d.index()]);
            assert_eq!(d.vector(), lattice.velocities[d.index()]);
            assert_eq!(Direction::from_index(d.index()), Some(d));
        }
        assert_eq!(Direction::from_index(9), None);
        assert_eq!(Direction::N.vector(), [0, -1]);
        assert_eq!(Direction::SE.vector(), [1, 1]);
    }

    #[test]
    fn axis_and_diagonal_groups() {
        let lattice = D2Q9::new();
        for d in Direction::axis() {
            let [x, y] = d.vector();
            assert_eq!(x.abs() + y.abs(), 1);
            assert_eq!(lattice.weights[d.index()], T2);
        }
        for d in Direction::diagonal() {
            let [x, y] = d.vector();
            assert_eq!((x.abs(), y.abs()), (1, 1));
            assert_eq!(lattice.weights[d.index()], T3);
        }
        assert_eq!(Direction::axis().count(), 4);
        assert_eq!(Direction::diagonal().count(), 4);
    }
}
