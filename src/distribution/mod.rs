//! Discrete velocity sets.

pub mod d2q9;

pub use d2q9::{Direction, D2Q9};
