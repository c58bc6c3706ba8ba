//! Obstacle shapes that can be painted into an [`crate::grid::ObstacleMask`].

mod circle;
mod wall;

pub use circle::Circle;
pub use wall::{Wall, HOLE_SIZE, WALL_POSITION};
