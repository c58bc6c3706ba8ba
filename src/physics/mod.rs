//! Navier-Stokes physics on the lattice: equilibrium, BGK relaxation and
//! macroscopic moments.

pub mod ns;

pub use ns::{compute_macroscopic, equilibrium, equilibrium_field, SingleRelaxationTime};
