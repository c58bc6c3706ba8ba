//! Error types for the solver.
//!
//! Construction and restore problems are fatal and surface as [`LbmError`].
//! Numerical trouble during a tick is reported through
//! [`crate::diagnostics::Instability`] instead, so a tick always completes.

use thiserror::Error;

use crate::FloatNum;

#[derive(Debug, Error)]
pub enum LbmError {
    #[error("invalid grid size {height}x{width}: both extents must be positive")]
    InvalidGrid { height: usize, width: usize },

    #[error("relaxation time must be positive and finite, got {0}")]
    InvalidTau(FloatNum),

    #[error("unknown boundary regime `{0}` (expected bounce-back, constant or custom)")]
    UnknownRegime(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("snapshot does not match solver: {0}")]
    SnapshotMismatch(String),

    #[error("outlet density {rho} at row {row} cannot be used to back-solve the outlet velocity")]
    ZeroOutletDensity { row: usize, rho: FloatNum },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LbmError {
    /// True for the configuration family of errors, raised before any tick runs.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LbmError::InvalidGrid { .. }
                | LbmError::InvalidTau(_)
                | LbmError::UnknownRegime(_)
                | LbmError::InvalidConfig(_)
                | LbmError::SnapshotMismatch(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LbmError>;
