//! Error taxonomy for recoverable failures.
//!
//! Precondition violations (mismatched geometry, wrong transform state for an
//! accessor) are programming errors and panic through `assert!`. Everything
//! that a caller can reasonably react to surfaces as a [`SpectralError`].

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum SpectralError {
    #[error("banded matrix must be UL-factored before solving")]
    NotFactored,

    #[error("near-zero pivot {value:e} at row {row} during UL factorization")]
    SingularPivot { row: usize, value: f64 },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed data: {0}")]
    Format(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SpectralError>;
