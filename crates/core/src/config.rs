//! TOML configuration for solver runs.
//!
//! # Example TOML
//!
//! ```toml
//! nu = 0.001
//!
//! [geometry]
//! nx = 32
//! ny = 33
//! nz = 32
//! lx = 6.283185307179586
//! lz = 3.141592653589793
//!
//! [tolerances]
//! residual = 1e-10
//! ```
//!
//! Omitted lengths default to `Lx = 2 pi`, `Lz = pi` on `[a, b] = [-1, 1]`
//! with three components.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectralError};
use crate::grid::FieldGeometry;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Largest acceptable solver residual.
    #[serde(default = "default_residual")]
    pub residual: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            residual: default_residual(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    pub geometry: FieldGeometry,
    /// Kinematic viscosity.
    #[serde(default = "default_nu")]
    pub nu: f64,
    #[serde(default)]
    pub tolerances: Tolerances,
}

impl SolverConfig {
    pub fn new(geometry: FieldGeometry) -> Self {
        Self {
            geometry,
            nu: default_nu(),
            tolerances: Tolerances::default(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: SolverConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let g = &self.geometry;
        if g.nx == 0 || g.nz == 0 || g.nd == 0 {
            return Err(SpectralError::InvalidConfig(
                "nx, nz and nd must be positive".into(),
            ));
        }
        if g.ny < 3 {
            return Err(SpectralError::InvalidConfig(format!(
                "ny must be at least 3 for the Chebyshev-tau solvers, got {}",
                g.ny
            )));
        }
        if g.lx <= 0.0 || g.lz <= 0.0 {
            return Err(SpectralError::InvalidConfig(
                "periodic lengths lx and lz must be positive".into(),
            ));
        }
        if g.b <= g.a {
            return Err(SpectralError::InvalidConfig(format!(
                "wall-normal domain requires a < b, got [{}, {}]",
                g.a, g.b
            )));
        }
        if self.nu <= 0.0 {
            return Err(SpectralError::InvalidConfig("nu must be positive".into()));
        }
        if self.tolerances.residual <= 0.0 {
            return Err(SpectralError::InvalidConfig(
                "tolerances.residual must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn default_nu() -> f64 {
    1.0
}

fn default_residual() -> f64 {
    1e-10
}
