//! Geometry of a spectral channel field.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::mathdefs::FieldState;

/// Gridpoint counts, component count and domain of a [`crate::field::FlowField`].
///
/// `nx`, `nz` are periodic gridpoint counts (Fourier), `ny` the number of
/// Chebyshev points on `[a, b]`, `nd` the number of components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldGeometry {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    #[serde(default = "default_nd")]
    pub nd: usize,
    #[serde(default = "default_lx")]
    pub lx: f64,
    #[serde(default = "default_lz")]
    pub lz: f64,
    #[serde(default = "default_a")]
    pub a: f64,
    #[serde(default = "default_b")]
    pub b: f64,
}

impl FieldGeometry {
    pub fn new(nx: usize, ny: usize, nz: usize, nd: usize, lx: f64, lz: f64, a: f64, b: f64) -> Self {
        Self { nx, ny, nz, nd, lx, lz, a, b }
    }

    /// Number of stored z modes.
    #[inline]
    pub fn mz(&self) -> usize {
        self.nz / 2 + 1
    }

    /// Wavenumber of x mode index `mx`.
    #[inline]
    pub fn kx(&self, mx: usize) -> i64 {
        if mx <= self.nx / 2 { mx as i64 } else { mx as i64 - self.nx as i64 }
    }

    /// Wavenumber of z mode index `mz`.
    #[inline]
    pub fn kz(&self, mz: usize) -> i64 {
        mz as i64
    }

    /// Length of the physical buffer, `Nx Ny Nz Nd`.
    pub fn physical_len(&self) -> usize {
        self.nx * self.ny * self.nz * self.nd
    }

    /// Length of the spectral buffer, `Mx My Mz Nd`.
    pub fn spectral_len(&self) -> usize {
        self.nx * self.ny * self.mz() * self.nd
    }

    /// Buffer length in xz state `xz`, or `None` if it overflows `usize`.
    pub fn checked_len(&self, xz: FieldState) -> Option<usize> {
        let nz = match xz {
            FieldState::Physical => self.nz,
            FieldState::Spectral => self.mz(),
        };
        self.nx.checked_mul(self.ny)?.checked_mul(nz)?.checked_mul(self.nd)
    }

    /// Same gridpoint counts and domain; components may differ.
    pub fn geom_congruent(&self, other: &FieldGeometry) -> bool {
        self.nx == other.nx
            && self.ny == other.ny
            && self.nz == other.nz
            && self.lx == other.lx
            && self.lz == other.lz
            && self.a == other.a
            && self.b == other.b
    }

    pub fn congruent(&self, other: &FieldGeometry) -> bool {
        self.geom_congruent(other) && self.nd == other.nd
    }

    /// Panics unless the counts and lengths describe a usable field.
    pub fn validate(&self) {
        assert!(self.nx > 0 && self.ny > 0 && self.nz > 0 && self.nd > 0, "field dimensions must be positive: {self:?}");
        assert!(self.lx > 0.0 && self.lz > 0.0, "periodic lengths must be positive: {self:?}");
        assert!(self.b > self.a, "wall-normal domain requires a < b: {self:?}");
    }
}

fn default_nd() -> usize {
    3
}

fn default_lx() -> f64 {
    2.0 * PI
}

fn default_lz() -> f64 {
    PI
}

fn default_a() -> f64 {
    -1.0
}

fn default_b() -> f64 {
    1.0
}
