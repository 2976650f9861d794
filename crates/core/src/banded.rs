//! Banded tridiagonal matrices of the Chebyshev tau discretisation.
//!
//! The sparsity pattern is one dense top row plus a tridiagonal band:
//!
//! ```text
//! x x x x x x
//! x x x
//!   x x x
//!     x x x
//!       x x x
//!         x x
//! ```
//!
//! Storage is a single flat array of length `4M - 2`. The top row is laid
//! out backwards from the centre (`band(j) = a[M-1-j]`) and the band rows
//! follow in `(updiag, diag, lodiag)` triples, so that `updiag(0)` and
//! `band(1)` name the same slot.
//!
//! Factorisation is UL without pivoting: the superdiagonal and the dense row
//! are eliminated from the bottom up, leaving a lower bidiagonal matrix with
//! the elimination multipliers stored in the freed slots. The factors live in
//! their own array with the raw layout, so the assembled matrix stays intact:
//! editing an entry and factoring again always starts from the raw entries,
//! and `multiply` keeps working after factorisation. Solving is an upward
//! sweep over the right-hand side followed by forward substitution.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::warn;

use crate::error::{Result, SpectralError};
use crate::mathdefs::REAL_DIGITS;

/// Pivots smaller than this (relative to the largest entry) are logged.
const SMALL_PIVOT: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub struct BandedTridiag {
    m: usize,
    a: Vec<f64>,
    /// UL factors in the layout of `a`; empty until factored.
    lu: Vec<f64>,
    inv_diag: Vec<f64>,
    factored: bool,
}

impl BandedTridiag {
    pub fn new(m: usize) -> Self {
        assert!(m > 0, "banded matrix must have at least one row");
        Self {
            m,
            a: vec![0.0; 4 * m - 2],
            lu: Vec::new(),
            inv_diag: vec![0.0; m],
            factored: false,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.m
    }

    pub fn is_factored(&self) -> bool {
        self.factored
    }

    #[inline]
    fn band_index(&self, j: usize) -> usize {
        debug_assert!(j < self.m);
        self.m - 1 - j
    }

    #[inline]
    fn diag_index(&self, i: usize) -> usize {
        self.m - 1 + 3 * i
    }

    /// Entry `(0, j)` of the dense top row.
    #[inline]
    pub fn band(&self, j: usize) -> f64 {
        self.a[self.band_index(j)]
    }

    #[inline]
    pub fn diag(&self, i: usize) -> f64 {
        self.a[self.diag_index(i)]
    }

    /// Entry `(i, i+1)`.
    #[inline]
    pub fn updiag(&self, i: usize) -> f64 {
        assert!(i + 1 < self.m, "updiag({i}) is outside a {0}x{0} matrix", self.m);
        self.a[self.diag_index(i) - 1]
    }

    /// Entry `(i, i-1)`.
    #[inline]
    pub fn lodiag(&self, i: usize) -> f64 {
        assert!(i >= 1 && i < self.m, "lodiag({i}) is outside a {0}x{0} matrix", self.m);
        self.a[self.diag_index(i) + 1]
    }

    #[inline]
    pub fn band_mut(&mut self, j: usize) -> &mut f64 {
        self.factored = false;
        let idx = self.band_index(j);
        &mut self.a[idx]
    }

    #[inline]
    pub fn diag_mut(&mut self, i: usize) -> &mut f64 {
        self.factored = false;
        let idx = self.diag_index(i);
        &mut self.a[idx]
    }

    #[inline]
    pub fn updiag_mut(&mut self, i: usize) -> &mut f64 {
        assert!(i + 1 < self.m, "updiag({i}) is outside a {0}x{0} matrix", self.m);
        self.factored = false;
        let idx = self.diag_index(i) - 1;
        &mut self.a[idx]
    }

    #[inline]
    pub fn lodiag_mut(&mut self, i: usize) -> &mut f64 {
        assert!(i >= 1 && i < self.m, "lodiag({i}) is outside a {0}x{0} matrix", self.m);
        self.factored = false;
        let idx = self.diag_index(i) + 1;
        &mut self.a[idx]
    }

    /// `true` if `(i, j)` lies inside the stored pattern.
    pub fn in_band(&self, i: usize, j: usize) -> bool {
        i < self.m && j < self.m && (i == 0 || (j + 1 >= i && j <= i + 1))
    }

    /// Entry `(i, j)`, zero outside the pattern.
    pub fn elem(&self, i: usize, j: usize) -> f64 {
        assert!(i < self.m && j < self.m, "({i}, {j}) is outside a {0}x{0} matrix", self.m);
        if i == 0 {
            self.band(j)
        } else if j == i {
            self.diag(i)
        } else if j + 1 == i {
            self.lodiag(i)
        } else if j == i + 1 {
            self.updiag(i)
        } else {
            0.0
        }
    }

    /// Mutable entry `(i, j)`; panics outside the pattern.
    pub fn elem_mut(&mut self, i: usize, j: usize) -> &mut f64 {
        assert!(self.in_band(i, j), "({i}, {j}) is outside the banded pattern");
        if i == 0 {
            self.band_mut(j)
        } else if j == i {
            self.diag_mut(i)
        } else if j + 1 == i {
            self.lodiag_mut(i)
        } else {
            self.updiag_mut(i)
        }
    }

    /// UL factorisation of the raw entries. On failure the matrix stays
    /// unfactored and its entries are untouched.
    pub fn ul_decompose(&mut self) -> Result<()> {
        if self.factored {
            return Ok(());
        }
        let m = self.m;
        let scale = self.a.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
        let check = |row: usize, pivot: f64| -> Result<()> {
            if pivot == 0.0 || !pivot.is_finite() {
                return Err(SpectralError::SingularPivot { row, value: pivot });
            }
            if pivot.abs() < SMALL_PIVOT * scale {
                warn!("small pivot {pivot:e} at row {row} of {m}x{m} banded matrix");
            }
            Ok(())
        };
        let band = |j: usize| m - 1 - j;
        let diag = |i: usize| m - 1 + 3 * i;
        let mut lu = self.a.clone();

        // Superdiagonal, bottom up.
        for i in (1..m.saturating_sub(1)).rev() {
            let pivot = lu[diag(i + 1)];
            check(i + 1, pivot)?;
            let mult = lu[diag(i) - 1] / pivot;
            lu[diag(i)] -= mult * lu[diag(i + 1) + 1];
            lu[diag(i) - 1] = mult;
        }

        // Dense top row, right to left.
        for j in (1..m).rev() {
            let pivot = lu[diag(j)];
            check(j, pivot)?;
            let mult = lu[band(j)] / pivot;
            lu[band(j - 1)] -= mult * lu[diag(j) + 1];
            lu[band(j)] = mult;
        }
        check(0, lu[diag(0)])?;

        for i in 0..m {
            self.inv_diag[i] = 1.0 / lu[diag(i)];
        }
        self.lu = lu;
        self.factored = true;
        Ok(())
    }

    /// Solve `A x = b` in place; `b` is overwritten with `x`.
    pub fn solve(&self, b: &mut [f64]) -> Result<()> {
        assert_eq!(b.len(), self.m, "right-hand side length must match matrix size");
        self.solve_strided(b, 0, 1)
    }

    /// Solve on the entries `b[offset + stride*i]`, `i = 0..M`.
    pub fn solve_strided(&self, b: &mut [f64], offset: usize, stride: usize) -> Result<()> {
        if !self.factored {
            return Err(SpectralError::NotFactored);
        }
        let m = self.m;
        assert!(stride > 0, "stride must be positive");
        assert!(
            offset + stride * (m - 1) < b.len(),
            "strided right-hand side is too short for a {m}x{m} matrix"
        );
        let at = |i: usize| offset + stride * i;

        let lu = &self.lu;

        for i in (1..m.saturating_sub(1)).rev() {
            let mult = lu[self.diag_index(i) - 1];
            b[at(i)] -= mult * b[at(i + 1)];
        }
        let mut top = b[at(0)];
        for j in 1..m {
            top -= lu[self.band_index(j)] * b[at(j)];
        }
        b[at(0)] = top * self.inv_diag[0];

        for i in 1..m {
            let prev = b[at(i - 1)];
            b[at(i)] = (b[at(i)] - lu[self.diag_index(i) + 1] * prev) * self.inv_diag[i];
        }
        Ok(())
    }

    /// `b = A x` with the raw entries, factored or not.
    pub fn multiply(&self, x: &[f64], b: &mut [f64]) {
        assert_eq!(x.len(), self.m, "input length must match matrix size");
        assert_eq!(b.len(), self.m, "output length must match matrix size");
        self.multiply_strided(x, 0, 1, b, 0, 1);
    }

    /// `b[boff + bstride*i] = sum_j A(i,j) x[xoff + xstride*j]`.
    pub fn multiply_strided(
        &self,
        x: &[f64],
        xoffset: usize,
        xstride: usize,
        b: &mut [f64],
        boffset: usize,
        bstride: usize,
    ) {
        let m = self.m;
        assert!(xoffset + xstride * (m - 1) < x.len(), "strided input is too short");
        assert!(boffset + bstride * (m - 1) < b.len(), "strided output is too short");
        let xi = |i: usize| x[xoffset + xstride * i];

        b[boffset] = (0..m).map(|j| self.band(j) * xi(j)).sum();
        for i in 1..m {
            let mut sum = self.lodiag(i) * xi(i - 1) + self.diag(i) * xi(i);
            if i + 1 < m {
                sum += self.updiag(i) * xi(i + 1);
            }
            b[boffset + bstride * i] = sum;
        }
    }

    /// ASCII dump of the raw pattern as `i j value` triplets.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "% {}", self.m)?;
        for i in 0..self.m {
            for j in 0..self.m {
                if self.in_band(i, j) {
                    writeln!(w, "{i} {j} {:.*e}", REAL_DIGITS, self.elem(i, j))?;
                }
            }
        }
        w.flush()?;
        Ok(())
    }
}
