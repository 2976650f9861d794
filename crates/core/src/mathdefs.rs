//! Scalar helpers shared by the spectral types: transform states, rounding,
//! polynomial interpolation and little-endian binary I/O primitives.

use std::fmt;
use std::io::{Read, Write};

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectralError};

/// Digits written by the ASCII savers (`{:.17e}` round-trips an f64).
pub const REAL_DIGITS: usize = 17;

/// Initial capacity cap when reading a length-prefixed block.
const READ_CHUNK: usize = 1 << 16;

/// Whether stored values are gridpoint samples or spectral coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldState {
    Physical,
    Spectral,
}

impl FieldState {
    fn code(self) -> u8 {
        match self {
            FieldState::Physical => 0,
            FieldState::Spectral => 1,
        }
    }

    fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(FieldState::Physical),
            1 => Ok(FieldState::Spectral),
            other => Err(SpectralError::Format(format!(
                "unknown field state code {other}"
            ))),
        }
    }
}

impl fmt::Display for FieldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldState::Physical => write!(f, "Physical"),
            FieldState::Spectral => write!(f, "Spectral"),
        }
    }
}

impl std::str::FromStr for FieldState {
    type Err = SpectralError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Physical" | "physical" => Ok(FieldState::Physical),
            "Spectral" | "spectral" => Ok(FieldState::Spectral),
            other => Err(SpectralError::Format(format!(
                "expected Physical or Spectral, got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    Even,
    Odd,
}

#[inline]
pub fn square(x: f64) -> f64 {
    x * x
}

#[inline]
pub fn kronecker(m: usize, n: usize) -> f64 {
    if m == n { 1.0 } else { 0.0 }
}

/// Round to the nearest integer, halves away from zero.
pub fn iround(x: f64) -> i64 {
    x.round() as i64
}

/// Return y with 0 <= y < m and y + k*m == x for some integer k.
pub fn fmod_positive(x: f64, m: f64) -> f64 {
    let y = x % m;
    if y < 0.0 { y + m } else { y }
}

/// Zero factor for the highest wavenumber under odd-order differentiation.
///
/// A Fourier mode at |k| == kmax has no well-defined odd derivative on an
/// even grid (Trefethen, Spectral Methods in Matlab, p. 19).
#[inline]
pub fn zero_last_mode(k: i64, kmax: i64, n: u32) -> f64 {
    if k == kmax && n % 2 == 1 { 0.0 } else { 1.0 }
}

pub fn linear_interpolate(x0: f64, f0: f64, x1: f64, f1: f64, x: f64) -> f64 {
    f0 + (f1 - f0) * (x - x0) / (x1 - x0)
}

/// Neville's algorithm: value at `x` of the polynomial through `(xn[i], fn_[i])`.
pub fn polynomial_interpolate(fn_: &[f64], xn: &[f64], x: f64) -> f64 {
    assert_eq!(fn_.len(), xn.len(), "interpolation abscissae and values differ in length");
    assert!(!fn_.is_empty(), "interpolation needs at least one sample");
    let mut p = fn_.to_vec();
    let n = p.len();
    for level in 1..n {
        for i in 0..n - level {
            let j = i + level;
            p[i] = ((x - xn[j]) * p[i] + (xn[i] - x) * p[i + 1]) / (xn[i] - xn[j]);
        }
    }
    p[0]
}

pub fn quadratic_interpolate(fn_: &[f64; 3], xn: &[f64; 3], x: f64) -> f64 {
    polynomial_interpolate(fn_, xn, x)
}

// ============================================================================
// Binary I/O primitives (little endian)
// ============================================================================

pub fn write_usize<W: Write>(w: &mut W, n: usize) -> Result<()> {
    w.write_all(&(n as u64).to_le_bytes())?;
    Ok(())
}

pub fn read_usize<R: Read>(r: &mut R) -> Result<usize> {
    let mut bytes = [0u8; 8];
    r.read_exact(&mut bytes)?;
    usize::try_from(u64::from_le_bytes(bytes))
        .map_err(|_| SpectralError::Format("length does not fit in usize".into()))
}

/// Reads `n` values with `read`. Capacity grows with the data actually read,
/// so a corrupt length fails on end of input instead of allocating up front.
pub fn read_values<R: Read, T>(r: &mut R, n: usize, read: impl Fn(&mut R) -> Result<T>) -> Result<Vec<T>> {
    let mut values = Vec::with_capacity(n.min(READ_CHUNK));
    for _ in 0..n {
        values.push(read(r)?);
    }
    Ok(values)
}

pub fn write_f64<W: Write>(w: &mut W, x: f64) -> Result<()> {
    w.write_all(&x.to_le_bytes())?;
    Ok(())
}

pub fn read_f64<R: Read>(r: &mut R) -> Result<f64> {
    let mut bytes = [0u8; 8];
    r.read_exact(&mut bytes)?;
    Ok(f64::from_le_bytes(bytes))
}

pub fn write_complex<W: Write>(w: &mut W, z: Complex64) -> Result<()> {
    write_f64(w, z.re)?;
    write_f64(w, z.im)
}

pub fn read_complex<R: Read>(r: &mut R) -> Result<Complex64> {
    let re = read_f64(r)?;
    let im = read_f64(r)?;
    Ok(Complex64::new(re, im))
}

pub fn write_bool<W: Write>(w: &mut W, b: bool) -> Result<()> {
    w.write_all(&[u8::from(b)])?;
    Ok(())
}

pub fn read_bool<R: Read>(r: &mut R) -> Result<bool> {
    let mut byte = [0u8; 1];
    r.read_exact(&mut byte)?;
    Ok(byte[0] != 0)
}

pub fn write_state<W: Write>(w: &mut W, s: FieldState) -> Result<()> {
    w.write_all(&[s.code()])?;
    Ok(())
}

pub fn read_state<R: Read>(r: &mut R) -> Result<FieldState> {
    let mut byte = [0u8; 1];
    r.read_exact(&mut byte)?;
    FieldState::from_code(byte[0])
}

/// Parse one whitespace-trimmed real from an ASCII line.
pub fn parse_real(line: &str) -> Result<f64> {
    line.trim()
        .parse::<f64>()
        .map_err(|err| SpectralError::Format(format!("bad real '{}': {err}", line.trim())))
}
