//! Real- and complex-valued Chebyshev expansions on an interval `[a, b]`.
//!
//! A [`ChebyCoeff`] holds either `N` coefficients of `T_0 .. T_{N-1}` or the
//! `N` samples at the Gauss-Lobatto points
//! `y_n = (b+a)/2 + (b-a)/2 cos(pi n/(N-1))`, depending on its
//! [`FieldState`]. Indexing means whichever of the two is current; operations
//! that need the other representation assert on the state rather than
//! converting silently.
//!
//! The calculus (differentiation, integration) is done by the usual
//! three-term recurrences on the coefficients and costs O(N) per order.
//!
//! Norms take an explicit `normalize` flag. With `normalize == true` the
//! integrals are divided by the domain length `b - a` (L2) or by pi
//! (Chebyshev-weighted), matching the conventional defaults of the
//! norm helpers.

use std::f64::consts::PI;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::ops::{AddAssign, Index, IndexMut, MulAssign, SubAssign};
use std::path::Path;

use num_complex::Complex64;

use crate::buffer::Vector;
use crate::error::{Result, SpectralError};
use crate::mathdefs::{self, FieldState, Parity, REAL_DIGITS};
use crate::transform::ChebyTransform;

/// Weighting of a norm in y: uniform, or the Chebyshev weight `1/sqrt(1-x^2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormType {
    Uniform,
    Chebyshev,
}

/// The `N` Gauss-Lobatto points on `[a, b]`, ordered from `b` down to `a`.
pub fn chebypoints(n: usize, a: f64, b: f64) -> Vector {
    let mut x = Vector::zeros(n);
    if n == 1 {
        x[0] = 0.5 * (a + b);
        return x;
    }
    let pin = PI / (n - 1) as f64;
    let center = 0.5 * (b + a);
    let radius = 0.5 * (b - a);
    for j in 0..n {
        x[j] = center + radius * (j as f64 * pin).cos();
    }
    x
}

/// `c_0 = 2`, `c_n = 1` for `n > 0`.
#[inline]
pub fn cheby_c(n: usize) -> f64 {
    if n == 0 { 2.0 } else { 1.0 }
}

/// `Int_{-1}^{1} T_m(x) T_n(x) dx`.
pub fn cheby_ip(m: usize, n: usize) -> f64 {
    if (m + n) % 2 == 1 {
        return 0.0;
    }
    let sum = (m + n) as f64;
    let diff = m.abs_diff(n) as f64;
    1.0 / (1.0 - sum * sum) + 1.0 / (1.0 - diff * diff)
}

/// Value of `T_n(x)` for `x` in `[-1, 1]`.
pub fn chebyshev(n: usize, x: f64) -> f64 {
    (n as f64 * x.clamp(-1.0, 1.0).acos()).cos()
}

// ============================================================================
// Real-valued series
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ChebyCoeff {
    data: Vector,
    a: f64,
    b: f64,
    state: FieldState,
}

impl Default for ChebyCoeff {
    fn default() -> Self {
        Self::new(0, -1.0, 1.0, FieldState::Spectral)
    }
}

impl ChebyCoeff {
    pub fn new(n: usize, a: f64, b: f64, state: FieldState) -> Self {
        assert!(b > a, "Chebyshev domain requires a < b, got [{a}, {b}]");
        Self {
            data: Vector::zeros(n),
            a,
            b,
            state,
        }
    }

    pub fn from_vec(data: Vec<f64>, a: f64, b: f64, state: FieldState) -> Self {
        assert!(b > a, "Chebyshev domain requires a < b, got [{a}, {b}]");
        Self {
            data: Vector::from_vec(data),
            a,
            b,
            state,
        }
    }

    /// Copy of the first `n` entries of `g` (zero-padded if `g` is shorter).
    pub fn truncated(n: usize, g: &ChebyCoeff) -> Self {
        let mut f = Self::new(n, g.a, g.b, g.state);
        let m = n.min(g.len());
        f.data.as_mut_slice()[..m].copy_from_slice(&g.data.as_slice()[..m]);
        f
    }

    /// Sample `func` at the collocation points and return a Spectral series.
    pub fn from_fn(n: usize, a: f64, b: f64, func: impl Fn(f64) -> f64) -> Self {
        let y = chebypoints(n, a, b);
        let values = y.as_slice().iter().map(|&yj| func(yj)).collect();
        let mut f = Self::from_vec(values, a, b, FieldState::Physical);
        f.make_spectral();
        f
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn num_modes(&self) -> usize {
        self.data.len()
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn domain_length(&self) -> f64 {
        self.b - self.a
    }

    pub fn state(&self) -> FieldState {
        self.state
    }

    pub fn as_slice(&self) -> &[f64] {
        self.data.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        self.data.as_mut_slice()
    }

    /// Relabel the state without transforming the data.
    pub fn set_state(&mut self, state: FieldState) {
        self.state = state;
    }

    pub fn set_bounds(&mut self, a: f64, b: f64) {
        assert!(b > a, "Chebyshev domain requires a < b, got [{a}, {b}]");
        self.a = a;
        self.b = b;
    }

    pub fn set_to_zero(&mut self) {
        self.data.set_to_zero();
    }

    pub fn resize(&mut self, n: usize) {
        self.data.resize(n);
    }

    /// Same length and domain.
    pub fn congruent(&self, g: &ChebyCoeff) -> bool {
        self.len() == g.len() && self.a == g.a && self.b == g.b
    }

    /// Take `g`'s length, bounds and state; zero the data.
    pub fn reconfig(&mut self, g: &ChebyCoeff) {
        self.data = Vector::zeros(g.len());
        self.a = g.a;
        self.b = g.b;
        self.state = g.state;
    }

    /// Copy the leading coefficients of `g`, zeroing the rest.
    pub fn fill(&mut self, g: &ChebyCoeff) {
        assert_eq!(g.state, FieldState::Spectral, "fill requires a Spectral source");
        assert!(
            self.a == g.a && self.b == g.b,
            "fill requires matching domains"
        );
        let m = self.len().min(g.len());
        self.data.set_to_zero();
        self.data.as_mut_slice()[..m].copy_from_slice(&g.data.as_slice()[..m]);
        self.state = FieldState::Spectral;
    }

    /// Set `self` to `g` restricted to `self`'s domain, which must lie inside `g`'s.
    pub fn interpolate(&mut self, g: &ChebyCoeff) {
        assert_eq!(g.state, FieldState::Spectral, "interpolate requires a Spectral source");
        assert!(
            self.a >= g.a && self.b <= g.b,
            "interpolation domain [{}, {}] is not inside [{}, {}]",
            self.a,
            self.b,
            g.a,
            g.b
        );
        let y = chebypoints(self.len(), self.a, self.b);
        for (value, &yj) in self.data.as_mut_slice().iter_mut().zip(y.as_slice()) {
            *value = g.eval(yj);
        }
        self.state = FieldState::Physical;
        self.make_spectral();
    }

    /// Reflection about the domain midpoint, `self(y) = s g(a+b-y)`, with
    /// `s = 1` for even and `s = -1` for odd parity.
    pub fn reflect(&mut self, g: &ChebyCoeff, parity: Parity) {
        assert_eq!(g.state, FieldState::Spectral, "reflect requires a Spectral source");
        self.reconfig(g);
        let sign = match parity {
            Parity::Even => 1.0,
            Parity::Odd => -1.0,
        };
        for (n, (dst, src)) in self
            .data
            .as_mut_slice()
            .iter_mut()
            .zip(g.data.as_slice())
            .enumerate()
        {
            *dst = if n % 2 == 0 { sign * src } else { -sign * src };
        }
    }

    // ------------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------------

    /// Clenshaw evaluation at `y` in `[a, b]`.
    pub fn eval(&self, y: f64) -> f64 {
        self.assert_spectral("eval");
        let n = self.len();
        if n == 0 {
            return 0.0;
        }
        let x = (2.0 * y - self.a - self.b) / (self.b - self.a);
        let u = self.data.as_slice();
        let mut b1 = 0.0;
        let mut b2 = 0.0;
        for k in (1..n).rev() {
            let b0 = u[k] + 2.0 * x * b1 - b2;
            b2 = b1;
            b1 = b0;
        }
        u[0] + x * b1 - b2
    }

    pub fn eval_points(&self, y: &[f64]) -> Vec<f64> {
        y.iter().map(|&yj| self.eval(yj)).collect()
    }

    /// `u(a) = sum (-1)^n u_n`.
    pub fn eval_a(&self) -> f64 {
        self.assert_spectral("eval_a");
        self.data
            .as_slice()
            .iter()
            .enumerate()
            .map(|(n, u)| if n % 2 == 0 { *u } else { -u })
            .sum()
    }

    /// `u(b) = sum u_n`.
    pub fn eval_b(&self) -> f64 {
        self.assert_spectral("eval_b");
        self.data.as_slice().iter().sum()
    }

    /// `du/dy` at `a`, from `T_n'(-1) = (-1)^(n+1) n^2`.
    pub fn slope_a(&self) -> f64 {
        self.assert_spectral("slope_a");
        let sum: f64 = self
            .data
            .as_slice()
            .iter()
            .enumerate()
            .map(|(n, u)| {
                let n2 = (n * n) as f64;
                if n % 2 == 0 { -n2 * u } else { n2 * u }
            })
            .sum();
        2.0 * sum / self.domain_length()
    }

    /// `du/dy` at `b`, from `T_n'(1) = n^2`.
    pub fn slope_b(&self) -> f64 {
        self.assert_spectral("slope_b");
        let sum: f64 = self
            .data
            .as_slice()
            .iter()
            .enumerate()
            .map(|(n, u)| (n * n) as f64 * u)
            .sum();
        2.0 * sum / self.domain_length()
    }

    /// `1/(b-a) Int_a^b u dy = sum_{n even} u_n / (1 - n^2)`.
    pub fn mean(&self) -> f64 {
        self.assert_spectral("mean");
        self.data
            .as_slice()
            .iter()
            .enumerate()
            .step_by(2)
            .map(|(n, u)| u / (1.0 - (n * n) as f64))
            .sum()
    }

    // ------------------------------------------------------------------------
    // Transforms
    // ------------------------------------------------------------------------

    /// Physical to Spectral. Panics if already Spectral.
    pub fn chebyfft(&mut self) {
        let plan = ChebyTransform::new(self.len());
        self.chebyfft_with(&plan);
    }

    /// Spectral to Physical. Panics if already Physical.
    pub fn ichebyfft(&mut self) {
        let plan = ChebyTransform::new(self.len());
        self.ichebyfft_with(&plan);
    }

    pub fn chebyfft_with(&mut self, plan: &ChebyTransform) {
        assert_eq!(self.state, FieldState::Physical, "chebyfft requires Physical state");
        plan.forward(self.data.as_mut_slice());
        self.state = FieldState::Spectral;
    }

    pub fn ichebyfft_with(&mut self, plan: &ChebyTransform) {
        assert_eq!(self.state, FieldState::Spectral, "ichebyfft requires Spectral state");
        plan.backward(self.data.as_mut_slice());
        self.state = FieldState::Physical;
    }

    pub fn make_spectral(&mut self) {
        if self.state == FieldState::Physical {
            self.chebyfft();
        }
    }

    pub fn make_physical(&mut self) {
        if self.state == FieldState::Spectral {
            self.ichebyfft();
        }
    }

    pub fn make_state(&mut self, state: FieldState) {
        match state {
            FieldState::Physical => self.make_physical(),
            FieldState::Spectral => self.make_spectral(),
        }
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    /// ASCII save: a `% N a b state` header, then one value per line in `state`.
    pub fn save(&self, path: &Path, state: FieldState) -> Result<()> {
        let mut copy = self.clone();
        copy.make_state(state);
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "% {} {:.*e} {:.*e} {}", copy.len(), REAL_DIGITS, copy.a, REAL_DIGITS, copy.b, copy.state)?;
        for x in copy.data.as_slice() {
            writeln!(w, "{:.*e}", REAL_DIGITS, x)?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut lines = reader.lines();
        let header = lines
            .next()
            .ok_or_else(|| SpectralError::Format("empty Chebyshev file".into()))??;
        let fields: Vec<&str> = header.trim_start_matches('%').split_whitespace().collect();
        if fields.len() != 4 {
            return Err(SpectralError::Format(format!("bad Chebyshev header '{header}'")));
        }
        let n: usize = fields[0]
            .parse()
            .map_err(|_| SpectralError::Format(format!("bad length '{}'", fields[0])))?;
        let a = mathdefs::parse_real(fields[1])?;
        let b = mathdefs::parse_real(fields[2])?;
        let state: FieldState = fields[3].parse()?;
        let mut data = Vec::new();
        for line in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            data.push(mathdefs::parse_real(&line)?);
        }
        if data.len() != n || !(b > a) {
            return Err(SpectralError::Format(format!(
                "Chebyshev file declares {n} values on [{a}, {b}], found {}",
                data.len()
            )));
        }
        Ok(Self::from_vec(data, a, b, state))
    }

    pub fn binary_dump<W: Write>(&self, w: &mut W) -> Result<()> {
        mathdefs::write_f64(w, self.a)?;
        mathdefs::write_f64(w, self.b)?;
        mathdefs::write_state(w, self.state)?;
        self.data.binary_dump(w)
    }

    pub fn binary_load<R: Read>(r: &mut R) -> Result<Self> {
        let a = mathdefs::read_f64(r)?;
        let b = mathdefs::read_f64(r)?;
        let state = mathdefs::read_state(r)?;
        let data = Vector::binary_load(r)?;
        if !(b > a) {
            return Err(SpectralError::Format(format!("bad Chebyshev domain [{a}, {b}]")));
        }
        Ok(Self { data, a, b, state })
    }

    fn assert_spectral(&self, op: &str) {
        assert_eq!(self.state, FieldState::Spectral, "{op} requires Spectral state");
    }

    fn assert_compatible(&self, g: &ChebyCoeff, op: &str) {
        assert!(self.congruent(g), "{op}: Chebyshev series are not congruent");
        assert_eq!(self.state, g.state, "{op}: Chebyshev series are in different states");
    }
}

impl Index<usize> for ChebyCoeff {
    type Output = f64;

    #[inline]
    fn index(&self, n: usize) -> &f64 {
        &self.data[n]
    }
}

impl IndexMut<usize> for ChebyCoeff {
    #[inline]
    fn index_mut(&mut self, n: usize) -> &mut f64 {
        &mut self.data[n]
    }
}

impl MulAssign<f64> for ChebyCoeff {
    fn mul_assign(&mut self, c: f64) {
        self.data *= c;
    }
}

impl AddAssign<&ChebyCoeff> for ChebyCoeff {
    fn add_assign(&mut self, g: &ChebyCoeff) {
        self.assert_compatible(g, "add");
        self.data += &g.data;
    }
}

impl SubAssign<&ChebyCoeff> for ChebyCoeff {
    fn sub_assign(&mut self, g: &ChebyCoeff) {
        self.assert_compatible(g, "subtract");
        self.data -= &g.data;
    }
}

/// Pointwise product; both operands must be Physical.
impl MulAssign<&ChebyCoeff> for ChebyCoeff {
    fn mul_assign(&mut self, g: &ChebyCoeff) {
        self.assert_compatible(g, "multiply");
        assert_eq!(self.state, FieldState::Physical, "pointwise product requires Physical state");
        for (x, y) in self.data.as_mut_slice().iter_mut().zip(g.data.as_slice()) {
            *x *= y;
        }
    }
}

// ============================================================================
// Calculus
// ============================================================================

/// Coefficient-space derivative on the unit interval, `df` gets `d/dx f`.
fn diff_coeffs(f: &[f64], df: &mut [f64]) {
    let n = f.len();
    df.fill(0.0);
    if n < 2 {
        return;
    }
    // c_k df_k = df_{k+2} + 2(k+1) f_{k+1}; df_{N-1} = 0.
    for k in (0..n - 1).rev() {
        let upper = if k + 2 < n { df[k + 2] } else { 0.0 };
        df[k] = upper + 2.0 * (k + 1) as f64 * f[k + 1];
    }
    df[0] *= 0.5;
}

/// `df = d/dy f`. Both Spectral; `df` is reshaped to match `f`.
pub fn diff(f: &ChebyCoeff, df: &mut ChebyCoeff) {
    f.assert_spectral("diff");
    if !df.congruent(f) {
        df.reconfig(f);
    }
    diff_coeffs(f.as_slice(), df.as_mut_slice());
    *df *= 2.0 / f.domain_length();
    df.state = FieldState::Spectral;
}

pub fn diff2(f: &ChebyCoeff, d2f: &mut ChebyCoeff) {
    let mut tmp = ChebyCoeff::default();
    diff(f, &mut tmp);
    diff(&tmp, d2f);
}

/// `n`th derivative; `n == 0` copies.
pub fn diff_n(f: &ChebyCoeff, df: &mut ChebyCoeff, n: u32) {
    f.assert_spectral("diff_n");
    *df = f.clone();
    let mut tmp = ChebyCoeff::default();
    for _ in 0..n {
        diff(df, &mut tmp);
        std::mem::swap(df, &mut tmp);
    }
}

/// Antiderivative with the constant chosen so that `mean(f) == 0`.
///
/// `integrate(diff(f))` recovers a zero-mean `f` exactly. The other way
/// round, `diff(integrate(df)) == df` holds only when `df[N-1] == 0`: the
/// `T_N` term it would need has no place in an N-term series, and dropping
/// it shifts every coefficient of the same parity as `N-1` by `-df[N-1]`.
pub fn integrate(df: &ChebyCoeff, f: &mut ChebyCoeff) {
    df.assert_spectral("integrate");
    if !f.congruent(df) {
        f.reconfig(df);
    }
    f.state = FieldState::Spectral;
    let n = df.len();
    f.set_to_zero();
    if n < 2 {
        return;
    }
    let d = df.as_slice();
    let half_length = 0.5 * df.domain_length();
    let out = f.as_mut_slice();
    for k in 1..n {
        let upper = if k + 1 < n { d[k + 1] } else { 0.0 };
        out[k] = half_length * (cheby_c(k - 1) * d[k - 1] - upper) / (2 * k) as f64;
    }
    let mut mean_rest = 0.0;
    for k in (2..n).step_by(2) {
        mean_rest += out[k] / (1.0 - (k * k) as f64);
    }
    out[0] = -mean_rest;
}

impl ChebyCoeff {
    pub fn derivative(&self) -> ChebyCoeff {
        let mut df = ChebyCoeff::default();
        diff(self, &mut df);
        df
    }

    pub fn derivative_n(&self, n: u32) -> ChebyCoeff {
        let mut df = ChebyCoeff::default();
        diff_n(self, &mut df, n);
        df
    }

    pub fn integral(&self) -> ChebyCoeff {
        let mut f = ChebyCoeff::default();
        integrate(self, &mut f);
        f
    }
}

// ============================================================================
// Norms
// ============================================================================

/// `Int_{-1}^{1} f g dx` for coefficient slices.
pub(crate) fn unit_inner_product(f: &[f64], g: &[f64]) -> f64 {
    let mut sum = 0.0;
    for (m, fm) in f.iter().enumerate() {
        if *fm == 0.0 {
            continue;
        }
        let mut row = 0.0;
        for n in (m % 2..g.len()).step_by(2) {
            row += g[n] * cheby_ip(m, n);
        }
        sum += fm * row;
    }
    sum
}

fn spectral_view(f: &ChebyCoeff) -> std::borrow::Cow<'_, ChebyCoeff> {
    if f.state == FieldState::Spectral {
        std::borrow::Cow::Borrowed(f)
    } else {
        let mut copy = f.clone();
        copy.make_spectral();
        std::borrow::Cow::Owned(copy)
    }
}

/// `Int_a^b f g dy`, divided by `b - a` when `normalize`.
pub fn l2_inner_product(f: &ChebyCoeff, g: &ChebyCoeff, normalize: bool) -> f64 {
    assert!(f.congruent(g), "l2_inner_product: Chebyshev series are not congruent");
    let f = spectral_view(f);
    let g = spectral_view(g);
    let ip = unit_inner_product(f.as_slice(), g.as_slice());
    if normalize { 0.5 * ip } else { 0.5 * f.domain_length() * ip }
}

pub fn l2_norm2(f: &ChebyCoeff, normalize: bool) -> f64 {
    l2_inner_product(f, f, normalize)
}

pub fn l2_norm(f: &ChebyCoeff, normalize: bool) -> f64 {
    l2_norm2(f, normalize).max(0.0).sqrt()
}

pub fn l2_dist2(f: &ChebyCoeff, g: &ChebyCoeff, normalize: bool) -> f64 {
    let mut diff = spectral_view(f).into_owned();
    diff -= &*spectral_view(g);
    l2_norm2(&diff, normalize)
}

pub fn l2_dist(f: &ChebyCoeff, g: &ChebyCoeff, normalize: bool) -> f64 {
    l2_dist2(f, g, normalize).max(0.0).sqrt()
}

/// `Int_{-1}^{1} f g / sqrt(1-x^2) dx = pi/2 sum c_n f_n g_n`, divided by pi when `normalize`.
pub fn cheby_inner_product(f: &ChebyCoeff, g: &ChebyCoeff, normalize: bool) -> f64 {
    assert!(f.congruent(g), "cheby_inner_product: Chebyshev series are not congruent");
    let f = spectral_view(f);
    let g = spectral_view(g);
    let sum: f64 = f
        .as_slice()
        .iter()
        .zip(g.as_slice())
        .enumerate()
        .map(|(n, (a, b))| cheby_c(n) * a * b)
        .sum();
    if normalize { 0.5 * sum } else { 0.5 * PI * sum }
}

pub fn cheby_norm2(f: &ChebyCoeff, normalize: bool) -> f64 {
    cheby_inner_product(f, f, normalize)
}

pub fn cheby_norm(f: &ChebyCoeff, normalize: bool) -> f64 {
    cheby_norm2(f, normalize).sqrt()
}

pub fn cheby_dist2(f: &ChebyCoeff, g: &ChebyCoeff, normalize: bool) -> f64 {
    let mut diff = spectral_view(f).into_owned();
    diff -= &*spectral_view(g);
    cheby_norm2(&diff, normalize)
}

pub fn norm2(f: &ChebyCoeff, kind: NormType, normalize: bool) -> f64 {
    match kind {
        NormType::Uniform => l2_norm2(f, normalize),
        NormType::Chebyshev => cheby_norm2(f, normalize),
    }
}

/// Max of `|f|` over the collocation points.
pub fn linf_norm(f: &ChebyCoeff) -> f64 {
    let mut values = f.clone();
    values.make_physical();
    values.data.linf_norm()
}

pub fn linf_dist(f: &ChebyCoeff, g: &ChebyCoeff) -> f64 {
    assert!(f.congruent(g), "linf_dist: Chebyshev series are not congruent");
    let mut fp = f.clone();
    let mut gp = g.clone();
    fp.make_physical();
    gp.make_physical();
    fp.data.linf_dist(&gp.data)
}

// ============================================================================
// Complex-valued series
// ============================================================================

/// Complex Chebyshev series stored as two congruent real series.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComplexChebyCoeff {
    pub re: ChebyCoeff,
    pub im: ChebyCoeff,
}

impl ComplexChebyCoeff {
    pub fn new(n: usize, a: f64, b: f64, state: FieldState) -> Self {
        Self {
            re: ChebyCoeff::new(n, a, b, state),
            im: ChebyCoeff::new(n, a, b, state),
        }
    }

    pub fn from_parts(re: ChebyCoeff, im: ChebyCoeff) -> Self {
        assert!(re.congruent(&im), "real and imaginary parts are not congruent");
        assert_eq!(re.state, im.state, "real and imaginary parts are in different states");
        Self { re, im }
    }

    pub fn truncated(n: usize, g: &ComplexChebyCoeff) -> Self {
        Self {
            re: ChebyCoeff::truncated(n, &g.re),
            im: ChebyCoeff::truncated(n, &g.im),
        }
    }

    pub fn len(&self) -> usize {
        self.re.len()
    }

    pub fn is_empty(&self) -> bool {
        self.re.is_empty()
    }

    pub fn num_modes(&self) -> usize {
        self.re.len()
    }

    pub fn a(&self) -> f64 {
        self.re.a
    }

    pub fn b(&self) -> f64 {
        self.re.b
    }

    pub fn domain_length(&self) -> f64 {
        self.re.domain_length()
    }

    pub fn state(&self) -> FieldState {
        self.re.state
    }

    #[inline]
    pub fn get(&self, n: usize) -> Complex64 {
        Complex64::new(self.re[n], self.im[n])
    }

    #[inline]
    pub fn set(&mut self, n: usize, c: Complex64) {
        self.re[n] = c.re;
        self.im[n] = c.im;
    }

    #[inline]
    pub fn add(&mut self, n: usize, c: Complex64) {
        self.re[n] += c.re;
        self.im[n] += c.im;
    }

    #[inline]
    pub fn sub(&mut self, n: usize, c: Complex64) {
        self.re[n] -= c.re;
        self.im[n] -= c.im;
    }

    pub fn set_state(&mut self, state: FieldState) {
        self.re.set_state(state);
        self.im.set_state(state);
    }

    pub fn set_bounds(&mut self, a: f64, b: f64) {
        self.re.set_bounds(a, b);
        self.im.set_bounds(a, b);
    }

    pub fn set_to_zero(&mut self) {
        self.re.set_to_zero();
        self.im.set_to_zero();
    }

    pub fn resize(&mut self, n: usize) {
        self.re.resize(n);
        self.im.resize(n);
    }

    pub fn congruent(&self, g: &ComplexChebyCoeff) -> bool {
        self.re.congruent(&g.re)
    }

    pub fn reconfig(&mut self, g: &ComplexChebyCoeff) {
        self.re.reconfig(&g.re);
        self.im.reconfig(&g.im);
    }

    pub fn fill(&mut self, g: &ComplexChebyCoeff) {
        self.re.fill(&g.re);
        self.im.fill(&g.im);
    }

    pub fn interpolate(&mut self, g: &ComplexChebyCoeff) {
        self.re.interpolate(&g.re);
        self.im.interpolate(&g.im);
    }

    pub fn reflect(&mut self, g: &ComplexChebyCoeff, parity: Parity) {
        self.re.reflect(&g.re, parity);
        self.im.reflect(&g.im, parity);
    }

    pub fn conjugate(&mut self) {
        self.im *= -1.0;
    }

    pub fn eval(&self, y: f64) -> Complex64 {
        Complex64::new(self.re.eval(y), self.im.eval(y))
    }

    pub fn eval_a(&self) -> Complex64 {
        Complex64::new(self.re.eval_a(), self.im.eval_a())
    }

    pub fn eval_b(&self) -> Complex64 {
        Complex64::new(self.re.eval_b(), self.im.eval_b())
    }

    pub fn slope_a(&self) -> Complex64 {
        Complex64::new(self.re.slope_a(), self.im.slope_a())
    }

    pub fn slope_b(&self) -> Complex64 {
        Complex64::new(self.re.slope_b(), self.im.slope_b())
    }

    pub fn mean(&self) -> Complex64 {
        Complex64::new(self.re.mean(), self.im.mean())
    }

    pub fn chebyfft(&mut self) {
        let plan = ChebyTransform::new(self.len());
        self.chebyfft_with(&plan);
    }

    pub fn ichebyfft(&mut self) {
        let plan = ChebyTransform::new(self.len());
        self.ichebyfft_with(&plan);
    }

    pub fn chebyfft_with(&mut self, plan: &ChebyTransform) {
        self.re.chebyfft_with(plan);
        self.im.chebyfft_with(plan);
    }

    pub fn ichebyfft_with(&mut self, plan: &ChebyTransform) {
        self.re.ichebyfft_with(plan);
        self.im.ichebyfft_with(plan);
    }

    pub fn make_spectral(&mut self) {
        self.re.make_spectral();
        self.im.make_spectral();
    }

    pub fn make_physical(&mut self) {
        self.re.make_physical();
        self.im.make_physical();
    }

    pub fn make_state(&mut self, state: FieldState) {
        self.re.make_state(state);
        self.im.make_state(state);
    }

    /// ASCII save with two columns per line, real then imaginary.
    pub fn save(&self, path: &Path, state: FieldState) -> Result<()> {
        let mut copy = self.clone();
        copy.make_state(state);
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "% {} {:.*e} {:.*e} {}", copy.len(), REAL_DIGITS, copy.a(), REAL_DIGITS, copy.b(), copy.state())?;
        for n in 0..copy.len() {
            writeln!(w, "{:.*e} {:.*e}", REAL_DIGITS, copy.re[n], REAL_DIGITS, copy.im[n])?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn binary_dump<W: Write>(&self, w: &mut W) -> Result<()> {
        self.re.binary_dump(w)?;
        self.im.binary_dump(w)
    }

    pub fn binary_load<R: Read>(r: &mut R) -> Result<Self> {
        let re = ChebyCoeff::binary_load(r)?;
        let im = ChebyCoeff::binary_load(r)?;
        if !re.congruent(&im) || re.state != im.state {
            return Err(SpectralError::Format(
                "real and imaginary parts of complex series disagree".into(),
            ));
        }
        Ok(Self { re, im })
    }
}

impl MulAssign<f64> for ComplexChebyCoeff {
    fn mul_assign(&mut self, c: f64) {
        self.re *= c;
        self.im *= c;
    }
}

impl MulAssign<Complex64> for ComplexChebyCoeff {
    fn mul_assign(&mut self, c: Complex64) {
        for n in 0..self.len() {
            let value = self.get(n) * c;
            self.set(n, value);
        }
    }
}

impl AddAssign<&ComplexChebyCoeff> for ComplexChebyCoeff {
    fn add_assign(&mut self, g: &ComplexChebyCoeff) {
        self.re += &g.re;
        self.im += &g.im;
    }
}

impl SubAssign<&ComplexChebyCoeff> for ComplexChebyCoeff {
    fn sub_assign(&mut self, g: &ComplexChebyCoeff) {
        self.re -= &g.re;
        self.im -= &g.im;
    }
}

/// Pointwise complex product; both operands must be Physical.
impl MulAssign<&ComplexChebyCoeff> for ComplexChebyCoeff {
    fn mul_assign(&mut self, g: &ComplexChebyCoeff) {
        assert!(self.congruent(g), "multiply: complex series are not congruent");
        assert_eq!(self.state(), FieldState::Physical, "pointwise product requires Physical state");
        assert_eq!(g.state(), FieldState::Physical, "pointwise product requires Physical state");
        for n in 0..self.len() {
            let value = self.get(n) * g.get(n);
            self.set(n, value);
        }
    }
}

pub fn diff_complex(f: &ComplexChebyCoeff, df: &mut ComplexChebyCoeff) {
    diff(&f.re, &mut df.re);
    diff(&f.im, &mut df.im);
}

pub fn diff2_complex(f: &ComplexChebyCoeff, d2f: &mut ComplexChebyCoeff) {
    diff2(&f.re, &mut d2f.re);
    diff2(&f.im, &mut d2f.im);
}

pub fn diff_n_complex(f: &ComplexChebyCoeff, df: &mut ComplexChebyCoeff, n: u32) {
    diff_n(&f.re, &mut df.re, n);
    diff_n(&f.im, &mut df.im, n);
}

pub fn integrate_complex(df: &ComplexChebyCoeff, f: &mut ComplexChebyCoeff) {
    integrate(&df.re, &mut f.re);
    integrate(&df.im, &mut f.im);
}

/// `Int_a^b f g* dy`, divided by `b - a` when `normalize`.
pub fn l2_inner_product_complex(
    f: &ComplexChebyCoeff,
    g: &ComplexChebyCoeff,
    normalize: bool,
) -> Complex64 {
    let re = l2_inner_product(&f.re, &g.re, normalize) + l2_inner_product(&f.im, &g.im, normalize);
    let im = l2_inner_product(&f.im, &g.re, normalize) - l2_inner_product(&f.re, &g.im, normalize);
    Complex64::new(re, im)
}

pub fn l2_norm2_complex(f: &ComplexChebyCoeff, normalize: bool) -> f64 {
    l2_norm2(&f.re, normalize) + l2_norm2(&f.im, normalize)
}

pub fn l2_norm_complex(f: &ComplexChebyCoeff, normalize: bool) -> f64 {
    l2_norm2_complex(f, normalize).max(0.0).sqrt()
}

pub fn l2_dist2_complex(f: &ComplexChebyCoeff, g: &ComplexChebyCoeff, normalize: bool) -> f64 {
    l2_dist2(&f.re, &g.re, normalize) + l2_dist2(&f.im, &g.im, normalize)
}

pub fn cheby_norm2_complex(f: &ComplexChebyCoeff, normalize: bool) -> f64 {
    cheby_norm2(&f.re, normalize) + cheby_norm2(&f.im, normalize)
}

pub fn linf_norm_complex(f: &ComplexChebyCoeff) -> f64 {
    let mut values = f.clone();
    values.make_physical();
    (0..values.len())
        .map(|n| values.get(n).norm())
        .fold(0.0, f64::max)
}
