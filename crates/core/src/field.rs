//! Fourier x Chebyshev x Fourier expansion of a vector-valued field.
//!
//! The xz transform and the y transform are independent: a field carries one
//! [`FieldState`] for the periodic pair and one for the wall-normal
//! direction, and may sit in any of the four combinations.
//!
//! Storage follows the xz state. In Physical xz state the buffer is real,
//! indexed `nz + Nz*(nx + Nx*(ny + Ny*i))`; in Spectral xz state it is
//! complex, indexed `mz + Mz*(mx + Nx*(my + Ny*i))` with `Mz = Nz/2 + 1`
//! (negative kz are the complex conjugates of positive ones). Each xz
//! transform rebuilds the buffer in the other representation.
//!
//! The real accessor [`FlowField::at`] panics unless the xz state is
//! Physical; the complex accessor [`FlowField::cmplx`] panics unless it is
//! Spectral. The y state never changes which accessor applies.

use std::f64::consts::PI;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::ops::{AddAssign, MulAssign, SubAssign};
use std::path::Path;
use std::sync::Arc;

use num_complex::Complex64;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::buffer::Vector;
use crate::chebyshev::{chebypoints, ChebyCoeff, ComplexChebyCoeff};
use crate::error::{Result, SpectralError};
use crate::grid::FieldGeometry;
use crate::mathdefs::{self, zero_last_mode, FieldState};
use crate::profiler::{start_timer, stop_timer};
use crate::transform::{ChebyTransform, TransformPlans};

const BINARY_MAGIC: &[u8; 8] = b"CHSPFF01";

/// The field's storage, tagged by xz state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldData {
    Physical(Vec<f64>),
    Spectral(Vec<Complex64>),
}

impl FieldData {
    pub fn state(&self) -> FieldState {
        match self {
            FieldData::Physical(_) => FieldState::Physical,
            FieldData::Spectral(_) => FieldState::Spectral,
        }
    }

    fn zeros(geom: &FieldGeometry, xz: FieldState) -> Self {
        match xz {
            FieldState::Physical => FieldData::Physical(vec![0.0; geom.physical_len()]),
            FieldState::Spectral => FieldData::Spectral(vec![Complex64::default(); geom.spectral_len()]),
        }
    }
}

/// Self-describing container for JSON persistence.
#[derive(Serialize, Deserialize)]
struct FieldRecord {
    geometry: FieldGeometry,
    y_state: FieldState,
    padded: bool,
    data: FieldData,
}

#[derive(Debug, Clone)]
pub struct FlowField {
    geom: FieldGeometry,
    data: FieldData,
    ystate: FieldState,
    padded: bool,
    plans: Arc<TransformPlans>,
}

impl PartialEq for FlowField {
    fn eq(&self, other: &Self) -> bool {
        self.geom == other.geom
            && self.ystate == other.ystate
            && self.padded == other.padded
            && self.data == other.data
    }
}

impl FlowField {
    /// Zero field, Spectral in both xz and y.
    pub fn new(geom: FieldGeometry) -> Self {
        Self::with_state(geom, FieldState::Spectral, FieldState::Spectral)
    }

    pub fn with_state(geom: FieldGeometry, xz: FieldState, y: FieldState) -> Self {
        geom.validate();
        Self {
            data: FieldData::zeros(&geom, xz),
            ystate: y,
            padded: false,
            plans: TransformPlans::acquire(geom.nx, geom.ny, geom.nz),
            geom,
        }
    }

    /// Physical field sampled from `f(i, x, y, z)`.
    pub fn from_fn(geom: FieldGeometry, f: impl Fn(usize, f64, f64, f64) -> f64) -> Self {
        let mut u = Self::with_state(geom, FieldState::Physical, FieldState::Physical);
        let (x, y, z) = (u.x_gridpts(), u.y_gridpts(), u.z_gridpts());
        for i in 0..geom.nd {
            for ny in 0..geom.ny {
                for nx in 0..geom.nx {
                    for nz in 0..geom.nz {
                        *u.at_mut(nx, ny, nz, i) = f(i, x[nx], y[ny], z[nz]);
                    }
                }
            }
        }
        u
    }

    /// Zero field with `u`'s geometry and states.
    pub fn zeros_like(u: &FlowField) -> Self {
        Self::with_state(u.geom, u.xz_state(), u.ystate)
    }

    /// Take `u`'s geometry and states, discarding current content.
    pub fn reconfig(&mut self, u: &FlowField) {
        *self = Self::zeros_like(u);
    }

    /// New geometry, zero content, Spectral in both directions.
    pub fn resize(&mut self, geom: FieldGeometry) {
        *self = Self::new(geom);
    }

    /// Change the periodic lengths, keeping the coefficients.
    pub fn rescale(&mut self, lx: f64, lz: f64) {
        assert!(lx > 0.0 && lz > 0.0, "periodic lengths must be positive");
        self.geom.lx = lx;
        self.geom.lz = lz;
    }

    // ------------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------------

    pub fn geometry(&self) -> &FieldGeometry {
        &self.geom
    }

    pub fn nx(&self) -> usize {
        self.geom.nx
    }

    pub fn ny(&self) -> usize {
        self.geom.ny
    }

    pub fn nz(&self) -> usize {
        self.geom.nz
    }

    pub fn nd(&self) -> usize {
        self.geom.nd
    }

    pub fn mx(&self) -> usize {
        self.geom.nx
    }

    pub fn my(&self) -> usize {
        self.geom.ny
    }

    pub fn mz(&self) -> usize {
        self.geom.mz()
    }

    pub fn lx(&self) -> f64 {
        self.geom.lx
    }

    pub fn ly(&self) -> f64 {
        self.geom.b - self.geom.a
    }

    pub fn lz(&self) -> f64 {
        self.geom.lz
    }

    pub fn a(&self) -> f64 {
        self.geom.a
    }

    pub fn b(&self) -> f64 {
        self.geom.b
    }

    pub fn xz_state(&self) -> FieldState {
        self.data.state()
    }

    pub fn y_state(&self) -> FieldState {
        self.ystate
    }

    /// `true` when the modes flagged by [`Self::is_aliased`] are known to be
    /// zero. Transforms keep the flag; writes through
    /// [`Self::physical_data_mut`] that fill those modes must clear it with
    /// [`Self::set_padded`].
    pub fn padded(&self) -> bool {
        self.padded
    }

    pub fn set_padded(&mut self, padded: bool) {
        self.padded = padded;
    }

    pub fn geom_congruent(&self, u: &FlowField) -> bool {
        self.geom.geom_congruent(&u.geom)
    }

    pub fn congruent(&self, u: &FlowField) -> bool {
        self.geom.congruent(&u.geom)
    }

    /// Relabel the states; only the y label may change without reallocating,
    /// so a differing xz label zeroes the buffer in the new representation.
    pub fn set_state(&mut self, xz: FieldState, y: FieldState) {
        if xz != self.xz_state() {
            self.data = FieldData::zeros(&self.geom, xz);
        }
        self.ystate = y;
    }

    pub fn assert_state(&self, xz: FieldState, y: FieldState) {
        assert!(
            self.xz_state() == xz && self.ystate == y,
            "field is in state ({}, {}), expected ({xz}, {y})",
            self.xz_state(),
            self.ystate
        );
    }

    // ------------------------------------------------------------------------
    // Wavenumbers
    // ------------------------------------------------------------------------

    /// Wavenumber of x mode index `mx`.
    #[inline]
    pub fn kx(&self, mx: usize) -> i64 {
        debug_assert!(mx < self.geom.nx);
        self.geom.kx(mx)
    }

    #[inline]
    pub fn kz(&self, mz: usize) -> i64 {
        debug_assert!(mz < self.mz());
        self.geom.kz(mz)
    }

    /// Array index of wavenumber `kx`.
    #[inline]
    pub fn mx_index(&self, kx: i64) -> usize {
        assert!(
            kx >= self.kxmin() && kx <= self.kxmax(),
            "kx = {kx} is outside [{}, {}]",
            self.kxmin(),
            self.kxmax()
        );
        if kx >= 0 { kx as usize } else { (kx + self.geom.nx as i64) as usize }
    }

    #[inline]
    pub fn mz_index(&self, kz: i64) -> usize {
        assert!(kz >= 0 && kz <= self.kzmax(), "kz = {kz} is outside [0, {}]", self.kzmax());
        kz as usize
    }

    pub fn kxmax(&self) -> i64 {
        (self.geom.nx / 2) as i64
    }

    pub fn kxmin(&self) -> i64 {
        (self.geom.nx / 2 + 1) as i64 - self.geom.nx as i64
    }

    pub fn kzmax(&self) -> i64 {
        (self.geom.nz / 2) as i64
    }

    pub fn kzmin(&self) -> i64 {
        0
    }

    pub fn kxmax_dealiased(&self) -> i64 {
        (self.geom.nx / 3) as i64 - 1
    }

    pub fn kxmin_dealiased(&self) -> i64 {
        -self.kxmax_dealiased()
    }

    pub fn kzmax_dealiased(&self) -> i64 {
        (self.geom.nz / 3) as i64 - 1
    }

    pub fn kzmin_dealiased(&self) -> i64 {
        0
    }

    /// 2/3-rule test: `true` for modes zeroed by dealiasing.
    pub fn is_aliased(&self, kx: i64, kz: i64) -> bool {
        kx.abs() > self.kxmax_dealiased() || kz.abs() > self.kzmax_dealiased()
    }

    // ------------------------------------------------------------------------
    // Coordinates and spectral symbols
    // ------------------------------------------------------------------------

    pub fn x(&self, nx: usize) -> f64 {
        nx as f64 * self.geom.lx / self.geom.nx as f64
    }

    pub fn y(&self, ny: usize) -> f64 {
        let (a, b) = (self.geom.a, self.geom.b);
        if self.geom.ny == 1 {
            return 0.5 * (a + b);
        }
        0.5 * ((b + a) + (b - a) * (PI * ny as f64 / (self.geom.ny - 1) as f64).cos())
    }

    pub fn z(&self, nz: usize) -> f64 {
        nz as f64 * self.geom.lz / self.geom.nz as f64
    }

    pub fn x_gridpts(&self) -> Vector {
        Vector::from_vec((0..self.geom.nx).map(|n| self.x(n)).collect())
    }

    pub fn y_gridpts(&self) -> Vector {
        chebypoints(self.geom.ny, self.geom.a, self.geom.b)
    }

    pub fn z_gridpts(&self) -> Vector {
        Vector::from_vec((0..self.geom.nz).map(|n| self.z(n)).collect())
    }

    /// Symbol of `d^n/dx^n` on x mode `mx`, with the odd-order Nyquist mode zeroed.
    pub fn dx(&self, mx: usize, n: u32) -> Complex64 {
        let kx = self.kx(mx);
        let ik = Complex64::new(0.0, 2.0 * PI * kx as f64 / self.geom.lx);
        ik.powu(n) * zero_last_mode(kx, self.kxmax(), n)
    }

    /// Symbol of `d^n/dz^n` on z mode `mz`.
    pub fn dz(&self, mz: usize, n: u32) -> Complex64 {
        let kz = self.kz(mz);
        let ik = Complex64::new(0.0, 2.0 * PI * kz as f64 / self.geom.lz);
        ik.powu(n) * zero_last_mode(kz, self.kzmax(), n)
    }

    // ------------------------------------------------------------------------
    // Element access
    // ------------------------------------------------------------------------

    #[inline]
    fn flatten(&self, nx: usize, ny: usize, nz: usize, i: usize) -> usize {
        let g = &self.geom;
        debug_assert!(nx < g.nx && ny < g.ny && nz < g.nz && i < g.nd);
        nz + g.nz * (nx + g.nx * (ny + g.ny * i))
    }

    #[inline]
    fn complex_flatten(&self, mx: usize, my: usize, mz: usize, i: usize) -> usize {
        let g = &self.geom;
        debug_assert!(mx < g.nx && my < g.ny && mz < g.mz() && i < g.nd);
        mz + g.mz() * (mx + g.nx * (my + g.ny * i))
    }

    pub fn physical_data(&self) -> &[f64] {
        match &self.data {
            FieldData::Physical(v) => v,
            FieldData::Spectral(_) => panic!("real-valued access requires Physical xz state"),
        }
    }

    pub fn physical_data_mut(&mut self) -> &mut [f64] {
        match &mut self.data {
            FieldData::Physical(v) => v,
            FieldData::Spectral(_) => panic!("real-valued access requires Physical xz state"),
        }
    }

    pub fn spectral_data(&self) -> &[Complex64] {
        match &self.data {
            FieldData::Spectral(v) => v,
            FieldData::Physical(_) => panic!("complex-valued access requires Spectral xz state"),
        }
    }

    pub fn spectral_data_mut(&mut self) -> &mut [Complex64] {
        match &mut self.data {
            FieldData::Spectral(v) => v,
            FieldData::Physical(_) => panic!("complex-valued access requires Spectral xz state"),
        }
    }

    /// Gridpoint value (xz Physical).
    #[inline]
    pub fn at(&self, nx: usize, ny: usize, nz: usize, i: usize) -> f64 {
        let idx = self.flatten(nx, ny, nz, i);
        self.physical_data()[idx]
    }

    #[inline]
    pub fn at_mut(&mut self, nx: usize, ny: usize, nz: usize, i: usize) -> &mut f64 {
        let idx = self.flatten(nx, ny, nz, i);
        &mut self.physical_data_mut()[idx]
    }

    /// Fourier coefficient (xz Spectral).
    #[inline]
    pub fn cmplx(&self, mx: usize, my: usize, mz: usize, i: usize) -> Complex64 {
        let idx = self.complex_flatten(mx, my, mz, i);
        self.spectral_data()[idx]
    }

    #[inline]
    pub fn cmplx_mut(&mut self, mx: usize, my: usize, mz: usize, i: usize) -> &mut Complex64 {
        let idx = self.complex_flatten(mx, my, mz, i);
        &mut self.spectral_data_mut()[idx]
    }

    /// The y profile of mode `(mx, mz)`, component `i`, in the current y state.
    pub fn profile(&self, mx: usize, mz: usize, i: usize) -> ComplexChebyCoeff {
        let mut p = ComplexChebyCoeff::new(self.geom.ny, self.geom.a, self.geom.b, self.ystate);
        for my in 0..self.geom.ny {
            p.set(my, self.cmplx(mx, my, mz, i));
        }
        p
    }

    pub fn set_profile(&mut self, mx: usize, mz: usize, i: usize, p: &ComplexChebyCoeff) {
        assert_eq!(p.len(), self.geom.ny, "profile length must match Ny");
        assert_eq!(p.state(), self.ystate, "profile and field y states differ");
        for my in 0..self.geom.ny {
            *self.cmplx_mut(mx, my, mz, i) = p.get(my);
        }
    }

    /// Component `i` as a scalar field.
    pub fn component(&self, i: usize) -> FlowField {
        assert!(i < self.geom.nd, "component {i} out of range for Nd = {}", self.geom.nd);
        let mut geom = self.geom;
        geom.nd = 1;
        let mut u = Self::with_state(geom, self.xz_state(), self.ystate);
        u.padded = self.padded;
        match (&self.data, &mut u.data) {
            (FieldData::Physical(src), FieldData::Physical(dst)) => {
                let n = dst.len();
                dst.copy_from_slice(&src[i * n..(i + 1) * n]);
            }
            (FieldData::Spectral(src), FieldData::Spectral(dst)) => {
                let n = dst.len();
                dst.copy_from_slice(&src[i * n..(i + 1) * n]);
            }
            _ => unreachable!("component shares the source's xz state"),
        }
        u
    }

    /// Overwrite component `i` with the scalar field `u`.
    pub fn set_component(&mut self, i: usize, u: &FlowField) {
        assert!(i < self.geom.nd, "component {i} out of range for Nd = {}", self.geom.nd);
        assert!(self.geom_congruent(u) && u.nd() == 1, "set_component needs a congruent scalar field");
        assert!(
            self.xz_state() == u.xz_state() && self.ystate == u.ystate,
            "set_component: fields are in different states"
        );
        match (&mut self.data, &u.data) {
            (FieldData::Physical(dst), FieldData::Physical(src)) => {
                let n = src.len();
                dst[i * n..(i + 1) * n].copy_from_slice(src);
            }
            (FieldData::Spectral(dst), FieldData::Spectral(src)) => {
                let n = src.len();
                dst[i * n..(i + 1) * n].copy_from_slice(src);
            }
            _ => unreachable!("states were checked above"),
        }
    }

    pub fn set_to_zero(&mut self) {
        match &mut self.data {
            FieldData::Physical(v) => v.fill(0.0),
            FieldData::Spectral(v) => v.fill(Complex64::default()),
        }
    }

    /// Exchange the contents of two congruent fields.
    pub fn swap(&mut self, u: &mut FlowField) {
        assert!(self.congruent(u), "swap requires congruent fields");
        std::mem::swap(self, u);
    }

    // ------------------------------------------------------------------------
    // Transforms
    // ------------------------------------------------------------------------

    pub fn make_spectral_xz(&mut self) {
        let FieldData::Physical(real) = &self.data else {
            return;
        };
        start_timer("field_xz_forward");
        let plans = &self.plans;
        let (nx, nz, mz) = (self.geom.nx, self.geom.nz, self.geom.mz());
        let mut spectral = vec![Complex64::default(); self.geom.spectral_len()];
        real.par_chunks(nx * nz)
            .zip(spectral.par_chunks_mut(nx * mz))
            .for_each(|(r, s)| plans.forward_xz(r, s));
        self.data = FieldData::Spectral(spectral);
        stop_timer("field_xz_forward");
    }

    pub fn make_physical_xz(&mut self) {
        let FieldData::Spectral(spectral) = &self.data else {
            return;
        };
        start_timer("field_xz_inverse");
        let plans = &self.plans;
        let (nx, nz, mz) = (self.geom.nx, self.geom.nz, self.geom.mz());
        let mut real = vec![0.0; self.geom.physical_len()];
        spectral
            .par_chunks(nx * mz)
            .zip(real.par_chunks_mut(nx * nz))
            .for_each(|(s, r)| plans.inverse_xz(s, r));
        self.data = FieldData::Physical(real);
        stop_timer("field_xz_inverse");
    }

    pub fn make_spectral_y(&mut self) {
        if self.ystate == FieldState::Spectral {
            return;
        }
        self.transform_y(|plan, v| plan.forward(v));
        self.ystate = FieldState::Spectral;
    }

    pub fn make_physical_y(&mut self) {
        if self.ystate == FieldState::Physical {
            return;
        }
        self.transform_y(|plan, v| plan.backward(v));
        self.ystate = FieldState::Physical;
    }

    pub fn make_spectral(&mut self) {
        self.make_spectral_xz();
        self.make_spectral_y();
    }

    pub fn make_physical(&mut self) {
        self.make_physical_y();
        self.make_physical_xz();
    }

    /// Transform only the directions whose state differs from the target.
    pub fn make_state(&mut self, xz: FieldState, y: FieldState) {
        match xz {
            FieldState::Physical => self.make_physical_xz(),
            FieldState::Spectral => self.make_spectral_xz(),
        }
        match y {
            FieldState::Physical => self.make_physical_y(),
            FieldState::Spectral => self.make_spectral_y(),
        }
    }

    /// Apply a 1-D Chebyshev transform to every y profile: gather in
    /// parallel, transform, scatter back.
    fn transform_y(&mut self, op: impl Fn(&ChebyTransform, &mut [f64]) + Sync) {
        start_timer("field_y_transform");
        let plan = self.plans.cheby();
        let ny = self.geom.ny;
        match &mut self.data {
            FieldData::Physical(buf) => {
                let plane = self.geom.nx * self.geom.nz;
                let src: &[f64] = buf;
                let profiles: Vec<Vec<f64>> = (0..plane * self.geom.nd)
                    .into_par_iter()
                    .map(|p| {
                        let base = p % plane + plane * ny * (p / plane);
                        let mut prof: Vec<f64> = (0..ny).map(|n| src[base + plane * n]).collect();
                        op(plan, &mut prof);
                        prof
                    })
                    .collect();
                for (p, prof) in profiles.iter().enumerate() {
                    let base = p % plane + plane * ny * (p / plane);
                    for (n, value) in prof.iter().enumerate() {
                        buf[base + plane * n] = *value;
                    }
                }
            }
            FieldData::Spectral(buf) => {
                let plane = self.geom.nx * self.geom.mz();
                let src: &[Complex64] = buf;
                let profiles: Vec<Vec<Complex64>> = (0..plane * self.geom.nd)
                    .into_par_iter()
                    .map(|p| {
                        let base = p % plane + plane * ny * (p / plane);
                        let mut re: Vec<f64> = (0..ny).map(|n| src[base + plane * n].re).collect();
                        let mut im: Vec<f64> = (0..ny).map(|n| src[base + plane * n].im).collect();
                        op(plan, &mut re);
                        op(plan, &mut im);
                        re.into_iter().zip(im).map(|(r, i)| Complex64::new(r, i)).collect()
                    })
                    .collect();
                for (p, prof) in profiles.iter().enumerate() {
                    let base = p % plane + plane * ny * (p / plane);
                    for (n, value) in prof.iter().enumerate() {
                        buf[base + plane * n] = *value;
                    }
                }
            }
        }
        stop_timer("field_y_transform");
    }

    // ------------------------------------------------------------------------
    // Dealiasing and remapping
    // ------------------------------------------------------------------------

    /// Zero all modes flagged by [`Self::is_aliased`] and mark the field padded.
    pub fn zero_padded_modes(&mut self) {
        assert_eq!(self.xz_state(), FieldState::Spectral, "zero_padded_modes requires Spectral xz state");
        for mx in 0..self.mx() {
            let kx = self.kx(mx);
            for mz in 0..self.mz() {
                if !self.is_aliased(kx, self.kz(mz)) {
                    continue;
                }
                for i in 0..self.nd() {
                    for my in 0..self.my() {
                        *self.cmplx_mut(mx, my, mz, i) = Complex64::default();
                    }
                }
            }
        }
        self.padded = true;
    }

    /// Set `self` to `u` on `self`'s grid: modes present in both are copied,
    /// the rest are zero. The y direction is truncated, zero-padded or
    /// re-expanded onto a subdomain as needed. States of `self` are kept.
    pub fn interpolate(&mut self, u: &FlowField) {
        assert!(
            self.lx() == u.lx() && self.lz() == u.lz() && self.nd() == u.nd(),
            "interpolate requires equal periodic lengths and component counts"
        );
        let (xz, y) = (self.xz_state(), self.ystate);
        let mut src = u.clone();
        src.make_spectral();
        self.data = FieldData::zeros(&self.geom, FieldState::Spectral);
        self.ystate = FieldState::Spectral;

        let same_y = self.a() == src.a() && self.b() == src.b();
        let resized_x = self.nx() != src.nx();
        let resized_z = self.nz() != src.nz();
        // Nyquist modes of an even grid have no partner on a resized grid.
        let unpaired = |k: i64, kmax_a: i64, n_a: usize, kmax_b: i64, n_b: usize| {
            (k.abs() == kmax_a && n_a % 2 == 0) || (k.abs() == kmax_b && n_b % 2 == 0)
        };

        for mx in 0..self.mx() {
            let kx = self.kx(mx);
            if kx < src.kxmin() || kx > src.kxmax() {
                continue;
            }
            if resized_x && unpaired(kx, self.kxmax(), self.nx(), src.kxmax(), src.nx()) {
                continue;
            }
            let smx = src.mx_index(kx);
            for mz in 0..self.mz().min(src.mz()) {
                let kz = self.kz(mz);
                if resized_z && unpaired(kz, self.kzmax(), self.nz(), src.kzmax(), src.nz()) {
                    continue;
                }
                for i in 0..self.nd() {
                    let profile = src.profile(smx, mz, i);
                    let mut p = ComplexChebyCoeff::new(self.ny(), self.a(), self.b(), FieldState::Spectral);
                    if same_y {
                        p.fill(&profile);
                    } else {
                        p.interpolate(&profile);
                    }
                    self.set_profile(mx, mz, i, &p);
                }
            }
        }
        self.padded = false;
        self.make_state(xz, y);
    }

    // ------------------------------------------------------------------------
    // Mean-profile arithmetic
    // ------------------------------------------------------------------------

    fn shift_mean(&mut self, profile: &ChebyCoeff, sign: f64) {
        assert_eq!(profile.len(), self.ny(), "profile length must match Ny");
        assert!(
            profile.a() == self.a() && profile.b() == self.b(),
            "profile domain must match the field"
        );
        assert_eq!(profile.state(), self.ystate, "profile and field y states differ");
        match self.xz_state() {
            FieldState::Spectral => {
                for my in 0..self.ny() {
                    self.cmplx_mut(0, my, 0, 0).re += sign * profile[my];
                }
            }
            FieldState::Physical => {
                for ny in 0..self.ny() {
                    for nx in 0..self.nx() {
                        for nz in 0..self.nz() {
                            *self.at_mut(nx, ny, nz, 0) += sign * profile[ny];
                        }
                    }
                }
            }
        }
    }

    /// `u(., y, ., 0) += U(y)`.
    pub fn add_mean_profile(&mut self, profile: &ChebyCoeff) {
        self.shift_mean(profile, 1.0);
    }

    pub fn sub_mean_profile(&mut self, profile: &ChebyCoeff) {
        self.shift_mean(profile, -1.0);
    }

    /// Real part of the `(0,0)` mode of component `i`, fully Spectral.
    pub fn mean_profile(&self, i: usize) -> ChebyCoeff {
        self.assert_state(FieldState::Spectral, FieldState::Spectral);
        self.profile(0, 0, i).re
    }

    // ------------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------------

    /// Kinetic energy `1/2 ||u||^2`, per unit volume when `normalize`.
    pub fn energy(&self, normalize: bool) -> f64 {
        0.5 * crate::diffops::l2_norm2(self, normalize)
    }

    /// Energy in Fourier mode `(mx, mz)`, counting its conjugate partner.
    pub fn mode_energy(&self, mx: usize, mz: usize, normalize: bool) -> f64 {
        self.assert_state(FieldState::Spectral, FieldState::Spectral);
        let nyquist = self.nz() % 2 == 0 && mz == self.nz() / 2;
        let weight = if mz == 0 || nyquist { 1.0 } else { 2.0 };
        let mut sum = 0.0;
        for i in 0..self.nd() {
            sum += crate::chebyshev::l2_norm2_complex(&self.profile(mx, mz, i), normalize);
        }
        let volume = if normalize { 1.0 } else { self.lx() * self.lz() };
        0.5 * weight * volume * sum
    }

    /// Wall shear `dU/dy` of the streamwise mean at `a`.
    pub fn dudy_a(&self) -> f64 {
        self.mean_profile(0).slope_a()
    }

    pub fn dudy_b(&self) -> f64 {
        self.mean_profile(0).slope_b()
    }

    /// `max (|u|/dx + |v|/dy + |w|/dz)` over the grid, with the local
    /// Chebyshev spacing for `dy`.
    pub fn cfl_factor(&self) -> f64 {
        self.cfl_factor_with_base(None)
    }

    /// As [`Self::cfl_factor`] with a streamwise base flow `U(y)` added.
    pub fn cfl_factor_with_base(&self, base: Option<&ChebyCoeff>) -> f64 {
        assert!(self.nd() >= 3, "CFL factor needs a 3-component velocity field");
        let mut u = self.clone();
        u.make_physical();
        let y = u.y_gridpts();
        let base_values = base.map(|profile| {
            let mut p = profile.clone();
            p.make_physical();
            p
        });
        let dx = self.lx() / self.nx() as f64;
        let dz = self.lz() / self.nz() as f64;
        let mut cfl = 0.0_f64;
        for ny in 0..self.ny() {
            let below = if ny + 1 < self.ny() { (y[ny] - y[ny + 1]).abs() } else { f64::INFINITY };
            let above = if ny > 0 { (y[ny - 1] - y[ny]).abs() } else { f64::INFINITY };
            let dy = below.min(above);
            let ubase = base_values.as_ref().map_or(0.0, |p| p[ny]);
            for nx in 0..self.nx() {
                for nz in 0..self.nz() {
                    let local = (u.at(nx, ny, nz, 0) + ubase).abs() / dx
                        + u.at(nx, ny, nz, 1).abs() / dy
                        + u.at(nx, ny, nz, 2).abs() / dz;
                    cfl = cfl.max(local);
                }
            }
        }
        cfl
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    /// Save as JSON if the path ends in `.json`, otherwise as binary `.ff`.
    pub fn save(&self, path: &Path) -> Result<()> {
        if path.extension().is_some_and(|ext| ext == "json") {
            self.save_json(path)
        } else {
            let mut w = BufWriter::new(File::create(path)?);
            self.binary_dump(&mut w)?;
            w.flush()?;
            Ok(())
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::load_json(path)
        } else {
            let mut r = BufReader::new(File::open(path)?);
            Self::binary_load(&mut r)
        }
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let record = FieldRecord {
            geometry: self.geom,
            y_state: self.ystate,
            padded: self.padded,
            data: self.data.clone(),
        };
        let w = BufWriter::new(File::create(path)?);
        serde_json::to_writer(w, &record)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let record: FieldRecord = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        Self::from_parts(record.geometry, record.y_state, record.padded, record.data)
    }

    /// Buffer length a persisted geometry implies, rejecting unusable headers.
    fn stored_len(geom: &FieldGeometry, xz: FieldState) -> Result<usize> {
        if geom.nx == 0 || geom.ny == 0 || geom.nz == 0 || geom.nd == 0 {
            return Err(SpectralError::Format(format!("zero dimension in field geometry {geom:?}")));
        }
        if !(geom.b > geom.a) || !(geom.lx > 0.0 && geom.lz > 0.0) || !geom.lx.is_finite() || !geom.lz.is_finite() {
            return Err(SpectralError::Format(format!("bad domain in field geometry {geom:?}")));
        }
        geom.checked_len(xz)
            .ok_or_else(|| SpectralError::Format(format!("field size overflows for geometry {geom:?}")))
    }

    fn from_parts(geom: FieldGeometry, ystate: FieldState, padded: bool, data: FieldData) -> Result<Self> {
        let expected = Self::stored_len(&geom, data.state())?;
        let found = match &data {
            FieldData::Physical(v) => v.len(),
            FieldData::Spectral(v) => v.len(),
        };
        if found != expected {
            return Err(SpectralError::Format(format!(
                "field data of length {found} does not fit geometry {geom:?}"
            )));
        }
        Ok(Self {
            plans: TransformPlans::acquire(geom.nx, geom.ny, geom.nz),
            geom,
            data,
            ystate,
            padded,
        })
    }

    pub fn binary_dump<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(BINARY_MAGIC)?;
        for n in [self.geom.nx, self.geom.ny, self.geom.nz, self.geom.nd] {
            mathdefs::write_usize(w, n)?;
        }
        for x in [self.geom.lx, self.geom.lz, self.geom.a, self.geom.b] {
            mathdefs::write_f64(w, x)?;
        }
        mathdefs::write_bool(w, self.padded)?;
        mathdefs::write_state(w, self.xz_state())?;
        mathdefs::write_state(w, self.ystate)?;
        match &self.data {
            FieldData::Physical(v) => v.iter().try_for_each(|&x| mathdefs::write_f64(w, x)),
            FieldData::Spectral(v) => v.iter().try_for_each(|&z| mathdefs::write_complex(w, z)),
        }
    }

    pub fn binary_load<R: Read>(r: &mut R) -> Result<Self> {
        let mut magic = [0u8; 8];
        r.read_exact(&mut magic)?;
        if &magic != BINARY_MAGIC {
            return Err(SpectralError::Format("not a flow field file".into()));
        }
        let nx = mathdefs::read_usize(r)?;
        let ny = mathdefs::read_usize(r)?;
        let nz = mathdefs::read_usize(r)?;
        let nd = mathdefs::read_usize(r)?;
        let lx = mathdefs::read_f64(r)?;
        let lz = mathdefs::read_f64(r)?;
        let a = mathdefs::read_f64(r)?;
        let b = mathdefs::read_f64(r)?;
        let padded = mathdefs::read_bool(r)?;
        let xz = mathdefs::read_state(r)?;
        let ystate = mathdefs::read_state(r)?;
        let geom = FieldGeometry::new(nx, ny, nz, nd, lx, lz, a, b);

        let n = Self::stored_len(&geom, xz)?;
        let data = match xz {
            FieldState::Physical => FieldData::Physical(mathdefs::read_values(r, n, mathdefs::read_f64)?),
            FieldState::Spectral => FieldData::Spectral(mathdefs::read_values(r, n, mathdefs::read_complex)?),
        };
        Self::from_parts(geom, ystate, padded, data)
    }

    /// ASCII save of one mode's profile, component by component.
    pub fn save_profile(&self, mx: usize, mz: usize, i: usize, path: &Path) -> Result<()> {
        self.profile(mx, mz, i).save(path, FieldState::Physical)
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

impl MulAssign<f64> for FlowField {
    fn mul_assign(&mut self, c: f64) {
        match &mut self.data {
            FieldData::Physical(v) => v.par_iter_mut().for_each(|x| *x *= c),
            FieldData::Spectral(v) => v.par_iter_mut().for_each(|x| *x *= c),
        }
    }
}

/// Complex scaling of the coefficients (xz Spectral).
impl MulAssign<Complex64> for FlowField {
    fn mul_assign(&mut self, c: Complex64) {
        self.spectral_data_mut().par_iter_mut().for_each(|x| *x *= c);
    }
}

impl FlowField {
    fn assert_same_layout(&self, u: &FlowField, op: &str) {
        assert!(self.congruent(u), "{op}: fields are not congruent");
        assert!(
            self.xz_state() == u.xz_state() && self.ystate == u.ystate,
            "{op}: fields are in different states"
        );
    }
}

impl AddAssign<&FlowField> for FlowField {
    fn add_assign(&mut self, u: &FlowField) {
        self.assert_same_layout(u, "add");
        match (&mut self.data, &u.data) {
            (FieldData::Physical(a), FieldData::Physical(b)) => {
                a.par_iter_mut().zip(b.par_iter()).for_each(|(x, y)| *x += y)
            }
            (FieldData::Spectral(a), FieldData::Spectral(b)) => {
                a.par_iter_mut().zip(b.par_iter()).for_each(|(x, y)| *x += y)
            }
            _ => unreachable!("states were checked above"),
        }
        self.padded = self.padded && u.padded;
    }
}

impl SubAssign<&FlowField> for FlowField {
    fn sub_assign(&mut self, u: &FlowField) {
        self.assert_same_layout(u, "subtract");
        match (&mut self.data, &u.data) {
            (FieldData::Physical(a), FieldData::Physical(b)) => {
                a.par_iter_mut().zip(b.par_iter()).for_each(|(x, y)| *x -= y)
            }
            (FieldData::Spectral(a), FieldData::Spectral(b)) => {
                a.par_iter_mut().zip(b.par_iter()).for_each(|(x, y)| *x -= y)
            }
            _ => unreachable!("states were checked above"),
        }
        self.padded = self.padded && u.padded;
    }
}
