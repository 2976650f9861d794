//! Differential operators and norms on [`FlowField`]s.
//!
//! Derivatives act on fully Spectral fields and return fully Spectral
//! fields. Periodic derivatives multiply each coefficient by the symbol
//! `(2 pi i k / L)^n`; wall-normal derivatives fan out to one Chebyshev
//! differentiation per `(mx, mz, component)` profile, run in parallel.
//!
//! Norms accept any state and transform a copy when needed. Fourier modes
//! with `0 < kz < Nz/2` stand for themselves and their conjugates and are
//! counted twice.

use std::borrow::Cow;

use num_complex::Complex64;
use rayon::prelude::*;

use crate::chebyshev::{diff_n_complex, unit_inner_product, ChebyCoeff, ComplexChebyCoeff};
use crate::field::FlowField;
use crate::grid::FieldGeometry;
use crate::mathdefs::FieldState;

/// Flat index of tensor component `(i, j)` in a 9-component field.
#[inline]
pub fn i3j(i: usize, j: usize) -> usize {
    3 * i + j
}

fn assert_spectral(f: &FlowField, op: &str) {
    assert!(
        f.xz_state() == FieldState::Spectral && f.y_state() == FieldState::Spectral,
        "{op} requires a fully Spectral field"
    );
}

fn with_components(f: &FlowField, nd: usize) -> FlowField {
    let mut geom = *f.geometry();
    geom.nd = nd;
    FlowField::new(geom)
}

// ============================================================================
// Derivatives
// ============================================================================

/// `d^n f / dx^n`.
pub fn xdiff(f: &FlowField, n: u32) -> FlowField {
    assert_spectral(f, "xdiff");
    let mut df = f.clone();
    let (mx_count, mz_count) = (f.mx(), f.mz());
    let symbols: Vec<Complex64> = (0..mx_count).map(|mx| f.dx(mx, n)).collect();
    df.spectral_data_mut()
        .par_chunks_mut(mx_count * mz_count)
        .for_each(|plane| {
            for (mx, sym) in symbols.iter().enumerate() {
                for value in &mut plane[mx * mz_count..(mx + 1) * mz_count] {
                    *value *= sym;
                }
            }
        });
    df
}

/// `d^n f / dz^n`.
pub fn zdiff(f: &FlowField, n: u32) -> FlowField {
    assert_spectral(f, "zdiff");
    let mut df = f.clone();
    let mz_count = f.mz();
    let symbols: Vec<Complex64> = (0..mz_count).map(|mz| f.dz(mz, n)).collect();
    df.spectral_data_mut()
        .par_chunks_mut(mz_count)
        .for_each(|row| {
            for (value, sym) in row.iter_mut().zip(&symbols) {
                *value *= sym;
            }
        });
    df
}

/// `d^n f / dy^n`, one Chebyshev differentiation per profile.
pub fn ydiff(f: &FlowField, n: u32) -> FlowField {
    assert_spectral(f, "ydiff");
    map_profiles(f, |p| {
        let mut dp = ComplexChebyCoeff::default();
        diff_n_complex(p, &mut dp, n);
        dp
    })
}

/// `d^n f / dx_i^n` with `x_0 = x`, `x_1 = y`, `x_2 = z`.
pub fn diff(f: &FlowField, i: usize, n: u32) -> FlowField {
    match i {
        0 => xdiff(f, n),
        1 => ydiff(f, n),
        2 => zdiff(f, n),
        _ => panic!("derivative direction {i} is not 0, 1 or 2"),
    }
}

/// Mixed derivative `d^(nx+ny+nz) f / dx^nx dy^ny dz^nz`.
pub fn diff_mixed(f: &FlowField, nx: u32, ny: u32, nz: u32) -> FlowField {
    let mut df = f.clone();
    if nx > 0 {
        df = xdiff(&df, nx);
    }
    if ny > 0 {
        df = ydiff(&df, ny);
    }
    if nz > 0 {
        df = zdiff(&df, nz);
    }
    df
}

/// Apply `op` to every `(mx, mz, component)` profile in parallel.
fn map_profiles(f: &FlowField, op: impl Fn(&ComplexChebyCoeff) -> ComplexChebyCoeff + Sync) -> FlowField {
    let (mx_count, mz_count, nd) = (f.mx(), f.mz(), f.nd());
    let results: Vec<ComplexChebyCoeff> = (0..nd * mx_count * mz_count)
        .into_par_iter()
        .map(|p| {
            let (i, rest) = (p / (mx_count * mz_count), p % (mx_count * mz_count));
            op(&f.profile(rest / mz_count, rest % mz_count, i))
        })
        .collect();
    let mut out = FlowField::zeros_like(f);
    for (p, profile) in results.iter().enumerate() {
        let (i, rest) = (p / (mx_count * mz_count), p % (mx_count * mz_count));
        out.set_profile(rest / mz_count, rest % mz_count, i, profile);
    }
    out
}

/// Scalar to vector (`Nd = 1 -> 3`) or vector to tensor (`3 -> 9`, component
/// `i3j(i, j)` holding `d f_i / dx_j`).
pub fn grad(f: &FlowField) -> FlowField {
    assert_spectral(f, "grad");
    assert!(f.nd() == 1 || f.nd() == 3, "grad needs a scalar or 3-vector field, got Nd = {}", f.nd());
    let out_nd = 3 * f.nd();
    let mut g = with_components(f, out_nd);
    for i in 0..f.nd() {
        let fi = f.component(i);
        for j in 0..3 {
            let k = if f.nd() == 1 { j } else { i3j(i, j) };
            g.set_component(k, &diff(&fi, j, 1));
        }
    }
    g
}

/// `div f` of a 3-vector field.
pub fn div(f: &FlowField) -> FlowField {
    assert_spectral(f, "div");
    assert_eq!(f.nd(), 3, "div needs a 3-vector field");
    let mut d = xdiff(&f.component(0), 1);
    d += &ydiff(&f.component(1), 1);
    d += &zdiff(&f.component(2), 1);
    d
}

/// `curl f` of a 3-vector field.
pub fn curl(f: &FlowField) -> FlowField {
    assert_spectral(f, "curl");
    assert_eq!(f.nd(), 3, "curl needs a 3-vector field");
    let (u, v, w) = (f.component(0), f.component(1), f.component(2));
    let mut out = with_components(f, 3);

    let mut c0 = ydiff(&w, 1);
    c0 -= &zdiff(&v, 1);
    let mut c1 = zdiff(&u, 1);
    c1 -= &xdiff(&w, 1);
    let mut c2 = xdiff(&v, 1);
    c2 -= &ydiff(&u, 1);

    out.set_component(0, &c0);
    out.set_component(1, &c1);
    out.set_component(2, &c2);
    out
}

/// Componentwise Laplacian.
pub fn lapl(f: &FlowField) -> FlowField {
    assert_spectral(f, "lapl");
    let mut out = ydiff(f, 2);
    let (mx_count, mz_count) = (f.mx(), f.mz());
    let symbols: Vec<Complex64> = (0..mx_count * mz_count)
        .map(|k| f.dx(k / mz_count, 2) + f.dz(k % mz_count, 2))
        .collect();
    let src = f.spectral_data();
    out.spectral_data_mut()
        .par_chunks_mut(mx_count * mz_count)
        .enumerate()
        .for_each(|(plane, dst)| {
            let offset = plane * mx_count * mz_count;
            for (k, value) in dst.iter_mut().enumerate() {
                *value += symbols[k] * src[offset + k];
            }
        });
    out
}

// ============================================================================
// Pointwise products
// ============================================================================

fn physical_copy(f: &FlowField) -> FlowField {
    let mut p = f.clone();
    p.make_physical();
    p
}

/// Evaluate `op` at each gridpoint of `f` and `g` and return the `nd`-component
/// result in `f`'s states.
fn pointwise(
    f: &FlowField,
    g: &FlowField,
    nd: usize,
    op: impl Fn(&[f64], &[f64], &mut [f64]) + Sync,
) -> FlowField {
    assert!(f.geom_congruent(g), "pointwise product of incongruent fields");
    let (fp, gp) = (physical_copy(f), physical_copy(g));
    let mut geom: FieldGeometry = *f.geometry();
    geom.nd = nd;
    let mut out = FlowField::with_state(geom, FieldState::Physical, FieldState::Physical);

    let npts = f.nx() * f.ny() * f.nz();
    let (fd, gd) = (fp.physical_data(), gp.physical_data());
    let (fnd, gnd) = (f.nd(), g.nd());
    let values: Vec<Vec<f64>> = (0..npts)
        .into_par_iter()
        .map(|q| {
            let fv: Vec<f64> = (0..fnd).map(|i| fd[q + npts * i]).collect();
            let gv: Vec<f64> = (0..gnd).map(|i| gd[q + npts * i]).collect();
            let mut r = vec![0.0; nd];
            op(&fv, &gv, &mut r);
            r
        })
        .collect();
    let od = out.physical_data_mut();
    for (q, r) in values.iter().enumerate() {
        for (i, value) in r.iter().enumerate() {
            od[q + npts * i] = *value;
        }
    }
    out.make_state(f.xz_state(), f.y_state());
    out
}

pub fn cross(f: &FlowField, g: &FlowField) -> FlowField {
    assert!(f.nd() == 3 && g.nd() == 3, "cross product needs two 3-vector fields");
    pointwise(f, g, 3, |a, b, r| {
        r[0] = a[1] * b[2] - a[2] * b[1];
        r[1] = a[2] * b[0] - a[0] * b[2];
        r[2] = a[0] * b[1] - a[1] * b[0];
    })
}

pub fn dot(f: &FlowField, g: &FlowField) -> FlowField {
    assert_eq!(f.nd(), g.nd(), "dot product needs equal component counts");
    pointwise(f, g, 1, |a, b, r| {
        r[0] = a.iter().zip(b).map(|(x, y)| x * y).sum();
    })
}

/// Pointwise `|f|^2`.
pub fn norm2(f: &FlowField) -> FlowField {
    dot(f, f)
}

/// Pointwise `|f|`.
pub fn norm(f: &FlowField) -> FlowField {
    pointwise(f, f, 1, |a, _, r| {
        r[0] = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    })
}

/// Outer product with component `i * g.nd() + j` holding `f_i g_j`; for two
/// 3-vectors that is [`i3j`]`(i, j)`.
pub fn outer(f: &FlowField, g: &FlowField) -> FlowField {
    let gnd = g.nd();
    pointwise(f, g, f.nd() * gnd, |a, b, r| {
        for (i, ai) in a.iter().enumerate() {
            for (j, bj) in b.iter().enumerate() {
                r[i * gnd + j] = ai * bj;
            }
        }
    })
}

/// `(u . grad) v` for a 3-vector `u` and a scalar or 3-vector `v`.
pub fn dotgrad(u: &FlowField, v: &FlowField) -> FlowField {
    assert_eq!(u.nd(), 3, "dotgrad needs a 3-vector advecting field");
    let grad_v = grad(&spectral_view(v));
    let nd = v.nd();
    pointwise(u, &grad_v, nd, |a, g, r| {
        for (i, ri) in r.iter_mut().enumerate() {
            *ri = (0..3).map(|j| a[j] * g[3 * i + j]).sum();
        }
    })
}

/// Pointwise kinetic energy density `|u|^2 / 2`.
pub fn energy(u: &FlowField) -> FlowField {
    let mut e = norm2(u);
    e *= 0.5;
    e
}

/// Energy density of the total velocity `u + U(y) e_x`.
pub fn energy_with_base(u: &FlowField, base: &ChebyCoeff) -> FlowField {
    let mut total = spectral_view(u).into_owned();
    let mut base = base.clone();
    base.make_spectral();
    total.add_mean_profile(&base);
    energy(&total)
}

// ============================================================================
// Norms
// ============================================================================

fn spectral_view(f: &FlowField) -> Cow<'_, FlowField> {
    if f.xz_state() == FieldState::Spectral && f.y_state() == FieldState::Spectral {
        Cow::Borrowed(f)
    } else {
        let mut copy = f.clone();
        copy.make_spectral();
        Cow::Owned(copy)
    }
}

/// Parseval weight of z mode `mz`.
fn mode_weight(f: &FlowField, mz: usize) -> f64 {
    if mz == 0 || (f.nz() % 2 == 0 && mz == f.nz() / 2) { 1.0 } else { 2.0 }
}

/// Modes `(mx, mz)` entering a norm, restricted to `|kx| <= kxmax`, `kz <= kzmax`.
fn retained_modes(f: &FlowField, kxmax: i64, kzmax: i64) -> Vec<(usize, usize)> {
    let mut modes = Vec::new();
    for mx in 0..f.mx() {
        if f.kx(mx).abs() > kxmax {
            continue;
        }
        for mz in 0..f.mz() {
            if f.kz(mz) <= kzmax {
                modes.push((mx, mz));
            }
        }
    }
    modes
}

/// `sum_modes w_k Re Int f_k conj(g_k) dy`, scaled per `normalize`.
fn spectral_inner_product(f: &FlowField, g: &FlowField, kxmax: i64, kzmax: i64, normalize: bool) -> f64 {
    assert!(f.congruent(g), "inner product of incongruent fields");
    let (f, g) = (spectral_view(f), spectral_view(g));
    let (kxmax, kzmax) = if f.padded() && g.padded() {
        (kxmax.min(f.kxmax_dealiased()), kzmax.min(f.kzmax_dealiased()))
    } else {
        (kxmax, kzmax)
    };
    let modes = retained_modes(&f, kxmax, kzmax);
    let ny = f.ny();
    let sum: f64 = (0..f.nd())
        .into_par_iter()
        .map(|i| {
            let mut acc = 0.0;
            let mut buf = [vec![0.0; ny], vec![0.0; ny], vec![0.0; ny], vec![0.0; ny]];
            for &(mx, mz) in &modes {
                for my in 0..ny {
                    let (a, b) = (f.cmplx(mx, my, mz, i), g.cmplx(mx, my, mz, i));
                    buf[0][my] = a.re;
                    buf[1][my] = a.im;
                    buf[2][my] = b.re;
                    buf[3][my] = b.im;
                }
                let ip = unit_inner_product(&buf[0], &buf[2]) + unit_inner_product(&buf[1], &buf[3]);
                acc += mode_weight(&f, mz) * ip;
            }
            acc
        })
        .sum();
    // Int_a^b dy = (L/2) Int_{-1}^{1} dx
    let ly = f.ly();
    if normalize {
        0.5 * sum
    } else {
        0.5 * ly * sum * f.lx() * f.lz()
    }
}

/// `Int |f|^2 dx dy dz`, divided by the volume when `normalize`.
pub fn l2_norm2(f: &FlowField, normalize: bool) -> f64 {
    spectral_inner_product(f, f, i64::MAX, i64::MAX, normalize)
}

pub fn l2_norm(f: &FlowField, normalize: bool) -> f64 {
    l2_norm2(f, normalize).max(0.0).sqrt()
}

/// Norm over the modes with `|kx| <= kxmax` and `kz <= kzmax`.
pub fn l2_norm2_truncated(f: &FlowField, kxmax: i64, kzmax: i64, normalize: bool) -> f64 {
    spectral_inner_product(f, f, kxmax, kzmax, normalize)
}

pub fn l2_inner_product(f: &FlowField, g: &FlowField, normalize: bool) -> f64 {
    spectral_inner_product(f, g, i64::MAX, i64::MAX, normalize)
}

pub fn l2_inner_product_truncated(f: &FlowField, g: &FlowField, kxmax: i64, kzmax: i64, normalize: bool) -> f64 {
    spectral_inner_product(f, g, kxmax, kzmax, normalize)
}

/// `f - g`, fully Spectral.
fn difference(f: &FlowField, g: &FlowField) -> FlowField {
    let mut d = spectral_view(f).into_owned();
    d -= &*spectral_view(g);
    d
}

pub fn l2_dist2(f: &FlowField, g: &FlowField, normalize: bool) -> f64 {
    l2_norm2(&difference(f, g), normalize)
}

pub fn l2_dist(f: &FlowField, g: &FlowField, normalize: bool) -> f64 {
    l2_dist2(f, g, normalize).max(0.0).sqrt()
}

pub fn l2_norm_truncated(f: &FlowField, kxmax: i64, kzmax: i64, normalize: bool) -> f64 {
    l2_norm2_truncated(f, kxmax, kzmax, normalize).max(0.0).sqrt()
}

/// Distance over the modes with `|kx| <= kxmax` and `kz <= kzmax`.
pub fn l2_dist2_truncated(f: &FlowField, g: &FlowField, kxmax: i64, kzmax: i64, normalize: bool) -> f64 {
    l2_norm2_truncated(&difference(f, g), kxmax, kzmax, normalize)
}

pub fn l2_dist_truncated(f: &FlowField, g: &FlowField, kxmax: i64, kzmax: i64, normalize: bool) -> f64 {
    l2_dist2_truncated(f, g, kxmax, kzmax, normalize).max(0.0).sqrt()
}

/// `Int sum_i |f_i| dx dy dz`, divided by the volume when `normalize`.
///
/// The integrand is formed at the gridpoints and integrated through its
/// Chebyshev interpolant, so it is exact only when `sum_i |f_i|` is a
/// polynomial of degree below `Ny` in y.
pub fn l1_norm(f: &FlowField, normalize: bool) -> f64 {
    let mut abs_sum = pointwise(f, f, 1, |a, _, r| {
        r[0] = a.iter().map(|x| x.abs()).sum();
    });
    abs_sum.make_spectral();
    let mean = abs_sum.mean_profile(0).mean();
    if normalize { mean } else { mean * f.lx() * f.ly() * f.lz() }
}

pub fn l1_dist(f: &FlowField, g: &FlowField, normalize: bool) -> f64 {
    l1_norm(&difference(f, g), normalize)
}

/// Chebyshev-weighted norm, `sum_modes w_k pi/2 sum_n c_n |f_kn|^2`.
pub fn cheby_norm2(f: &FlowField, normalize: bool) -> f64 {
    let f = spectral_view(f);
    let modes = retained_modes(&f, i64::MAX, i64::MAX);
    let mut sum = 0.0;
    for i in 0..f.nd() {
        for &(mx, mz) in &modes {
            let w = mode_weight(&f, mz);
            for my in 0..f.ny() {
                let c = if my == 0 { 2.0 } else { 1.0 };
                sum += w * c * f.cmplx(mx, my, mz, i).norm_sqr();
            }
        }
    }
    if normalize {
        0.5 * sum
    } else {
        0.5 * std::f64::consts::PI * sum * f.lx() * f.lz()
    }
}

pub fn cheby_norm(f: &FlowField, normalize: bool) -> f64 {
    cheby_norm2(f, normalize).sqrt()
}

pub fn cheby_dist2(f: &FlowField, g: &FlowField, normalize: bool) -> f64 {
    cheby_norm2(&difference(f, g), normalize)
}

pub fn cheby_dist(f: &FlowField, g: &FlowField, normalize: bool) -> f64 {
    cheby_dist2(f, g, normalize).sqrt()
}

/// Squared norm of the boundary values `f(x, a, z)` and `f(x, b, z)`.
pub fn bc_norm2(f: &FlowField, normalize: bool) -> f64 {
    let f = spectral_view(f);
    let modes = retained_modes(&f, i64::MAX, i64::MAX);
    let mut sum = 0.0;
    for i in 0..f.nd() {
        for &(mx, mz) in &modes {
            let p = f.profile(mx, mz, i);
            sum += mode_weight(&f, mz) * (p.eval_a().norm_sqr() + p.eval_b().norm_sqr());
        }
    }
    if normalize { sum } else { sum * f.lx() * f.lz() }
}

pub fn bc_norm(f: &FlowField, normalize: bool) -> f64 {
    bc_norm2(f, normalize).sqrt()
}

pub fn bc_dist2(f: &FlowField, g: &FlowField, normalize: bool) -> f64 {
    bc_norm2(&difference(f, g), normalize)
}

pub fn bc_dist(f: &FlowField, g: &FlowField, normalize: bool) -> f64 {
    bc_dist2(f, g, normalize).sqrt()
}

pub fn div_norm2(f: &FlowField, normalize: bool) -> f64 {
    l2_norm2(&div(&spectral_view(f)), normalize)
}

pub fn div_norm(f: &FlowField, normalize: bool) -> f64 {
    div_norm2(f, normalize).max(0.0).sqrt()
}

pub fn div_dist2(f: &FlowField, g: &FlowField, normalize: bool) -> f64 {
    div_norm2(&difference(f, g), normalize)
}

pub fn div_dist(f: &FlowField, g: &FlowField, normalize: bool) -> f64 {
    div_dist2(f, g, normalize).max(0.0).sqrt()
}

/// Mean enstrophy `||curl u||^2`, the viscous dissipation rate per unit
/// viscosity of a velocity field with no-slip walls.
pub fn dissipation(u: &FlowField, normalize: bool) -> f64 {
    l2_norm2(&curl(&spectral_view(u)), normalize)
}

/// Max of `|f_i|` over gridpoints and components.
pub fn linf_norm(f: &FlowField) -> f64 {
    physical_copy(f)
        .physical_data()
        .par_iter()
        .map(|x| x.abs())
        .reduce(|| 0.0, f64::max)
}

pub fn linf_dist(f: &FlowField, g: &FlowField) -> f64 {
    assert!(f.congruent(g), "linf_dist of incongruent fields");
    let (fp, gp) = (physical_copy(f), physical_copy(g));
    fp.physical_data()
        .par_iter()
        .zip(gp.physical_data().par_iter())
        .map(|(a, b)| (a - b).abs())
        .reduce(|| 0.0, f64::max)
}
