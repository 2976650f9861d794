#![cfg(test)]

use std::f64::consts::PI;
use std::io::Cursor;

use num_complex::Complex64;

use super::chebyshev::{
    cheby_ip, cheby_norm2, chebypoints, chebyshev, diff, diff2, integrate, l2_dist,
    l2_inner_product_complex, l2_norm2, l2_norm2_complex, linf_norm, ChebyCoeff,
    ComplexChebyCoeff,
};
use super::mathdefs::{FieldState, Parity};

fn scratch_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("chanspec-{}-{name}", std::process::id()))
}

#[test]
fn chebypoints_run_from_b_down_to_a() {
    let y = chebypoints(5, 0.0, 2.0);
    assert!((y[0] - 2.0).abs() < 1e-15);
    assert!((y[2] - 1.0).abs() < 1e-15);
    assert!((y[4] - 0.0).abs() < 1e-15);
}

#[test]
fn cheby_ip_matches_quadrature_of_low_modes() {
    // Int T_0 T_0 = 2, Int T_1 T_1 = 2/3, Int T_0 T_2 = -2/3
    assert!((cheby_ip(0, 0) - 2.0).abs() < 1e-15);
    assert!((cheby_ip(1, 1) - 2.0 / 3.0).abs() < 1e-15);
    assert!((cheby_ip(0, 2) + 2.0 / 3.0).abs() < 1e-15);
    assert_eq!(cheby_ip(1, 2), 0.0);
    assert!((chebyshev(3, 0.5) - (4.0 * 0.125 - 1.5)).abs() < 1e-15);
}

#[test]
fn transform_round_trip_restores_gridpoint_values() {
    let y = chebypoints(17, -1.0, 1.0);
    let values: Vec<f64> = y.as_slice().iter().map(|&v| (3.0 * v).sin() + v * v).collect();
    let mut f = ChebyCoeff::from_vec(values.clone(), -1.0, 1.0, FieldState::Physical);
    f.make_spectral();
    assert_eq!(f.state(), FieldState::Spectral);
    f.make_physical();
    for (got, want) in f.as_slice().iter().zip(&values) {
        assert!((got - want).abs() < 1e-13);
    }
}

#[test]
fn derivative_of_parabola_at_half_is_one() {
    let f = ChebyCoeff::from_fn(8, -1.0, 1.0, |y| y * y);
    let mut df = ChebyCoeff::default();
    diff(&f, &mut df);
    assert!((df.eval(0.5) - 1.0).abs() < 1e-13);
}

#[test]
fn derivative_scales_with_domain_length() {
    let f = ChebyCoeff::from_fn(12, 0.0, 3.0, |y| y * y * y);
    let mut d2f = ChebyCoeff::default();
    diff2(&f, &mut d2f);
    assert!((d2f.eval(2.0) - 12.0).abs() < 1e-11);
    assert!((f.derivative_n(3).eval(0.7) - 6.0).abs() < 1e-10);
}

#[test]
fn integrate_inverts_diff_on_zero_mean_series() {
    let f = ChebyCoeff::from_fn(16, -1.0, 1.0, |y| (2.0 * y).sin());
    let df = f.derivative();
    let mut g = ChebyCoeff::default();
    integrate(&df, &mut g);
    assert!(g.mean().abs() < 1e-14);
    assert!(l2_dist(&f, &g, true) < 1e-12);
}

#[test]
fn diff_of_integral_is_exact_when_top_coefficient_vanishes() {
    let mut data: Vec<f64> = (0..8).map(|k| 1.0 / (1.0 + k as f64)).collect();
    data[7] = 0.0;
    let df = ChebyCoeff::from_vec(data, -1.0, 1.0, FieldState::Spectral);
    let back = df.integral().derivative();
    for k in 0..8 {
        assert!((back[k] - df[k]).abs() < 1e-14, "k = {k}");
    }
}

#[test]
fn diff_of_integral_loses_the_top_coefficient_on_its_parity() {
    let data: Vec<f64> = (0..8).map(|k| 1.0 / (1.0 + k as f64)).collect();
    let df = ChebyCoeff::from_vec(data, -1.0, 1.0, FieldState::Spectral);
    let back = df.integral().derivative();
    for k in 0..8 {
        let shift = if k % 2 == 1 { -df[7] } else { 0.0 };
        assert!((back[k] - df[k] - shift).abs() < 1e-14, "k = {k}");
    }
}

#[test]
fn integral_has_zero_mean_and_correct_slope() {
    let f = ChebyCoeff::from_fn(10, 1.0, 2.0, |y| y);
    let g = f.integral();
    assert!(g.mean().abs() < 1e-14);
    assert!((g.derivative().eval(1.5) - 1.5).abs() < 1e-12);
}

#[test]
fn mean_boundary_values_and_slopes_match_closed_forms() {
    let f = ChebyCoeff::from_fn(8, 0.0, 2.0, |y| y * y * y);
    assert!((f.mean() - 2.0).abs() < 1e-13);
    assert!((f.eval_a() - 0.0).abs() < 1e-13);
    assert!((f.eval_b() - 8.0).abs() < 1e-12);
    assert!(f.slope_a().abs() < 1e-11);
    assert!((f.slope_b() - 12.0).abs() < 1e-11);
    assert!((f.eval(1.0) - f.eval_points(&[1.0])[0]).abs() < 1e-15);
}

#[test]
fn norms_follow_normalisation_convention() {
    let f = ChebyCoeff::from_fn(4, -1.0, 1.0, |y| y);
    assert!((l2_norm2(&f, true) - 1.0 / 3.0).abs() < 1e-14);
    assert!((l2_norm2(&f, false) - 2.0 / 3.0).abs() < 1e-14);
    assert!((cheby_norm2(&f, true) - 0.5).abs() < 1e-14);
    assert!((cheby_norm2(&f, false) - 0.5 * PI).abs() < 1e-14);
    assert!((linf_norm(&f) - 1.0).abs() < 1e-14);
}

#[test]
fn reflect_mirrors_about_domain_midpoint() {
    let g = ChebyCoeff::from_fn(6, 0.0, 2.0, |y| y);
    let mut odd = ChebyCoeff::default();
    odd.reflect(&g, Parity::Odd);
    assert!((odd.eval(0.5) - (0.5 - 2.0)).abs() < 1e-13);

    let mut even = ChebyCoeff::default();
    even.reflect(&g, Parity::Even);
    assert!((even.eval(0.5) - 1.5).abs() < 1e-13);
}

#[test]
fn interpolate_restricts_to_subdomain() {
    let g = ChebyCoeff::from_fn(9, -1.0, 1.0, |y| y * y);
    let mut f = ChebyCoeff::new(5, 0.0, 1.0, FieldState::Spectral);
    f.interpolate(&g);
    assert_eq!(f.state(), FieldState::Spectral);
    assert!((f.eval(0.3) - 0.09).abs() < 1e-13);
}

#[test]
#[should_panic(expected = "eval requires Spectral state")]
fn eval_rejects_physical_series() {
    let f = ChebyCoeff::new(4, -1.0, 1.0, FieldState::Physical);
    let _ = f.eval(0.0);
}

#[test]
#[should_panic(expected = "not congruent")]
fn adding_series_on_different_domains_panics() {
    let mut f = ChebyCoeff::new(4, -1.0, 1.0, FieldState::Spectral);
    let g = ChebyCoeff::new(4, 0.0, 1.0, FieldState::Spectral);
    f += &g;
}

#[test]
fn ascii_save_load_preserves_header_and_values() {
    let path = scratch_path("cheby.asc");
    let f = ChebyCoeff::from_fn(7, 0.5, 1.5, |y| (y - 1.0).exp());
    f.save(&path, FieldState::Spectral).unwrap();
    let loaded = ChebyCoeff::load(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert!(loaded.congruent(&f));
    assert_eq!(loaded.state(), FieldState::Spectral);
    for n in 0..f.len() {
        assert!((loaded[n] - f[n]).abs() < 1e-15 * f[0].abs().max(1.0));
    }
}

#[test]
fn binary_dump_load_is_exact() {
    let f = ChebyCoeff::from_fn(6, -2.0, 3.0, |y| y.cos());
    let mut bytes = Vec::new();
    f.binary_dump(&mut bytes).unwrap();
    let loaded = ChebyCoeff::binary_load(&mut Cursor::new(bytes)).unwrap();
    assert_eq!(loaded, f);
}

#[test]
fn complex_series_norms_combine_both_parts() {
    let re = ChebyCoeff::from_fn(5, -1.0, 1.0, |y| y);
    let im = ChebyCoeff::from_fn(5, -1.0, 1.0, |_| 1.0);
    let mut f = ComplexChebyCoeff::from_parts(re, im);
    assert!((l2_norm2_complex(&f, true) - (1.0 / 3.0 + 1.0)).abs() < 1e-14);

    let ip = l2_inner_product_complex(&f, &f, true);
    assert!((ip.re - l2_norm2_complex(&f, true)).abs() < 1e-14);
    assert!(ip.im.abs() < 1e-14);

    f.conjugate();
    assert!((f.eval(0.0) - Complex64::new(0.0, -1.0)).norm() < 1e-14);
    f *= Complex64::new(0.0, 1.0);
    assert!((f.eval(0.5) - Complex64::new(1.0, 0.5)).norm() < 1e-14);
}
