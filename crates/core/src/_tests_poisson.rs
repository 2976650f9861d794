#![cfg(test)]

use std::f64::consts::PI;

use super::diffops::{grad, l2_dist, lapl};
use super::field::FlowField;
use super::grid::FieldGeometry;
use super::poisson::{PoissonSolver, PressureSolver};

const LX: f64 = 2.0 * PI;
const LZ: f64 = PI;

fn geometry(nd: usize) -> FieldGeometry {
    FieldGeometry::new(8, 17, 8, nd, LX, LZ, -1.0, 1.0)
}

fn spectral(geom: FieldGeometry, f: impl Fn(usize, f64, f64, f64) -> f64) -> FlowField {
    let mut u = FlowField::from_fn(geom, f);
    u.make_spectral();
    u
}

#[test]
fn one_helmholtz_solver_per_mode_with_wavenumber_lambda() {
    let solver = PoissonSolver::new(geometry(1)).unwrap();
    let h = solver.helmholtz(1, 2);
    let expected = 1.0 + (2.0 * PI * 2.0 / LZ).powi(2);
    assert!((h.lambda() - expected).abs() < 1e-12);
    assert_eq!(solver.helmholtz(0, 0).lambda(), 0.0);
    // mx = 7 is kx = -1
    assert!((solver.helmholtz(7, 0).lambda() - 1.0).abs() < 1e-12);
}

#[test]
fn poisson_solve_recovers_field_with_zero_wall_values() {
    let geom = geometry(2);
    let u = spectral(geom, |i, x, y, z| {
        (1.0 - y * y) * ((x + i as f64).sin() * (2.0 * z).cos() + 0.5 * y)
    });
    let f = lapl(&u);

    let solver = PoissonSolver::new(geom).unwrap();
    let solved = solver.solve(&f).unwrap();
    assert!(l2_dist(&solved, &u, true) < 1e-11);
    assert!(solver.verify(&solved, &f) < 1e-10);
}

#[test]
fn poisson_solve_imposes_prescribed_wall_values() {
    let geom = geometry(1);
    let u = spectral(geom, |_, x, y, z| (y + 1.0) * x.cos() + 0.5 * y * y + (2.0 * z).sin() * y);
    let f = lapl(&u);

    let solver = PoissonSolver::for_field(&u).unwrap();
    let solved = solver.solve_with_bc(&f, &u).unwrap();
    assert!(l2_dist(&solved, &u, true) < 1e-11);
    assert!(solver.verify_with_bc(&solved, &f, &u) < 1e-10);
}

#[test]
#[should_panic(expected = "does not match")]
fn mismatched_geometry_is_rejected() {
    let solver = PoissonSolver::new(geometry(1)).unwrap();
    let f = FlowField::new(FieldGeometry::new(8, 13, 8, 1, LX, LZ, -1.0, 1.0));
    let _ = solver.solve(&f);
}

#[test]
#[should_panic(expected = "expected (Spectral, Spectral)")]
fn physical_right_hand_side_is_rejected() {
    let solver = PoissonSolver::new(geometry(1)).unwrap();
    let f = FlowField::from_fn(geometry(1), |_, _, _, _| 0.0);
    let _ = solver.solve(&f);
}

/// Pressure with `dp/dy = 0` at both walls and zero mean.
fn neumann_pressure(_: usize, x: f64, y: f64, z: f64) -> f64 {
    (y * y * y / 3.0 - y) * x.cos() * (2.0 * z).cos() + y.powi(4) / 4.0 - y * y / 2.0 + 7.0 / 60.0
}

#[test]
fn pressure_solve_recovers_gradient_driven_pressure() {
    let geom = geometry(3);
    // v = 0, so the wall Neumann data nu v'' vanish.
    let u = spectral(geom, |i, _, y, z| if i == 0 { (1.0 - y * y) * (2.0 * z).cos() } else { 0.0 });
    let p_exact = spectral(FieldGeometry { nd: 1, ..geom }, neumann_pressure);
    let mut nonl = grad(&p_exact);
    nonl *= -1.0;

    let solver = PressureSolver::new(geom, 0.01).unwrap();
    assert_eq!(solver.nu(), 0.01);
    let p = solver.solve(&u, &nonl).unwrap();
    assert_eq!(p.nd(), 1);
    assert!(l2_dist(&p, &p_exact, true) < 1e-10);
    assert!(solver.verify(&p, &u, &nonl) < 1e-9);
    assert!(p.mean_profile(0).mean().abs() < 1e-13);
}

#[test]
fn pressure_matches_viscous_wall_slope() {
    let geom = geometry(3);
    let nu = 0.5;
    // v = (1 - y^2)^2 cos(x): v'' = 12y^2 - 4, so nu v''(+-1) = 4 cos(x).
    let u = spectral(geom, |i, x, y, _| if i == 1 { (1.0 - y * y).powi(2) * x.cos() } else { 0.0 });
    let nonl = FlowField::new(geom);

    let solver = PressureSolver::for_field(&u, nu).unwrap();
    let p = solver.solve(&u, &nonl).unwrap();
    assert!(solver.verify(&p, &u, &nonl) < 1e-9);

    // p'' - p = 0 in the kx = 1 mode with p'(+-1) = 4, so p = 4 sinh(y) / cosh(1).
    // The kx = 1 coefficient carries half the amplitude.
    let profile = p.profile(1, 0, 0);
    let expected = 0.5 * 4.0 * 0.3_f64.sinh() / 1.0_f64.cosh();
    assert!((profile.eval(0.3).re - expected).abs() < 1e-10);
}
