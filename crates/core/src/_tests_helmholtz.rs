#![cfg(test)]

use num_complex::Complex64;

use super::chebyshev::{ChebyCoeff, ComplexChebyCoeff};
use super::helmholtz::HelmholtzSolver;
use super::mathdefs::FieldState;

#[test]
fn homogeneous_problem_matches_sinh_profile() {
    let n = 16;
    let solver = HelmholtzSolver::new(n, -1.0, 1.0, 4.0, 1.0).unwrap();
    let f = ChebyCoeff::new(n, -1.0, 1.0, FieldState::Spectral);
    let u = solver.solve(&f, 1.0, 0.0).unwrap();

    let exact = |y: f64| (2.0 * (1.0 - y)).sinh() / 4.0_f64.sinh();
    for &y in &[-0.9, -0.4, 0.0, 0.3, 0.8] {
        assert!((u.eval(y) - exact(y)).abs() < 1e-8, "y = {y}");
    }
    assert!((u.eval_a() - 1.0).abs() < 1e-13);
    assert!(u.eval_b().abs() < 1e-13);
}

#[test]
fn constant_forcing_gives_cosh_solution_with_small_residual() {
    let n = 24;
    let lambda = 1.0;
    let solver = HelmholtzSolver::new(n, -1.0, 1.0, lambda, 1.0).unwrap();
    let mut f = ChebyCoeff::new(n, -1.0, 1.0, FieldState::Spectral);
    f[0] = 1.0;
    let u = solver.solve(&f, 0.0, 0.0).unwrap();

    assert!(solver.residual(&u, &f, 0.0, 0.0) < 1e-10);
    let exact = |y: f64| -1.0 + y.cosh() / 1.0_f64.cosh();
    for &y in &[-0.5, 0.0, 0.25] {
        assert!((u.eval(y) - exact(y)).abs() < 1e-12);
    }
}

#[test]
fn viscosity_and_domain_length_are_scaled_into_the_operator() {
    // nu u'' - lambda u = 0 with nu = 0.5, lambda = 2 on [0, 2]: u = exp(2y) profile.
    let n = 30;
    let solver = HelmholtzSolver::new(n, 0.0, 2.0, 2.0, 0.5).unwrap();
    let f = ChebyCoeff::new(n, 0.0, 2.0, FieldState::Spectral);
    let ub = 4.0_f64.exp();
    let u = solver.solve(&f, 1.0, ub).unwrap();
    assert!((u.eval(1.0) - 2.0_f64.exp()).abs() < 1e-9);
    assert!(solver.verify(&u, &f, 1.0, ub, 1e-9) < 1e-9);
}

#[test]
fn mean_constrained_solve_finds_the_pressure_gradient() {
    // u'' - mu = 0, u(+-1) = 0, mean(u) = 1  =>  u = 1.5 (1 - y^2), mu = -3.
    let n = 9;
    let solver = HelmholtzSolver::new(n, -1.0, 1.0, 0.0, 1.0).unwrap();
    let f = ChebyCoeff::new(n, -1.0, 1.0, FieldState::Spectral);
    let (u, mu) = solver.solve_with_mean(&f, 1.0, 0.0, 0.0).unwrap();

    assert!((mu + 3.0).abs() < 1e-12);
    assert!((u.mean() - 1.0).abs() < 1e-13);
    assert!((u.eval(0.0) - 1.5).abs() < 1e-12);
    assert!(solver.residual_with_mean(&u, mu, &f, 1.0, 0.0, 0.0) < 1e-12);
}

#[test]
fn complex_solve_treats_parts_independently() {
    let n = 12;
    let solver = HelmholtzSolver::new(n, -1.0, 1.0, 3.0, 1.0).unwrap();
    let re = ChebyCoeff::from_fn(n, -1.0, 1.0, |y| y * y);
    let im = ChebyCoeff::from_fn(n, -1.0, 1.0, |y| -y);
    let f = ComplexChebyCoeff::from_parts(re.clone(), im);
    let ua = Complex64::new(0.5, -1.0);
    let ub = Complex64::new(0.0, 2.0);

    let u = solver.solve_complex(&f, ua, ub).unwrap();
    assert!(solver.residual_complex(&u, &f, ua, ub) < 1e-11);

    let real_only = solver.solve(&re, ua.re, ub.re).unwrap();
    assert_eq!(u.re, real_only);
    assert!((u.eval_b() - ub).norm() < 1e-13);
}

#[test]
fn one_solver_serves_many_right_hand_sides() {
    let n = 10;
    let solver = HelmholtzSolver::new(n, -1.0, 1.0, 1.5, 2.0).unwrap();
    for k in 0..4 {
        let f = ChebyCoeff::from_fn(n, -1.0, 1.0, |y| (k as f64 * y).cos());
        let u = solver.solve(&f, k as f64, -1.0).unwrap();
        assert!(solver.residual(&u, &f, k as f64, -1.0) < 1e-11);
    }
}

#[test]
#[should_panic(expected = "at least 3 modes")]
fn too_few_modes_is_rejected() {
    let _ = HelmholtzSolver::new(2, -1.0, 1.0, 1.0, 1.0);
}

#[test]
#[should_panic(expected = "requires Spectral state")]
fn physical_forcing_is_rejected() {
    let solver = HelmholtzSolver::new(5, -1.0, 1.0, 1.0, 1.0).unwrap();
    let f = ChebyCoeff::new(5, -1.0, 1.0, FieldState::Physical);
    let _ = solver.solve(&f, 0.0, 0.0);
}
