//! Chebyshev-tau solver for the 1-D Helmholtz problem
//! `nu u'' - lambda u = f` on `[a, b]` with Dirichlet data `u(a) = ua`,
//! `u(b) = ub`.
//!
//! The tau equations couple `u_n` only to `u_{n-2}` and `u_{n+2}`, so the even
//! and odd coefficients form two independent systems. Each is banded
//! tridiagonal with the boundary condition in the dense top row:
//! `sum u_even = (ub + ua)/2`, `sum u_odd = (ub - ua)/2`. The left-hand
//! operators are factored once at construction and the solver is immutable
//! afterwards; one instance serves any number of right-hand sides.

use log::{debug, warn};
use num_complex::Complex64;

use crate::banded::BandedTridiag;
use crate::chebyshev::{diff2, ChebyCoeff, ComplexChebyCoeff};
use crate::error::Result;
use crate::mathdefs::{square, FieldState};

#[derive(Debug, Clone)]
pub struct HelmholtzSolver {
    n_modes: usize,
    a: f64,
    b: f64,
    lambda: f64,
    nu: f64,
    a_even: BandedTridiag,
    a_odd: BandedTridiag,
    b_even: BandedTridiag,
    b_odd: BandedTridiag,
    /// Solution of `nu u'' - lambda u = 1` with homogeneous data, for the
    /// mean-constrained variant.
    unit_response: ChebyCoeff,
}

impl HelmholtzSolver {
    pub fn new(n_modes: usize, a: f64, b: f64, lambda: f64, nu: f64) -> Result<Self> {
        assert!(n_modes >= 3, "Helmholtz solver needs at least 3 modes, got {n_modes}");
        assert!(b > a, "Helmholtz domain requires a < b, got [{a}, {b}]");

        let n = n_modes - 1;
        let n_even = (n_modes + 1) / 2;
        let n_odd = n_modes / 2;
        let nu_scaled = nu * square(2.0 / (b - a));

        let beta = |k: usize| if k + 2 > n { 0.0 } else { 1.0 };
        let c = |k: usize| if k == 0 { 2.0 } else { 1.0 };

        let mut a_even = BandedTridiag::new(n_even);
        let mut a_odd = BandedTridiag::new(n_odd);
        let mut b_even = BandedTridiag::new(n_even);
        let mut b_odd = BandedTridiag::new(n_odd);

        for (first, lhs, rhs) in [(0usize, &mut a_even, &mut b_even), (1, &mut a_odd, &mut b_odd)] {
            let rows = lhs.num_rows();
            for j in 0..rows {
                *lhs.band_mut(j) = 1.0;
            }
            for i in 1..rows {
                let k = 2 * i + first;
                let kf = k as f64;
                let lo = c(k - 2) / (4.0 * kf * (kf - 1.0));
                let mid = -beta(k) / (2.0 * (kf * kf - 1.0));
                let up = beta(k + 2) / (4.0 * kf * (kf + 1.0));

                *lhs.lodiag_mut(i) = -lambda * lo;
                *lhs.diag_mut(i) = nu_scaled - lambda * mid;
                *rhs.lodiag_mut(i) = lo;
                *rhs.diag_mut(i) = mid;
                if i + 1 < rows {
                    *lhs.updiag_mut(i) = -lambda * up;
                    *rhs.updiag_mut(i) = up;
                }
            }
            lhs.ul_decompose()?;
        }

        let mut solver = Self {
            n_modes,
            a,
            b,
            lambda,
            nu,
            a_even,
            a_odd,
            b_even,
            b_odd,
            unit_response: ChebyCoeff::new(n_modes, a, b, FieldState::Spectral),
        };

        let mut one = ChebyCoeff::new(n_modes, a, b, FieldState::Spectral);
        one[0] = 1.0;
        solver.unit_response = solver.solve(&one, 0.0, 0.0)?;

        debug!("Helmholtz solver: N={n_modes} on [{a}, {b}], lambda={lambda:e}, nu={nu:e}");
        Ok(solver)
    }

    pub fn num_modes(&self) -> usize {
        self.n_modes
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn nu(&self) -> f64 {
        self.nu
    }

    fn check_input(&self, f: &ChebyCoeff) {
        assert_eq!(f.len(), self.n_modes, "right-hand side has the wrong number of modes");
        assert!(
            f.a() == self.a && f.b() == self.b,
            "right-hand side domain does not match the solver"
        );
        assert_eq!(f.state(), FieldState::Spectral, "Helmholtz solve requires Spectral state");
    }

    /// Solve with Dirichlet data. `f` must be Spectral.
    pub fn solve(&self, f: &ChebyCoeff, ua: f64, ub: f64) -> Result<ChebyCoeff> {
        let mut u = ChebyCoeff::new(self.n_modes, self.a, self.b, FieldState::Spectral);
        self.solve_into(&mut u, f, ua, ub)?;
        Ok(u)
    }

    pub fn solve_into(&self, u: &mut ChebyCoeff, f: &ChebyCoeff, ua: f64, ub: f64) -> Result<()> {
        self.check_input(f);
        if !u.congruent(f) {
            *u = ChebyCoeff::new(self.n_modes, self.a, self.b, FieldState::Spectral);
        }
        u.set_state(FieldState::Spectral);

        let rhs = f.as_slice();
        let out = u.as_mut_slice();
        self.b_even.multiply_strided(rhs, 0, 2, out, 0, 2);
        out[0] = 0.5 * (ub + ua);
        self.a_even.solve_strided(out, 0, 2)?;

        self.b_odd.multiply_strided(rhs, 1, 2, out, 1, 2);
        out[1] = 0.5 * (ub - ua);
        self.a_odd.solve_strided(out, 1, 2)?;
        Ok(())
    }

    /// Solve `nu u'' - lambda u - mu = f` with Dirichlet data and the
    /// constraint `mean(u) = umean`, returning `(u, mu)`.
    pub fn solve_with_mean(
        &self,
        f: &ChebyCoeff,
        umean: f64,
        ua: f64,
        ub: f64,
    ) -> Result<(ChebyCoeff, f64)> {
        let mut u = self.solve(f, ua, ub)?;
        let mu = (umean - u.mean()) / self.unit_response.mean();
        let mut correction = self.unit_response.clone();
        correction *= mu;
        u += &correction;
        Ok((u, mu))
    }

    pub fn solve_complex(
        &self,
        f: &ComplexChebyCoeff,
        ua: Complex64,
        ub: Complex64,
    ) -> Result<ComplexChebyCoeff> {
        let re = self.solve(&f.re, ua.re, ub.re)?;
        let im = self.solve(&f.im, ua.im, ub.im)?;
        Ok(ComplexChebyCoeff::from_parts(re, im))
    }

    pub fn solve_complex_with_mean(
        &self,
        f: &ComplexChebyCoeff,
        umean: Complex64,
        ua: Complex64,
        ub: Complex64,
    ) -> Result<(ComplexChebyCoeff, Complex64)> {
        let (re, mu_re) = self.solve_with_mean(&f.re, umean.re, ua.re, ub.re)?;
        let (im, mu_im) = self.solve_with_mean(&f.im, umean.im, ua.im, ub.im)?;
        Ok((ComplexChebyCoeff::from_parts(re, im), Complex64::new(mu_re, mu_im)))
    }

    /// Max-norm defect of the tau equations and boundary conditions.
    ///
    /// The equation is checked on the modes `n <= N-2` that the tau method
    /// enforces; the top two are traded for the boundary rows.
    pub fn residual(&self, u: &ChebyCoeff, f: &ChebyCoeff, ua: f64, ub: f64) -> f64 {
        self.residual_with_mean_impl(u, 0.0, f, ua, ub)
    }

    pub fn residual_with_mean(
        &self,
        u: &ChebyCoeff,
        mu: f64,
        f: &ChebyCoeff,
        umean: f64,
        ua: f64,
        ub: f64,
    ) -> f64 {
        let defect = self.residual_with_mean_impl(u, mu, f, ua, ub);
        defect.max((u.mean() - umean).abs())
    }

    fn residual_with_mean_impl(&self, u: &ChebyCoeff, mu: f64, f: &ChebyCoeff, ua: f64, ub: f64) -> f64 {
        self.check_input(f);
        self.check_input(u);
        let mut uyy = ChebyCoeff::default();
        diff2(u, &mut uyy);
        let mut worst = 0.0_f64;
        for n in 0..self.n_modes - 2 {
            let lhs = self.nu * uyy[n] - self.lambda * u[n] - if n == 0 { mu } else { 0.0 };
            worst = worst.max((lhs - f[n]).abs());
        }
        worst = worst.max((u.eval_a() - ua).abs());
        worst.max((u.eval_b() - ub).abs())
    }

    /// Residual with a warning when it exceeds `tolerance`.
    pub fn verify(&self, u: &ChebyCoeff, f: &ChebyCoeff, ua: f64, ub: f64, tolerance: f64) -> f64 {
        let res = self.residual(u, f, ua, ub);
        if res > tolerance {
            warn!(
                "Helmholtz residual {res:e} exceeds {tolerance:e} (N={}, lambda={:e})",
                self.n_modes, self.lambda
            );
        }
        res
    }

    pub fn residual_complex(
        &self,
        u: &ComplexChebyCoeff,
        f: &ComplexChebyCoeff,
        ua: Complex64,
        ub: Complex64,
    ) -> f64 {
        self.residual(&u.re, &f.re, ua.re, ub.re)
            .max(self.residual(&u.im, &f.im, ua.im, ub.im))
    }
}
