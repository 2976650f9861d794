//! Poisson and pressure solvers built from one Helmholtz solver per Fourier mode.
//!
//! For Fourier mode `(kx, kz)` the Laplacian reduces to
//! `d^2/dy^2 - lambda` with `lambda = (2 pi kx/Lx)^2 + (2 pi kz/Lz)^2`, so
//! `lapl u = f` splits into independent 1-D Helmholtz problems. Those are
//! solved in parallel: each task reads one profile of the right-hand side
//! and produces one profile of the solution, and the results are scattered
//! into the output field afterwards.
//!
//! [`PressureSolver`] wraps a [`PoissonSolver`] and adds the Neumann data and
//! nonlinear-term handling of the pressure Poisson equation.

use std::f64::consts::PI;

use log::{debug, warn};
use num_complex::Complex64;
use rayon::prelude::*;

use crate::chebyshev::{diff2_complex, integrate_complex, ChebyCoeff, ComplexChebyCoeff};
use crate::diffops::div;
use crate::error::Result;
use crate::field::FlowField;
use crate::grid::FieldGeometry;
use crate::helmholtz::HelmholtzSolver;
use crate::mathdefs::{square, FieldState};
use crate::profiler::{start_timer, stop_timer};

/// Pressure residuals above this are logged.
const RESIDUAL_WARN: f64 = 1e-8;

// ============================================================================
// Poisson
// ============================================================================

#[derive(Debug, Clone)]
pub struct PoissonSolver {
    geom: FieldGeometry,
    /// Indexed `mz + Mz*mx`.
    helmholtz: Vec<HelmholtzSolver>,
}

impl PoissonSolver {
    pub fn new(geom: FieldGeometry) -> Result<Self> {
        geom.validate();
        let (mx_count, mz_count) = (geom.nx, geom.mz());
        let lambdas: Vec<f64> = (0..mx_count * mz_count)
            .map(|k| {
                let kx = geom.kx(k / mz_count) as f64;
                let kz = geom.kz(k % mz_count) as f64;
                square(2.0 * PI * kx / geom.lx) + square(2.0 * PI * kz / geom.lz)
            })
            .collect();
        let helmholtz = lambdas
            .par_iter()
            .map(|&lambda| HelmholtzSolver::new(geom.ny, geom.a, geom.b, lambda, 1.0))
            .collect::<Result<Vec<_>>>()?;

        let lambda_max = lambdas.iter().copied().fold(0.0, f64::max);
        debug!(
            "Poisson solver: {} Helmholtz solvers for {}x{}x{} grid, lambda in [0, {lambda_max:e}]",
            helmholtz.len(),
            geom.nx,
            geom.ny,
            geom.nz
        );
        Ok(Self { geom, helmholtz })
    }

    pub fn for_field(u: &FlowField) -> Result<Self> {
        Self::new(*u.geometry())
    }

    pub fn geometry(&self) -> &FieldGeometry {
        &self.geom
    }

    /// Matching grid and domain; the component count is free.
    pub fn geom_congruent(&self, u: &FlowField) -> bool {
        self.geom.geom_congruent(u.geometry())
    }

    pub fn congruent(&self, u: &FlowField) -> bool {
        self.geom.congruent(u.geometry())
    }

    pub fn helmholtz(&self, mx: usize, mz: usize) -> &HelmholtzSolver {
        &self.helmholtz[mz + self.geom.mz() * mx]
    }

    fn check_field(&self, f: &FlowField, what: &str) {
        assert!(
            self.geom_congruent(f),
            "Poisson solver geometry {:?} does not match {what} geometry {:?}",
            self.geom,
            f.geometry()
        );
        f.assert_state(FieldState::Spectral, FieldState::Spectral);
    }

    /// Solve `lapl u = f` with `u = 0` at both walls.
    pub fn solve(&self, f: &FlowField) -> Result<FlowField> {
        self.solve_impl(f, None)
    }

    /// Solve `lapl u = f` with `u = bc` at both walls.
    pub fn solve_with_bc(&self, f: &FlowField, bc: &FlowField) -> Result<FlowField> {
        self.check_field(bc, "boundary");
        assert_eq!(bc.nd(), f.nd(), "boundary field has the wrong number of components");
        self.solve_impl(f, Some(bc))
    }

    fn solve_impl(&self, f: &FlowField, bc: Option<&FlowField>) -> Result<FlowField> {
        self.check_field(f, "right-hand side");
        start_timer("poisson_solve");
        let (mx_count, mz_count) = (f.mx(), f.mz());
        let per_component = mx_count * mz_count;
        let profiles = (0..f.nd() * per_component)
            .into_par_iter()
            .map(|p| {
                let (i, k) = (p / per_component, p % per_component);
                let (mx, mz) = (k / mz_count, k % mz_count);
                let (ua, ub) = boundary_values(bc, mx, mz, i);
                self.helmholtz(mx, mz).solve_complex(&f.profile(mx, mz, i), ua, ub)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut u = FlowField::zeros_like(f);
        for (p, profile) in profiles.iter().enumerate() {
            let (i, k) = (p / per_component, p % per_component);
            u.set_profile(k / mz_count, k % mz_count, i, profile);
        }
        stop_timer("poisson_solve");
        Ok(u)
    }

    /// Largest per-mode Helmholtz residual of `u` against `f` with zero wall values.
    pub fn verify(&self, u: &FlowField, f: &FlowField) -> f64 {
        self.verify_impl(u, f, None)
    }

    pub fn verify_with_bc(&self, u: &FlowField, f: &FlowField, bc: &FlowField) -> f64 {
        self.check_field(bc, "boundary");
        self.verify_impl(u, f, Some(bc))
    }

    fn verify_impl(&self, u: &FlowField, f: &FlowField, bc: Option<&FlowField>) -> f64 {
        self.check_field(u, "solution");
        self.check_field(f, "right-hand side");
        assert_eq!(u.nd(), f.nd(), "solution and right-hand side differ in components");
        let (mx_count, mz_count) = (f.mx(), f.mz());
        let per_component = mx_count * mz_count;
        (0..f.nd() * per_component)
            .into_par_iter()
            .map(|p| {
                let (i, k) = (p / per_component, p % per_component);
                let (mx, mz) = (k / mz_count, k % mz_count);
                let (ua, ub) = boundary_values(bc, mx, mz, i);
                self.helmholtz(mx, mz)
                    .residual_complex(&u.profile(mx, mz, i), &f.profile(mx, mz, i), ua, ub)
            })
            .reduce(|| 0.0, f64::max)
    }
}

fn boundary_values(bc: Option<&FlowField>, mx: usize, mz: usize, i: usize) -> (Complex64, Complex64) {
    match bc {
        Some(bc) => {
            let p = bc.profile(mx, mz, i);
            (p.eval_a(), p.eval_b())
        }
        None => (Complex64::default(), Complex64::default()),
    }
}

// ============================================================================
// Pressure
// ============================================================================

/// Homogeneous solutions with unit value at one wall, used to impose
/// Neumann data by superposition.
#[derive(Debug, Clone)]
struct WallResponses {
    from_a: ChebyCoeff,
    from_b: ChebyCoeff,
}

/// Solves `lapl p = -div(N)` for the pressure of a velocity field `u` with
/// nonlinear term `N`, subject to `dp/dy = nu d^2v/dy^2` at both walls.
///
/// For `lambda > 0` each mode is a particular Dirichlet solution plus a
/// combination of the two wall responses fixed by the slope conditions. The
/// `(0, 0)` mode is integrated twice from the slope at `a` and has zero mean.
#[derive(Debug, Clone)]
pub struct PressureSolver {
    poisson: PoissonSolver,
    nu: f64,
    responses: Vec<WallResponses>,
}

impl PressureSolver {
    pub fn new(geom: FieldGeometry, nu: f64) -> Result<Self> {
        let poisson = PoissonSolver::new(FieldGeometry { nd: 1, ..geom })?;
        let ny = geom.ny;
        let zero = ChebyCoeff::new(ny, geom.a, geom.b, FieldState::Spectral);
        let responses = poisson
            .helmholtz
            .par_iter()
            .map(|h| -> Result<WallResponses> {
                Ok(WallResponses {
                    from_a: h.solve(&zero, 1.0, 0.0)?,
                    from_b: h.solve(&zero, 0.0, 1.0)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("pressure solver: nu={nu:e}");
        Ok(Self { poisson, nu, responses })
    }

    pub fn for_field(u: &FlowField, nu: f64) -> Result<Self> {
        Self::new(*u.geometry(), nu)
    }

    pub fn nu(&self) -> f64 {
        self.nu
    }

    pub fn poisson(&self) -> &PoissonSolver {
        &self.poisson
    }

    fn check_inputs(&self, u: &FlowField, nonl: &FlowField) {
        assert!(
            self.poisson.geom_congruent(u) && self.poisson.geom_congruent(nonl),
            "pressure solver geometry does not match the velocity or nonlinear field"
        );
        assert!(u.nd() == 3 && nonl.nd() == 3, "pressure solve needs 3-component velocity and nonlinear fields");
        u.assert_state(FieldState::Spectral, FieldState::Spectral);
        nonl.assert_state(FieldState::Spectral, FieldState::Spectral);
    }

    /// Wall slopes `nu v''(a)`, `nu v''(b)` for mode `(mx, mz)`.
    fn neumann_data(&self, u: &FlowField, mx: usize, mz: usize) -> (Complex64, Complex64) {
        let mut vyy = ComplexChebyCoeff::default();
        diff2_complex(&u.profile(mx, mz, 1), &mut vyy);
        (vyy.eval_a() * self.nu, vyy.eval_b() * self.nu)
    }

    /// Pressure of velocity `u` given its nonlinear term `nonl`. Both fully Spectral.
    pub fn solve(&self, u: &FlowField, nonl: &FlowField) -> Result<FlowField> {
        self.check_inputs(u, nonl);
        start_timer("pressure_solve");
        let mut rhs = div(nonl);
        rhs *= -1.0;

        let mz_count = u.mz();
        let profiles = (0..u.mx() * mz_count)
            .into_par_iter()
            .map(|k| {
                let (mx, mz) = (k / mz_count, k % mz_count);
                let (ga, gb) = self.neumann_data(u, mx, mz);
                self.solve_mode(k, &rhs.profile(mx, mz, 0), ga, gb)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut geom = *u.geometry();
        geom.nd = 1;
        let mut p = FlowField::new(geom);
        for (k, profile) in profiles.iter().enumerate() {
            p.set_profile(k / mz_count, k % mz_count, 0, profile);
        }
        stop_timer("pressure_solve");
        Ok(p)
    }

    fn solve_mode(&self, k: usize, f: &ComplexChebyCoeff, ga: Complex64, gb: Complex64) -> Result<ComplexChebyCoeff> {
        let h = &self.poisson.helmholtz[k];
        if h.lambda() == 0.0 {
            let mut g = ComplexChebyCoeff::default();
            integrate_complex(f, &mut g);
            let c1 = ga - g.eval_a();
            g.add(0, c1);
            let mut p = ComplexChebyCoeff::default();
            integrate_complex(&g, &mut p);
            return Ok(p);
        }

        let mut p = h.solve_complex(f, Complex64::default(), Complex64::default())?;
        let resp = &self.responses[k];
        let (a11, a12) = (resp.from_a.slope_a(), resp.from_b.slope_a());
        let (a21, a22) = (resp.from_a.slope_b(), resp.from_b.slope_b());
        let det = a11 * a22 - a12 * a21;
        let (ra, rb) = (ga - p.slope_a(), gb - p.slope_b());
        let alpha = (ra * a22 - rb * a12) / det;
        let beta = (rb * a11 - ra * a21) / det;
        for n in 0..p.len() {
            p.add(n, alpha * resp.from_a[n] + beta * resp.from_b[n]);
        }
        Ok(p)
    }

    /// Largest per-mode defect of the pressure equation and its wall slopes.
    ///
    /// The `(0, 0)` mode is only checked at `a`, where its slope is imposed.
    pub fn verify(&self, p: &FlowField, u: &FlowField, nonl: &FlowField) -> f64 {
        self.check_inputs(u, nonl);
        p.assert_state(FieldState::Spectral, FieldState::Spectral);
        let mut rhs = div(nonl);
        rhs *= -1.0;
        let mz_count = u.mz();
        let n_modes = u.ny();
        let worst = (0..u.mx() * mz_count)
            .into_par_iter()
            .map(|k| {
                let (mx, mz) = (k / mz_count, k % mz_count);
                let (ga, gb) = self.neumann_data(u, mx, mz);
                let lambda = self.poisson.helmholtz[k].lambda();
                let pk = p.profile(mx, mz, 0);
                let fk = rhs.profile(mx, mz, 0);
                let mut pyy = ComplexChebyCoeff::default();
                diff2_complex(&pk, &mut pyy);
                let mut defect = (pk.slope_a() - ga).norm();
                if lambda != 0.0 {
                    defect = defect.max((pk.slope_b() - gb).norm());
                }
                for n in 0..n_modes.saturating_sub(2) {
                    defect = defect.max((pyy.get(n) - pk.get(n) * lambda - fk.get(n)).norm());
                }
                defect
            })
            .reduce(|| 0.0, f64::max);
        if worst > RESIDUAL_WARN {
            warn!("pressure residual {worst:e}");
        }
        worst
    }
}
