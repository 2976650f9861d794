use crate::validation_utils::{emit_report, max_pointwise_error, Check, ValidationSummary};
use chanspec_core::chebyshev::ChebyCoeff;
use chanspec_core::helmholtz::HelmholtzSolver;
use chanspec_core::mathdefs::FieldState;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct HelmholtzArgs {
    /// Number of Chebyshev modes.
    #[arg(long, default_value_t = 33)]
    pub n: usize,
    /// Helmholtz coefficient lambda (> 0).
    #[arg(long, default_value_t = 4.0)]
    pub lambda: f64,
    /// Diffusion coefficient nu (> 0).
    #[arg(long, default_value_t = 1.0)]
    pub nu: f64,
    #[arg(long, default_value_t = 1e-9)]
    pub tol: f64,
    /// Optional output path for the generated JSON. Defaults to stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Serialize)]
pub struct HelmholtzReport {
    n: usize,
    lambda: f64,
    nu: f64,
    /// Mean-constraint multiplier of the Poiseuille problem (exact: -3 nu).
    poiseuille_mu: f64,
    checks: Vec<Check>,
    validation: ValidationSummary,
}

pub fn run(args: HelmholtzArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.n < 3 {
        return Err("n must be at least 3".into());
    }
    if !(args.lambda.is_finite() && args.lambda > 0.0 && args.nu.is_finite() && args.nu > 0.0) {
        return Err("lambda and nu must be positive and finite".into());
    }
    let (n, lambda, nu) = (args.n, args.lambda, args.nu);
    let samples: Vec<f64> = (0..=20).map(|k| -1.0 + k as f64 / 10.0).collect();
    let zero = ChebyCoeff::new(n, -1.0, 1.0, FieldState::Spectral);

    // nu u'' - lambda u = 0, u(-1) = 1, u(1) = 0.
    let solver = HelmholtzSolver::new(n, -1.0, 1.0, lambda, nu)?;
    let u = solver.solve(&zero, 1.0, 0.0)?;
    let k = (lambda / nu).sqrt();
    let exact = |y: f64| (k * (1.0 - y)).sinh() / (2.0 * k).sinh();

    // nu u'' - lambda u = 1 with homogeneous walls.
    let mut one = zero.clone();
    one[0] = 1.0;
    let forced = solver.solve(&one, 0.0, 0.0)?;
    let forced_exact = |y: f64| ((k * y).cosh() / k.cosh() - 1.0) / lambda;

    // Plane Poiseuille flow: nu u'' = mu with mean(u) = 1.
    let channel = HelmholtzSolver::new(n, -1.0, 1.0, 0.0, nu)?;
    let (poiseuille, mu) = channel.solve_with_mean(&zero, 1.0, 0.0, 0.0)?;

    let checks = vec![
        Check::new("homogeneous_profile", max_pointwise_error(&samples, |y| u.eval(y), exact)),
        Check::new("homogeneous_residual", solver.residual(&u, &zero, 1.0, 0.0)),
        Check::new("forced_profile", max_pointwise_error(&samples, |y| forced.eval(y), forced_exact)),
        Check::new("forced_residual", solver.residual(&forced, &one, 0.0, 0.0)),
        Check::new(
            "poiseuille_profile",
            max_pointwise_error(&samples, |y| poiseuille.eval(y), |y| 1.5 * (1.0 - y * y)),
        ),
        Check::new("poiseuille_mu", (mu + 3.0 * nu).abs()),
        Check::new(
            "poiseuille_residual",
            channel.residual_with_mean(&poiseuille, mu, &zero, 1.0, 0.0, 0.0),
        ),
    ];
    let validation = ValidationSummary::from_checks(&checks, args.tol);

    let report = HelmholtzReport {
        n,
        lambda,
        nu,
        poiseuille_mu: mu,
        checks,
        validation,
    };
    emit_report("helmholtz", &report, &report.validation, args.output)
}
