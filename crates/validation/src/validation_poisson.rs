use crate::validation_utils::{emit_report, Check, GridArgs, ValidationSummary};
use chanspec_core::diffops::{div_norm, grad, l2_dist, lapl};
use chanspec_core::field::FlowField;
use chanspec_core::grid::FieldGeometry;
use chanspec_core::poisson::{PoissonSolver, PressureSolver};
use chanspec_core::profiler::{profile_json, reset_profile};
use clap::Args;
use log::info;
use serde::Serialize;
use std::f64::consts::PI;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct PoissonArgs {
    #[command(flatten)]
    pub grid: GridArgs,
    /// Optional output path for the generated JSON. Defaults to stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Serialize)]
pub struct PoissonReport {
    geometry: FieldGeometry,
    nu: f64,
    checks: Vec<Check>,
    validation: ValidationSummary,
    /// Section timings; empty unless built with the `profiling` feature.
    profile: serde_json::Value,
}

/// Maps `y` in `[a, b]` onto `[-1, 1]`.
fn unit(geom: &FieldGeometry, y: f64) -> f64 {
    (2.0 * y - geom.a - geom.b) / (geom.b - geom.a)
}

pub fn run(args: PoissonArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.grid.resolve()?;
    let geom = FieldGeometry { nd: 3, ..config.geometry };
    if geom.nx < 4 || geom.nz < 4 {
        return Err("nx and nz must be at least 4 to resolve the test modes".into());
    }
    let tolerance = args.grid.tolerance(&config);
    let nu = config.nu;
    let (alpha, gamma) = (2.0 * PI / geom.lx, 2.0 * PI / geom.lz);
    reset_profile();

    // Manufactured solution with zero wall values.
    let scalar = FieldGeometry { nd: 1, ..geom };
    let mut u = FlowField::from_fn(scalar, move |_, x, y, z| {
        let s = unit(&geom, y);
        (1.0 - s * s) * ((alpha * x).sin() * (gamma * z).cos() + 0.5)
    });
    u.make_spectral();
    let f = lapl(&u);
    let poisson = PoissonSolver::new(scalar)?;
    let solved = poisson.solve(&f)?;
    info!("Poisson solve on {}x{}x{} grid done", geom.nx, geom.ny, geom.nz);

    // Pressure with zero wall slopes, driven by its own gradient.
    let mut p_exact = FlowField::from_fn(scalar, move |_, x, y, z| {
        let s = unit(&geom, y);
        (s * s * s / 3.0 - s) * (alpha * x).cos() * (gamma * z).cos() + s.powi(4) / 4.0 - s * s / 2.0
            + 7.0 / 60.0
    });
    p_exact.make_spectral();
    let mut nonl = grad(&p_exact);
    nonl *= -1.0;
    let mut velocity = FlowField::from_fn(geom, move |i, _, y, z| {
        let s = unit(&geom, y);
        if i == 0 { (1.0 - s * s) * (gamma * z).cos() } else { 0.0 }
    });
    velocity.make_spectral();
    let pressure = PressureSolver::new(geom, nu)?;
    let p = pressure.solve(&velocity, &nonl)?;

    let checks = vec![
        Check::new("poisson_solution", l2_dist(&solved, &u, true)),
        Check::new("poisson_residual", poisson.verify(&solved, &f)),
        Check::new("velocity_divergence", div_norm(&velocity, true)),
        Check::new("pressure_solution", l2_dist(&p, &p_exact, true)),
        Check::new("pressure_residual", pressure.verify(&p, &velocity, &nonl)),
    ];
    let validation = ValidationSummary::from_checks(&checks, tolerance);

    let report = PoissonReport {
        geometry: geom,
        nu,
        checks,
        validation,
        profile: serde_json::from_str(&profile_json())?,
    };
    emit_report("poisson", &report, &report.validation, args.output)
}
