use crate::validation_utils::{emit_report, Check, GridArgs, ValidationSummary};
use chanspec_core::chebyshev::ChebyCoeff;
use chanspec_core::diffops::{l2_norm2, linf_dist};
use chanspec_core::field::FlowField;
use chanspec_core::grid::FieldGeometry;
use chanspec_core::mathdefs::FieldState;
use clap::Args;
use serde::Serialize;
use std::f64::consts::PI;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct TransformArgs {
    #[command(flatten)]
    pub grid: GridArgs,
    /// Optional output path for the generated JSON. Defaults to stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Serialize)]
pub struct TransformReport {
    geometry: FieldGeometry,
    energy: f64,
    expected_energy: f64,
    checks: Vec<Check>,
    validation: ValidationSummary,
}

pub fn run(args: TransformArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.grid.resolve()?;
    let geom = config.geometry;
    if geom.nx < 4 || geom.nz < 4 {
        return Err("nx and nz must be at least 4 to resolve the test modes".into());
    }
    let tolerance = args.grid.tolerance(&config);
    let (lx, lz) = (geom.lx, geom.lz);

    // One unit-amplitude Fourier mode per component: energy nd/4.
    let gridpoints = FlowField::from_fn(geom, move |i, x, _, z| {
        if i == 0 {
            (2.0 * PI * x / lx).sin()
        } else {
            (2.0 * PI * z / lz + i as f64).cos()
        }
    });
    let expected_energy = 0.25 * geom.nd as f64;

    let mut u = gridpoints.clone();
    u.make_spectral();
    let spectral = u.clone();
    u.make_physical();
    let physical_error = linf_dist(&u, &gridpoints);

    let mut v = u.clone();
    v.make_state(FieldState::Spectral, FieldState::Physical);
    v.make_state(FieldState::Physical, FieldState::Spectral);
    v.make_spectral();
    let coefficient_error = v
        .spectral_data()
        .iter()
        .zip(spectral.spectral_data())
        .map(|(a, b)| (a - b).norm())
        .fold(0.0, f64::max);

    let energy = spectral.energy(true);
    let norm_error = (0.5 * l2_norm2(&spectral, true) - energy).abs();

    // Wall shear of an added parabolic mean flow.
    let mut with_mean = spectral.clone();
    let (a, b) = (geom.a, geom.b);
    let profile = ChebyCoeff::from_fn(geom.ny, a, b, |y| (y - a) * (b - y));
    with_mean.add_mean_profile(&profile);
    let shear_error = (with_mean.dudy_a() - (b - a)).abs().max((with_mean.dudy_b() + (b - a)).abs());

    let checks = vec![
        Check::new("physical_round_trip", physical_error),
        Check::new("coefficient_round_trip", coefficient_error),
        Check::new("energy", (energy - expected_energy).abs()),
        Check::new("energy_vs_l2_norm", norm_error),
        Check::new("wall_shear", shear_error),
    ];
    let validation = ValidationSummary::from_checks(&checks, tolerance);

    let report = TransformReport {
        geometry: geom,
        energy,
        expected_energy,
        checks,
        validation,
    };
    emit_report("transform", &report, &report.validation, args.output)
}
