use crate::validation_utils::{emit_report, max_pointwise_error, Check, ValidationSummary};
use chanspec_core::chebyshev::{chebypoints, ChebyCoeff};
use chanspec_core::mathdefs::FieldState;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ChebyshevArgs {
    /// Number of Chebyshev gridpoints (modes).
    #[arg(long, default_value_t = 24)]
    pub n: usize,
    /// Lower wall.
    #[arg(long, default_value_t = -1.0, allow_negative_numbers = true)]
    pub a: f64,
    /// Upper wall.
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub b: f64,
    #[arg(long, default_value_t = 1e-9)]
    pub tol: f64,
    /// Optional output path for the generated JSON. Defaults to stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Serialize)]
pub struct ChebyshevReport {
    function: String,
    n: usize,
    domain: [f64; 2],
    coefficients: Vec<f64>,
    checks: Vec<Check>,
    validation: ValidationSummary,
}

fn f(y: f64) -> f64 {
    (2.0 * y).sin() + y * y * y
}

fn df(y: f64) -> f64 {
    2.0 * (2.0 * y).cos() + 3.0 * y * y
}

fn d2f(y: f64) -> f64 {
    -4.0 * (2.0 * y).sin() + 6.0 * y
}

fn antiderivative(y: f64) -> f64 {
    -0.5 * (2.0 * y).cos() + 0.25 * y.powi(4)
}

pub fn run(args: ChebyshevArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.n < 3 {
        return Err("n must be at least 3".into());
    }
    if !(args.a.is_finite() && args.b.is_finite() && args.b > args.a) {
        return Err("domain requires finite a < b".into());
    }
    let (n, a, b) = (args.n, args.a, args.b);
    let y = chebypoints(n, a, b);
    let samples: Vec<f64> = (0..=10).map(|k| a + (b - a) * k as f64 / 10.0).collect();

    let values: Vec<f64> = y.as_slice().iter().map(|&y| f(y)).collect();
    let mut u = ChebyCoeff::from_vec(values.clone(), a, b, FieldState::Physical);
    u.make_spectral();
    let coefficients = u.as_slice().to_vec();

    let mut round_trip = u.clone();
    round_trip.make_physical();
    let round_trip_error = round_trip
        .as_slice()
        .iter()
        .zip(&values)
        .map(|(got, want)| (got - want).abs())
        .fold(0.0, f64::max);

    let du = u.derivative();
    let d2u = u.derivative_n(2);
    let integral = u.integral();
    let integral_slope = integral.derivative();
    let exact_mean = (antiderivative(b) - antiderivative(a)) / (b - a);

    let checks = vec![
        Check::new("transform_round_trip", round_trip_error),
        Check::new("eval", max_pointwise_error(&samples, |y| u.eval(y), f)),
        Check::new("derivative", max_pointwise_error(&samples, |y| du.eval(y), df)),
        Check::new("second_derivative", max_pointwise_error(&samples, |y| d2u.eval(y), d2f)),
        Check::new("integral_slope", max_pointwise_error(&samples, |y| integral_slope.eval(y), f)),
        Check::new("integral_mean", integral.mean().abs()),
        Check::new("mean", (u.mean() - exact_mean).abs()),
        Check::new("slope_a", (u.slope_a() - df(a)).abs()),
        Check::new("slope_b", (u.slope_b() - df(b)).abs()),
    ];
    let validation = ValidationSummary::from_checks(&checks, args.tol);

    let report = ChebyshevReport {
        function: "sin(2y) + y^3".to_string(),
        n,
        domain: [a, b],
        coefficients,
        checks,
        validation,
    };
    emit_report("chebyshev", &report, &report.validation, args.output)
}
