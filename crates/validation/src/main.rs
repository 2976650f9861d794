//! `chanspec-validation`: runs each solver layer against closed-form answers
//! and prints a JSON report per layer.

mod validation_chebyshev;
mod validation_helmholtz;
mod validation_perturb;
mod validation_poisson;
mod validation_transform;
mod validation_utils;

#[cfg(test)]
mod _tests_cli;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use validation_chebyshev::ChebyshevArgs;
use validation_helmholtz::HelmholtzArgs;
use validation_perturb::PerturbArgs;
use validation_poisson::PoissonArgs;
use validation_transform::TransformArgs;

#[derive(Parser, Debug)]
#[command(
    name = "chanspec-validation",
    version,
    about = "Checks chanspec against manufactured solutions, one layer at a time.",
    long_about = "Each subcommand builds a problem with a known answer on the channel \
                  domain, solves or transforms it, and writes the errors as JSON. The \
                  exit status is nonzero when any error exceeds the tolerance."
)]
struct Cli {
    #[command(subcommand)]
    layer: Layer,
}

/// Solver layers, from the 1-D building blocks up to the 3-D solvers.
#[derive(Subcommand, Debug)]
enum Layer {
    /// Chebyshev series: transform pair, derivatives, integral and norms on [a, b].
    Chebyshev(ChebyshevArgs),
    /// Tau-method Helmholtz solves, including the mean-constrained Poiseuille problem.
    Helmholtz(HelmholtzArgs),
    /// Flow-field transforms: gridpoint and coefficient round trips, energy, wall shear.
    Transform(TransformArgs),
    /// Poisson and pressure solves on fields with prescribed Laplacians.
    Poisson(PoissonArgs),
    /// Random perturbations: divergence, wall values, magnitude and dealiasing.
    Perturb(PerturbArgs),
}

impl Layer {
    fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            Layer::Chebyshev(args) => validation_chebyshev::run(args),
            Layer::Helmholtz(args) => validation_helmholtz::run(args),
            Layer::Transform(args) => validation_transform::run(args),
            Layer::Poisson(args) => validation_poisson::run(args),
            Layer::Perturb(args) => validation_perturb::run(args),
        }
    }
}

fn main() -> ExitCode {
    match Cli::parse().layer.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("chanspec-validation: {err}");
            ExitCode::FAILURE
        }
    }
}
