use chanspec_core::config::SolverConfig;
use chanspec_core::grid::FieldGeometry;
use clap::Args;
use serde::Serialize;
use std::{f64::consts::PI, fs, path::PathBuf};

/// Grid selection shared by the 3-D subcommands.
#[derive(Args, Debug)]
pub struct GridArgs {
    /// TOML solver configuration; overrides the grid flags when given.
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long, default_value_t = 16)]
    pub nx: usize,
    #[arg(long, default_value_t = 17)]
    pub ny: usize,
    #[arg(long, default_value_t = 16)]
    pub nz: usize,
    /// Acceptance tolerance (defaults to the configured residual tolerance).
    #[arg(long)]
    pub tol: Option<f64>,
}

impl GridArgs {
    /// Configuration from `--config`, or from the grid flags on the default domain.
    pub fn resolve(&self) -> Result<SolverConfig, Box<dyn std::error::Error>> {
        let config = match &self.config {
            Some(path) => SolverConfig::from_file(path)?,
            None => {
                let geometry = FieldGeometry::new(self.nx, self.ny, self.nz, 3, 2.0 * PI, PI, -1.0, 1.0);
                let config = SolverConfig::new(geometry);
                config.validate()?;
                config
            }
        };
        Ok(config)
    }

    pub fn tolerance(&self, config: &SolverConfig) -> f64 {
        self.tol.unwrap_or(config.tolerances.residual)
    }
}

#[derive(Serialize)]
pub struct Check {
    pub name: String,
    pub error: f64,
}

impl Check {
    pub fn new(name: &str, error: f64) -> Self {
        Self {
            name: name.to_string(),
            error,
        }
    }
}

#[derive(Serialize)]
pub struct ValidationSummary {
    pub tolerance: f64,
    pub max_abs_error: f64,
    pub passed: bool,
}

impl ValidationSummary {
    pub fn from_checks(checks: &[Check], tolerance: f64) -> Self {
        let max_abs_error = checks.iter().map(|c| c.error).fold(0.0, f64::max);
        Self {
            tolerance,
            max_abs_error,
            passed: max_abs_error <= tolerance,
        }
    }
}

/// Writes `report` as pretty JSON to `output` (stdout if `None`) and turns a
/// failed summary into an error.
pub fn emit_report<T: Serialize>(
    what: &str,
    report: &T,
    summary: &ValidationSummary,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(report)?;
    if let Some(path) = output {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, json)?;
        eprintln!("Saved {what} validation report to {}", path.display());
    } else {
        println!("{}", json);
    }

    if summary.passed {
        Ok(())
    } else {
        Err(format!(
            "{what} checks failed (max abs error = {:.3e} > {:.3e})",
            summary.max_abs_error, summary.tolerance
        )
        .into())
    }
}

/// Largest absolute difference between `got` and `want` at the points `y`.
pub fn max_pointwise_error(y: &[f64], got: impl Fn(f64) -> f64, want: impl Fn(f64) -> f64) -> f64 {
    y.iter().map(|&y| (got(y) - want(y)).abs()).fold(0.0, f64::max)
}
