use crate::validation_utils::{emit_report, Check, GridArgs, ValidationSummary};
use chanspec_core::diffops::{bc_norm, div_norm, l2_norm};
use chanspec_core::field::FlowField;
use chanspec_core::grid::FieldGeometry;
use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct PerturbArgs {
    #[command(flatten)]
    pub grid: GridArgs,
    /// Seed of the random generator.
    #[arg(long, default_value_t = 1)]
    pub seed: u64,
    /// Target normalized L2 norm.
    #[arg(long, default_value_t = 0.1)]
    pub magnitude: f64,
    /// Per-mode decay of the random coefficients, in (0, 1].
    #[arg(long, default_value_t = 0.7)]
    pub decay: f64,
    /// Optional output path for the generated JSON. Defaults to stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Serialize)]
pub struct PerturbReport {
    geometry: FieldGeometry,
    seed: u64,
    energy: f64,
    checks: Vec<Check>,
    validation: ValidationSummary,
}

pub fn run(args: PerturbArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.grid.resolve()?;
    let geom = config.geometry;
    if geom.nd != 3 {
        return Err("perturbations need a 3-component geometry".into());
    }
    if !(args.decay > 0.0 && args.decay <= 1.0) {
        return Err(format!("decay = {} is outside (0, 1]", args.decay).into());
    }
    let tolerance = args.grid.tolerance(&config);

    let mut u = FlowField::new(geom);
    u.perturb(&mut StdRng::seed_from_u64(args.seed), args.magnitude, args.decay, true);

    let mut aliased = 0.0_f64;
    for mx in 0..u.mx() {
        for mz in 0..u.mz() {
            if !u.is_aliased(u.kx(mx), u.kz(mz)) {
                continue;
            }
            for i in 0..3 {
                for my in 0..u.my() {
                    aliased = aliased.max(u.cmplx(mx, my, mz, i).norm());
                }
            }
        }
    }

    let checks = vec![
        Check::new("divergence", div_norm(&u, true)),
        Check::new("wall_values", bc_norm(&u, true)),
        Check::new("magnitude", (l2_norm(&u, true) - args.magnitude).abs()),
        Check::new("aliased_modes", aliased),
    ];
    let validation = ValidationSummary::from_checks(&checks, tolerance);

    let report = PerturbReport {
        geometry: geom,
        seed: args.seed,
        energy: u.energy(true),
        checks,
        validation,
    };
    emit_report("perturb", &report, &report.validation, args.output)
}
