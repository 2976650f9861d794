#![cfg(test)]

use clap::{CommandFactory, Parser};

use super::{Cli, Layer};

#[test]
fn command_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn every_layer_is_a_subcommand() {
    let cmd = Cli::command();
    let names: Vec<&str> = cmd.get_subcommands().map(|c| c.get_name()).collect();
    assert_eq!(names, ["chebyshev", "helmholtz", "transform", "poisson", "perturb"]);
}

#[test]
fn perturb_flags_reach_the_arguments() {
    let cli = Cli::try_parse_from(["chanspec-validation", "perturb", "--seed", "3", "--decay", "0.5"]).unwrap();
    match cli.layer {
        Layer::Perturb(args) => {
            assert_eq!(args.seed, 3);
            assert_eq!(args.decay, 0.5);
            assert_eq!(args.magnitude, 0.1);
            assert_eq!(args.grid.nx, 16);
        }
        other => panic!("parsed as {other:?}"),
    }
}

#[test]
fn missing_layer_is_rejected() {
    assert!(Cli::try_parse_from(["chanspec-validation"]).is_err());
}
