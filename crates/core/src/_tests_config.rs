#![cfg(test)]

use std::f64::consts::PI;

use super::config::{SolverConfig, Tolerances};
use super::error::SpectralError;
use super::grid::FieldGeometry;

const SAMPLE: &str = r#"
nu = 0.001

[geometry]
nx = 32
ny = 33
nz = 16
lz = 2.0

[tolerances]
residual = 1e-9
"#;

#[test]
fn parses_sample_and_fills_geometry_defaults() {
    let config = SolverConfig::from_toml_str(SAMPLE).unwrap();
    assert_eq!(config.nu, 0.001);
    assert_eq!(config.tolerances.residual, 1e-9);
    let g = config.geometry;
    assert_eq!((g.nx, g.ny, g.nz, g.nd), (32, 33, 16, 3));
    assert!((g.lx - 2.0 * PI).abs() < 1e-15);
    assert_eq!(g.lz, 2.0);
    assert_eq!((g.a, g.b), (-1.0, 1.0));
}

#[test]
fn omitted_tables_take_defaults() {
    let config = SolverConfig::from_toml_str("[geometry]\nnx = 8\nny = 9\nnz = 8\n").unwrap();
    assert_eq!(config.nu, 1.0);
    assert_eq!(config.tolerances, Tolerances::default());
    assert_eq!(config.tolerances.residual, 1e-10);
}

#[test]
fn programmatic_config_matches_parsed_defaults() {
    let geom = FieldGeometry::new(8, 9, 8, 3, 2.0 * PI, PI, -1.0, 1.0);
    let config = SolverConfig::new(geom);
    assert!(config.validate().is_ok());
    let parsed = SolverConfig::from_toml_str("[geometry]\nnx = 8\nny = 9\nnz = 8\n").unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn too_few_chebyshev_points_is_rejected() {
    let err = SolverConfig::from_toml_str("[geometry]\nnx = 8\nny = 2\nnz = 8\n").unwrap_err();
    match err {
        SpectralError::InvalidConfig(msg) => assert!(msg.contains("ny must be at least 3")),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn inverted_wall_normal_domain_is_rejected() {
    let mut config = SolverConfig::new(FieldGeometry::new(8, 9, 8, 3, 1.0, 1.0, 1.0, -1.0));
    assert!(matches!(config.validate(), Err(SpectralError::InvalidConfig(_))));
    config.geometry.a = -1.0;
    config.geometry.b = 1.0;
    config.nu = 0.0;
    assert!(matches!(config.validate(), Err(SpectralError::InvalidConfig(_))));
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let err = SolverConfig::from_toml_str("[geometry\nnx = 8").unwrap_err();
    assert!(matches!(err, SpectralError::Toml(_)));
}

#[test]
fn loads_from_file() {
    let path = std::env::temp_dir().join(format!("chanspec-{}-config.toml", std::process::id()));
    std::fs::write(&path, SAMPLE).unwrap();
    let config = SolverConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(config.geometry.ny, 33);

    let missing = SolverConfig::from_file(&path).unwrap_err();
    assert!(matches!(missing, SpectralError::Io(_)));
}
