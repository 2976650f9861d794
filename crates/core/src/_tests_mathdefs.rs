#![cfg(test)]

use std::io::Cursor;

use num_complex::Complex64;

use super::mathdefs::{
    fmod_positive, iround, polynomial_interpolate, quadratic_interpolate, read_bool,
    read_complex, read_f64, read_state, read_usize, write_bool, write_complex, write_f64,
    write_state, write_usize, zero_last_mode, FieldState,
};

#[test]
fn fmod_positive_wraps_negative_values_into_range() {
    assert!((fmod_positive(-0.5, 2.0) - 1.5).abs() < 1e-15);
    assert!((fmod_positive(5.0, 2.0) - 1.0).abs() < 1e-15);
    assert_eq!(fmod_positive(0.0, 3.0), 0.0);
}

#[test]
fn iround_rounds_halves_away_from_zero() {
    assert_eq!(iround(2.5), 3);
    assert_eq!(iround(-2.5), -3);
    assert_eq!(iround(1.49), 1);
}

#[test]
fn zero_last_mode_only_affects_odd_derivatives_at_kmax() {
    assert_eq!(zero_last_mode(4, 4, 1), 0.0);
    assert_eq!(zero_last_mode(4, 4, 2), 1.0);
    assert_eq!(zero_last_mode(3, 4, 1), 1.0);
}

#[test]
fn polynomial_interpolation_is_exact_for_cubics() {
    let xs = [-1.0, -0.3, 0.4, 1.2];
    let cubic = |x: f64| 2.0 * x * x * x - x + 0.5;
    let fs: Vec<f64> = xs.iter().map(|&x| cubic(x)).collect();
    for &x in &[-0.8, 0.0, 0.77] {
        assert!((polynomial_interpolate(&fs, &xs, x) - cubic(x)).abs() < 1e-12);
    }
}

#[test]
fn quadratic_interpolation_reproduces_parabola() {
    let xs = [0.0, 1.0, 3.0];
    let fs = [1.0, 2.0, 10.0];
    // x^2 + 1
    assert!((quadratic_interpolate(&fs, &xs, 2.0) - 5.0).abs() < 1e-12);
}

#[test]
fn binary_primitives_round_trip_through_a_buffer() {
    let mut bytes = Vec::new();
    write_usize(&mut bytes, 42).unwrap();
    write_f64(&mut bytes, -3.25).unwrap();
    write_complex(&mut bytes, Complex64::new(1.0, -2.0)).unwrap();
    write_bool(&mut bytes, true).unwrap();
    write_state(&mut bytes, FieldState::Spectral).unwrap();

    let mut r = Cursor::new(bytes);
    assert_eq!(read_usize(&mut r).unwrap(), 42);
    assert_eq!(read_f64(&mut r).unwrap(), -3.25);
    assert_eq!(read_complex(&mut r).unwrap(), Complex64::new(1.0, -2.0));
    assert!(read_bool(&mut r).unwrap());
    assert_eq!(read_state(&mut r).unwrap(), FieldState::Spectral);
}

#[test]
fn unknown_state_code_is_a_format_error() {
    let mut r = Cursor::new(vec![7u8]);
    assert!(read_state(&mut r).is_err());
}

#[test]
fn field_state_parses_both_capitalisations() {
    assert_eq!("Physical".parse::<FieldState>().unwrap(), FieldState::Physical);
    assert_eq!("spectral".parse::<FieldState>().unwrap(), FieldState::Spectral);
    assert!("fourier".parse::<FieldState>().is_err());
    assert_eq!(FieldState::Spectral.to_string(), "Spectral");
}
