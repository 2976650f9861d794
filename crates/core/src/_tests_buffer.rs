#![cfg(test)]

use std::io::Cursor;

use super::buffer::Vector;
use super::error::SpectralError;
use super::mathdefs::{write_f64, write_usize};

#[test]
fn norms_and_mean_match_hand_computation() {
    let v = Vector::from_vec(vec![3.0, -4.0, 1.0]);
    assert_eq!(v.l1_norm(), 8.0);
    assert_eq!(v.l2_norm2(), 26.0);
    assert_eq!(v.linf_norm(), 4.0);
    assert!((v.mean() - 0.0).abs() < 1e-15);
    assert_eq!(v.max_elem_index(), Some(1));
}

#[test]
fn resize_keeps_leading_entries_and_zero_fills() {
    let mut v = Vector::from_vec(vec![1.0, 2.0]);
    v.resize(4);
    assert_eq!(v.as_slice(), &[1.0, 2.0, 0.0, 0.0]);
    v.resize(1);
    assert_eq!(v.as_slice(), &[1.0]);
}

#[test]
fn arithmetic_operators_act_elementwise() {
    let mut v = Vector::from_vec(vec![1.0, 2.0, 3.0]);
    let w = Vector::from_vec(vec![0.5, 0.5, 0.5]);
    v += &w;
    v *= 2.0;
    v -= &w;
    assert_eq!(v.as_slice(), &[2.5, 4.5, 6.5]);
    assert_eq!(v.dot(&w), 6.75);
}

#[test]
#[should_panic(expected = "subvector")]
fn subvector_rejects_out_of_range_slices() {
    let v = Vector::zeros(3);
    let _ = v.subvector(2, 2);
}

#[test]
fn binary_dump_and_load_preserve_values() {
    let v = Vector::from_vec(vec![1.0 / 3.0, -2.0e-300, 7.5]);
    let mut bytes = Vec::new();
    v.binary_dump(&mut bytes).unwrap();
    let loaded = Vector::binary_load(&mut Cursor::new(bytes)).unwrap();
    assert_eq!(loaded, v);
}

#[test]
fn ascii_save_and_load_preserve_values() {
    let path = std::env::temp_dir().join(format!("chanspec-vector-{}.asc", std::process::id()));
    let v = Vector::from_vec(vec![0.1, 0.2, 1.0 / 7.0]);
    v.save(&path).unwrap();
    let loaded = Vector::load(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(loaded, v);
}

#[test]
fn huge_declared_length_on_short_input_is_an_error() {
    let mut bytes = Vec::new();
    write_usize(&mut bytes, 1 << 60).unwrap();
    write_f64(&mut bytes, 1.5).unwrap();
    let err = Vector::binary_load(&mut Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, SpectralError::Io(_)), "got {err}");
}
