#![cfg(test)]

use std::f64::consts::PI;

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::diffops::{bc_dist, bc_norm, div_norm, l2_dist, l2_norm};
use super::field::FlowField;
use super::grid::FieldGeometry;

fn geometry(nd: usize) -> FieldGeometry {
    FieldGeometry::new(12, 15, 12, nd, 2.0 * PI, PI, -1.0, 1.0)
}

fn perturbed(seed: u64, meanflow: bool) -> FlowField {
    let mut u = FlowField::new(geometry(3));
    u.perturb(&mut StdRng::seed_from_u64(seed), 0.2, 0.7, meanflow);
    u
}

fn mode_is_zero(u: &FlowField, mx: usize, mz: usize) -> bool {
    (0..u.nd()).all(|i| (0..u.my()).all(|my| u.cmplx(mx, my, mz, i) == Complex64::default()))
}

#[test]
fn perturbation_is_divergence_free_with_no_slip_walls() {
    let u = perturbed(11, true);
    assert!((l2_norm(&u, true) - 0.2).abs() < 1e-12);
    assert!(div_norm(&u, true) < 1e-10);
    assert!(bc_norm(&u, true) < 1e-12);
}

#[test]
fn perturbation_fills_only_dealiased_modes() {
    let u = perturbed(12, true);
    assert!(u.padded());
    for mx in 0..u.mx() {
        for mz in 0..u.mz() {
            if u.is_aliased(u.kx(mx), u.kz(mz)) {
                assert!(mode_is_zero(&u, mx, mz), "kx = {}, kz = {}", u.kx(mx), u.kz(mz));
            }
        }
    }
    assert!(!mode_is_zero(&u, u.mx_index(-2), 3));
}

#[test]
fn perturbation_is_a_real_field() {
    let u = perturbed(13, true);
    let mut v = u.clone();
    v.make_physical();
    v.make_spectral();
    assert!(l2_dist(&u, &v, true) < 1e-13);
}

#[test]
fn meanflow_flag_controls_the_zero_mode() {
    assert!(mode_is_zero(&perturbed(14, false), 0, 0));
    assert!(!mode_is_zero(&perturbed(14, true), 0, 0));
}

#[test]
fn same_seed_gives_same_perturbation() {
    assert_eq!(perturbed(15, true), perturbed(15, true));
    assert_ne!(perturbed(15, true), perturbed(16, true));
}

#[test]
fn single_mode_perturbation_touches_one_conjugate_pair() {
    let mut rng = StdRng::seed_from_u64(17);
    let mut u = FlowField::new(geometry(3));
    u.add_perturbation(&mut rng, 1, 0, 0.5, 0.8);
    for mx in 0..u.mx() {
        for mz in 0..u.mz() {
            let touched = mz == 0 && u.kx(mx).abs() == 1;
            assert_eq!(!mode_is_zero(&u, mx, mz), touched, "kx = {}, kz = {}", u.kx(mx), u.kz(mz));
        }
    }
    assert!(div_norm(&u, true) < 1e-10);
}

#[test]
fn perturbations_keep_the_field_state() {
    let mut u = FlowField::from_fn(geometry(3), |i, _, y, _| if i == 0 { 1.0 - y * y } else { 0.0 });
    let laminar = u.clone();
    u.add_perturbations(&mut StdRng::seed_from_u64(18), 2, 2, 0.01, 0.5, false);
    assert_eq!(u.xz_state(), laminar.xz_state());
    assert_eq!(u.y_state(), laminar.y_state());
    assert!(l2_dist(&u, &laminar, true) > 0.0);
    assert!(bc_dist(&u, &laminar, true) < 1e-12);
}

#[test]
#[should_panic(expected = "perturbations need a 3-vector field")]
fn scalar_fields_cannot_be_perturbed() {
    let mut u = FlowField::new(geometry(1));
    u.perturb(&mut StdRng::seed_from_u64(19), 0.1, 0.5, true);
}
