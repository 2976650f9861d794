#![cfg(test)]

use super::banded::BandedTridiag;
use super::error::SpectralError;

/// Diagonally dominant test matrix with a dense top row.
fn sample_matrix(m: usize) -> BandedTridiag {
    let mut a = BandedTridiag::new(m);
    for j in 0..m {
        *a.band_mut(j) = 1.0 + 0.25 * j as f64;
    }
    *a.band_mut(0) = 2.0 * m as f64;
    for i in 1..m {
        *a.diag_mut(i) = 4.0 + i as f64;
        *a.lodiag_mut(i) = -1.0 + 0.1 * i as f64;
        if i + 1 < m {
            *a.updiag_mut(i) = 0.5 - 0.05 * i as f64;
        }
    }
    a
}

fn dense(a: &BandedTridiag) -> Vec<Vec<f64>> {
    let m = a.num_rows();
    (0..m).map(|i| (0..m).map(|j| a.elem(i, j)).collect()).collect()
}

/// Gaussian elimination with partial pivoting.
fn dense_solve(mut mat: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
    let m = b.len();
    for col in 0..m {
        let pivot = (col..m)
            .max_by(|&p, &q| mat[p][col].abs().total_cmp(&mat[q][col].abs()))
            .unwrap();
        mat.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..m {
            let factor = mat[row][col] / mat[col][col];
            for k in col..m {
                mat[row][k] -= factor * mat[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; m];
    for row in (0..m).rev() {
        let tail: f64 = (row + 1..m).map(|k| mat[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / mat[row][row];
    }
    x
}

#[test]
fn top_row_and_first_updiag_share_storage() {
    let mut a = BandedTridiag::new(4);
    *a.updiag_mut(0) = 3.0;
    assert_eq!(a.band(1), 3.0);
    assert_eq!(a.elem(0, 1), 3.0);
    assert!(a.in_band(0, 3));
    assert!(!a.in_band(1, 3));
    assert_eq!(a.elem(3, 0), 0.0);
}

#[test]
fn ul_solve_matches_dense_elimination() {
    let m = 7;
    let mut a = sample_matrix(m);
    let reference = dense(&a);
    let rhs: Vec<f64> = (0..m).map(|i| (i as f64 * 0.7).sin() + 1.0).collect();

    a.ul_decompose().unwrap();
    assert!(a.is_factored());
    let mut x = rhs.clone();
    a.solve(&mut x).unwrap();

    let expected = dense_solve(reference, rhs);
    for (got, want) in x.iter().zip(&expected) {
        assert!((got - want).abs() < 1e-12, "got {got}, want {want}");
    }
}

#[test]
fn multiply_then_solve_recovers_input() {
    let m = 6;
    let mut a = sample_matrix(m);
    let x: Vec<f64> = (0..m).map(|i| 1.0 / (1.0 + i as f64)).collect();
    let mut b = vec![0.0; m];
    a.multiply(&x, &mut b);

    a.ul_decompose().unwrap();
    a.solve(&mut b).unwrap();
    for (got, want) in b.iter().zip(&x) {
        assert!((got - want).abs() < 1e-13);
    }
}

#[test]
fn strided_solve_touches_only_its_lane() {
    let m = 4;
    let mut a = sample_matrix(m);
    let x = [1.0, -2.0, 0.5, 3.0];
    let mut packed = vec![f64::NAN; 2 * m];
    a.multiply_strided(&x, 0, 1, &mut packed, 1, 2);
    a.ul_decompose().unwrap();
    a.solve_strided(&mut packed, 1, 2).unwrap();
    for i in 0..m {
        assert!(packed[2 * i].is_nan());
        assert!((packed[2 * i + 1] - x[i]).abs() < 1e-13);
    }
}

#[test]
fn solving_before_factoring_is_an_error() {
    let a = sample_matrix(5);
    let mut b = vec![1.0; 5];
    assert!(matches!(a.solve(&mut b), Err(SpectralError::NotFactored)));
}

#[test]
fn zero_pivot_is_reported() {
    let mut a = BandedTridiag::new(3);
    *a.band_mut(0) = 1.0;
    let err = a.ul_decompose().unwrap_err();
    assert!(matches!(err, SpectralError::SingularPivot { row: 2, .. }));
    assert!(!a.is_factored());
}

#[test]
fn editing_an_entry_clears_the_factorisation() {
    let mut a = sample_matrix(4);
    a.ul_decompose().unwrap();
    *a.diag_mut(2) = 10.0;
    assert!(!a.is_factored());
    assert_eq!(a.diag(2), 10.0);
}

#[test]
fn refactoring_after_an_edit_matches_a_fresh_matrix() {
    let m = 5;
    let rhs: Vec<f64> = (0..m).map(|i| 1.0 + 0.3 * i as f64).collect();

    let mut edited = sample_matrix(m);
    edited.ul_decompose().unwrap();
    *edited.diag_mut(2) = 7.0;
    *edited.band_mut(3) = -2.5;
    edited.ul_decompose().unwrap();
    let mut x = rhs.clone();
    edited.solve(&mut x).unwrap();

    let mut fresh = sample_matrix(m);
    *fresh.diag_mut(2) = 7.0;
    *fresh.band_mut(3) = -2.5;
    let expected = dense_solve(dense(&fresh), rhs.clone());
    fresh.ul_decompose().unwrap();
    let mut y = rhs;
    fresh.solve(&mut y).unwrap();

    for i in 0..m {
        assert!((x[i] - expected[i]).abs() < 1e-12, "row {i}: got {}, want {}", x[i], expected[i]);
        assert_eq!(x[i], y[i]);
    }
}

#[test]
fn failed_factorisation_keeps_the_raw_entries() {
    let mut a = BandedTridiag::new(3);
    *a.band_mut(0) = 1.0;
    *a.band_mut(2) = 4.0;
    *a.lodiag_mut(1) = 2.0;
    *a.diag_mut(1) = 3.0;
    *a.lodiag_mut(2) = 5.0;
    let before = dense(&a);
    assert!(a.ul_decompose().is_err());
    assert_eq!(dense(&a), before);

    *a.diag_mut(2) = 6.0;
    a.ul_decompose().unwrap();
    let x = [1.0, -1.0, 2.0];
    let mut b = vec![0.0; 3];
    a.multiply(&x, &mut b);
    a.solve(&mut b).unwrap();
    for (got, want) in b.iter().zip(&x) {
        assert!((got - want).abs() < 1e-13);
    }
}

#[test]
fn multiply_uses_raw_entries_after_factoring() {
    let mut a = sample_matrix(4);
    let x = [1.0, 0.5, -1.0, 2.0];
    let mut before = vec![0.0; 4];
    a.multiply(&x, &mut before);
    a.ul_decompose().unwrap();
    let mut after = vec![0.0; 4];
    a.multiply(&x, &mut after);
    assert_eq!(before, after);
}
