//! Flat, resizable real buffer used by the banded solver and Chebyshev series.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::ops::{AddAssign, Index, IndexMut, MulAssign, SubAssign};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::mathdefs::{self, REAL_DIGITS};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    data: Vec<f64>,
}

impl Vector {
    pub fn zeros(n: usize) -> Self {
        Self { data: vec![0.0; n] }
    }

    pub fn from_vec(data: Vec<f64>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Resize, keeping the leading entries and zero-filling new ones.
    pub fn resize(&mut self, n: usize) {
        self.data.resize(n, 0.0);
    }

    pub fn set_to_zero(&mut self) {
        self.data.fill(0.0);
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn subvector(&self, offset: usize, n: usize) -> Vector {
        assert!(
            offset + n <= self.len(),
            "subvector [{offset}, {}) exceeds length {}",
            offset + n,
            self.len()
        );
        Vector::from_vec(self.data[offset..offset + n].to_vec())
    }

    pub fn dot(&self, other: &Vector) -> f64 {
        assert_eq!(self.len(), other.len(), "vector lengths must match");
        self.data.iter().zip(&other.data).map(|(a, b)| a * b).sum()
    }

    pub fn l1_norm(&self) -> f64 {
        self.data.iter().map(|x| x.abs()).sum()
    }

    pub fn l2_norm2(&self) -> f64 {
        self.data.iter().map(|x| x * x).sum()
    }

    pub fn l2_norm(&self) -> f64 {
        self.l2_norm2().sqrt()
    }

    pub fn linf_norm(&self) -> f64 {
        self.data.iter().fold(0.0, |acc: f64, x| acc.max(x.abs()))
    }

    pub fn linf_dist(&self, other: &Vector) -> f64 {
        assert_eq!(self.len(), other.len(), "vector lengths must match");
        self.data
            .iter()
            .zip(&other.data)
            .fold(0.0, |acc: f64, (a, b)| acc.max((a - b).abs()))
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    /// Index of the element of largest magnitude.
    pub fn max_elem_index(&self) -> Option<usize> {
        self.data
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(idx, _)| idx)
    }

    /// One value per line, full precision.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        for x in &self.data {
            writeln!(w, "{:.*e}", REAL_DIGITS, x)?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut data = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() || line.starts_with('%') {
                continue;
            }
            data.push(mathdefs::parse_real(&line)?);
        }
        Ok(Self { data })
    }

    pub fn binary_dump<W: Write>(&self, w: &mut W) -> Result<()> {
        mathdefs::write_usize(w, self.len())?;
        for &x in &self.data {
            mathdefs::write_f64(w, x)?;
        }
        Ok(())
    }

    pub fn binary_load<R: Read>(r: &mut R) -> Result<Self> {
        let n = mathdefs::read_usize(r)?;
        let data = mathdefs::read_values(r, n, mathdefs::read_f64)?;
        Ok(Self { data })
    }
}

impl Index<usize> for Vector {
    type Output = f64;

    #[inline]
    fn index(&self, i: usize) -> &f64 {
        &self.data[i]
    }
}

impl IndexMut<usize> for Vector {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.data[i]
    }
}

impl MulAssign<f64> for Vector {
    fn mul_assign(&mut self, c: f64) {
        for x in &mut self.data {
            *x *= c;
        }
    }
}

impl AddAssign<&Vector> for Vector {
    fn add_assign(&mut self, other: &Vector) {
        assert_eq!(self.len(), other.len(), "vector lengths must match");
        for (x, y) in self.data.iter_mut().zip(&other.data) {
            *x += y;
        }
    }
}

impl SubAssign<&Vector> for Vector {
    fn sub_assign(&mut self, other: &Vector) {
        assert_eq!(self.len(), other.len(), "vector lengths must match");
        for (x, y) in self.data.iter_mut().zip(&other.data) {
            *x -= y;
        }
    }
}

impl From<Vector> for Vec<f64> {
    fn from(v: Vector) -> Self {
        v.data
    }
}
