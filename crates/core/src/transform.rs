//! Transform plans for Fourier (x, z) and Chebyshev (y) directions.
//!
//! FFT plans are expensive to build and immutable once built, so they are
//! cached process-wide keyed by `(length, direction)` and handed out as
//! `Arc` handles. A [`TransformPlans`] bundles the handles a field of a given
//! geometry needs; fields of equal geometry share one bundle. All transform
//! methods take `&self` and allocate their own scratch, so a bundle can be
//! used from several rayon workers at once.
//!
//! The Chebyshev transform is a type-I DCT on the Gauss-Lobatto points,
//! computed as a complex FFT of the even extension of length `2(N-1)`.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};

use log::debug;
use num_complex::Complex64;
use rustfft::{Fft, FftDirection, FftPlanner};

// ============================================================================
// Plan cache
// ============================================================================

struct PlanCache {
    ffts: HashMap<(usize, bool), Arc<dyn Fft<f64>>>,
    cheby: HashMap<usize, Arc<ChebyTransform>>,
    bundles: HashMap<(usize, usize, usize), Arc<TransformPlans>>,
}

impl PlanCache {
    fn new() -> Self {
        Self {
            ffts: HashMap::new(),
            cheby: HashMap::new(),
            bundles: HashMap::new(),
        }
    }

    fn fft(&mut self, len: usize, direction: FftDirection) -> Arc<dyn Fft<f64>> {
        let inverse = matches!(direction, FftDirection::Inverse);
        self.ffts
            .entry((len, inverse))
            .or_insert_with(|| FftPlanner::new().plan_fft(len, direction))
            .clone()
    }

    fn cheby(&mut self, n: usize) -> Arc<ChebyTransform> {
        if let Some(plan) = self.cheby.get(&n) {
            return plan.clone();
        }
        let fft = (n >= 2).then(|| self.fft(2 * (n - 1), FftDirection::Forward));
        let plan = Arc::new(ChebyTransform { n, fft });
        self.cheby.insert(n, plan.clone());
        plan
    }
}

static PLAN_CACHE: LazyLock<Mutex<PlanCache>> = LazyLock::new(|| Mutex::new(PlanCache::new()));

fn with_cache<T>(f: impl FnOnce(&mut PlanCache) -> T) -> T {
    // A poisoned cache only means another thread panicked mid-insert; the
    // map itself is still consistent.
    let mut guard = match PLAN_CACHE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    f(&mut guard)
}

// ============================================================================
// Chebyshev transform
// ============================================================================

/// Chebyshev transform between values at the `N` Gauss-Lobatto points
/// `x_j = cos(pi j / (N-1))` and coefficients of `T_0 .. T_{N-1}`.
pub struct ChebyTransform {
    n: usize,
    fft: Option<Arc<dyn Fft<f64>>>,
}

impl std::fmt::Debug for ChebyTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChebyTransform").field("n", &self.n).finish()
    }
}

impl ChebyTransform {
    /// Fetch (or build) the shared plan for length `n`.
    pub fn new(n: usize) -> Arc<Self> {
        with_cache(|cache| cache.cheby(n))
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Gridpoint values to spectral coefficients, in place.
    pub fn forward(&self, data: &mut [f64]) {
        assert_eq!(data.len(), self.n, "Chebyshev transform length mismatch");
        if self.n < 2 {
            return;
        }
        self.redft00(data);
        let m = (self.n - 1) as f64;
        let last = self.n - 1;
        data[0] *= 0.5 / m;
        data[last] *= 0.5 / m;
        for value in &mut data[1..last] {
            *value /= m;
        }
    }

    /// Spectral coefficients to gridpoint values, in place.
    pub fn backward(&self, data: &mut [f64]) {
        assert_eq!(data.len(), self.n, "Chebyshev transform length mismatch");
        if self.n < 2 {
            return;
        }
        let last = self.n - 1;
        for value in &mut data[1..last] {
            *value *= 0.5;
        }
        self.redft00(data);
    }

    /// Unnormalised DCT-I: `Y_k = x_0 + (-1)^k x_m + 2 sum_{j=1}^{m-1} x_j cos(pi j k / m)`.
    fn redft00(&self, data: &mut [f64]) {
        let Some(fft) = &self.fft else {
            return;
        };
        let m = self.n - 1;
        let mut ext = vec![Complex64::default(); 2 * m];
        for (j, &x) in data.iter().enumerate() {
            ext[j] = Complex64::new(x, 0.0);
        }
        for j in 1..m {
            ext[2 * m - j] = Complex64::new(data[j], 0.0);
        }
        fft.process(&mut ext);
        for (value, y) in data.iter_mut().zip(&ext) {
            *value = y.re;
        }
    }
}

// ============================================================================
// Field transform bundle
// ============================================================================

/// All plans needed by a field with `nx x ny x nz` gridpoints.
pub struct TransformPlans {
    nx: usize,
    ny: usize,
    nz: usize,
    x_forward: Arc<dyn Fft<f64>>,
    x_inverse: Arc<dyn Fft<f64>>,
    z_forward: Arc<dyn Fft<f64>>,
    z_inverse: Arc<dyn Fft<f64>>,
    cheby: Arc<ChebyTransform>,
}

impl std::fmt::Debug for TransformPlans {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformPlans")
            .field("nx", &self.nx)
            .field("ny", &self.ny)
            .field("nz", &self.nz)
            .finish()
    }
}

impl TransformPlans {
    pub fn acquire(nx: usize, ny: usize, nz: usize) -> Arc<Self> {
        with_cache(|cache| {
            if let Some(plans) = cache.bundles.get(&(nx, ny, nz)) {
                return plans.clone();
            }
            debug!("building transform plans for grid {nx}x{ny}x{nz}");
            let plans = Arc::new(Self {
                nx,
                ny,
                nz,
                x_forward: cache.fft(nx, FftDirection::Forward),
                x_inverse: cache.fft(nx, FftDirection::Inverse),
                z_forward: cache.fft(nz, FftDirection::Forward),
                z_inverse: cache.fft(nz, FftDirection::Inverse),
                cheby: cache.cheby(ny),
            });
            cache.bundles.insert((nx, ny, nz), plans.clone());
            plans
        })
    }

    pub fn cheby(&self) -> &ChebyTransform {
        &self.cheby
    }

    /// Number of stored z modes, `Nz/2 + 1`.
    pub fn mz(&self) -> usize {
        self.nz / 2 + 1
    }

    /// Real-to-complex transform of one xz plane.
    ///
    /// `real` is laid out `nz + Nz*nx`, `spectral` as `mz + Mz*mx`. The result
    /// is scaled by `1/(Nx Nz)` so that coefficients are the Fourier amplitudes.
    pub fn forward_xz(&self, real: &[f64], spectral: &mut [Complex64]) {
        let (nx, nz, mz) = (self.nx, self.nz, self.mz());
        assert_eq!(real.len(), nx * nz, "physical plane has wrong length");
        assert_eq!(spectral.len(), nx * mz, "spectral plane has wrong length");

        let mut row = vec![Complex64::default(); nz];
        for ix in 0..nx {
            for (dst, &src) in row.iter_mut().zip(&real[ix * nz..(ix + 1) * nz]) {
                *dst = Complex64::new(src, 0.0);
            }
            self.z_forward.process(&mut row);
            spectral[ix * mz..(ix + 1) * mz].copy_from_slice(&row[..mz]);
        }

        let scale = 1.0 / (nx * nz) as f64;
        let mut column = vec![Complex64::default(); nx];
        for kz in 0..mz {
            for (ix, value) in column.iter_mut().enumerate() {
                *value = spectral[kz + mz * ix];
            }
            self.x_forward.process(&mut column);
            for (ix, value) in column.iter().enumerate() {
                spectral[kz + mz * ix] = value * scale;
            }
        }
    }

    /// Complex-to-real transform of one xz plane; inverse of [`Self::forward_xz`].
    pub fn inverse_xz(&self, spectral: &[Complex64], real: &mut [f64]) {
        let (nx, nz, mz) = (self.nx, self.nz, self.mz());
        assert_eq!(real.len(), nx * nz, "physical plane has wrong length");
        assert_eq!(spectral.len(), nx * mz, "spectral plane has wrong length");

        let mut work = spectral.to_vec();
        let mut column = vec![Complex64::default(); nx];
        for kz in 0..mz {
            for (ix, value) in column.iter_mut().enumerate() {
                *value = work[kz + mz * ix];
            }
            self.x_inverse.process(&mut column);
            for (ix, value) in column.iter().enumerate() {
                work[kz + mz * ix] = *value;
            }
        }

        let mut row = vec![Complex64::default(); nz];
        for ix in 0..nx {
            let modes = &work[ix * mz..(ix + 1) * mz];
            row[..mz].copy_from_slice(modes);
            for k in mz..nz {
                row[k] = modes[nz - k].conj();
            }
            self.z_inverse.process(&mut row);
            for (dst, src) in real[ix * nz..(ix + 1) * nz].iter_mut().zip(&row) {
                *dst = src.re;
            }
        }
    }
}
