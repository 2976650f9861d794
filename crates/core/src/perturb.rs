//! Random divergence-free perturbations with no-slip walls.
//!
//! A perturbation is the curl of a random vector potential `psi`. Each
//! profile of `psi` is a random polynomial of degree `Ny - 5` with
//! coefficients decaying like `decay^n`, multiplied by `(1 - s^2)^2` where
//! `s` maps `[a, b]` onto `[-1, 1]`. The product still fits in `Ny` Chebyshev
//! modes, so `psi` and `dpsi/dy` vanish at both walls and so does every
//! component of `curl psi`. Only dealiased modes are filled.

use log::debug;
use num_complex::Complex64;
use rand::Rng;

use crate::chebyshev::{chebypoints, ComplexChebyCoeff};
use crate::diffops::curl;
use crate::field::FlowField;
use crate::grid::FieldGeometry;
use crate::mathdefs::FieldState;

/// Random profile that vanishes with its slope at `a` and `b`.
fn random_wall_profile<R: Rng + ?Sized>(
    rng: &mut R,
    ny: usize,
    a: f64,
    b: f64,
    mag: f64,
    decay: f64,
    real: bool,
) -> ComplexChebyCoeff {
    let mut p = ComplexChebyCoeff::new(ny, a, b, FieldState::Spectral);
    if ny < 5 {
        return p;
    }
    let mut scale = mag;
    for n in 0..ny - 4 {
        let im = if real { 0.0 } else { rng.gen_range(-1.0..1.0) };
        p.set(n, scale * Complex64::new(rng.gen_range(-1.0..1.0), im));
        scale *= decay;
    }
    p.make_physical();
    let y = chebypoints(ny, a, b);
    let (center, half) = (0.5 * (a + b), 0.5 * (b - a));
    for n in 0..ny {
        let s = (y[n] - center) / half;
        let w = (1.0 - s * s) * (1.0 - s * s);
        p.re[n] *= w;
        p.im[n] *= w;
    }
    p.make_spectral();
    p
}

impl FlowField {
    /// Add a random perturbation in the single Fourier mode `(kx, kz)` and,
    /// for `kz = 0`, its conjugate partner `-kx`.
    pub fn add_perturbation<R: Rng + ?Sized>(&mut self, rng: &mut R, kx: i64, kz: i64, mag: f64, decay: f64) {
        assert!(kz >= 0, "kz = {kz} must be non-negative");
        let modes = [(kx, kz)];
        self.add_random_curl(rng, &modes, mag, decay);
    }

    /// Add random perturbations in every dealiased mode with `|kx| <= kxmax`
    /// and `kz <= kzmax`. Mode `(kx, kz)` gets magnitude
    /// `mag * decay^(|kx| + |kz|)`. The `(0, 0)` mode is skipped unless
    /// `meanflow`.
    pub fn add_perturbations<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        kxmax: i64,
        kzmax: i64,
        mag: f64,
        decay: f64,
        meanflow: bool,
    ) {
        let kxmax = kxmax.min(self.kxmax_dealiased());
        let kzmax = kzmax.min(self.kzmax_dealiased());
        let mut modes = Vec::new();
        for kx in 0..=kxmax {
            for kz in 0..=kzmax {
                if kx == 0 && kz == 0 && !meanflow {
                    continue;
                }
                modes.push((kx, kz));
                // kz = 0 partners of negative kx are filled by conjugation
                if kx > 0 && kz > 0 {
                    modes.push((-kx, kz));
                }
            }
        }
        self.add_random_curl(rng, &modes, mag, decay);
    }

    /// Replace `self` with a random perturbation over all dealiased modes,
    /// scaled so that its normalized L2 norm is `magnitude`.
    pub fn perturb<R: Rng + ?Sized>(&mut self, rng: &mut R, magnitude: f64, decay: f64, meanflow: bool) {
        let (kxmax, kzmax) = (self.kxmax_dealiased(), self.kzmax_dealiased());
        self.set_to_zero();
        self.set_padded(true);
        self.add_perturbations(rng, kxmax, kzmax, 1.0, decay, meanflow);
        let norm = crate::diffops::l2_norm(self, true);
        if norm > 0.0 {
            *self *= magnitude / norm;
        }
    }

    fn add_random_curl<R: Rng + ?Sized>(&mut self, rng: &mut R, modes: &[(i64, i64)], mag: f64, decay: f64) {
        assert_eq!(self.nd(), 3, "perturbations need a 3-vector field");
        let geom: FieldGeometry = *self.geometry();
        let mut psi = FlowField::new(geom);
        for &(kx, kz) in modes {
            if self.is_aliased(kx, kz) {
                continue;
            }
            let mode_mag = mag * decay.powi((kx.abs() + kz) as i32);
            let (mx, mz) = (psi.mx_index(kx), psi.mz_index(kz));
            for i in 0..3 {
                let real = kx == 0 && kz == 0;
                let p = random_wall_profile(rng, geom.ny, geom.a, geom.b, mode_mag, decay, real);
                psi.set_profile(mx, mz, i, &p);
                if kz == 0 && kx != 0 {
                    let mut conj = p;
                    conj.conjugate();
                    psi.set_profile(psi.mx_index(-kx), mz, i, &conj);
                }
            }
        }
        let mut u = curl(&psi);
        u.set_padded(true);
        debug!("adding random curl over {} modes", modes.len());

        let (xz, y) = (self.xz_state(), self.y_state());
        self.make_spectral();
        *self += &u;
        self.make_state(xz, y);
    }
}
