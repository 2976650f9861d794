//! Spectral fields and solvers for wall-bounded channel geometries.
//!
//! Fields are Fourier x Chebyshev x Fourier expansions on
//! `[0, Lx] x [a, b] x [0, Lz]`; the wall-normal direction is solved with
//! Chebyshev-tau Helmholtz systems.

pub mod banded;
pub mod buffer;
pub mod chebyshev;
pub mod config;
pub mod diffops;
pub mod error;
pub mod field;
pub mod grid;
pub mod helmholtz;
pub mod mathdefs;
pub mod perturb;
pub mod poisson;
pub mod profiler;
pub mod transform;

pub use error::{Result, SpectralError};

#[cfg(test)]
mod _tests_banded;
#[cfg(test)]
mod _tests_buffer;
#[cfg(test)]
mod _tests_chebyshev;
#[cfg(test)]
mod _tests_config;
#[cfg(test)]
mod _tests_helmholtz;
#[cfg(test)]
mod _tests_mathdefs;
#[cfg(test)]
mod _tests_perturb;
#[cfg(test)]
mod _tests_poisson;
