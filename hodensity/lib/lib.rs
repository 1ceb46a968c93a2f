//! Provides functions and higher-level constructs to compute a density field
//! over a cylindrical (r, z) grid from its expansion in an axially deformed
//! harmonic-oscillator basis:
//! ```text
//! ρ(r, z) = Σ_a Σ_b ρ_ab ψ_a(r, z) ψ_b(r, z)
//! ```
//! where each basis function is separable, ψ(r, z) = R(r) Z(z).
//!
//! Provides the following pieces:
//! - Hermite and generalized Laguerre recurrences ([`poly`])
//! - Basis truncation and direct/memoized evaluation of basis functions
//!   ([`basis`])
//! - Generic regrouping of summation terms by shared sub-indices
//!   ([`factorize`])
//! - A commutative, contention-tolerant reduction slot for parallel producers
//!   ([`accumulator`])
//! - Three interchangeable summation strategies: naive reference, same-*m*
//!   blocks, and full factorization with parallel reduction ([`density`])
//!
//! See [`docs`] for theoretical background.

pub mod accumulator;
pub mod basis;
pub mod config;
pub mod density;
pub mod error;
pub mod factorize;
pub mod io;
pub mod poly;
pub mod utils;

pub mod docs;

/// Default tolerance used when cross-validating summation strategies.
pub const DEF_EPSILON: f64 = 1e-8;

pub type Arr1<S> = ndarray::ArrayBase<S, ndarray::Ix1>;
pub type Arr2<S> = ndarray::ArrayBase<S, ndarray::Ix2>;

pub use basis::{ Basis, PinnedBasis, QuantumIndex };
pub use config::{ BasisConfig, GridConfig, RunConfig };
pub use density::{ DensityCalculator, Strategy };
