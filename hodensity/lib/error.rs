//! Collection of all error types.
//!
//! All errors derive [`thiserror::Error`], making them composable when allowed
//! and compatible with application code using [`anyhow`][anyhow].
//!
//! [anyhow]: https://crates.io/crates/anyhow

use std::path::PathBuf;
use ndarray as nd;
use thiserror::Error;
use crate::basis::QuantumIndex;

/// Returned when an operation requiring equal-shape arrays encounters arrays
/// with unequal shapes.
#[derive(Debug, Error)]
#[error("encountered arrays with incompatible shapes; got {0:?} and {1:?}")]
pub struct ShapeError(pub Vec<usize>, pub Vec<usize>);

impl ShapeError {
    pub(crate) fn check<S, T, A, B, D>(
        a: &nd::ArrayBase<S, D>,
        b: &nd::ArrayBase<T, D>,
    ) -> Result<(), Self>
    where
        S: nd::Data<Elem = A>,
        T: nd::Data<Elem = B>,
        D: nd::Dimension,
    {
        (a.shape() == b.shape()).then_some(())
            .ok_or_else(|| Self(a.shape().to_vec(), b.shape().to_vec()))
    }
}

/// Returned from basis construction and evaluation.
#[derive(Debug, Error)]
pub enum BasisError {
    /// Returned when a basis parameter is NaN or infinite.
    #[error("basis parameter `{0}` must be finite; got {1}")]
    NonFinite(&'static str, f64),

    /// Returned when a deformation length is not strictly positive.
    #[error("basis deformation length `{0}` must be greater than 0; got {1}")]
    BadLength(&'static str, f64),

    /// Returned when a quantum index lies outside the truncated basis.
    #[error("quantum index {0} lies outside the truncated basis")]
    OutOfRange(QuantumIndex),

    /// Returned when a radial sub-index (m, n) lies outside the truncated
    /// basis.
    #[error("radial sub-index (m={0}, n={1}) lies outside the truncated basis")]
    RadialOutOfRange(usize, usize),

    /// Returned when an axial sub-index nz lies outside the truncated basis.
    #[error("axial sub-index nz={0} lies outside the truncated basis")]
    AxialOutOfRange(usize),
}

impl BasisError {
    pub(crate) fn check_finite(name: &'static str, x: f64)
        -> Result<(), Self>
    {
        x.is_finite().then_some(()).ok_or(Self::NonFinite(name, x))
    }

    pub(crate) fn check_length(name: &'static str, b: f64)
        -> Result<(), Self>
    {
        Self::check_finite(name, b)?;
        (b > 0.0).then_some(()).ok_or(Self::BadLength(name, b))
    }
}

/// Returned from loading or validating run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Returned when a configuration file cannot be read.
    #[error("cannot read config file {0:?}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    /// Returned when a configuration file cannot be deserialized.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Returned when a coordinate grid has non-finite bounds.
    #[error("grid `{0}` must have finite bounds; got [{1}, {2}]")]
    BadGrid(&'static str, f64, f64),
}

/// Returned when a strategy name cannot be parsed.
#[derive(Debug, Error)]
#[error("unknown summation strategy {0:?}; expected one of `reference`, `diagonal-block`, `factorized`")]
pub struct StrategyError(pub String);

/// Returned from density coefficient loading and density summation.
#[derive(Debug, Error)]
pub enum DensityError {
    /// Returned when the coefficient matrix does not match the basis size.
    #[error("coefficient matrix must be {expected}×{expected} to match the basis; got {rows}×{cols}")]
    Dimension { expected: usize, rows: usize, cols: usize },

    /// Returned when the coefficient matrix is not symmetric.
    #[error("coefficient matrix is not symmetric at ({0}, {1}): {2} vs {3}")]
    Asymmetric(usize, usize, f64, f64),

    /// Returned when the coefficient matrix holds a NaN or infinite entry.
    #[error("coefficient matrix holds a non-finite entry at ({0}, {1})")]
    NonFiniteCoefficient(usize, usize),

    /// Returned when a coordinate grid holds a NaN or infinite value.
    #[error("{0} grid holds a non-finite value at index {1}")]
    NonFiniteGrid(&'static str, usize),

    /// Returned when a summation produces a NaN or infinite value.
    #[error("density summation produced a non-finite value at ({0}, {1})")]
    NonFiniteResult(usize, usize),

    /// Returned when a matrix file is malformed.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Returned when a matrix file cannot be read or written.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// [`BasisError`]
    #[error("basis error: {0}")]
    Basis(#[from] BasisError),

    /// Returned when a dedicated worker pool cannot be built.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl DensityError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse { line, message: message.into() }
    }

    pub(crate) fn check_grid<S>(name: &'static str, x: &crate::Arr1<S>)
        -> Result<(), Self>
    where S: nd::Data<Elem = f64>
    {
        match x.iter().position(|xk| !xk.is_finite()) {
            Some(k) => Err(Self::NonFiniteGrid(name, k)),
            None => Ok(()),
        }
    }
}
