//! Miscellaneous tools.

use ndarray::{ self as nd, Ix1 };
use crate::error::ShapeError;

/// Integrate using the trapezoidal rule.
///
/// *Panics if `y` has length less than 2*.
pub fn trapz<S>(y: &nd::ArrayBase<S, Ix1>, dx: f64) -> f64
where S: nd::Data<Elem = f64>
{
    let n: usize = y.len();
    (dx / 2.0) * (y[0] + 2.0 * y.slice(nd::s![1..n - 1]).sum() + y[n - 1])
}

/// Compute the outer product `a bᵀ` of two vectors.
pub fn outer<S, T>(a: &nd::ArrayBase<S, Ix1>, b: &nd::ArrayBase<T, Ix1>)
    -> nd::Array2<f64>
where
    S: nd::Data<Elem = f64>,
    T: nd::Data<Elem = f64>,
{
    nd::Array2::from_shape_fn((a.len(), b.len()), |(i, j)| a[i] * b[j])
}

/// Frobenius (or Euclidean) norm of an array.
pub fn norm<S, D>(a: &nd::ArrayBase<S, D>) -> f64
where
    S: nd::Data<Elem = f64>,
    D: nd::Dimension,
{
    a.iter().map(|ak| ak * ak).sum::<f64>().sqrt()
}

/// Compute `‖a - b‖ / ‖b‖`, falling back to the absolute difference `‖a - b‖`
/// when `b` vanishes.
pub fn relative_diff<S, T, D>(
    a: &nd::ArrayBase<S, D>,
    b: &nd::ArrayBase<T, D>,
) -> Result<f64, ShapeError>
where
    S: nd::Data<Elem = f64>,
    T: nd::Data<Elem = f64>,
    D: nd::Dimension,
{
    ShapeError::check(a, b)?;
    let diff: f64
        = a.iter().zip(b)
        .map(|(ak, bk)| (ak - bk).powi(2))
        .sum::<f64>()
        .sqrt();
    let scale = norm(b);
    Ok(if scale > 0.0 { diff / scale } else { diff })
}
