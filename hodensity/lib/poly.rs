//! Three-term recurrences for the two orthogonal polynomial families behind
//! the basis: (physicists') Hermite polynomials along the symmetry axis and
//! generalized Laguerre polynomials in the radial direction.
//!
//! The functions return every degree up to the requested maximum at once, as
//! rows of a 2D array, since the recurrences produce them anyway.
//!
//! ```
//! use ndarray as nd;
//! use hodensity::poly::hermite;
//!
//! let x: nd::Array1<f64> = nd::array![-1.0, 0.0, 0.5];
//! let h = hermite(2, &x);
//! // H₂(x) = 4x² - 2
//! assert!(
//!     h.row(2).iter().zip(&x)
//!         .all(|(hk, xk)| (hk - (4.0 * xk * xk - 2.0)).abs() < 1e-12)
//! )
//! ```

use ndarray as nd;
use num_traits::Float;
use crate::Arr1;

/// Evaluate the Hermite polynomials *H*₀, ..., *H*ₙ over `x`, for *n* =
/// `n_max`.
///
/// Row *k* of the returned array holds *H*ₖ sampled over `x`:
/// ```text
/// H₀(x) = 1
/// H₁(x) = 2x
/// Hₖ(x) = 2x Hₖ₋₁(x) - 2(k - 1) Hₖ₋₂(x)
/// ```
pub fn hermite<S, A>(n_max: usize, x: &Arr1<S>) -> nd::Array2<A>
where
    S: nd::Data<Elem = A>,
    A: Float,
{
    let two = A::one() + A::one();
    let mut h: nd::Array2<A> = nd::Array2::ones((n_max + 1, x.len()));
    if n_max == 0 { return h; }
    h.row_mut(1).assign(&x.mapv(|xk| two * xk));
    // k - 1 for the row being filled
    let mut km1 = A::one();
    for k in 2..=n_max {
        let (prev, mut next) = h.view_mut().split_at(nd::Axis(0), k);
        nd::Zip::from(next.row_mut(0))
            .and(x)
            .and(prev.row(k - 1))
            .and(prev.row(k - 2))
            .for_each(|hk, &xk, &hkm1, &hkm2| {
                *hk = two * xk * hkm1 - two * km1 * hkm2;
            });
        km1 = km1 + A::one();
    }
    h
}

/// Evaluate the generalized Laguerre polynomials *L*₀^α, ..., *L*ₙ^α over `x`,
/// for *n* = `n_max`.
///
/// Row *k* of the returned array holds *L*ₖ^α sampled over `x`:
/// ```text
/// L₀^α(x) = 1
/// L₁^α(x) = 1 + α - x
/// Lₖ^α(x) = (2 + (α - 1 - x) / k) Lₖ₋₁^α(x) - (1 + (α - 1) / k) Lₖ₋₂^α(x)
/// ```
pub fn laguerre<S, A>(alpha: A, n_max: usize, x: &Arr1<S>) -> nd::Array2<A>
where
    S: nd::Data<Elem = A>,
    A: Float,
{
    let one = A::one();
    let two = one + one;
    let mut l: nd::Array2<A> = nd::Array2::ones((n_max + 1, x.len()));
    if n_max == 0 { return l; }
    l.row_mut(1).assign(&x.mapv(|xk| one + alpha - xk));
    let mut k = two;
    for i in 2..=n_max {
        let c2 = one + (alpha - one) / k;
        let (prev, mut next) = l.view_mut().split_at(nd::Axis(0), i);
        nd::Zip::from(next.row_mut(0))
            .and(x)
            .and(prev.row(i - 1))
            .and(prev.row(i - 2))
            .for_each(|lk, &xk, &lkm1, &lkm2| {
                let c1 = two + (alpha - xk - one) / k;
                *lk = c1 * lkm1 - c2 * lkm2;
            });
        k = k + one;
    }
    l
}

/// Evaluate [`laguerre`] for every integer α = *m* in 0, ..., `m_max` - 1 at
/// once.
///
/// Entry `[m, k, i]` of the returned array holds *L*ₖ^*m*(`x[i]`), so that
/// `laguerre_all(m_max, n_max, x).index_axis(Axis(0), m)` equals
/// `laguerre(m, n_max, x)`.
pub fn laguerre_all<S, A>(m_max: usize, n_max: usize, x: &Arr1<S>)
    -> nd::Array3<A>
where
    S: nd::Data<Elem = A>,
    A: Float,
{
    let mut table: nd::Array3<A> = nd::Array3::zeros((m_max, n_max + 1, x.len()));
    let mut alpha = A::zero();
    for mut slice in table.outer_iter_mut() {
        slice.assign(&laguerre(alpha, n_max, x));
        alpha = alpha + A::one();
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel_norm(calc: nd::ArrayView1<f64>, target: &[f64]) -> f64 {
        calc.iter().zip(target)
            .map(|(c, t)| (c / t - 1.0).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    #[test]
    fn hermite_reference_values() {
        let x = nd::array![-3.1, -2.3, -1.0, -0.3, 0.1, 4.3, 9.2, 13.7];
        let h = hermite(6, &x);
        assert_eq!(h.dim(), (7, 8));

        let h4 = [
            1.02835360e+03, 2.05825600e+02, -2.00000000e+01, 7.80960000e+00,
            1.15216000e+01, 4.59456160e+03, 1.10572154e+05, 5.54643458e+05,
        ];
        assert!(rel_norm(h.row(4), &h4) < 1e-8);

        let h5 = [
            -4.76676832e+03, -3.88909760e+02, 8.00000000e+00, -3.17577600e+01,
            1.18403200e+01, 3.48375818e+04, 1.98557479e+06, 1.50339793e+07,
        ];
        assert!(rel_norm(h.row(5), &h5) < 1e-8);
    }

    #[test]
    fn laguerre_reference_values() {
        let x = nd::array![0.1, 0.3, 1.2, 1.8, 2.0, 2.5, 7.1, 11.1];

        let l = laguerre(4.0, 3, &x);
        let l24 = [14.405, 13.245, 8.52, 5.82, 5., 3.125, -2.395, 10.005];
        assert!(rel_norm(l.row(2), &l24) < 1e-8);

        let l = laguerre(5.0, 3, &x);
        let l35 = [
            53.23983333, 47.95550000, 27.87200000, 17.5880,
            14.66666667, 8.39583333, -0.81183333, 10.1015,
        ];
        assert!(rel_norm(l.row(3), &l35) < 1e-8);
    }

    #[test]
    fn laguerre_table_matches_single_alpha() {
        let x = nd::array![0.1, 0.3, 1.2, 1.8, 2.0, 2.5, 7.1, 11.1];
        let table = laguerre_all(6, 3, &x);
        assert_eq!(table.dim(), (6, 4, 8));
        for (m, slice) in table.outer_iter().enumerate() {
            assert_eq!(slice, laguerre(m as f64, 3, &x));
        }

        let l24 = [14.405, 13.245, 8.52, 5.82, 5., 3.125, -2.395, 10.005];
        assert!(rel_norm(table.slice(nd::s![4, 2, ..]), &l24) < 1e-8);

        assert_eq!(laguerre_all(0, 3, &x).dim(), (0, 4, 8));
    }

    #[test]
    fn degree_zero_is_constant() {
        let x = nd::array![-2.0, 0.0, 3.5];
        assert_eq!(hermite(0, &x), nd::Array2::<f64>::ones((1, 3)));
        assert_eq!(laguerre(2.0, 0, &x), nd::Array2::<f64>::ones((1, 3)));
    }

    #[test]
    fn empty_samples() {
        let x: nd::Array1<f64> = nd::Array1::zeros(0);
        assert_eq!(hermite(4, &x).dim(), (5, 0));
        assert_eq!(laguerre(1.0, 4, &x).dim(), (5, 0));
    }
}
