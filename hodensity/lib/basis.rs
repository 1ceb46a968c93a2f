//! Truncated, axially deformed harmonic-oscillator basis.
//!
//! Basis functions are labeled by a [`QuantumIndex`] (*m*, *n*, *n_z*) and are
//! separable in cylindrical coordinates,
//! ```text
//! ψ(r, z) = R_{m,n}(r) Z_{n_z}(z)
//! ```
//! so a 2D sample of ψ over an (r, z) grid is the outer product of two 1D
//! samples. [`Basis`] evaluates these samples from scratch on every call;
//! [`PinnedBasis`] borrows a fixed pair of grids and keeps every 1D sample it
//! has computed for them.
//!
//! ```
//! use ndarray as nd;
//! use hodensity::{ Basis, BasisConfig, QuantumIndex };
//!
//! let basis = Basis::new(BasisConfig::default()).unwrap();
//! assert_eq!(basis.m_max(), 14);
//!
//! let r: nd::Array1<f64> = nd::Array1::linspace(0.0, 8.0, 9);
//! let z: nd::Array1<f64> = nd::Array1::linspace(-10.0, 10.0, 11);
//! let idx = QuantumIndex::new(1, 2, 3);
//! let direct = basis.basis_func(idx, &r, &z).unwrap();
//!
//! let pinned = basis.pin(r.view(), z.view());
//! assert_eq!(pinned.basis_func(idx).unwrap(), direct);
//! ```

use std::{ cell::OnceCell, f64::consts::PI, fmt };
use ndarray as nd;
use crate::{
    Arr1,
    config::BasisConfig,
    error::BasisError,
    poly,
    utils::outer,
};

pub type BasisResult<T> = Result<T, BasisError>;

/// Label of a single basis function.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuantumIndex {
    /// Angular quantum number.
    pub m: usize,
    /// Radial quantum number.
    pub n: usize,
    /// Axial quantum number.
    pub nz: usize,
}

impl QuantumIndex {
    pub fn new(m: usize, n: usize, nz: usize) -> Self { Self { m, n, nz } }
}

impl fmt::Display for QuantumIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(m={}, n={}, n_z={})", self.m, self.n, self.nz)
    }
}

/// Truncated basis geometry.
///
/// The truncation bounds are computed together from (*N*, *Q*) at construction
/// and never change afterward:
/// ```text
/// mMax       = ⌊(N + 2) Q^(-1/3) - 1 / (2 Q)⌋
/// nMax[i]    = ⌊(mMax - i - 1) / 2⌋ + 1
/// n_zMax[i,j] = ⌊(N + 2) Q^(2/3) + 1/2 - (i + 2 j + 1) Q⌋
/// ```
/// with negative counts clamped to zero. A non-positive *Q* collapses the
/// basis to the single state (0, 0, 0).
#[derive(Clone, Debug, PartialEq)]
pub struct Basis {
    config: BasisConfig,
    m_max: usize,
    n_max: Vec<usize>,
    nz_max: nd::Array2<usize>,
    // radial cache slot of (m, 0)
    mn_offsets: Vec<usize>,
    nz_bound: usize,
    size: usize,
}

// floor a real-valued count, clamping at zero
fn floor_count(name: &'static str, x: f64) -> BasisResult<usize> {
    if x.is_nan() || x == f64::INFINITY {
        return Err(BasisError::NonFinite(name, x));
    }
    Ok(x.floor().max(0.0) as usize)
}

impl Basis {
    /// Compute the basis geometry.
    pub fn new(config: BasisConfig) -> BasisResult<Self> {
        BasisError::check_length("br", config.br)?;
        BasisError::check_length("bz", config.bz)?;
        BasisError::check_finite("q", config.q)?;

        let (m_max, n_max, nz_max)
            = if config.q <= 0.0 {
                (1, vec![1], nd::Array2::ones((1, 1)))
            } else {
                let m_max = Self::calc_m_max(config.n, config.q)?;
                let n_max = Self::calc_n_max(m_max);
                let nz_max = Self::calc_nz_max(config.n, config.q, &n_max)?;
                (m_max, n_max, nz_max)
            };
        let mn_offsets: Vec<usize>
            = n_max.iter()
            .scan(0, |acc, nm| { let off = *acc; *acc += nm; Some(off) })
            .collect();
        let nz_bound = nz_max.iter().copied().max().unwrap_or(0);
        let size: usize = nz_max.sum();
        Ok(Self { config, m_max, n_max, nz_max, mn_offsets, nz_bound, size })
    }

    fn calc_m_max(n: usize, q: f64) -> BasisResult<usize> {
        let n = n as f64;
        floor_count("mMax", (n + 2.0) * q.powf(-1.0 / 3.0) - 0.5 / q)
    }

    fn calc_n_max(m_max: usize) -> Vec<usize> {
        (0..m_max).map(|i| (m_max - i - 1) / 2 + 1).collect()
    }

    fn calc_nz_max(n: usize, q: f64, n_max: &[usize])
        -> BasisResult<nd::Array2<usize>>
    {
        let n = n as f64;
        let top = (n + 2.0) * q.powf(2.0 / 3.0) + 0.5;
        let cols = n_max.iter().copied().max().unwrap_or(0);
        let mut nz_max: nd::Array2<usize> = nd::Array2::zeros((n_max.len(), cols));
        for (i, (mut row, &nm)) in nz_max.outer_iter_mut().zip(n_max).enumerate() {
            for (j, nzk) in row.iter_mut().take(nm).enumerate() {
                *nzk = floor_count("n_zMax", top - (i + 2 * j + 1) as f64 * q)?;
            }
        }
        Ok(nz_max)
    }

    /// The parameters this basis was built from.
    pub fn config(&self) -> BasisConfig { self.config }

    /// Radial deformation length.
    pub fn br(&self) -> f64 { self.config.br }

    /// Axial deformation length.
    pub fn bz(&self) -> f64 { self.config.bz }

    /// Number of angular quantum numbers *m* in the basis.
    pub fn m_max(&self) -> usize { self.m_max }

    /// Number of radial quantum numbers *n* for each *m*.
    pub fn n_max(&self) -> &[usize] { &self.n_max }

    /// Number of axial quantum numbers *n_z* for each (*m*, *n*), zero-padded
    /// past `n_max()[m]`.
    pub fn nz_max(&self) -> nd::ArrayView2<'_, usize> { self.nz_max.view() }

    /// Upper bound (exclusive) on *n_z* over the whole basis.
    pub fn nz_bound(&self) -> usize { self.nz_bound }

    /// Upper bound (exclusive) on *n* over the whole basis.
    pub fn n_bound(&self) -> usize { self.nz_max.ncols() }

    /// Number of distinct (*m*, *n*) radial sub-indices.
    pub fn radial_count(&self) -> usize { self.n_max.iter().sum() }

    /// Total number of basis functions.
    pub fn size(&self) -> usize { self.size }

    pub fn is_empty(&self) -> bool { self.size == 0 }

    /// Return `true` if `idx` lies inside the truncated basis.
    pub fn contains(&self, idx: QuantumIndex) -> bool {
        self.contains_mn(idx.m, idx.n) && idx.nz < self.nz_max[[idx.m, idx.n]]
    }

    fn contains_mn(&self, m: usize, n: usize) -> bool {
        m < self.m_max && n < self.n_max[m]
    }

    pub(crate) fn check(&self, idx: QuantumIndex) -> BasisResult<()> {
        self.contains(idx).then_some(()).ok_or(BasisError::OutOfRange(idx))
    }

    pub(crate) fn check_mn(&self, m: usize, n: usize) -> BasisResult<()> {
        self.contains_mn(m, n).then_some(())
            .ok_or(BasisError::RadialOutOfRange(m, n))
    }

    pub(crate) fn check_nz(&self, nz: usize) -> BasisResult<()> {
        (nz < self.nz_bound).then_some(())
            .ok_or(BasisError::AxialOutOfRange(nz))
    }

    // position of (m, n) among all radial sub-indices; assumes (m, n) is in
    // range
    fn mn_slot(&self, m: usize, n: usize) -> usize { self.mn_offsets[m] + n }

    /// Iterate over all (*m*, *n*) radial sub-indices, in order of increasing
    /// *m*, then *n*.
    pub fn radial_indices(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.n_max.iter().enumerate()
            .flat_map(|(m, &nm)| (0..nm).map(move |n| (m, n)))
    }

    /// Iterate over all quantum indices in the basis, in order of increasing
    /// *m*, then *n*, then *n_z*.
    ///
    /// This is the order in which basis functions index the rows and columns
    /// of a density coefficient matrix.
    pub fn indices(&self) -> impl Iterator<Item = QuantumIndex> + '_ {
        self.radial_indices()
            .flat_map(move |(m, n)| {
                (0..self.nz_max[[m, n]]).map(move |nz| QuantumIndex { m, n, nz })
            })
    }

    /// Compute the radial part *R*_{*m*,*n*} of a basis function over `r`.
    pub fn r_part<S>(&self, r: &Arr1<S>, m: usize, n: usize)
        -> BasisResult<nd::Array1<f64>>
    where S: nd::Data<Elem = f64>
    {
        self.check_mn(m, n)?;
        Ok(radial_sample(self.br(), r, m, n))
    }

    /// Compute the axial part *Z*_{*n_z*} of a basis function over `z`.
    pub fn z_part<S>(&self, z: &Arr1<S>, nz: usize)
        -> BasisResult<nd::Array1<f64>>
    where S: nd::Data<Elem = f64>
    {
        self.check_nz(nz)?;
        Ok(axial_sample(self.bz(), z, nz))
    }

    /// Compute a basis function over the grid spanned by `r` and `z`.
    ///
    /// Element `[[i, j]]` of the returned array is ψ(`r[i]`, `z[j]`).
    pub fn basis_func<S, T>(&self, idx: QuantumIndex, r: &Arr1<S>, z: &Arr1<T>)
        -> BasisResult<nd::Array2<f64>>
    where
        S: nd::Data<Elem = f64>,
        T: nd::Data<Elem = f64>,
    {
        self.check(idx)?;
        let rpart = radial_sample(self.br(), r, idx.m, idx.n);
        let zpart = axial_sample(self.bz(), z, idx.nz);
        Ok(outer(&rpart, &zpart))
    }

    /// Bind `self` to a pair of grids for memoized evaluation.
    pub fn pin<'g>(
        &'g self,
        r: nd::ArrayView1<'g, f64>,
        z: nd::ArrayView1<'g, f64>,
    ) -> PinnedBasis<'g>
    {
        PinnedBasis::new(self, r, z)
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Basis {{ br: {}, bz: {}, N: {}, Q: {}, mMax: {}, size: {} }}",
            self.config.br, self.config.bz, self.config.n, self.config.q,
            self.m_max, self.size,
        )
    }
}

// Z(z) = (bz √π 2^nz nz!)^(-1/2) exp(-ζ²/2) H_nz(ζ); ζ = z / bz
fn axial_sample<S>(bz: f64, z: &Arr1<S>, nz: usize) -> nd::Array1<f64>
where S: nd::Data<Elem = f64>
{
    let zeta = z.mapv(|zk| zk / bz);
    let h = poly::hermite(nz, &zeta);
    let norm: f64
        = (1..=nz)
        .fold((bz * PI.sqrt()).sqrt().recip(), |acc, k| {
            acc / (2.0 * k as f64).sqrt()
        });
    nd::Zip::from(&zeta).and(h.row(nz))
        .map_collect(|&zk, &hk| norm * (-zk * zk / 2.0).exp() * hk)
}

// R(r) = (br √π)^(-1) √(n! / (n + m)!) exp(-η/2) (r/br)^m L_n^m(η); η = r² / br²
fn radial_sample<S>(br: f64, r: &Arr1<S>, m: usize, n: usize)
    -> nd::Array1<f64>
where S: nd::Data<Elem = f64>
{
    let rho = r.mapv(|rk| rk / br);
    let eta = rho.mapv(|rk| rk * rk);
    let l = poly::laguerre(m as f64, n, &eta);
    let norm: f64
        = (n + 1..=n + m)
        .fold((br * PI.sqrt()).recip(), |acc, k| acc / (k as f64).sqrt());
    nd::Zip::from(&rho).and(&eta).and(l.row(n))
        .map_collect(|&rk, &ek, &lk| {
            norm * (-ek / 2.0).exp() * rk.powi(m as i32) * lk
        })
}

/// A [`Basis`] bound to a fixed pair of (r, z) grids, caching every 1D sample
/// it computes.
///
/// The grids are borrowed for the lifetime of the cache, so cached samples can
/// never be served for a grid other than the one they were computed over.
/// Each cache entry is written once, on first request, through the same code
/// path as [`Basis::r_part`] and [`Basis::z_part`]; cached and direct samples
/// are therefore identical.
///
/// The cache uses unsynchronized interior mutability, so a `PinnedBasis` can
/// be moved to another thread but not shared between threads. Parallel callers
/// build one per worker from a shared `&Basis`.
#[derive(Debug)]
pub struct PinnedBasis<'g> {
    basis: &'g Basis,
    r: nd::ArrayView1<'g, f64>,
    z: nd::ArrayView1<'g, f64>,
    radial: Vec<OnceCell<nd::Array1<f64>>>,
    axial: Vec<OnceCell<nd::Array1<f64>>>,
}

impl<'g> PinnedBasis<'g> {
    /// Create a new, empty cache over the grids `r` and `z`.
    pub fn new(
        basis: &'g Basis,
        r: nd::ArrayView1<'g, f64>,
        z: nd::ArrayView1<'g, f64>,
    ) -> Self
    {
        let radial = (0..basis.radial_count()).map(|_| OnceCell::new()).collect();
        let axial = (0..basis.nz_bound()).map(|_| OnceCell::new()).collect();
        Self { basis, r, z, radial, axial }
    }

    /// The underlying basis.
    pub fn basis(&self) -> &'g Basis { self.basis }

    /// The radial grid this cache is bound to.
    pub fn r(&self) -> nd::ArrayView1<'g, f64> { self.r }

    /// The axial grid this cache is bound to.
    pub fn z(&self) -> nd::ArrayView1<'g, f64> { self.z }

    /// Get the radial part *R*_{*m*,*n*} over the pinned radial grid.
    pub fn r_part(&self, m: usize, n: usize) -> BasisResult<&nd::Array1<f64>> {
        self.basis.check_mn(m, n)?;
        let slot = &self.radial[self.basis.mn_slot(m, n)];
        Ok(slot.get_or_init(|| radial_sample(self.basis.br(), &self.r, m, n)))
    }

    /// Get the axial part *Z*_{*n_z*} over the pinned axial grid.
    pub fn z_part(&self, nz: usize) -> BasisResult<&nd::Array1<f64>> {
        self.basis.check_nz(nz)?;
        let slot = &self.axial[nz];
        Ok(slot.get_or_init(|| axial_sample(self.basis.bz(), &self.z, nz)))
    }

    /// Compute a basis function over the pinned grids from cached parts.
    pub fn basis_func(&self, idx: QuantumIndex) -> BasisResult<nd::Array2<f64>> {
        self.basis.check(idx)?;
        Ok(outer(self.r_part(idx.m, idx.n)?, self.z_part(idx.nz)?))
    }

    /// Number of (radial, axial) samples computed so far.
    pub fn cached(&self) -> (usize, usize) {
        let count = |cells: &[OnceCell<nd::Array1<f64>>]| {
            cells.iter().filter(|cell| cell.get().is_some()).count()
        };
        (count(&self.radial), count(&self.axial))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::trapz;

    fn fixture() -> Basis {
        Basis::new(BasisConfig {
            br: 1.935801664793151,
            bz: 2.829683956491218,
            n: 14,
            q: 1.3,
        }).unwrap()
    }

    #[test]
    fn truncation_fixture() {
        let basis = fixture();
        assert_eq!(basis.m_max(), 14);
        assert_eq!(basis.n_max(), &[7, 7, 6, 6, 5, 5, 4, 4, 3, 3, 2, 2, 1, 1]);
        let nz_max: nd::Array2<usize> = nd::array![
            [18, 15, 13, 10, 7, 5, 2],
            [16, 14, 11,  9, 6, 3, 1],
            [15, 13, 10,  7, 5, 2, 0],
            [14, 11,  9,  6, 3, 1, 0],
            [13, 10,  7,  5, 2, 0, 0],
            [11,  9,  6,  3, 1, 0, 0],
            [10,  7,  5,  2, 0, 0, 0],
            [ 9,  6,  3,  1, 0, 0, 0],
            [ 7,  5,  2,  0, 0, 0, 0],
            [ 6,  3,  1,  0, 0, 0, 0],
            [ 5,  2,  0,  0, 0, 0, 0],
            [ 3,  1,  0,  0, 0, 0, 0],
            [ 2,  0,  0,  0, 0, 0, 0],
            [ 1,  0,  0,  0, 0, 0, 0],
        ];
        assert_eq!(basis.nz_max(), nz_max);
        assert_eq!(basis.size(), nz_max.sum());
        assert_eq!(basis.nz_bound(), 18);
        assert_eq!(basis.radial_count(), 56);
    }

    #[test]
    fn truncation_is_deterministic() {
        let a = fixture();
        let b = fixture();
        assert_eq!(a, b);
        assert_eq!(a.indices().collect::<Vec<_>>(), b.indices().collect::<Vec<_>>());
    }

    #[test]
    fn degenerate_q_collapses_basis() {
        for q in [0.0, -1.0] {
            let basis = Basis::new(BasisConfig { q, ..BasisConfig::default() })
                .unwrap();
            assert_eq!(basis.m_max(), 1);
            assert_eq!(basis.size(), 1);
            assert_eq!(
                basis.indices().collect::<Vec<_>>(),
                vec![QuantumIndex::new(0, 0, 0)],
            );
        }
    }

    #[test]
    fn bad_parameters_are_errors() {
        let def = BasisConfig::default();
        assert!(matches!(
            Basis::new(BasisConfig { q: f64::NAN, ..def }),
            Err(BasisError::NonFinite("q", _)),
        ));
        assert!(matches!(
            Basis::new(BasisConfig { br: 0.0, ..def }),
            Err(BasisError::BadLength("br", _)),
        ));
        assert!(matches!(
            Basis::new(BasisConfig { bz: f64::INFINITY, ..def }),
            Err(BasisError::NonFinite("bz", _)),
        ));
    }

    #[test]
    fn indices_follow_truncation() {
        let basis = fixture();
        let indices: Vec<QuantumIndex> = basis.indices().collect();
        assert_eq!(indices.len(), basis.size());
        assert_eq!(indices[0], QuantumIndex::new(0, 0, 0));
        assert_eq!(indices[18], QuantumIndex::new(0, 1, 0));
        assert_eq!(*indices.last().unwrap(), QuantumIndex::new(13, 0, 0));
        assert!(indices.iter().all(|idx| basis.contains(*idx)));
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn out_of_range_is_an_error() {
        let basis = fixture();
        let r = nd::array![0.0, 1.0];
        let z = nd::array![-1.0, 1.0];
        assert!(matches!(
            basis.r_part(&r, 14, 0),
            Err(BasisError::RadialOutOfRange(14, 0)),
        ));
        assert!(matches!(
            basis.r_part(&r, 13, 1),
            Err(BasisError::RadialOutOfRange(13, 1)),
        ));
        assert!(matches!(
            basis.z_part(&z, 18),
            Err(BasisError::AxialOutOfRange(18)),
        ));
        assert!(matches!(
            basis.basis_func(QuantumIndex::new(0, 6, 2), &r, &z),
            Err(BasisError::OutOfRange(_)),
        ));
        let pinned = basis.pin(r.view(), z.view());
        assert!(pinned.z_part(18).is_err());
        assert!(pinned.basis_func(QuantumIndex::new(13, 0, 1)).is_err());
    }

    #[test]
    fn axial_parts_are_normalized() {
        let basis = fixture();
        let z: nd::Array1<f64> = nd::Array1::linspace(-40.0, 40.0, 8001);
        let dz = z[1] - z[0];
        for nz in [0, 1, 5, 12, 17] {
            let zpart = basis.z_part(&z, nz).unwrap();
            let norm = trapz(&zpart.mapv(|zk| zk * zk), dz);
            assert!((norm - 1.0).abs() < 1e-6, "nz = {nz}: {norm}");
        }
    }

    #[test]
    fn axial_parts_are_orthogonal() {
        let basis = fixture();
        let z: nd::Array1<f64> = nd::Array1::linspace(-40.0, 40.0, 8001);
        let dz = z[1] - z[0];
        let z2 = basis.z_part(&z, 2).unwrap();
        let z4 = basis.z_part(&z, 4).unwrap();
        assert!(trapz(&(&z2 * &z4), dz).abs() < 1e-6);
    }

    #[test]
    fn radial_parts_are_normalized() {
        let basis = fixture();
        let r: nd::Array1<f64> = nd::Array1::linspace(0.0, 30.0, 30001);
        let dr = r[1] - r[0];
        for (m, n) in [(0, 0), (0, 3), (2, 1), (7, 2), (13, 0)] {
            let rpart = basis.r_part(&r, m, n).unwrap();
            let integrand
                = nd::Zip::from(&r).and(&rpart)
                .map_collect(|&rk, &pk| 2.0 * PI * rk * pk * pk);
            let norm = trapz(&integrand, dr);
            assert!((norm - 1.0).abs() < 1e-6, "(m, n) = ({m}, {n}): {norm}");
        }
    }

    #[test]
    fn basis_func_is_separable() {
        let basis = fixture();
        let r = nd::array![0.0, 0.5, 1.5, 3.0];
        let z = nd::array![-2.0, 0.0, 2.5];
        let idx = QuantumIndex::new(2, 1, 3);
        let psi = basis.basis_func(idx, &r, &z).unwrap();
        let rpart = basis.r_part(&r, 2, 1).unwrap();
        let zpart = basis.z_part(&z, 3).unwrap();
        assert_eq!(psi.dim(), (4, 3));
        for ((i, j), psi_ij) in psi.indexed_iter() {
            assert_eq!(*psi_ij, rpart[i] * zpart[j]);
        }
    }

    #[test]
    fn memoized_matches_direct_exactly() {
        let basis = fixture();
        let r: nd::Array1<f64> = nd::Array1::linspace(-10.0, 10.0, 21);
        let z: nd::Array1<f64> = nd::Array1::linspace(-20.0, 20.0, 21);
        let pinned = basis.pin(r.view(), z.view());
        for idx in basis.indices().step_by(7) {
            let direct = basis.basis_func(idx, &r, &z).unwrap();
            // twice: once populating, once from cache
            assert_eq!(pinned.basis_func(idx).unwrap(), direct);
            assert_eq!(pinned.basis_func(idx).unwrap(), direct);
            assert_eq!(
                pinned.r_part(idx.m, idx.n).unwrap(),
                &basis.r_part(&r, idx.m, idx.n).unwrap(),
            );
            assert_eq!(
                pinned.z_part(idx.nz).unwrap(),
                &basis.z_part(&z, idx.nz).unwrap(),
            );
        }
    }

    #[test]
    fn cache_fills_lazily() {
        let basis = fixture();
        let r = nd::array![0.0, 1.0, 2.0];
        let z = nd::array![-1.0, 0.0, 1.0];
        let pinned = basis.pin(r.view(), z.view());
        assert_eq!(pinned.cached(), (0, 0));
        pinned.z_part(3).unwrap();
        pinned.z_part(3).unwrap();
        assert_eq!(pinned.cached(), (0, 1));
        pinned.basis_func(QuantumIndex::new(1, 1, 3)).unwrap();
        assert_eq!(pinned.cached(), (1, 1));
    }
}
