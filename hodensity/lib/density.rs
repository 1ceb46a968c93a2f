//! Summation of a density field over an (r, z) grid.
//!
//! Given a symmetric coefficient matrix ρ indexed by the flat basis ordering
//! (see [`Basis::indices`]), a [`DensityCalculator`] evaluates
//! ```text
//! ρ(r, z) = Σ_a Σ_b ρ_ab ψ_a(r, z) ψ_b(r, z)
//! ```
//! using one of three [`Strategy`]s that agree up to floating-point
//! reassociation:
//! - [`Reference`][Strategy::Reference]: every pair (a, b), every basis
//!   function evaluated from scratch.
//! - [`DiagonalBlock`][Strategy::DiagonalBlock]: as above, restricted to pairs
//!   with *m_a* = *m_b*.
//! - [`Factorized`][Strategy::Factorized]: same-*m* pairs reduced by symmetry
//!   and grouped by *n_z* of side A, *n_z* of side B, then (*m*, *n*) of side A,
//!   so that every shared factor is computed once per group. Top-level groups
//!   are summed in parallel.
//!
//! The two restricted strategies rely on ρ being block diagonal in *m*, which
//! holds for axially symmetric densities. Cross-*m* entries are reported at
//! construction but otherwise only seen by the reference strategy.

use std::{
    fmt,
    path::Path,
    str::FromStr,
    sync::atomic::{ AtomicUsize, Ordering },
};
use ndarray as nd;
use rand::Rng;
use rayon::prelude::*;
use serde::{ Deserialize, Serialize };
use tracing::{ debug, info_span, warn };
use crate::{
    Arr1,
    accumulator::Accumulator,
    basis::{ Basis, PinnedBasis, QuantumIndex },
    config::BasisConfig,
    error::{ BasisError, DensityError, StrategyError },
    factorize::{
        Group,
        Term,
        factorize_filtered,
        select_mn_a,
        select_nz_a,
        select_nz_b,
        symmetry_filter,
    },
    io,
    utils::outer,
};

pub type DensityResult<T> = Result<T, DensityError>;

/// Relative tolerance on ρ_ab - ρ_ba, scaled by max |ρ|.
pub const SYMMETRY_EPSILON: f64 = 1e-8;

/// Method used to evaluate the density sum.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Reference,
    DiagonalBlock,
    #[default]
    Factorized,
}

impl Strategy {
    /// All strategies, slowest first.
    pub const ALL: [Self; 3] = [Self::Reference, Self::DiagonalBlock, Self::Factorized];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::DiagonalBlock => "diagonal-block",
            Self::Factorized => "factorized",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Strategy {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| StrategyError(s.to_string()))
    }
}

/// Lookup from quantum indices to flat basis positions.
#[derive(Clone, Debug)]
pub struct IndexTable {
    table: nd::Array3<Option<usize>>,
}

impl IndexTable {
    pub fn new(basis: &Basis) -> Self {
        let mut table: nd::Array3<Option<usize>>
            = nd::Array3::from_elem(
                (basis.m_max(), basis.n_bound(), basis.nz_bound()), None);
        basis.indices().enumerate()
            .for_each(|(k, idx)| { table[[idx.m, idx.n, idx.nz]] = Some(k); });
        Self { table }
    }

    /// Flat position of `idx`, if it belongs to the basis.
    pub fn get(&self, idx: QuantumIndex) -> Option<usize> {
        self.table.get([idx.m, idx.n, idx.nz]).copied().flatten()
    }
}

/// Draw a random symmetric coefficient matrix over `basis` that is block
/// diagonal in *m*, with entries uniform in [-1, 1).
pub fn random_block_rho<R>(basis: &Basis, rng: &mut R) -> nd::Array2<f64>
where R: Rng
{
    let indices: Vec<QuantumIndex> = basis.indices().collect();
    let n = indices.len();
    let mut rho: nd::Array2<f64> = nd::Array2::zeros((n, n));
    for i in 0..n {
        for j in i..n {
            if indices[i].m != indices[j].m { continue; }
            let x: f64 = rng.gen_range(-1.0..1.0);
            rho[[i, j]] = x;
            rho[[j, i]] = x;
        }
    }
    rho
}

// a term tree: n_z of A -> n_z of B -> (m, n) of A -> terms
type Leaf = Group<(usize, usize), Term>;
type Branch = Group<usize, Leaf>;
type Tree = Vec<Group<usize, Branch>>;

/// Owns a basis, its coefficient matrix, and optionally a dedicated worker
/// pool, and evaluates the density over arbitrary grids.
///
/// ```
/// use ndarray as nd;
/// use hodensity::{ BasisConfig, DensityCalculator, Strategy };
///
/// let config = BasisConfig { n: 2, ..BasisConfig::default() };
/// let basis = hodensity::Basis::new(config).unwrap();
/// let rho: nd::Array2<f64> = nd::Array2::eye(basis.size());
/// let calc = DensityCalculator::new(config, rho).unwrap();
///
/// let r: nd::Array1<f64> = nd::Array1::linspace(-4.0, 4.0, 9);
/// let z: nd::Array1<f64> = nd::Array1::linspace(-6.0, 6.0, 13);
/// let fast = calc.compute(&r, &z, Strategy::Factorized).unwrap();
/// let slow = calc.compute(&r, &z, Strategy::Reference).unwrap();
/// assert_eq!(fast.dim(), (9, 13));
/// assert!(hodensity::utils::relative_diff(&fast, &slow).unwrap() < 1e-8);
/// ```
#[derive(Debug)]
pub struct DensityCalculator {
    basis: Basis,
    rho: nd::Array2<f64>,
    index: IndexTable,
    pool: Option<rayon::ThreadPool>,
}

impl DensityCalculator {
    /// Build the basis described by `config` and validate `rho` against it.
    ///
    /// `rho` must be square with dimension equal to the basis size, have only
    /// finite entries, and be symmetric to within [`SYMMETRY_EPSILON`] times
    /// its largest entry.
    pub fn new(config: BasisConfig, rho: nd::Array2<f64>) -> DensityResult<Self> {
        let basis = Basis::new(config)?;
        let index = IndexTable::new(&basis);
        Self::check_rho(&basis, &rho)?;
        debug!(basis = %basis, "density coefficients validated");
        Ok(Self { basis, rho, index, pool: None })
    }

    /// Like [`Self::new`], reading the coefficient matrix from a file.
    pub fn from_path<P>(config: BasisConfig, path: P) -> DensityResult<Self>
    where P: AsRef<Path>
    {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading density coefficients");
        Self::new(config, io::read_matrix(path)?)
    }

    /// Run the parallel strategy on a dedicated pool of `threads` workers
    /// instead of the global pool.
    pub fn with_threads(mut self, threads: usize) -> DensityResult<Self> {
        let pool
            = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|k| format!("hodensity-{k}"))
            .build()?;
        self.pool = Some(pool);
        Ok(self)
    }

    fn check_rho(basis: &Basis, rho: &nd::Array2<f64>) -> DensityResult<()> {
        let (rows, cols) = rho.dim();
        let expected = basis.size();
        if rows != expected || cols != expected {
            return Err(DensityError::Dimension { expected, rows, cols });
        }
        if let Some(((i, j), _))
            = rho.indexed_iter().find(|(_, rho_ij)| !rho_ij.is_finite())
        {
            return Err(DensityError::NonFiniteCoefficient(i, j));
        }
        let scale = rho.iter().fold(0.0_f64, |acc, rho_ij| acc.max(rho_ij.abs()));
        let tol = SYMMETRY_EPSILON * scale;
        for i in 0..rows {
            for j in i + 1..cols {
                let (rij, rji) = (rho[[i, j]], rho[[j, i]]);
                if (rij - rji).abs() > tol {
                    return Err(DensityError::Asymmetric(i, j, rij, rji));
                }
            }
        }
        let indices: Vec<QuantumIndex> = basis.indices().collect();
        let cross_m: usize
            = rho.indexed_iter()
            .filter(|((i, j), rho_ij)| {
                **rho_ij != 0.0 && indices[*i].m != indices[*j].m
            })
            .count();
        if cross_m > 0 {
            warn!(
                entries = cross_m,
                "density coefficients couple different m; \
                only the reference strategy includes these"
            );
        }
        Ok(())
    }

    /// The underlying basis.
    pub fn basis(&self) -> &Basis { &self.basis }

    /// The coefficient matrix.
    pub fn rho(&self) -> nd::ArrayView2<'_, f64> { self.rho.view() }

    /// Flat position of `idx` in the basis ordering.
    pub fn index_of(&self, idx: QuantumIndex) -> Option<usize> {
        self.index.get(idx)
    }

    /// Get ρ_ab.
    pub fn coefficient(&self, a: QuantumIndex, b: QuantumIndex)
        -> DensityResult<f64>
    {
        let ia = self.index_of(a).ok_or(BasisError::OutOfRange(a))?;
        let ib = self.index_of(b).ok_or(BasisError::OutOfRange(b))?;
        Ok(self.rho[[ia, ib]])
    }

    /// Evaluate the density over the grid spanned by `r` and `z` with the
    /// given strategy.
    ///
    /// Element `[[i, j]]` of the returned array is ρ(`r[i]`, `z[j]`).
    pub fn compute<S, T>(&self, r: &Arr1<S>, z: &Arr1<T>, strategy: Strategy)
        -> DensityResult<nd::Array2<f64>>
    where
        S: nd::Data<Elem = f64>,
        T: nd::Data<Elem = f64>,
    {
        let _span
            = info_span!("density", %strategy, nr = r.len(), nz = z.len())
            .entered();
        DensityError::check_grid("r", r)?;
        DensityError::check_grid("z", z)?;
        let rho
            = match strategy {
                Strategy::Reference => self.sum_reference(r, z)?,
                Strategy::DiagonalBlock => self.sum_diagonal_block(r, z)?,
                Strategy::Factorized => self.sum_factorized(r.view(), z.view())?,
            };
        if let Some(((i, j), _))
            = rho.indexed_iter().find(|(_, rho_ij)| !rho_ij.is_finite())
        {
            return Err(DensityError::NonFiniteResult(i, j));
        }
        debug!("done");
        Ok(rho)
    }

    /// Shorthand for `compute(r, z, Strategy::Reference)`.
    pub fn reference<S, T>(&self, r: &Arr1<S>, z: &Arr1<T>)
        -> DensityResult<nd::Array2<f64>>
    where
        S: nd::Data<Elem = f64>,
        T: nd::Data<Elem = f64>,
    {
        self.compute(r, z, Strategy::Reference)
    }

    /// Shorthand for `compute(r, z, Strategy::DiagonalBlock)`.
    pub fn diagonal_block<S, T>(&self, r: &Arr1<S>, z: &Arr1<T>)
        -> DensityResult<nd::Array2<f64>>
    where
        S: nd::Data<Elem = f64>,
        T: nd::Data<Elem = f64>,
    {
        self.compute(r, z, Strategy::DiagonalBlock)
    }

    /// Shorthand for `compute(r, z, Strategy::Factorized)`.
    pub fn factorized<S, T>(&self, r: &Arr1<S>, z: &Arr1<T>)
        -> DensityResult<nd::Array2<f64>>
    where
        S: nd::Data<Elem = f64>,
        T: nd::Data<Elem = f64>,
    {
        self.compute(r, z, Strategy::Factorized)
    }

    fn sum_reference<S, T>(&self, r: &Arr1<S>, z: &Arr1<T>)
        -> DensityResult<nd::Array2<f64>>
    where
        S: nd::Data<Elem = f64>,
        T: nd::Data<Elem = f64>,
    {
        let basis = &self.basis;
        let n_max = basis.n_max();
        let nz_max = basis.nz_max();
        let mut rho: nd::Array2<f64> = nd::Array2::zeros((r.len(), z.len()));
        for m_a in 0..basis.m_max() {
            for n_a in 0..n_max[m_a] {
                for nz_a in 0..nz_max[[m_a, n_a]] {
                    let a = QuantumIndex::new(m_a, n_a, nz_a);
                    let psi_a = basis.basis_func(a, r, z)?;
                    for m_b in 0..basis.m_max() {
                        for n_b in 0..n_max[m_b] {
                            for nz_b in 0..nz_max[[m_b, n_b]] {
                                let b = QuantumIndex::new(m_b, n_b, nz_b);
                                let psi_b = basis.basis_func(b, r, z)?;
                                let rho_ab = self.coefficient(a, b)?;
                                rho.scaled_add(rho_ab, &(&psi_a * &psi_b));
                            }
                        }
                    }
                }
            }
        }
        Ok(rho)
    }

    fn sum_diagonal_block<S, T>(&self, r: &Arr1<S>, z: &Arr1<T>)
        -> DensityResult<nd::Array2<f64>>
    where
        S: nd::Data<Elem = f64>,
        T: nd::Data<Elem = f64>,
    {
        let basis = &self.basis;
        let n_max = basis.n_max();
        let nz_max = basis.nz_max();
        let mut rho: nd::Array2<f64> = nd::Array2::zeros((r.len(), z.len()));
        for m in 0..basis.m_max() {
            for n_a in 0..n_max[m] {
                for nz_a in 0..nz_max[[m, n_a]] {
                    let a = QuantumIndex::new(m, n_a, nz_a);
                    let psi_a = basis.basis_func(a, r, z)?;
                    for n_b in 0..n_max[m] {
                        for nz_b in 0..nz_max[[m, n_b]] {
                            let b = QuantumIndex::new(m, n_b, nz_b);
                            let psi_b = basis.basis_func(b, r, z)?;
                            let rho_ab = self.coefficient(a, b)?;
                            rho.scaled_add(rho_ab, &(&psi_a * &psi_b));
                        }
                    }
                }
            }
        }
        Ok(rho)
    }

    // all same-m pairs, symmetry-reduced and grouped three levels deep
    fn term_tree(&self) -> Tree {
        let basis = &self.basis;
        let pairs
            = basis.indices()
            .flat_map(|a| {
                basis.indices()
                    .filter(move |b| b.m == a.m)
                    .map(move |b| Term::new(a, b))
            });
        factorize_filtered(pairs, select_nz_a, symmetry_filter).into_iter()
            .map(|by_nz_a| {
                let nz_a = by_nz_a.key;
                let branches: Vec<Branch>
                    = by_nz_a.factorize(select_nz_b).into_iter()
                    .map(|by_nz_b| {
                        let nz_b = by_nz_b.key;
                        Group { key: nz_b, terms: by_nz_b.factorize(select_mn_a) }
                    })
                    .collect();
                Group { key: nz_a, terms: branches }
            })
            .collect()
    }

    // groups are handed out one at a time from a shared counter to a fixed set
    // of workers, each keeping a single `PinnedBasis` for all of its groups
    fn sum_factorized<'a>(
        &'a self,
        r: nd::ArrayView1<'a, f64>,
        z: nd::ArrayView1<'a, f64>,
    ) -> DensityResult<nd::Array2<f64>>
    {
        let tree = self.term_tree();
        let terms: usize
            = tree.iter()
            .flat_map(|g| g.terms.iter())
            .flat_map(|h| h.terms.iter())
            .map(Group::len)
            .sum();
        debug!(groups = tree.len(), terms, "built term tree");
        let acc: Accumulator<nd::Array2<f64>> = Accumulator::new();
        let next = AtomicUsize::new(0);
        let worker = |_: usize| -> DensityResult<()> {
            let pinned = self.basis.pin(r, z);
            while let Some(group) = tree.get(next.fetch_add(1, Ordering::Relaxed)) {
                match self.sum_group(&pinned, group) {
                    Ok(partial) => { acc.push(partial); },
                    Err(err) => {
                        next.store(tree.len(), Ordering::Relaxed);
                        return Err(err);
                    },
                }
            }
            Ok(())
        };
        let run = || {
            let workers = rayon::current_num_threads().min(tree.len()).max(1);
            debug!(workers, "summing groups");
            (0..workers).into_par_iter().try_for_each(worker)
        };
        match &self.pool {
            Some(pool) => pool.install(run)?,
            None => run()?,
        }
        debug!(buffered = acc.buffered(), "reduced partial grids");
        Ok(acc.sum(nd::Array2::zeros((r.len(), z.len()))))
    }

    // Σ_{nz_b} (Σ_{m, n_a} R_{m,n_a} Σ_{n_b} c ρ_ab R_{m,n_b}) ⊗ (Z_{nz_a} Z_{nz_b})
    fn sum_group(&self, pinned: &PinnedBasis, group: &Group<usize, Branch>)
        -> DensityResult<nd::Array2<f64>>
    {
        let (nr, nz) = (pinned.r().len(), pinned.z().len());
        let mut partial: nd::Array2<f64> = nd::Array2::zeros((nr, nz));
        let z_a = pinned.z_part(group.key)?;
        for branch in group.terms.iter() {
            let row = z_a * pinned.z_part(branch.key)?;
            let mut col: nd::Array1<f64> = nd::Array1::zeros(nr);
            for leaf in branch.terms.iter() {
                let (m, n_a) = leaf.key;
                let mut weighted: nd::Array1<f64> = nd::Array1::zeros(nr);
                for term in leaf.terms.iter() {
                    let w = f64::from(term.count) * self.coefficient(term.a, term.b)?;
                    weighted.scaled_add(w, pinned.r_part(term.b.m, term.b.n)?);
                }
                weighted *= pinned.r_part(m, n_a)?;
                col += &weighted;
            }
            partial += &outer(&col, &row);
        }
        Ok(partial)
    }
}
