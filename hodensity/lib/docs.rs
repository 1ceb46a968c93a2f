//! Theoretical background.
//!
//! # Contents
//! - [Background](#background)
//! - [Truncation](#truncation)
//! - [Factorizing the sum](#factorizing-the-sum)
//! - [Symmetry reduction](#symmetry-reduction)
//!
//! # Background
//! Self-consistent mean-field calculations of axially deformed nuclei expand
//! single-particle states in the eigenfunctions of an axially symmetric
//! harmonic oscillator[^1], with oscillator lengths *b*⊥ = `br` perpendicular
//! to the symmetry axis and *b*_z = `bz` along it. In cylindrical coordinates
//! (*r*, *φ*, *z*) and for *φ* = 0, the eigenfunctions separate as
//! ```text
//! ψ_{m,n,n_z}(r, z) = R_{m,n}(r) Z_{n_z}(z)
//! ```
//! with
//! ```text
//!                 1                  -ζ²/2
//! Z_{n_z}(z) = ----------------- e      H_{n_z}(ζ),     ζ = z / b_z
//!              √(b_z √π 2^n_z n_z!)
//!
//!                  1      n!      -η/2  r  m
//! R_{m,n}(r) = -------  √------  e     (--)  L_n^m(η),  η = r² / b⊥²
//!              b⊥ √π   (n + m)!         b⊥
//! ```
//! where *H* are the physicists' Hermite polynomials and *L*^*m* are the
//! generalized Laguerre polynomials (see [`poly`][crate::poly]). Both factors
//! are normalized, to ∫ *Z*² d*z* = 1 and ∫ 2π *r* *R*² d*r* = 1.
//!
//! The one-body density is then fully described by a real symmetric matrix of
//! coefficients ρ_ab over basis states *a*, *b*,
//! ```text
//! ρ(r, z) = Σ_a Σ_b ρ_ab ψ_a(r, z) ψ_b(r, z)
//! ```
//! and for an axially symmetric density ρ_ab vanishes unless *m_a* = *m_b*.
//!
//! # Truncation
//! The basis is cut off using an integer *N* and a deformation-like real
//! number *Q* (roughly *b*⊥/*b*_z squared) such that states are kept in order
//! of increasing oscillator energy:
//! ```text
//! mMax        = ⌊(N + 2) Q^(-1/3) - 1/(2Q)⌋
//! nMax[m]     = ⌊(mMax - m - 1) / 2⌋ + 1
//! n_zMax[m,n] = ⌊(N + 2) Q^(2/3) + 1/2 - (m + 2n + 1) Q⌋
//! ```
//! A state (*m*, *n*, *n_z*) belongs to the basis when *m* < mMax,
//! *n* < nMax[*m*] and *n_z* < n_zMax[*m*, *n*]. The flat ordering of states,
//! which indexes rows and columns of ρ, runs over *m*, then *n*, then *n_z*.
//!
//! # Factorizing the sum
//! Evaluating the double sum literally over an *N_r* × *N_z* grid costs one
//! full grid product per pair of states, and each basis function is
//! recomputed for every pair it appears in. Since every factor of a summand
//! depends on only a few quantum numbers, the sum can instead be regrouped so
//! that each factor is pulled out of the sums it does not participate in. With
//! ρ block diagonal in *m*,
//! ```text
//! ρ(r, z) = Σ_{n_z^a} Σ_{n_z^b} [Z_{n_z^a}(z) Z_{n_z^b}(z)]
//!             × Σ_{m, n_a} R_{m,n_a}(r) Σ_{n_b} ρ_ab R_{m,n_b}(r)
//! ```
//! where the inner sums only involve 1D samples. Each (*n_z^a*, *n_z^b*) term
//! is an outer product of a radial column with an axial row, so the only
//! grid-sized operations left are one rank-one update per distinct pair of
//! axial numbers. The outermost sum is split across threads, each summing into
//! its own partial grid.
//!
//! # Symmetry reduction
//! Since ρ_ab = ρ_ba and the summand is symmetric under *a* ↔ *b*, a pair and
//! its transpose contribute equally. Within a block of fixed *m*, the term
//! (*a*, *b*) is
//! - counted twice if *n_b* < *n_a* and *n_z^b* < *n_z^a*; its transpose fails
//!   both of the following tests and is dropped;
//! - counted once if *n_b* ≤ *n_a* or *n_z^b* ≤ *n_z^a* otherwise; in this case
//!   the transpose also passes this test and is kept;
//! - dropped otherwise.
//!
//! The surviving terms, weighted by their counts, sum to the same value as the
//! full set of pairs.
//!
//! [^1]: D. Vautherin, "Hartree-Fock calculations with Skyrme's interaction.
//! II. Axially deformed nuclei." Phys. Rev. C **7** 296 (1973).
