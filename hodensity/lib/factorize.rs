//! Regrouping of summation terms by shared sub-indices.
//!
//! A flat sum over terms `t` whose summand contains a factor depending only on
//! some key `k(t)` can be rewritten as a sum over distinct keys of that factor
//! times a sum over the terms sharing the key, so that the factor is computed
//! once per key instead of once per term. [`Factorizer`] performs this
//! grouping for an arbitrary key selector; applying it again to the terms of
//! each [`Group`] builds a multi-level tree.
//!
//! ```
//! use hodensity::factorize::factorize;
//!
//! let words = ["apple", "avocado", "banana", "blueberry", "cherry", "apricot"];
//! let groups = factorize(words, |w: &&str| w.chars().next().unwrap());
//! let keys: Vec<char> = groups.iter().map(|g| g.key).collect();
//! assert_eq!(keys, vec!['a', 'b', 'c']);
//! assert_eq!(groups[0].terms, vec!["apple", "avocado", "apricot"]);
//! ```
//!
//! Duplicate terms are not merged: a term added twice appears twice in its
//! group.

use std::{ collections::HashMap, hash::Hash };
use crate::basis::QuantumIndex;

/// A set of terms sharing the same key.
#[derive(Clone, Debug, PartialEq)]
pub struct Group<K, T> {
    /// The key factored out of every term.
    pub key: K,
    /// The terms, in insertion order.
    pub terms: Vec<T>,
}

impl<K, T> Group<K, T> {
    /// Number of terms in the group.
    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    /// Factor the terms of this group further by another key.
    pub fn factorize<K2, S>(self, selector: S) -> Vec<Group<K2, T>>
    where
        K2: Eq + Hash + Clone,
        S: Fn(&T) -> K2,
    {
        factorize(self.terms, selector)
    }
}

fn accept_all<T>(_: &mut T) -> bool { true }

/// Dispatches terms into [`Group`]s by a key selector, optionally passing each
/// term through a filter first.
///
/// Groups are kept in the order their keys are first seen. The filter may
/// reject a term (by returning `false`) or mutate it before it is grouped.
pub struct Factorizer<K, T, S, F> {
    selector: S,
    filter: F,
    groups: Vec<Group<K, T>>,
    slots: HashMap<K, usize>,
}

impl<K, T, S> Factorizer<K, T, S, fn(&mut T) -> bool>
where
    K: Eq + Hash + Clone,
    S: Fn(&T) -> K,
{
    /// Create a new, empty factorizer accepting all terms.
    pub fn new(selector: S) -> Self {
        Self {
            selector,
            filter: accept_all::<T>,
            groups: Vec::new(),
            slots: HashMap::new(),
        }
    }
}

impl<K, T, S, F> Factorizer<K, T, S, F>
where
    K: Eq + Hash + Clone,
    S: Fn(&T) -> K,
    F: FnMut(&mut T) -> bool,
{
    /// Replace the input filter.
    ///
    /// *Panics if terms have already been added*.
    pub fn with_filter<G>(self, filter: G) -> Factorizer<K, T, S, G>
    where G: FnMut(&mut T) -> bool
    {
        assert!(self.groups.is_empty(), "filter set after terms were added");
        Factorizer {
            selector: self.selector,
            filter,
            groups: self.groups,
            slots: self.slots,
        }
    }

    /// Filter and dispatch a single term.
    pub fn add(&mut self, mut term: T) {
        if !(self.filter)(&mut term) { return; }
        let key = (self.selector)(&term);
        match self.slots.get(&key) {
            Some(&k) => { self.groups[k].terms.push(term); },
            None => {
                self.slots.insert(key.clone(), self.groups.len());
                self.groups.push(Group { key, terms: vec![term] });
            },
        }
    }

    /// Filter and dispatch many terms.
    pub fn extend<I>(mut self, terms: I) -> Self
    where I: IntoIterator<Item = T>
    {
        terms.into_iter().for_each(|term| self.add(term));
        self
    }

    /// Number of groups so far.
    pub fn len(&self) -> usize { self.groups.len() }

    pub fn is_empty(&self) -> bool { self.groups.is_empty() }

    /// Number of terms accepted so far.
    pub fn term_count(&self) -> usize {
        self.groups.iter().map(Group::len).sum()
    }

    /// Return the groups.
    pub fn into_groups(self) -> Vec<Group<K, T>> { self.groups }
}

/// Group `terms` by `selector`, keeping every term.
pub fn factorize<K, T, I, S>(terms: I, selector: S) -> Vec<Group<K, T>>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
    S: Fn(&T) -> K,
{
    Factorizer::new(selector).extend(terms).into_groups()
}

/// Group `terms` by `selector`, keeping only terms accepted (and possibly
/// modified) by `filter`.
pub fn factorize_filtered<K, T, I, S, F>(terms: I, selector: S, filter: F)
    -> Vec<Group<K, T>>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
    S: Fn(&T) -> K,
    F: FnMut(&mut T) -> bool,
{
    Factorizer::new(selector).with_filter(filter).extend(terms).into_groups()
}

/// A single term of the density double sum: a pair of basis functions and the
/// number of times the pair is counted.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Term {
    pub a: QuantumIndex,
    pub b: QuantumIndex,
    pub count: u32,
}

impl Term {
    /// Create a new term, counted once.
    pub fn new(a: QuantumIndex, b: QuantumIndex) -> Self {
        Self { a, b, count: 1 }
    }

    /// Swap the two sides.
    pub fn transposed(self) -> Self {
        Self { a: self.b, b: self.a, count: self.count }
    }
}

/// Keep one representative of each symmetric pair of terms.
///
/// For a symmetric weight (ρ_ab = ρ_ba) and a set of terms closed under
/// swapping `a` and `b`, the terms kept by this filter, weighted by their
/// updated counts, sum to the same value as the full set:
/// - `n_b < n_a` and `nz_b < nz_a`: kept, counted twice (its transpose is
///   dropped);
/// - otherwise `n_b <= n_a` or `nz_b <= nz_a`: kept as is (its transpose is
///   kept too);
/// - otherwise dropped.
pub fn symmetry_filter(term: &mut Term) -> bool {
    let (a, b) = (term.a, term.b);
    if b.n < a.n && b.nz < a.nz {
        term.count *= 2;
        true
    } else {
        b.n <= a.n || b.nz <= a.nz
    }
}

/// Select *n_z* of side A.
pub fn select_nz_a(term: &Term) -> usize { term.a.nz }

/// Select *n_z* of side B.
pub fn select_nz_b(term: &Term) -> usize { term.b.nz }

/// Select (*m*, *n*) of side A.
pub fn select_mn_a(term: &Term) -> (usize, usize) { (term.a.m, term.a.n) }

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn q(m: usize, n: usize, nz: usize) -> QuantumIndex {
        QuantumIndex::new(m, n, nz)
    }

    // all ordered pairs over a small same-m index set
    fn pairs() -> Vec<Term> {
        let idx: Vec<QuantumIndex>
            = (0..2).flat_map(|m| {
                (0..3).flat_map(move |n| (0..4).map(move |nz| q(m, n, nz)))
            })
            .collect();
        idx.iter()
            .flat_map(|&a| {
                idx.iter().filter(move |b| b.m == a.m).map(move |&b| Term::new(a, b))
            })
            .collect()
    }

    #[test]
    fn groups_in_first_seen_order() {
        let groups = factorize(vec![3, 1, 4, 1, 5, 9, 2, 6], |x: &i32| x % 3);
        let keys: Vec<i32> = groups.iter().map(|g| g.key).collect();
        assert_eq!(keys, vec![0, 1, 2]);
        assert_eq!(groups[0].terms, vec![3, 9, 6]);
        assert_eq!(groups[1].terms, vec![1, 4, 1]);
        assert_eq!(groups[2].terms, vec![5, 2]);
    }

    #[test]
    fn empty_input() {
        let groups: Vec<Group<i32, i32>> = factorize(Vec::new(), |x: &i32| *x);
        assert!(groups.is_empty());
    }

    #[test]
    fn every_term_in_exactly_one_group() {
        let terms = pairs();
        let groups = factorize(terms.clone(), select_nz_a);
        assert_eq!(groups.iter().map(Group::len).sum::<usize>(), terms.len());
        for group in groups.iter() {
            assert!(group.terms.iter().all(|t| t.a.nz == group.key));
        }
        let keys: HashSet<usize> = groups.iter().map(|g| g.key).collect();
        assert_eq!(keys.len(), groups.len());
    }

    #[test]
    fn filter_rejects_and_mutates() {
        let mut fac
            = Factorizer::new(|x: &i32| (x / 10) % 2)
            .with_filter(|x: &mut i32| { *x *= 10; *x < 50 });
        (0..10).for_each(|x| fac.add(x));
        assert_eq!(fac.term_count(), 5);
        let groups = fac.into_groups();
        assert_eq!(groups[0].terms, vec![0, 20, 40]);
        assert_eq!(groups[1].terms, vec![10, 30]);
    }

    #[test]
    fn multi_level_tree() {
        let terms = pairs();
        let n_terms = terms.len();
        let tree: Vec<_>
            = factorize(terms, select_nz_a).into_iter()
            .map(|g| {
                let key = g.key;
                let sub: Vec<_>
                    = g.factorize(select_nz_b).into_iter()
                    .map(|h| (h.key, h.factorize(select_mn_a)))
                    .collect();
                (key, sub)
            })
            .collect();
        let mut count = 0;
        for (nz_a, sub) in tree.iter() {
            for (nz_b, leaves) in sub.iter() {
                for leaf in leaves.iter() {
                    for t in leaf.terms.iter() {
                        assert_eq!(t.a.nz, *nz_a);
                        assert_eq!(t.b.nz, *nz_b);
                        assert_eq!((t.a.m, t.a.n), leaf.key);
                        count += 1;
                    }
                }
            }
        }
        assert_eq!(count, n_terms);
    }

    #[test]
    fn symmetry_filter_cases() {
        let mut t = Term::new(q(0, 2, 3), q(0, 1, 1));
        assert!(symmetry_filter(&mut t));
        assert_eq!(t.count, 2);

        let mut t = Term::new(q(0, 1, 1), q(0, 2, 3));
        assert!(!symmetry_filter(&mut t));

        let mut t = Term::new(q(0, 2, 1), q(0, 1, 3));
        assert!(symmetry_filter(&mut t));
        assert_eq!(t.count, 1);
        let mut t = t.transposed();
        assert!(symmetry_filter(&mut t));
        assert_eq!(t.count, 1);

        let mut t = Term::new(q(1, 2, 2), q(1, 2, 2));
        assert!(symmetry_filter(&mut t));
        assert_eq!(t.count, 1);
    }

    #[test]
    fn symmetry_reduction_preserves_weighted_sum() {
        use rand::{ Rng, SeedableRng, rngs::StdRng };
        let mut rng = StdRng::seed_from_u64(10525);
        let terms = pairs();
        let weights: HashMap<(QuantumIndex, QuantumIndex), f64>
            = terms.iter()
            .filter(|t| t.a <= t.b)
            .flat_map(|t| {
                let w: f64 = rng.gen_range(-1.0..1.0);
                [((t.a, t.b), w), ((t.b, t.a), w)]
            })
            .collect();
        let f = |idx: QuantumIndex| 1.0 + idx.m as f64 + 0.3 * idx.n as f64 - 0.17 * idx.nz as f64;
        let summand = |t: &Term| {
            t.count as f64 * weights[&(t.a, t.b)] * f(t.a) * f(t.b)
        };

        let full: f64 = terms.iter().map(summand).sum();
        let reduced: f64
            = factorize_filtered(terms.clone(), select_nz_a, symmetry_filter)
            .iter()
            .flat_map(|g| g.terms.iter())
            .map(summand)
            .sum();
        assert!((full - reduced).abs() < 1e-10 * full.abs().max(1.0));

        let kept: usize
            = factorize_filtered(terms.clone(), select_nz_a, symmetry_filter)
            .iter().map(Group::len).sum();
        assert!(kept < terms.len());
    }
}
