//! Symmetry detection for bounds
//!
//! Partitions a universe into classes of interchangeable atoms. Two atoms are
//! interchangeable when swapping them maps every lower and upper bound onto
//! itself. Such transpositions compose, so the relation is an equivalence and
//! each class can be grown by comparing against its smallest atom.

use crate::instance::{Bounds, TupleSet};
use std::collections::BTreeSet;

/// Ordered set of atom indices
pub type IntSet = BTreeSet<usize>;

/// Symmetry detector for partitioning universe atoms
pub struct SymmetryDetector<'a> {
    bounds: &'a Bounds,
    usize: usize,
}

impl<'a> SymmetryDetector<'a> {
    fn new(bounds: &'a Bounds) -> Self {
        Self {
            bounds,
            usize: bounds.universe().size(),
        }
    }

    /// Returns the partition of the universe into symmetry classes
    ///
    /// Classes are disjoint, non-empty, cover the universe, and are listed in
    /// order of their smallest atom.
    pub fn partition(bounds: &Bounds) -> Vec<IntSet> {
        let detector = SymmetryDetector::new(bounds);
        let mut parts: Vec<IntSet> = Vec::new();
        for atom in 0..detector.usize {
            let home = parts.iter_mut().find(|part| {
                part.first()
                    .is_some_and(|&representative| detector.interchangeable(representative, atom))
            });
            match home {
                Some(part) => {
                    part.insert(atom);
                }
                None => parts.push(IntSet::from([atom])),
            }
        }
        parts
    }

    fn interchangeable(&self, a: usize, b: usize) -> bool {
        self.bounds.relations().all(|relation| {
            let lower = self.bounds.lower_bound(relation);
            let upper = self.bounds.upper_bound(relation);
            [lower, upper]
                .into_iter()
                .flatten()
                .all(|set| self.invariant(set, a, b))
        })
    }

    fn invariant(&self, set: &TupleSet, a: usize, b: usize) -> bool {
        set.indices()
            .all(|idx| set.contains_index(permute_index(self.usize, set.arity(), idx, a, b)))
    }
}

/// Permutes a tuple index by swapping two atom indices
pub fn permute_index(universe_size: usize, arity: usize, tuple_idx: usize, from: usize, to: usize) -> usize {
    let mut result = 0;
    let mut remaining = tuple_idx;

    for i in (0..arity).rev() {
        let divisor = universe_size.pow(i as u32);
        let mut atom_idx = remaining / divisor;

        if atom_idx == from {
            atom_idx = to;
        } else if atom_idx == to {
            atom_idx = from;
        }

        result += atom_idx * divisor;
        remaining %= divisor;
    }

    result
}
