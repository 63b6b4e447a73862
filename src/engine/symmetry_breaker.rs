//! Symmetry breaking for translations
//!
//! Breaks symmetries detected in bounds by generating lex-leader predicates:
//! for every pair of adjacent interchangeable atoms, the primary variables
//! read in bounds order must be lexicographically no greater than the same
//! variables with the two atoms swapped.

use crate::bool::{BoolValue, BooleanFactory};
use crate::engine::symmetry_detector::{permute_index, IntSet, SymmetryDetector};
use crate::translator::LeafInterpreter;

/// Breaks symmetries for a given problem
pub struct SymmetryBreaker {
    symmetries: Vec<IntSet>,
}

impl SymmetryBreaker {
    /// Constructs a new symmetry breaker for the bounds of `interpreter`
    pub fn new(interpreter: &LeafInterpreter<'_>) -> Self {
        let symmetries = SymmetryDetector::partition(interpreter.bounds())
            .into_iter()
            .filter(|part| part.len() > 1)
            .collect();
        Self { symmetries }
    }

    /// Classes of interchangeable atoms with more than one member
    pub fn symmetries(&self) -> &[IntSet] {
        &self.symmetries
    }

    /// Generates a symmetry breaking predicate (SBP)
    ///
    /// Each lex-leader comparison covers at most `pred_length` variables; a
    /// length of 0 disables symmetry breaking.
    pub fn generate_sbp(&self, interpreter: &LeafInterpreter<'_>, pred_length: usize) -> BoolValue {
        if self.symmetries.is_empty() || pred_length == 0 {
            return BoolValue::TRUE;
        }

        let factory = interpreter.factory();
        let bounds = interpreter.bounds();
        let n = interpreter.universe().size();
        let matrices: Vec<_> = bounds
            .relations()
            .filter_map(|r| interpreter.interpret_relation(r).ok().map(|m| (r.arity(), m)))
            .collect();

        let mut sbp = Vec::new();
        for sym in &self.symmetries {
            let atoms: Vec<usize> = sym.iter().copied().collect();
            for pair in atoms.windows(2) {
                let (prev, cur) = (pair[0], pair[1]);
                let mut original: Vec<BoolValue> = Vec::new();
                let mut permuted: Vec<BoolValue> = Vec::new();

                'relations: for (arity, matrix) in &matrices {
                    for (idx, value) in matrix.iter_indexed() {
                        if original.len() >= pred_length {
                            break 'relations;
                        }
                        if !value.is_variable() {
                            continue;
                        }
                        let perm_idx = permute_index(n, *arity, idx, prev, cur);
                        let perm_value = matrix.get(perm_idx);
                        if perm_idx == idx || at_same_index(&original, perm_value, &permuted, value) {
                            continue;
                        }
                        original.push(value);
                        permuted.push(perm_value);
                    }
                }

                if !original.is_empty() {
                    sbp.push(lex_leader(factory, &original, &permuted));
                }
            }
        }

        log::debug!(
            "symmetry breaking: {} classes, {} predicates",
            self.symmetries.len(),
            sbp.len()
        );
        factory.and_multi(sbp)
    }
}

// Whether (v0, v1) already appears mirrored as (l1[i], l0[i]) for some i
fn at_same_index(l0: &[BoolValue], v0: BoolValue, l1: &[BoolValue], v1: BoolValue) -> bool {
    l0.iter().zip(l1).any(|(&a, &b)| a == v0 && b == v1)
}

/// Lex-leader constraint: the bit string `l0` is lexicographically no
/// greater than `l1`
fn lex_leader(factory: &BooleanFactory, l0: &[BoolValue], l1: &[BoolValue]) -> BoolValue {
    debug_assert_eq!(l0.len(), l1.len());

    let mut constraints = Vec::with_capacity(l0.len());
    let mut prev_equals = BoolValue::TRUE;
    for (&a, &b) in l0.iter().zip(l1) {
        // prev_equals => (a => b)
        constraints.push(factory.implies(prev_equals, factory.implies(a, b)));
        prev_equals = factory.and(prev_equals, factory.iff(a, b));
    }
    factory.and_multi(constraints)
}
