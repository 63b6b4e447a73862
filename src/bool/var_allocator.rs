//! Variable allocation for SAT encoding
//!
//! Primary variables are allocated before translation begins, one per tuple
//! in `upper \ lower` of each bounded relation, in bounds order and then in
//! tuple-index order. The allocator remembers which tuple every variable
//! stands for, which is all the decoder needs to rebuild an instance.

use crate::ast::Relation;
use rustc_hash::FxHashMap;
use std::ops::Range;

/// The variables of one relation and the tuples they stand for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationVariables {
    /// Relation the variables belong to
    pub relation: Relation,
    /// Labels of the variables, contiguous
    pub labels: Range<u32>,
    /// Tuple index for each label, in label order
    pub tuples: Vec<usize>,
}

/// Allocates SAT variables for relation tuples
#[derive(Debug, Clone)]
pub struct VariableAllocator {
    next_var: u32,
    allocations: Vec<RelationVariables>,
    by_relation: FxHashMap<Relation, usize>,
}

impl VariableAllocator {
    /// Creates a new variable allocator
    pub fn new() -> Self {
        Self {
            next_var: 1, // DIMACS convention: variables start at 1
            allocations: Vec::new(),
            by_relation: FxHashMap::default(),
        }
    }

    /// Allocates one variable per undetermined tuple of `relation`
    ///
    /// Returns the range of labels allocated, empty if the relation is
    /// fully determined by its bounds.
    pub fn allocate_for_relation(
        &mut self,
        relation: &Relation,
        tuples: impl IntoIterator<Item = usize>,
    ) -> Range<u32> {
        let tuples: Vec<usize> = tuples.into_iter().collect();
        if tuples.is_empty() {
            return 0..0;
        }

        let start = self.next_var;
        let end = start + tuples.len() as u32;
        self.next_var = end;

        log::trace!(
            "allocated variables {}..{} for {} ({} tuples)",
            start,
            end,
            relation,
            tuples.len()
        );
        self.by_relation
            .insert(relation.clone(), self.allocations.len());
        self.allocations.push(RelationVariables {
            relation: relation.clone(),
            labels: start..end,
            tuples,
        });
        start..end
    }

    /// Returns the total number of variables allocated
    pub fn total_variables(&self) -> u32 {
        self.next_var - 1
    }

    /// Gets the variable range for a relation
    pub fn get_range(&self, relation: &Relation) -> Option<&Range<u32>> {
        self.by_relation
            .get(relation)
            .map(|&i| &self.allocations[i].labels)
    }

    /// Label of the variable standing for `tuple` in `relation`, if any
    pub fn variable_for(&self, relation: &Relation, tuple: usize) -> Option<u32> {
        let vars = &self.allocations[*self.by_relation.get(relation)?];
        let offset = vars.tuples.binary_search(&tuple).ok()?;
        Some(vars.labels.start + offset as u32)
    }

    /// All allocations, in allocation order
    pub fn allocations(&self) -> &[RelationVariables] {
        &self.allocations
    }
}

impl Default for VariableAllocator {
    fn default() -> Self {
        Self::new()
    }
}
