//! Interpretation of leaf expressions (relations and constants) as matrices
//!
//! The interpreter owns the boolean factory of a translation. When it is
//! built from bounds it allocates one primary variable per tuple in
//! `upper \ lower` of every relation, in bounds order.

use crate::ast::{ConstantExpr, Relation};
use crate::bool::{BooleanFactory, BooleanMatrix, Dimensions, Options, VariableAllocator};
use crate::error::{RelError, Result};
use crate::instance::{Bounds, Universe};

/// Interprets leaf expressions as boolean matrices
pub struct LeafInterpreter<'a> {
    bounds: &'a Bounds,
    allocator: VariableAllocator,
    factory: BooleanFactory,
}

impl<'a> LeafInterpreter<'a> {
    /// Creates an interpreter over `bounds`, allocating its primary variables
    pub fn from_bounds(bounds: &'a Bounds, options: &Options) -> Self {
        let mut allocator = VariableAllocator::new();
        for relation in bounds.relations() {
            if let (Some(lower), Some(upper)) = (bounds.lower_bound(relation), bounds.upper_bound(relation)) {
                let undetermined = upper.indices().filter(|&idx| !lower.contains_index(idx));
                allocator.allocate_for_relation(relation, undetermined);
            }
        }

        let factory = BooleanFactory::new(allocator.total_variables(), options.clone());
        log::debug!(
            "interpreter over {} relations with {} primary variables",
            bounds.relations().count(),
            factory.num_variables()
        );
        Self {
            bounds,
            allocator,
            factory,
        }
    }

    /// The factory in which all gates of the translation live
    pub fn factory(&self) -> &BooleanFactory {
        &self.factory
    }

    /// Universe of the bounds
    pub fn universe(&self) -> &Universe {
        self.bounds.universe()
    }

    /// Bounds being interpreted
    pub fn bounds(&self) -> &'a Bounds {
        self.bounds
    }

    /// Primary variables and the tuples they stand for
    pub fn variables(&self) -> &VariableAllocator {
        &self.allocator
    }

    /// Number of primary variables, as opposed to the gate labels that
    /// become auxiliary variables in the CNF
    pub fn num_primary_variables(&self) -> u32 {
        self.factory.num_variables()
    }

    /// Interprets a relation: TRUE for its lower bound, a fresh variable for
    /// every other tuple of its upper bound, FALSE elsewhere
    pub fn interpret_relation(&self, relation: &Relation) -> Result<BooleanMatrix> {
        let (lower, upper) = match (
            self.bounds.lower_bound(relation),
            self.bounds.upper_bound(relation),
        ) {
            (Some(lower), Some(upper)) => (lower, upper),
            _ => {
                return Err(RelError::InvalidBounds {
                    relation: relation.name().to_string(),
                    reason: "no bounds declared".into(),
                })
            }
        };

        let dims = Dimensions::new(self.universe().size(), relation.arity());
        let mut matrix = BooleanMatrix::constant(dims, lower.indices());
        for idx in upper.indices() {
            if let Some(label) = self.allocator.variable_for(relation, idx) {
                matrix.set(idx, self.factory.variable(label as i32));
            }
        }
        Ok(matrix)
    }

    /// Interprets `univ`, `iden` and `none`
    pub fn interpret_constant(&self, constant: ConstantExpr) -> BooleanMatrix {
        let n = self.universe().size();
        match constant {
            ConstantExpr::Univ => BooleanMatrix::constant(Dimensions::new(n, 1), 0..n),
            ConstantExpr::Iden => BooleanMatrix::identity(n),
            ConstantExpr::None => BooleanMatrix::empty(Dimensions::new(n, 1)),
        }
    }
}
