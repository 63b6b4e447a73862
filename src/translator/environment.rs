//! Quantifier bindings in scope during translation

use crate::ast::Variable;
use crate::bool::BooleanMatrix;

/// Scoped bindings of quantified variables
///
/// Each binding maps a quantified variable to the ground matrix of the single
/// tuple it currently stands for. Inner bindings shadow outer ones.
#[derive(Default)]
pub struct Environment {
    bindings: Vec<(Variable, BooleanMatrix)>,
}

impl Environment {
    /// No variable in scope
    pub fn empty() -> Self {
        Self::default()
    }

    /// Enters the scope of `var`
    pub fn extend(&mut self, var: Variable, value: BooleanMatrix) {
        self.bindings.push((var, value));
    }

    /// Leaves the innermost scope
    pub fn pop(&mut self) {
        self.bindings.pop();
    }

    /// Matrix of the innermost binding of `var`
    pub fn lookup(&self, var: &Variable) -> Option<&BooleanMatrix> {
        self.bindings
            .iter()
            .rev()
            .find_map(|(bound, value)| (bound == var).then_some(value))
    }

    /// Number of bindings in scope
    pub fn depth(&self) -> usize {
        self.bindings.len()
    }
}
