//! Boolean circuit to CNF translation
//!
//! Converts boolean gates to CNF clauses using the Tseitin transformation:
//! every gate reachable from the root gets its own variable (its label) and
//! a handful of clauses tying that variable to the gate's inputs.

use crate::bool::{BoolValue, BooleanFactory, BooleanFormula, Gate};
use rustc_hash::FxHashSet;

/// CNF representation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CNF {
    /// Number of variables
    pub num_variables: u32,
    /// CNF clauses (each clause is a vec of literals, negative = negated)
    pub clauses: Vec<Vec<i32>>,
}

impl CNF {
    /// Creates a new empty CNF
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a clause to the CNF
    pub fn add_clause(&mut self, clause: Vec<i32>) {
        if let Some(max) = clause.iter().map(|lit| lit.unsigned_abs()).max() {
            self.num_variables = self.num_variables.max(max);
        }
        self.clauses.push(clause);
    }

    /// Number of clauses
    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    /// Whether the CNF contains the empty clause
    pub fn is_trivially_unsat(&self) -> bool {
        self.clauses.iter().any(Vec::is_empty)
    }
}

/// Translates boolean circuits to CNF
pub struct CNFTranslator<'a> {
    cnf: CNF,
    factory: &'a BooleanFactory,
    /// Gates already translated (by label)
    visited: FxHashSet<i32>,
}

impl<'a> CNFTranslator<'a> {
    /// Creates a new CNF translator over the gates of `factory`
    pub fn new(factory: &'a BooleanFactory) -> Self {
        Self {
            cnf: CNF {
                num_variables: factory.num_variables(),
                clauses: Vec::new(),
            },
            factory,
            visited: FxHashSet::default(),
        }
    }

    /// Translates a boolean value to CNF
    ///
    /// The resulting CNF is satisfiable iff `value` is. Primary variables keep
    /// their labels, so a model of the CNF restricted to `1..=num_variables`
    /// of the factory is a model of `value`.
    pub fn translate(mut self, value: BoolValue) -> CNF {
        match value {
            // TRUE needs no clause
            BoolValue::Constant(c) if c.boolean_value() => {}
            BoolValue::Constant(_) => self.cnf.add_clause(vec![]),
            _ => {
                let label = self.translate_value(value);
                self.cnf.add_clause(vec![label]);
            }
        }
        self.cnf
    }

    fn translate_value(&mut self, value: BoolValue) -> i32 {
        match value {
            BoolValue::Constant(c) => c.label(),
            BoolValue::Variable(v) => v.label(),
            BoolValue::Formula(f) => self.translate_formula(f),
        }
    }

    fn translate_formula(&mut self, formula: BooleanFormula) -> i32 {
        let output = formula.label();
        if !self.visited.insert(output) {
            return output;
        }

        match self.factory.gate(formula) {
            Some(Gate::And(inputs)) => self.translate_and(output, &inputs),
            Some(Gate::Or(inputs)) => self.translate_or(output, &inputs),
            Some(Gate::Not(input)) => self.translate_not(output, input),
            Some(Gate::Ite {
                condition,
                then_val,
                else_val,
            }) => self.translate_ite(output, condition, then_val, else_val),
            None => log::warn!("formula {} has no gate in this factory", output),
        }
        output
    }

    /// output = a1 ∧ ... ∧ an
    ///
    /// (¬a1 ∨ ... ∨ ¬an ∨ output) and (ai ∨ ¬output) for each i
    fn translate_and(&mut self, output: i32, inputs: &[BoolValue]) {
        let labels: Vec<i32> = inputs.iter().map(|&v| self.translate_value(v)).collect();

        let mut clause: Vec<i32> = labels.iter().map(|&l| -l).collect();
        clause.push(output);
        self.cnf.add_clause(clause);
        for &input in &labels {
            self.cnf.add_clause(vec![input, -output]);
        }
    }

    /// output = a1 ∨ ... ∨ an
    ///
    /// (a1 ∨ ... ∨ an ∨ ¬output) and (¬ai ∨ output) for each i
    fn translate_or(&mut self, output: i32, inputs: &[BoolValue]) {
        let labels: Vec<i32> = inputs.iter().map(|&v| self.translate_value(v)).collect();

        let mut clause = labels.clone();
        clause.push(-output);
        self.cnf.add_clause(clause);
        for &input in &labels {
            self.cnf.add_clause(vec![-input, output]);
        }
    }

    /// output = ¬input
    fn translate_not(&mut self, output: i32, input: BoolValue) {
        let input = self.translate_value(input);
        self.cnf.add_clause(vec![input, output]);
        self.cnf.add_clause(vec![-input, -output]);
    }

    /// output = if cond then then_val else else_val
    fn translate_ite(&mut self, output: i32, condition: BoolValue, then_val: BoolValue, else_val: BoolValue) {
        let cond = self.translate_value(condition);
        let then_label = self.translate_value(then_val);
        let else_label = self.translate_value(else_val);

        self.cnf.add_clause(vec![-cond, -then_label, output]);
        self.cnf.add_clause(vec![-cond, then_label, -output]);
        self.cnf.add_clause(vec![cond, -else_label, output]);
        self.cnf.add_clause(vec![cond, else_label, -output]);
    }
}
