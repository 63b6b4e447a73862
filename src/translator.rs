//! FOL to Boolean circuit translation
//!
//! Translates first-order relational formulas to boolean circuits. Every
//! relation becomes a matrix over the primary variables of its bounds,
//! operators become matrix operations, and quantifiers are expanded by
//! enumerating the tuples of their range.

mod environment;
mod leaf_interpreter;

pub use environment::Environment;
pub use leaf_interpreter::LeafInterpreter;

use crate::ast::*;
use crate::bool::{BoolValue, BooleanFactory, BooleanMatrix, Options, VariableAllocator};
use crate::error::{RelError, Result};
use crate::instance::Bounds;

/// Translator for FOL formulas to boolean circuits
pub struct Translator;

impl Translator {
    /// Translates `formula` under `bounds` to a single boolean value
    ///
    /// The formula is checked first: every relation it mentions must be
    /// bounded, it must be closed, and each quantifier must range over
    /// single tuples.
    pub fn translate<'a>(formula: &Formula, bounds: &'a Bounds, options: &Options) -> Result<Translation<'a>> {
        Self::validate(formula, bounds)?;

        let interpreter = LeafInterpreter::from_bounds(bounds, options);
        let circuit = FOL2BoolTranslator::new(&interpreter).translate_formula(formula)?;
        log::debug!(
            "translated formula: {} primary variables, {} gates",
            interpreter.num_primary_variables(),
            interpreter.factory().num_gates()
        );
        Ok(Translation {
            circuit,
            interpreter,
        })
    }

    /// Translates a closed expression to a matrix
    ///
    /// Used to evaluate expressions against exact bounds, where the matrix
    /// holds only constants.
    pub fn translate_expression(expr: &Expression, bounds: &Bounds, options: &Options) -> Result<BooleanMatrix> {
        let mut validator = Validator::new(bounds);
        validator.visit_expression(expr, &mut Vec::new());
        validator.finish()?;

        let interpreter = LeafInterpreter::from_bounds(bounds, options);
        FOL2BoolTranslator::new(&interpreter).translate_expression(expr)
    }

    /// Checks that `formula` can be translated under `bounds`
    pub fn validate(formula: &Formula, bounds: &Bounds) -> Result<()> {
        let mut validator = Validator::new(bounds);
        validator.visit_formula(formula, &mut Vec::new());
        validator.finish()
    }
}

/// A translated formula: its circuit and the interpretation it was built in
pub struct Translation<'a> {
    circuit: BoolValue,
    interpreter: LeafInterpreter<'a>,
}

impl<'a> Translation<'a> {
    /// Root of the boolean circuit
    pub fn circuit(&self) -> BoolValue {
        self.circuit
    }

    /// Interpretation of the bounded relations
    pub fn interpreter(&self) -> &LeafInterpreter<'a> {
        &self.interpreter
    }

    /// Factory holding the gates of the circuit
    pub fn factory(&self) -> &BooleanFactory {
        self.interpreter.factory()
    }

    /// Primary variables and the tuples they stand for
    pub fn variables(&self) -> &VariableAllocator {
        self.interpreter.variables()
    }

    /// Bounds the formula was translated under
    pub fn bounds(&self) -> &'a Bounds {
        self.interpreter.bounds()
    }

    /// Number of primary variables
    pub fn num_primary_variables(&self) -> u32 {
        self.interpreter.num_primary_variables()
    }

    /// Whether the circuit folded to a constant
    pub fn is_trivial(&self) -> bool {
        self.circuit.is_constant()
    }

    /// Conjoins `constraint` with the circuit
    ///
    /// `constraint` must have been built in this translation's factory.
    pub fn conjoin(&mut self, constraint: BoolValue) {
        self.circuit = self.interpreter.factory().and(self.circuit, constraint);
    }
}

/// Collects the first reason a formula cannot be translated
struct Validator<'b> {
    bounds: &'b Bounds,
    error: Option<RelError>,
}

impl<'b> Validator<'b> {
    fn new(bounds: &'b Bounds) -> Self {
        Self { bounds, error: None }
    }

    fn fail(&mut self, error: RelError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn finish(self) -> Result<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl FormulaVisitor for Validator<'_> {
    fn visit_relation(&mut self, relation: &Relation) {
        if !self.bounds.contains(relation) {
            self.fail(RelError::InvalidBounds {
                relation: relation.name().to_string(),
                reason: "no bounds declared".into(),
            });
        }
    }

    fn visit_variable(&mut self, variable: &Variable, scope: &[Variable]) {
        if !scope.contains(variable) {
            self.fail(RelError::UnboundVariable(variable.name().to_string()));
        }
    }

    fn visit_decl(&mut self, decl: &Decl) {
        if decl.multiplicity() != Multiplicity::One {
            self.fail(RelError::HigherOrder(format!(
                "{} is declared with multiplicity {:?}",
                decl.variable().name(),
                decl.multiplicity()
            )));
        }
    }
}

/// Recursive translation of formulas and expressions
struct FOL2BoolTranslator<'i, 'a> {
    interpreter: &'i LeafInterpreter<'a>,
    env: Environment,
}

impl<'i, 'a> FOL2BoolTranslator<'i, 'a> {
    fn new(interpreter: &'i LeafInterpreter<'a>) -> Self {
        Self {
            interpreter,
            env: Environment::empty(),
        }
    }

    fn factory(&self) -> &'i BooleanFactory {
        self.interpreter.factory()
    }

    fn translate_formula(&mut self, formula: &Formula) -> Result<BoolValue> {
        let factory = self.factory();
        let value = match &*formula.inner() {
            FormulaInner::Constant(b) => factory.constant(*b),

            FormulaInner::Binary { left, op, right } => {
                let l = self.translate_formula(left)?;
                let r = self.translate_formula(right)?;
                match op {
                    BinaryFormulaOp::And => factory.and(l, r),
                    BinaryFormulaOp::Or => factory.or(l, r),
                    BinaryFormulaOp::Implies => factory.implies(l, r),
                    BinaryFormulaOp::Iff => factory.iff(l, r),
                }
            }

            FormulaInner::Nary { op, formulas } => {
                let translated = formulas
                    .iter()
                    .map(|f| self.translate_formula(f))
                    .collect::<Result<Vec<_>>>()?;
                match op {
                    BinaryFormulaOp::Or => factory.or_multi(translated),
                    _ => factory.and_multi(translated),
                }
            }

            FormulaInner::Not(inner) => {
                let value = self.translate_formula(inner)?;
                factory.not(value)
            }

            FormulaInner::Comparison { left, op, right } => {
                let left = self.translate_expression(left)?;
                let right = self.translate_expression(right)?;
                match op {
                    CompareOp::Equals => left.equals(&right, factory),
                    CompareOp::Subset => left.subset(&right, factory),
                }
            }

            FormulaInner::Multiplicity { mult, expr } => {
                let matrix = self.translate_expression(expr)?;
                match mult {
                    Multiplicity::Some => matrix.some(factory),
                    Multiplicity::No => matrix.none(factory),
                    Multiplicity::One => matrix.one(factory),
                    Multiplicity::Lone => matrix.lone(factory),
                    Multiplicity::Set => BoolValue::TRUE,
                }
            }

            FormulaInner::Quantified {
                quantifier,
                declarations,
                body,
            } => self.translate_quantified(*quantifier, declarations, body)?,

            FormulaInner::RelationPredicate(pred) => {
                let constraints = pred.to_constraints()?;
                self.translate_formula(&constraints)?
            }
        };
        Ok(value)
    }

    fn translate_expression(&mut self, expr: &Expression) -> Result<BooleanMatrix> {
        let factory = self.factory();
        let matrix = match expr {
            Expression::Relation(rel) => self.interpreter.interpret_relation(rel)?,

            Expression::Variable(var) => self
                .env
                .lookup(var)
                .cloned()
                .ok_or_else(|| RelError::UnboundVariable(var.name().to_string()))?,

            Expression::Constant(c) => self.interpreter.interpret_constant(*c),

            Expression::Binary { left, op, right, arity } => {
                self.interpreter.bounds().universe().capacity(*arity)?;
                let left = self.translate_expression(left)?;
                let right = self.translate_expression(right)?;
                match op {
                    BinaryOp::Union => left.union(&right, factory),
                    BinaryOp::Intersection => left.intersection(&right, factory),
                    BinaryOp::Difference => left.difference(&right, factory),
                    BinaryOp::Override => left.override_with(&right, factory),
                    BinaryOp::Join => left.join(&right, factory),
                    BinaryOp::Product => left.product(&right, factory),
                }
            }

            Expression::Unary { op, expr } => {
                let matrix = self.translate_expression(expr)?;
                match op {
                    UnaryOp::Transpose => matrix.transpose(),
                    UnaryOp::Closure => matrix.closure(factory),
                    UnaryOp::ReflexiveClosure => matrix.reflexive_closure(factory),
                }
            }

            Expression::Nary { exprs, .. } => {
                let mut operands = exprs.iter();
                let first = match operands.next() {
                    Some(first) => self.translate_expression(first)?,
                    None => self.interpreter.interpret_constant(ConstantExpr::None),
                };
                operands.try_fold(first, |acc, e| {
                    let matrix = self.translate_expression(e)?;
                    Ok::<_, RelError>(acc.union(&matrix, factory))
                })?
            }
        };
        Ok(matrix)
    }

    fn translate_quantified(&mut self, quantifier: Quantifier, decls: &Decls, body: &Formula) -> Result<BoolValue> {
        let decls: Vec<&Decl> = decls.iter().collect();
        let mut acc = Vec::new();
        match quantifier {
            Quantifier::All => {
                self.translate_forall(&decls, body, BoolValue::FALSE, &mut acc)?;
                Ok(self.factory().and_multi(acc))
            }
            Quantifier::Some => {
                self.translate_exists(&decls, body, BoolValue::TRUE, &mut acc)?;
                Ok(self.factory().or_multi(acc))
            }
        }
    }

    /// Universal quantification
    ///
    /// For each tuple `t` in the range of the first declaration, with
    /// membership `m`, the body is translated with the variable bound to
    /// `{t}` and guarded as `¬m ∨ constraints ∨ body`.
    fn translate_forall(
        &mut self,
        decls: &[&Decl],
        body: &Formula,
        constraints: BoolValue,
        acc: &mut Vec<BoolValue>,
    ) -> Result<()> {
        let factory = self.factory();
        let Some((decl, rest)) = decls.split_first() else {
            let value = self.translate_formula(body)?;
            acc.push(factory.or(constraints, value));
            return Ok(());
        };

        let range = self.translate_expression(decl.expression())?;
        let dims = *range.dimensions();
        for (index, member) in range.iter_indexed() {
            self.env
                .extend(decl.variable().clone(), BooleanMatrix::constant(dims, [index]));
            let guard = factory.or(factory.not(member), constraints);
            let result = self.translate_forall(rest, body, guard, acc);
            self.env.pop();
            result?;
        }
        Ok(())
    }

    /// Existential quantification, dual of [`Self::translate_forall`]:
    /// each instantiation contributes `m ∧ constraints ∧ body`
    fn translate_exists(
        &mut self,
        decls: &[&Decl],
        body: &Formula,
        constraints: BoolValue,
        acc: &mut Vec<BoolValue>,
    ) -> Result<()> {
        let factory = self.factory();
        let Some((decl, rest)) = decls.split_first() else {
            let value = self.translate_formula(body)?;
            acc.push(factory.and(constraints, value));
            return Ok(());
        };

        let range = self.translate_expression(decl.expression())?;
        let dims = *range.dimensions();
        for (index, member) in range.iter_indexed() {
            self.env
                .extend(decl.variable().clone(), BooleanMatrix::constant(dims, [index]));
            let guard = factory.and(member, constraints);
            let result = self.translate_exists(rest, body, guard, acc);
            self.env.pop();
            result?;
        }
        Ok(())
    }
}
