//! Traversals over expression and formula trees
//!
//! Since the AST is a closed set of enums, traversals are plain recursive
//! matches. The visitor trait below walks every node and tracks which
//! variables are in scope; collectors implement the leaf hooks.

use super::formula::{Decl, Decls, Formula, FormulaInner};
use super::{Expression, Relation, Variable};

/// A scoped walk over a formula tree
///
/// `visit_formula` descends into every sub-formula and sub-expression,
/// expanding relation predicates into their defining constraints. Quantifier
/// declarations are visited in order, each declared variable coming into
/// scope for the declarations that follow and for the body.
pub trait FormulaVisitor {
    /// Called for every relation leaf
    fn visit_relation(&mut self, _relation: &Relation) {}

    /// Called for every variable leaf, with the variables currently in scope
    fn visit_variable(&mut self, _variable: &Variable, _scope: &[Variable]) {}

    /// Visit a formula
    fn visit_formula(&mut self, formula: &Formula, scope: &mut Vec<Variable>) {
        match &*formula.inner() {
            FormulaInner::Constant(_) => {}
            FormulaInner::Binary { left, right, .. } => {
                self.visit_formula(left, scope);
                self.visit_formula(right, scope);
            }
            FormulaInner::Nary { formulas, .. } => {
                for f in formulas {
                    self.visit_formula(f, scope);
                }
            }
            FormulaInner::Not(inner) => self.visit_formula(inner, scope),
            FormulaInner::Comparison { left, right, .. } => {
                self.visit_expression(left, scope);
                self.visit_expression(right, scope);
            }
            FormulaInner::Multiplicity { expr, .. } => self.visit_expression(expr, scope),
            FormulaInner::Quantified {
                declarations, body, ..
            } => {
                let depth = scope.len();
                self.visit_decls(declarations, scope);
                self.visit_formula(body, scope);
                scope.truncate(depth);
            }
            FormulaInner::RelationPredicate(pred) => {
                self.visit_relation(pred.relation());
                // Shape was checked when the predicate was built
                if let Ok(constraints) = pred.to_constraints() {
                    self.visit_formula(&constraints, scope);
                }
            }
        }
    }

    /// Called for every quantifier declaration, before its range is visited
    fn visit_decl(&mut self, _decl: &Decl) {}

    /// Visit declarations, pushing each variable onto the scope
    fn visit_decls(&mut self, decls: &Decls, scope: &mut Vec<Variable>) {
        for decl in decls.iter() {
            self.visit_decl(decl);
            self.visit_expression(decl.expression(), scope);
            scope.push(decl.variable().clone());
        }
    }

    /// Visit an expression
    fn visit_expression(&mut self, expr: &Expression, scope: &mut Vec<Variable>) {
        match expr {
            Expression::Relation(r) => self.visit_relation(r),
            Expression::Variable(v) => self.visit_variable(v, scope),
            Expression::Constant(_) => {}
            Expression::Binary { left, right, .. } => {
                self.visit_expression(left, scope);
                self.visit_expression(right, scope);
            }
            Expression::Unary { expr, .. } => self.visit_expression(expr, scope),
            Expression::Nary { exprs, .. } => {
                for e in exprs {
                    self.visit_expression(e, scope);
                }
            }
        }
    }
}

#[derive(Default)]
struct FreeVariables {
    found: Vec<Variable>,
}

impl FormulaVisitor for FreeVariables {
    fn visit_variable(&mut self, variable: &Variable, scope: &[Variable]) {
        if !scope.contains(variable) && !self.found.contains(variable) {
            self.found.push(variable.clone());
        }
    }
}

#[derive(Default)]
struct Relations {
    found: Vec<Relation>,
}

impl FormulaVisitor for Relations {
    fn visit_relation(&mut self, relation: &Relation) {
        if !self.found.contains(relation) {
            self.found.push(relation.clone());
        }
    }
}

/// Variables that occur in `formula` outside the scope of their quantifier,
/// in order of first occurrence
pub fn free_variables(formula: &Formula) -> Vec<Variable> {
    let mut collector = FreeVariables::default();
    collector.visit_formula(formula, &mut Vec::new());
    collector.found
}

/// Relations mentioned by `formula`, in order of first occurrence
pub fn relations(formula: &Formula) -> Vec<Relation> {
    let mut collector = Relations::default();
    collector.visit_formula(formula, &mut Vec::new());
    collector.found
}

#[cfg(test)]
mod tests {
    use super::super::{Decl, Decls, Expression, Formula, Relation, Variable};
    use super::*;
    use crate::Result;

    #[test]
    fn relations_in_first_occurrence_order() -> Result<()> {
        let a = Relation::unary("A");
        let b = Relation::unary("B");
        let r = Relation::binary("r");

        let f = Expression::from(&b)
            .in_set(Expression::from(&a))?
            .and(Expression::from(&r).join(Expression::from(&b))?.some());

        assert_eq!(relations(&f), vec![b, a, r]);
        Ok(())
    }

    #[test]
    fn later_declarations_see_earlier_variables() -> Result<()> {
        let r = Relation::binary("r");
        let dom = Relation::unary("D");
        let x = Variable::unary("x");
        let y = Variable::unary("y");

        // all x: D, y: x.r | y in D
        let decls = Decls::from(Decl::one_of(x.clone(), Expression::from(&dom))?).and(Decl::one_of(
            y.clone(),
            Expression::from(&x).join(Expression::from(&r))?,
        )?);
        let f = Formula::forall(decls, Expression::from(&y).in_set(Expression::from(&dom))?);

        assert!(free_variables(&f).is_empty());
        assert_eq!(relations(&f), vec![dom, r]);
        Ok(())
    }

    #[test]
    fn variable_leaks_out_of_scope() -> Result<()> {
        let s = Relation::unary("S");
        let x = Variable::unary("x");

        let quantified = Formula::exists(
            Decls::from(Decl::one_of(x.clone(), Expression::from(&s))?),
            Expression::from(&x).some(),
        );
        let f = quantified.and(Expression::from(&x).no());

        assert_eq!(free_variables(&f), vec![x]);
        Ok(())
    }

    #[test]
    fn predicates_report_their_relation() -> Result<()> {
        let next = Relation::binary("next");
        let f = next.acyclic()?;
        assert_eq!(relations(&f), vec![next]);
        Ok(())
    }
}
