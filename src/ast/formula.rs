//! Formulas of relational logic, quantifier declarations and relation predicates

use std::borrow::Cow;
use std::sync::Arc;

use super::{Expression, Relation, Variable};
use crate::error::{RelError, Result};

/// Which built-in shape a [`RelationPredicate`] asserts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationPredicateName {
    /// `acyclic[r]`
    Acyclic,
    /// `totalOrder[r, ordered, first, last]`
    TotalOrdering,
    /// `r: domain -> one range`
    Function,
    /// `r: domain -> lone range`
    PartialFunction,
}

/// Shape constraints on a single relation
///
/// Each predicate abbreviates a formula, given by [`RelationPredicate::to_constraints`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelationPredicate {
    /// `no ^relation & iden`
    Acyclic {
        /// Must be binary
        relation: Relation,
    },
    /// `relation` is a successor function walking `ordered` from `first` to `last`
    #[expect(missing_docs)]
    TotalOrdering {
        relation: Relation,
        ordered: Relation,
        first: Relation,
        last: Relation,
    },
    /// Every atom of `domain` maps to exactly one tuple of `range`
    #[expect(missing_docs)]
    Function {
        relation: Relation,
        domain: Expression,
        range: Expression,
    },
    /// Every atom of `domain` maps to at most one tuple of `range`
    #[expect(missing_docs)]
    PartialFunction {
        relation: Relation,
        domain: Expression,
        range: Expression,
    },
}

impl RelationPredicate {
    /// Kind of shape asserted
    pub fn name(&self) -> RelationPredicateName {
        match self {
            RelationPredicate::Acyclic { .. } => RelationPredicateName::Acyclic,
            RelationPredicate::TotalOrdering { .. } => RelationPredicateName::TotalOrdering,
            RelationPredicate::Function { .. } => RelationPredicateName::Function,
            RelationPredicate::PartialFunction { .. } => RelationPredicateName::PartialFunction,
        }
    }

    /// The constrained relation
    pub fn relation(&self) -> &Relation {
        match self {
            RelationPredicate::Acyclic { relation }
            | RelationPredicate::TotalOrdering { relation, .. }
            | RelationPredicate::Function { relation, .. }
            | RelationPredicate::PartialFunction { relation, .. } => relation,
        }
    }

    /// Expands this predicate into the formula it abbreviates
    pub fn to_constraints(&self) -> Result<Formula> {
        match self {
            RelationPredicate::Acyclic { relation } => {
                let closure = Expression::from(relation).closure()?;
                Ok(closure.intersection(Expression::IDEN)?.no())
            }
            RelationPredicate::TotalOrdering {
                relation,
                ordered,
                first,
                last,
            } => {
                let next = || Expression::from(relation);
                let set = || Expression::from(ordered);
                let head = || Expression::from(first);
                let tail = || Expression::from(last);

                let endpoints = Formula::and_all(vec![
                    head().one(),
                    tail().one(),
                    head().in_set(set())?,
                    tail().in_set(set())?,
                ]);
                let spans = set().equals(head().join(next().reflexive_closure()?)?)?;
                let open_ends = next().join(head())?.no().and(tail().join(next())?.no());

                // all e: ordered - last | one e.relation
                let e = Variable::unary(format!("e_{}", relation.name()));
                let successor = Formula::forall(
                    Decls::from(e.one_of(set().difference(tail())?)?),
                    Expression::from(&e).join(next())?.one(),
                );

                Ok(Formula::and_all(vec![endpoints, spans, open_ends, successor]))
            }
            RelationPredicate::Function {
                relation,
                domain,
                range,
            } => Self::function_constraints(relation, domain, range, Expression::one),
            RelationPredicate::PartialFunction {
                relation,
                domain,
                range,
            } => Self::function_constraints(relation, domain, range, Expression::lone),
        }
    }

    // relation in domain->range && all x: domain | mult x.relation
    fn function_constraints(
        relation: &Relation,
        domain: &Expression,
        range: &Expression,
        mult: fn(Expression) -> Formula,
    ) -> Result<Formula> {
        let typed = Expression::from(relation).in_set(domain.clone().product(range.clone())?)?;

        let x = Variable::unary(format!("x_{}", relation.name()));
        let image = Expression::from(&x).join(Expression::from(relation))?;
        Ok(typed.and(Formula::forall(Decls::from(x.one_of(domain.clone())?), mult(image))))
    }

    /// `acyclic[relation]`; the relation must be binary
    pub fn acyclic(relation: Relation) -> Result<Self> {
        if relation.arity() != 2 {
            return Err(RelError::Arity(format!(
                "acyclic requires a binary relation, {} has arity {}",
                relation.name(),
                relation.arity()
            )));
        }
        Ok(RelationPredicate::Acyclic { relation })
    }

    /// Ordering of `ordered` by the binary `relation`; the other three must be unary
    pub fn total_ordering(
        relation: Relation,
        ordered: Relation,
        first: Relation,
        last: Relation,
    ) -> Result<Self> {
        if relation.arity() != 2 {
            return Err(RelError::Arity(format!(
                "total ordering requires a binary relation, {} has arity {}",
                relation.name(),
                relation.arity()
            )));
        }
        if let Some(r) = [&ordered, &first, &last].into_iter().find(|r| r.arity() != 1) {
            return Err(RelError::Arity(format!(
                "{} must be unary in a total ordering",
                r.name()
            )));
        }
        Ok(RelationPredicate::TotalOrdering {
            relation,
            ordered,
            first,
            last,
        })
    }

    /// `relation: domain -> one range`
    pub fn function(relation: Relation, domain: Expression, range: Expression) -> Result<Self> {
        Self::check_function_shape(&relation, &domain, &range)?;
        Ok(RelationPredicate::Function {
            relation,
            domain,
            range,
        })
    }

    /// `relation: domain -> lone range`
    pub fn partial_function(
        relation: Relation,
        domain: Expression,
        range: Expression,
    ) -> Result<Self> {
        Self::check_function_shape(&relation, &domain, &range)?;
        Ok(RelationPredicate::PartialFunction {
            relation,
            domain,
            range,
        })
    }

    fn check_function_shape(
        relation: &Relation,
        domain: &Expression,
        range: &Expression,
    ) -> Result<()> {
        if domain.arity() != 1 {
            return Err(RelError::Arity(format!(
                "function domain must be unary, got arity {}",
                domain.arity()
            )));
        }
        if relation.arity() != 1 + range.arity() {
            return Err(RelError::Arity(format!(
                "{} has arity {} but its domain->range has arity {}",
                relation.name(),
                relation.arity(),
                1 + range.arity()
            )));
        }
        Ok(())
    }
}

/// Logical connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryFormulaOp {
    /// `&&`
    And,
    /// `||`
    Or,
    /// `<=>`
    Iff,
    /// `=>`
    Implies,
}

/// Set comparisons between expressions of one arity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `=`
    Equals,
    /// `in`
    Subset,
}

/// Cardinality keywords, used both in formulas and in declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Multiplicity {
    /// `some`: one or more tuples
    Some,
    /// `one`
    One,
    /// `lone`: zero or one
    Lone,
    /// `no`
    No,
    /// `set`: unconstrained, declarations only
    Set,
}

/// Quantifier of a [`FormulaInner::Quantified`] node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    /// `all`
    All,
    /// `some`
    Some,
}

/// A first-order formula
///
/// Compound formulas are shared through an `Arc`, so cloning is cheap and a
/// formula can be handed to commands evaluated on other threads.
#[derive(Clone, Debug)]
pub enum Formula {
    /// Shared compound formula
    Ref(Arc<FormulaInner>),
    /// `true`, kept inline
    True,
    /// `false`, kept inline
    False,
}

impl Formula {
    /// Always holds
    pub const TRUE: Formula = Formula::True;

    /// Never holds
    pub const FALSE: Formula = Formula::False;
}

impl PartialEq for Formula {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Formula::Ref(a), Formula::Ref(b)) if Arc::ptr_eq(a, b) => true,
            _ => self.inner() == other.inner(),
        }
    }
}

impl Eq for Formula {}

impl std::hash::Hash for Formula {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner().hash(state);
    }
}

/// Node of a compound formula
#[expect(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FormulaInner {
    Constant(bool),
    Binary {
        left: Formula,
        op: BinaryFormulaOp,
        right: Formula,
    },
    /// Conjunction or disjunction of two or more formulas
    Nary {
        op: BinaryFormulaOp,
        formulas: Vec<Formula>,
    },
    Not(Formula),
    Comparison {
        left: Expression,
        op: CompareOp,
        right: Expression,
    },
    /// `mult` is never `Set` here
    Multiplicity { mult: Multiplicity, expr: Expression },
    Quantified {
        quantifier: Quantifier,
        declarations: Decls,
        body: Formula,
    },
    RelationPredicate(RelationPredicate),
}

impl Formula {
    fn shared(inner: FormulaInner) -> Formula {
        Formula::Ref(Arc::new(inner))
    }

    /// [`Formula::TRUE`] or [`Formula::FALSE`]
    pub fn constant(value: bool) -> Formula {
        match value {
            true => Formula::TRUE,
            false => Formula::FALSE,
        }
    }

    fn connect(self, op: BinaryFormulaOp, right: Formula) -> Formula {
        Formula::shared(FormulaInner::Binary { left: self, op, right })
    }

    /// `self && other`
    pub fn and(self, other: Formula) -> Formula {
        self.connect(BinaryFormulaOp::And, other)
    }

    /// `self || other`
    pub fn or(self, other: Formula) -> Formula {
        self.connect(BinaryFormulaOp::Or, other)
    }

    /// `self <=> other`
    pub fn iff(self, other: Formula) -> Formula {
        self.connect(BinaryFormulaOp::Iff, other)
    }

    /// `self => other`
    pub fn implies(self, other: Formula) -> Formula {
        self.connect(BinaryFormulaOp::Implies, other)
    }

    /// `!self`
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Formula {
        Formula::shared(FormulaInner::Not(self))
    }

    /// Conjunction of `formulas`; true when empty
    pub fn and_all(formulas: Vec<Formula>) -> Formula {
        Self::nary(BinaryFormulaOp::And, formulas, Formula::TRUE)
    }

    /// Disjunction of `formulas`; false when empty
    pub fn or_all(formulas: Vec<Formula>) -> Formula {
        Self::nary(BinaryFormulaOp::Or, formulas, Formula::FALSE)
    }

    fn nary(op: BinaryFormulaOp, mut formulas: Vec<Formula>, empty: Formula) -> Formula {
        match formulas.len() {
            0 => empty,
            1 => formulas.pop().unwrap_or(empty),
            _ => Formula::shared(FormulaInner::Nary { op, formulas }),
        }
    }

    fn quantify(quantifier: Quantifier, declarations: Decls, body: Formula) -> Formula {
        Formula::shared(FormulaInner::Quantified {
            quantifier,
            declarations,
            body,
        })
    }

    /// `all declarations | body`
    pub fn forall(declarations: Decls, body: Formula) -> Formula {
        Self::quantify(Quantifier::All, declarations, body)
    }

    /// `some declarations | body`
    pub fn exists(declarations: Decls, body: Formula) -> Formula {
        Self::quantify(Quantifier::Some, declarations, body)
    }

    /// The node behind this formula; constants are materialized on demand
    pub fn inner(&self) -> Cow<'_, FormulaInner> {
        match self {
            Formula::Ref(node) => Cow::Borrowed(node.as_ref()),
            Formula::True => Cow::Owned(FormulaInner::Constant(true)),
            Formula::False => Cow::Owned(FormulaInner::Constant(false)),
        }
    }

    /// Formula asserting `pred`
    pub fn relation_predicate(pred: RelationPredicate) -> Formula {
        Formula::shared(FormulaInner::RelationPredicate(pred))
    }

    /// Variables referenced outside the scope of any enclosing quantifier
    pub fn free_variables(&self) -> Vec<Variable> {
        super::visitor::free_variables(self)
    }

    /// Whether every variable in this formula is bound by a quantifier
    pub fn is_closed(&self) -> bool {
        self.free_variables().is_empty()
    }
}

impl Expression {
    fn compare(self, op: CompareOp, other: Expression) -> Result<Formula> {
        if self.arity() != other.arity() {
            return Err(RelError::Arity(format!(
                "{op:?} between arity {} and arity {}",
                self.arity(),
                other.arity()
            )));
        }
        Ok(Formula::shared(FormulaInner::Comparison {
            left: self,
            op,
            right: other,
        }))
    }

    /// `self = other`
    pub fn equals(self, other: Expression) -> Result<Formula> {
        self.compare(CompareOp::Equals, other)
    }

    /// `self != other`
    pub fn ne(self, other: Expression) -> Result<Formula> {
        self.equals(other).map(Formula::not)
    }

    /// `self in other`
    pub fn in_set(self, other: Expression) -> Result<Formula> {
        self.compare(CompareOp::Subset, other)
    }

    fn multiplicity(self, mult: Multiplicity) -> Formula {
        Formula::shared(FormulaInner::Multiplicity { mult, expr: self })
    }

    /// `some self`
    pub fn some(self) -> Formula {
        self.multiplicity(Multiplicity::Some)
    }

    /// `one self`
    pub fn one(self) -> Formula {
        self.multiplicity(Multiplicity::One)
    }

    /// `lone self`
    pub fn lone(self) -> Formula {
        self.multiplicity(Multiplicity::Lone)
    }

    /// `no self`
    pub fn no(self) -> Formula {
        self.multiplicity(Multiplicity::No)
    }
}

/// `variable: multiplicity expression`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Decl {
    variable: Variable,
    multiplicity: Multiplicity,
    expression: Expression,
}

impl Decl {
    /// Declaration with an explicit multiplicity
    ///
    /// Only `one` declarations can be quantified over; the others are kept so
    /// that the translator can reject them as higher-order.
    pub fn new(variable: Variable, multiplicity: Multiplicity, expression: Expression) -> Result<Self> {
        if variable.arity() != expression.arity() {
            return Err(RelError::Arity(format!(
                "variable {} has arity {} but ranges over an expression of arity {}",
                variable.name(),
                variable.arity(),
                expression.arity()
            )));
        }
        Ok(Self {
            variable,
            multiplicity,
            expression,
        })
    }

    /// `variable: one expression`
    pub fn one_of(variable: Variable, expression: Expression) -> Result<Self> {
        Self::new(variable, Multiplicity::One, expression)
    }

    /// `variable: lone expression`
    pub fn lone_of(variable: Variable, expression: Expression) -> Result<Self> {
        Self::new(variable, Multiplicity::Lone, expression)
    }

    /// `variable: some expression`
    pub fn some_of(variable: Variable, expression: Expression) -> Result<Self> {
        Self::new(variable, Multiplicity::Some, expression)
    }

    /// `variable: set expression`
    pub fn set_of(variable: Variable, expression: Expression) -> Result<Self> {
        Self::new(variable, Multiplicity::Set, expression)
    }

    /// Declared variable
    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    /// How many tuples of the range the variable takes
    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    /// Range of the variable
    pub fn expression(&self) -> &Expression {
        &self.expression
    }
}

/// A non-empty sequence of variable declarations
///
/// Later declarations may range over expressions that mention earlier ones.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Decls {
    declarations: Vec<Decl>,
}

impl Decls {
    /// A single declaration
    pub fn from(decl: Decl) -> Self {
        Self::from_iter_nonempty(decl, [])
    }

    fn from_iter_nonempty(first: Decl, rest: impl IntoIterator<Item = Decl>) -> Self {
        let mut declarations = vec![first];
        declarations.extend(rest);
        Self { declarations }
    }

    /// Declarations in binding order; fails when empty
    pub fn from_vec(declarations: Vec<Decl>) -> Result<Self> {
        let mut declarations = declarations.into_iter();
        match declarations.next() {
            Some(first) => Ok(Self::from_iter_nonempty(first, declarations)),
            None => Err(RelError::InvalidArgument(
                "a quantifier needs at least one declaration".to_string(),
            )),
        }
    }

    /// Number of declared variables
    pub fn size(&self) -> usize {
        self.declarations.len()
    }

    /// Declarations in binding order
    pub fn iter(&self) -> impl Iterator<Item = &Decl> {
        self.declarations.iter()
    }

    /// Appends `decl`, which may mention every variable declared before it
    pub fn and(mut self, decl: Decl) -> Self {
        self.declarations.push(decl);
        self
    }
}
