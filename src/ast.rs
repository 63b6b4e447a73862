//! AST types for relational logic formulas
//!
//! Expressions denote tuple sets and formulas denote truth values. Both are
//! immutable trees; every operator checks the arity of its operands when the
//! node is built, so a malformed tree never reaches the translator.

pub mod formula;
pub mod visitor;

pub use formula::{
    BinaryFormulaOp, CompareOp, Decl, Decls, Formula, FormulaInner, Multiplicity, Quantifier,
    RelationPredicate, RelationPredicateName,
};
pub use visitor::{free_variables, relations, FormulaVisitor};

use std::fmt;
use std::sync::Arc;

use crate::error::{RelError, Result};

/// A named relation of fixed arity
///
/// Relations carry no contents of their own; each solve assigns them tuples
/// through [`Bounds`](crate::instance::Bounds). Equality is structural over
/// name and arity, so rebuilding `Relation::unary("File")` in another module
/// yields the same relation.
#[derive(Clone)]
pub struct Relation {
    inner: Arc<Symbol>,
}

/// Name and arity shared by relations and variables
#[derive(PartialEq, Eq, Hash)]
struct Symbol {
    name: String,
    arity: usize,
}

impl Symbol {
    fn new(name: String, arity: usize) -> Arc<Self> {
        assert!(arity >= 1, "arity must be at least 1, got {arity}");
        Arc::new(Symbol { name, arity })
    }
}

impl Relation {
    /// Relation of `arity` columns
    ///
    /// # Panics
    /// If `arity` is zero.
    pub fn nary(name: impl Into<String>, arity: usize) -> Self {
        Self {
            inner: Symbol::new(name.into(), arity),
        }
    }

    /// A set of atoms
    pub fn unary(name: impl Into<String>) -> Self {
        Self::nary(name, 1)
    }

    /// A set of pairs
    pub fn binary(name: impl Into<String>) -> Self {
        Self::nary(name, 2)
    }

    /// A set of triples
    pub fn ternary(name: impl Into<String>) -> Self {
        Self::nary(name, 3)
    }

    /// Declared name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Number of columns
    pub fn arity(&self) -> usize {
        self.inner.arity
    }

    /// `self` is a total function from `domain` to `range`
    pub fn function(&self, domain: Expression, range: Expression) -> Result<Formula> {
        RelationPredicate::function(self.clone(), domain, range).map(Formula::relation_predicate)
    }

    /// `self` is a partial function from `domain` to `range`
    pub fn partial_function(&self, domain: Expression, range: Expression) -> Result<Formula> {
        RelationPredicate::partial_function(self.clone(), domain, range)
            .map(Formula::relation_predicate)
    }

    /// `self` has no cycles
    pub fn acyclic(&self) -> Result<Formula> {
        RelationPredicate::acyclic(self.clone()).map(Formula::relation_predicate)
    }
}

impl PartialEq for Relation {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || *self.inner == *other.inner
    }
}

impl Eq for Relation {}

impl std::hash::Hash for Relation {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (*self.inner).hash(state);
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Relation({}/{})", self.name(), self.arity())
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A quantified variable
///
/// Unlike relations, variables compare by identity: two `Variable::unary("x")`
/// calls produce distinct variables, and only clones of one are equal.
#[derive(Clone)]
pub struct Variable {
    inner: Arc<Symbol>,
}

impl Variable {
    /// Variable ranging over single atoms
    pub fn unary(name: impl Into<String>) -> Self {
        Self::nary(name, 1)
    }

    /// Variable ranging over tuples of `arity` atoms
    ///
    /// # Panics
    /// If `arity` is zero.
    pub fn nary(name: impl Into<String>, arity: usize) -> Self {
        Self {
            inner: Symbol::new(name.into(), arity),
        }
    }

    /// Name used in diagnostics
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Arity of the tuples this variable is bound to
    pub fn arity(&self) -> usize {
        self.inner.arity
    }

    /// Declares this variable as ranging over the tuples of `expression`
    pub fn one_of(&self, expression: Expression) -> Result<Decl> {
        Decl::one_of(self.clone(), expression)
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Variable {}

impl std::hash::Hash for Variable {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.inner), state);
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Variable({}/{})", self.name(), self.arity())
    }
}

/// Two-operand relational operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `a . b`, matching the last column of `a` with the first of `b`
    Join,
    /// `a -> b`
    Product,
    /// `a + b`
    Union,
    /// `a - b`
    Difference,
    /// `a & b`
    Intersection,
    /// `a ++ b`: `b`, plus the tuples of `a` whose first atom `b` leaves unmapped
    Override,
}

impl BinaryOp {
    /// Set operators need operands of one arity
    fn is_set_operator(self) -> bool {
        matches!(
            self,
            BinaryOp::Union | BinaryOp::Difference | BinaryOp::Intersection | BinaryOp::Override
        )
    }
}

/// Operators on binary relations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `~r`
    Transpose,
    /// `^r`
    Closure,
    /// `*r`, the closure plus identity
    ReflexiveClosure,
}

/// A relational expression
#[expect(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expression {
    Relation(Relation),
    Variable(Variable),
    Constant(ConstantExpr),
    /// Arity is computed when the node is built
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
        arity: usize,
    },
    /// Always binary
    Unary {
        op: UnaryOp,
        expr: Box<Expression>,
    },
    /// Union of two or more operands of one arity
    Nary {
        exprs: Vec<Expression>,
        arity: usize,
    },
}

/// Built-in relations over the whole universe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantExpr {
    /// Every atom
    Univ,
    /// `{(a, a)}` for every atom `a`
    Iden,
    /// The empty set of atoms
    None,
}

impl ConstantExpr {
    fn arity(self) -> usize {
        match self {
            ConstantExpr::Iden => 2,
            ConstantExpr::Univ | ConstantExpr::None => 1,
        }
    }
}

impl Expression {
    /// `univ`
    pub const UNIV: Expression = Expression::Constant(ConstantExpr::Univ);
    /// `iden`
    pub const IDEN: Expression = Expression::Constant(ConstantExpr::Iden);
    /// `none`
    pub const NONE: Expression = Expression::Constant(ConstantExpr::None);

    /// Number of columns of the tuples this expression denotes
    pub fn arity(&self) -> usize {
        match self {
            Expression::Relation(r) => r.arity(),
            Expression::Variable(v) => v.arity(),
            Expression::Constant(c) => c.arity(),
            Expression::Unary { .. } => 2,
            Expression::Binary { arity, .. } | Expression::Nary { arity, .. } => *arity,
        }
    }

    /// `self . other`; the arities may not both be 1
    pub fn join(self, other: Expression) -> Result<Expression> {
        self.binary(BinaryOp::Join, other)
    }

    /// `self -> other`
    pub fn product(self, other: Expression) -> Result<Expression> {
        self.binary(BinaryOp::Product, other)
    }

    /// `self + other`
    pub fn union(self, other: Expression) -> Result<Expression> {
        self.binary(BinaryOp::Union, other)
    }

    /// `self - other`
    pub fn difference(self, other: Expression) -> Result<Expression> {
        self.binary(BinaryOp::Difference, other)
    }

    /// `self & other`
    pub fn intersection(self, other: Expression) -> Result<Expression> {
        self.binary(BinaryOp::Intersection, other)
    }

    /// `self ++ other`
    pub fn override_with(self, other: Expression) -> Result<Expression> {
        self.binary(BinaryOp::Override, other)
    }

    /// `~self`
    pub fn transpose(self) -> Result<Expression> {
        self.unary(UnaryOp::Transpose)
    }

    /// `^self`
    pub fn closure(self) -> Result<Expression> {
        self.unary(UnaryOp::Closure)
    }

    /// `*self`
    pub fn reflexive_closure(self) -> Result<Expression> {
        self.unary(UnaryOp::ReflexiveClosure)
    }

    fn unary(self, op: UnaryOp) -> Result<Expression> {
        match self.arity() {
            2 => Ok(Expression::Unary {
                op,
                expr: Box::new(self),
            }),
            arity => Err(RelError::Arity(format!(
                "{op:?} applies to binary expressions, not arity {arity}"
            ))),
        }
    }

    fn binary(self, op: BinaryOp, other: Expression) -> Result<Expression> {
        let (lhs, rhs) = (self.arity(), other.arity());
        let arity = match op {
            _ if op.is_set_operator() => {
                if lhs != rhs {
                    return Err(RelError::Arity(format!(
                        "{op:?} of arity {lhs} with arity {rhs}"
                    )));
                }
                lhs
            }
            BinaryOp::Join if lhs + rhs <= 2 => {
                return Err(RelError::Arity("join of two unary expressions".to_string()));
            }
            BinaryOp::Join => lhs + rhs - 2,
            _ => lhs + rhs,
        };

        Ok(Expression::Binary {
            left: Box::new(self),
            op,
            right: Box::new(other),
            arity,
        })
    }

    /// Union of every expression in `exprs`
    ///
    /// A single operand is returned as is. An empty list, or operands of
    /// different arities, is an arity error.
    pub fn union_all(exprs: Vec<Expression>) -> Result<Expression> {
        let arity = match exprs.first() {
            Some(first) => first.arity(),
            None => return Err(RelError::Arity("union of no expressions".to_string())),
        };
        if let Some(odd) = exprs.iter().find(|e| e.arity() != arity) {
            return Err(RelError::Arity(format!(
                "union mixes arity {arity} with arity {}",
                odd.arity()
            )));
        }

        let mut exprs = exprs;
        match exprs.len() {
            1 => Ok(exprs.swap_remove(0)),
            _ => Ok(Expression::Nary { exprs, arity }),
        }
    }
}

impl From<Relation> for Expression {
    fn from(relation: Relation) -> Self {
        Expression::Relation(relation)
    }
}

impl From<&Relation> for Expression {
    fn from(relation: &Relation) -> Self {
        Expression::Relation(relation.clone())
    }
}

impl From<Variable> for Expression {
    fn from(variable: Variable) -> Self {
        Expression::Variable(variable)
    }
}

impl From<&Variable> for Expression {
    fn from(variable: &Variable) -> Self {
        Expression::Variable(variable.clone())
    }
}
