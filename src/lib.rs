//! # relcheck
//!
//! Bounded relational model finding.
//!
//! A model declares relations over a finite universe of atoms, bounds each
//! relation between a lower and an upper tuple set, and states facts and
//! assertions in relational logic (set algebra, join, transitive closure,
//! cardinality and bounded quantification). Each command of the model is
//! answered by translating the relevant formula to a boolean circuit, solving
//! its CNF with a SAT backend, and decoding the satisfying assignment back to
//! a relational instance.
//!
//! ## Example
//!
//! ```rust,ignore
//! use relcheck::ast::{Expression, Relation};
//! use relcheck::command::{Command, Evaluator, Model, SourceLocation, Verdict};
//! use relcheck::instance::{Bounds, Universe};
//! use relcheck::solver::Options;
//!
//! let universe = Universe::new(&["A", "B", "C"])?;
//! let person = Relation::unary("Person");
//!
//! let mut bounds = Bounds::new(universe);
//! let factory = bounds.factory();
//! bounds.bound(&person, factory.none(1), factory.all(1)?)?;
//!
//! let mut model = Model::new(bounds);
//! model.fact("somePerson", Expression::from(&person).some())?;
//! model.command(Command::run("show", SourceLocation::new("people.als", 3, 1)));
//!
//! for report in Evaluator::new(Options::default()).evaluate(&model) {
//!     println!("{report}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2024_compatibility)]

/// Abstract syntax tree types (Relation, Variable, Expression, Formula, Decl)
pub mod ast;

/// Universe, tuples, bounds and instances
pub mod instance;

/// SAT backends, symmetry breaking and instance evaluation
pub mod engine;

/// Boolean circuit representation for translation
pub mod bool;

/// Boolean circuit to CNF conversion
pub mod cnf;

/// Relational formula to boolean circuit translator
pub mod translator;

/// Translate, solve and decode a single formula
pub mod solver;

/// Models, run/check commands and their verdicts
pub mod command;

/// Error types
pub mod error {
    //! Error types for relcheck

    use std::time::Duration;
    use thiserror::Error;

    /// Errors that make a single command fail
    ///
    /// These are failures of the engine or of the model's construction. The
    /// outcomes of a well-formed command (`NoInstance`, `AssertionViolated`, ...)
    /// are verdicts, not errors, see [`crate::command::Verdict`].
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum RelError {
        /// A tuple or tuple set does not have the arity it is bound against
        #[error("arity mismatch: expected {expected}, found {found}")]
        ArityMismatch {
            /// Declared arity
            expected: usize,
            /// Arity actually supplied
            found: usize,
        },

        /// An operator was applied to operands of incompatible shape
        #[error("arity error: {0}")]
        Arity(String),

        /// Bounds are malformed or missing for a relation
        #[error("invalid bounds for {relation}: {reason}")]
        InvalidBounds {
            /// Name of the offending relation
            relation: String,
            /// What is wrong with its bounds
            reason: String,
        },

        /// A variable is referenced outside the scope of its quantifier
        #[error("unbound variable: {0}")]
        UnboundVariable(String),

        /// A quantifier ranges over sets rather than single tuples
        #[error("higher-order declaration: {0}")]
        HigherOrder(String),

        /// The SAT backend crashed or ran out of time
        #[error(transparent)]
        Solver(#[from] SolverFailure),

        /// Invalid argument to a universe or tuple constructor
        #[error("invalid argument: {0}")]
        InvalidArgument(String),

        /// A command names a fact or assertion the model does not declare
        #[error("unknown formula: {0}")]
        UnknownFormula(String),

        /// A decoded instance failed re-evaluation against its formula
        #[error("decoded instance does not satisfy {0}")]
        Unconfirmed(String),
    }

    /// Failures reported by a SAT backend
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum SolverFailure {
        /// The backend did not answer before the deadline
        #[error("solver timed out after {0:?}")]
        Timeout(Duration),

        /// The backend reported an internal error or panicked
        #[error("solver backend failed: {0}")]
        Backend(String),

        /// The backend gave up because its interrupt flag was raised
        #[error("solver was interrupted")]
        Interrupted,
    }

    /// Result type for relcheck operations
    pub type Result<T> = std::result::Result<T, RelError>;
}

pub use error::{RelError, Result, SolverFailure};
