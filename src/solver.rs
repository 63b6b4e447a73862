//! Solving a formula under bounds
//!
//! A solve compiles the formula to a boolean circuit, conjoins the symmetry
//! breaking predicate, emits CNF, runs the configured backend and decodes the
//! model into an [`Instance`].

mod decoder;

pub use decoder::decode;

use crate::ast::Formula;
use crate::bool::{BoolValue, Options as BoolOptions};
use crate::cnf::{CNFTranslator, CNF};
use crate::engine::symmetry_breaker::SymmetryBreaker;
use crate::engine::{solve_cnf, SatBackend, SatOutcome};
use crate::instance::{Bounds, Instance};
use crate::translator::{Translation, Translator};
use crate::Result;
use std::time::{Duration, Instant};

/// Knobs of a solve
#[derive(Debug, Clone)]
pub struct Options {
    /// Circuit construction settings
    pub bool_options: BoolOptions,
    /// SAT backend used for every solve
    pub backend: SatBackend,
    /// Longest lex-leader predicate emitted per symmetry class; 0 turns
    /// symmetry breaking off
    pub symmetry_breaking: usize,
    /// Deadline for a single SAT call
    pub timeout: Option<Duration>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            bool_options: BoolOptions::default(),
            backend: SatBackend::default(),
            symmetry_breaking: 20,
            timeout: None,
        }
    }
}

/// Entry point for one-off solves
///
/// A solver holds only its options, so one value can answer any number of
/// formulas, from any number of threads.
pub struct Solver {
    options: Options,
}

impl Solver {
    /// Solver configured by `options`
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// Settings this solver was built with
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Looks for an instance within `bounds` that satisfies `formula`
    ///
    /// # Errors
    /// Translation errors (unbounded relations, free variables, higher-order
    /// declarations) and backend failures, including timeouts.
    pub fn solve(&self, formula: &Formula, bounds: &Bounds) -> Result<Solution> {
        self.solve_observed(formula, bounds, |_| {})
    }

    /// Like [`Solver::solve`], reporting each pipeline stage to `observe`
    /// as it is entered
    pub fn solve_observed<F>(&self, formula: &Formula, bounds: &Bounds, mut observe: F) -> Result<Solution>
    where
        F: FnMut(Stage),
    {
        observe(Stage::Translating);
        let started = Instant::now();
        let translation = Translator::translate(formula, bounds, &self.options.bool_options)?;
        let (translation, cnf) = self.compile(translation);
        let translation_time = started.elapsed();

        observe(Stage::Solving);
        let started = Instant::now();
        let outcome = solve_cnf(&cnf, self.options.backend, self.options.timeout)?;
        let solving_time = started.elapsed();

        let stats = Statistics {
            translation_time,
            solving_time,
            primary_variables: translation.num_primary_variables(),
            num_variables: cnf.num_variables,
            num_clauses: cnf.num_clauses() as u32,
        };
        log::debug!(
            "{} answered sat={} over {} vars ({} primary) and {} clauses in {:?}+{:?}",
            self.options.backend.name(),
            outcome.is_sat(),
            stats.num_variables,
            stats.primary_variables,
            stats.num_clauses,
            translation_time,
            solving_time
        );

        observe(Stage::Decoding);
        Ok(match outcome {
            SatOutcome::Sat(_) => Solution::Sat {
                instance: decode(bounds, translation.variables(), &outcome),
                stats,
            },
            SatOutcome::Unsat => Solution::Unsat { stats },
        })
    }

    /// Conjoins the symmetry breaking predicate and emits CNF
    fn compile<'a>(&self, mut translation: Translation<'a>) -> (Translation<'a>, CNF) {
        let limit = self.options.symmetry_breaking;
        if limit > 0 && translation.circuit() != BoolValue::FALSE {
            let breaker = SymmetryBreaker::new(translation.interpreter());
            let sbp = breaker.generate_sbp(translation.interpreter(), limit);
            translation.conjoin(sbp);
        }
        let cnf = CNFTranslator::new(translation.factory()).translate(translation.circuit());
        (translation, cnf)
    }
}

/// Pipeline stages of a single solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Formula and bounds are being compiled to a boolean circuit
    Translating,
    /// The CNF is with the SAT backend
    Solving,
    /// The backend answered; the outcome is being decoded
    Decoding,
}

/// Answer of a solve
#[derive(Debug)]
pub enum Solution {
    /// An instance satisfies the formula
    #[expect(missing_docs)]
    Sat { instance: Instance, stats: Statistics },
    /// No instance within the bounds satisfies the formula
    #[expect(missing_docs)]
    Unsat { stats: Statistics },
}

impl Solution {
    /// Whether an instance was found
    pub fn is_sat(&self) -> bool {
        matches!(self, Solution::Sat { .. })
    }

    /// Whether the bounds admit no instance
    pub fn is_unsat(&self) -> bool {
        !self.is_sat()
    }

    /// The satisfying instance, if any
    pub fn instance(&self) -> Option<&Instance> {
        match self {
            Solution::Sat { instance, .. } => Some(instance),
            Solution::Unsat { .. } => None,
        }
    }

    /// Takes the satisfying instance, if any
    pub fn into_instance(self) -> Option<Instance> {
        match self {
            Solution::Sat { instance, .. } => Some(instance),
            Solution::Unsat { .. } => None,
        }
    }

    /// Sizes and timings of the solve
    pub fn statistics(&self) -> &Statistics {
        match self {
            Solution::Sat { stats, .. } | Solution::Unsat { stats } => stats,
        }
    }
}

/// Sizes and timings of one solve
///
/// Times are reported in whole milliseconds.
#[derive(Debug, Clone)]
pub struct Statistics {
    translation_time: Duration,
    solving_time: Duration,
    primary_variables: u32,
    num_variables: u32,
    num_clauses: u32,
}

impl Statistics {
    /// Circuit construction, symmetry breaking and CNF emission
    pub fn translation_time(&self) -> u64 {
        millis(self.translation_time)
    }

    /// Time spent in the backend
    pub fn solving_time(&self) -> u64 {
        millis(self.solving_time)
    }

    /// Translation plus solving
    pub fn total_time(&self) -> u64 {
        millis(self.translation_time + self.solving_time)
    }

    /// Variables standing for relation tuples
    pub fn primary_variables(&self) -> u32 {
        self.primary_variables
    }

    /// CNF variables, gate variables included
    pub fn num_variables(&self) -> u32 {
        self.num_variables
    }

    /// Clauses handed to the backend
    pub fn num_clauses(&self) -> u32 {
        self.num_clauses
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
