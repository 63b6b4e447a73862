//! SAT solver trait and implementations

pub mod dpll;
pub mod evaluator;
pub mod rustsat_adapter;
pub mod symmetry_breaker;
pub mod symmetry_detector;

use crate::cnf::CNF;
use crate::error::SolverFailure;
use dpll::DpllSolver;
use rustsat_adapter::RustSatAdapter;
use rustsat_batsat::BasicSolver;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Core SAT solver trait
///
/// This trait defines the interface that all SAT solver backends must implement.
/// Variables are 1-indexed, and literals are represented as signed integers
/// (positive for true, negative for false).
pub trait SATSolver {
    /// Adds the given number of variables to the solver
    fn add_variables(&mut self, num_vars: u32);

    /// Adds a clause to the solver
    ///
    /// Returns false if the solver already knows the clauses are unsatisfiable
    fn add_clause(&mut self, lits: &[i32]) -> bool;

    /// Solves the current formula
    ///
    /// Returns `Ok(true)` if satisfiable, `Ok(false)` if unsatisfiable. A
    /// backend that gives up or fails internally reports an error.
    fn solve(&mut self) -> Result<bool, SolverFailure>;

    /// Returns the assignment of a variable in the solution
    ///
    /// Only valid after solve() returns true.
    /// Variables are 1-indexed.
    fn value_of(&self, var: u32) -> bool;

    /// Returns the number of variables in the solver
    fn num_variables(&self) -> u32;

    /// Returns the number of clauses added
    fn num_clauses(&self) -> u32;
}

/// Available SAT backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SatBackend {
    /// BatSat CDCL solver through rustsat
    #[default]
    Batsat,
    /// Built-in DPLL solver
    Dpll,
}

impl SatBackend {
    /// Creates a fresh solver of this kind
    pub fn instantiate(self) -> Box<dyn SATSolver> {
        match self {
            SatBackend::Batsat => Box::new(RustSatAdapter::new(BasicSolver::default())),
            SatBackend::Dpll => Box::new(DpllSolver::new()),
        }
    }

    /// Creates a fresh solver that stops with [`SolverFailure::Interrupted`]
    /// once `interrupt` is raised
    ///
    /// Batsat polls the flag through its stop callback before every
    /// decision; DPLL checks it once per decision or backtrack.
    pub fn interruptible(self, interrupt: Arc<AtomicBool>) -> Box<dyn SATSolver> {
        match self {
            SatBackend::Batsat => {
                let mut solver = BasicSolver::default();
                solver
                    .batsat_mut()
                    .cb_mut()
                    .set_stop(move || interrupt.load(Ordering::Relaxed));
                Box::new(RustSatAdapter::new(solver))
            }
            SatBackend::Dpll => Box::new(DpllSolver::new().interrupted_by(interrupt)),
        }
    }

    /// Short name used in logs and reports
    pub fn name(self) -> &'static str {
        match self {
            SatBackend::Batsat => "batsat",
            SatBackend::Dpll => "dpll",
        }
    }
}

/// Answer of a SAT backend for a CNF
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatOutcome {
    /// Satisfiable; `model[v - 1]` is the value of variable `v`
    Sat(Vec<bool>),
    /// Unsatisfiable
    Unsat,
}

impl SatOutcome {
    /// Value of variable `var` in the model, false when unsatisfiable
    pub fn value_of(&self, var: u32) -> bool {
        match self {
            SatOutcome::Sat(model) => var > 0 && model.get(var as usize - 1).copied().unwrap_or(false),
            SatOutcome::Unsat => false,
        }
    }

    /// Whether the CNF was satisfiable
    pub fn is_sat(&self) -> bool {
        matches!(self, SatOutcome::Sat(_))
    }
}

/// Solves `cnf` with a fresh solver of kind `backend`
///
/// With a timeout the solver runs on a worker thread. Once the deadline
/// passes the worker is interrupted and joined, so no search outlives the
/// call. A backend that panics is reported as a [`SolverFailure::Backend`].
pub fn solve_cnf(cnf: &CNF, backend: SatBackend, timeout: Option<Duration>) -> Result<SatOutcome, SolverFailure> {
    if cnf.is_trivially_unsat() {
        return Ok(SatOutcome::Unsat);
    }

    let Some(limit) = timeout else {
        return panic::catch_unwind(AssertUnwindSafe(|| run_backend(cnf, backend.instantiate())))
            .unwrap_or_else(|_| Err(SolverFailure::Backend(format!("{} panicked", backend.name()))));
    };

    let interrupt = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();
    let owned = cnf.clone();
    let flag = Arc::clone(&interrupt);
    let worker = thread::Builder::new()
        .name(format!("sat-{}", backend.name()))
        .spawn(move || {
            // the receiver is gone after a timeout
            let _ = tx.send(run_backend(&owned, backend.interruptible(flag)));
        })
        .map_err(|e| SolverFailure::Backend(e.to_string()))?;

    let outcome = match rx.recv_timeout(limit) {
        Ok(outcome) => outcome,
        Err(RecvTimeoutError::Timeout) => {
            log::warn!("{} did not answer within {:?}", backend.name(), limit);
            interrupt.store(true, Ordering::Relaxed);
            Err(SolverFailure::Timeout(limit))
        }
        Err(RecvTimeoutError::Disconnected) => {
            Err(SolverFailure::Backend(format!("{} panicked", backend.name())))
        }
    };
    if worker.join().is_err() {
        log::debug!("{} worker unwound", backend.name());
    }
    outcome
}

fn run_backend(cnf: &CNF, mut solver: Box<dyn SATSolver>) -> Result<SatOutcome, SolverFailure> {
    solver.add_variables(cnf.num_variables);
    for clause in &cnf.clauses {
        if !solver.add_clause(clause) {
            return Ok(SatOutcome::Unsat);
        }
    }

    if solver.solve()? {
        let model = (1..=cnf.num_variables).map(|v| solver.value_of(v)).collect();
        Ok(SatOutcome::Sat(model))
    } else {
        Ok(SatOutcome::Unsat)
    }
}
