//! [`SATSolver`] over any `rustsat` solver

use super::SATSolver;
use crate::error::SolverFailure;
use rustsat::solvers::{Solve, SolverResult};
use rustsat::types::{Assignment, Clause, Lit, TernaryVal, Var};

/// Feeds DIMACS-style clauses to a `rustsat` solver
///
/// rustsat numbers variables from 0, so DIMACS variable `v` maps to
/// `Var::new(v - 1)`. Only variables some clause mentions exist on the
/// backend side; the others read as false.
pub struct RustSatAdapter<S> {
    solver: S,
    num_vars: u32,
    num_clauses: u32,
    max_var: u32,
    solution: Option<Assignment>,
}

impl<S> RustSatAdapter<S> {
    /// Adapter around a fresh `solver`
    pub fn new(solver: S) -> Self {
        Self {
            solver,
            num_vars: 0,
            num_clauses: 0,
            max_var: 0,
            solution: None,
        }
    }
}

fn to_lit(lit: i32) -> Lit {
    let var = Var::new(lit.unsigned_abs() - 1);
    match lit.is_positive() {
        true => var.pos_lit(),
        false => var.neg_lit(),
    }
}

fn backend_error(err: impl std::fmt::Display) -> SolverFailure {
    SolverFailure::Backend(err.to_string())
}

impl<S: Solve> SATSolver for RustSatAdapter<S> {
    fn add_variables(&mut self, num_vars: u32) {
        self.num_vars += num_vars;
    }

    fn add_clause(&mut self, lits: &[i32]) -> bool {
        let widest = lits.iter().map(|l| l.unsigned_abs()).max().unwrap_or(0);
        self.max_var = self.max_var.max(widest);
        self.num_vars = self.num_vars.max(widest);
        self.num_clauses += 1;

        let clause: Clause = lits.iter().copied().map(to_lit).collect();
        self.solver.add_clause(clause).is_ok()
    }

    fn solve(&mut self) -> Result<bool, SolverFailure> {
        self.solution = None;
        match self.solver.solve().map_err(backend_error)? {
            SolverResult::Sat if self.max_var == 0 => Ok(true),
            SolverResult::Sat => {
                let last = Var::new(self.max_var - 1);
                self.solution = Some(self.solver.solution(last).map_err(backend_error)?);
                Ok(true)
            }
            SolverResult::Unsat => Ok(false),
            SolverResult::Interrupted => Err(SolverFailure::Interrupted),
        }
    }

    fn value_of(&self, var: u32) -> bool {
        match (&self.solution, var) {
            (Some(assignment), 1..) if var <= self.max_var => {
                assignment.var_value(Var::new(var - 1)) == TernaryVal::True
            }
            _ => false,
        }
    }

    fn num_variables(&self) -> u32 {
        self.num_vars
    }

    fn num_clauses(&self) -> u32 {
        self.num_clauses
    }
}
