//! A small DPLL solver
//!
//! Chronological backtracking with unit propagation over occurrence lists.
//! Decisions take the lowest unassigned variable and try FALSE first, so
//! models tend to be small and are fully reproducible.

use super::SATSolver;
use crate::error::SolverFailure;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
struct Assigned {
    lit: i32,
    /// A decision whose opposite has not been tried yet
    decision: bool,
}

/// Reference DPLL backend
#[derive(Debug, Default)]
pub struct DpllSolver {
    num_vars: u32,
    clauses: Vec<Vec<i32>>,
    /// Clauses containing each literal, indexed by [`lit_index`]
    occurs: Vec<Vec<usize>>,
    assignment: Vec<Option<bool>>,
    trail: Vec<Assigned>,
    qhead: usize,
    conflict: bool,
    model: Vec<bool>,
    decisions: u64,
    interrupt: Option<Arc<AtomicBool>>,
}

fn lit_index(lit: i32) -> usize {
    let var = lit.unsigned_abs() as usize - 1;
    if lit > 0 {
        2 * var
    } else {
        2 * var + 1
    }
}

impl DpllSolver {
    /// Creates an empty solver
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `solve` give up with [`SolverFailure::Interrupted`] once
    /// `interrupt` is raised
    pub fn interrupted_by(mut self, interrupt: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    fn interrupted(&self) -> bool {
        self.interrupt.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Number of decisions made by the last call to solve
    pub fn num_decisions(&self) -> u64 {
        self.decisions
    }

    fn ensure_vars(&mut self, num_vars: u32) {
        if num_vars > self.num_vars {
            self.num_vars = num_vars;
            self.assignment.resize(num_vars as usize, None);
            self.occurs.resize(2 * num_vars as usize, Vec::new());
        }
    }

    fn lit_value(&self, lit: i32) -> Option<bool> {
        self.assignment[lit.unsigned_abs() as usize - 1].map(|v| if lit > 0 { v } else { !v })
    }

    fn enqueue(&mut self, lit: i32, decision: bool) {
        self.assignment[lit.unsigned_abs() as usize - 1] = Some(lit > 0);
        self.trail.push(Assigned { lit, decision });
    }

    /// Propagates the trail from `qhead`, returning false on a conflict
    fn propagate(&mut self) -> bool {
        while self.qhead < self.trail.len() {
            let falsified = -self.trail[self.qhead].lit;
            self.qhead += 1;

            for i in 0..self.occurs[lit_index(falsified)].len() {
                let clause = &self.clauses[self.occurs[lit_index(falsified)][i]];
                let mut unassigned = None;
                let mut open = 0;
                let mut satisfied = false;
                for &lit in clause {
                    match self.lit_value(lit) {
                        Some(true) => {
                            satisfied = true;
                            break;
                        }
                        Some(false) => {}
                        None => {
                            open += 1;
                            unassigned = Some(lit);
                        }
                    }
                }
                if satisfied {
                    continue;
                }
                match (open, unassigned) {
                    (0, _) => return false,
                    (1, Some(unit)) => self.enqueue(unit, false),
                    _ => {}
                }
            }
        }
        true
    }

    /// Undoes assignments up to the most recent open decision and flips it
    fn backtrack(&mut self) -> bool {
        while let Some(assigned) = self.trail.pop() {
            self.assignment[assigned.lit.unsigned_abs() as usize - 1] = None;
            if assigned.decision {
                self.enqueue(-assigned.lit, false);
                self.qhead = self.trail.len() - 1;
                return true;
            }
        }
        false
    }

    fn next_unassigned(&self) -> Option<u32> {
        self.assignment
            .iter()
            .position(Option::is_none)
            .map(|i| i as u32 + 1)
    }

    fn reset(&mut self) {
        self.assignment.iter_mut().for_each(|v| *v = None);
        self.trail.clear();
        self.qhead = 0;
        self.decisions = 0;
        self.model.clear();
    }
}

impl SATSolver for DpllSolver {
    fn add_variables(&mut self, num_vars: u32) {
        self.ensure_vars(self.num_vars + num_vars);
    }

    fn add_clause(&mut self, lits: &[i32]) -> bool {
        if lits.is_empty() {
            self.conflict = true;
            return false;
        }
        if let Some(max) = lits.iter().map(|l| l.unsigned_abs()).max() {
            self.ensure_vars(max);
        }
        let index = self.clauses.len();
        for &lit in lits {
            self.occurs[lit_index(lit)].push(index);
        }
        self.clauses.push(lits.to_vec());
        true
    }

    fn solve(&mut self) -> Result<bool, SolverFailure> {
        if self.conflict {
            return Ok(false);
        }
        self.reset();

        // unit clauses seed the trail
        for i in 0..self.clauses.len() {
            if let [unit] = self.clauses[i].as_slice() {
                let unit = *unit;
                match self.lit_value(unit) {
                    Some(true) => {}
                    Some(false) => return Ok(false),
                    None => self.enqueue(unit, false),
                }
            }
        }

        loop {
            if self.interrupted() {
                log::trace!("dpll: interrupted after {} decisions", self.decisions);
                return Err(SolverFailure::Interrupted);
            }
            if !self.propagate() {
                if !self.backtrack() {
                    log::trace!("dpll: unsat after {} decisions", self.decisions);
                    return Ok(false);
                }
                continue;
            }
            match self.next_unassigned() {
                Some(var) => {
                    self.decisions += 1;
                    self.enqueue(-(var as i32), true);
                }
                None => {
                    self.model = self.assignment.iter().map(|v| v.unwrap_or(false)).collect();
                    log::trace!("dpll: sat after {} decisions", self.decisions);
                    return Ok(true);
                }
            }
        }
    }

    fn value_of(&self, var: u32) -> bool {
        var > 0 && self.model.get(var as usize - 1).copied().unwrap_or(false)
    }

    fn num_variables(&self) -> u32 {
        self.num_vars
    }

    fn num_clauses(&self) -> u32 {
        self.clauses.len() as u32
    }
}
