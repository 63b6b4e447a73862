//! Models, run/check commands and their verdicts
//!
//! A [`Model`] gathers the bounds of a problem together with its named facts
//! and assertions, and lists the commands to answer. The command
//! [`Evaluator`] drives each command through translation, solving and
//! decoding, and classifies the outcome as a [`Verdict`]. Failures of the
//! engine are kept apart from verdicts: every command yields a
//! `Result<Verdict, RelError>`, and one failing command never stops the
//! evaluation of the others.

use crate::ast::Formula;
use crate::engine::evaluator::Evaluator as InstanceEvaluator;
use crate::instance::{Bounds, Instance};
use crate::solver::{Options, Solver, Stage, Statistics};
use crate::{RelError, Result};
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;

/// Where a command was declared
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    filename: String,
    line: u32,
    column: u32,
}

impl SourceLocation {
    /// Creates a location from a file name and a 1-based line and column
    pub fn new(filename: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            filename: filename.into(),
            line,
            column,
        }
    }

    /// Name of the declaring file
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Line of the declaration
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Column of the declaration
    pub fn column(&self) -> u32 {
        self.column
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at line {} column {}", self.filename, self.line, self.column)
    }
}

/// What a command asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Find any instance of the facts
    Run,
    /// Find an instance of the facts violating the named assertion
    Check {
        /// Name of the checked assertion
        assertion: String,
    },
}

/// A run or check command
#[derive(Debug, Clone)]
pub struct Command {
    name: String,
    kind: CommandKind,
    location: SourceLocation,
    facts: Option<Vec<String>>,
    bounds: Option<Arc<Bounds>>,
}

impl Command {
    /// A run command over all facts of the model
    pub fn run(name: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            name: name.into(),
            kind: CommandKind::Run,
            location,
            facts: None,
            bounds: None,
        }
    }

    /// A check of `assertion` under all facts of the model
    pub fn check(name: impl Into<String>, assertion: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            name: name.into(),
            kind: CommandKind::Check {
                assertion: assertion.into(),
            },
            location,
            facts: None,
            bounds: None,
        }
    }

    /// Restricts the command to the named facts
    pub fn with_facts<I, S>(mut self, facts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.facts = Some(facts.into_iter().map(Into::into).collect());
        self
    }

    /// Solves the command under its own bounds instead of the model's
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(Arc::new(bounds));
        self
    }

    /// Name of the command
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is a run or a check
    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    /// Declaration site
    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// Facts the command is restricted to, `None` meaning all of them
    pub fn facts(&self) -> Option<&[String]> {
        self.facts.as_deref()
    }

    /// Bounds override, if any
    pub fn bounds(&self) -> Option<&Bounds> {
        self.bounds.as_deref()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CommandKind::Run => write!(f, "Run {}", self.name),
            CommandKind::Check { .. } => write!(f, "Check {}", self.name),
        }
    }
}

/// Bounds, named facts and assertions, and the commands to answer
///
/// Facts and assertions must be closed formulas; they are kept in declaration
/// order so that every command sees the same conjunction.
#[derive(Debug, Clone)]
pub struct Model {
    bounds: Arc<Bounds>,
    facts: Vec<(String, Formula)>,
    assertions: Vec<(String, Formula)>,
    commands: Vec<Command>,
}

impl Model {
    /// Creates an empty model over `bounds`
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds: Arc::new(bounds),
            facts: Vec::new(),
            assertions: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Declares a fact
    ///
    /// # Errors
    /// `UnboundVariable` if the formula is open, `InvalidArgument` if a fact
    /// of that name already exists.
    pub fn fact(&mut self, name: impl Into<String>, formula: Formula) -> Result<()> {
        let name = name.into();
        Self::declare(&mut self.facts, name, formula)
    }

    /// Declares an assertion
    ///
    /// # Errors
    /// As for [`Model::fact`].
    pub fn assertion(&mut self, name: impl Into<String>, formula: Formula) -> Result<()> {
        let name = name.into();
        Self::declare(&mut self.assertions, name, formula)
    }

    fn declare(table: &mut Vec<(String, Formula)>, name: String, formula: Formula) -> Result<()> {
        if let Some(var) = formula.free_variables().first() {
            return Err(RelError::UnboundVariable(format!("{} in {}", var.name(), name)));
        }
        if table.iter().any(|(existing, _)| *existing == name) {
            return Err(RelError::InvalidArgument(format!("duplicate declaration of {name}")));
        }
        table.push((name, formula));
        Ok(())
    }

    /// Appends a command
    pub fn command(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Shared bounds of the model
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Bounds a command is solved under
    pub fn bounds_for<'m>(&'m self, command: &'m Command) -> &'m Bounds {
        command.bounds().unwrap_or(self.bounds())
    }

    /// Commands in declaration order
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Looks up a fact by name
    pub fn get_fact(&self, name: &str) -> Option<&Formula> {
        lookup(&self.facts, name)
    }

    /// Looks up an assertion by name
    pub fn get_assertion(&self, name: &str) -> Option<&Formula> {
        lookup(&self.assertions, name)
    }

    /// The formula whose instances answer `command`
    ///
    /// A run asks for the conjunction of its facts; a check asks for the
    /// facts together with the negated assertion, so that any instance is a
    /// counterexample.
    ///
    /// # Errors
    /// `UnknownFormula` if the command names a fact or assertion the model
    /// does not declare.
    pub fn formula_for(&self, command: &Command) -> Result<Formula> {
        let facts = match command.facts() {
            None => self.facts.iter().map(|(_, f)| f.clone()).collect(),
            Some(names) => names
                .iter()
                .map(|name| {
                    self.get_fact(name)
                        .cloned()
                        .ok_or_else(|| RelError::UnknownFormula(format!("fact {name}")))
                })
                .collect::<Result<Vec<_>>>()?,
        };
        let facts = Formula::and_all(facts);

        match command.kind() {
            CommandKind::Run => Ok(facts),
            CommandKind::Check { assertion } => {
                let asserted = self
                    .get_assertion(assertion)
                    .ok_or_else(|| RelError::UnknownFormula(format!("assertion {assertion}")))?;
                Ok(facts.and(asserted.clone().not()))
            }
        }
    }
}

fn lookup<'m>(table: &'m [(String, Formula)], name: &str) -> Option<&'m Formula> {
    table.iter().find(|(n, _)| n == name).map(|(_, f)| f)
}

/// Outcome of a command that was answered
#[derive(Debug, Clone)]
pub enum Verdict {
    /// A run found an instance of its facts
    ConsistentFound(Instance),
    /// A run found that its facts have no instance within the bounds
    NoInstance,
    /// A check found no counterexample within the bounds
    AssertionHeld,
    /// A check found a counterexample
    AssertionViolated(Instance),
}

impl Verdict {
    /// The instance found, if any
    pub fn instance(&self) -> Option<&Instance> {
        match self {
            Verdict::ConsistentFound(instance) | Verdict::AssertionViolated(instance) => Some(instance),
            Verdict::NoInstance | Verdict::AssertionHeld => None,
        }
    }

    /// Whether the verdict is reported as a success
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::ConsistentFound(_) | Verdict::AssertionHeld)
    }

    /// Terminal state corresponding to this verdict
    pub fn state(&self) -> CommandState {
        match self {
            Verdict::ConsistentFound(_) => CommandState::ConsistentFound,
            Verdict::NoInstance => CommandState::NoInstance,
            Verdict::AssertionHeld => CommandState::AssertionHeld,
            Verdict::AssertionViolated(_) => CommandState::AssertionViolated,
        }
    }
}

/// Lifecycle of a command under evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandState {
    /// Not started
    Pending,
    /// Building the formula and compiling it to a circuit
    Translating,
    /// Waiting on the SAT backend
    Solving,
    /// The backend answered and the answer was decoded
    Decoded,
    /// Terminal: a run found an instance
    ConsistentFound,
    /// Terminal: a run found no instance
    NoInstance,
    /// Terminal: a check found no counterexample
    AssertionHeld,
    /// Terminal: a check found a counterexample
    AssertionViolated,
    /// Terminal: translation, solving or confirmation failed
    Failed,
}

impl CommandState {
    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CommandState::ConsistentFound
                | CommandState::NoInstance
                | CommandState::AssertionHeld
                | CommandState::AssertionViolated
                | CommandState::Failed
        )
    }

    /// Whether `next` may directly follow this state
    pub fn can_advance_to(self, next: CommandState) -> bool {
        use CommandState::*;
        matches!(
            (self, next),
            (Pending, Translating)
                | (Translating, Solving | Failed)
                | (Solving, Decoded | Failed)
                | (Decoded, ConsistentFound | NoInstance | AssertionHeld | AssertionViolated | Failed)
        )
    }
}

// States visited by one command
struct Progress<'c> {
    command: &'c Command,
    states: Vec<CommandState>,
}

impl<'c> Progress<'c> {
    fn new(command: &'c Command) -> Self {
        Self {
            command,
            states: vec![CommandState::Pending],
        }
    }

    fn current(&self) -> CommandState {
        self.states.last().copied().unwrap_or(CommandState::Pending)
    }

    fn advance(&mut self, next: CommandState) {
        let current = self.current();
        debug_assert!(current.can_advance_to(next), "{current:?} -> {next:?}");
        log::debug!("{}: {:?} -> {:?}", self.command, current, next);
        self.states.push(next);
    }
}

/// The answer to one command
#[derive(Debug, Clone)]
pub struct CommandReport {
    command: String,
    kind: CommandKind,
    location: SourceLocation,
    result: Result<Verdict>,
    statistics: Option<Statistics>,
    states: Vec<CommandState>,
}

impl CommandReport {
    /// The command, rendered as `Run name` or `Check name`
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Whether the command was a run or a check
    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    /// Declaration site of the command
    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// The verdict, or the error that prevented one
    pub fn result(&self) -> &Result<Verdict> {
        &self.result
    }

    /// The verdict, if the command was answered
    pub fn verdict(&self) -> Option<&Verdict> {
        self.result.as_ref().ok()
    }

    /// The error, if the command failed
    pub fn error(&self) -> Option<&RelError> {
        self.result.as_ref().err()
    }

    /// Solving statistics, if the backend was reached and answered
    pub fn statistics(&self) -> Option<&Statistics> {
        self.statistics.as_ref()
    }

    /// Every state the command went through, starting at `Pending`
    pub fn states(&self) -> &[CommandState] {
        &self.states
    }

    /// The terminal state
    pub fn final_state(&self) -> CommandState {
        self.states.last().copied().unwrap_or(CommandState::Pending)
    }

    /// Whether the report belongs on the error stream
    pub fn is_error(&self) -> bool {
        !matches!(&self.result, Ok(verdict) if verdict.is_success())
    }
}

impl fmt::Display for CommandReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cmd = &self.command;
        let loc = &self.location;
        match &self.result {
            Ok(Verdict::ConsistentFound(_)) => write!(f, "Consistent: {cmd}"),
            Ok(Verdict::AssertionHeld) => write!(f, "Maybe valid: {cmd}"),
            Ok(Verdict::NoInstance) => {
                write!(f, "Inconsistent error in {loc}:\nNo instance of {cmd} found.")
            }
            Ok(Verdict::AssertionViolated(_)) => {
                write!(f, "Assertion error in {loc}:\nCounter-example of {cmd} found.")
            }
            Err(err) => write!(f, "Error in {loc}:\n{err}"),
        }
    }
}

/// Splits reports into success and error transcripts, one line per report,
/// preserving order within each
pub fn render_reports(reports: &[CommandReport]) -> (String, String) {
    let mut success = String::new();
    let mut errors = String::new();
    for report in reports {
        let out = if report.is_error() { &mut errors } else { &mut success };
        out.push_str(&report.to_string());
        out.push('\n');
    }
    (success, errors)
}

/// Evaluates the commands of a model
pub struct Evaluator {
    solver: Solver,
    confirm: bool,
}

impl Evaluator {
    /// Creates an evaluator solving with `options`
    pub fn new(options: Options) -> Self {
        Self {
            solver: Solver::new(options),
            confirm: true,
        }
    }

    /// Sets whether decoded instances are re-evaluated against the solved
    /// formula (on by default); a mismatch fails the command
    pub fn confirm_instances(mut self, confirm: bool) -> Self {
        self.confirm = confirm;
        self
    }

    /// Solver options in use
    pub fn options(&self) -> &Options {
        self.solver.options()
    }

    /// Evaluates every command in declaration order
    pub fn evaluate(&self, model: &Model) -> Vec<CommandReport> {
        model
            .commands()
            .iter()
            .map(|command| self.evaluate_command(model, command))
            .collect()
    }

    /// Evaluates commands concurrently; reports keep declaration order
    pub fn evaluate_parallel(&self, model: &Model) -> Vec<CommandReport> {
        model
            .commands()
            .par_iter()
            .map(|command| self.evaluate_command(model, command))
            .collect()
    }

    /// Evaluates one command against `model`
    pub fn evaluate_command(&self, model: &Model, command: &Command) -> CommandReport {
        let mut progress = Progress::new(command);
        let (result, statistics) = match self.answer(model, command, &mut progress) {
            Ok((verdict, stats)) => {
                progress.advance(verdict.state());
                (Ok(verdict), Some(stats))
            }
            Err(err) => {
                log::warn!("{} failed: {}", command, err);
                progress.advance(CommandState::Failed);
                (Err(err), None)
            }
        };

        CommandReport {
            command: command.to_string(),
            kind: command.kind().clone(),
            location: command.location().clone(),
            result,
            statistics,
            states: progress.states,
        }
    }

    fn answer(&self, model: &Model, command: &Command, progress: &mut Progress<'_>) -> Result<(Verdict, Statistics)> {
        progress.advance(CommandState::Translating);
        let formula = model.formula_for(command)?;
        let bounds = model.bounds_for(command);

        let solution = self.solver.solve_observed(&formula, bounds, |stage| match stage {
            Stage::Translating => {}
            Stage::Solving => progress.advance(CommandState::Solving),
            Stage::Decoding => progress.advance(CommandState::Decoded),
        })?;

        let stats = solution.statistics().clone();
        let verdict = match (command.kind(), solution.into_instance()) {
            (CommandKind::Run, Some(instance)) => Verdict::ConsistentFound(instance),
            (CommandKind::Run, None) => Verdict::NoInstance,
            (CommandKind::Check { .. }, Some(instance)) => Verdict::AssertionViolated(instance),
            (CommandKind::Check { .. }, None) => Verdict::AssertionHeld,
        };

        if self.confirm {
            if let Some(instance) = verdict.instance() {
                confirm(command, &formula, instance)?;
            }
        }
        Ok((verdict, stats))
    }
}

// A run's instance must satisfy its facts; a check's counterexample must
// satisfy facts and violate the assertion, which is the same formula
fn confirm(command: &Command, formula: &Formula, instance: &Instance) -> Result<()> {
    if InstanceEvaluator::new(instance)?.evaluate(formula)? {
        return Ok(());
    }
    log::warn!("{command}: decoded instance does not satisfy the solved formula");
    Err(RelError::Unconfirmed(command.to_string()))
}
