//! Gate storage for boolean circuits
//!
//! Gates live in a vector owned by the factory and are addressed by their
//! label, so a `BoolValue` is a plain copyable label and needs no lifetime.
//! Gate labels are dense: the first gate gets `num_variables + 1`.

use super::BoolValue;

/// A boolean gate over previously created values
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Gate {
    /// Multi-input AND gate
    And(Box<[BoolValue]>),
    /// Multi-input OR gate
    Or(Box<[BoolValue]>),
    /// NOT gate
    Not(BoolValue),
    /// If-then-else gate
    Ite {
        /// Condition
        condition: BoolValue,
        /// Then branch
        then_val: BoolValue,
        /// Else branch
        else_val: BoolValue,
    },
}

impl Gate {
    /// Inputs of this gate, in order
    pub fn inputs(&self) -> Vec<BoolValue> {
        match self {
            Gate::And(inputs) | Gate::Or(inputs) => inputs.to_vec(),
            Gate::Not(input) => vec![*input],
            Gate::Ite {
                condition,
                then_val,
                else_val,
            } => vec![*condition, *then_val, *else_val],
        }
    }
}

/// Append-only store of gates
#[derive(Debug, Default)]
pub struct GateArena {
    first_label: i32,
    gates: Vec<Gate>,
}

impl GateArena {
    /// Creates an arena whose first gate is labelled `first_label`
    pub fn new(first_label: i32) -> Self {
        Self {
            first_label,
            gates: Vec::new(),
        }
    }

    /// Stores a gate and returns its label
    pub fn push(&mut self, gate: Gate) -> i32 {
        self.gates.push(gate);
        self.first_label + self.gates.len() as i32 - 1
    }

    /// Returns the gate with the given label
    pub fn get(&self, label: i32) -> Option<&Gate> {
        let offset = usize::try_from(label - self.first_label).ok()?;
        self.gates.get(offset)
    }

    /// Number of gates stored
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    /// Returns true if no gate has been stored
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}
