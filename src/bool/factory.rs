//! Boolean factory with gate caching
//!
//! The factory creates boolean values and gates, with automatic deduplication.
//! Uses interior mutability (RefCell) to avoid &mut self everywhere.

use super::arena::{Gate, GateArena};
use super::{BoolValue, BooleanConstant, BooleanFormula, BooleanVariable};
use rustc_hash::FxHashMap;
use std::cell::RefCell;

/// Options for boolean factory
#[derive(Debug, Clone)]
pub struct Options {
    /// Enable sharing of structurally identical gates (default: true)
    pub sharing: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { sharing: true }
    }
}

/// Boolean circuit factory with caching
///
/// Creates boolean values and gates, deduplicating structurally identical
/// gates when sharing is enabled. Constant inputs are folded away, so a gate
/// is only created when the result depends on at least two inputs.
pub struct BooleanFactory {
    num_variables: u32,
    options: Options,
    arena: RefCell<GateArena>,
    cache: RefCell<FxHashMap<Gate, BoolValue>>,
}

impl BooleanFactory {
    /// Creates a new boolean factory
    ///
    /// # Arguments
    /// * `num_variables` - Number of primary variables, labelled `1..=num_variables`
    /// * `options` - Factory options
    pub fn new(num_variables: u32, options: Options) -> Self {
        Self {
            num_variables,
            options,
            arena: RefCell::new(GateArena::new(num_variables as i32 + 1)),
            cache: RefCell::new(FxHashMap::default()),
        }
    }

    /// Returns the number of primary variables
    pub fn num_variables(&self) -> u32 {
        self.num_variables
    }

    /// Returns the number of gates created so far
    pub fn num_gates(&self) -> usize {
        self.arena.borrow().len()
    }

    /// Returns the gate behind a formula
    pub fn gate(&self, formula: BooleanFormula) -> Option<Gate> {
        self.arena.borrow().get(formula.label()).cloned()
    }

    /// Creates a boolean variable
    ///
    /// # Panics
    /// Panics if the label is not one of this factory's variables
    pub fn variable(&self, label: i32) -> BoolValue {
        assert!(
            label > 0 && label <= self.num_variables as i32,
            "Variable label must be in range 1..={}",
            self.num_variables
        );
        BoolValue::Variable(BooleanVariable::new(label))
    }

    /// Creates a constant
    pub fn constant(&self, value: bool) -> BoolValue {
        BoolValue::Constant(if value {
            BooleanConstant::TRUE
        } else {
            BooleanConstant::FALSE
        })
    }

    /// Creates an AND gate
    pub fn and(&self, left: BoolValue, right: BoolValue) -> BoolValue {
        self.and_multi(vec![left, right])
    }

    /// Creates a multi-input AND gate
    pub fn and_multi(&self, inputs: Vec<BoolValue>) -> BoolValue {
        match Self::fold(inputs, BooleanConstant::TRUE) {
            Ok(inputs) => self.make(Gate::And(inputs.into_boxed_slice())),
            Err(value) => value,
        }
    }

    /// Creates an OR gate
    pub fn or(&self, left: BoolValue, right: BoolValue) -> BoolValue {
        self.or_multi(vec![left, right])
    }

    /// Creates a multi-input OR gate
    pub fn or_multi(&self, inputs: Vec<BoolValue>) -> BoolValue {
        match Self::fold(inputs, BooleanConstant::FALSE) {
            Ok(inputs) => self.make(Gate::Or(inputs.into_boxed_slice())),
            Err(value) => value,
        }
    }

    // Drops identity constants and duplicates. Returns Err with the result
    // when the gate collapses to a constant or a single input.
    fn fold(mut inputs: Vec<BoolValue>, identity: BooleanConstant) -> Result<Vec<BoolValue>, BoolValue> {
        let absorbing = identity.negate();
        if inputs.contains(&BoolValue::Constant(absorbing)) {
            return Err(BoolValue::Constant(absorbing));
        }
        inputs.retain(|v| *v != BoolValue::Constant(identity));
        inputs.sort_by_key(BoolValue::label);
        inputs.dedup();
        match inputs.len() {
            0 => Err(BoolValue::Constant(identity)),
            1 => Err(inputs[0]),
            _ => Ok(inputs),
        }
    }

    /// Creates a NOT gate
    #[allow(clippy::should_implement_trait)]
    pub fn not(&self, input: BoolValue) -> BoolValue {
        match input {
            BoolValue::Constant(c) => BoolValue::Constant(c.negate()),
            BoolValue::Formula(f) => match self.gate(f) {
                Some(Gate::Not(inner)) => inner,
                _ => self.make(Gate::Not(input)),
            },
            BoolValue::Variable(_) => self.make(Gate::Not(input)),
        }
    }

    /// Creates an if-then-else gate
    pub fn ite(&self, condition: BoolValue, then_val: BoolValue, else_val: BoolValue) -> BoolValue {
        if let BoolValue::Constant(c) = condition {
            return if c.boolean_value() { then_val } else { else_val };
        }
        if then_val == else_val {
            return then_val;
        }
        match (then_val, else_val) {
            (BoolValue::Constant(t), _) if t.boolean_value() => self.or(condition, else_val),
            (BoolValue::Constant(_), _) => self.and(self.not(condition), else_val),
            (_, BoolValue::Constant(e)) if e.boolean_value() => self.or(self.not(condition), then_val),
            (_, BoolValue::Constant(_)) => self.and(condition, then_val),
            _ => self.make(Gate::Ite {
                condition,
                then_val,
                else_val,
            }),
        }
    }

    /// IFF (if and only if): ite(a, b, !b)
    pub fn iff(&self, a: BoolValue, b: BoolValue) -> BoolValue {
        let not_b = self.not(b);
        self.ite(a, b, not_b)
    }

    /// IMPLIES: a IMPLIES b = NOT a OR b
    pub fn implies(&self, a: BoolValue, b: BoolValue) -> BoolValue {
        let not_a = self.not(a);
        self.or(not_a, b)
    }

    fn make(&self, gate: Gate) -> BoolValue {
        if self.options.sharing {
            if let Some(&cached) = self.cache.borrow().get(&gate) {
                return cached;
            }
        }
        let label = self.arena.borrow_mut().push(gate.clone());
        let value = BoolValue::Formula(BooleanFormula::new(label));
        if self.options.sharing {
            self.cache.borrow_mut().insert(gate, value);
        }
        value
    }
}
