//! Boolean circuit representation
//!
//! The boolean layer is the intermediate representation used when translating
//! relational formulas to CNF for SAT solving.
//!
//! Key types:
//! - `BooleanConstant`: TRUE (label 0) or FALSE (label -1)
//! - `BooleanVariable`: Variables with positive integer labels
//! - `BooleanFormula`: Gates, stored in the factory's arena
//! - `BoolValue`: Enum encompassing all boolean value types
//! - `Dimensions`: Matrix dimensions for relation encoding
//! - `BooleanMatrix`: Sparse matrix of boolean values, one cell per tuple
//! - `BooleanFactory`: Factory for creating and caching boolean circuits

pub mod arena;
mod factory;
pub mod var_allocator;

pub use arena::{Gate, GateArena};
pub use factory::{BooleanFactory, Options};
pub use var_allocator::VariableAllocator;

use std::collections::BTreeMap;

/// Boolean constant (TRUE or FALSE)
///
/// Constants have special labels:
/// - TRUE has label 0
/// - FALSE has label -1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanConstant {
    /// TRUE constant (label 0)
    TRUE,
    /// FALSE constant (label -1)
    FALSE,
}

impl BooleanConstant {
    /// Returns the label for this constant
    pub fn label(&self) -> i32 {
        match self {
            BooleanConstant::TRUE => 0,
            BooleanConstant::FALSE => -1,
        }
    }

    /// Returns the boolean value of this constant
    pub fn boolean_value(&self) -> bool {
        *self == BooleanConstant::TRUE
    }

    /// Returns the opposite constant
    pub fn negate(&self) -> BooleanConstant {
        match self {
            BooleanConstant::TRUE => BooleanConstant::FALSE,
            BooleanConstant::FALSE => BooleanConstant::TRUE,
        }
    }
}

/// Boolean variable with a positive integer label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BooleanVariable {
    label: i32,
}

impl BooleanVariable {
    /// Creates a new boolean variable with the given label.
    ///
    /// # Panics
    /// Panics if label is not positive (must be > 0).
    pub fn new(label: i32) -> Self {
        assert!(label > 0, "Variable labels must be positive");
        Self { label }
    }

    /// Returns the label for this variable
    pub fn label(&self) -> i32 {
        self.label
    }
}

/// Boolean formula (gate)
///
/// Formulas have identity-based equality using their unique labels; the gate
/// itself lives in the factory that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BooleanFormula {
    label: i32,
}

impl BooleanFormula {
    pub(crate) fn new(label: i32) -> Self {
        Self { label }
    }

    /// Returns the label for this formula
    pub fn label(&self) -> i32 {
        self.label
    }
}

/// Unified boolean value type
///
/// Encompasses constants, variables, and formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolValue {
    /// Constant (TRUE or FALSE)
    Constant(BooleanConstant),
    /// Variable
    Variable(BooleanVariable),
    /// Formula (gate)
    Formula(BooleanFormula),
}

impl BoolValue {
    /// TRUE constant
    pub const TRUE: BoolValue = BoolValue::Constant(BooleanConstant::TRUE);
    /// FALSE constant
    pub const FALSE: BoolValue = BoolValue::Constant(BooleanConstant::FALSE);

    /// Returns the label for this value
    pub fn label(&self) -> i32 {
        match self {
            BoolValue::Constant(c) => c.label(),
            BoolValue::Variable(v) => v.label(),
            BoolValue::Formula(f) => f.label(),
        }
    }

    /// Returns true if this is a constant
    pub fn is_constant(&self) -> bool {
        matches!(self, BoolValue::Constant(_))
    }

    /// Returns true if this is a variable
    pub fn is_variable(&self) -> bool {
        matches!(self, BoolValue::Variable(_))
    }

    /// Returns true if this is a formula
    pub fn is_formula(&self) -> bool {
        matches!(self, BoolValue::Formula(_))
    }
}

impl From<BooleanConstant> for BoolValue {
    fn from(c: BooleanConstant) -> Self {
        BoolValue::Constant(c)
    }
}

impl From<BooleanVariable> for BoolValue {
    fn from(v: BooleanVariable) -> Self {
        BoolValue::Variable(v)
    }
}

/// Dimensions for boolean matrices
///
/// A matrix encoding a relation of arity k over a universe of n atoms has one
/// cell per possible tuple, `n^k` cells in all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    universe_size: usize,
    arity: usize,
}

impl Dimensions {
    /// Creates dimensions for a relation of given arity over a universe
    pub fn new(universe_size: usize, arity: usize) -> Self {
        Self {
            universe_size,
            arity,
        }
    }

    /// Returns the size of every dimension, i.e. the universe size
    pub fn universe_size(&self) -> usize {
        self.universe_size
    }

    /// Returns the arity (number of dimensions)
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Returns the total capacity (number of possible tuples)
    pub fn capacity(&self) -> usize {
        self.universe_size.pow(self.arity as u32)
    }

    /// Number of cells sharing the same first atom, `n^(k-1)`
    pub fn row_length(&self) -> usize {
        self.universe_size.pow(self.arity.saturating_sub(1) as u32)
    }

    fn with_arity(&self, arity: usize) -> Dimensions {
        Dimensions::new(self.universe_size, arity)
    }
}

/// Matrix of boolean values
///
/// Used to encode relations during translation. Storage is sparse: only
/// non-FALSE cells are kept, ordered by tuple index so that every operation
/// creates its gates in a reproducible order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooleanMatrix {
    dimensions: Dimensions,
    cells: BTreeMap<usize, BoolValue>,
}

impl BooleanMatrix {
    /// Creates an empty matrix with the given dimensions (all FALSE)
    pub fn empty(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            cells: BTreeMap::new(),
        }
    }

    /// The identity matrix: TRUE on the diagonal of a binary relation
    pub fn identity(universe_size: usize) -> Self {
        let mut matrix = Self::empty(Dimensions::new(universe_size, 2));
        for atom in 0..universe_size {
            matrix.set(atom * universe_size + atom, BoolValue::TRUE);
        }
        matrix
    }

    /// A matrix with TRUE in every given cell
    pub fn constant(dimensions: Dimensions, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut matrix = Self::empty(dimensions);
        for index in indices {
            matrix.set(index, BoolValue::TRUE);
        }
        matrix
    }

    /// Returns the dimensions of this matrix
    pub fn dimensions(&self) -> &Dimensions {
        &self.dimensions
    }

    /// Sets value at flat index
    pub fn set(&mut self, index: usize, value: BoolValue) {
        if value == BoolValue::FALSE {
            self.cells.remove(&index);
        } else {
            self.cells.insert(index, value);
        }
    }

    /// Gets value at flat index
    pub fn get(&self, index: usize) -> BoolValue {
        self.cells.get(&index).copied().unwrap_or(BoolValue::FALSE)
    }

    /// Iterates over (index, value) pairs of the non-FALSE cells, in index order
    pub fn iter_indexed(&self) -> impl Iterator<Item = (usize, BoolValue)> + '_ {
        self.cells.iter().map(|(&idx, &val)| (idx, val))
    }

    /// Returns the number of non-FALSE entries
    pub fn density(&self) -> usize {
        self.cells.len()
    }

    /// Returns the indices where the value is the TRUE constant
    pub fn dense_indices(&self) -> Vec<usize> {
        self.cells
            .iter()
            .filter(|(_, val)| **val == BoolValue::TRUE)
            .map(|(&idx, _)| idx)
            .collect()
    }

    /// Union (OR) of two matrices
    pub fn union(&self, other: &BooleanMatrix, factory: &BooleanFactory) -> BooleanMatrix {
        debug_assert_eq!(self.dimensions, other.dimensions);
        let mut result = self.clone();
        for (&idx, &val) in &other.cells {
            let current = result.get(idx);
            result.set(idx, factory.or(current, val));
        }
        result
    }

    /// Intersection (AND) of two matrices
    pub fn intersection(&self, other: &BooleanMatrix, factory: &BooleanFactory) -> BooleanMatrix {
        debug_assert_eq!(self.dimensions, other.dimensions);
        let mut result = BooleanMatrix::empty(self.dimensions);
        for (&idx, &val) in &self.cells {
            if let Some(&other_val) = other.cells.get(&idx) {
                result.set(idx, factory.and(val, other_val));
            }
        }
        result
    }

    /// Difference (this AND NOT other)
    pub fn difference(&self, other: &BooleanMatrix, factory: &BooleanFactory) -> BooleanMatrix {
        debug_assert_eq!(self.dimensions, other.dimensions);
        let mut result = BooleanMatrix::empty(self.dimensions);
        for (&idx, &val) in &self.cells {
            let not_other = factory.not(other.get(idx));
            result.set(idx, factory.and(val, not_other));
        }
        result
    }

    /// Join (relational composition) of two matrices
    ///
    /// A cell `i` of this matrix matches a cell `j` of `other` when the last
    /// atom of `i` is the first atom of `j`; the result cell drops both.
    pub fn join(&self, other: &BooleanMatrix, factory: &BooleanFactory) -> BooleanMatrix {
        let n = self.dimensions.universe_size;
        let result_arity = self.dimensions.arity + other.dimensions.arity - 2;
        let mut result = BooleanMatrix::empty(self.dimensions.with_arity(result_arity));

        if self.cells.is_empty() || other.cells.is_empty() {
            return result;
        }

        let c = other.dimensions.row_length();
        let mut disjuncts: BTreeMap<usize, Vec<BoolValue>> = BTreeMap::new();
        for (&i, &v0) in &self.cells {
            let row_head = (i % n) * c;
            for (&j, &v1) in other.cells.range(row_head..row_head + c) {
                let k = (i / n) * c + j % c;
                disjuncts.entry(k).or_default().push(factory.and(v0, v1));
            }
        }
        for (k, values) in disjuncts {
            result.set(k, factory.or_multi(values));
        }
        result
    }

    /// Cross product of two matrices
    pub fn product(&self, other: &BooleanMatrix, factory: &BooleanFactory) -> BooleanMatrix {
        let result_arity = self.dimensions.arity + other.dimensions.arity;
        let mut result = BooleanMatrix::empty(self.dimensions.with_arity(result_arity));

        let other_cap = other.dimensions.capacity();
        for (&i, &v0) in &self.cells {
            for (&j, &v1) in &other.cells {
                result.set(i * other_cap + j, factory.and(v0, v1));
            }
        }
        result
    }

    /// Transpose of a binary matrix
    pub fn transpose(&self) -> BooleanMatrix {
        debug_assert_eq!(self.dimensions.arity, 2, "transpose only works on binary relations");
        let n = self.dimensions.universe_size;
        let mut result = BooleanMatrix::empty(self.dimensions);
        for (&idx, &val) in &self.cells {
            result.set((idx % n) * n + idx / n, val);
        }
        result
    }

    /// Override: tuples of `other`, plus tuples of this matrix whose first
    /// atom has no tuple in `other`
    pub fn override_with(&self, other: &BooleanMatrix, factory: &BooleanFactory) -> BooleanMatrix {
        debug_assert_eq!(self.dimensions, other.dimensions);
        if other.cells.is_empty() {
            return self.clone();
        }

        let row_length = self.dimensions.row_length();
        let mut result = other.clone();
        let mut row = usize::MAX;
        let mut row_free = BoolValue::TRUE;

        for (&idx, &val) in &self.cells {
            if idx / row_length != row {
                row = idx / row_length;
                let start = row * row_length;
                let negated = other
                    .cells
                    .range(start..start + row_length)
                    .map(|(_, &v)| factory.not(v))
                    .collect();
                row_free = factory.and_multi(negated);
            }
            let current = result.get(idx);
            let kept = factory.and(val, row_free);
            result.set(idx, factory.or(current, kept));
        }
        result
    }

    /// Transitive closure of a binary matrix
    ///
    /// Computed by iterative squaring, `ret = ret | ret.ret`. A simple path
    /// visits each atom with an outgoing edge at most once, so squaring until
    /// the path length covers the number of non-empty rows is enough.
    pub fn closure(&self, factory: &BooleanFactory) -> BooleanMatrix {
        debug_assert_eq!(self.dimensions.arity, 2, "closure requires a binary relation");
        if self.cells.is_empty() {
            return self.clone();
        }

        let n = self.dimensions.universe_size;
        let mut rows: Vec<usize> = self.cells.keys().map(|idx| idx / n).collect();
        rows.dedup();
        let row_num = rows.len();

        let mut ret = self.clone();
        let mut i = 1;
        while i < row_num {
            let squared = ret.join(&ret, factory);
            ret = ret.union(&squared, factory);
            i *= 2;
        }
        ret
    }

    /// Reflexive transitive closure: closure | IDEN
    pub fn reflexive_closure(&self, factory: &BooleanFactory) -> BooleanMatrix {
        let iden = BooleanMatrix::identity(self.dimensions.universe_size);
        self.closure(factory).union(&iden, factory)
    }

    /// Check subset: every cell of this matrix implies the same cell of `other`
    pub fn subset(&self, other: &BooleanMatrix, factory: &BooleanFactory) -> BoolValue {
        debug_assert_eq!(self.dimensions, other.dimensions);
        let implications = self
            .cells
            .iter()
            .map(|(&idx, &val)| factory.implies(val, other.get(idx)))
            .collect();
        factory.and_multi(implications)
    }

    /// Check equality: mutual subset
    pub fn equals(&self, other: &BooleanMatrix, factory: &BooleanFactory) -> BoolValue {
        let subset1 = self.subset(other, factory);
        let subset2 = other.subset(self, factory);
        factory.and(subset1, subset2)
    }

    /// Multiplicity: some (at least one entry is TRUE)
    pub fn some(&self, factory: &BooleanFactory) -> BoolValue {
        factory.or_multi(self.cells.values().copied().collect())
    }

    /// Multiplicity: none (all entries are FALSE)
    pub fn none(&self, factory: &BooleanFactory) -> BoolValue {
        factory.not(self.some(factory))
    }

    /// Multiplicity: lone (at most one entry is TRUE)
    pub fn lone(&self, factory: &BooleanFactory) -> BoolValue {
        self.at_most_one(factory).0
    }

    /// Multiplicity: one (exactly one entry is TRUE)
    pub fn one(&self, factory: &BooleanFactory) -> BoolValue {
        let (lone, some) = self.at_most_one(factory);
        factory.and(lone, some)
    }

    // (at most one cell is true, some cell is true), chained through the
    // partial disjunction of the cells seen so far
    fn at_most_one(&self, factory: &BooleanFactory) -> (BoolValue, BoolValue) {
        let mut constraints = Vec::with_capacity(self.cells.len());
        let mut partial = BoolValue::FALSE;
        for &val in self.cells.values() {
            // val => !partial
            let not_partial = factory.not(partial);
            constraints.push(factory.implies(val, not_partial));
            partial = factory.or(partial, val);
        }
        (factory.and_multi(constraints), partial)
    }
}
