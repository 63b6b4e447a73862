//! Atoms, tuples, bounds and instances
//!
//! A tuple of arity k over a universe of n atoms is addressed by its index in
//! the n^k space, the first atom being the most significant digit. Tuple sets
//! keep their tuples ordered by that index, so every iteration over them is
//! reproducible.

use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::ast::Relation;
use crate::error::{RelError, Result};

/// The finite, ordered set of atoms a problem ranges over
///
/// An atom's position is its index; tuple indices are built from it. Cloning
/// shares the atom table.
#[derive(Clone)]
pub struct Universe {
    inner: Arc<UniverseInner>,
}

struct UniverseInner {
    atoms: Vec<String>,
    indices: FxHashMap<String, usize>,
}

impl Universe {
    /// Universe of `atoms`, in the given order
    ///
    /// # Errors
    /// `InvalidArgument` for an empty list or a repeated atom.
    pub fn new(atoms: &[&str]) -> Result<Self> {
        if atoms.is_empty() {
            return Err(RelError::InvalidArgument(
                "cannot create an empty universe".to_string(),
            ));
        }

        let atoms: Vec<String> = atoms.iter().map(|atom| atom.to_string()).collect();
        let mut indices = FxHashMap::default();
        for (position, atom) in atoms.iter().enumerate() {
            if indices.insert(atom.clone(), position).is_some() {
                return Err(RelError::InvalidArgument(format!("duplicate atom {atom}")));
            }
        }

        Ok(Self {
            inner: Arc::new(UniverseInner { atoms, indices }),
        })
    }

    /// Number of atoms
    pub fn size(&self) -> usize {
        self.inner.atoms.len()
    }

    /// Atom at `index`
    pub fn atom(&self, index: usize) -> Option<&str> {
        self.inner.atoms.get(index).map(|s| s.as_str())
    }

    /// Position of `atom`
    pub fn index_of(&self, atom: &str) -> Option<usize> {
        self.inner.indices.get(atom).copied()
    }

    /// Whether `atom` belongs to this universe
    pub fn contains(&self, atom: &str) -> bool {
        self.inner.indices.contains_key(atom)
    }

    /// Atoms in index order
    pub fn atoms(&self) -> impl Iterator<Item = &str> {
        self.inner.atoms.iter().map(String::as_str)
    }

    /// Builder of tuples and tuple sets over this universe
    pub fn factory(&self) -> TupleFactory {
        TupleFactory {
            universe: self.clone(),
        }
    }

    /// Number of tuples of the given arity, `size^arity`
    ///
    /// # Errors
    /// `InvalidBounds` when that many tuples cannot be indexed by a `usize`.
    pub fn capacity(&self, arity: usize) -> Result<usize> {
        u32::try_from(arity)
            .ok()
            .and_then(|exponent| self.size().checked_pow(exponent))
            .ok_or_else(|| RelError::InvalidBounds {
                relation: format!("arity-{arity} tuples"),
                reason: format!("{}^{arity} tuples overflow the tuple index", self.size()),
            })
    }

    // first atom is the most significant digit
    fn index_of_atoms(&self, atom_indices: &[usize]) -> usize {
        let base = self.size();
        atom_indices.iter().fold(0, |index, &atom| index * base + atom)
    }
}

impl PartialEq for Universe {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.atoms == other.inner.atoms
    }
}

impl Eq for Universe {}

impl fmt::Debug for Universe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Universe({:?})", self.inner.atoms)
    }
}

/// A sequence of atoms, identified by its arity and index
#[derive(Clone, Debug)]
pub struct Tuple {
    universe: Universe,
    atom_indices: Vec<usize>,
    index: usize,
}

impl Tuple {
    /// Universe the atoms are drawn from
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Number of atoms
    pub fn arity(&self) -> usize {
        self.atom_indices.len()
    }

    /// Position among all tuples of this arity, `sum(atom_i * n^(k-1-i))`
    pub fn index(&self) -> usize {
        self.index
    }

    /// Atom in column `column`
    pub fn atom(&self, column: usize) -> Option<&str> {
        self.atom_index(column).and_then(|atom| self.universe.atom(atom))
    }

    /// Universe index of the atom in column `column`
    pub fn atom_index(&self, column: usize) -> Option<usize> {
        self.atom_indices.get(column).copied()
    }

    /// Atoms from the first column to the last
    pub fn atoms(&self) -> impl Iterator<Item = &str> + '_ {
        self.atom_indices.iter().filter_map(|&atom| self.universe.atom(atom))
    }

    /// The tuple formed by this tuple's atoms followed by `other`'s
    pub fn product(&self, other: &Tuple) -> Tuple {
        let mut atom_indices = Vec::with_capacity(self.arity() + other.arity());
        atom_indices.extend_from_slice(&self.atom_indices);
        atom_indices.extend_from_slice(&other.atom_indices);
        let index = self.universe.index_of_atoms(&atom_indices);
        Tuple {
            universe: self.universe.clone(),
            atom_indices,
            index,
        }
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.arity() == other.arity() && self.index == other.index && self.universe == other.universe
    }
}

impl Eq for Tuple {}

impl Hash for Tuple {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.arity().hash(state);
        self.index.hash(state);
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let atoms: Vec<&str> = self.atoms().collect();
        write!(f, "({})", atoms.join(", "))
    }
}

/// Tuples of one arity over one universe, kept in index order
#[derive(Clone, Debug)]
pub struct TupleSet {
    universe: Universe,
    arity: usize,
    tuples: BTreeMap<usize, Tuple>,
}

impl TupleSet {
    /// Set with no tuples
    pub fn empty(universe: Universe, arity: usize) -> Self {
        Self {
            universe,
            arity,
            tuples: BTreeMap::new(),
        }
    }

    /// Universe of every member
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Arity of every member
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Number of tuples
    pub fn size(&self) -> usize {
        self.tuples.len()
    }

    /// Whether the set has no tuples
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    fn check_compatible(&self, universe: &Universe, arity: usize) -> Result<()> {
        if universe != &self.universe {
            return Err(RelError::InvalidArgument("tuple from another universe".to_string()));
        }
        if arity != self.arity {
            return Err(RelError::ArityMismatch {
                expected: self.arity,
                found: arity,
            });
        }
        Ok(())
    }

    /// Inserts `tuple`; fails on a foreign universe or another arity
    pub fn add(&mut self, tuple: Tuple) -> Result<()> {
        self.check_compatible(tuple.universe(), tuple.arity())?;
        self.tuples.insert(tuple.index, tuple);
        Ok(())
    }

    // index < universe.capacity(arity)
    pub(crate) fn insert_index(&mut self, index: usize) {
        let tuple = self.universe.factory().unchecked_tuple(self.arity, index);
        self.tuples.insert(index, tuple);
    }

    /// Membership test; tuples of another arity are never members
    pub fn contains(&self, tuple: &Tuple) -> bool {
        tuple.arity() == self.arity
            && tuple.universe == self.universe
            && self.tuples.contains_key(&tuple.index)
    }

    /// Membership by tuple index
    pub fn contains_index(&self, index: usize) -> bool {
        self.tuples.contains_key(&index)
    }

    /// Members in index order
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.values()
    }

    /// Member indices, ascending
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.tuples.keys().copied()
    }

    /// Member indices as an ordered set
    pub fn index_view(&self) -> BTreeSet<usize> {
        self.indices().collect()
    }

    /// In-place union
    pub fn add_all(&mut self, other: &TupleSet) -> Result<()> {
        self.check_compatible(other.universe(), other.arity())?;
        for (&index, tuple) in &other.tuples {
            self.tuples.entry(index).or_insert_with(|| tuple.clone());
        }
        Ok(())
    }

    /// Removes `tuple`, returning whether it was a member
    pub fn remove(&mut self, tuple: &Tuple) -> bool {
        self.contains(tuple) && self.tuples.remove(&tuple.index).is_some()
    }

    /// Every member of `self` is in `other`
    pub fn is_subset(&self, other: &TupleSet) -> bool {
        self.arity == other.arity
            && self.universe == other.universe
            && self.tuples.keys().all(|i| other.tuples.contains_key(i))
    }

    /// `self + other`
    pub fn union(&self, other: &TupleSet) -> Result<TupleSet> {
        let mut result = self.clone();
        result.add_all(other)?;
        Ok(result)
    }

    /// `self - other`
    pub fn difference(&self, other: &TupleSet) -> Result<TupleSet> {
        self.check_compatible(other.universe(), other.arity())?;
        let mut result = self.clone();
        result.tuples.retain(|index, _| !other.tuples.contains_key(index));
        Ok(result)
    }

    /// `self -> other`
    pub fn product(&self, other: &TupleSet) -> Result<TupleSet> {
        if other.universe() != &self.universe {
            return Err(RelError::InvalidArgument("product across universes".to_string()));
        }
        self.universe.capacity(self.arity + other.arity)?;

        let tuples = self
            .iter()
            .flat_map(|left| other.iter().map(move |right| left.product(right)))
            .map(|tuple| (tuple.index, tuple))
            .collect();
        Ok(TupleSet {
            universe: self.universe.clone(),
            arity: self.arity + other.arity,
            tuples,
        })
    }
}

impl PartialEq for TupleSet {
    fn eq(&self, other: &Self) -> bool {
        self.arity == other.arity
            && self.universe == other.universe
            && self.tuples.keys().eq(other.tuples.keys())
    }
}

impl Eq for TupleSet {}

impl fmt::Display for TupleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members: Vec<String> = self.iter().map(Tuple::to_string).collect();
        write!(f, "{{{}}}", members.join(", "))
    }
}

/// Builds tuples and tuple sets from atom names
pub struct TupleFactory {
    universe: Universe,
}

impl TupleFactory {
    /// Universe the tuples are drawn from
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Tuple of the named atoms
    pub fn tuple(&self, atoms: &[&str]) -> Result<Tuple> {
        if atoms.is_empty() {
            return Err(RelError::InvalidArgument("a tuple needs at least one atom".to_string()));
        }

        let mut atom_indices = Vec::with_capacity(atoms.len());
        for &atom in atoms {
            match self.universe.index_of(atom) {
                Some(position) => atom_indices.push(position),
                None => return Err(RelError::InvalidArgument(format!("unknown atom {atom}"))),
            }
        }
        self.universe.capacity(atoms.len())?;
        let index = self.universe.index_of_atoms(&atom_indices);

        Ok(Tuple {
            universe: self.universe.clone(),
            atom_indices,
            index,
        })
    }

    /// Set of the listed tuples; the first one fixes the arity
    pub fn tuple_set(&self, tuples: &[&[&str]]) -> Result<TupleSet> {
        let Some(first) = tuples.first() else {
            return Err(RelError::InvalidArgument("no tuples to take an arity from".to_string()));
        };

        let mut set = TupleSet::empty(self.universe.clone(), first.len());
        for &atoms in tuples {
            set.add(self.tuple(atoms)?)?;
        }
        Ok(set)
    }

    /// Empty set of `arity`
    pub fn none(&self, arity: usize) -> TupleSet {
        TupleSet::empty(self.universe.clone(), arity)
    }

    /// Every tuple of `arity`
    ///
    /// # Errors
    /// `InvalidBounds` if `size^arity` overflows the tuple index.
    pub fn all(&self, arity: usize) -> Result<TupleSet> {
        let tuples = (0..self.universe.capacity(arity)?)
            .map(|index| (index, self.unchecked_tuple(arity, index)))
            .collect();
        Ok(TupleSet {
            universe: self.universe.clone(),
            arity,
            tuples,
        })
    }

    /// Tuples whose index lies between `start` and `end`, both included
    pub fn range(&self, start: &Tuple, end: &Tuple) -> Result<TupleSet> {
        if start.arity() != end.arity() {
            return Err(RelError::ArityMismatch {
                expected: start.arity(),
                found: end.arity(),
            });
        }
        if start.index > end.index {
            return Err(RelError::InvalidArgument(format!("range {start}..{end} is backwards")));
        }

        let mut set = self.none(start.arity());
        (start.index..=end.index).for_each(|index| set.insert_index(index));
        Ok(set)
    }

    /// `{(atom)}`
    pub fn set_of(&self, atom: &str) -> Result<TupleSet> {
        let mut set = self.none(1);
        set.add(self.tuple(&[atom])?)?;
        Ok(set)
    }

    /// Tuple of `arity` at position `index`
    pub fn tuple_from_index(&self, arity: usize, index: usize) -> Result<Tuple> {
        if arity == 0 || index >= self.universe.capacity(arity)? {
            return Err(RelError::InvalidArgument(format!(
                "no tuple of arity {arity} has index {index}"
            )));
        }
        Ok(self.unchecked_tuple(arity, index))
    }

    fn unchecked_tuple(&self, arity: usize, index: usize) -> Tuple {
        let n = self.universe.size();
        let mut atom_indices = vec![0; arity];
        let mut rest = index;
        for column in (0..arity).rev() {
            atom_indices[column] = rest % n;
            rest /= n;
        }
        Tuple {
            universe: self.universe.clone(),
            atom_indices,
            index,
        }
    }

    /// Set of the tuples at `indices`
    pub fn tuple_set_from_indices(&self, arity: usize, indices: &BTreeSet<usize>) -> Result<TupleSet> {
        let mut set = self.none(arity);
        for &index in indices {
            set.add(self.tuple_from_index(arity, index)?)?;
        }
        Ok(set)
    }
}

/// Lower and upper tuple sets per relation
///
/// A relation holds every tuple of its lower bound and may hold any tuple of
/// its upper bound.
/// Relations are remembered in the order they were first bound, which is
/// also the order in which the translator allocates their variables.
#[derive(Clone, Debug)]
pub struct Bounds {
    universe: Universe,
    order: Vec<Relation>,
    lower_bounds: FxHashMap<Relation, TupleSet>,
    upper_bounds: FxHashMap<Relation, TupleSet>,
}

impl Bounds {
    /// No relation bound yet
    pub fn new(universe: Universe) -> Self {
        Self {
            universe,
            order: Vec::new(),
            lower_bounds: FxHashMap::default(),
            upper_bounds: FxHashMap::default(),
        }
    }

    /// Universe every bound is drawn from
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Shorthand for `self.universe().factory()`
    pub fn factory(&self) -> TupleFactory {
        self.universe.factory()
    }

    /// Bounds `relation` between `lower` and `upper`, replacing earlier bounds
    ///
    /// # Errors
    /// `ArityMismatch` if either set's arity differs from the relation's,
    /// `InvalidBounds` if the sets come from another universe, if lower is
    /// not contained in upper, or if the relation's tuples cannot be indexed.
    pub fn bound(&mut self, relation: &Relation, lower: TupleSet, upper: TupleSet) -> Result<()> {
        let invalid = |reason: &str| RelError::InvalidBounds {
            relation: relation.name().to_string(),
            reason: reason.to_string(),
        };

        if lower.universe() != &self.universe || upper.universe() != &self.universe {
            return Err(invalid("tuple sets must be drawn from the bounds' universe"));
        }
        for set in [&lower, &upper] {
            if set.arity() != relation.arity() {
                return Err(RelError::ArityMismatch {
                    expected: relation.arity(),
                    found: set.arity(),
                });
            }
        }
        if self.universe.capacity(relation.arity()).is_err() {
            return Err(invalid("its tuples overflow the tuple index"));
        }
        if !lower.is_subset(&upper) {
            return Err(invalid("lower bound is not a subset of the upper bound"));
        }

        if !self.upper_bounds.contains_key(relation) {
            self.order.push(relation.clone());
        }
        self.lower_bounds.insert(relation.clone(), lower);
        self.upper_bounds.insert(relation.clone(), upper);
        Ok(())
    }

    /// Bounds `relation` by `upper` with an empty lower bound
    pub fn bound_upper(&mut self, relation: &Relation, upper: TupleSet) -> Result<()> {
        let lower = TupleSet::empty(upper.universe().clone(), upper.arity());
        self.bound(relation, lower, upper)
    }

    /// Fixes the contents of `relation` to `tuples`
    pub fn bound_exactly(&mut self, relation: &Relation, tuples: TupleSet) -> Result<()> {
        self.bound(relation, tuples.clone(), tuples)
    }

    /// Tuples `relation` must hold
    pub fn lower_bound(&self, relation: &Relation) -> Option<&TupleSet> {
        self.lower_bounds.get(relation)
    }

    /// Tuples `relation` may hold
    pub fn upper_bound(&self, relation: &Relation) -> Option<&TupleSet> {
        self.upper_bounds.get(relation)
    }

    /// Whether `relation` has been bound
    pub fn contains(&self, relation: &Relation) -> bool {
        self.upper_bounds.contains_key(relation)
    }

    /// Bound relations in the order they were first bound
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.order.iter()
    }
}

/// Exact contents for a set of relations, as found by a solve
#[derive(Clone, Debug)]
pub struct Instance {
    universe: Universe,
    order: Vec<Relation>,
    relations: FxHashMap<Relation, TupleSet>,
}

impl Instance {
    /// Instance binding no relation
    pub fn new(universe: Universe) -> Self {
        Self {
            universe,
            order: Vec::new(),
            relations: FxHashMap::default(),
        }
    }

    /// Universe the bindings are drawn from
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Binds `relation` to `tuples`, replacing an earlier binding
    pub fn add(&mut self, relation: Relation, tuples: TupleSet) -> Result<()> {
        if tuples.universe() != &self.universe {
            return Err(RelError::InvalidArgument(format!("{relation} bound over another universe")));
        }
        if tuples.arity() != relation.arity() {
            return Err(RelError::ArityMismatch {
                expected: relation.arity(),
                found: tuples.arity(),
            });
        }

        self.insert(relation, tuples);
        Ok(())
    }

    // Callers guarantee universe and arity agree
    pub(crate) fn insert(&mut self, relation: Relation, tuples: TupleSet) {
        if !self.relations.contains_key(&relation) {
            self.order.push(relation.clone());
        }
        self.relations.insert(relation, tuples);
    }

    /// Contents of `relation`
    pub fn tuples(&self, relation: &Relation) -> Option<&TupleSet> {
        self.relations.get(relation)
    }

    /// Bound relations in insertion order
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.order.iter()
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.universe == other.universe && self.order == other.order && self.relations == other.relations
    }
}

impl Eq for Instance {}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.order
            .iter()
            .filter_map(|relation| Some((relation, self.relations.get(relation)?)))
            .try_for_each(|(relation, tuples)| writeln!(f, "{relation} = {tuples}"))
    }
}
