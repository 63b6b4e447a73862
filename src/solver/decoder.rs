//! Decoding of SAT models into instances

use crate::bool::VariableAllocator;
use crate::engine::SatOutcome;
use crate::instance::{Bounds, Instance};

/// Rebuilds the instance described by a satisfying assignment
///
/// Each bounded relation receives its lower bound plus every tuple whose
/// primary variable is true in `model`. Relations appear in bounds order.
pub fn decode(bounds: &Bounds, variables: &VariableAllocator, model: &SatOutcome) -> Instance {
    let mut instance = Instance::new(bounds.universe().clone());
    for relation in bounds.relations() {
        let Some(lower) = bounds.lower_bound(relation) else {
            continue;
        };
        instance.insert(relation.clone(), lower.clone());
    }

    for allocation in variables.allocations() {
        let Some(lower) = bounds.lower_bound(&allocation.relation) else {
            continue;
        };
        let mut tuples = lower.clone();
        for (label, &tuple) in allocation.labels.clone().zip(&allocation.tuples) {
            if model.value_of(label) {
                tuples.insert_index(tuple);
            }
        }
        instance.insert(allocation.relation.clone(), tuples);
    }
    instance
}
