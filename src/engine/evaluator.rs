/*
 * Kodkod -- Copyright (c) 2005-present, Emina Torlak
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in
 * all copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
 * THE SOFTWARE.
 */

//! Evaluation of formulas and expressions against an instance
//!
//! Every relation of the instance is bound exactly, so translation needs no
//! variables and the circuit folds to a constant.

use crate::ast::{Expression, Formula};
use crate::bool::{BoolValue, Options};
use crate::error::{RelError, Result};
use crate::instance::{Bounds, Instance, TupleSet};
use crate::translator::Translator;

/// An evaluator for relational formulas and expressions with
/// respect to a given Instance and Options.
pub struct Evaluator<'a> {
    instance: &'a Instance,
    bounds: Bounds,
    options: Options,
}

impl<'a> Evaluator<'a> {
    /// Constructs a new Evaluator for the given instance, using default Options
    pub fn new(instance: &'a Instance) -> Result<Self> {
        Self::with_options(instance, Options::default())
    }

    /// Constructs a new Evaluator for the given instance and options
    pub fn with_options(instance: &'a Instance, options: Options) -> Result<Self> {
        let mut bounds = Bounds::new(instance.universe().clone());
        for relation in instance.relations() {
            if let Some(tuples) = instance.tuples(relation) {
                bounds.bound_exactly(relation, tuples.clone())?;
            }
        }
        Ok(Self {
            instance,
            bounds,
            options,
        })
    }

    /// Returns the Options object used by this evaluator
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Returns the instance
    pub fn instance(&self) -> &Instance {
        self.instance
    }

    /// Evaluates the specified formula with respect to the instance
    ///
    /// Fails if the formula mentions a relation the instance does not
    /// define, or is not closed.
    pub fn evaluate(&self, formula: &Formula) -> Result<bool> {
        let translation = Translator::translate(formula, &self.bounds, &self.options)?;
        match translation.circuit() {
            BoolValue::Constant(c) => Ok(c.boolean_value()),
            other => Err(RelError::InvalidArgument(format!(
                "formula did not reduce to a constant (label {})",
                other.label()
            ))),
        }
    }

    /// Evaluates the specified expression with respect to the instance
    ///
    /// Returns the set of tuples to which the expression evaluates
    pub fn evaluate_expression(&self, expression: &Expression) -> Result<TupleSet> {
        let matrix = Translator::translate_expression(expression, &self.bounds, &self.options)?;
        let indices = matrix.dense_indices().into_iter().collect();
        self.instance
            .universe()
            .factory()
            .tuple_set_from_indices(expression.arity(), &indices)
    }
}
