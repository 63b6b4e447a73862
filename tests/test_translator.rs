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

//! Satisfiability of small formulas over partially bounded relations

use relcheck::ast::{Decl, Decls, Expression, Formula, Relation, Variable};
use relcheck::bool::Options as BoolOptions;
use relcheck::instance::{Bounds, Universe};
use relcheck::solver::{Options, Solver};
use relcheck::translator::Translator;
use relcheck::{RelError, Result};

struct TranslatorTest {
    bounds: Bounds,
    r1: [Relation; 4],
    r2: [Relation; 4],
}

impl TranslatorTest {
    fn new() -> Result<Self> {
        let atoms: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        let atoms: Vec<&str> = atoms.iter().map(String::as_str).collect();
        let universe = Universe::new(&atoms)?;
        let mut bounds = Bounds::new(universe);
        let factory = bounds.factory();

        let r1 = [
            Relation::unary("r10"),
            Relation::unary("r11"),
            Relation::unary("r12"),
            Relation::unary("r13"),
        ];
        let r2 = [
            Relation::binary("r20"),
            Relation::binary("r21"),
            Relation::binary("r22"),
            Relation::binary("r23"),
        ];

        bounds.bound(&r1[0], factory.none(1), factory.all(1)?)?;
        bounds.bound_upper(&r1[1], factory.tuple_set(&[&["2"], &["3"], &["4"]])?)?;
        bounds.bound_upper(&r1[2], factory.tuple_set(&[&["4"]])?)?;
        bounds.bound_upper(&r1[3], factory.tuple_set(&[&["5"], &["6"], &["7"], &["8"]])?)?;

        bounds.bound(&r2[0], factory.none(2), factory.all(2)?)?;
        // {2..5} x {3..5}
        let r21_upper = factory
            .range(&factory.tuple(&["2"])?, &factory.tuple(&["5"])?)?
            .product(&factory.range(&factory.tuple(&["3"])?, &factory.tuple(&["5"])?)?)?;
        bounds.bound_upper(&r2[1], r21_upper)?;
        bounds.bound_upper(&r2[2], factory.tuple_set(&[&["5", "7"]])?)?;
        // {6..8} x {0..2}
        let r23_upper = factory
            .range(&factory.tuple(&["6"])?, &factory.tuple(&["8"])?)?
            .product(&factory.range(&factory.tuple(&["0"])?, &factory.tuple(&["2"])?)?)?;
        bounds.bound_upper(&r2[3], r23_upper)?;

        Ok(TranslatorTest { bounds, r1, r2 })
    }

    fn r1(&self, i: usize) -> Expression {
        Expression::from(&self.r1[i])
    }

    fn r2(&self, i: usize) -> Expression {
        Expression::from(&self.r2[i])
    }

    fn is_satisfiable(&self, formula: &Formula) -> Result<bool> {
        let solver = Solver::new(Options::default());
        Ok(solver.solve(formula, &self.bounds)?.is_sat())
    }
}

// ============================================================================
// Multiplicity Tests
// ============================================================================

#[test]
fn test_multiplicities_over_open_bounds() -> Result<()> {
    let test = TranslatorTest::new()?;

    for i in 0..4 {
        for formula in [test.r1(i).some(), test.r1(i).one(), test.r1(i).lone(), test.r1(i).no()] {
            assert!(test.is_satisfiable(&formula)?, "{} should be satisfiable", test.r1[i]);
        }
        assert!(test.is_satisfiable(&test.r2(i).some())?);
    }
    Ok(())
}

#[test]
fn test_multiplicity_intersection_empty() -> Result<()> {
    let test = TranslatorTest::new()?;

    // r11 and r13 have disjoint upper bounds
    let intersection = test.r1(1).intersection(test.r1(3))?;
    assert!(test.is_satisfiable(&intersection.clone().no())?);
    assert!(!test.is_satisfiable(&intersection.some())?);
    Ok(())
}

#[test]
fn test_multiplicity_difference_empty() -> Result<()> {
    let test = TranslatorTest::new()?;

    let diff = test.r1(3).difference(test.r1(3))?;
    assert!(test.is_satisfiable(&diff.clone().no())?);
    assert!(!test.is_satisfiable(&diff.some())?);
    Ok(())
}

#[test]
fn test_multiplicity_cardinality_limits() -> Result<()> {
    let test = TranslatorTest::new()?;

    // r12 has a single candidate tuple, so it can never hold two
    let two = test.r1(2).some().and(test.r1(2).lone().not());
    assert!(!test.is_satisfiable(&two)?);

    // r11 + r13 can hold more than one
    let union = test.r1(1).union(test.r1(3))?;
    assert!(test.is_satisfiable(&union.clone().some().and(union.lone().not()))?);
    Ok(())
}

// ============================================================================
// Comparison Tests
// ============================================================================

#[test]
fn test_comparison_subset_reflexive() -> Result<()> {
    let test = TranslatorTest::new()?;

    for i in 0..4 {
        let e = test.r1(i);
        assert!(test.is_satisfiable(&e.clone().in_set(e.clone())?)?);
        assert!(!test.is_satisfiable(&e.clone().in_set(e)?.not())?);
    }
    Ok(())
}

#[test]
fn test_comparison_with_intersection() -> Result<()> {
    let test = TranslatorTest::new()?;

    // some r12 && (r11 & r12 in r12)
    let f = test
        .r1(2)
        .some()
        .and(test.r1(1).intersection(test.r1(2))?.in_set(test.r1(2))?);
    assert!(test.is_satisfiable(&f)?);

    // one r12 && (r11 & r12 = r12)
    let f = test
        .r1(2)
        .one()
        .and(test.r1(1).intersection(test.r1(2))?.equals(test.r1(2))?);
    assert!(test.is_satisfiable(&f)?);
    Ok(())
}

#[test]
fn test_comparison_not_subset() -> Result<()> {
    let test = TranslatorTest::new()?;

    assert!(test.is_satisfiable(&test.r1(3).in_set(test.r1(0))?.not())?);

    // r12 can only hold 4, which r11 may also hold
    assert!(test.is_satisfiable(&test.r1(2).some().and(test.r1(2).in_set(test.r1(1))?))?);
    // ...but r13 never can
    assert!(!test.is_satisfiable(&test.r1(3).some().and(test.r1(3).in_set(test.r1(1))?))?);
    Ok(())
}

#[test]
fn test_comparison_union_subset() -> Result<()> {
    let test = TranslatorTest::new()?;

    let union = Expression::union_all(vec![test.r1(1), test.r1(2), test.r1(3)])?;
    let f = test.r1(0).some().and(union.in_set(test.r1(0))?);
    assert!(test.is_satisfiable(&f)?);
    Ok(())
}

#[test]
fn test_comparison_join_subset() -> Result<()> {
    let test = TranslatorTest::new()?;

    // r21.r13 can only be non-empty through atom 5
    let f = test.r2(1).join(test.r1(3))?.in_set(test.r1(1))?;
    assert!(test.is_satisfiable(&f)?);

    let f = test.r2(1).join(test.r1(3))?.some();
    assert!(test.is_satisfiable(&f)?);
    Ok(())
}

#[test]
fn test_comparison_reflexive_closure() -> Result<()> {
    let test = TranslatorTest::new()?;

    // *r22 in r21 + iden
    let f = test
        .r2(2)
        .reflexive_closure()?
        .in_set(test.r2(1).union(Expression::IDEN)?)?;
    assert!(test.is_satisfiable(&f)?);

    // r22 = {(5,7)} forces (5,7) into the closure, which r21 cannot hold
    let f = test
        .r2(2)
        .some()
        .and(test.r2(2).closure()?.in_set(test.r2(1))?);
    assert!(!test.is_satisfiable(&f)?);
    Ok(())
}

// ============================================================================
// Quantified Formula Tests
// ============================================================================

#[test]
fn test_quantified_forall_and_exists() -> Result<()> {
    let test = TranslatorTest::new()?;
    let v1 = Variable::unary("v1");

    for i in 1..4 {
        let body = Expression::from(&v1).in_set(test.r1(0))?;
        let decls = Decls::from(Decl::one_of(v1.clone(), test.r1(i))?);

        let f = Formula::forall(decls.clone(), body.clone());
        assert!(test.is_satisfiable(&f)?, "all v1: r1{i} | v1 in r10");

        let f = Formula::exists(decls, body).and(test.r1(i).some());
        assert!(test.is_satisfiable(&f)?, "some v1: r1{i} | v1 in r10");
    }
    Ok(())
}

#[test]
fn test_quantified_exists_over_empty_range() -> Result<()> {
    let test = TranslatorTest::new()?;
    let v1 = Variable::unary("v1");

    // no witness can exist once the range is empty
    let decls = Decls::from(Decl::one_of(v1.clone(), test.r1(3))?);
    let f = Formula::exists(decls.clone(), Formula::TRUE).and(test.r1(3).no());
    assert!(!test.is_satisfiable(&f)?);

    // universal claims over an empty range hold vacuously
    let f = Formula::forall(decls, Formula::FALSE).and(test.r1(3).no());
    assert!(test.is_satisfiable(&f)?);
    Ok(())
}

#[test]
fn test_quantified_two_vars() -> Result<()> {
    let test = TranslatorTest::new()?;
    let v1 = Variable::unary("v1");
    let v2 = Variable::unary("v2");

    // all v1: r12, v2: r11 | v1->v2 in r21
    let decls = Decls::from(Decl::one_of(v1.clone(), test.r1(2))?).and(Decl::one_of(v2.clone(), test.r1(1))?);
    let body = Expression::from(&v1)
        .product(Expression::from(&v2))?
        .in_set(test.r2(1))?;
    let f = Formula::forall(decls.clone(), body.clone())
        .and(test.r1(1).some())
        .and(test.r1(2).some());
    assert!(test.is_satisfiable(&f)?);

    // (4,2) is outside r21, so r11 may not hold 2 while r12 holds 4
    let solution = Solver::new(Options::default()).solve(&f, &test.bounds)?;
    let instance = solution.instance().ok_or_else(|| RelError::InvalidArgument("unsat".into()))?;
    let two = test.bounds.factory().tuple(&["2"])?;
    assert!(!instance.tuples(&test.r1[1]).is_some_and(|t| t.contains(&two)));
    Ok(())
}

#[test]
fn test_quantified_with_join() -> Result<()> {
    let test = TranslatorTest::new()?;
    let v1 = Variable::unary("v1");

    // all v1: r13 | some v1.~r21
    let decls = Decls::from(Decl::one_of(v1.clone(), test.r1(3))?);
    let body = Expression::from(&v1).join(test.r2(1).transpose()?)?.some();
    let f = Formula::forall(decls, body);
    assert!(test.is_satisfiable(&f)?);
    Ok(())
}

#[test]
fn test_quantified_with_closure() -> Result<()> {
    let test = TranslatorTest::new()?;
    let v1 = Variable::unary("v1");

    // all v1: r13 | some v1.^r23
    let decls = Decls::from(Decl::one_of(v1.clone(), test.r1(3))?);
    let body = Expression::from(&v1).join(test.r2(3).closure()?)?.some();
    assert!(test.is_satisfiable(&Formula::forall(decls, body))?);
    Ok(())
}

#[test]
fn test_higher_order_declaration_is_rejected() -> Result<()> {
    let test = TranslatorTest::new()?;
    let s = Variable::unary("s");

    let decls = Decls::from(Decl::set_of(s.clone(), test.r1(0))?);
    let f = Formula::exists(decls, Expression::from(&s).some());
    let solver = Solver::new(Options::default());
    assert!(matches!(solver.solve(&f, &test.bounds), Err(RelError::HigherOrder(_))));
    Ok(())
}

#[test]
fn test_free_variable_is_rejected() -> Result<()> {
    let test = TranslatorTest::new()?;
    let v = Variable::unary("v");

    let f = Expression::from(&v).in_set(test.r1(0))?;
    assert!(!f.is_closed());
    let solver = Solver::new(Options::default());
    assert!(matches!(solver.solve(&f, &test.bounds), Err(RelError::UnboundVariable(_))));
    Ok(())
}

// ============================================================================
// IFF Tests
// ============================================================================

#[test]
fn test_iff() -> Result<()> {
    let test = TranslatorTest::new()?;

    let equivalent = test
        .r1(1)
        .in_set(test.r1(2))?
        .iff(test.r1(2).in_set(test.r1(1))?);

    assert!(test.is_satisfiable(&test.r1(1).some().and(equivalent.clone()))?);

    // with r12 empty, r12 in r11 holds, so r11 in r12 must too
    let f = test
        .r1(1)
        .some()
        .and(test.r1(2).no())
        .and(equivalent);
    assert!(!test.is_satisfiable(&f)?);
    Ok(())
}

// ============================================================================
// N-ary Tests
// ============================================================================

#[test]
fn test_nary_union() -> Result<()> {
    let test = TranslatorTest::new()?;

    let binary = test.r1(0).union(test.r1(1))?.union(test.r1(2))?.union(test.r1(3))?;
    let nary = Expression::union_all(vec![test.r1(0), test.r1(1), test.r1(2), test.r1(3)])?;

    assert!(!test.is_satisfiable(&binary.equals(nary)?.not())?);
    Ok(())
}

#[test]
fn test_nary_connectives() -> Result<()> {
    let test = TranslatorTest::new()?;
    let parts: Vec<Formula> = (0..4).map(|i| test.r1(i).some()).collect();

    let binary_and = parts[1..]
        .iter()
        .cloned()
        .fold(parts[0].clone(), Formula::and);
    let binary_or = parts[1..]
        .iter()
        .cloned()
        .fold(parts[0].clone(), Formula::or);

    assert!(!test.is_satisfiable(&binary_and.iff(Formula::and_all(parts.clone())).not())?);
    assert!(!test.is_satisfiable(&binary_or.iff(Formula::or_all(parts)).not())?);
    Ok(())
}

// ============================================================================
// Translation
// ============================================================================

#[test]
fn test_translation_allocates_one_variable_per_open_tuple() -> Result<()> {
    let test = TranslatorTest::new()?;
    let translation = Translator::translate(&test.r1(0).some(), &test.bounds, &BoolOptions::default())?;

    // 10 + 3 + 1 + 4 unary, 100 + 12 + 1 + 9 binary
    assert_eq!(translation.num_primary_variables(), 18 + 122);
    Ok(())
}

#[test]
fn test_translation_is_idempotent() -> Result<()> {
    let test = TranslatorTest::new()?;
    let formula = test.r2(1).join(test.r1(1))?.in_set(test.r1(1))?;

    let first = Translator::translate(&formula, &test.bounds, &BoolOptions::default())?;
    let second = Translator::translate(&formula, &test.bounds, &BoolOptions::default())?;

    assert_eq!(first.circuit(), second.circuit());
    let shape = |t: &relcheck::translator::Translation<'_>| {
        t.variables()
            .allocations()
            .iter()
            .map(|a| (a.relation.clone(), a.labels.clone(), a.tuples.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(shape(&first), shape(&second));
    Ok(())
}
