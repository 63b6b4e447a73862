//! Pigeonhole principle: n+1 pigeons cannot fit in n holes

use relcheck::ast::{Decl, Decls, Expression, Formula, Relation, Variable};
use relcheck::engine::SatBackend;
use relcheck::instance::{Bounds, Universe};
use relcheck::solver::{Options, Solver};
use relcheck::Result;

struct Pigeonhole {
    pigeon: Relation,
    hole: Relation,
    hole_relation: Relation,
}

impl Pigeonhole {
    fn new() -> Self {
        Self {
            pigeon: Relation::unary("Pigeon"),
            hole: Relation::unary("Hole"),
            hole_relation: Relation::binary("hole"),
        }
    }

    /// Every pigeon has exactly one hole: all p: Pigeon | one p.hole
    fn declarations(&self) -> Result<Formula> {
        let p = Variable::unary("p");
        let body = Expression::from(&p).join(Expression::from(&self.hole_relation))?.one();
        let decls = Decls::from(Decl::one_of(p, Expression::from(&self.pigeon))?);
        Ok(Formula::forall(decls, body))
    }

    /// all p1, p2: Pigeon | p1 != p2 => no p1.hole & p2.hole
    fn pigeon_per_hole(&self) -> Result<Formula> {
        let p1 = Variable::unary("p1");
        let p2 = Variable::unary("p2");
        let hole = Expression::from(&self.hole_relation);

        let p1_hole = Expression::from(&p1).join(hole.clone())?;
        let p2_hole = Expression::from(&p2).join(hole)?;
        let body = Expression::from(&p1)
            .ne(Expression::from(&p2))?
            .implies(p1_hole.intersection(p2_hole)?.no());

        let decls = Decls::from(Decl::one_of(p1, Expression::from(&self.pigeon))?)
            .and(Decl::one_of(p2, Expression::from(&self.pigeon))?);
        Ok(Formula::forall(decls, body))
    }

    fn formula(&self) -> Result<Formula> {
        Ok(self.declarations()?.and(self.pigeon_per_hole()?))
    }

    fn bounds(&self, num_pigeons: usize, num_holes: usize) -> Result<Bounds> {
        let atoms: Vec<String> = (0..num_pigeons)
            .map(|i| format!("Pigeon{i}"))
            .chain((0..num_holes).map(|i| format!("Hole{i}")))
            .collect();
        let atoms: Vec<&str> = atoms.iter().map(String::as_str).collect();
        let universe = Universe::new(&atoms)?;
        let factory = universe.factory();
        let mut bounds = Bounds::new(universe);

        let pigeons = factory.range(
            &factory.tuple(&[atoms[0]])?,
            &factory.tuple(&[atoms[num_pigeons - 1]])?,
        )?;
        let holes = factory.range(
            &factory.tuple(&[atoms[num_pigeons]])?,
            &factory.tuple(&[atoms[num_pigeons + num_holes - 1]])?,
        )?;

        bounds.bound_upper(&self.hole_relation, pigeons.product(&holes)?)?;
        bounds.bound_exactly(&self.pigeon, pigeons)?;
        bounds.bound_exactly(&self.hole, holes)?;
        Ok(bounds)
    }
}

fn solve(pigeons: usize, holes: usize, backend: SatBackend) -> Result<bool> {
    let model = Pigeonhole::new();
    let options = Options {
        backend,
        ..Options::default()
    };
    let solution = Solver::new(options).solve(&model.formula()?, &model.bounds(pigeons, holes)?)?;
    Ok(solution.is_sat())
}

#[test]
fn test_pigeonhole_3_pigeons_3_holes_sat() -> Result<()> {
    assert!(solve(3, 3, SatBackend::Batsat)?, "3 pigeons in 3 holes should be SAT");
    assert!(solve(3, 3, SatBackend::Dpll)?);
    Ok(())
}

#[test]
fn test_pigeonhole_4_pigeons_3_holes_unsat() -> Result<()> {
    assert!(!solve(4, 3, SatBackend::Batsat)?, "4 pigeons in 3 holes should be UNSAT");
    assert!(!solve(4, 3, SatBackend::Dpll)?);
    Ok(())
}

#[test]
fn test_pigeonhole_7_pigeons_6_holes_unsat() -> Result<()> {
    assert!(!solve(7, 6, SatBackend::Batsat)?);
    Ok(())
}

#[test]
fn test_pigeonhole_decoded_assignment_is_injective() -> Result<()> {
    let model = Pigeonhole::new();
    let bounds = model.bounds(4, 5)?;
    let solution = Solver::new(Options::default()).solve(&model.formula()?, &bounds)?;
    let instance = solution.instance().expect("4 pigeons fit in 5 holes");

    let hole = instance.tuples(&model.hole_relation).expect("hole is bounded");
    assert_eq!(hole.size(), 4);
    let mut targets: Vec<_> = hole.iter().filter_map(|t| t.atom(1)).collect();
    targets.sort_unstable();
    targets.dedup();
    assert_eq!(targets.len(), 4);
    assert!(instance.tuples(&model.hole).is_some_and(|h| h.size() == 5));
    Ok(())
}
