use relcheck::ast::{Decl, Decls, Expression, Formula, Relation, Variable};
use relcheck::command::{render_reports, Command, Evaluator, Model, SourceLocation};
use relcheck::instance::{Bounds, Universe};
use relcheck::solver::Options;

/// Two directories and three files, rooted at d0
struct ToyFilesystem {
    file: Relation,
    dir: Relation,
    root: Relation,
    contents: Relation,
}

impl ToyFilesystem {
    fn new() -> Self {
        Self {
            file: Relation::unary("File"),
            dir: Relation::unary("Dir"),
            root: Relation::unary("Root"),
            contents: Relation::binary("contents"),
        }
    }

    fn constraints(&self) -> relcheck::Result<Formula> {
        let file = Expression::from(&self.file);
        let dir = Expression::from(&self.dir);
        let root = Expression::from(&self.root);
        let contents = Expression::from(&self.contents);

        // contents in Dir -> (Dir + File)
        let typed = contents
            .clone()
            .in_set(dir.clone().product(dir.clone().union(file.clone())?)?)?;

        // all d: Dir | d !in d.^contents
        let d = Variable::unary("d");
        let acyclic = Formula::forall(
            Decls::from(Decl::one_of(d.clone(), dir.clone())?),
            Expression::from(&d)
                .in_set(Expression::from(&d).join(contents.clone().closure()?)?)?
                .not(),
        );

        let rooted = root.clone().in_set(dir.clone())?;
        // File + Dir in Root.*contents
        let reachable = file.union(dir)?.in_set(root.join(contents.reflexive_closure()?)?)?;

        Ok(Formula::and_all(vec![typed, acyclic, rooted, reachable]))
    }

    fn bounds(&self) -> relcheck::Result<Bounds> {
        let universe = Universe::new(&["d0", "d1", "f0", "f1", "f2"])?;
        let factory = universe.factory();
        let mut bounds = Bounds::new(universe);

        let dirs = factory.tuple_set(&[&["d0"], &["d1"]])?;
        bounds.bound_exactly(&self.root, factory.set_of("d0")?)?;
        bounds.bound_upper(&self.dir, dirs.clone())?;
        bounds.bound_upper(&self.file, factory.tuple_set(&[&["f0"], &["f1"], &["f2"]])?)?;
        bounds.bound(
            &self.contents,
            factory.tuple_set(&[&["d0", "d1"]])?,
            dirs.product(&factory.all(1)?)?,
        )?;
        Ok(bounds)
    }

    fn model(&self) -> relcheck::Result<Model> {
        let mut model = Model::new(self.bounds()?);
        model.fact("constraints", self.constraints()?)?;

        let root_contents = Expression::from(&self.root).join(Expression::from(&self.contents))?;
        model.assertion("rootNonEmpty", root_contents.clone().some())?;
        model.assertion("filesInRoot", Expression::from(&self.file).in_set(root_contents)?)?;

        let at = |line| SourceLocation::new("toy_filesystem.als", line, 1);
        model.command(Command::run("show", at(20)));
        model.command(Command::check("rootNonEmpty", "rootNonEmpty", at(21)));
        model.command(Command::check("filesInRoot", "filesInRoot", at(22)));
        Ok(model)
    }
}

fn main() -> relcheck::Result<()> {
    env_logger::init();

    let model = ToyFilesystem::new().model()?;
    println!("=== ToyFilesystem ===\n");

    let reports = Evaluator::new(Options::default()).evaluate(&model);
    for report in &reports {
        if let Some(instance) = report.verdict().and_then(|v| v.instance()) {
            println!("{}:\n{instance}", report.command());
        }
    }

    let (success, errors) = render_reports(&reports);
    print!("{success}");
    eprint!("{errors}");
    Ok(())
}
