//! File system models answered through run and check commands

use relcheck::ast::{Decl, Decls, Expression, Formula, Relation, Variable};
use relcheck::command::{Command, CommandState, Evaluator, Model, SourceLocation, Verdict};
use relcheck::engine::evaluator::Evaluator as InstanceEvaluator;
use relcheck::engine::SatBackend;
use relcheck::instance::{Bounds, Universe};
use relcheck::solver::Options;
use relcheck::Result;

/// Two directories and three files, rooted at d0
struct ToyFileSystem {
    file: Relation,
    dir: Relation,
    root: Relation,
    contents: Relation,
}

impl ToyFileSystem {
    fn new() -> Self {
        Self {
            file: Relation::unary("File"),
            dir: Relation::unary("Dir"),
            root: Relation::unary("Root"),
            contents: Relation::binary("contents"),
        }
    }

    fn constraints(&self) -> Result<Formula> {
        let file = Expression::from(&self.file);
        let dir = Expression::from(&self.dir);
        let root = Expression::from(&self.root);
        let contents = Expression::from(&self.contents);

        let typed = contents
            .clone()
            .in_set(dir.clone().product(dir.clone().union(file.clone())?)?)?;

        let d = Variable::unary("d");
        let not_own_ancestor = Expression::from(&d)
            .in_set(Expression::from(&d).join(contents.clone().closure()?)?)?
            .not();
        let acyclic = Formula::forall(Decls::from(Decl::one_of(d, dir.clone())?), not_own_ancestor);

        let rooted = root.clone().in_set(dir.clone())?;
        let reachable = file.union(dir)?.in_set(root.join(contents.reflexive_closure()?)?)?;

        Ok(Formula::and_all(vec![typed, acyclic, rooted, reachable]))
    }

    fn bounds(&self) -> Result<Bounds> {
        let universe = Universe::new(&["d0", "d1", "f0", "f1", "f2"])?;
        let factory = universe.factory();
        let mut bounds = Bounds::new(universe);
        bounds.bound_exactly(&self.root, factory.set_of("d0")?)?;
        bounds.bound_upper(&self.dir, factory.tuple_set(&[&["d0"], &["d1"]])?)?;
        bounds.bound_upper(&self.file, factory.tuple_set(&[&["f0"], &["f1"], &["f2"]])?)?;
        let dirs = factory.tuple_set(&[&["d0"], &["d1"]])?;
        bounds.bound(
            &self.contents,
            factory.tuple_set(&[&["d0", "d1"]])?,
            dirs.product(&factory.all(1)?)?,
        )?;
        Ok(bounds)
    }

    /// Dir and File fixed exactly, `contents` free within Dir -> (Dir + File)
    fn exact_bounds(&self) -> Result<Bounds> {
        let universe = Universe::new(&["d0", "d1", "f0", "f1", "f2"])?;
        let factory = universe.factory();
        let mut bounds = Bounds::new(universe);
        let dirs = factory.tuple_set(&[&["d0"], &["d1"]])?;
        let files = factory.tuple_set(&[&["f0"], &["f1"], &["f2"]])?;
        bounds.bound_exactly(&self.root, factory.set_of("d0")?)?;
        bounds.bound_exactly(&self.dir, dirs.clone())?;
        bounds.bound_exactly(&self.file, files.clone())?;
        bounds.bound_upper(&self.contents, dirs.product(&dirs.union(&files)?)?)?;
        Ok(bounds)
    }

    fn model(&self) -> Result<Model> {
        let mut model = Model::new(self.bounds()?);
        model.fact("constraints", self.constraints()?)?;

        let root_contents = Expression::from(&self.root).join(Expression::from(&self.contents))?;
        model.assertion("rootNonEmpty", root_contents.clone().some())?;
        model.assertion("filesInRoot", Expression::from(&self.file).in_set(root_contents)?)?;

        let at = |line| SourceLocation::new("toy.als", line, 1);
        model.command(Command::run("show", at(20)));
        model.command(Command::check("rootNonEmpty", "rootNonEmpty", at(21)));
        model.command(Command::check("filesInRoot", "filesInRoot", at(22)));
        Ok(model)
    }
}

#[test_log::test]
fn toy_file_system_is_consistent() -> Result<()> {
    let toy = ToyFileSystem::new();
    let model = toy.model()?;
    let report = Evaluator::new(Options::default()).evaluate_command(&model, &model.commands()[0]);

    let Some(Verdict::ConsistentFound(instance)) = report.verdict() else {
        panic!("expected an instance, got {report}");
    };
    assert_eq!(report.to_string(), "Consistent: Run show");

    let factory = model.bounds().factory();
    let contents = instance.tuples(&toy.contents).expect("contents is bounded");
    assert!(contents.contains(&factory.tuple(&["d0", "d1"])?));
    assert_eq!(instance.tuples(&toy.root), Some(&factory.set_of("d0")?));

    // every file sits in some directory
    for f in ["f0", "f1", "f2"] {
        let is_file = instance.tuples(&toy.file).is_some_and(|t| t.contains(&factory.tuple(&[f]).unwrap()));
        let placed = contents.iter().any(|t| t.atom(1) == Some(f));
        assert!(!is_file || placed, "{f} is a file but has no directory");
    }

    assert!(InstanceEvaluator::new(instance)?.evaluate(&toy.constraints()?)?);
    Ok(())
}

#[test_log::test]
fn exactly_bounded_file_system_is_consistent() -> Result<()> {
    let toy = ToyFileSystem::new();
    let o = Variable::unary("o");
    let unique_parent = Formula::forall(
        Decls::from(Decl::one_of(o.clone(), Expression::from(&toy.file))?),
        Expression::from(&toy.contents).join(Expression::from(&o))?.one(),
    );

    let mut model = Model::new(toy.exact_bounds()?);
    model.fact("constraints", toy.constraints()?)?;
    model.fact("uniqueParent", unique_parent)?;
    let at = |line| SourceLocation::new("toy.als", line, 1);
    model.command(Command::run("show", at(30)).with_facts(["constraints"]));
    model.command(Command::run("tree", at(31)));

    for backend in [SatBackend::Batsat, SatBackend::Dpll] {
        for symmetry_breaking in [0, 20] {
            let options = Options {
                backend,
                symmetry_breaking,
                ..Options::default()
            };
            let reports = Evaluator::new(options).evaluate(&model);
            for report in &reports {
                let Some(Verdict::ConsistentFound(instance)) = report.verdict() else {
                    panic!("{} sb={symmetry_breaking}: expected an instance, got {report}", backend.name());
                };
                let evaluator = InstanceEvaluator::new(instance)?;
                let contents = Expression::from(&toy.contents);

                // no directory is its own ancestor
                let ancestry = evaluator.evaluate_expression(&contents.clone().closure()?)?;
                assert!(ancestry.iter().all(|t| t.atom(0) != t.atom(1)), "{report}: cycle in {ancestry}");

                // d0 reaches every file
                let reach = Expression::from(&toy.root).join(contents.reflexive_closure()?)?;
                let reached = evaluator.evaluate_expression(&reach)?;
                for f in ["f0", "f1", "f2"] {
                    assert!(reached.iter().any(|t| t.atom(0) == Some(f)), "{report}: {f} unreachable");
                }
            }

            let Some(tree) = reports[1].verdict().and_then(Verdict::instance) else {
                panic!("{}: tree has no instance", backend.name());
            };
            let contents = tree.tuples(&toy.contents).expect("contents is bounded");
            for f in ["f0", "f1", "f2"] {
                let parents = contents.iter().filter(|t| t.atom(1) == Some(f)).count();
                assert_eq!(parents, 1, "{f} in {contents}");
            }
        }
    }
    Ok(())
}

#[test_log::test]
fn toy_file_system_checks() -> Result<()> {
    let toy = ToyFileSystem::new();
    let model = toy.model()?;
    let reports = Evaluator::new(Options::default()).evaluate(&model);
    assert_eq!(reports.len(), 3);

    assert!(matches!(reports[1].verdict(), Some(Verdict::AssertionHeld)));
    assert_eq!(reports[1].to_string(), "Maybe valid: Check rootNonEmpty");

    let Some(Verdict::AssertionViolated(cex)) = reports[2].verdict() else {
        panic!("expected a counterexample, got {}", reports[2]);
    };
    assert_eq!(reports[2].final_state(), CommandState::AssertionViolated);
    assert_eq!(
        reports[2].to_string(),
        "Assertion error in toy.als at line 22 column 1:\nCounter-example of Check filesInRoot found."
    );

    // the counterexample satisfies the facts and breaks the assertion
    let evaluator = InstanceEvaluator::new(cex)?;
    assert!(evaluator.evaluate(&toy.constraints()?)?);
    let assertion = model.get_assertion("filesInRoot").expect("declared").clone();
    assert!(!evaluator.evaluate(&assertion)?);
    Ok(())
}

#[test]
fn toy_file_system_backends_agree() -> Result<()> {
    let toy = ToyFileSystem::new();
    let model = toy.model()?;

    let verdicts = |backend| {
        let options = Options {
            backend,
            ..Options::default()
        };
        Evaluator::new(options)
            .evaluate(&model)
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
    };
    assert_eq!(verdicts(SatBackend::Batsat), verdicts(SatBackend::Dpll));
    Ok(())
}

/// Objects, names and directory entries with parent links
struct FileSystem {
    obj: Relation,
    name: Relation,
    file: Relation,
    dir: Relation,
    root: Relation,
    cur: Relation,
    dir_entry: Relation,
    entries: Relation,
    parent: Relation,
    entry_name: Relation,
    contents: Relation,
}

impl FileSystem {
    fn new() -> Self {
        Self {
            obj: Relation::unary("Object"),
            name: Relation::unary("Name"),
            file: Relation::unary("File"),
            dir: Relation::unary("Dir"),
            root: Relation::unary("Root"),
            cur: Relation::unary("Cur"),
            dir_entry: Relation::unary("DirEntry"),
            entries: Relation::binary("entries"),
            parent: Relation::binary("parent"),
            entry_name: Relation::binary("name"),
            contents: Relation::binary("contents"),
        }
    }

    fn decls(&self) -> Result<Formula> {
        let e = |r: &Relation| Expression::from(r);
        Ok(Formula::and_all(vec![
            // File and Dir partition Object
            e(&self.obj).equals(e(&self.file).union(e(&self.dir))?)?,
            e(&self.file).intersection(e(&self.dir))?.no(),
            // Root and Cur are disjoint directories
            e(&self.root).in_set(e(&self.dir))?,
            e(&self.cur).in_set(e(&self.dir))?,
            e(&self.root).intersection(e(&self.cur))?.no(),
            e(&self.entries).in_set(e(&self.dir).product(e(&self.dir_entry))?)?,
            self.parent.partial_function(e(&self.dir), e(&self.dir))?,
            self.entry_name.function(e(&self.dir_entry), e(&self.name))?,
            self.contents.function(e(&self.dir_entry), e(&self.obj))?,
        ]))
    }

    fn facts(&self) -> Result<Formula> {
        let e = |r: &Relation| Expression::from(r);
        let v = |v: &Variable| Expression::from(v);

        // every file is in some directory
        let this = Variable::unary("this");
        let d = Variable::unary("d");
        let in_some_dir = Formula::exists(
            Decls::from(Decl::one_of(d.clone(), e(&self.dir))?),
            v(&this).in_set(v(&d).join(e(&self.entries))?.join(e(&self.contents))?)?,
        );
        let files = Formula::forall(Decls::from(Decl::one_of(this, e(&self.file))?), in_some_dir);

        // directory invariants
        let this = Variable::unary("this");
        let e1 = Variable::unary("e1");
        let e2 = Variable::unary("e2");
        let parent_of = v(&this)
            .join(e(&self.parent))?
            .equals(v(&this).join(e(&self.contents).transpose()?)?.join(e(&self.entries).transpose()?)?)?;
        let own_entries = v(&this).join(e(&self.entries))?;
        let unique_names = Formula::forall(
            Decls::from(Decl::one_of(e1.clone(), own_entries.clone())?).and(Decl::one_of(e2.clone(), own_entries)?),
            v(&e1)
                .join(e(&self.entry_name))?
                .equals(v(&e2).join(e(&self.entry_name))?)?
                .implies(v(&e1).equals(v(&e2))?),
        );
        let ancestors = v(&this).join(e(&self.parent).closure()?)?;
        let not_own_ancestor = v(&this).in_set(ancestors.clone())?.not();
        let under_root = v(&this).equals(e(&self.root))?.not().implies(e(&self.root).in_set(ancestors)?);
        let dirs = Formula::forall(
            Decls::from(Decl::one_of(this, e(&self.dir))?),
            Formula::and_all(vec![parent_of, unique_names, not_own_ancestor, under_root]),
        );

        let root_has_no_parent = e(&self.root).join(e(&self.parent))?.no();

        // each entry belongs to exactly one directory
        let entry = Variable::unary("this");
        let one_owner = Formula::forall(
            Decls::from(Decl::one_of(entry.clone(), e(&self.dir_entry))?),
            v(&entry).join(e(&self.entries).transpose()?)?.one(),
        );

        // all directories besides root have one parent
        let one_parent = Formula::forall(
            Decls::from(Decl::one_of(d.clone(), e(&self.dir).difference(e(&self.root))?)?),
            v(&d).join(e(&self.parent))?.one(),
        );

        Ok(Formula::and_all(vec![files, dirs, root_has_no_parent, one_owner, one_parent]))
    }

    /// all o: Dir | lone o.~contents
    fn no_dir_aliases(&self) -> Result<Formula> {
        let o = Variable::unary("o");
        Ok(Formula::forall(
            Decls::from(Decl::one_of(o.clone(), Expression::from(&self.dir))?),
            Expression::from(&o)
                .join(Expression::from(&self.contents).transpose()?)?
                .lone(),
        ))
    }

    fn bounds(&self, scope: usize) -> Result<Bounds> {
        let atoms: Vec<String> = ["Object", "Name", "DirEntry"]
            .iter()
            .flat_map(|prefix| (0..scope).map(move |i| format!("{prefix}{i}")))
            .collect();
        let atoms: Vec<&str> = atoms.iter().map(String::as_str).collect();
        let universe = Universe::new(&atoms)?;
        let f = universe.factory();
        let mut bounds = Bounds::new(universe);

        let max = scope - 1;
        let range = |prefix: &str| -> Result<_> {
            let first = format!("{prefix}0");
            let last = format!("{prefix}{max}");
            f.range(&f.tuple(&[first.as_str()])?, &f.tuple(&[last.as_str()])?)
        };
        let objects = range("Object")?;
        let names = range("Name")?;
        let entries = range("DirEntry")?;

        bounds.bound_upper(&self.obj, objects.clone())?;
        bounds.bound_exactly(&self.root, f.set_of("Object0")?)?;
        bounds.bound_upper(&self.cur, objects.clone())?;
        bounds.bound_upper(&self.file, objects.clone())?;
        bounds.bound_upper(&self.dir, objects.clone())?;
        bounds.bound_upper(&self.name, names.clone())?;
        bounds.bound_upper(&self.dir_entry, entries.clone())?;

        bounds.bound_upper(&self.entries, objects.product(&entries)?)?;
        bounds.bound_upper(&self.parent, objects.product(&objects)?)?;
        bounds.bound_upper(&self.entry_name, entries.product(&names)?)?;
        bounds.bound_upper(&self.contents, entries.product(&objects)?)?;
        Ok(bounds)
    }

    fn model(&self, scope: usize) -> Result<Model> {
        let mut model = Model::new(self.bounds(scope)?);
        model.fact("decls", self.decls()?)?;
        model.fact("facts", self.facts()?)?;
        model.assertion("noDirAliases", self.no_dir_aliases()?)?;
        let at = |line| SourceLocation::new("filesystem.als", line, 1);
        model.command(Command::run("show", at(40)));
        model.command(Command::check("noDirAliases", "noDirAliases", at(41)));
        Ok(model)
    }
}

#[test_log::test]
fn file_system_has_instances() -> Result<()> {
    let fs = FileSystem::new();
    let model = fs.model(3)?;
    let report = Evaluator::new(Options::default()).evaluate_command(&model, &model.commands()[0]);

    let Some(Verdict::ConsistentFound(instance)) = report.verdict() else {
        panic!("expected an instance, got {report}");
    };
    let root = model.bounds().factory().set_of("Object0")?;
    assert_eq!(instance.tuples(&fs.root), Some(&root));
    assert!(instance.tuples(&fs.dir).is_some_and(|d| root.is_subset(d)));
    assert!(instance
        .tuples(&fs.parent)
        .is_some_and(|p| p.iter().all(|t| t.atom(0) != Some("Object0"))));
    Ok(())
}

#[test_log::test]
fn file_system_directory_aliases() -> Result<()> {
    let fs = FileSystem::new();
    let model = fs.model(3)?;
    let reports = Evaluator::new(Options::default()).evaluate_parallel(&model);

    // two entries of one directory may name the same subdirectory
    let Some(Verdict::AssertionViolated(cex)) = reports[1].verdict() else {
        panic!("expected a counterexample, got {}", reports[1]);
    };
    let evaluator = InstanceEvaluator::new(cex)?;
    assert!(evaluator.evaluate(&fs.decls()?.and(fs.facts()?))?);
    assert!(!evaluator.evaluate(&fs.no_dir_aliases()?)?);

    let stats = reports[1].statistics().expect("solved");
    assert!(stats.primary_variables() > 0);
    assert!(stats.num_clauses() > 0);
    Ok(())
}

#[test]
fn file_system_without_second_entry_has_no_aliases() -> Result<()> {
    // a single directory entry cannot alias anything
    let fs = FileSystem::new();
    let mut bounds = fs.bounds(3)?;
    let f = bounds.factory();
    bounds.bound_upper(&fs.dir_entry, f.set_of("DirEntry0")?)?;

    let mut model = fs.model(3)?;
    model.command(
        Command::check("noDirAliases", "noDirAliases", SourceLocation::new("filesystem.als", 42, 1))
            .with_bounds(bounds),
    );
    let reports = Evaluator::new(Options::default()).evaluate(&model);
    assert!(matches!(reports[2].verdict(), Some(Verdict::AssertionHeld)));
    Ok(())
}
