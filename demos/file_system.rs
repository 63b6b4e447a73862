use relcheck::ast::{Decl, Decls, Expression, Formula, Relation, Variable};
use relcheck::command::{render_reports, Command, Evaluator, Model, SourceLocation};
use relcheck::engine::SatBackend;
use relcheck::instance::{Bounds, Universe};
use relcheck::solver::Options;

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

    /// Signature and field declarations
    fn decls(&self) -> relcheck::Result<Formula> {
        let e = |r: &Relation| Expression::from(r);
        Ok(Formula::and_all(vec![
            e(&self.obj).equals(e(&self.file).union(e(&self.dir))?)?,
            e(&self.file).intersection(e(&self.dir))?.no(),
            e(&self.root).in_set(e(&self.dir))?,
            e(&self.cur).in_set(e(&self.dir))?,
            e(&self.root).intersection(e(&self.cur))?.no(),
            e(&self.entries).in_set(e(&self.dir).product(e(&self.dir_entry))?)?,
            self.parent.partial_function(e(&self.dir), e(&self.dir))?,
            self.entry_name.function(e(&self.dir_entry), e(&self.name))?,
            self.contents.function(e(&self.dir_entry), e(&self.obj))?,
        ]))
    }

    fn facts(&self) -> relcheck::Result<Formula> {
        let e = |r: &Relation| Expression::from(r);
        let v = |v: &Variable| Expression::from(v);

        // all this: File | some d: Dir | this in d.entries.contents
        let this = Variable::unary("this");
        let d = Variable::unary("d");
        let files = Formula::forall(
            Decls::from(Decl::one_of(this.clone(), e(&self.file))?),
            Formula::exists(
                Decls::from(Decl::one_of(d.clone(), e(&self.dir))?),
                v(&this).in_set(v(&d).join(e(&self.entries))?.join(e(&self.contents))?)?,
            ),
        );

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

        let entry = Variable::unary("this");
        let one_owner = Formula::forall(
            Decls::from(Decl::one_of(entry.clone(), e(&self.dir_entry))?),
            v(&entry).join(e(&self.entries).transpose()?)?.one(),
        );

        let one_parent = Formula::forall(
            Decls::from(Decl::one_of(d.clone(), e(&self.dir).difference(e(&self.root))?)?),
            v(&d).join(e(&self.parent))?.one(),
        );

        Ok(Formula::and_all(vec![files, dirs, root_has_no_parent, one_owner, one_parent]))
    }

    /// all o: Dir | lone o.~contents
    fn no_dir_aliases(&self) -> relcheck::Result<Formula> {
        let o = Variable::unary("o");
        Ok(Formula::forall(
            Decls::from(Decl::one_of(o.clone(), Expression::from(&self.dir))?),
            Expression::from(&o)
                .join(Expression::from(&self.contents).transpose()?)?
                .lone(),
        ))
    }

    fn bounds(&self, scope: usize) -> relcheck::Result<Bounds> {
        let atoms: Vec<String> = ["Object", "Name", "DirEntry"]
            .iter()
            .flat_map(|prefix| (0..scope).map(move |i| format!("{prefix}{i}")))
            .collect();
        let atoms: Vec<&str> = atoms.iter().map(String::as_str).collect();
        let universe = Universe::new(&atoms)?;
        let f = universe.factory();
        let mut bounds = Bounds::new(universe);

        let last = scope - 1;
        let range = |prefix: &str| -> relcheck::Result<_> {
            let first = format!("{prefix}0");
            let last = format!("{prefix}{last}");
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

    fn model(&self, scope: usize) -> relcheck::Result<Model> {
        let mut model = Model::new(self.bounds(scope)?);
        model.fact("decls", self.decls()?)?;
        model.fact("facts", self.facts()?)?;
        model.assertion("noDirAliases", self.no_dir_aliases()?)?;

        let at = |line| SourceLocation::new("file_system.als", line, 1);
        model.command(Command::run("show", at(40)));
        model.command(Command::check("noDirAliases", "noDirAliases", at(41)));
        Ok(model)
    }
}

fn main() -> relcheck::Result<()> {
    env_logger::init();

    let scope = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(3);
    let backend = match std::env::args().nth(2).as_deref() {
        Some("dpll") => SatBackend::Dpll,
        _ => SatBackend::Batsat,
    };

    println!("=== FileSystem (scope {scope}, {}) ===\n", backend.name());

    let model = FileSystem::new().model(scope)?;
    let options = Options {
        backend,
        ..Options::default()
    };
    let reports = Evaluator::new(options).evaluate_parallel(&model);

    for report in &reports {
        if let Some(instance) = report.verdict().and_then(|v| v.instance()) {
            println!("{}:\n{instance}", report.command());
        }
        if let Some(stats) = report.statistics() {
            println!(
                "  primary vars: {}, vars: {}, clauses: {}, time: {}ms",
                stats.primary_variables(),
                stats.num_variables(),
                stats.num_clauses(),
                stats.total_time()
            );
        }
    }

    let (success, errors) = render_reports(&reports);
    print!("{success}");
    eprint!("{errors}");
    Ok(())
}
