use resolver::directive::Directives;
use resolver::merge::merge_gated;
use resolver::numbering::{Numbering, SequentialNumbering};
use resolver::title::{Resolution, compose_file_title, compose_simulation_title, resolve_file_titles, simulation_title};
use resolver::{BuildConfig, BuildContext, BuildError, OutputFormat, OutputTarget, Registry};
use spice::Document;
use spice::block::{Block, BlockKind, DisplayNumber, FileBlock};
use spice::parser::Parser;
use spice::tree::{Inline, Node, Tree, plain_text};

fn context() -> BuildContext {
    BuildContext::with_config(BuildConfig::default())
}

fn parse(ctx: &mut BuildContext, name: &str, source: &str) -> Document {
    Parser::new(name, source.to_string(), 0)
        .parse(&mut Directives::new(ctx))
        .expect("parse failed")
}

fn file_block(label: &str) -> FileBlock {
    FileBlock {
        label: label.to_string(),
        source_doc: "doc".to_string(),
        prefix: "File".to_string(),
        subtitle: Some(vec![Inline::Text("Sub".into())]),
        title: vec![Inline::Text("File".into())],
        number: None,
        numbered: true,
        hidden: false,
        serial_number: 0,
        classes: vec!["file".to_string()],
        resolved: false,
        span: 0..0,
    }
}

#[test]
fn first_registration_wins() {
    let mut tree = Tree::new();
    let a = tree.alloc(Node::Block(Block::File(file_block("f1"))));
    let b = tree.alloc(Node::Block(Block::File(FileBlock {
        prefix: "Other".into(),
        ..file_block("f1")
    })));

    let mut registry = Registry::new();
    assert!(!registry.register("f1", BlockKind::File, "doc", 0, &tree, a));
    assert!(registry.register("f1", BlockKind::File, "other", 1, &tree, b));
    assert_eq!(registry.len(), 1);

    let entry = registry.lookup("f1").unwrap();
    assert_eq!(entry.source_doc, "doc");
    match entry.block() {
        Some(Block::File(f)) => assert_eq!(f.prefix, "File"),
        other => panic!("unexpected entry {:?}", other),
    }
    assert!(registry.lookup("missing").is_none());
}

#[test]
fn snapshots_are_independent_of_the_live_tree() {
    let mut tree = Tree::new();
    let id = tree.alloc(Node::Block(Block::File(file_block("f1"))));
    let mut registry = Registry::new();
    registry.register("f1", BlockKind::File, "doc", 0, &tree, id);

    if let Node::Block(Block::File(f)) = tree.node_mut(id) {
        f.title = vec![Inline::Text("Changed".into())];
    }
    let snapshot_title = |registry: &Registry| plain_text(registry.lookup("f1").unwrap().block().unwrap().title());
    assert_eq!(snapshot_title(&registry), "File");

    assert!(registry.update_snapshot("f1", &tree, id));
    assert_eq!(snapshot_title(&registry), "Changed");
    assert!(!registry.update_snapshot("nope", &tree, id));
}

#[test]
fn file_title_composition_is_idempotent() {
    let mut file = file_block("f1");
    compose_file_title(&mut file, Some(DisplayNumber::single(3)), true);
    assert_eq!(plain_text(&file.title), "File 3 (Sub)");
    let once = file.clone();

    compose_file_title(&mut file, Some(DisplayNumber::single(9)), true);
    assert_eq!(file, once);
}

#[test]
fn html_file_titles_carry_no_number() {
    let mut file = file_block("f1");
    compose_file_title(&mut file, Some(DisplayNumber::single(3)), false);
    assert_eq!(plain_text(&file.title), "File (Sub)");
    assert_eq!(file.number, Some(DisplayNumber::single(3)));
}

#[test]
fn resolving_twice_changes_nothing() {
    let mut ctx = context();
    let mut doc = parse(&mut ctx, "doc", "```{file} Sub\n:label: f1\n```\n");
    merge_gated(&mut doc);
    ctx.numbering.assign(std::slice::from_ref(&doc));

    resolve_file_titles(&mut ctx, &mut doc);
    let first = doc.tree.outline(doc.tree.root());
    resolve_file_titles(&mut ctx, &mut doc);
    assert_eq!(doc.tree.outline(doc.tree.root()), first);

    let entry = ctx.registry.lookup("f1").unwrap();
    match entry.block() {
        Some(Block::File(f)) => {
            assert!(f.resolved);
            assert_eq!(plain_text(&f.title), "File (Sub)");
        }
        other => panic!("unexpected entry {:?}", other),
    }
}

#[test]
fn sequential_numbering_follows_document_order() {
    let mut ctx = context();
    let a = parse(&mut ctx, "a", "```{file}\n:label: x\n```\n\n```{file}\n:label: y\n```\n");
    let b = parse(&mut ctx, "b", "```{file}\n:label: z\n```\n");
    let mut numbering = SequentialNumbering::default();
    numbering.assign(&[a, b]);
    let number = |label: &str| numbering.display_number(label, BlockKind::File).map(|n| n.to_string());
    assert_eq!(number("x").as_deref(), Some("1"));
    assert_eq!(number("y").as_deref(), Some("2"));
    assert_eq!(number("z").as_deref(), Some("3"));
    assert_eq!(numbering.display_number("x", BlockKind::Simulation), None);
}

#[test]
fn composing_against_unknown_and_wrong_targets() {
    let mut ctx = context();
    let doc = parse(
        &mut ctx,
        "doc",
        "```{simulation} ghost\n:label: s1\n```\n\n```{simulation} s1\n:label: s2\n```\n",
    );
    let sims: Vec<_> = doc
        .tree
        .descendants(doc.tree.root())
        .into_iter()
        .filter_map(|id| match doc.tree.node(id) {
            Node::Block(Block::Simulation(s)) => Some(s.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        compose_simulation_title(&ctx, &sims[0], "doc"),
        Resolution::Unresolved(BuildError::UndefinedTarget { label: "ghost".into() })
    );
    assert_eq!(
        compose_simulation_title(&ctx, &sims[1], "doc"),
        Resolution::Unresolved(BuildError::TargetNotFile { label: "s1".into() })
    );
}

#[test]
fn lazy_simulation_title_is_cached() {
    let mut ctx = context();
    let doc = parse(
        &mut ctx,
        "doc",
        "```{file}\n:label: f1\n```\n\n```{simulation} f1\n:label: s1\n```\n",
    );
    ctx.numbering.assign(std::slice::from_ref(&doc));

    let title = match simulation_title(&mut ctx, "s1", "elsewhere") {
        Some(Resolution::Resolved(title)) => title,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(plain_text(&title.inlines), "Simulation to File 1");
    assert!(matches!(&title.inlines[1], Inline::Link { dest, .. } if dest == "doc.html#f1"));
    assert!(ctx.diagnostics.is_empty());

    // The cache links relative to the simulation's own document.
    match ctx.registry.lookup("s1").unwrap().block() {
        Some(Block::Simulation(s)) => {
            assert!(s.resolved);
            assert!(matches!(&s.title[1], Inline::Link { dest, .. } if dest == "#f1"));
        }
        other => panic!("unexpected entry {:?}", other),
    }
    match simulation_title(&mut ctx, "s1", "doc") {
        Some(Resolution::Resolved(title)) => {
            assert!(matches!(&title.inlines[1], Inline::Link { dest, .. } if dest == "#f1"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(simulation_title(&mut ctx, "f1", "doc").is_none());
}

#[test]
fn output_formats() {
    assert!(!OutputFormat::Html.is_latex_like());
    assert!(OutputFormat::Latex.is_latex_like());
    assert_eq!(OutputFormat::Html.relative_uri("a", "a"), "");
    assert_eq!(OutputFormat::Html.relative_uri("a", "b"), "b.html");
    assert_eq!(OutputFormat::Html.relative_uri("x/a", "b"), "../b.html");
    assert_eq!(OutputFormat::Html.relative_uri("a", "x/b"), "x/b.html");
    assert_eq!(OutputFormat::Latex.relative_uri("a", "x/b"), "%x/b");
    assert_eq!("LaTeX".parse::<OutputFormat>(), Ok(OutputFormat::Latex));
    assert!("docx".parse::<OutputFormat>().is_err());
}
