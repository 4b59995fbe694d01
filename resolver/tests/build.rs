use resolver::{Build, BuildConfig, BuildOutput, OutputFormat};
use spice::Document;
use spice::block::{Block, FileBlock, SimulationBlock};
use spice::parser::line_of;
use spice::tree::{Inline, Node, RefKind, Reference, plain_text};

fn build_with(format: OutputFormat, config: BuildConfig, docs: &[(&str, &str)]) -> BuildOutput {
    let mut build = Build::new(config, format);
    for (id, (name, source)) in docs.iter().enumerate() {
        build.add_document(name, source, id).expect("parse failed");
    }
    build.run().expect("build failed")
}

fn build(docs: &[(&str, &str)]) -> BuildOutput {
    build_with(OutputFormat::Html, BuildConfig::default(), docs)
}

fn doc<'a>(output: &'a BuildOutput, name: &str) -> &'a Document {
    output
        .documents
        .iter()
        .find(|d| d.name == name)
        .expect("no such document")
}

fn file<'a>(doc: &'a Document, label: &str) -> &'a FileBlock {
    let tree = &doc.tree;
    tree.descendants(tree.root())
        .into_iter()
        .find_map(|id| match tree.node(id) {
            Node::Block(Block::File(f)) if f.label == label => Some(f),
            _ => None,
        })
        .expect("no such file block")
}

fn simulation<'a>(doc: &'a Document, label: &str) -> &'a SimulationBlock {
    let tree = &doc.tree;
    tree.descendants(tree.root())
        .into_iter()
        .find_map(|id| match tree.node(id) {
            Node::Block(Block::Simulation(s)) if s.label == label => Some(s),
            _ => None,
        })
        .expect("no such simulation block")
}

fn inlines(doc: &Document) -> Vec<Inline> {
    let tree = &doc.tree;
    let mut out = Vec::new();
    for id in tree.descendants(tree.root()) {
        if let Node::Paragraph(content) = tree.node(id) {
            out.extend(content.iter().cloned());
        }
    }
    out
}

fn references(doc: &Document) -> Vec<Reference> {
    inlines(doc)
        .into_iter()
        .filter_map(|i| match i {
            Inline::Reference(r) => Some(r),
            _ => None,
        })
        .collect()
}

fn warnings(output: &BuildOutput) -> Vec<String> {
    output
        .diagnostics
        .iter()
        .filter(|d| d.is_warning())
        .map(|d| d.to_string())
        .collect()
}

const D1: &str = "\
```{file} Sub
:label: f1

Content.
```
";

const D2: &str = "\
```{simulation} f1
:label: s1
```

See [](#s1) and [](#f1).
";

#[test]
fn cross_document_titles_and_references() {
    let out = build(&[("d1", D1), ("d2", D2)]);
    assert!(out.diagnostics.is_empty());

    let f1 = file(doc(&out, "d1"), "f1");
    assert!(f1.resolved);
    assert_eq!(plain_text(&f1.title), "File (Sub)");
    assert_eq!(f1.number.as_ref().map(|n| n.to_string()).as_deref(), Some("1"));

    let d2 = doc(&out, "d2");
    let s1 = simulation(d2, "s1");
    assert!(s1.resolved);
    assert_eq!(plain_text(&s1.title), "Simulation to File 1 (Sub)");
    match &s1.title[1] {
        Inline::Link { dest, .. } => assert_eq!(dest, "d1.html#f1"),
        other => panic!("expected link, got {:?}", other),
    }

    let refs = references(d2);
    assert_eq!(refs.len(), 2);
    assert_eq!(refs[0].target, "s1");
    assert_eq!(refs[0].kind, RefKind::Generic);
    assert_eq!(refs[0].content, vec![Inline::Text("Simulation to File 1 (Sub)".into())]);

    assert_eq!(refs[1].target, "f1");
    assert_eq!(refs[1].kind, RefKind::Numbered);
    assert_eq!(refs[1].content, vec![Inline::Literal(vec![Inline::Text("f1".into())])]);
    assert!(refs[1].classes.contains(&"std-numref".to_string()));
    assert!(!refs[1].classes.contains(&"std-ref".to_string()));
}

#[test]
fn html_rendering_overlays_numbers() {
    let out = build(&[("d1", D1)]);
    let d1 = doc(&out, "d1");
    let rendered = d1.tree.display(d1.tree.root()).number_titles(true).to_string();
    assert!(rendered.contains(":::{file} f1\n**File 1 (Sub)**"));
}

#[test]
fn latex_embeds_numbers_and_spells_out_references() {
    let out = build_with(OutputFormat::Latex, BuildConfig::default(), &[("d1", D1), ("d2", D2)]);
    assert_eq!(plain_text(&file(doc(&out, "d1"), "f1").title), "File 1 (Sub)");

    let d2 = doc(&out, "d2");
    match &simulation(d2, "s1").title[1] {
        Inline::Link { dest, .. } => assert_eq!(dest, "%d1#f1"),
        other => panic!("expected link, got {:?}", other),
    }

    let numbered: Vec<_> = inlines(d2)
        .into_iter()
        .filter_map(|i| match i {
            Inline::NumberReference(r) => Some(r),
            _ => None,
        })
        .collect();
    assert_eq!(numbered.len(), 1);
    assert_eq!(numbered[0].target, "f1");
    assert_eq!(numbered[0].doc, "d1");
    assert_eq!(numbered[0].number, "1");
}

#[test]
fn latex_keeps_same_document_numbered_references() {
    let source = "```{file}\n:label: f1\n```\n\nSee [](#f1).\n";
    let out = build_with(OutputFormat::Latex, BuildConfig::default(), &[("d1", source)]);
    let refs = references(doc(&out, "d1"));
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].kind, RefKind::Numbered);
}

#[test]
fn simulation_may_precede_its_file() {
    let early = "```{simulation} later\n:label: s0\n```\n";
    let late = "```{file}\n:label: later\n```\n";
    let out = build(&[("a", early), ("b", late)]);
    assert!(out.diagnostics.is_empty());
    assert_eq!(plain_text(&simulation(doc(&out, "a"), "s0").title), "Simulation to File 1");
}

#[test]
fn references_may_precede_their_simulation() {
    let first = "Go to [](#s9).\n";
    let second = "```{file}\n:label: f9\n```\n\n```{simulation} f9\n:label: s9\n```\n";
    let out = build(&[("first", first), ("second", second)]);
    let refs = references(doc(&out, "first"));
    assert_eq!(refs[0].content, vec![Inline::Text("Simulation to File 1".into())]);
}

#[test]
fn undefined_target_warns_once() {
    let refs_first = "Go to [](#s1).\n";
    let sim = "\nText.\n\n```{simulation} nope\n:label: s1\n```\n";
    let out = build(&[("a", refs_first), ("b", sim)]);

    assert_eq!(warnings(&out), vec!["undefined label: nope".to_string()]);
    let diagnostic = &out.diagnostics[0];
    assert_eq!(diagnostic.doc, "b");
    let span = diagnostic.span.clone().unwrap();
    assert_eq!(line_of(sim, span.start), 4);

    let s1 = simulation(doc(&out, "b"), "s1");
    assert!(!s1.resolved);
    assert_eq!(s1.title, vec![Inline::Text("Simulation to".into())]);
    assert_eq!(references(doc(&out, "a"))[0].content, vec![Inline::Text("s1".into())]);
}

#[test]
fn simulation_of_a_simulation_is_rejected() {
    let source = "\
```{file}
:label: f1
```

```{simulation} f1
:label: s1
```

```{simulation} s1
:label: s2
```
";
    let out = build(&[("doc", source)]);
    assert_eq!(
        warnings(&out),
        vec!["label s1 does not refer to a file block".to_string()]
    );
}

#[test]
fn upgrade_leaves_other_references_alone() {
    let source = "\
```{file}
:label: plain
:nonumber:
```

```{file}
:label: counted
```

```{simulation} counted
:label: sim
```

[my words](#counted) [](#plain) [](#sim) [](#unknown) [](#counted \"numref\")
";
    let out = build(&[("doc", source)]);
    let refs = references(doc(&out, "doc"));
    let kinds: Vec<(String, RefKind)> = refs.iter().map(|r| (r.target.clone(), r.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            ("counted".to_string(), RefKind::Generic),
            ("plain".to_string(), RefKind::Generic),
            ("sim".to_string(), RefKind::Generic),
            ("unknown".to_string(), RefKind::Generic),
            ("counted".to_string(), RefKind::Numbered),
        ]
    );
    assert_eq!(plain_text(&refs[0].content), "my words");
    // Authored numbered references keep their text as written.
    assert_eq!(refs[4].content, vec![Inline::Text("counted".into())]);
}

#[test]
fn unnumbered_files_are_skipped_by_numbering() {
    let source = "\
```{file}
:label: a
```

```{file}
:label: b
:nonumber:
```

```{file}
:label: c
```
";
    let out = build(&[("doc", source)]);
    let d = doc(&out, "doc");
    let numbers: Vec<Option<String>> = ["a", "b", "c"]
        .iter()
        .map(|l| file(d, l).number.as_ref().map(|n| n.to_string()))
        .collect();
    assert_eq!(numbers, vec![Some("1".into()), None, Some("2".into())]);
}

#[test]
fn labels_are_synthesized_per_document() {
    let source = "```{file}\n```\n\n```{simulation} doc-file-0\n```\n\n```{file}\n```\n";
    let out = build(&[("doc", source), ("other", "```{file}\n```\n")]);
    let d = doc(&out, "doc");
    assert_eq!(file(d, "doc-file-0").serial_number, 0);
    assert_eq!(simulation(d, "doc-simulation-1").serial_number, 1);
    assert_eq!(file(d, "doc-file-2").serial_number, 2);
    assert_eq!(file(doc(&out, "other"), "other-file-0").serial_number, 0);
}

#[test]
fn duplicate_label_keeps_the_first() {
    let first = "```{file} One\n:label: f1\n```\n";
    let second = "Intro.\n\n```{file} Two\n:label: f1\n```\n";
    let out = build(&[("a", first), ("b", second)]);

    assert_eq!(warnings(&out), vec!["duplicate label: f1; other instance in a".to_string()]);
    let diagnostic = &out.diagnostics[0];
    assert_eq!(diagnostic.doc, "b");
    assert_eq!(diagnostic.related.as_ref().map(|(id, _)| *id), Some(0));

    let b = doc(&out, "b");
    assert!(b
        .tree
        .descendants(b.tree.root())
        .into_iter()
        .all(|id| b.tree.node(id).as_block().is_none()));
    assert_eq!(plain_text(&file(doc(&out, "a"), "f1").title), "File (One)");
}

#[test]
fn hide_simulations_drops_every_simulation() {
    let source = "\
```{file}
:label: f1
```

```{simulation} f1
:label: s1
```

```{simulation-start} f1
```

Gated simulation body.

```{simulation-end}
```

See [](#s1).
";
    let config = BuildConfig {
        hide_simulations: true,
        ..BuildConfig::default()
    };
    let out = build_with(OutputFormat::Html, config, &[("doc", source)]);
    assert!(out.diagnostics.is_empty());

    let d = doc(&out, "doc");
    let tree = &d.tree;
    assert!(tree
        .descendants(tree.root())
        .into_iter()
        .all(|id| !matches!(tree.node(id).as_block(), Some(Block::Simulation(_)))));
    let rendered = tree.display(tree.root()).to_string();
    assert!(!rendered.contains("Gated simulation body."));
    assert_eq!(references(d)[0].content, vec![Inline::Text("s1".into())]);
}

#[test]
fn hidden_file_still_resolves_simulations() {
    let source = "\
```{file} Secret
:label: f1
:hidden:
```

```{simulation} f1
:label: s1
```
";
    let out = build(&[("doc", source)]);
    let d = doc(&out, "doc");
    let tree = &d.tree;
    assert!(tree
        .descendants(tree.root())
        .into_iter()
        .all(|id| !matches!(tree.node(id).as_block(), Some(Block::File(_)))));
    assert_eq!(plain_text(&simulation(d, "s1").title), "Simulation to File (Secret)");
}

#[test]
fn math_in_subtitle_marks_the_referencing_document() {
    let files = "```{file} Energy $E$\n:label: f1\n```\n";
    let sims = "```{simulation} f1\n:label: s1\n```\n";
    let out = build(&[("files", files), ("sims", sims)]);
    assert!(doc(&out, "sims").requires_math);
    assert!(!doc(&out, "files").requires_math);
}

#[test]
fn custom_titles_are_used() {
    let config = BuildConfig {
        file_title: "Listing".into(),
        simulation_title: "Run of".into(),
        ..BuildConfig::default()
    };
    let out = build_with(OutputFormat::Html, config, &[("d1", D1), ("d2", D2)]);
    assert_eq!(
        plain_text(&simulation(doc(&out, "d2"), "s1").title),
        "Run of Listing 1 (Sub)"
    );
}

#[test]
fn nested_document_paths_link_relatively() {
    let out = build(&[("guide/files", D1), ("guide/sims/run", D2)]);
    match &simulation(doc(&out, "guide/sims/run"), "s1").title[1] {
        Inline::Link { dest, .. } => assert_eq!(dest, "../files.html#f1"),
        other => panic!("expected link, got {:?}", other),
    }
}

#[test]
fn directive_errors_fail_parsing() {
    let cases = [
        "```{file}\n:colour: red\n```\n",
        "```{file}\n:label:\n```\n",
        "```{file}\n:hidden: yes\n```\n",
        "```{simulation}\n```\n",
        "```{simulation} a b\n```\n",
        "```{file-end} extra\n```\n",
    ];
    for source in cases {
        let mut build = Build::new(BuildConfig::default(), OutputFormat::Html);
        assert!(build.add_document("doc", source, 0).is_err(), "accepted: {:?}", source);
    }
}

#[test]
fn unknown_option_error_lists_accepted_options() {
    let mut build = Build::new(BuildConfig::default(), OutputFormat::Html);
    let errors = build
        .add_document("doc", "```{file-end}\n:class: wide\n```\n", 0)
        .unwrap_err();
    assert_eq!(errors[0].notes, vec!["'file-end' accepts: label".to_string()]);
}

/// References anywhere in a list of inlines, including inside links.
fn nested_references(inlines: &[Inline]) -> Vec<&Reference> {
    let mut out = Vec::new();
    for inline in inlines {
        match inline {
            Inline::Reference(r) => out.push(r),
            Inline::Link { content, .. } => out.extend(nested_references(content)),
            _ => {}
        }
    }
    out
}

#[test]
fn references_in_subtitles_are_upgraded() {
    let source = "\
```{file}
:label: f1
```

```{file} see [](#f1)
:label: f2
```
";
    let out = build(&[("doc", source)]);
    let f2 = file(doc(&out, "doc"), "f2");

    let subtitle = f2.subtitle.as_deref().unwrap();
    let refs = nested_references(subtitle);
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].kind, RefKind::Numbered);

    let in_title = nested_references(&f2.title);
    assert_eq!(in_title.len(), 1);
    assert_eq!(in_title[0].kind, RefKind::Numbered);
}

#[test]
fn subtitle_copied_from_a_later_document_is_upgraded() {
    let a = "```{simulation} f2\n:label: s1\n```\n";
    let b = "```{file}\n:label: f1\n```\n\n```{file} after [](#f1)\n:label: f2\n```\n";
    let out = build(&[("a", a), ("b", b)]);
    let s1 = simulation(doc(&out, "a"), "s1");
    let refs = nested_references(&s1.title);
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].target, "f1");
    assert_eq!(refs[0].kind, RefKind::Numbered);
}
