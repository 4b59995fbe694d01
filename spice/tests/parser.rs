use spice::Document;
use spice::parser::{
    Directive, DirectiveHandler, NoDirectives, ParseError, ParseErrorKind, Parser, line_of, parse_inline,
};
use spice::tree::{Inline, Node, NodeId, RefKind, Tree, plain_text};

fn parse(source: &str) -> Document {
    Parser::new("doc", source.to_string(), 0)
        .parse(&mut NoDirectives)
        .expect("parse failed")
}

fn root_children(doc: &Document) -> Vec<&Node> {
    let tree = &doc.tree;
    tree.children(tree.root()).iter().map(|&c| tree.node(c)).collect()
}

/// Wraps `note` directive bodies in a block quote and remembers every call.
#[derive(Default)]
struct Notes {
    seen: Vec<Directive>,
}

impl DirectiveHandler for Notes {
    fn accepts(&self, name: &str) -> bool {
        name == "note"
    }

    fn run(&mut self, tree: &mut Tree, directive: Directive) -> Result<Option<NodeId>, ParseError> {
        self.seen.push(directive.clone());
        if directive.options.has("fail") {
            return Err(ParseError::new(
                ParseErrorKind::Invalid("note failed".into()),
                directive.span.clone(),
                directive.source_id,
            ));
        }
        if directive.options.has("drop") {
            return Ok(None);
        }
        let id = tree.alloc(Node::Blockquote);
        tree.append(id, directive.content);
        Ok(Some(id))
    }
}

#[test]
fn headings_and_paragraphs() {
    let doc = parse("# Title\n\nSome *text*.\n");
    let nodes = root_children(&doc);
    assert_eq!(nodes.len(), 2);
    assert!(matches!(nodes[0], Node::Heading { level: 1, .. }));
    match nodes[1] {
        Node::Paragraph(content) => assert_eq!(plain_text(content), "Some text."),
        other => panic!("expected paragraph, got {:?}", other),
    }
}

#[test]
fn unknown_directive_stays_a_code_block() {
    let doc = parse("```{file} Sub\nbody\n```\n");
    match root_children(&doc)[0] {
        Node::CodeBlock { language, content } => {
            assert_eq!(language.as_deref(), Some("{file} Sub"));
            assert_eq!(content, "body\n");
        }
        other => panic!("expected code block, got {:?}", other),
    }
}

#[test]
fn directive_argument_options_and_body() {
    let source = "# Title\n\n```{note} Some *arg*\n:label: n1\n:flag:\n\nBody text.\n```\n";
    let mut notes = Notes::default();
    let doc = Parser::new("doc", source.to_string(), 7)
        .parse(&mut notes)
        .expect("parse failed");

    assert_eq!(notes.seen.len(), 1);
    let directive = &notes.seen[0];
    assert_eq!(directive.name, "note");
    assert_eq!(directive.argument.as_deref(), Some("Some *arg*"));
    assert_eq!(
        directive.argument_inlines(),
        Some(vec![
            Inline::Text("Some ".into()),
            Inline::Emphasis(vec![Inline::Text("arg".into())]),
        ])
    );
    assert_eq!(directive.options.get("label"), Some("n1"));
    assert!(directive.options.has("flag"));
    assert_eq!(directive.options.get("flag"), None);
    assert_eq!(directive.doc, "doc");
    assert_eq!(directive.source_id, 7);
    assert_eq!(directive.line, 3);
    assert_eq!(line_of(source, directive.span.start), 3);

    let tree = &doc.tree;
    let quote = tree.children(tree.root())[1];
    assert_eq!(tree.node(quote), &Node::Blockquote);
    let section = tree.children(quote)[0];
    assert_eq!(tree.node(section), &Node::Section);
    match tree.node(tree.children(section)[0]) {
        Node::Paragraph(content) => assert_eq!(plain_text(content), "Body text."),
        other => panic!("expected paragraph, got {:?}", other),
    }
}

#[test]
fn nested_directives_run_inside_out() {
    let source = "````{note} outer\n```{note} inner\nInner body.\n```\n````\n";
    let mut notes = Notes::default();
    let doc = Parser::new("doc", source.to_string(), 0)
        .parse(&mut notes)
        .expect("parse failed");

    let arguments: Vec<_> = notes.seen.iter().map(|d| d.argument.clone().unwrap()).collect();
    assert_eq!(arguments, vec!["inner", "outer"]);
    assert_eq!(notes.seen[0].line, 2);

    // root > quote > section > quote > section > paragraph
    let tree = &doc.tree;
    let outer = tree.children(tree.root())[0];
    let outer_section = tree.children(outer)[0];
    let inner = tree.children(outer_section)[0];
    assert_eq!(tree.node(inner), &Node::Blockquote);
}

#[test]
fn handler_errors_are_collected() {
    let source = "```{note}\n:fail:\n```\n\n```{note}\n:fail:\n```\n";
    let mut notes = Notes::default();
    let errors = Parser::new("doc", source.to_string(), 0)
        .parse(&mut notes)
        .unwrap_err();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].message(), "note failed");
}

#[test]
fn dropped_directive_emits_nothing() {
    let mut notes = Notes::default();
    let doc = Parser::new("doc", "```{note}\n:drop:\nhidden\n```\n\nafter\n".to_string(), 0)
        .parse(&mut notes)
        .expect("parse failed");
    let nodes = root_children(&doc);
    assert_eq!(nodes.len(), 1);
    assert!(matches!(nodes[0], Node::Paragraph(_)));
}

#[test]
fn anchor_links_become_references() {
    let doc = parse("See [](#f1) and [the file](#f2 \"numref\") or [site](https://example.org).\n");
    let Node::Paragraph(content) = root_children(&doc)[0] else {
        panic!("expected paragraph");
    };

    let refs: Vec<_> = content
        .iter()
        .filter_map(|i| match i {
            Inline::Reference(r) => Some(r),
            _ => None,
        })
        .collect();
    assert_eq!(refs.len(), 2);

    assert_eq!(refs[0].kind, RefKind::Generic);
    assert_eq!(refs[0].target, "f1");
    assert!(!refs[0].explicit);
    assert_eq!(refs[0].content, vec![Inline::Text("f1".into())]);
    assert!(refs[0].classes.contains(&"std-ref".to_string()));

    assert_eq!(refs[1].kind, RefKind::Numbered);
    assert!(refs[1].explicit);
    assert_eq!(plain_text(&refs[1].content), "the file");

    assert!(content
        .iter()
        .any(|i| matches!(i, Inline::Link { dest, .. } if dest == "https://example.org")));
}

#[test]
fn inline_math_is_kept() {
    let inlines = parse_inline("Energy $E = mc^2$");
    assert!(spice::tree::contains_math(&inlines));
    assert_eq!(plain_text(&inlines), "Energy E = mc^2");
}

#[test]
fn tight_list_items_hold_paragraphs() {
    let doc = parse("- one\n- two\n");
    let tree = &doc.tree;
    let list = tree.children(tree.root())[0];
    assert_eq!(tree.node(list), &Node::List { start: None });
    assert_eq!(tree.children(list).len(), 2);
    let item = tree.children(list)[0];
    assert!(matches!(tree.node(tree.children(item)[0]), Node::Paragraph(_)));
}

#[test]
fn line_of_counts_from_one() {
    let source = "a\nb\nc";
    assert_eq!(line_of(source, 0), 1);
    assert_eq!(line_of(source, 2), 2);
    assert_eq!(line_of(source, 4), 3);
    assert_eq!(line_of(source, 100), 3);
}

#[test]
fn tree_replace_and_remove_range() {
    let mut tree = Tree::new();
    let root = tree.root();
    let ids: Vec<NodeId> = (0..4)
        .map(|n| {
            let id = tree.alloc(Node::Paragraph(vec![Inline::Text(n.to_string())]));
            tree.append(root, id);
            id
        })
        .collect();

    let rule = tree.alloc(Node::Rule);
    tree.replace(ids[0], rule);
    assert_eq!(tree.children(root)[0], rule);
    assert_eq!(tree.parent(ids[0]), None);
    assert_eq!(tree.parent(rule), Some(root));

    let removed = tree.remove_range(root, 1..=2);
    assert_eq!(removed, vec![ids[1], ids[2]]);
    assert_eq!(tree.children(root), &[rule, ids[3]]);
    assert_eq!(tree.index_in_parent(ids[3]), Some(1));
    assert!(removed.iter().all(|&id| tree.parent(id).is_none()));
}

#[test]
fn descendants_are_in_document_order() {
    let doc = parse("> quoted\n\nplain\n");
    let tree = &doc.tree;
    let kinds: Vec<&str> = tree
        .descendants(tree.root())
        .into_iter()
        .map(|id| match tree.node(id) {
            Node::Blockquote => "quote",
            Node::Paragraph(_) => "para",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["quote", "para", "para"]);
}

#[test]
fn subtree_is_an_independent_copy() {
    let mut doc = parse("> quoted\n");
    let quote = doc.tree.children(doc.tree.root())[0];
    let copy = doc.tree.subtree(quote);
    assert_eq!(copy.outline(copy.root()), doc.tree.outline(quote));

    let para = doc.tree.children(quote)[0];
    *doc.tree.node_mut(para) = Node::Rule;
    assert_ne!(copy.outline(copy.root()), doc.tree.outline(quote));
    assert!(matches!(
        copy.node(copy.children(copy.root())[0]),
        Node::Paragraph(_)
    ));
}

#[test]
fn visit_inlines_reaches_nested_content() {
    let mut doc = parse("# **bold** head\n\n> *deep* text\n");
    let mut count = 0;
    doc.tree.visit_inlines_mut(|inline| {
        if let Inline::Text(s) = inline {
            count += 1;
            *s = s.to_uppercase();
        }
    });
    assert_eq!(count, 4);
    let rendered = doc.tree.display(doc.tree.root()).to_string();
    assert!(rendered.contains("# **BOLD** HEAD"));
    assert!(rendered.contains("> *DEEP* TEXT"));
}
