use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser as CmarkParser, Tag, TagEnd};

use crate::parser::directive::{self, Directive, DirectiveHandler};
use crate::parser::error::ParseError;
use crate::parser::line_of;
use crate::tree::{Inline, Node, NodeId, RefKind, Reference, Tree};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

fn options() -> Options {
    Options::ENABLE_STRIKETHROUGH | Options::ENABLE_MATH
}

/// Parse `source` into `tree` below `parent`. Returns every error found.
pub(crate) fn parse_into(
    source: &str,
    doc: &str,
    file_id: usize,
    tree: &mut Tree,
    parent: NodeId,
    handler: &mut dyn DirectiveHandler,
) -> Vec<ParseError> {
    let mut state = ParseState::new(source, source, 0, doc, file_id, parent);
    state.parse(tree, handler);
    state.errors
}

/// Parse a single line of inline Markdown (directive arguments, subtitles).
pub fn parse_inline(text: &str) -> Vec<Inline> {
    let events: Vec<(Event<'_>, Range<usize>)> =
        CmarkParser::new_ext(text, options()).into_offset_iter().collect();
    let mut i = 0;
    while i < events.len() {
        if let Event::Start(Tag::Paragraph) = events[i].0 {
            i += 1;
            return collect_inlines(&events, &mut i, &|e| matches!(e, TagEnd::Paragraph));
        }
        i += 1;
    }
    Vec::new()
}

// ---------------------------------------------------------------------------
// Parse state
// ---------------------------------------------------------------------------

struct ParseState<'a> {
    /// Whole document source, for line numbers.
    source: &'a str,
    /// Text being parsed: the document, or a directive body inside it.
    text: &'a str,
    /// Byte offset of `text` within `source`.
    base: usize,
    doc: &'a str,
    file_id: usize,
    /// Node receiving top-level output.
    parent: NodeId,
    /// Open containers (block quotes, lists, items). Innermost last.
    stack: Vec<NodeId>,
    errors: Vec<ParseError>,
}

impl<'a> ParseState<'a> {
    fn new(
        source: &'a str,
        text: &'a str,
        base: usize,
        doc: &'a str,
        file_id: usize,
        parent: NodeId,
    ) -> Self {
        ParseState {
            source,
            text,
            base,
            doc,
            file_id,
            parent,
            stack: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn parse(&mut self, tree: &mut Tree, handler: &mut dyn DirectiveHandler) {
        let events: Vec<(Event<'_>, Range<usize>)> =
            CmarkParser::new_ext(self.text, options()).into_offset_iter().collect();
        self.process_events(&events, tree, handler);
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(self.parent)
    }

    fn push(&mut self, tree: &mut Tree, node: Node) -> NodeId {
        let id = tree.alloc(node);
        tree.append(self.current(), id);
        id
    }

    fn open(&mut self, tree: &mut Tree, node: Node) {
        let id = self.push(tree, node);
        self.stack.push(id);
    }

    fn process_events(
        &mut self,
        events: &[(Event<'_>, Range<usize>)],
        tree: &mut Tree,
        handler: &mut dyn DirectiveHandler,
    ) {
        let mut i = 0;

        while i < events.len() {
            let (ref ev, ref range) = events[i];

            match ev {
                Event::Start(Tag::Heading { level, .. }) => {
                    let level = *level as u8;
                    i += 1;
                    let content =
                        collect_inlines(events, &mut i, &|e| matches!(e, TagEnd::Heading(_)));
                    self.push(tree, Node::Heading { level, content });
                }

                Event::Start(Tag::Paragraph) => {
                    i += 1;
                    let content =
                        collect_inlines(events, &mut i, &|e| matches!(e, TagEnd::Paragraph));
                    self.push(tree, Node::Paragraph(content));
                }

                // Fenced blocks with a `{name}` info string are directives
                Event::Start(Tag::CodeBlock(kind)) => {
                    let info = match kind {
                        CodeBlockKind::Fenced(info) => info.to_string(),
                        CodeBlockKind::Indented => String::new(),
                    };
                    i += 1;
                    let content =
                        collect_text_until(events, &mut i, |e| matches!(e, TagEnd::CodeBlock));
                    match directive::parse_info(&info) {
                        Some((name, argument)) if handler.accepts(name) => {
                            self.run_directive(tree, handler, name, argument, &content, range);
                        }
                        _ => {
                            let language = if info.is_empty() { None } else { Some(info) };
                            self.push(tree, Node::CodeBlock { language, content });
                        }
                    }
                }

                Event::Start(Tag::BlockQuote(_)) => {
                    self.open(tree, Node::Blockquote);
                    i += 1;
                }

                Event::Start(Tag::List(start)) => {
                    self.open(tree, Node::List { start: *start });
                    i += 1;
                }

                Event::Start(Tag::Item) => {
                    self.open(tree, Node::Item);
                    i += 1;
                }

                Event::End(TagEnd::BlockQuote(_) | TagEnd::List(_) | TagEnd::Item) => {
                    self.stack.pop();
                    i += 1;
                }

                Event::Rule => {
                    self.push(tree, Node::Rule);
                    i += 1;
                }

                // Tight list items carry inline content without a paragraph
                ev if starts_inline(ev) => {
                    let content = collect_inlines(events, &mut i, &|_| false);
                    self.push(tree, Node::Paragraph(content));
                }

                _ => {
                    i += 1;
                }
            }
        }
    }

    /// Parse a directive body as nested content and hand it to `handler`.
    fn run_directive(
        &mut self,
        tree: &mut Tree,
        handler: &mut dyn DirectiveHandler,
        name: &str,
        argument: Option<String>,
        body: &str,
        range: &Range<usize>,
    ) {
        let span = self.base + range.start..self.base + range.end;
        let fence = &self.text[range.clone()];
        let body_start = fence.find('\n').map(|p| p + 1).unwrap_or(fence.len());

        let (options, options_len) = directive::split_options(body);
        let rest = &body[options_len..];

        let content = tree.alloc(Node::Section);
        let mut nested = ParseState::new(
            self.source,
            rest,
            span.start + body_start + options_len,
            self.doc,
            self.file_id,
            content,
        );
        nested.parse(tree, handler);
        self.errors.append(&mut nested.errors);

        let directive = Directive {
            name: name.to_string(),
            argument,
            options,
            content,
            doc: self.doc.to_string(),
            source_id: self.file_id,
            line: line_of(self.source, span.start),
            span,
        };
        match handler.run(tree, directive) {
            Ok(Some(node)) => tree.append(self.current(), node),
            Ok(None) => {}
            Err(err) => self.errors.push(err),
        }
    }
}

// ---------------------------------------------------------------------------
// Inline collection
// ---------------------------------------------------------------------------

fn starts_inline(ev: &Event<'_>) -> bool {
    matches!(
        ev,
        Event::Text(_)
            | Event::Code(_)
            | Event::InlineMath(_)
            | Event::DisplayMath(_)
            | Event::SoftBreak
            | Event::HardBreak
            | Event::Start(
                Tag::Emphasis | Tag::Strong | Tag::Strikethrough | Tag::Link { .. } | Tag::Image { .. }
            )
    )
}

/// Collect inline nodes until a matching End tag. Stops without consuming
/// at any other block boundary.
fn collect_inlines(
    events: &[(Event<'_>, Range<usize>)],
    i: &mut usize,
    is_end: &dyn Fn(&TagEnd) -> bool,
) -> Vec<Inline> {
    let mut inlines = Vec::new();

    while let Some((ev, _)) = events.get(*i) {
        if let Some(leaf) = leaf_inline(ev) {
            inlines.push(leaf);
            *i += 1;
            continue;
        }
        match ev {
            Event::End(tag_end) if is_end(tag_end) => {
                *i += 1;
                break;
            }
            Event::Start(tag) => {
                let Some(close) = inline_close(tag) else {
                    break;
                };
                *i += 1;
                let children = collect_inlines(events, i, &|e| *e == close);
                inlines.push(wrap_inline(tag, children));
            }
            Event::End(_) | Event::Rule => break,
            _ => *i += 1,
        }
    }

    inlines
}

fn leaf_inline(ev: &Event<'_>) -> Option<Inline> {
    let inline = match ev {
        Event::Text(s) => Inline::Text(s.to_string()),
        Event::Code(s) => Inline::CodeSpan(s.to_string()),
        Event::InlineMath(s) => Inline::Math {
            source: s.to_string(),
            display: false,
        },
        Event::DisplayMath(s) => Inline::Math {
            source: s.to_string(),
            display: true,
        },
        Event::SoftBreak => Inline::SoftBreak,
        Event::HardBreak => Inline::HardBreak,
        _ => return None,
    };
    Some(inline)
}

/// Closing tag of an inline container, `None` for block-level tags.
fn inline_close(tag: &Tag<'_>) -> Option<TagEnd> {
    match tag {
        Tag::Strong | Tag::Emphasis | Tag::Strikethrough | Tag::Link { .. } | Tag::Image { .. } => {
            Some(tag.to_end())
        }
        _ => None,
    }
}

fn wrap_inline(tag: &Tag<'_>, children: Vec<Inline>) -> Inline {
    match tag {
        Tag::Strong => Inline::Strong(children),
        Tag::Emphasis => Inline::Emphasis(children),
        Tag::Link { dest_url, title, .. } => link_or_reference(dest_url.to_string(), title.to_string(), children),
        Tag::Image { dest_url, title, .. } => Inline::Image {
            dest: dest_url.to_string(),
            title: title.to_string(),
            alt: children,
        },
        _ => Inline::Strikethrough(children),
    }
}

/// `[text](#label)` is a cross-reference; the link title `numref` makes it
/// a numbered one.
fn link_or_reference(dest: String, title: String, content: Vec<Inline>) -> Inline {
    match dest.strip_prefix('#') {
        Some(label) if !label.is_empty() => {
            let kind = if title == "numref" {
                RefKind::Numbered
            } else {
                RefKind::Generic
            };
            Inline::Reference(Reference::new(kind, label, content))
        }
        _ => Inline::Link {
            dest,
            title,
            content,
        },
    }
}

/// Concatenated text of the events up to the matching End tag.
fn collect_text_until(
    events: &[(Event<'_>, Range<usize>)],
    i: &mut usize,
    is_end: impl Fn(&TagEnd) -> bool,
) -> String {
    let mut text = String::new();
    for (ev, _) in &events[(*i).min(events.len())..] {
        *i += 1;
        match ev {
            Event::End(tag_end) if is_end(tag_end) => break,
            Event::Text(s) => text.push_str(s),
            _ => {}
        }
    }
    text
}
