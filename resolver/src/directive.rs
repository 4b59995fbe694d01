use spice::block::{Block, BlockKind, EndMarker, FileBlock, SimulationBlock};
use spice::parser::{Directive, DirectiveHandler, ParseError, ParseErrorKind};
use spice::tree::{Inline, Node, NodeId, Tree};

use crate::context::BuildContext;
use crate::error::{BuildError, Diagnostic};

pub const FILE: &str = "file";
pub const FILE_START: &str = "file-start";
pub const FILE_END: &str = "file-end";
pub const SIMULATION: &str = "simulation";
pub const SIMULATION_START: &str = "simulation-start";
pub const SIMULATION_END: &str = "simulation-end";

const DIRECTIVES: &[&str] = &[
    FILE,
    FILE_START,
    FILE_END,
    SIMULATION,
    SIMULATION_START,
    SIMULATION_END,
];

const FILE_OPTIONS: &[&str] = &["label", "class", "nonumber", "hidden"];
const SIMULATION_OPTIONS: &[&str] = &["label", "class", "hidden"];
const END_OPTIONS: &[&str] = &["label"];
const FLAGS: &[&str] = &["nonumber", "hidden"];

/// Constructs file and simulation blocks while a document is parsed,
/// registering labels and gated markers in the build context.
pub struct Directives<'a> {
    ctx: &'a mut BuildContext,
}

impl<'a> Directives<'a> {
    pub fn new(ctx: &'a mut BuildContext) -> Self {
        Directives { ctx }
    }

    fn file(&mut self, tree: &mut Tree, directive: Directive, gated: bool) -> Result<Option<NodeId>, ParseError> {
        check_options(&directive, FILE_OPTIONS)?;
        let serial = self.ctx.next_serial(&directive.doc);
        let label = label_for(&directive, BlockKind::File, serial);
        if gated {
            self.ctx.gated.record_start(
                &directive.doc,
                directive.source_id,
                &label,
                BlockKind::File,
                directive.line,
            );
        }

        let prefix = self.ctx.config.file_title.clone();
        let block = Block::File(FileBlock {
            label,
            source_doc: directive.doc.clone(),
            title: vec![Inline::Text(prefix.clone())],
            prefix,
            subtitle: directive.argument_inlines(),
            number: None,
            numbered: !directive.options.has("nonumber"),
            hidden: directive.options.has("hidden"),
            serial_number: serial,
            classes: classes_for(&directive),
            resolved: false,
            span: directive.span.clone(),
        });
        Ok(self.emit(tree, directive, block, gated, true))
    }

    fn simulation(
        &mut self,
        tree: &mut Tree,
        directive: Directive,
        gated: bool,
    ) -> Result<Option<NodeId>, ParseError> {
        check_options(&directive, SIMULATION_OPTIONS)?;
        let target_label = match directive.argument.as_deref() {
            Some(arg) if arg.split_whitespace().count() == 1 => arg.to_string(),
            Some(_) => {
                return Err(ParseError::new(
                    ParseErrorKind::Invalid(format!(
                        "directive '{}' takes exactly one target label",
                        directive.name
                    )),
                    directive.span.clone(),
                    directive.source_id,
                ));
            }
            None => {
                return Err(ParseError::new(
                    ParseErrorKind::MissingArgument {
                        directive: directive.name.clone(),
                    },
                    directive.span.clone(),
                    directive.source_id,
                ));
            }
        };

        let serial = self.ctx.next_serial(&directive.doc);
        let label = label_for(&directive, BlockKind::Simulation, serial);
        if gated {
            self.ctx.gated.record_start(
                &directive.doc,
                directive.source_id,
                &label,
                BlockKind::Simulation,
                directive.line,
            );
        }

        let hide_all = self.ctx.config.hide_simulations;
        if hide_all && !gated {
            return Ok(None);
        }

        let prefix = self.ctx.config.simulation_title.clone();
        let block = Block::Simulation(SimulationBlock {
            label,
            source_doc: directive.doc.clone(),
            target_label,
            title: vec![Inline::Text(prefix.clone())],
            prefix,
            hidden: hide_all || directive.options.has("hidden"),
            serial_number: serial,
            classes: classes_for(&directive),
            resolved: false,
            span: directive.span.clone(),
        });
        Ok(self.emit(tree, directive, block, gated, !hide_all))
    }

    fn end(&mut self, tree: &mut Tree, directive: Directive, kind: BlockKind) -> Result<Option<NodeId>, ParseError> {
        check_options(&directive, END_OPTIONS)?;
        if directive.argument.is_some() {
            return Err(ParseError::new(
                ParseErrorKind::UnexpectedArgument {
                    directive: directive.name.clone(),
                },
                directive.span.clone(),
                directive.source_id,
            ));
        }
        let label = directive.options.get("label").map(str::to_string);
        self.ctx.gated.record_end(
            &directive.doc,
            directive.source_id,
            label.as_deref(),
            kind,
            directive.line,
        );

        let marker = EndMarker {
            kind,
            label,
            span: directive.span,
        };
        Ok(Some(tree.alloc(Node::End(marker))))
    }

    /// Allocate the node for `block`, attach the directive body and register
    /// the label. A duplicate label is reported and the block dropped; for a
    /// gated start a hidden marker is still emitted so its span gets removed.
    fn emit(
        &mut self,
        tree: &mut Tree,
        directive: Directive,
        mut block: Block,
        gated: bool,
        register: bool,
    ) -> Option<NodeId> {
        let label = block.label().to_string();
        let mut register = register;

        if register {
            if let Some(existing) = self.ctx.registry.lookup(&label) {
                let error = BuildError::DuplicateLabel {
                    label: label.clone(),
                    other_doc: existing.source_doc.clone(),
                };
                let diagnostic = Diagnostic::warning(
                    error,
                    &directive.doc,
                    directive.source_id,
                    directive.span.clone(),
                )
                .with_related(existing.source_id, existing.span.clone());
                self.ctx.warn(diagnostic);
                if !gated {
                    return None;
                }
                block.set_hidden(true);
                register = false;
            }
        }

        let kind = block.kind();
        let hidden = block.hidden();
        let node = if gated {
            Node::Start(block)
        } else {
            Node::Block(block)
        };
        let id = tree.alloc(node);
        tree.append(id, directive.content);

        if register {
            self.ctx.registry.register(
                &label,
                kind,
                &directive.doc,
                directive.source_id,
                tree,
                id,
            );
            tracing::trace!(%label, %kind, doc = %directive.doc, "registered block");
        }

        if hidden && !gated {
            return None;
        }
        Some(id)
    }
}

impl DirectiveHandler for Directives<'_> {
    fn accepts(&self, name: &str) -> bool {
        DIRECTIVES.contains(&name)
    }

    fn run(&mut self, tree: &mut Tree, directive: Directive) -> Result<Option<NodeId>, ParseError> {
        match directive.name.as_str() {
            FILE => self.file(tree, directive, false),
            FILE_START => self.file(tree, directive, true),
            FILE_END => self.end(tree, directive, BlockKind::File),
            SIMULATION => self.simulation(tree, directive, false),
            SIMULATION_START => self.simulation(tree, directive, true),
            SIMULATION_END => self.end(tree, directive, BlockKind::Simulation),
            _ => Ok(None),
        }
    }
}

fn check_options(directive: &Directive, allowed: &[&str]) -> Result<(), ParseError> {
    for key in directive.options.keys() {
        if !allowed.contains(&key) {
            return Err(ParseError::new(
                ParseErrorKind::UnknownOption {
                    directive: directive.name.clone(),
                    option: key.to_string(),
                },
                directive.span.clone(),
                directive.source_id,
            )
            .with_note(format!("'{}' accepts: {}", directive.name, allowed.join(", "))));
        }
        if FLAGS.contains(&key) && directive.options.get(key).is_some() {
            return Err(ParseError::new(
                ParseErrorKind::Invalid(format!(
                    "option ':{}:' of directive '{}' is a flag and takes no value",
                    key, directive.name
                )),
                directive.span.clone(),
                directive.source_id,
            ));
        }
    }
    for key in ["label", "class"] {
        if directive.options.has(key) && directive.options.get(key).is_none() {
            return Err(ParseError::new(
                ParseErrorKind::MissingOptionValue {
                    directive: directive.name.clone(),
                    option: key.to_string(),
                },
                directive.span.clone(),
                directive.source_id,
            ));
        }
    }
    Ok(())
}

fn label_for(directive: &Directive, kind: BlockKind, serial: u64) -> String {
    match directive.options.get("label") {
        Some(label) => label.to_string(),
        None => format!("{}-{}-{}", directive.doc, kind, serial),
    }
}

/// The directive name, then any author classes.
fn classes_for(directive: &Directive) -> Vec<String> {
    let mut classes = vec![directive.name.clone()];
    if let Some(extra) = directive.options.get("class") {
        classes.extend(extra.split_whitespace().map(str::to_string));
    }
    classes
}
