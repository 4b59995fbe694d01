use spice::Document;
use spice::block::{Block, BlockKind, DisplayNumber, FileBlock, SimulationBlock};
use spice::tree::{Inline, Node, contains_math};

use crate::context::BuildContext;
use crate::error::{BuildError, Diagnostic};

/// A composed title and whether it pulled math into the document.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedTitle {
    pub inlines: Vec<Inline>,
    pub uses_math: bool,
}

/// Outcome of composing a simulation title.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(ComposedTitle),
    Unresolved(BuildError),
}

/// Fill in a file block's title: the prefix, the number when the output
/// embeds numbers, and the subtitle in parentheses.
pub fn compose_file_title(file: &mut FileBlock, number: Option<DisplayNumber>, embed_number: bool) {
    if file.resolved {
        return;
    }
    let mut head = file.prefix.clone();
    if embed_number {
        if let Some(number) = &number {
            head.push_str(&format!(" {}", number));
        }
    }

    let mut title = vec![Inline::Text(head)];
    if let Some(subtitle) = &file.subtitle {
        title.push(Inline::Text(" (".to_string()));
        title.extend(subtitle.iter().cloned());
        title.push(Inline::Text(")".to_string()));
    }
    file.title = title;
    file.number = number;
    file.resolved = true;
}

/// Resolve every file block title in `doc` and refresh its snapshot.
pub fn resolve_file_titles(ctx: &mut BuildContext, doc: &mut Document) {
    let embed = ctx.is_latex_like();
    for id in doc.tree.descendants(doc.tree.root()) {
        let Node::Block(Block::File(file)) = doc.tree.node_mut(id) else {
            continue;
        };
        if file.resolved {
            continue;
        }
        let number = if file.numbered {
            ctx.numbering.display_number(&file.label, BlockKind::File)
        } else {
            None
        };
        compose_file_title(file, number, embed);
        let label = file.label.clone();
        ctx.registry.update_snapshot(&label, &doc.tree, id);
    }
}

/// Build the title of `sim` as seen from `current_doc`: its prefix followed
/// by a link to the target file block's page.
pub fn compose_simulation_title(ctx: &BuildContext, sim: &SimulationBlock, current_doc: &str) -> Resolution {
    let Some(entry) = ctx.registry.lookup(&sim.target_label) else {
        return Resolution::Unresolved(BuildError::UndefinedTarget {
            label: sim.target_label.clone(),
        });
    };
    let Some(Block::File(file)) = entry.block() else {
        return Resolution::Unresolved(BuildError::TargetNotFile {
            label: sim.target_label.clone(),
        });
    };

    let mut text = format!(" {}", file.prefix);
    if file.numbered {
        if let Some(number) = ctx.numbering.display_number(&file.label, BlockKind::File) {
            text.push_str(&format!(" {}", number));
        }
    }
    let mut content = vec![Inline::Text(text)];
    let mut uses_math = false;
    if let Some(subtitle) = &file.subtitle {
        uses_math = contains_math(subtitle);
        content.push(Inline::Text(" (".to_string()));
        content.extend(subtitle.iter().cloned());
        content.push(Inline::Text(")".to_string()));
    }

    let dest = format!(
        "{}#{}",
        ctx.target.relative_uri(current_doc, &entry.source_doc),
        file.label
    );
    Resolution::Resolved(ComposedTitle {
        inlines: vec![
            Inline::Text(sim.prefix.clone()),
            Inline::Link {
                dest,
                title: String::new(),
                content,
            },
        ],
        uses_math,
    })
}

/// Resolve every simulation title in `doc`. An unknown or non-file target
/// is reported once and the block keeps its placeholder title.
pub fn resolve_simulation_titles(ctx: &mut BuildContext, doc: &mut Document) {
    for id in doc.tree.descendants(doc.tree.root()) {
        let Node::Block(Block::Simulation(sim)) = doc.tree.node(id) else {
            continue;
        };
        if sim.resolved {
            continue;
        }
        let label = sim.label.clone();
        let span = sim.span.clone();

        match compose_simulation_title(ctx, sim, &doc.name) {
            Resolution::Resolved(title) => {
                if title.uses_math {
                    doc.requires_math = true;
                }
                if let Node::Block(Block::Simulation(sim)) = doc.tree.node_mut(id) {
                    sim.title = title.inlines;
                    sim.resolved = true;
                }
                ctx.registry.update_snapshot(&label, &doc.tree, id);
            }
            Resolution::Unresolved(error) => {
                tracing::debug!(%label, "simulation title left unresolved");
                ctx.warn(Diagnostic::warning(error, &doc.name, doc.source_id, span));
            }
        }
    }
}

/// Title of the simulation block registered as `label`, from its snapshot.
///
/// A snapshot not yet resolved is composed on the spot. The registry caches
/// the title as seen from the simulation's own document, since link
/// destinations are relative; the caller gets it as seen from `current_doc`.
/// No warning is raised here; the owning document reports a bad target when
/// its own titles are resolved.
pub fn simulation_title(ctx: &mut BuildContext, label: &str, current_doc: &str) -> Option<Resolution> {
    let entry = ctx.registry.lookup(label)?;
    let Some(Block::Simulation(sim)) = entry.block() else {
        return None;
    };
    if sim.resolved && sim.source_doc == current_doc {
        return Some(Resolution::Resolved(ComposedTitle {
            inlines: sim.title.clone(),
            uses_math: contains_math(&sim.title),
        }));
    }

    let resolution = compose_simulation_title(ctx, sim, current_doc);
    if sim.resolved {
        return Some(resolution);
    }
    if let Resolution::Resolved(own) = compose_simulation_title(ctx, sim, &sim.source_doc) {
        let mut snapshot = entry.snapshot().clone();
        let root = snapshot.root();
        if let Node::Block(Block::Simulation(cached)) | Node::Start(Block::Simulation(cached)) =
            snapshot.node_mut(root)
        {
            cached.title = own.inlines;
            cached.resolved = true;
        }
        ctx.registry.update_snapshot(label, &snapshot, root);
    }
    Some(resolution)
}
