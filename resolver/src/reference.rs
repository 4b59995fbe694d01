use spice::Document;
use spice::block::{Block, BlockKind};
use spice::tree::reference::{GENERIC_CLASS, NUMBERED_CLASS};
use spice::tree::{Inline, NumberReference, RefKind, Reference, plain_text};

use crate::context::BuildContext;
use crate::title::{self, Resolution};

/// Upgrade generic references with no text of their own to numbered ones
/// when they point at a numbered file block.
pub fn upgrade_references(ctx: &BuildContext, doc: &mut Document) {
    let mut upgraded = 0;
    doc.tree.visit_inlines_mut(|inline| {
        if let Inline::Reference(reference) = inline {
            if upgrade(ctx, reference) {
                upgraded += 1;
            }
        }
    });
    tracing::debug!(doc = %doc.name, upgraded, "upgraded references");
}

fn upgrade(ctx: &BuildContext, reference: &mut Reference) -> bool {
    if reference.kind != RefKind::Generic || reference.explicit {
        return false;
    }
    let numbered = ctx
        .registry
        .lookup(&reference.target)
        .and_then(|entry| entry.block())
        .is_some_and(Block::is_numbered);
    if !numbered {
        return false;
    }

    reference.kind = RefKind::Numbered;
    reference.classes.retain(|c| c != GENERIC_CLASS);
    reference.classes.push(NUMBERED_CLASS.to_string());
    let content = std::mem::take(&mut reference.content);
    reference.content = vec![Inline::Literal(content)];
    true
}

/// What a reference's target turned out to be, detached from the registry.
enum Target {
    /// A numbered file block in another document.
    ForeignNumberedFile { doc: String, label: String },
    Simulation,
    Other,
}

fn classify(ctx: &BuildContext, target: &str, current_doc: &str) -> Target {
    let Some(entry) = ctx.registry.lookup(target) else {
        return Target::Other;
    };
    match entry.block() {
        Some(Block::File(file)) if file.numbered && entry.source_doc != current_doc => {
            Target::ForeignNumberedFile {
                doc: entry.source_doc.clone(),
                label: file.label.clone(),
            }
        }
        Some(Block::Simulation(_)) => Target::Simulation,
        _ => Target::Other,
    }
}

/// Final pass over references: spell out cross-document numbered
/// references for latex-like output and give references to simulation
/// blocks their composed title as text.
pub fn resolve_link_text(ctx: &mut BuildContext, doc: &mut Document) {
    let doc_name = doc.name.clone();
    let latex = ctx.is_latex_like();

    doc.tree.visit_inlines_mut(|inline| {
        let Inline::Reference(reference) = inline else {
            return;
        };
        // Titles copied from a later document still hold generic references.
        upgrade(ctx, reference);
        let replacement = match classify(ctx, &reference.target, &doc_name) {
            Target::ForeignNumberedFile { doc, label } => {
                if !latex || reference.kind != RefKind::Numbered {
                    return;
                }
                let Some(number) = ctx.numbering.display_number(&label, BlockKind::File) else {
                    return;
                };
                Inline::NumberReference(NumberReference {
                    target: reference.target.clone(),
                    doc,
                    number: number.to_string(),
                    content: std::mem::take(&mut reference.content),
                })
            }
            Target::Simulation => {
                let target = reference.target.clone();
                if let Some(Resolution::Resolved(title)) =
                    title::simulation_title(ctx, &target, &doc_name)
                {
                    reference.content = vec![Inline::Text(plain_text(&title.inlines))];
                }
                return;
            }
            Target::Other => return,
        };
        *inline = replacement;
    });
}
