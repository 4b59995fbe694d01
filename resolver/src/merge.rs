use std::ops::Range;

use spice::Document;
use spice::block::{Block, BlockKind};
use spice::tree::{Node, NodeId, Tree};

use crate::gated::Token;

/// A marker left without a partner among its siblings.
#[derive(Debug, Clone, PartialEq)]
pub struct Unpaired {
    pub kind: BlockKind,
    pub marker: Token,
    pub span: Range<usize>,
}

/// Turn every start/end pair in `doc` into a single block node holding the
/// siblings between them. Hidden blocks are dropped after merging.
///
/// A start and end that passed validation can still sit at different
/// depths. Such markers are folded away so that no `Start` or `End` node
/// survives, and returned for the caller to report.
pub fn merge_gated(doc: &mut Document) -> Vec<Unpaired> {
    let tree = &mut doc.tree;
    let starts: Vec<NodeId> = tree
        .descendants(tree.root())
        .into_iter()
        .filter(|&id| matches!(tree.node(id), Node::Start(_)))
        .collect();

    let mut unpaired = Vec::new();
    let mut merged = 0;
    for start in starts {
        if merge_one(tree, start) {
            merged += 1;
            continue;
        }
        if let Node::Start(block) = tree.node(start) {
            unpaired.push(Unpaired {
                kind: block.kind(),
                marker: Token::Start,
                span: block.span().clone(),
            });
        }
        fold_unmatched_start(tree, start);
    }

    let leftover_ends: Vec<NodeId> = tree
        .descendants(tree.root())
        .into_iter()
        .filter(|&id| matches!(tree.node(id), Node::End(_)))
        .collect();
    for end in leftover_ends {
        if let Node::End(marker) = tree.node(end) {
            unpaired.push(Unpaired {
                kind: marker.kind,
                marker: Token::End,
                span: marker.span.clone(),
            });
        }
        tree.detach(end);
    }

    tracing::debug!(doc = %doc.name, merged, unpaired = unpaired.len(), "merged gated blocks");
    unpaired
}

/// Merge one start marker with the first later sibling end marker that
/// closes it. Returns `false` if there is none.
fn merge_one(tree: &mut Tree, start: NodeId) -> bool {
    let Node::Start(block) = tree.node(start) else {
        return false;
    };
    let block = block.clone();
    let (kind, label) = (block.kind(), block.label().to_string());
    let Some(parent) = tree.parent(start) else {
        return false;
    };
    let Some(idx) = tree.index_in_parent(start) else {
        return false;
    };
    let Some(offset) = tree.children(parent)[idx + 1..]
        .iter()
        .position(|&c| matches!(tree.node(c), Node::End(end) if end.closes(kind, &label)))
    else {
        return false;
    };
    let end_idx = idx + 1 + offset;

    let (merged, content) = rebuild(tree, start, block);
    let between = tree.remove_range(parent, idx + 1..=end_idx);
    if let Some((_end, inner)) = between.split_last() {
        for &node in inner {
            tree.append(content, node);
        }
    }

    let hidden = tree.node(merged).as_block().is_some_and(|b| b.hidden());
    tree.replace(start, merged);
    if hidden {
        tree.detach(merged);
    }
    true
}

/// A start marker with no partner becomes a plain block around its own body.
fn fold_unmatched_start(tree: &mut Tree, start: NodeId) {
    let Node::Start(block) = tree.node(start) else {
        return;
    };
    let block = block.clone();
    if tree.parent(start).is_none() {
        return;
    }
    let (merged, _) = rebuild(tree, start, block);
    let hidden = tree.node(merged).as_block().is_some_and(|b| b.hidden());
    tree.replace(start, merged);
    if hidden {
        tree.detach(merged);
    }
}

/// Allocate the regular block node for a start marker and move its content
/// section over. Returns the new node and its content section.
fn rebuild(tree: &mut Tree, start: NodeId, mut block: Block) -> (NodeId, NodeId) {
    for class in block.classes_mut() {
        *class = class.replace("-start", "");
    }

    let merged = tree.alloc(Node::Block(block));
    let content = match tree.children(start).first().copied() {
        Some(section) if matches!(tree.node(section), Node::Section) => section,
        _ => tree.alloc(Node::Section),
    };
    tree.append(merged, content);
    (merged, content)
}
