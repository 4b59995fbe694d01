use std::collections::HashMap;

use spice::Document;
use spice::block::{Block, BlockKind, DisplayNumber};
use spice::tree::Node;

/// Display numbers, owned by whoever renders the output.
pub trait Numbering {
    /// Called once, after gated blocks are merged.
    fn assign(&mut self, documents: &[Document]);

    fn display_number(&self, label: &str, kind: BlockKind) -> Option<DisplayNumber>;
}

/// Numbers visible numbered file blocks 1..n in build order.
#[derive(Debug, Default)]
pub struct SequentialNumbering {
    numbers: HashMap<(BlockKind, String), DisplayNumber>,
}

impl Numbering for SequentialNumbering {
    fn assign(&mut self, documents: &[Document]) {
        self.numbers.clear();
        let mut next = 1;
        for document in documents {
            let tree = &document.tree;
            for id in tree.descendants(tree.root()) {
                if let Node::Block(Block::File(file)) = tree.node(id) {
                    if file.numbered && !file.hidden {
                        self.numbers.insert(
                            (BlockKind::File, file.label.clone()),
                            DisplayNumber::single(next),
                        );
                        next += 1;
                    }
                }
            }
        }
        tracing::trace!(count = self.numbers.len(), "assigned display numbers");
    }

    fn display_number(&self, label: &str, kind: BlockKind) -> Option<DisplayNumber> {
        self.numbers.get(&(kind, label.to_string())).cloned()
    }
}
