use std::collections::HashMap;
use std::ops::Range;

use spice::block::{Block, BlockKind};
use spice::tree::{NodeId, Tree};

/// A registered block: where it came from and an independent copy of it.
#[derive(Debug, Clone)]
pub struct Entry {
    pub kind: BlockKind,
    pub source_doc: String,
    pub source_id: usize,
    pub span: Range<usize>,
    snapshot: Tree,
}

impl Entry {
    /// The snapshot's block, whether it was taken from a gated start or not.
    pub fn block(&self) -> Option<&Block> {
        self.snapshot.node(self.snapshot.root()).as_block()
    }

    pub fn snapshot(&self) -> &Tree {
        &self.snapshot
    }
}

/// Build-scoped map from label to registered block.
///
/// The registry owns its snapshots. Mutating a live tree node never
/// changes an entry; `update_snapshot` is the only way to reconcile them.
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<String, Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Register a deep copy of `node` under `label`. The first registration
    /// wins: returns `true` (and stores nothing) if `label` is taken.
    pub fn register(
        &mut self,
        label: &str,
        kind: BlockKind,
        source_doc: &str,
        source_id: usize,
        tree: &Tree,
        node: NodeId,
    ) -> bool {
        if self.entries.contains_key(label) {
            return true;
        }
        let snapshot = tree.subtree(node);
        let span = snapshot
            .node(snapshot.root())
            .as_block()
            .map(|b| b.span().clone())
            .unwrap_or(0..0);
        self.entries.insert(
            label.to_string(),
            Entry {
                kind,
                source_doc: source_doc.to_string(),
                source_id,
                span,
                snapshot,
            },
        );
        false
    }

    pub fn lookup(&self, label: &str) -> Option<&Entry> {
        self.entries.get(label)
    }

    /// Replace the stored snapshot for `label` with a copy of `node`.
    /// Returns `false` if nothing is registered under `label`.
    pub fn update_snapshot(&mut self, label: &str, tree: &Tree, node: NodeId) -> bool {
        match self.entries.get_mut(label) {
            Some(entry) => {
                entry.snapshot = tree.subtree(node);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
