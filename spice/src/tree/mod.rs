pub mod display;
pub mod inline;
pub mod reference;

use std::ops::RangeBounds;

pub use display::TreeDisplay;
pub use inline::{Inline, contains_math, plain_text};
pub use reference::{NumberReference, RefKind, Reference};

use crate::block::{Block, EndMarker};

/// Stable handle to a node in a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A block-level node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Root,
    /// Content container of a block.
    Section,
    Paragraph(Vec<Inline>),
    Heading {
        level: u8,
        content: Vec<Inline>,
    },
    CodeBlock {
        language: Option<String>,
        content: String,
    },
    Blockquote,
    List {
        start: Option<u64>,
    },
    Item,
    Rule,
    Block(Block),
    /// Opening half of a gated pair. Never survives merging.
    Start(Block),
    /// Closing half of a gated pair. Never survives merging.
    End(EndMarker),
}

impl Node {
    /// The block carried by a `Block` or `Start` node.
    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Node::Block(block) | Node::Start(block) => Some(block),
            _ => None,
        }
    }

    pub fn is_gated(&self) -> bool {
        matches!(self, Node::Start(_) | Node::End(_))
    }
}

#[derive(Debug, Clone)]
struct Slot {
    node: Node,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed document tree.
///
/// Nodes are never freed: detaching a node only unlinks it from its parent,
/// so every `NodeId` handed out stays valid for the lifetime of the tree.
#[derive(Debug, Clone)]
pub struct Tree {
    slots: Vec<Slot>,
}

/// Owned structural view of a subtree, independent of arena indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    pub node: Node,
    pub children: Vec<Outline>,
}

impl Default for Tree {
    fn default() -> Self {
        Tree::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Tree::with_root(Node::Root)
    }

    pub fn with_root(node: Node) -> Self {
        Tree {
            slots: vec![Slot {
                node,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Allocate a detached node.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            node,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.slots[id.0].node
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.slots[id.0].node
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slots[id.0].children
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.slots[child.0].parent = Some(parent);
        self.slots[parent.0].children.push(child);
    }

    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.slots[id.0].parent.take() {
            self.slots[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Put `new` into the sibling slot held by `old`; `old` ends up detached.
    /// Does nothing when `old` has no parent.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        self.detach(new);
        let Some(parent) = self.parent(old) else {
            return;
        };
        let Some(idx) = self.index_in_parent(old) else {
            return;
        };
        self.slots[parent.0].children[idx] = new;
        self.slots[new.0].parent = Some(parent);
        self.slots[old.0].parent = None;
    }

    /// Unlink a range of `parent`'s children, returning them in order.
    pub fn remove_range(&mut self, parent: NodeId, range: impl RangeBounds<usize>) -> Vec<NodeId> {
        let removed: Vec<NodeId> = self.slots[parent.0].children.drain(range).collect();
        for id in &removed {
            self.slots[id.0].parent = None;
        }
        removed
    }

    /// All nodes below `id` in document (pre-)order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Deep copy of the subtree rooted at `id` as a new, independent tree.
    pub fn subtree(&self, id: NodeId) -> Tree {
        let mut copy = Tree::with_root(self.node(id).clone());
        let root = copy.root();
        self.copy_children(id, &mut copy, root);
        copy
    }

    fn copy_children(&self, from: NodeId, into: &mut Tree, to: NodeId) {
        for &child in self.children(from) {
            let new = into.alloc(self.node(child).clone());
            into.append(to, new);
            self.copy_children(child, into, new);
        }
    }

    pub fn outline(&self, id: NodeId) -> Outline {
        Outline {
            node: self.node(id).clone(),
            children: self.children(id).iter().map(|&c| self.outline(c)).collect(),
        }
    }

    /// Visit every inline reachable from the root, outermost first. Block
    /// titles and subtitles are included.
    pub fn visit_inlines_mut(&mut self, mut f: impl FnMut(&mut Inline)) {
        for id in self.descendants(self.root()) {
            match &mut self.slots[id.0].node {
                Node::Paragraph(content) | Node::Heading { content, .. } => {
                    inline::visit_mut(content, &mut f);
                }
                Node::Block(Block::File(file)) | Node::Start(Block::File(file)) => {
                    if let Some(subtitle) = &mut file.subtitle {
                        inline::visit_mut(subtitle, &mut f);
                    }
                    inline::visit_mut(&mut file.title, &mut f);
                }
                Node::Block(Block::Simulation(sim)) | Node::Start(Block::Simulation(sim)) => {
                    inline::visit_mut(&mut sim.title, &mut f);
                }
                _ => {}
            }
        }
    }

    pub fn display(&self, id: NodeId) -> TreeDisplay<'_> {
        TreeDisplay::new(self, id)
    }
}
