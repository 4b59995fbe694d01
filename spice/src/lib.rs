pub mod block;
pub mod parser;
pub mod tree;

use crate::tree::Tree;

/// A parsed source document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Document name (source path without extension, `/`-separated).
    pub name: String,
    /// The document tree. Node 0 is the root.
    pub tree: Tree,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
    /// Set when inlined content from another document carries math.
    pub requires_math: bool,
}

impl Document {
    pub fn new(name: impl Into<String>, tree: Tree, source_id: usize) -> Self {
        Document {
            name: name.into(),
            tree,
            source_id,
            requires_math: false,
        }
    }
}
