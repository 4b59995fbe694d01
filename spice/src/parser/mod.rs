pub mod directive;
pub mod error;
mod structural;

pub use directive::{Directive, DirectiveHandler, DirectiveOptions, NoDirectives};
pub use error::{ParseError, ParseErrorKind};
pub use structural::parse_inline;

use crate::Document;
use crate::tree::Tree;

/// Parser entry point.
pub struct Parser {
    name: String,
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(name: impl Into<String>, source: String, file_id: usize) -> Self {
        Parser {
            name: name.into(),
            source,
            file_id,
        }
    }

    /// Parse the source Markdown into a document tree, handing every
    /// directive fence to `handler`.
    pub fn parse(&self, handler: &mut dyn DirectiveHandler) -> Result<Document, Vec<ParseError>> {
        let mut tree = Tree::new();
        let root = tree.root();
        let errors =
            structural::parse_into(&self.source, &self.name, self.file_id, &mut tree, root, handler);
        if errors.is_empty() {
            Ok(Document::new(self.name.clone(), tree, self.file_id))
        } else {
            Err(errors)
        }
    }
}

/// Convert a byte offset in `source` to a 1-based line number.
pub fn line_of(source: &str, offset: usize) -> usize {
    source.as_bytes()[..offset.min(source.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}
