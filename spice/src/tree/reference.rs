use std::fmt;

use crate::tree::inline::Inline;

pub const GENERIC_CLASS: &str = "std-ref";
pub const NUMBERED_CLASS: &str = "std-numref";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// Plain cross-reference, written `[](#label)`.
    Generic,
    /// Numbered cross-reference, written `[](#label "numref")`.
    Numbered,
}

/// A cross-reference to a registered label.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub kind: RefKind,
    pub target: String,
    /// True when the author wrote the link text.
    pub explicit: bool,
    pub content: Vec<Inline>,
    pub classes: Vec<String>,
}

impl Reference {
    /// Build a reference; empty `content` falls back to the target label.
    pub fn new(kind: RefKind, target: impl Into<String>, content: Vec<Inline>) -> Self {
        let target = target.into();
        let explicit = !content.is_empty();
        let content = if explicit {
            content
        } else {
            vec![Inline::Text(target.clone())]
        };
        let style = match kind {
            RefKind::Generic => GENERIC_CLASS,
            RefKind::Numbered => NUMBERED_CLASS,
        };
        Reference {
            kind,
            target,
            explicit,
            content,
            classes: vec!["xref".to_string(), "std".to_string(), style.to_string()],
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for inline in &self.content {
            write!(f, "{}", inline)?;
        }
        match self.kind {
            RefKind::Generic => write!(f, "](#{})", self.target),
            RefKind::Numbered => write!(f, "](#{} \"numref\")", self.target),
        }
    }
}

/// A numbered reference with its number spelled out, for targets that
/// cannot number across documents on their own.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberReference {
    pub target: String,
    /// Document holding the target.
    pub doc: String,
    pub number: String,
    pub content: Vec<Inline>,
}

impl fmt::Display for NumberReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}](%{}#{})", self.number, self.doc, self.target)
    }
}
