use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    UnknownOption { directive: String, option: String },
    MissingOptionValue { directive: String, option: String },
    MissingArgument { directive: String },
    UnexpectedArgument { directive: String },
    Invalid(String),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::UnknownOption { directive, option } => {
                write!(f, "unknown option ':{}:' for directive '{}'", option, directive)
            }
            ParseErrorKind::MissingOptionValue { directive, option } => {
                write!(f, "option ':{}:' of directive '{}' requires a value", option, directive)
            }
            ParseErrorKind::MissingArgument { directive } => {
                write!(f, "directive '{}' requires an argument", directive)
            }
            ParseErrorKind::UnexpectedArgument { directive } => {
                write!(f, "directive '{}' takes no argument", directive)
            }
            ParseErrorKind::Invalid(msg) => write!(f, "{}", msg),
        }
    }
}

/// Parse errors with source location information.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Range<usize>,
    pub file_id: usize,
    pub notes: Vec<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Range<usize>, file_id: usize) -> Self {
        ParseError {
            kind,
            span,
            file_id,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::new(Severity::Error)
            .with_message(self.message())
            .with_labels(vec![Label::primary(self.file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for ParseError {}
