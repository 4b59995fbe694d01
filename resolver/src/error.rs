use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Label, Severity};
use spice::block::BlockKind;

use crate::gated::Token;

#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    DuplicateLabel {
        label: String,
        other_doc: String,
    },
    MissingEnd {
        doc: String,
        kind: BlockKind,
        structure: Vec<String>,
    },
    MissingStart {
        doc: String,
        kind: BlockKind,
        structure: Vec<String>,
    },
    NestedOrInterleaved {
        doc: String,
        kind: BlockKind,
        structure: Vec<String>,
    },
    MismatchedLabel {
        doc: String,
        kind: BlockKind,
        start_label: String,
        end_label: String,
        structure: Vec<String>,
    },
    /// A marker whose partner is not among its siblings.
    Unpaired {
        doc: String,
        kind: BlockKind,
        marker: Token,
    },
    UndefinedTarget {
        label: String,
    },
    TargetNotFile {
        label: String,
    },
}

impl BuildError {
    /// Gating errors abort the build; everything else is a warning.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BuildError::MissingEnd { .. }
                | BuildError::MissingStart { .. }
                | BuildError::NestedOrInterleaved { .. }
                | BuildError::MismatchedLabel { .. }
                | BuildError::Unpaired { .. }
        )
    }
}

fn write_structure(f: &mut fmt::Formatter<'_>, structure: &[String]) -> fmt::Result {
    for line in structure {
        write!(f, "\n  {}", line)?;
    }
    Ok(())
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::DuplicateLabel { label, other_doc } => {
                write!(f, "duplicate label: {}; other instance in {}", label, other_doc)
            }
            BuildError::MissingEnd {
                doc,
                kind,
                structure,
            } => {
                write!(f, "the document ({}) is missing a {}-end directive", doc, kind)?;
                write_structure(f, structure)
            }
            BuildError::MissingStart {
                doc,
                kind,
                structure,
            } => {
                write!(f, "the document ({}) is missing a {}-start directive", doc, kind)?;
                write_structure(f, structure)
            }
            BuildError::NestedOrInterleaved {
                doc,
                kind,
                structure,
            } => {
                write!(
                    f,
                    "the document ({}) contains nested {}-start and {}-end directives",
                    doc, kind, kind
                )?;
                write_structure(f, structure)
            }
            BuildError::MismatchedLabel {
                doc,
                kind,
                start_label,
                end_label,
                structure,
            } => {
                write!(
                    f,
                    "the document ({}) closes {}-start {} with a {}-end labelled {}",
                    doc, kind, start_label, kind, end_label
                )?;
                write_structure(f, structure)
            }
            BuildError::Unpaired {
                doc,
                kind,
                marker: Token::Start,
            } => write!(
                f,
                "the document ({}) has a {}-start directive with no {}-end at the same level",
                doc, kind, kind
            ),
            BuildError::Unpaired {
                doc,
                kind,
                marker: Token::End,
            } => write!(
                f,
                "the document ({}) has a {}-end directive with no {}-start at the same level",
                doc, kind, kind
            ),
            BuildError::UndefinedTarget { label } => write!(f, "undefined label: {}", label),
            BuildError::TargetNotFile { label } => {
                write!(f, "label {} does not refer to a file block", label)
            }
        }
    }
}

impl std::error::Error for BuildError {}

/// A build error or warning enriched with source location information.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub error: BuildError,
    pub severity: Severity,
    pub doc: String,
    pub source_id: usize,
    pub span: Option<Range<usize>>,
    /// Secondary location, e.g. the first definition of a duplicate label.
    pub related: Option<(usize, Range<usize>)>,
}

impl Diagnostic {
    pub fn warning(error: BuildError, doc: impl Into<String>, source_id: usize, span: Range<usize>) -> Self {
        Diagnostic {
            error,
            severity: Severity::Warning,
            doc: doc.into(),
            source_id,
            span: Some(span),
            related: None,
        }
    }

    pub fn error(error: BuildError, doc: impl Into<String>, source_id: usize) -> Self {
        Diagnostic {
            error,
            severity: Severity::Error,
            doc: doc.into(),
            source_id,
            span: None,
            related: None,
        }
    }

    pub fn at(mut self, span: Range<usize>) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_related(mut self, source_id: usize, span: Range<usize>) -> Self {
        self.related = Some((source_id, span));
        self
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> codespan_reporting::diagnostic::Diagnostic<usize> {
        let mut labels = Vec::new();
        if let Some(span) = &self.span {
            labels.push(Label::primary(self.source_id, span.clone()));
        }
        if let Some((source_id, span)) = &self.related {
            labels.push(Label::secondary(*source_id, span.clone()).with_message("first defined here"));
        }
        codespan_reporting::diagnostic::Diagnostic::new(self.severity)
            .with_message(self.error.to_string())
            .with_labels(labels)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for Diagnostic {}

/// Fatal outcome of a build: every gating error, plus the warnings
/// gathered before the abort.
#[derive(Debug)]
pub struct BuildFailure {
    pub diagnostics: Vec<Diagnostic>,
}

impl BuildFailure {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_warning())
    }
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error(s) occurred when checking gated directives; see the messages above",
            self.errors().count()
        )
    }
}

impl std::error::Error for BuildFailure {}
