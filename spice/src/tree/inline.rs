use std::fmt;

use crate::tree::reference::{NumberReference, Reference};

/// Inline elements that appear within a line of text.
/// Inline types nest freely within one another.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    CodeSpan(String),
    Math {
        source: String,
        display: bool,
    },
    /// Literal-styled wrapper used for numbered reference text.
    Literal(Vec<Inline>),
    Link {
        dest: String,
        title: String,
        content: Vec<Inline>,
    },
    Image {
        dest: String,
        title: String,
        alt: Vec<Inline>,
    },
    Reference(Reference),
    NumberReference(NumberReference),
    SoftBreak,
    HardBreak,
}

/// Flatten inline content to its text, dropping all markup.
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    push_text(inlines, &mut out);
    out
}

fn push_text(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(s) | Inline::CodeSpan(s) => out.push_str(s),
            Inline::Math { source, .. } => out.push_str(source),
            Inline::Strong(children)
            | Inline::Emphasis(children)
            | Inline::Strikethrough(children)
            | Inline::Literal(children) => push_text(children, out),
            Inline::Link { content, .. } => push_text(content, out),
            Inline::Image { alt, .. } => push_text(alt, out),
            Inline::Reference(r) => push_text(&r.content, out),
            Inline::NumberReference(r) => out.push_str(&r.number),
            Inline::SoftBreak | Inline::HardBreak => out.push(' '),
        }
    }
}

pub fn contains_math(inlines: &[Inline]) -> bool {
    inlines.iter().any(|inline| match inline {
        Inline::Math { .. } => true,
        Inline::Strong(children)
        | Inline::Emphasis(children)
        | Inline::Strikethrough(children)
        | Inline::Literal(children) => contains_math(children),
        Inline::Link { content, .. } => contains_math(content),
        _ => false,
    })
}

pub(crate) fn visit_mut(inlines: &mut [Inline], f: &mut impl FnMut(&mut Inline)) {
    for inline in inlines.iter_mut() {
        f(inline);
        match inline {
            Inline::Strong(children)
            | Inline::Emphasis(children)
            | Inline::Strikethrough(children)
            | Inline::Literal(children) => visit_mut(children, f),
            Inline::Link { content, .. } => visit_mut(content, f),
            _ => {}
        }
    }
}

fn write_all(f: &mut fmt::Formatter<'_>, inlines: &[Inline]) -> fmt::Result {
    for inline in inlines {
        write!(f, "{}", inline)?;
    }
    Ok(())
}

impl fmt::Display for Inline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inline::Text(s) => write!(f, "{}", s),
            Inline::Strong(children) => {
                write!(f, "**")?;
                write_all(f, children)?;
                write!(f, "**")
            }
            Inline::Emphasis(children) => {
                write!(f, "*")?;
                write_all(f, children)?;
                write!(f, "*")
            }
            Inline::Strikethrough(children) => {
                write!(f, "~~")?;
                write_all(f, children)?;
                write!(f, "~~")
            }
            Inline::CodeSpan(code) => write!(f, "`{}`", code),
            Inline::Math { source, display } => {
                if *display {
                    write!(f, "$${}$$", source)
                } else {
                    write!(f, "${}$", source)
                }
            }
            Inline::Literal(children) => {
                write!(f, "`")?;
                write_all(f, children)?;
                write!(f, "`")
            }
            Inline::Link { dest, content, .. } => {
                write!(f, "[")?;
                write_all(f, content)?;
                write!(f, "]({})", dest)
            }
            Inline::Image { dest, alt, .. } => {
                write!(f, "![")?;
                write_all(f, alt)?;
                write!(f, "]({})", dest)
            }
            Inline::Reference(r) => write!(f, "{}", r),
            Inline::NumberReference(r) => write!(f, "{}", r),
            Inline::SoftBreak => writeln!(f),
            Inline::HardBreak => writeln!(f),
        }
    }
}
