use std::collections::BTreeMap;
use std::ops::Range;

use crate::parser::ParseError;
use crate::parser::structural::parse_inline;
use crate::tree::{Inline, NodeId, Tree};

/// Hook invoked by the parser for every directive fence.
pub trait DirectiveHandler {
    /// Whether `name` is a directive this handler constructs.
    fn accepts(&self, name: &str) -> bool;

    /// Build the node for a directive. `Ok(None)` emits nothing.
    fn run(&mut self, tree: &mut Tree, directive: Directive) -> Result<Option<NodeId>, ParseError>;
}

/// Handler that accepts no directives; every fence stays a code block.
pub struct NoDirectives;

impl DirectiveHandler for NoDirectives {
    fn accepts(&self, _name: &str) -> bool {
        false
    }

    fn run(&mut self, _tree: &mut Tree, _directive: Directive) -> Result<Option<NodeId>, ParseError> {
        Ok(None)
    }
}

/// A directive invocation, with its body already parsed.
#[derive(Debug, Clone)]
pub struct Directive {
    pub name: String,
    pub argument: Option<String>,
    pub options: DirectiveOptions,
    /// Detached `Section` node holding the parsed body.
    pub content: NodeId,
    pub doc: String,
    pub source_id: usize,
    pub span: Range<usize>,
    /// 1-based line of the opening fence.
    pub line: usize,
}

impl Directive {
    /// The argument parsed as inline Markdown.
    pub fn argument_inlines(&self) -> Option<Vec<Inline>> {
        self.argument.as_deref().map(parse_inline)
    }
}

/// `:key: value` options from the top of a directive body.
/// Flags (`:key:` alone) have no value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectiveOptions {
    entries: BTreeMap<String, Option<String>>,
}

impl DirectiveOptions {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(|v| v.as_deref())
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        self.entries.insert(key.into(), value);
    }
}

/// Split a fence info string `{name} argument`.
pub(crate) fn parse_info(info: &str) -> Option<(&str, Option<String>)> {
    let rest = info.trim().strip_prefix('{')?;
    let close = rest.find('}')?;
    let name = rest[..close].trim();
    if name.is_empty() {
        return None;
    }
    let argument = rest[close + 1..].trim();
    let argument = if argument.is_empty() {
        None
    } else {
        Some(argument.to_string())
    };
    Some((name, argument))
}

/// Read leading option lines. Returns the options and the byte offset
/// where the remaining body starts.
pub(crate) fn split_options(body: &str) -> (DirectiveOptions, usize) {
    let mut options = DirectiveOptions::default();
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        let Some((key, value)) = parse_option_line(line) else {
            break;
        };
        options.insert(key, value);
        offset += line.len();
    }
    (options, offset)
}

fn parse_option_line(line: &str) -> Option<(String, Option<String>)> {
    let rest = line.trim().strip_prefix(':')?;
    let end = rest.find(':')?;
    let key = &rest[..end];
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    let value = rest[end + 1..].trim();
    let value = if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    };
    Some((key.to_string(), value))
}
