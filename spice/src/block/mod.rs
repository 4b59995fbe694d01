pub mod number;

use std::fmt;
use std::ops::Range;

pub use number::DisplayNumber;

use crate::tree::Inline;

/// The two registrable block kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockKind {
    File,
    Simulation,
}

impl BlockKind {
    /// Directive name of the non-gated form.
    pub fn name(self) -> &'static str {
        match self {
            BlockKind::File => "file",
            BlockKind::Simulation => "simulation",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A file block, optionally taking part in display numbering.
#[derive(Debug, Clone, PartialEq)]
pub struct FileBlock {
    /// Unique label, either author supplied or `<doc>-file-<serial>`.
    pub label: String,
    /// Name of the document the block was authored in.
    pub source_doc: String,
    /// Fixed title text, e.g. "File".
    pub prefix: String,
    /// Author supplied subtitle (rich inline content).
    pub subtitle: Option<Vec<Inline>>,
    /// Title content. Holds only the prefix until the block is resolved.
    pub title: Vec<Inline>,
    /// Display number handed out by the numbering facility.
    pub number: Option<DisplayNumber>,
    pub numbered: bool,
    pub hidden: bool,
    /// Per-document counter used only to synthesize labels.
    pub serial_number: u64,
    pub classes: Vec<String>,
    pub resolved: bool,
    /// Byte span of the directive in its source.
    pub span: Range<usize>,
}

/// A simulation block pointing at a file block by label.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationBlock {
    pub label: String,
    pub source_doc: String,
    /// Label of the file block this simulation belongs to.
    pub target_label: String,
    /// Fixed title text, e.g. "Simulation to".
    pub prefix: String,
    /// Placeholder (the prefix) until resolved, then the composed title.
    pub title: Vec<Inline>,
    pub hidden: bool,
    pub serial_number: u64,
    pub classes: Vec<String>,
    pub resolved: bool,
    pub span: Range<usize>,
}

/// A registrable block.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    File(FileBlock),
    Simulation(SimulationBlock),
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::File(_) => BlockKind::File,
            Block::Simulation(_) => BlockKind::Simulation,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Block::File(b) => &b.label,
            Block::Simulation(b) => &b.label,
        }
    }

    pub fn hidden(&self) -> bool {
        match self {
            Block::File(b) => b.hidden,
            Block::Simulation(b) => b.hidden,
        }
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        match self {
            Block::File(b) => b.hidden = hidden,
            Block::Simulation(b) => b.hidden = hidden,
        }
    }

    pub fn title(&self) -> &[Inline] {
        match self {
            Block::File(b) => &b.title,
            Block::Simulation(b) => &b.title,
        }
    }

    pub fn classes(&self) -> &[String] {
        match self {
            Block::File(b) => &b.classes,
            Block::Simulation(b) => &b.classes,
        }
    }

    pub fn classes_mut(&mut self) -> &mut Vec<String> {
        match self {
            Block::File(b) => &mut b.classes,
            Block::Simulation(b) => &mut b.classes,
        }
    }

    pub fn span(&self) -> &Range<usize> {
        match self {
            Block::File(b) => &b.span,
            Block::Simulation(b) => &b.span,
        }
    }

    /// True only for file blocks taking part in numbering.
    pub fn is_numbered(&self) -> bool {
        matches!(self, Block::File(b) if b.numbered)
    }
}

/// Closes a gated span opened by a `Node::Start`.
#[derive(Debug, Clone, PartialEq)]
pub struct EndMarker {
    pub kind: BlockKind,
    /// When set, only a start marker with this label is closed.
    pub label: Option<String>,
    pub span: Range<usize>,
}

impl EndMarker {
    pub fn closes(&self, kind: BlockKind, label: &str) -> bool {
        self.kind == kind && self.label.as_deref().is_none_or(|l| l == label)
    }
}
