use std::collections::BTreeMap;

use spice::block::BlockKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Start,
    End,
}

impl Token {
    pub fn as_char(self) -> char {
        match self {
            Token::Start => 'S',
            Token::End => 'E',
        }
    }
}

/// Start/end occurrences of one block kind within one document.
#[derive(Debug, Clone)]
pub struct GatedRecord {
    pub doc: String,
    pub kind: BlockKind,
    pub source_id: usize,
    /// Positions (1-based lines) of start markers.
    pub starts: Vec<usize>,
    /// Labels of the start markers, parallel to `starts`.
    pub start_labels: Vec<String>,
    /// Positions (1-based lines) of end markers.
    pub ends: Vec<usize>,
    /// Labels given to the end markers, parallel to `ends`.
    pub end_labels: Vec<Option<String>>,
    pub sequence: Vec<Token>,
    pub messages: Vec<String>,
}

impl GatedRecord {
    fn new(doc: &str, kind: BlockKind, source_id: usize) -> Self {
        GatedRecord {
            doc: doc.to_string(),
            kind,
            source_id,
            starts: Vec::new(),
            start_labels: Vec::new(),
            ends: Vec::new(),
            end_labels: Vec::new(),
            sequence: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// The token sequence as a string such as `"SESE"`.
    pub fn sequence_string(&self) -> String {
        self.sequence.iter().map(|t| t.as_char()).collect()
    }
}

/// Per-document log of gated markers, tracked separately for each kind.
#[derive(Debug, Default)]
pub struct GatedTracker {
    records: BTreeMap<(String, BlockKind), GatedRecord>,
}

impl GatedTracker {
    pub fn new() -> Self {
        GatedTracker::default()
    }

    fn record_mut(&mut self, doc: &str, kind: BlockKind, source_id: usize) -> &mut GatedRecord {
        self.records
            .entry((doc.to_string(), kind))
            .or_insert_with(|| GatedRecord::new(doc, kind, source_id))
    }

    pub fn record_start(&mut self, doc: &str, source_id: usize, label: &str, kind: BlockKind, position: usize) {
        let record = self.record_mut(doc, kind, source_id);
        record.starts.push(position);
        record.start_labels.push(label.to_string());
        record.sequence.push(Token::Start);
        record
            .messages
            .push(format!("{}-start at position {}", kind, position));
    }

    pub fn record_end(
        &mut self,
        doc: &str,
        source_id: usize,
        label: Option<&str>,
        kind: BlockKind,
        position: usize,
    ) {
        let record = self.record_mut(doc, kind, source_id);
        record.ends.push(position);
        record.end_labels.push(label.map(str::to_string));
        record.sequence.push(Token::End);
        record
            .messages
            .push(format!("{}-end at position {}", kind, position));
    }

    pub fn get(&self, doc: &str, kind: BlockKind) -> Option<&GatedRecord> {
        self.records.get(&(doc.to_string(), kind))
    }

    /// All records of one document, one per kind that occurs in it.
    pub fn for_document<'a>(&'a self, doc: &'a str) -> impl Iterator<Item = &'a GatedRecord> + 'a {
        self.records.values().filter(move |r| r.doc == doc)
    }

    pub fn records(&self) -> impl Iterator<Item = &GatedRecord> {
        self.records.values()
    }
}
