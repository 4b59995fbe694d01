use crate::error::{BuildError, Diagnostic};
use crate::gated::{GatedRecord, GatedTracker, Token};

/// Count disjoint adjacent `S E` pairs, scanning left to right.
pub fn count_adjacent_pairs(sequence: &[Token]) -> usize {
    let mut count = 0;
    let mut i = 0;
    while i + 1 < sequence.len() {
        if sequence[i] == Token::Start && sequence[i + 1] == Token::End {
            count += 1;
            i += 2;
        } else {
            i += 1;
        }
    }
    count
}

/// Check one document's markers of one kind.
///
/// Only sequences made of disjoint contiguous `SE` pairs pass; `SSEE` and
/// any other nesting is rejected even though the counts agree. A labelled
/// end must carry the label of the start it closes.
pub fn check_structure(record: &GatedRecord) -> Result<(), BuildError> {
    let starts = record.starts.len();
    let ends = record.ends.len();
    let doc = record.doc.clone();
    let kind = record.kind;
    let structure = record.messages.clone();

    if starts > ends {
        return Err(BuildError::MissingEnd {
            doc,
            kind,
            structure,
        });
    }
    if starts < ends {
        return Err(BuildError::MissingStart {
            doc,
            kind,
            structure,
        });
    }
    if count_adjacent_pairs(&record.sequence) != starts {
        return Err(BuildError::NestedOrInterleaved {
            doc,
            kind,
            structure,
        });
    }

    // Pairs are disjoint and in order, so the n-th end closes the n-th start.
    for (start_label, end_label) in record.start_labels.iter().zip(&record.end_labels) {
        if let Some(end_label) = end_label {
            if end_label != start_label {
                return Err(BuildError::MismatchedLabel {
                    doc,
                    kind,
                    start_label: start_label.clone(),
                    end_label: end_label.clone(),
                    structure,
                });
            }
        }
    }
    Ok(())
}

/// Check every record in the tracker and collect one error per bad record.
pub fn validate_gating(tracker: &GatedTracker) -> Vec<Diagnostic> {
    let mut errors = Vec::new();
    for record in tracker.records() {
        if let Err(error) = check_structure(record) {
            tracing::debug!(
                doc = %record.doc,
                kind = %record.kind,
                sequence = %record.sequence_string(),
                "malformed gated directives"
            );
            errors.push(Diagnostic::error(error, &record.doc, record.source_id));
        }
    }
    errors
}
