use spice::Document;
use spice::parser::{ParseError, Parser};

use crate::context::{BuildConfig, BuildContext};
use crate::directive::Directives;
use crate::error::{BuildError, BuildFailure, Diagnostic};
use crate::numbering::{Numbering, SequentialNumbering};
use crate::target::OutputTarget;
use crate::{merge, reference, title, validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Runs once, over the whole build.
    Build,
    /// Runs once per document.
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ValidateGating,
    MergeGated,
    AssignNumbers,
    UpgradeReferences,
    ResolveFileTitles,
    ResolveSimulationTitles,
    ResolveLinkText,
}

/// Every phase, in execution order.
pub const PIPELINE: &[Phase] = &[
    Phase::ValidateGating,
    Phase::MergeGated,
    Phase::AssignNumbers,
    Phase::UpgradeReferences,
    Phase::ResolveFileTitles,
    Phase::ResolveSimulationTitles,
    Phase::ResolveLinkText,
];

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::ValidateGating => "validate-gating",
            Phase::MergeGated => "merge-gated",
            Phase::AssignNumbers => "assign-numbers",
            Phase::UpgradeReferences => "upgrade-references",
            Phase::ResolveFileTitles => "resolve-file-titles",
            Phase::ResolveSimulationTitles => "resolve-simulation-titles",
            Phase::ResolveLinkText => "resolve-link-text",
        }
    }

    pub fn scope(self) -> Scope {
        match self {
            Phase::ValidateGating | Phase::AssignNumbers => Scope::Build,
            _ => Scope::Document,
        }
    }
}

/// Result of a successful build.
#[derive(Debug)]
pub struct BuildOutput {
    pub documents: Vec<Document>,
    /// Warnings, in the order they were raised.
    pub diagnostics: Vec<Diagnostic>,
}

/// A build: parse documents one by one, then run the pipeline.
pub struct Build {
    ctx: BuildContext,
    documents: Vec<Document>,
}

impl Build {
    pub fn new(config: BuildConfig, target: impl OutputTarget + 'static) -> Self {
        Build::with_numbering(config, Box::new(target), Box::new(SequentialNumbering::default()))
    }

    pub fn with_numbering(
        config: BuildConfig,
        target: Box<dyn OutputTarget>,
        numbering: Box<dyn Numbering>,
    ) -> Self {
        Build {
            ctx: BuildContext::new(config, target, numbering),
            documents: Vec::new(),
        }
    }

    /// Parse one document. Documents are processed in the order added.
    pub fn add_document(&mut self, name: &str, source: &str, source_id: usize) -> Result<(), Vec<ParseError>> {
        let parser = Parser::new(name, source.to_string(), source_id);
        let mut directives = Directives::new(&mut self.ctx);
        let document = parser.parse(&mut directives)?;
        tracing::debug!(doc = %name, "parsed document");
        self.documents.push(document);
        Ok(())
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Run every phase. Consecutive document phases run as a group: all of
    /// them for one document before moving to the next.
    pub fn run(mut self) -> Result<BuildOutput, BuildFailure> {
        let mut i = 0;
        while i < PIPELINE.len() {
            let phase = PIPELINE[i];
            match phase.scope() {
                Scope::Build => {
                    self.run_build_phase(phase)?;
                    i += 1;
                }
                Scope::Document => {
                    let end = PIPELINE[i..]
                        .iter()
                        .position(|p| p.scope() != Scope::Document)
                        .map_or(PIPELINE.len(), |n| i + n);
                    let group = &PIPELINE[i..end];
                    let mut errors = Vec::new();
                    for doc in &mut self.documents {
                        for &phase in group {
                            errors.extend(run_document_phase(&mut self.ctx, doc, phase));
                        }
                    }
                    if !errors.is_empty() {
                        return Err(self.fail(errors));
                    }
                    i = end;
                }
            }
        }

        Ok(BuildOutput {
            documents: self.documents,
            diagnostics: self.ctx.diagnostics,
        })
    }

    fn run_build_phase(&mut self, phase: Phase) -> Result<(), BuildFailure> {
        tracing::debug!(phase = phase.name(), "running build phase");
        match phase {
            Phase::ValidateGating => {
                let errors = validate::validate_gating(&self.ctx.gated);
                if !errors.is_empty() {
                    return Err(self.fail(errors));
                }
            }
            Phase::AssignNumbers => self.ctx.numbering.assign(&self.documents),
            _ => {}
        }
        Ok(())
    }

    /// Abort with `errors`, keeping the warnings raised so far.
    fn fail(&mut self, errors: Vec<Diagnostic>) -> BuildFailure {
        let mut diagnostics = std::mem::take(&mut self.ctx.diagnostics);
        diagnostics.extend(errors);
        BuildFailure { diagnostics }
    }
}

/// Run one document phase. Returns the fatal errors it found.
fn run_document_phase(ctx: &mut BuildContext, doc: &mut Document, phase: Phase) -> Vec<Diagnostic> {
    tracing::debug!(phase = phase.name(), doc = %doc.name, "running document phase");
    match phase {
        Phase::MergeGated => {
            return merge::merge_gated(doc)
                .into_iter()
                .map(|unpaired| {
                    let error = BuildError::Unpaired {
                        doc: doc.name.clone(),
                        kind: unpaired.kind,
                        marker: unpaired.marker,
                    };
                    Diagnostic::error(error, &doc.name, doc.source_id).at(unpaired.span)
                })
                .collect();
        }
        Phase::UpgradeReferences => reference::upgrade_references(ctx, doc),
        Phase::ResolveFileTitles => title::resolve_file_titles(ctx, doc),
        Phase::ResolveSimulationTitles => title::resolve_simulation_titles(ctx, doc),
        Phase::ResolveLinkText => reference::resolve_link_text(ctx, doc),
        Phase::ValidateGating | Phase::AssignNumbers => {}
    }
    Vec::new()
}
