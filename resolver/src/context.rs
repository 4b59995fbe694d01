use std::collections::HashMap;

use crate::error::Diagnostic;
use crate::gated::GatedTracker;
use crate::numbering::{Numbering, SequentialNumbering};
use crate::registry::Registry;
use crate::target::{OutputFormat, OutputTarget};

/// Build-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Drop every simulation block from the output.
    pub hide_simulations: bool,
    /// Fixed title text of file blocks.
    pub file_title: String,
    /// Fixed title text of simulation blocks.
    pub simulation_title: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            hide_simulations: false,
            file_title: "File".to_string(),
            simulation_title: "Simulation to".to_string(),
        }
    }
}

/// Everything one build shares between its phases.
/// Created at build start and dropped with the build.
pub struct BuildContext {
    pub config: BuildConfig,
    pub registry: Registry,
    pub gated: GatedTracker,
    pub numbering: Box<dyn Numbering>,
    pub target: Box<dyn OutputTarget>,
    /// Recoverable diagnostics, in the order they were raised.
    pub diagnostics: Vec<Diagnostic>,
    serials: HashMap<String, u64>,
}

impl BuildContext {
    pub fn new(
        config: BuildConfig,
        target: Box<dyn OutputTarget>,
        numbering: Box<dyn Numbering>,
    ) -> Self {
        BuildContext {
            config,
            registry: Registry::new(),
            gated: GatedTracker::new(),
            numbering,
            target,
            diagnostics: Vec::new(),
            serials: HashMap::new(),
        }
    }

    /// HTML output with sequential numbering.
    pub fn with_config(config: BuildConfig) -> Self {
        BuildContext::new(
            config,
            Box::new(OutputFormat::Html),
            Box::new(SequentialNumbering::default()),
        )
    }

    /// Next serial number for `doc`, starting at 0.
    pub fn next_serial(&mut self, doc: &str) -> u64 {
        let counter = self.serials.entry(doc.to_string()).or_insert(0);
        let serial = *counter;
        *counter += 1;
        serial
    }

    pub fn warn(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(doc = %diagnostic.doc, "warning: {}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    pub fn is_latex_like(&self) -> bool {
        self.target.is_latex_like()
    }
}
