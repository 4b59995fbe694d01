use std::fmt;
use std::str::FromStr;

/// What the resolver needs to know about the output being built.
pub trait OutputTarget {
    /// Static renderers without native cross-document numbering: numbers
    /// are embedded into titles and numbered references spelled out.
    fn is_latex_like(&self) -> bool;

    /// URI of document `to` as seen from document `from`.
    fn relative_uri(&self, from: &str, to: &str) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Html,
    Latex,
}

impl OutputFormat {
    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Latex => "latex",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(OutputFormat::Html),
            "latex" | "pdf" => Ok(OutputFormat::Latex),
            other => Err(format!("unknown output format '{}' (expected html or latex)", other)),
        }
    }
}

impl OutputTarget for OutputFormat {
    fn is_latex_like(&self) -> bool {
        matches!(self, OutputFormat::Latex)
    }

    fn relative_uri(&self, from: &str, to: &str) -> String {
        match self {
            OutputFormat::Html => html_relative_uri(from, to),
            OutputFormat::Latex => format!("%{}", to),
        }
    }
}

/// Relative path between two documents' HTML pages; empty for the same page.
fn html_relative_uri(from: &str, to: &str) -> String {
    if from == to {
        return String::new();
    }
    let mut from_dirs: Vec<&str> = from.split('/').collect();
    from_dirs.pop();
    let to_parts: Vec<&str> = to.split('/').collect();

    let common = from_dirs
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count()
        .min(to_parts.len() - 1);

    let mut uri = "../".repeat(from_dirs.len() - common);
    uri.push_str(&to_parts[common..].join("/"));
    uri.push_str(".html");
    uri
}
