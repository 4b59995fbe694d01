use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use resolver::{Build, BuildConfig, Diagnostic, OutputFormat};
use spice::parser::line_of;

use crate::render_documents;

#[derive(Debug, Deserialize)]
pub struct ExpectedWarning {
    pub contains: String,

    /// 1-based line, within the document that raised the warning, where
    /// its span starts.
    #[serde(default)]
    pub line: Option<usize>,
}

/// Frontmatter of a `.test.md` fixture.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestConfig {
    pub description: Option<String>,

    /// "html" unless given.
    pub format: Option<String>,

    pub hide_simulations: bool,

    /// Rendered documents, compared after trimming.
    pub expect_output: Option<String>,

    /// Substring of one of the fatal build diagnostics.
    pub expect_error: Option<String>,

    pub expect_parse_error: bool,

    /// When present the warning list must match it entry for entry,
    /// so an empty list asserts a clean build.
    pub expect_warnings: Option<Vec<ExpectedWarning>>,
}

const FENCE: &str = "---";

/// Split a fixture into its TOML frontmatter and the Markdown body that
/// follows the closing fence.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut lines = content.split_inclusive('\n');
    let opening = lines.next().unwrap_or_default();
    if opening.trim_end() != FENCE {
        return Err(format!("fixture must open with a `{}` line", FENCE));
    }

    let mut offset = opening.len();
    let mut body_start = None;
    for line in lines {
        if line.trim_end() == FENCE {
            body_start = Some(offset + line.len());
            break;
        }
        offset += line.len();
    }
    let body_start = body_start.ok_or_else(|| format!("frontmatter is never closed by `{}`", FENCE))?;

    let frontmatter = &content[opening.len()..offset];
    let config = toml::from_str(frontmatter).map_err(|e| format!("invalid frontmatter: {}", e))?;
    Ok((config, &content[body_start..]))
}

const DOCUMENT_MARKER: &str = "<!-- document:";

/// Split a fixture body into named documents at `<!-- document: name -->`
/// lines. A body without markers is a single document named "index".
fn split_documents(source: &str) -> Vec<(String, &str)> {
    let mut documents = Vec::new();
    let mut current: Option<(String, usize)> = None;
    let mut offset = 0;

    for line in source.split_inclusive('\n') {
        let trimmed = line.trim();
        if let Some(name) = trimmed
            .strip_prefix(DOCUMENT_MARKER)
            .and_then(|rest| rest.strip_suffix("-->"))
        {
            if let Some((prev, start)) = current.take() {
                documents.push((prev, &source[start..offset]));
            }
            current = Some((name.trim().to_string(), offset + line.len()));
        }
        offset += line.len();
    }

    match current {
        Some((name, start)) => documents.push((name, &source[start..])),
        None => documents.push(("index".to_string(), source)),
    }
    documents
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path) -> TestResult {
    let mut description = None;
    let outcome = match evaluate(path, &mut description) {
        Ok(()) => TestOutcome::Pass,
        Err(reason) => TestOutcome::Fail(reason),
    };
    TestResult {
        path: path.to_path_buf(),
        description,
        outcome,
    }
}

/// Build the fixture at `path` and compare the result against its
/// frontmatter. The fixture's description is stored as soon as it is known.
fn evaluate(path: &Path, description: &mut Option<String>) -> Result<(), String> {
    let content = std::fs::read_to_string(path).map_err(|e| format!("unreadable fixture: {}", e))?;
    let (config, body) = parse_test_file(&content)?;
    description.clone_from(&config.description);

    let format = match &config.format {
        Some(name) => name.parse::<OutputFormat>()?,
        None => OutputFormat::default(),
    };
    let mut build = Build::new(
        BuildConfig {
            hide_simulations: config.hide_simulations,
            ..BuildConfig::default()
        },
        format,
    );

    let documents = split_documents(body);
    let parse_errors: Vec<String> = documents
        .iter()
        .enumerate()
        .filter_map(|(id, (name, text))| build.add_document(name, text, id).err())
        .flatten()
        .map(|e| e.message())
        .collect();

    match (config.expect_parse_error, parse_errors.is_empty()) {
        (true, true) => return Err("documents parsed cleanly but a parse error was expected".into()),
        (true, false) => return Ok(()),
        (false, false) => return Err(format!("parse failed: {}", parse_errors.join("; "))),
        (false, true) => {}
    }

    let output = match build.run() {
        Ok(output) => output,
        Err(failure) => {
            let messages: Vec<String> = failure.errors().map(|d| d.to_string()).collect();
            return match &config.expect_error {
                Some(wanted) if messages.iter().any(|m| m.contains(wanted.as_str())) => Ok(()),
                Some(wanted) => Err(format!(
                    "no build error mentions \"{}\"; errors were: {}",
                    wanted,
                    messages.join("; ")
                )),
                None => Err(format!("build failed: {}", messages.join("; "))),
            };
        }
    };
    if let Some(wanted) = &config.expect_error {
        return Err(format!("build succeeded, expected an error mentioning \"{}\"", wanted));
    }

    if let Some(expected) = &config.expect_output {
        let rendered = render_documents(&output.documents, &format);
        if rendered.trim() != expected.trim() {
            return Err(format!(
                "rendered output differs\n  expected:\n{}\n  rendered:\n{}",
                expected.trim(),
                rendered.trim()
            ));
        }
    }

    match &config.expect_warnings {
        Some(expected) => check_warnings(&documents, &output.diagnostics, expected),
        None => Ok(()),
    }
}

/// Compare raised warnings, in order, against the fixture's expectations.
fn check_warnings(
    documents: &[(String, &str)],
    diagnostics: &[Diagnostic],
    expected: &[ExpectedWarning],
) -> Result<(), String> {
    let raised: Vec<&Diagnostic> = diagnostics.iter().filter(|d| d.is_warning()).collect();

    if raised.len() != expected.len() {
        let listing = raised.iter().fold(String::new(), |mut acc, w| {
            acc.push_str(&format!("\n    {}", w));
            acc
        });
        return Err(format!(
            "{} warning(s) raised where {} were expected:{}",
            raised.len(),
            expected.len(),
            if listing.is_empty() { "\n    (none)" } else { &listing }
        ));
    }

    for (n, (warning, want)) in raised.iter().zip(expected).enumerate() {
        let text = warning.to_string();
        if !text.contains(&want.contains) {
            return Err(format!("warning #{} lacks \"{}\": {}", n + 1, want.contains, text));
        }

        let Some(want_line) = want.line else {
            continue;
        };
        let source = documents
            .iter()
            .find_map(|(name, text)| (*name == warning.doc).then_some(*text));
        let line = warning.span.as_ref().zip(source).map(|(span, src)| line_of(src, span.start));
        match line {
            Some(line) if line == want_line => {}
            Some(line) => {
                return Err(format!("warning #{} is on line {}, not {}", n + 1, line, want_line));
            }
            None => {
                return Err(format!("warning #{} has no location to compare with line {}", n + 1, want_line));
            }
        }
    }
    Ok(())
}

/// Fixture files under `root` grouped by subfolder; files directly in
/// `root` fall under "". A single file is its own uncategorized group.
fn discover(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    if root.is_file() {
        groups.insert(String::new(), vec![root.to_path_buf()]);
        return groups;
    }
    walk(root, root, &mut groups);
    for files in groups.values_mut() {
        files.sort();
    }
    groups
}

fn walk(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for path in entries.flatten().map(|entry| entry.path()) {
        if path.is_dir() {
            walk(&path, root, out);
            continue;
        }
        let is_fixture = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".test.md"));
        if is_fixture {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn category_name(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// Print the categories found under `path`.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("{} is a single fixture", path.display());
        return;
    }
    let groups = discover(path);
    if groups.is_empty() {
        eprintln!("{}: no fixtures", path.display());
        return;
    }
    eprintln!("categories under {}:", path.display());
    for (category, files) in &groups {
        eprintln!("  {} ({} tests)", category_name(category), files.len());
    }
}

/// Keep the groups named in `wanted` (and their subfolders); all of them
/// when `wanted` is empty.
fn select<'a>(
    groups: &'a BTreeMap<String, Vec<PathBuf>>,
    wanted: &[String],
) -> Vec<(&'a str, &'a [PathBuf])> {
    if wanted.is_empty() {
        return groups.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
    }
    let mut selected = BTreeMap::new();
    for requested in wanted {
        let name = requested.trim_matches('/');
        let prefix = format!("{}/", name);
        let mut found = false;
        for (category, files) in groups {
            if category == name || category.starts_with(&prefix) {
                selected.insert(category.as_str(), files.as_slice());
                found = true;
            }
        }
        if !found {
            let available: Vec<&str> = groups.keys().map(|k| category_name(k)).collect();
            eprintln!(
                "skipping unknown category '{}'; known: {}",
                name,
                available.join(", ")
            );
        }
    }
    selected.into_iter().collect()
}

struct Style {
    color: bool,
}

impl Style {
    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    fn pass(&self) -> String {
        self.paint("32", "PASS")
    }

    fn fail(&self) -> String {
        self.paint("31", "FAIL")
    }
}

/// Run the fixtures under `path` (a directory or a single file), optionally
/// limited to `categories`. Returns the process exit code.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let style = Style { color: !no_color };
    let groups = discover(path);
    if groups.is_empty() {
        eprintln!("{}: no fixtures", path.display());
        return 1;
    }
    let selected = select(&groups, if path.is_file() { &[] } else { categories });
    if selected.is_empty() {
        eprintln!("none of the requested categories exist");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();
    for (category, files) in selected {
        if !path.is_file() {
            eprintln!();
            eprintln!("{}", style.paint("1", category_name(category)));
        }
        for file in files {
            let result = run_single_test(file);
            let label = result
                .description
                .clone()
                .unwrap_or_else(|| file.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default());
            match result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", style.pass(), label);
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", style.fail(), label);
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for failure in &failures {
            eprintln!();
            eprintln!("  --- {} ---", failure.path.display());
            if let TestOutcome::Fail(reason) = &failure.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!("test result: {}. {} passed, 0 failed", style.paint("32", "ok"), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            style.paint("31", "FAILED"),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}
