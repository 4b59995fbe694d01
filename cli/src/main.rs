mod config;
mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

use resolver::{Build, Diagnostic, OutputFormat, OutputTarget};
use spice::Document;

use crate::config::ProjectConfig;

#[derive(Parser)]
#[command(name = "spice", version, about = "File and simulation blocks for Markdown documents")]
struct Cli {
    /// Never color diagnostics or test results
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build one or more documents and print the result
    Build(BuildArgs),

    /// Run the `.test.md` fixture suite
    Test(TestArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Html,
    Latex,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Html => OutputFormat::Html,
            FormatArg::Latex => OutputFormat::Latex,
        }
    }
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Markdown source files, in build order
    #[arg(required = true)]
    files: Vec<String>,

    /// Output format (overrides the project file)
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Drop every simulation block
    #[arg(long)]
    hide_simulations: bool,

    /// Project file (defaults to ./spice.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dump the resolved trees instead of rendering them
    #[arg(long)]
    ast: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// A fixture file, or a directory searched recursively for them
    fixtures: PathBuf,

    /// Limit the run to a subfolder (and its children); may be repeated
    #[arg(short, long)]
    category: Vec<String>,

    /// Print the fixture subfolders with their counts
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Build(build_args) => do_build(build_args, cli.no_color),
        Command::Test(args) if args.list_categories => test_runner::list_categories(&args.fixtures),
        Command::Test(args) => process::exit(test_runner::run_tests(&args.fixtures, cli.no_color, &args.category)),
    }
}

fn do_build(args: BuildArgs, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let writer = StandardStream::stderr(color_choice);
    let term_config = term::Config::default();

    let project = match ProjectConfig::discover(args.config.as_deref()) {
        Ok(project) => project,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    let mut config = project.build_config();
    if args.hide_simulations {
        config.hide_simulations = true;
    }
    let format = match args.format {
        Some(format) => format.into(),
        None => match project.output_format() {
            Ok(format) => format.unwrap_or_default(),
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        },
    };
    tracing::debug!(%format, hide_simulations = config.hide_simulations, "build configuration");

    let mut files = SimpleFiles::new();
    let mut build = Build::new(config, format);
    let mut parse_failed = false;

    for path in &args.files {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: cannot read '{}': {}", path, e);
                process::exit(1);
            }
        };
        let file_id = files.add(path.clone(), source.clone());
        if let Err(errors) = build.add_document(&document_name(path), &source, file_id) {
            for error in &errors {
                let _ = term::emit_to_write_style(
                    &mut writer.lock(),
                    &term_config,
                    &files,
                    &error.to_diagnostic(),
                );
            }
            parse_failed = true;
        }
    }
    if parse_failed {
        process::exit(1);
    }

    match build.run() {
        Ok(output) => {
            emit_diagnostics(&writer, &term_config, &files, &output.diagnostics);
            if args.ast {
                for doc in &output.documents {
                    println!("{:#?}", doc.tree.outline(doc.tree.root()));
                }
            } else {
                print!("{}", render_documents(&output.documents, &format));
            }
        }
        Err(failure) => {
            emit_diagnostics(&writer, &term_config, &files, &failure.diagnostics);
            eprintln!("error: {}", failure);
            process::exit(1);
        }
    }
}

/// Document name for a source path: the path without its extension,
/// `/`-separated.
pub(crate) fn document_name(path: &str) -> String {
    let stem = Path::new(path).with_extension("");
    let name = stem.to_string_lossy().replace('\\', "/");
    name.strip_prefix("./").unwrap_or(&name).to_string()
}

/// Render built documents. With more than one document, each is preceded
/// by a `<!-- document: name -->` line.
pub(crate) fn render_documents(documents: &[Document], target: &dyn OutputTarget) -> String {
    let overlay_numbers = !target.is_latex_like();
    let mut out = String::new();
    for doc in documents {
        if documents.len() > 1 {
            out.push_str(&format!("<!-- document: {} -->\n", doc.name));
        }
        let rendered = doc
            .tree
            .display(doc.tree.root())
            .number_titles(overlay_numbers)
            .to_string();
        out.push_str(&rendered);
    }
    out
}

fn emit_diagnostics(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    diagnostics: &[Diagnostic],
) {
    for diag in diagnostics {
        if diag.span.is_some() {
            let _ = term::emit_to_write_style(&mut writer.lock(), config, files, &diag.to_diagnostic());
        } else {
            let prefix = if diag.is_warning() { "warning" } else { "error" };
            eprintln!("{}: {}", prefix, diag);
        }
    }
}
