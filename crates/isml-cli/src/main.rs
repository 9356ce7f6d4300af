mod config;

use clap::{Parser, Subcommand, ValueEnum};
use config::CliConfig;
use isml_lexer::Lexer;
use isml_parser::printer::attribute_to_source;
use isml_parser::{Diagnostic, Document, Node, ParseOptions, SourceError, TagScope};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "isml")]
#[command(about = "ISML template parser: check and inspect storefront templates")]
#[command(version)]
struct Cli {
    /// Which tags to recognize [default: isml]
    #[arg(long, value_enum, global = true)]
    scope: Option<ScopeArg>,

    /// Read settings from a TOML file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Stop recording errors after this many per template
    #[arg(long, global = true)]
    max_errors: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    /// Every tag, HTML and ISML alike
    All,
    /// Only `is*` tags; HTML stays text
    Isml,
}

impl From<ScopeArg> for TagScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::All => TagScope::All,
            ScopeArg::Isml => TagScope::Isml,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Check templates for syntax errors (directories are searched recursively)
    Check {
        /// Template files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Also print warnings
        #[arg(long)]
        warnings: bool,
    },

    /// Print the syntax tree of a template
    Ast {
        /// Input template
        path: PathBuf,

        /// Print JSON instead of an outline
        #[arg(long)]
        json: bool,
    },

    /// Print the token stream of a template
    Tokens {
        /// Input template
        path: PathBuf,
    },
}

/// Failures that stop the command before any template is reported.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{}: {source}", .path.display())]
    Source { path: PathBuf, source: SourceError },

    #[error("cannot serialize syntax tree: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    let options = config.parse_options(cli.scope.map(TagScope::from), cli.max_errors);

    match cli.command {
        Command::Check { paths, warnings } => cmd_check(&paths, &config, &options, warnings),
        Command::Ast { path, json } => cmd_ast(&path, &options, json),
        Command::Tokens { path } => cmd_tokens(&path, options.scope),
    }
}

fn read_source(path: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_file(path: &Path, options: &ParseOptions) -> Result<Document, CliError> {
    let bytes = read_source(path)?;
    let options = options.clone().with_name(path.display().to_string());
    isml_parser::parse_bytes(&bytes, &options).map_err(|source| CliError::Source {
        path: path.to_path_buf(),
        source,
    })
}

// =============================================================================
// check
// =============================================================================

fn cmd_check(
    paths: &[PathBuf],
    config: &CliConfig,
    options: &ParseOptions,
    warnings: bool,
) -> Result<ExitCode, CliError> {
    let files = collect_templates(paths, config)?;
    tracing::info!(files = files.len(), "checking templates");

    let mut failed = 0;
    for result in check_files(&files, options) {
        let doc = result?;
        let shown: Box<dyn Iterator<Item = &Diagnostic> + '_> = if warnings {
            Box::new(doc.diagnostics.iter())
        } else {
            Box::new(doc.errors())
        };
        for diagnostic in shown {
            println!("{}", diagnostic.render(doc.name.as_deref()));
        }

        let errors = doc.errors().count();
        tracing::debug!(
            file = doc.name.as_deref().unwrap_or_default(),
            errors,
            warnings = doc.warnings().count(),
            "checked template"
        );
        if errors > 0 {
            failed += 1;
        }
    }

    eprintln!("Checked {} template(s), {} with errors", files.len(), failed);
    Ok(if failed > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}

/// Parse every file on scoped worker threads, keeping input order.
fn check_files(files: &[PathBuf], options: &ParseOptions) -> Vec<Result<Document, CliError>> {
    let workers = std::thread::available_parallelism()
        .map_or(1, |n| n.get())
        .min(files.len())
        .max(1);
    let chunk_size = files.len().div_ceil(workers).max(1);

    std::thread::scope(|scope| {
        let handles: Vec<_> = files
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|path| parse_file(path, options))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    })
}

/// Expand directories into the template files below them, sorted by path.
/// Files named explicitly are kept whatever their extension.
fn collect_templates(paths: &[PathBuf], config: &CliConfig) -> Result<Vec<PathBuf>, CliError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            walk_dir(path, config, &mut files)?;
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn walk_dir(dir: &Path, config: &CliConfig, files: &mut Vec<PathBuf>) -> Result<(), CliError> {
    let io_error = |source| CliError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = std::fs::read_dir(dir)
        .map_err(io_error)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_error)?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            walk_dir(&path, config, files)?;
        } else if config.wants(&path) {
            files.push(path);
        }
    }
    Ok(())
}

// =============================================================================
// ast
// =============================================================================

fn cmd_ast(path: &Path, options: &ParseOptions, json: bool) -> Result<ExitCode, CliError> {
    let doc = parse_file(path, options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        print!("{}", outline(&doc));
    }

    for diagnostic in &doc.diagnostics {
        eprintln!("{}", diagnostic.render(doc.name.as_deref()));
    }
    Ok(if doc.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

/// One line per node, indented by depth.
fn outline(doc: &Document) -> String {
    let mut out = String::new();
    doc.walk(|node, depth| {
        let span = node.span();
        let indent = "  ".repeat(depth);
        let line = match node {
            Node::Text(text) => format!("Text {:?}", text.content),
            Node::Expression(expr) => format!("Expression {:?}", expr.raw_text),
            Node::Comment(comment) => format!("Comment {:?}", comment.content),
            Node::Element(el) => {
                let mut line = format!("Element <{}>", el.tag_name);
                for attr in &el.attributes {
                    line.push(' ');
                    line.push_str(&attribute_to_source(attr));
                }
                if el.self_closing {
                    line.push_str(" (self-closing)");
                }
                if el.implicit_close {
                    line.push_str(" (implicit close)");
                }
                line
            }
        };
        out.push_str(&format!("{indent}{line} @{}:{}\n", span.line, span.column));
    });
    out
}

// =============================================================================
// tokens
// =============================================================================

fn cmd_tokens(path: &Path, scope: TagScope) -> Result<ExitCode, CliError> {
    let bytes = read_source(path)?;
    let source = String::from_utf8(bytes).map_err(|e| CliError::Source {
        path: path.to_path_buf(),
        source: SourceError::InvalidUtf8 {
            offset: e.utf8_error().valid_up_to(),
        },
    })?;

    let mut lexer = Lexer::with_scope(&source, scope);
    for token in lexer.by_ref() {
        println!(
            "{}:{} {:?} {:?}",
            token.span.line, token.span.column, token.kind, token.lexeme
        );
    }
    for warning in lexer.take_warnings() {
        eprintln!("{}: {warning}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}
