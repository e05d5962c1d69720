//! The Magik typed-lint CLI.
//!
//! `magik-typed-lint [--types <db.jsonl>]... [--package <name>] [--json]
//! [--no-color] <files>...`
//!
//! Loads every type database, reasons over each source file and prints one
//! line per method or procedure definition with its inferred results.
//! Syntax errors and typed lint notes go to stderr. Settings may also come
//! from a `magik-lint.toml` in the working directory.
//!
//! The exit status is 1 when any file has syntax errors or trips the
//! reasoner, 2 when the run could not start, and 0 otherwise. Notes alone
//! never fail a run.

mod config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use magik_typeck::diagnostics::{render_note, render_parse_error, DiagnosticOptions};
use magik_typeck::type_db::read_types;
use magik_typeck::{analyze, DefinitionKind, DefinitionResult, TypeKeeper};

use crate::config::LintConfig;

#[derive(Parser)]
#[command(
    name = "magik-typed-lint",
    version,
    about = "Infer Magik types and report typed lint notes"
)]
struct Cli {
    /// Magik source files to analyse
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Type database to load (JSON lines). May be given more than once
    #[arg(long = "types", value_name = "FILE")]
    types: Vec<PathBuf>,

    /// Package in effect before the first `_package` statement
    #[arg(long)]
    package: Option<String>,

    /// Output definitions and diagnostics as JSON (one object per line)
    #[arg(long)]
    json: bool,

    /// Disable colorized output
    #[arg(long = "no-color")]
    no_color: bool,

    /// Config file to use instead of ./magik-lint.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Cli {
    fn flags(&self) -> LintConfig {
        LintConfig {
            types: self.types.clone(),
            package: self.package.clone(),
            json: self.json,
            no_color: self.no_color,
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let config = match settings(&cli) {
        Ok(config) => config,
        Err(e) => return fail(&e, cli.json),
    };
    let keeper = match load_types(&config.types) {
        Ok(keeper) => keeper,
        Err(e) => return fail(&e, config.json),
    };

    let options = DiagnosticOptions {
        color: !config.no_color && !config.json,
        json: config.json,
    };
    let mut clean = true;
    for path in &cli.paths {
        match lint_file(path, &keeper, config.package(), &options) {
            Ok(file_clean) => clean &= file_clean,
            Err(e) => return fail(&e, config.json),
        }
    }
    if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

/// Log to stderr, filtered by `MAGIK_LOG` (warnings by default).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("MAGIK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn settings(cli: &Cli) -> Result<LintConfig, String> {
    let file = match &cli.config {
        Some(path) => Some(LintConfig::from_file(path)?),
        None => LintConfig::discover(Path::new("."))?,
    };
    Ok(file.unwrap_or_default().overridden_by(cli.flags()))
}

fn load_types(paths: &[PathBuf]) -> Result<TypeKeeper, String> {
    let mut keeper = TypeKeeper::new();
    for path in paths {
        let summary = read_types(path, &mut keeper).map_err(|e| e.to_string())?;
        if !summary.errors.is_empty() {
            tracing::warn!(
                path = %path.display(),
                skipped = summary.errors.len(),
                "type database has unreadable lines"
            );
        }
    }
    tracing::debug!(
        exemplars = keeper.exemplar_count(),
        methods = keeper.method_count(),
        "type registry ready"
    );
    Ok(keeper)
}

/// Analyse one file and report on it. Answers whether the file was free
/// of syntax errors and reasoner failures.
fn lint_file(
    path: &Path,
    keeper: &TypeKeeper,
    package: &str,
    options: &DiagnosticOptions,
) -> Result<bool, String> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    let file_name = path.display().to_string();
    let analysis = analyze(&source, keeper, package);

    for error in &analysis.parse_errors {
        report(&render_parse_error(error, &source, &file_name, options), options);
    }
    for note in analysis.reasoning.notes() {
        report(&render_note(note, &source, &file_name, options), options);
    }
    if let Some(error) = &analysis.error {
        if options.json {
            let msg = serde_json::json!({
                "code": "R0001",
                "severity": "error",
                "message": error.to_string(),
                "file": file_name,
                "spans": [{ "start": error.span().start, "end": error.span().end, "label": "" }],
            });
            eprintln!("{}", msg);
        } else {
            eprintln!("error: {}: {}", file_name, error);
        }
    }

    for definition in analysis.reasoning.definitions() {
        println!("{}", describe(definition, keeper, &file_name, options.json));
    }
    Ok(analysis.parse_errors.is_empty() && analysis.error.is_none())
}

fn report(rendered: &str, options: &DiagnosticOptions) {
    if options.json {
        eprintln!("{}", rendered);
    } else {
        eprint!("{}", rendered);
    }
}

/// One output line for a definition.
fn describe(definition: &DefinitionResult, keeper: &TypeKeeper, file: &str, json: bool) -> String {
    let result = definition.result.display(keeper);
    let loop_result = definition.loop_result.display(keeper);
    if json {
        let kind = match definition.kind {
            DefinitionKind::Method => "method",
            DefinitionKind::Procedure => "procedure",
        };
        return serde_json::json!({
            "file": file,
            "definition": definition.name,
            "kind": kind,
            "result": result,
            "loop_result": loop_result,
            "start": definition.span.start,
            "end": definition.span.end,
        })
        .to_string();
    }
    if loop_result.is_empty() {
        format!("{}: {} -> {}", file, definition.name, result)
    } else {
        format!("{}: {} -> {} (iter: {})", file, definition.name, result, loop_result)
    }
}

fn fail(message: &str, json: bool) -> ExitCode {
    if json {
        let msg = serde_json::json!({
            "code": "C0001",
            "severity": "error",
            "message": message,
            "file": "",
            "spans": [],
        });
        eprintln!("{}", msg);
    } else {
        eprintln!("error: {}", message);
    }
    ExitCode::from(2)
}
