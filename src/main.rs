//! The skylint command line: format and lint Starlark build files.

use clap::{Parser, ValueEnum};
use skylint::diagnostics::{Diagnostics, FileDiagnostics};
use skylint::warns;
use skylint::{detect_file_kind, is_starlark_file};
use skylint_syntax::{format_string, parse, prettify_error, FileKind};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Report files that are not formatted or have warnings.
    Check,
    /// Rewrite files in place: reformat and apply lint fixes.
    Fix,
    /// Print the formatted output to stdout without touching the files.
    Print,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Lint {
    /// Do not run lint checks.
    Off,
    /// Report lint findings.
    Warn,
    /// Apply automatic fixes (with --mode=fix) and report what remains.
    Fix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TypeArg {
    Auto,
    Build,
    Bzl,
    Workspace,
    Default,
}

/// A linter and formatter for Starlark build files.
#[derive(Debug, Parser)]
#[command(name = "skylint", version, about)]
struct Cli {
    /// What to do with the files.
    #[arg(long, value_enum, default_value = "check")]
    mode: Mode,

    /// Lint behavior.
    #[arg(long, value_enum, default_value = "off")]
    lint: Lint,

    /// Diagnostics output format.
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Override the detected file type.
    #[arg(long = "type", value_enum, default_value = "auto")]
    file_type: TypeArg,

    /// Comma-separated warning categories to enable, or "all".
    #[arg(long, default_value = "all")]
    warnings: String,

    /// Verbose output (also controlled by SKYLINT_LOG).
    #[arg(short, long)]
    verbose: bool,

    /// Files or directories to process.
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(message) => {
            error!("{}", message);
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("SKYLINT_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<bool, String> {
    let files = expand_paths(&cli.paths)?;
    if files.is_empty() {
        return Err("no Starlark files found".to_owned());
    }
    debug!(count = files.len(), "processing files");

    let enabled = enabled_warnings(&cli.warnings)?;
    let mut per_file = Vec::new();
    for path in &files {
        per_file.push(process_file(cli, path, &enabled));
    }
    let diagnostics = Diagnostics::new(per_file);
    let verbose = cli.verbose;
    print!(
        "{}",
        diagnostics.format(cli.format == OutputFormat::Json, verbose)
    );
    Ok(diagnostics.success)
}

fn enabled_warnings(spec: &str) -> Result<Vec<String>, String> {
    let all = warns::all_warnings();
    if spec == "all" {
        return Ok(all.iter().map(|s| (*s).to_owned()).collect());
    }
    let mut result = Vec::new();
    for name in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !all.contains(&name) {
            return Err(format!("unknown warning category: {}", name));
        }
        result.push(name.to_owned());
    }
    Ok(result)
}

fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>, String> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in walkdir::WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file() && is_starlark_file(entry.path()) {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(format!("{}: no such file or directory", path.display()));
        }
    }
    Ok(files)
}

fn kind_for(cli: &Cli, path: &Path) -> FileKind {
    match cli.file_type {
        TypeArg::Auto => detect_file_kind(path),
        TypeArg::Build => FileKind::Build,
        TypeArg::Bzl => FileKind::Bzl,
        TypeArg::Workspace => FileKind::Workspace,
        TypeArg::Default => FileKind::Default,
    }
}

fn process_file(cli: &Cli, path: &Path, enabled: &[String]) -> FileDiagnostics {
    let display_name = path.display().to_string();
    let source = match std::fs::read(path) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => {
                error!("{}: file is not valid UTF-8", display_name);
                return FileDiagnostics::invalid(&display_name);
            }
        },
        Err(e) => {
            error!("{}: {}", display_name, e);
            return FileDiagnostics::invalid(&display_name);
        }
    };

    let kind = kind_for(cli, path);
    let mut file = match parse(&display_name, &source, kind) {
        Ok(f) => f,
        Err(e) => {
            // A file that fails to parse is reported and skipped; the rest
            // of the batch continues.
            eprintln!("{}", prettify_error(&source, &e, &display_name));
            return FileDiagnostics::invalid(&display_name);
        }
    };

    let pkg = path
        .parent()
        .and_then(|p| p.to_str())
        .unwrap_or("")
        .to_owned();
    let apply_fixes = cli.lint == Lint::Fix && cli.mode == Mode::Fix;
    let findings = match cli.lint {
        Lint::Off => Vec::new(),
        Lint::Warn => warns::file_warnings(&mut file, &pkg, enabled, false),
        Lint::Fix => {
            if apply_fixes {
                warns::fix_warnings(&mut file, &pkg, enabled)
            } else {
                warns::file_warnings(&mut file, &pkg, enabled, false)
            }
        }
    };

    let formatted = format_string(&file);
    let mut diag = FileDiagnostics::new(&display_name, &findings);
    diag.formatted = formatted == source;

    match cli.mode {
        Mode::Check => {}
        Mode::Print => {
            print!("{}", formatted);
            diag.formatted = true;
        }
        Mode::Fix => {
            if formatted != source {
                if let Err(e) = std::fs::write(path, &formatted) {
                    error!("{}: {}", display_name, e);
                    return FileDiagnostics::invalid(&display_name);
                }
                debug!("{}: rewrote", display_name);
            }
            diag.formatted = true;
        }
    }
    diag
}
