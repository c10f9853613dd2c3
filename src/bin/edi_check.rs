//! Check EDI files: decode every record, reconcile every count, and report what is wrong.
//!
//! Usage:
//!   edi_check [OPTIONS] FILE...
//!
//! Exits with status 1 when any file is invalid or cannot be read.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use ediframe::report::{Report, ReportStyle};
use ediframe::{EdiFile, FrameError, ReadOptions, Registry, SchemaLookup, TextEncoding};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "edi_check", version, about = "Validate fixed-width EDI files")]
struct Cli {
    /// Files to check.
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Record layouts in the schema DSL. Without it only the marker records are typed.
    #[arg(long, value_name = "PATH")]
    schema: Option<PathBuf>,

    /// Text encoding of the input files.
    #[arg(long, value_enum, default_value = "latin1")]
    encoding: EncodingArg,

    /// Human-readable diagnostics.
    #[arg(long, short = 'H')]
    human: bool,

    /// Only the exit status and the per-file verdict.
    #[arg(long, short)]
    quiet: bool,

    /// Log verbosity (-v debug, -vv trace). RUST_LOG takes over when no flag is given.
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum EncodingArg {
    Latin1,
    Utf8,
}

impl From<EncodingArg> for TextEncoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Latin1 => TextEncoding::Latin1,
            EncodingArg::Utf8 => TextEncoding::Utf8,
        }
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_lookup(schema: Option<&Path>) -> anyhow::Result<Arc<dyn SchemaLookup>> {
    let registry = match schema {
        Some(path) => {
            let source = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            Registry::from_dsl(&source).with_context(|| format!("loading {}", path.display()))?
        }
        None => Registry::standard(),
    };
    Ok(registry.into_shared())
}

/// Walk every group and transaction, collecting diagnostics as they come.
fn walk<R: BufRead>(file: &mut EdiFile<R>, report: &mut Report) -> Result<(), FrameError> {
    while let Some(mut group) = file.next_group()? {
        report.group_header(group.group());
        let sequence = group.sequence();
        for transaction in group.by_ref() {
            report.transaction(sequence, &transaction?);
        }
        report.group_trailer(group.finish()?);
    }
    Ok(())
}

fn check(path: &Path, lookup: Arc<dyn SchemaLookup>, options: ReadOptions, report: &mut Report) -> anyhow::Result<bool> {
    let reader = BufReader::new(File::open(path).with_context(|| format!("opening {}", path.display()))?);
    let mut file = EdiFile::open(reader, lookup, options)?;
    if let Some(header) = file.header() {
        report.record("HDR", header);
    }
    match walk(&mut file, report) {
        // already in the file's error list
        Ok(()) | Err(FrameError::Structural(_)) => {}
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    }
    if let Some(trailer) = file.trailer() {
        report.record("TRL", trailer);
    }
    report.structural("file", file.errors());
    tracing::info!(
        path = %path.display(),
        groups = file.group_count(),
        transactions = file.transaction_count(),
        records = file.record_count(),
        "checked"
    );
    Ok(file.is_valid())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let lookup = load_lookup(cli.schema.as_deref())?;
    let options = ReadOptions::default().with_encoding(cli.encoding.into());
    let style = if cli.human {
        ReportStyle::Human
    } else {
        ReportStyle::Compact
    };

    let mut has_error = false;
    let mut total_warnings = 0usize;
    let mut total_errors = 0usize;
    let stdout = io::stdout();
    for path in &cli.files {
        let mut report = Report::new();
        let valid = match check(path, lookup.clone(), options, &mut report) {
            Ok(valid) => valid,
            Err(e) => {
                eprintln!("{}: {:#}", path.display(), e);
                has_error = true;
                continue;
            }
        };
        let display_path = path.display().to_string();
        if !cli.quiet {
            report.write(&mut stdout.lock(), &display_path, style)?;
        }
        total_errors += report.error_count();
        total_warnings += report.warning_count();
        println!("{}: {}", display_path, if valid { "valid" } else { "invalid" });
        has_error |= !valid;
    }

    if !cli.quiet && (total_errors > 0 || total_warnings > 0) {
        eprintln!("edi_check: {} error(s), {} warning(s)", total_errors, total_warnings);
    }
    if has_error {
        std::process::exit(1);
    }
    Ok(())
}
