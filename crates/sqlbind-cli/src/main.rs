//! CLI entry point for `sqlbind`.
//!
//! Reads a schema (DDL file) and one or more SQL documents, runs the
//! inference engine, prints descriptors as JSON on stdout and diagnostics
//! on stderr. Exit status: 0 on a clean run, 1 when any statement remained
//! unresolved or a fatal diagnostic was raised, 2 on usage or I/O errors.

use clap::Parser;
use serde::Serialize;
use sqlbind::catalog::DdlSource;
use sqlbind::{Engine, QueryDescriptor};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "sqlbind",
    about = "Infer typed parameter and result bindings for hand-written SQL"
)]
struct Cli {
    /// Input SQL documents
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Schema DDL file (CREATE TABLE statements)
    #[arg(long)]
    schema: PathBuf,

    /// Schema acquisition timeout in seconds
    #[arg(long, default_value_t = 30)]
    schema_timeout: u64,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Print verbose diagnostics
    #[arg(long)]
    verbose: bool,
}

#[derive(Serialize)]
struct DocumentOutput<'a> {
    document: &'a str,
    queries: &'a [QueryDescriptor],
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "sqlbind=debug".into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    // Stage 1: acquire the schema snapshot, under a deadline.
    let source = match DdlSource::from_path(&cli.schema) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading schema {}: {e}", cli.schema.display());
            process::exit(2);
        }
    };
    let engine = match Engine::from_source(source, Duration::from_secs(cli.schema_timeout)) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error loading schema: {e}");
            process::exit(2);
        }
    };
    debug!(
        tables = engine.snapshot().table_count(),
        "schema snapshot ready"
    );

    // Stage 2: read the input documents.
    let mut documents = Vec::with_capacity(cli.input.len());
    for path in &cli.input {
        match std::fs::read_to_string(path) {
            Ok(text) => documents.push((path.display().to_string(), text)),
            Err(e) => {
                eprintln!("Error reading {}: {e}", path.display());
                process::exit(2);
            }
        }
    }

    // Stage 3: run inference across all documents.
    let summary = engine.run(&documents);

    // Stage 4: emit descriptors grouped per document, in input order.
    let output: Vec<DocumentOutput> = summary
        .documents
        .iter()
        .map(|d| DocumentOutput {
            document: &d.document,
            queries: &d.queries,
        })
        .collect();

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    };
    match rendered {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing output: {e}");
            process::exit(2);
        }
    }

    // Stage 5: report the full diagnostics list.
    for diagnostic in &summary.diagnostics {
        eprintln!("{diagnostic}");
    }

    if summary.failed {
        process::exit(1);
    }
}
