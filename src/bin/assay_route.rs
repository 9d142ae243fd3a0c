//! assay-route: Split a live record stream through a trained manifest
//!
//! Usage:
//!   # Route JSON Lines from stdin
//!   tail -f events.jsonl | assay-route --manifest out/field_metadata.json --out-dir ./routed
//!
//!   # Route the first 50 events of a server-sent-event capture
//!   assay-route stream.txt --event-stream --count 50 \
//!       --manifest out/field_metadata.json --vocabulary out/vocabulary.json -o ./routed

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use assay::ledger::{JsonFileLedger, NoopLedger, RunLedger};
use assay::pipeline::{route_stream, RoutingPlan};
use assay::route::RouteOutputs;
use assay::source::{JsonLinesSource, LineFormat};
use assay::PipelineConfig;
use clap::Parser;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "assay-route")]
#[command(about = "Route live records to SQL and MONGO documents", long_about = None)]
struct Args {
    /// Record stream (use stdin if omitted)
    #[arg(value_name = "STREAM")]
    input: Option<PathBuf>,

    /// Classification manifest written by assay-train
    #[arg(long, short = 'm')]
    manifest: PathBuf,

    /// Vocabulary written by assay-train; live keys are normalized against it
    #[arg(long)]
    vocabulary: Option<PathBuf>,

    /// Stop after routing this many records
    #[arg(long, short = 'n')]
    count: Option<usize>,

    /// Directory for sql_records.json, mongo_records.json and router_log.txt
    #[arg(long, short = 'o', default_value = ".")]
    out_dir: PathBuf,

    /// Input is a server-sent-event stream (records on `data:` lines)
    #[arg(long)]
    event_stream: bool,

    /// Route keys as they arrive instead of flattening nested objects
    #[arg(long)]
    no_flatten: bool,

    /// TOML configuration file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Run ledger to append to
    #[arg(long)]
    ledger: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path).context("Failed to load configuration")?,
        None => PipelineConfig::default(),
    };
    init_logging(&config.log_level);

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };
    let format = if args.event_stream {
        LineFormat::EventStream
    } else {
        LineFormat::JsonLines
    };
    let stream = JsonLinesSource::new(reader, format).with_ingest_stamp(config.source.ingest_stamp_field.clone());

    let plan = RoutingPlan {
        manifest: args.manifest,
        vocabulary: args.vocabulary,
        limit: args.count,
        flatten: !args.no_flatten,
    };
    let outputs = RouteOutputs::in_dir(&args.out_dir);
    let mut ledger: Box<dyn RunLedger> = match &args.ledger {
        Some(path) => Box::new(JsonFileLedger::open(path)?),
        None => Box::new(NoopLedger),
    };

    let stats = route_stream(&plan, stream, &outputs, &config, ledger.as_mut())?;

    eprintln!(
        "Routed {} records ({} skipped): {} SQL documents, {} MONGO documents",
        stats.routed, stats.skipped, stats.sql_documents, stats.mongo_documents
    );
    if stats.ended_early {
        eprintln!("⚠ Warning: the stream failed before the requested count was reached.");
    }

    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
