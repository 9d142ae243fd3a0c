//! assay-train: Learn a field manifest from a training batch
//!
//! Usage:
//!   # Train on a JSON array (or JSON Lines) batch, artifacts into ./out
//!   assay-train raw_data.json --out-dir ./out
//!
//!   # Custom thresholds and a run ledger
//!   assay-train raw_data.json -o ./out --config assay.toml --ledger system_metadata.json

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use assay::classify::ClassificationManifest;
use assay::ledger::{JsonFileLedger, NoopLedger, RunLedger};
use assay::pipeline::{train_from_file, TrainingArtifacts};
use assay::PipelineConfig;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "assay-train")]
#[command(about = "Profile a batch and classify every field as SQL, MONGO or BOTH", long_about = None)]
struct Args {
    /// Training batch: a JSON array of objects, one object, or JSON Lines
    #[arg(value_name = "BATCH")]
    input: PathBuf,

    /// Directory for the normalized batch, vocabulary, summary and manifest
    #[arg(long, short = 'o', default_value = ".")]
    out_dir: PathBuf,

    /// TOML configuration file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Run ledger to append to
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Score above which a field goes to MONGO
    #[arg(long)]
    threshold: Option<f64>,

    /// Don't print the decision table
    #[arg(long, short = 'q')]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path).context("Failed to load configuration")?,
        None => PipelineConfig::default(),
    };
    if let Some(threshold) = args.threshold {
        config.classifier.decision_threshold = threshold;
    }
    init_logging(&config.log_level);

    let artifacts = TrainingArtifacts::in_dir(&args.out_dir);
    let mut ledger: Box<dyn RunLedger> = match &args.ledger {
        Some(path) => Box::new(JsonFileLedger::open(path)?),
        None => Box::new(NoopLedger),
    };

    let output = train_from_file(&args.input, &artifacts, &config, ledger.as_mut())?;

    tracing::info!(
        records = output.summary.total_records,
        fields = output.manifest.len(),
        manifest = %artifacts.manifest.display(),
        "training finished"
    );

    if !args.quiet {
        print_table(&output.manifest);
    }

    Ok(())
}

fn print_table(manifest: &ClassificationManifest) {
    println!("{:<20} {:<6} {:<10} FLAGS", "FIELD", "SCORE", "DECISION");
    println!("{}", "-".repeat(60));
    for result in manifest.results() {
        let flags: Vec<&str> = result.flags.iter().map(|f| f.as_str()).collect();
        println!(
            "{:<20} {:<6} {:<10} {}",
            result.field_name,
            result.score,
            result.decision.as_str(),
            flags.join(", ")
        );
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
