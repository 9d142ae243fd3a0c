//! Training and routing passes wired end to end
//!
//! Training: batch → normalize → flatten → profile → classify, persisting the
//! normalized batch, the vocabulary, the profile summary and the manifest.
//! Routing: manifest (+ vocabulary) → live stream → SQL/MONGO documents and
//! audit log. Each phase reads its inputs completely before writing anything.

use crate::artifact::{read_json, to_json_bytes, write_all_atomic, write_json_atomic, PendingWrite};
use crate::classify::{ClassificationManifest, Classifier};
use crate::config::PipelineConfig;
use crate::error::{ArtifactKind, SourceError};
use crate::ledger::{Phase, RunEntry, RunLedger};
use crate::normalize::{flatten_record, KeyNormalizer, KeyRegistry};
use crate::profile::{ProfileSummary, Profiler};
use crate::route::{RouteOutputs, RouteStats, Router};
use crate::source::load_batch;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const NORMALIZED_FILE: &str = "normalized_data.json";
pub const VOCABULARY_FILE: &str = "vocabulary.json";
pub const SUMMARY_FILE: &str = "analyzed_data.json";
pub const MANIFEST_FILE: &str = "field_metadata.json";

/// Everything learned from one training batch
#[derive(Debug, Clone)]
pub struct TrainingOutput {
    /// Records with canonical keys, still nested
    pub normalized: Vec<Map<String, Value>>,
    pub vocabulary: KeyRegistry,
    pub summary: ProfileSummary,
    pub manifest: ClassificationManifest,
    pub latest_watermark: Option<String>,
}

/// Run the training chain over an in-memory batch.
pub fn train(records: &[Map<String, Value>], config: &PipelineConfig) -> Result<TrainingOutput> {
    config.validate().context("Invalid pipeline configuration")?;

    let separator = config.normalizer.nesting_separator.as_str();
    let mut normalizer = KeyNormalizer::new(&config.normalizer)?;
    let mut profiler = Profiler::new(&config.profiler, separator)?;
    let classifier = Classifier::new(config.classifier.clone())?;

    let mut normalized = Vec::with_capacity(records.len());
    for record in records {
        let renamed = normalizer.normalize_record(record);
        profiler.add_record(&flatten_record(&renamed, separator));
        normalized.push(renamed);
    }

    let vocabulary = normalizer.into_registry();
    tracing::info!(keys = vocabulary.len(), "learned canonical vocabulary");

    let latest_watermark = profiler.latest_watermark().map(str::to_string);
    let summary = profiler.finalize();
    let manifest = classifier.classify_all(&summary);

    Ok(TrainingOutput {
        normalized,
        vocabulary,
        summary,
        manifest,
        latest_watermark,
    })
}

/// File locations of the training artifacts inside one directory
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingArtifacts {
    pub normalized: PathBuf,
    pub vocabulary: PathBuf,
    pub summary: PathBuf,
    pub manifest: PathBuf,
}

impl TrainingArtifacts {
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        TrainingArtifacts {
            normalized: dir.join(NORMALIZED_FILE),
            vocabulary: dir.join(VOCABULARY_FILE),
            summary: dir.join(SUMMARY_FILE),
            manifest: dir.join(MANIFEST_FILE),
        }
    }

    /// Serialize all four artifacts, then replace them together.
    pub fn write(&self, output: &TrainingOutput) -> Result<()> {
        let writes = [
            PendingWrite {
                path: &self.normalized,
                bytes: to_json_bytes(&self.normalized, &output.normalized, ArtifactKind::Batch)?,
                kind: ArtifactKind::Batch,
            },
            PendingWrite {
                path: &self.vocabulary,
                bytes: to_json_bytes(&self.vocabulary, &output.vocabulary, ArtifactKind::Vocabulary)?,
                kind: ArtifactKind::Vocabulary,
            },
            PendingWrite {
                path: &self.summary,
                bytes: to_json_bytes(&self.summary, &output.summary, ArtifactKind::Summary)?,
                kind: ArtifactKind::Summary,
            },
            PendingWrite {
                path: &self.manifest,
                bytes: to_json_bytes(&self.manifest, &output.manifest, ArtifactKind::Manifest)?,
                kind: ArtifactKind::Manifest,
            },
        ];
        write_all_atomic(&writes)?;
        Ok(())
    }
}

/// Load a batch file, train on it, persist the artifacts and log the run.
pub fn train_from_file<P: AsRef<Path>>(
    batch_path: P,
    artifacts: &TrainingArtifacts,
    config: &PipelineConfig,
    ledger: &mut dyn RunLedger,
) -> Result<TrainingOutput> {
    let batch = load_batch(batch_path.as_ref()).context("Failed to load training batch")?;
    let output = train(&batch.records, config)?;

    artifacts.write(&output).context("Failed to write training artifacts")?;

    let mut entry = RunEntry::new(Phase::Training, output.summary.total_records);
    entry.data_up_to = output.latest_watermark.clone();
    for name in output.manifest.sql_fields() {
        if let Some(field) = output.summary.field(name) {
            entry
                .schema_snapshot
                .insert(name.to_string(), field.dominant_type.to_string());
        }
    }
    entry.mirrored_fields = output.manifest.mirrored_fields().map(str::to_string).collect();
    ledger.record(entry).context("Failed to update run ledger")?;

    Ok(output)
}

/// Re-run classification on a persisted summary and write the manifest.
pub fn classify_summary_file<P: AsRef<Path>, Q: AsRef<Path>>(
    summary_path: P,
    manifest_path: Q,
    config: &PipelineConfig,
) -> Result<ClassificationManifest> {
    let summary: ProfileSummary = read_json(summary_path.as_ref(), ArtifactKind::Summary)?;
    let classifier = Classifier::new(config.classifier.clone())?;
    let manifest = classifier.classify_all(&summary);
    write_json_atomic(manifest_path.as_ref(), &manifest, ArtifactKind::Manifest)?;
    Ok(manifest)
}

/// Inputs for one routing run
#[derive(Debug, Clone)]
pub struct RoutingPlan {
    pub manifest: PathBuf,
    pub vocabulary: Option<PathBuf>,
    pub limit: Option<usize>,
    /// Flatten live records the way training did
    pub flatten: bool,
}

/// Route a live stream through a persisted manifest and write the outputs.
pub fn route_stream<I>(
    plan: &RoutingPlan,
    stream: I,
    outputs: &RouteOutputs,
    config: &PipelineConfig,
    ledger: &mut dyn RunLedger,
) -> Result<RouteStats>
where
    I: IntoIterator<Item = Result<Map<String, Value>, SourceError>>,
{
    config.validate().context("Invalid pipeline configuration")?;

    let manifest: ClassificationManifest = read_json(&plan.manifest, ArtifactKind::Manifest)?;
    let normalizer = match &plan.vocabulary {
        Some(path) => {
            let registry: KeyRegistry = read_json(path, ArtifactKind::Vocabulary)?;
            Some(KeyNormalizer::with_registry(&config.normalizer, registry)?)
        }
        None => None,
    };

    let mut router = Router::new(&manifest).with_ingest_stamp_field(config.source.ingest_stamp_field.clone());
    if let Some(normalizer) = normalizer {
        router = router.with_normalizer(normalizer);
    }
    if plan.flatten {
        router = router.with_flattening(config.normalizer.nesting_separator.clone());
    }

    let batch = router.route(stream, plan.limit);
    outputs.write(&batch).context("Failed to write routed documents")?;

    let mut entry = RunEntry::new(Phase::Routing, batch.stats.routed as u64);
    if batch.stats.ended_early {
        entry.status = String::from("partial");
    }
    ledger.record(entry).context("Failed to update run ledger")?;

    Ok(batch.stats)
}
