//! Pipeline configuration
//!
//! Every tunable lives in one [`PipelineConfig`] with named sections. All
//! fields have built-in defaults, a TOML file may override any subset of them,
//! and command-line flags override the file.

use crate::error::{ArtifactError, ArtifactKind, ConfigError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Settings for key normalization and flattening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Minimum similarity for a cleaned key to collapse into a registry entry
    pub similarity_cutoff: f64,

    /// Marker joining nested object keys when a record is flattened
    pub nesting_separator: String,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        NormalizerConfig {
            similarity_cutoff: 0.85,
            nesting_separator: String::from("."),
        }
    }
}

/// Settings for the field profiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Upper bound on distinct sample values kept per field
    pub sample_cap: usize,

    /// Field whose greatest value is reported as the batch watermark
    pub watermark_field: Option<String>,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        ProfilerConfig {
            sample_cap: 10_000,
            watermark_field: Some(String::from("timestamp")),
        }
    }
}

/// Penalty weights added per triggered flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub sparsity: f64,
    pub nested: f64,
    pub low_cardinality: f64,
}

impl Weights {
    pub fn total(&self) -> f64 {
        self.sparsity + self.nested + self.low_cardinality
    }
}

impl Default for Weights {
    fn default() -> Self {
        Weights {
            sparsity: 1.5,
            nested: 2.0,
            low_cardinality: 1.0,
        }
    }
}

/// Statistic limits that trigger flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Frequency below this is sparse
    pub density_floor: f64,

    /// Type stability below this sends the field straight to MONGO
    pub stability_floor: f64,

    /// Cardinality below this is low-cardinality
    pub cardinality_ceiling: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            density_floor: 0.6,
            stability_floor: 0.99,
            cardinality_ceiling: 0.1,
        }
    }
}

/// Settings for the field classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub weights: Weights,
    pub limits: Limits,

    /// Normalized score above which a field goes to MONGO
    pub decision_threshold: f64,

    /// Fields always mirrored to both destinations
    pub mandatory_fields: BTreeSet<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            weights: Weights::default(),
            limits: Limits::default(),
            decision_threshold: 0.3,
            mandatory_fields: ["username", "timestamp", "sys_ingested_time"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = [
            ("sparsity", self.weights.sparsity),
            ("nested", self.weights.nested),
            ("low_cardinality", self.weights.low_cardinality),
        ];
        for (name, value) in weights {
            if value < 0.0 || value.is_nan() {
                return Err(ConfigError::NegativeWeight { name, value });
            }
        }
        if self.weights.total() <= 0.0 {
            return Err(ConfigError::ZeroWeightSum);
        }

        check_unit("density_floor", self.limits.density_floor)?;
        check_unit("stability_floor", self.limits.stability_floor)?;
        check_unit("cardinality_ceiling", self.limits.cardinality_ceiling)?;
        check_unit("decision_threshold", self.decision_threshold)
    }
}

/// Settings for live record sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Field stamped with the local ingestion time on every received record
    pub ingest_stamp_field: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            ingest_stamp_field: Some(String::from("sys_ingested_time")),
        }
    }
}

/// Top-level configuration shared by the training and routing passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    pub normalizer: NormalizerConfig,
    pub profiler: ProfilerConfig,
    pub classifier: ClassifierConfig,
    pub source: SourceConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            log_level: String::from("info"),
            normalizer: NormalizerConfig::default(),
            profiler: ProfilerConfig::default(),
            classifier: ClassifierConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a TOML file; keys it omits keep their defaults.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ArtifactError::PreconditionNotMet {
                kind: ArtifactKind::Config,
                path: path.to_path_buf(),
            },
            _ => ArtifactError::Io(e),
        })?;
        Self::from_toml_str(&text).map_err(|reason| ArtifactError::Malformed {
            kind: ArtifactKind::Config,
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        let config: PipelineConfig = toml::from_str(text).map_err(|e| e.to_string())?;
        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("similarity_cutoff", self.normalizer.similarity_cutoff)?;
        if self.normalizer.nesting_separator.is_empty() {
            return Err(ConfigError::EmptySeparator);
        }
        if self.profiler.sample_cap == 0 {
            return Err(ConfigError::ZeroSampleCap);
        }
        self.classifier.validate()
    }
}

fn check_unit(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange { name, value })
    }
}
