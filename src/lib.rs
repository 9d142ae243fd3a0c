//! # Assay - Field Classification and Record Routing
//!
//! Learns, from a training batch of semi-structured records, which fields are
//! stable enough for a relational store and which belong in a document store,
//! then splits a live stream of records accordingly.
//!
//! ## Modules
//!
//! - **normalize**: Canonical key vocabulary with fuzzy matching, plus flattening
//! - **profile**: Per-field statistics over a batch
//! - **classify**: Ordered rules mapping each field to SQL, MONGO or BOTH
//! - **route**: Split live records through a frozen manifest
//! - **pipeline**: The training and routing passes wired end to end
//!
//! ## Quick Start
//!
//! ```rust
//! use assay::{train, PipelineConfig, Router};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let batch: Vec<_> = (0..10)
//!     .map(|i| json!({"sensorId": format!("s{}", i), "reading": i, "extra": [i]}))
//!     .map(|v| v.as_object().cloned().unwrap())
//!     .collect();
//!
//! let trained = train(&batch, &PipelineConfig::default())?;
//!
//! let mut router = Router::new(&trained.manifest);
//! let live = json!({"sensor_id": "s99", "reading": 3, "extra": [1], "surprise": true});
//! let routed = router.route_record(live.as_object().unwrap());
//!
//! assert_eq!(routed.sql, *json!({"sensor_id": "s99", "reading": 3}).as_object().unwrap());
//! assert!(routed.mongo.contains_key("surprise"));
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod classify;
pub mod config;
pub mod error;
pub mod ledger;
pub mod normalize;
pub mod pipeline;
pub mod profile;
pub mod route;
pub mod source;

// Re-export commonly used types for convenience
pub use classify::{ClassificationManifest, ClassificationResult, Classifier, Decision, Flag};
pub use config::PipelineConfig;
pub use error::{ArtifactError, ArtifactKind, ConfigError, SourceError};
pub use ledger::{JsonFileLedger, NoopLedger, RunLedger};
pub use normalize::{flatten_record, KeyNormalizer, KeyRegistry};
pub use pipeline::{route_stream, train, train_from_file, RoutingPlan, TrainingArtifacts, TrainingOutput};
pub use profile::{FieldSummary, ProfileSummary, Profiler, ValueType};
pub use route::{RouteOutputs, RoutedBatch, Router};
pub use source::{load_batch, JsonLinesSource, LineFormat};
