use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Rejected configuration values, reported once when a component is built.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfUnitRange { name: &'static str, value: f64 },
    #[error("weight '{name}' must be non-negative, got {value}")]
    NegativeWeight { name: &'static str, value: f64 },
    #[error("classifier weights must not all be zero")]
    ZeroWeightSum,
    #[error("sample cap must be at least 1")]
    ZeroSampleCap,
    #[error("nesting separator must not be empty")]
    EmptySeparator,
}

/// Which persisted artifact a phase was reading or writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Batch,
    Vocabulary,
    Summary,
    Manifest,
    Ledger,
    Config,
    Output,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ArtifactKind::Batch => "record batch",
            ArtifactKind::Vocabulary => "vocabulary",
            ArtifactKind::Summary => "profile summary",
            ArtifactKind::Manifest => "classification manifest",
            ArtifactKind::Ledger => "run ledger",
            ArtifactKind::Config => "configuration",
            ArtifactKind::Output => "output",
        };
        f.write_str(name)
    }
}

/// Failures at a phase boundary. Reads fail before anything is written.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("precondition not met: {kind} not found at {}", path.display())]
    PreconditionNotMet { kind: ArtifactKind, path: PathBuf },
    #[error("{kind} at {} could not be parsed: {reason}", path.display())]
    Malformed {
        kind: ArtifactKind,
        path: PathBuf,
        reason: String,
    },
    #[error("failed to write {kind} to {}: {source}", path.display())]
    Write {
        kind: ArtifactKind,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Per-record failures from a record stream.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("line {line}: not a JSON object record: {reason}")]
    Malformed { line: usize, reason: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SourceError {
    /// True when the stream can continue past this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SourceError::Malformed { .. })
    }
}
