//! Run history
//!
//! After each phase the pipeline reports a [`RunEntry`] to a [`RunLedger`].
//! [`JsonFileLedger`] keeps an append-only history plus the current relational
//! schema (SQL column → dominant type, and the mirrored field list).

use crate::artifact::{read_json, write_json_atomic};
use crate::error::{ArtifactError, ArtifactKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Which phase produced a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Training,
    Routing,
}

/// Summary of one finished phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEntry {
    pub executed_at: String,
    pub phase: Phase,
    pub record_count: u64,
    pub status: String,
    /// Latest watermark value seen in the batch, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_up_to: Option<String>,
    /// SQL columns and their dominant types at the time of the run
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub schema_snapshot: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mirrored_fields: Vec<String>,
}

impl RunEntry {
    pub fn new(phase: Phase, record_count: u64) -> Self {
        RunEntry {
            executed_at: chrono::Local::now().to_rfc3339(),
            phase,
            record_count,
            status: String::from("success"),
            data_up_to: None,
            schema_snapshot: BTreeMap::new(),
            mirrored_fields: Vec::new(),
        }
    }
}

/// Receives a summary after each phase
pub trait RunLedger {
    fn record(&mut self, entry: RunEntry) -> Result<(), ArtifactError>;
}

/// Ledger that keeps nothing
#[derive(Debug, Default)]
pub struct NoopLedger;

impl RunLedger for NoopLedger {
    fn record(&mut self, _entry: RunEntry) -> Result<(), ArtifactError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentSchema {
    pub sql_columns: BTreeMap<String, String>,
    pub mirrored_fields: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    pub current_schema: CurrentSchema,
    pub run_history: Vec<RunEntry>,
}

/// Ledger persisted as one JSON file, rewritten atomically on every entry.
#[derive(Debug)]
pub struct JsonFileLedger {
    path: PathBuf,
    state: LedgerState,
}

impl JsonFileLedger {
    /// Open an existing ledger file, or start an empty one if it does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let path = path.as_ref().to_path_buf();
        let state = match read_json::<LedgerState, _>(&path, ArtifactKind::Ledger) {
            Ok(state) => state,
            Err(ArtifactError::PreconditionNotMet { .. }) => LedgerState::default(),
            Err(e) => return Err(e),
        };
        Ok(JsonFileLedger { path, state })
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Clear all history and the current schema
    pub fn reset(&mut self) -> Result<(), ArtifactError> {
        self.state = LedgerState::default();
        write_json_atomic(&self.path, &self.state, ArtifactKind::Ledger)
    }
}

impl RunLedger for JsonFileLedger {
    fn record(&mut self, entry: RunEntry) -> Result<(), ArtifactError> {
        // Only training runs redefine the relational schema
        if entry.phase == Phase::Training {
            self.state.current_schema = CurrentSchema {
                sql_columns: entry.schema_snapshot.clone(),
                mirrored_fields: entry.mirrored_fields.clone(),
            };
        }
        self.state.run_history.push(entry);
        write_json_atomic(&self.path, &self.state, ArtifactKind::Ledger)
    }
}
