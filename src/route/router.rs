//! Stream routing through a frozen classification manifest
//!
//! Each live record is split into a SQL document and a MONGO document
//! according to the manifest, with no per-record decision-making beyond a
//! lookup. Fields the manifest has never seen go to MONGO, so nothing is
//! dropped and no unseen column ever reaches the relational side.

use crate::classify::{ClassificationManifest, Decision};
use crate::error::SourceError;
use crate::normalize::{flatten_record, KeyNormalizer};
use serde_json::{Map, Value};
use std::fmt::Write as _;

/// Per-field decisions taken for one record
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub received_at: String,
    pub decisions: Vec<(String, Decision)>,
}

impl AuditEntry {
    /// Render the plain-text audit block, ending with a blank line
    pub fn render(&self) -> String {
        let mut block = String::new();
        let _ = writeln!(block, "Record received at {}", self.received_at);
        let _ = writeln!(block, "{} Fields", self.decisions.len());
        for (field, decision) in &self.decisions {
            let _ = writeln!(block, "{} : {}", field, decision);
        }
        block.push('\n');
        block
    }
}

/// One record split into its two destination documents
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedRecord {
    pub sql: Map<String, Value>,
    pub mongo: Map<String, Value>,
    pub audit: AuditEntry,
}

/// Counters for one routing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteStats {
    /// Records taken from the stream and routed
    pub routed: usize,
    /// Malformed records skipped
    pub skipped: usize,
    pub sql_documents: usize,
    pub mongo_documents: usize,
    /// Routed records whose SQL side came out empty
    pub empty_sql: usize,
    /// Routed records whose MONGO side came out empty
    pub empty_mongo: usize,
    /// True if an I/O failure ended the stream before the limit
    pub ended_early: bool,
}

/// Everything produced by one routing run
#[derive(Debug, Clone, Default)]
pub struct RoutedBatch {
    pub sql_documents: Vec<Map<String, Value>>,
    pub mongo_documents: Vec<Map<String, Value>>,
    pub audit_log: String,
    pub stats: RouteStats,
}

/// Splits records into destination documents using a read-only manifest.
pub struct Router<'m> {
    manifest: &'m ClassificationManifest,
    normalizer: Option<KeyNormalizer>,
    flatten_separator: Option<String>,
    stamp_field: Option<String>,
    clock: fn() -> String,
}

impl<'m> Router<'m> {
    pub fn new(manifest: &'m ClassificationManifest) -> Self {
        Router {
            manifest,
            normalizer: None,
            flatten_separator: None,
            stamp_field: None,
            clock: local_now,
        }
    }

    /// Rename live keys into the training vocabulary before lookup
    pub fn with_normalizer(mut self, normalizer: KeyNormalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Flatten nested objects before lookup, as the training pass did
    pub fn with_flattening(mut self, separator: impl Into<String>) -> Self {
        self.flatten_separator = Some(separator.into());
        self
    }

    /// Take the audit timestamp from this record field when it holds a string
    pub fn with_ingest_stamp_field(mut self, field: Option<String>) -> Self {
        self.stamp_field = field;
        self
    }

    /// Replace the audit timestamp source used for unstamped records
    pub fn with_clock(mut self, clock: fn() -> String) -> Self {
        self.clock = clock;
        self
    }

    /// Split one record.
    pub fn route_record(&mut self, record: &Map<String, Value>) -> RoutedRecord {
        let received_at = self.received_at(record);
        let prepared = self.prepare(record);
        let mut sql = Map::new();
        let mut mongo = Map::new();
        let mut decisions = Vec::with_capacity(prepared.len());

        for (field, value) in prepared.into_iter() {
            let decision = self.manifest.decision_for(&field);
            match decision {
                Decision::Sql => {
                    sql.insert(field.clone(), value);
                }
                Decision::Mongo => {
                    mongo.insert(field.clone(), value);
                }
                Decision::Both => {
                    sql.insert(field.clone(), value.clone());
                    mongo.insert(field.clone(), value);
                }
            }
            decisions.push((field, decision));
        }

        RoutedRecord {
            sql,
            mongo,
            audit: AuditEntry {
                received_at,
                decisions,
            },
        }
    }

    /// Route records from `stream` until it ends or `limit` records are routed.
    ///
    /// Malformed records are skipped and counted. An I/O failure ends the run
    /// early but keeps what was already routed. The stream is not polled again
    /// once the limit is reached.
    pub fn route<I>(&mut self, stream: I, limit: Option<usize>) -> RoutedBatch
    where
        I: IntoIterator<Item = Result<Map<String, Value>, SourceError>>,
    {
        let mut batch = RoutedBatch::default();
        let mut stream = stream.into_iter();

        loop {
            if limit.map_or(false, |limit| batch.stats.routed >= limit) {
                break;
            }

            let record = match stream.next() {
                None => break,
                Some(Ok(record)) => record,
                Some(Err(e)) if e.is_recoverable() => {
                    tracing::warn!(error = %e, "skipping malformed record");
                    batch.stats.skipped += 1;
                    continue;
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, routed = batch.stats.routed, "record stream failed, finishing early");
                    batch.stats.ended_early = true;
                    break;
                }
            };

            let routed = self.route_record(&record);
            batch.stats.routed += 1;
            batch.audit_log.push_str(&routed.audit.render());

            if routed.sql.is_empty() {
                batch.stats.empty_sql += 1;
            } else {
                batch.stats.sql_documents += 1;
                batch.sql_documents.push(routed.sql);
            }

            if routed.mongo.is_empty() {
                batch.stats.empty_mongo += 1;
            } else {
                batch.stats.mongo_documents += 1;
                batch.mongo_documents.push(routed.mongo);
            }
        }

        tracing::info!(
            routed = batch.stats.routed,
            skipped = batch.stats.skipped,
            sql = batch.stats.sql_documents,
            mongo = batch.stats.mongo_documents,
            "routing finished"
        );

        batch
    }

    fn received_at(&self, record: &Map<String, Value>) -> String {
        self.stamp_field
            .as_deref()
            .and_then(|field| record.get(field))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| (self.clock)())
    }

    fn prepare(&mut self, record: &Map<String, Value>) -> Map<String, Value> {
        let renamed = match self.normalizer.as_mut() {
            Some(normalizer) => normalizer.normalize_record(record),
            None => record.clone(),
        };
        match self.flatten_separator.as_deref() {
            Some(separator) => flatten_record(&renamed, separator),
            None => renamed,
        }
    }
}

fn local_now() -> String {
    chrono::Local::now().to_rfc3339()
}
