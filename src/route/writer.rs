use crate::artifact::{to_json_bytes, write_all_atomic, PendingWrite};
use crate::error::{ArtifactError, ArtifactKind};
use crate::route::router::RoutedBatch;
use std::path::{Path, PathBuf};

pub const SQL_RECORDS_FILE: &str = "sql_records.json";
pub const MONGO_RECORDS_FILE: &str = "mongo_records.json";
pub const ROUTER_LOG_FILE: &str = "router_log.txt";

/// Paths written for one routed batch
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOutputs {
    pub sql_records: PathBuf,
    pub mongo_records: PathBuf,
    pub audit_log: PathBuf,
}

impl RouteOutputs {
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        RouteOutputs {
            sql_records: dir.join(SQL_RECORDS_FILE),
            mongo_records: dir.join(MONGO_RECORDS_FILE),
            audit_log: dir.join(ROUTER_LOG_FILE),
        }
    }

    /// Write both document sets as JSON arrays and the audit log as text.
    ///
    /// All three are staged before any is replaced.
    pub fn write(&self, batch: &RoutedBatch) -> Result<(), ArtifactError> {
        let writes = [
            PendingWrite {
                path: &self.sql_records,
                bytes: to_json_bytes(&self.sql_records, &batch.sql_documents, ArtifactKind::Output)?,
                kind: ArtifactKind::Output,
            },
            PendingWrite {
                path: &self.mongo_records,
                bytes: to_json_bytes(&self.mongo_records, &batch.mongo_documents, ArtifactKind::Output)?,
                kind: ArtifactKind::Output,
            },
            PendingWrite {
                path: &self.audit_log,
                bytes: batch.audit_log.clone().into_bytes(),
                kind: ArtifactKind::Output,
            },
        ];
        write_all_atomic(&writes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_writes_all_three_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut batch = RoutedBatch::default();
        batch
            .sql_documents
            .push(json!({"temperature": 1}).as_object().unwrap().clone());
        batch.audit_log.push_str("Record received at t\n1 Fields\ntemperature : SQL\n\n");

        let outputs = RouteOutputs::in_dir(dir.path());
        outputs.write(&batch).unwrap();

        let sql: Value = serde_json::from_str(&std::fs::read_to_string(&outputs.sql_records).unwrap()).unwrap();
        let mongo: Value = serde_json::from_str(&std::fs::read_to_string(&outputs.mongo_records).unwrap()).unwrap();

        assert_eq!(sql, json!([{"temperature": 1}]));
        assert_eq!(mongo, json!([]));
        assert!(std::fs::read_to_string(&outputs.audit_log).unwrap().contains("temperature : SQL"));
    }
}
