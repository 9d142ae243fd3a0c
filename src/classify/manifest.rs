use crate::classify::types::{ClassificationResult, Decision};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Frozen field → decision map produced by one training pass.
///
/// Serialized as a plain list of results in classification order. Fields
/// that were never seen in training resolve to [`Decision::Mongo`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ClassificationResult>", into = "Vec<ClassificationResult>")]
pub struct ClassificationManifest {
    results: Vec<ClassificationResult>,
    index: HashMap<String, usize>,
}

impl From<Vec<ClassificationResult>> for ClassificationManifest {
    fn from(results: Vec<ClassificationResult>) -> Self {
        ClassificationManifest::new(results)
    }
}

impl From<ClassificationManifest> for Vec<ClassificationResult> {
    fn from(manifest: ClassificationManifest) -> Self {
        manifest.results
    }
}

impl ClassificationManifest {
    /// Decision applied to fields absent from the manifest
    pub const UNSEEN_FIELD: Decision = Decision::Mongo;

    pub fn new(results: Vec<ClassificationResult>) -> Self {
        let index = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.field_name.clone(), i))
            .collect();
        ClassificationManifest { results, index }
    }

    pub fn get(&self, field_name: &str) -> Option<&ClassificationResult> {
        self.index.get(field_name).map(|&i| &self.results[i])
    }

    /// Resolve a field's destination, falling back to MONGO for unseen fields
    pub fn decision_for(&self, field_name: &str) -> Decision {
        self.get(field_name)
            .map(|r| r.decision)
            .unwrap_or(Self::UNSEEN_FIELD)
    }

    pub fn results(&self) -> &[ClassificationResult] {
        &self.results
    }

    /// Fields that will become relational columns (SQL or BOTH)
    pub fn sql_fields(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|r| r.decision.to_sql())
            .map(|r| r.field_name.as_str())
    }

    /// Fields mirrored to both destinations
    pub fn mirrored_fields(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|r| r.decision == Decision::Both)
            .map(|r| r.field_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
