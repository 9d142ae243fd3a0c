use crate::config::NormalizerConfig;
use crate::error::ConfigError;
use crate::normalize::registry::KeyRegistry;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use similar::{capture_diff_slices, Algorithm, DiffOp};

// Lowercase letter or digit followed by an uppercase letter
static CASE_BOUNDARY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([a-z0-9])([A-Z])").unwrap()
});

/// Renames raw record keys into a stable canonical vocabulary.
///
/// Each cleaned key is compared against the registry in insertion order and the
/// first entry at or above the similarity cutoff is returned. This is a
/// first-match scan, not a nearest-neighbour search, so the spelling observed
/// first becomes canonical.
#[derive(Debug, Clone)]
pub struct KeyNormalizer {
    registry: KeyRegistry,
    cutoff: f64,
}

impl KeyNormalizer {
    pub fn new(config: &NormalizerConfig) -> Result<Self, ConfigError> {
        Self::with_registry(config, KeyRegistry::new())
    }

    /// Resume from a previously learned vocabulary
    pub fn with_registry(config: &NormalizerConfig, registry: KeyRegistry) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&config.similarity_cutoff) {
            return Err(ConfigError::OutOfUnitRange {
                name: "similarity_cutoff",
                value: config.similarity_cutoff,
            });
        }
        Ok(KeyNormalizer {
            registry,
            cutoff: config.similarity_cutoff,
        })
    }

    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    pub fn into_registry(self) -> KeyRegistry {
        self.registry
    }

    /// Map one raw key onto its canonical spelling, learning it if it is new.
    pub fn normalize(&mut self, raw_key: &str) -> String {
        let clean_key = clean_key(raw_key);

        if self.registry.position(&clean_key).is_some() {
            return clean_key;
        }

        if let Some(existing) = self
            .registry
            .iter()
            .find(|candidate| similarity(&clean_key, candidate) >= self.cutoff)
        {
            tracing::debug!(raw = raw_key, canonical = existing, "collapsed key");
            return existing.to_string();
        }

        tracing::debug!(raw = raw_key, canonical = %clean_key, "learned key");
        self.registry.push(clean_key.clone());
        clean_key
    }

    /// Rename every key in a record, recursing into nested objects and arrays.
    ///
    /// Values are untouched and nothing is flattened. When two raw keys in the
    /// same object collapse to one canonical key, the later value wins and the
    /// field keeps the position of the first.
    pub fn normalize_record(&mut self, record: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::with_capacity(record.len());
        for (key, value) in record.iter() {
            let canonical = self.normalize(key);
            let value = self.normalize_value(value);
            out.insert(canonical, value);
        }
        out
    }

    pub fn normalize_value(&mut self, value: &Value) -> Value {
        match value {
            Value::Object(obj) => Value::Object(self.normalize_record(obj)),
            Value::Array(arr) => Value::Array(arr.iter().map(|item| self.normalize_value(item)).collect()),
            other => other.clone(),
        }
    }
}

/// Split camelCase, lowercase, and turn spaces into underscores.
pub fn clean_key(raw_key: &str) -> String {
    CASE_BOUNDARY_REGEX
        .replace_all(raw_key, "${1}_${2}")
        .to_lowercase()
        .replace(' ', "_")
}

/// Matching-characters ratio `2·M / T` in [0, 1], where `M` is the number of
/// characters in matching runs and `T` the combined length. Two empty strings
/// are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let matched: usize = capture_diff_slices(Algorithm::Myers, &a, &b)
        .iter()
        .map(|op| match op {
            DiffOp::Equal { len, .. } => *len,
            _ => 0,
        })
        .sum();

    2.0 * matched as f64 / total as f64
}
