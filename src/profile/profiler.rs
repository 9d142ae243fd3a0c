use crate::config::ProfilerConfig;
use crate::error::ConfigError;
use crate::profile::stats::FieldStats;
use crate::profile::types::{FieldSummary, ProfileSummary, ValueType};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Streaming accumulator of per-field statistics over one batch.
///
/// Statistics are folded in one value at a time and turned into a
/// [`ProfileSummary`] exactly once by [`Profiler::finalize`], which consumes
/// the profiler.
///
/// Cardinality is measured against a sample set capped at `sample_cap`
/// distinct values. Once a field has more distinct values than the cap, its
/// cardinality reads lower than the true uniqueness. The classifier limits
/// are tuned against this behaviour, so it is kept as is.
#[derive(Debug, Clone)]
pub struct Profiler {
    total_records: u64,
    fields: BTreeMap<String, FieldStats>,
    sample_cap: usize,
    nesting_separator: String,
    watermark_field: Option<String>,
    latest_watermark: Option<String>,
}

impl Profiler {
    pub fn new(config: &ProfilerConfig, nesting_separator: &str) -> Result<Self, ConfigError> {
        if config.sample_cap == 0 {
            return Err(ConfigError::ZeroSampleCap);
        }
        if nesting_separator.is_empty() {
            return Err(ConfigError::EmptySeparator);
        }
        Ok(Profiler {
            total_records: 0,
            fields: BTreeMap::new(),
            sample_cap: config.sample_cap,
            nesting_separator: nesting_separator.to_string(),
            watermark_field: config.watermark_field.clone(),
            latest_watermark: None,
        })
    }

    /// Count one record and ingest each of its fields.
    pub fn add_record(&mut self, record: &Map<String, Value>) {
        self.total_records += 1;
        for (field_name, value) in record.iter() {
            self.ingest(field_name, value);
        }
    }

    /// Fold one field occurrence into its statistics.
    pub fn ingest(&mut self, field_name: &str, value: &Value) {
        let nested_name = field_name.contains(self.nesting_separator.as_str());
        if let Some(stats) = self.fields.get_mut(field_name) {
            stats.observe(value, nested_name, self.sample_cap);
        } else {
            let mut stats = FieldStats::new();
            stats.observe(value, nested_name, self.sample_cap);
            self.fields.insert(field_name.to_string(), stats);
        }

        if self.watermark_field.as_deref() == Some(field_name) {
            if let Value::String(s) = value {
                if self.latest_watermark.as_deref().map_or(true, |current| s.as_str() > current) {
                    self.latest_watermark = Some(s.clone());
                }
            }
        }
    }

    /// Combine a profiler that saw a different shard of the same batch.
    pub fn merge(&mut self, other: Profiler) {
        self.total_records += other.total_records;
        for (name, stats) in other.fields {
            match self.fields.get_mut(&name) {
                Some(existing) => existing.merge(&stats, self.sample_cap),
                None => {
                    self.fields.insert(name, stats);
                }
            }
        }
        if let Some(theirs) = other.latest_watermark {
            if self.latest_watermark.as_ref().map_or(true, |ours| theirs > *ours) {
                self.latest_watermark = Some(theirs);
            }
        }
    }

    pub fn total_records(&self) -> u64 {
        self.total_records
    }

    /// Greatest string value seen in the watermark field
    pub fn latest_watermark(&self) -> Option<&str> {
        self.latest_watermark.as_deref()
    }

    /// Derive the per-field summary, sorted by field name.
    pub fn finalize(self) -> ProfileSummary {
        if self.total_records == 0 {
            return ProfileSummary::default();
        }

        let total = self.total_records as f64;
        let fields = self
            .fields
            .into_iter()
            .map(|(field_name, stats)| summarize(field_name, &stats, total))
            .collect::<Vec<_>>();

        tracing::info!(
            records = self.total_records,
            fields = fields.len(),
            "profiled batch"
        );

        ProfileSummary {
            total_records: self.total_records,
            fields,
        }
    }
}

fn summarize(field_name: String, stats: &FieldStats, total_records: f64) -> FieldSummary {
    let (dominant_type, dominant_count) = stats.dominant_type().unwrap_or((ValueType::Unknown, 0));
    let observations = stats.types.total();

    let type_stability = ratio(dominant_count, observations);
    let cardinality = ratio(stats.samples.len() as u64, stats.count);
    let frequency = if total_records > 0.0 {
        stats.count as f64 / total_records
    } else {
        0.0
    };

    FieldSummary {
        field_name,
        frequency,
        dominant_type,
        type_stability,
        cardinality,
        is_nested: stats.is_nested,
        is_array: stats.is_array,
        dominant_pattern: stats.dominant_pattern(),
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Profile a batch of already normalized and flattened records.
pub fn profile_records(
    records: &[Map<String, Value>],
    config: &ProfilerConfig,
    nesting_separator: &str,
) -> Result<ProfileSummary, ConfigError> {
    let mut profiler = Profiler::new(config, nesting_separator)?;
    for record in records {
        profiler.add_record(record);
    }
    Ok(profiler.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::types::Pattern;
    use serde_json::json;

    fn records(values: Vec<Value>) -> Vec<Map<String, Value>> {
        values
            .into_iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn profiler() -> Profiler {
        Profiler::new(&ProfilerConfig::default(), ".").unwrap()
    }

    #[test]
    fn test_empty_batch_gives_empty_summary() {
        let summary = profiler().finalize();
        assert_eq!(summary.total_records, 0);
        assert!(summary.fields.is_empty());
    }

    #[test]
    fn test_mixed_type_field() {
        let batch = records(vec![json!({"a": 1}), json!({"a": 2}), json!({"a": "x"})]);
        let summary = profile_records(&batch, &ProfilerConfig::default(), ".").unwrap();

        let a = summary.field("a").unwrap();
        assert_eq!(summary.total_records, 3);
        assert_eq!(a.frequency, 1.0);
        assert_eq!(a.dominant_type, ValueType::Integer);
        assert!((a.type_stability - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(a.cardinality, 1.0);
    }

    #[test]
    fn test_single_typed_field_is_fully_stable() {
        let batch = records(vec![
            json!({"t": 20.5, "s": "a"}),
            json!({"t": 21.0, "s": "b"}),
            json!({"t": 19.25}),
        ]);
        let summary = profile_records(&batch, &ProfilerConfig::default(), ".").unwrap();

        assert_eq!(summary.field("t").unwrap().type_stability, 1.0);
        assert_eq!(summary.field("s").unwrap().type_stability, 1.0);
        assert!((summary.field("s").unwrap().frequency - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_type_ties_go_to_first_seen() {
        let batch = records(vec![json!({"v": "x"}), json!({"v": 1})]);
        let summary = profile_records(&batch, &ProfilerConfig::default(), ".").unwrap();

        let v = summary.field("v").unwrap();
        assert_eq!(v.dominant_type, ValueType::String);
        assert_eq!(v.type_stability, 0.5);
    }

    #[test]
    fn test_nested_path_and_array_flags() {
        let batch = records(vec![json!({"geo.lat": 1.0, "tags": ["a", "b"], "plain": 1})]);
        let summary = profile_records(&batch, &ProfilerConfig::default(), ".").unwrap();

        let lat = summary.field("geo.lat").unwrap();
        assert!(lat.is_nested);
        assert_eq!(lat.dominant_type, ValueType::Float);

        let tags = summary.field("tags").unwrap();
        assert!(tags.is_array);
        assert_eq!(tags.cardinality, 0.0);

        let plain = summary.field("plain").unwrap();
        assert!(!plain.is_nested && !plain.is_array);
    }

    #[test]
    fn test_dominant_pattern() {
        let batch = records(vec![
            json!({"ip": "10.0.0.1", "note": "hi"}),
            json!({"ip": "10.0.0.2", "note": "there"}),
            json!({"ip": "unknown"}),
        ]);
        let summary = profile_records(&batch, &ProfilerConfig::default(), ".").unwrap();

        assert_eq!(summary.field("ip").unwrap().dominant_pattern, Pattern::IpAddress);
        assert_eq!(summary.field("note").unwrap().dominant_pattern, Pattern::None);
    }

    #[test]
    fn test_cardinality_is_biased_by_sample_cap() {
        let config = ProfilerConfig { sample_cap: 5, ..ProfilerConfig::default() };
        let mut profiler = Profiler::new(&config, ".").unwrap();
        for i in 0..20 {
            profiler.add_record(json!({"id": i}).as_object().unwrap());
        }

        let summary = profiler.finalize();
        // 20 distinct values, but only 5 are remembered
        assert_eq!(summary.field("id").unwrap().cardinality, 0.25);
    }

    #[test]
    fn test_fields_sorted_by_name() {
        let batch = records(vec![json!({"zeta": 1, "alpha": 2, "mid": 3})]);
        let summary = profile_records(&batch, &ProfilerConfig::default(), ".").unwrap();

        let names: Vec<&str> = summary.fields.iter().map(|f| f.field_name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_sharded_merge_matches_single_pass() {
        let batch = records(vec![
            json!({"a": 1, "b": "x"}),
            json!({"a": "y"}),
            json!({"a": 3, "c": [1]}),
            json!({"b": "x", "timestamp": "2024-01-02"}),
        ]);

        let single = profile_records(&batch, &ProfilerConfig::default(), ".").unwrap();

        let mut left = profiler();
        let mut right = profiler();
        for record in &batch[..2] {
            left.add_record(record);
        }
        for record in &batch[2..] {
            right.add_record(record);
        }
        left.merge(right);

        assert_eq!(left.latest_watermark(), Some("2024-01-02"));
        assert_eq!(left.finalize(), single);
    }

    #[test]
    fn test_watermark_tracks_latest_value() {
        let mut profiler = profiler();
        profiler.add_record(json!({"timestamp": "2024-01-02T00:00:00"}).as_object().unwrap());
        profiler.add_record(json!({"timestamp": "2024-03-02T00:00:00"}).as_object().unwrap());
        profiler.add_record(json!({"timestamp": "2024-02-02T00:00:00"}).as_object().unwrap());

        assert_eq!(profiler.latest_watermark(), Some("2024-03-02T00:00:00"));
    }
}
