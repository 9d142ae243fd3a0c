use crate::profile::patterns::detect_pattern;
use crate::profile::types::{Pattern, ValueType};
use serde_json::Value;
use std::collections::HashSet;

/// Counter that remembers the order in which keys were first seen.
///
/// Used for the type and pattern histograms, where ties on the maximum count
/// are broken by first appearance. Both key spaces are tiny, so a vector scan
/// is enough.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedCounter<K> {
    entries: Vec<(K, u64)>,
}

impl<K: Copy + PartialEq> OrderedCounter<K> {
    pub fn new() -> Self {
        OrderedCounter { entries: Vec::new() }
    }

    pub fn add(&mut self, key: K, n: u64) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, count)) => *count += n,
            None => self.entries.push((key, n)),
        }
    }

    pub fn get(&self, key: K) -> u64 {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, c)| c).sum()
    }

    /// Highest count among keys passing `filter`; earliest key wins ties.
    pub fn max_by_count<F: Fn(K) -> bool>(&self, filter: F) -> Option<(K, u64)> {
        let mut best: Option<(K, u64)> = None;
        for &(key, count) in self.entries.iter().filter(|(k, _)| filter(*k)) {
            match best {
                Some((_, best_count)) if best_count >= count => {}
                _ => best = Some((key, count)),
            }
        }
        best
    }

    pub fn iter(&self) -> impl Iterator<Item = &(K, u64)> {
        self.entries.iter()
    }

    pub fn merge(&mut self, other: &OrderedCounter<K>) {
        for &(key, count) in other.entries.iter() {
            self.add(key, count);
        }
    }
}

impl<K: Copy + PartialEq> Default for OrderedCounter<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Running statistics for one field across a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldStats {
    pub count: u64,
    pub types: OrderedCounter<ValueType>,
    /// Distinct string forms, never more than the sample cap
    pub samples: HashSet<String>,
    pub is_nested: bool,
    pub is_array: bool,
    pub patterns: OrderedCounter<Pattern>,
}

impl FieldStats {
    pub fn new() -> Self {
        FieldStats {
            count: 0,
            types: OrderedCounter::new(),
            samples: HashSet::new(),
            is_nested: false,
            is_array: false,
            patterns: OrderedCounter::new(),
        }
    }

    /// Fold one observed value into the statistics.
    pub fn observe(&mut self, value: &Value, nested_name: bool, sample_cap: usize) {
        self.count += 1;
        self.types.add(ValueType::from_value(value), 1);

        if nested_name || value.is_object() {
            self.is_nested = true;
        }

        match value {
            Value::Array(_) => {
                self.is_array = true;
            }
            _ => {
                if self.samples.len() < sample_cap {
                    self.samples.insert(sample_form(value));
                }
                if let Value::String(s) = value {
                    self.patterns.add(detect_pattern(s), 1);
                }
            }
        }
    }

    /// Combine statistics gathered on another shard of the same batch.
    pub fn merge(&mut self, other: &FieldStats, sample_cap: usize) {
        self.count += other.count;
        self.types.merge(&other.types);
        self.is_nested |= other.is_nested;
        self.is_array |= other.is_array;
        self.patterns.merge(&other.patterns);

        for sample in other.samples.iter() {
            if self.samples.len() >= sample_cap {
                break;
            }
            self.samples.insert(sample.clone());
        }
    }

    pub fn dominant_type(&self) -> Option<(ValueType, u64)> {
        self.types.max_by_count(|_| true)
    }

    pub fn dominant_pattern(&self) -> Pattern {
        self.patterns
            .max_by_count(|p| p != Pattern::None)
            .map(|(p, _)| p)
            .unwrap_or(Pattern::None)
    }
}

impl Default for FieldStats {
    fn default() -> Self {
        Self::new()
    }
}

/// String form used for distinct-value counting: strings verbatim,
/// everything else as compact JSON.
pub fn sample_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_counter_ties_go_to_first_seen() {
        let mut counter = OrderedCounter::new();
        counter.add(ValueType::String, 2);
        counter.add(ValueType::Integer, 2);
        counter.add(ValueType::Null, 1);

        assert_eq!(counter.max_by_count(|_| true), Some((ValueType::String, 2)));
        assert_eq!(counter.total(), 5);
    }

    #[test]
    fn test_observe_scalars() {
        let mut stats = FieldStats::new();
        stats.observe(&json!(1), false, 10);
        stats.observe(&json!(1), false, 10);
        stats.observe(&json!("1"), false, 10);

        assert_eq!(stats.count, 3);
        assert_eq!(stats.types.get(ValueType::Integer), 2);
        assert_eq!(stats.types.get(ValueType::String), 1);
        // 1 and "1" share a string form
        assert_eq!(stats.samples.len(), 1);
        assert!(!stats.is_array);
        assert!(!stats.is_nested);
    }

    #[test]
    fn test_arrays_are_flagged_not_sampled() {
        let mut stats = FieldStats::new();
        stats.observe(&json!([1, 2]), false, 10);

        assert!(stats.is_array);
        assert!(stats.samples.is_empty());
        assert_eq!(stats.dominant_type(), Some((ValueType::Array, 1)));
    }

    #[test]
    fn test_nested_from_name_or_object_value() {
        let mut by_name = FieldStats::new();
        by_name.observe(&json!(1.5), true, 10);
        assert!(by_name.is_nested);

        let mut by_value = FieldStats::new();
        by_value.observe(&json!({"x": 1}), false, 10);
        assert!(by_value.is_nested);
    }

    #[test]
    fn test_sample_cap_bounds_memory() {
        let mut stats = FieldStats::new();
        for i in 0..50 {
            stats.observe(&json!(i), false, 10);
        }
        assert_eq!(stats.samples.len(), 10);
        assert_eq!(stats.count, 50);
    }

    #[test]
    fn test_dominant_pattern_ignores_none() {
        let mut stats = FieldStats::new();
        stats.observe(&json!("plain"), false, 10);
        stats.observe(&json!("other"), false, 10);
        stats.observe(&json!("alice@example.com"), false, 10);

        assert_eq!(stats.dominant_pattern(), Pattern::Email);
    }

    #[test]
    fn test_merge_sums_and_unions() {
        let mut left = FieldStats::new();
        left.observe(&json!(1), false, 3);
        left.observe(&json!(2), false, 3);

        let mut right = FieldStats::new();
        right.observe(&json!("x"), false, 3);
        right.observe(&json!(2), false, 3);
        right.observe(&json!([0]), false, 3);

        left.merge(&right, 3);

        assert_eq!(left.count, 5);
        assert_eq!(left.types.get(ValueType::Integer), 3);
        assert_eq!(left.types.get(ValueType::String), 1);
        assert!(left.is_array);
        assert_eq!(left.samples.len(), 3);
    }
}
