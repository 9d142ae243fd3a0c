use crate::classify::manifest::ClassificationManifest;
use crate::classify::rules::{Rule, RULES};
use crate::classify::types::ClassificationResult;
use crate::config::ClassifierConfig;
use crate::error::ConfigError;
use crate::profile::{FieldSummary, ProfileSummary};

/// Rule-based field classifier.
///
/// A pure function of its configuration and the summary it is given: the
/// same input always yields the same result.
#[derive(Debug, Clone)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    /// Validate the configuration once and build a classifier from it.
    pub fn new(config: ClassifierConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Classifier { config })
    }

    /// Names of the rules in the order they are tried
    pub fn rule_names() -> Vec<&'static str> {
        RULES.iter().map(|r| r.name).collect()
    }

    /// Classify one field
    pub fn classify(&self, field: &FieldSummary) -> ClassificationResult {
        let rule = self.first_matching_rule(field);
        let verdict = (rule.action)(&self.config, field);

        tracing::debug!(
            field = %field.field_name,
            rule = rule.name,
            decision = %verdict.decision,
            score = verdict.score,
            "classified field"
        );

        ClassificationResult {
            field_name: field.field_name.clone(),
            decision: verdict.decision,
            score: round3(verdict.score),
            flags: verdict.flags,
            reason: verdict.reason.to_string(),
        }
    }

    /// Classify every field of a profile summary, keeping summary order
    pub fn classify_all(&self, summary: &ProfileSummary) -> ClassificationManifest {
        let results = summary
            .fields
            .iter()
            .map(|field| self.classify(field))
            .collect::<Vec<_>>();

        tracing::info!(fields = results.len(), "classified profile summary");
        ClassificationManifest::new(results)
    }

    fn first_matching_rule(&self, field: &FieldSummary) -> &'static Rule {
        RULES
            .iter()
            .find(|rule| (rule.guard)(&self.config, field))
            .unwrap_or(&RULES[RULES.len() - 1])
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::types::{Decision, Flag};
    use crate::profile::{Pattern, ValueType};

    fn field(name: &str, frequency: f64, stability: f64, cardinality: f64) -> FieldSummary {
        FieldSummary {
            field_name: name.to_string(),
            frequency,
            dominant_type: ValueType::Integer,
            type_stability: stability,
            cardinality,
            is_nested: false,
            is_array: false,
            dominant_pattern: Pattern::None,
        }
    }

    fn classifier() -> Classifier {
        Classifier::new(ClassifierConfig::default()).unwrap()
    }

    #[test]
    fn test_rule_priority_order() {
        assert_eq!(
            Classifier::rule_names(),
            vec!["mandatory", "unstable_type", "weighted_score"]
        );
    }

    #[test]
    fn test_clean_scalar_goes_to_sql() {
        let result = classifier().classify(&field("reading", 1.0, 1.0, 0.5));

        assert_eq!(result.decision, Decision::Sql);
        assert_eq!(result.score, 0.0);
        assert!(result.flags.is_empty());
        assert_eq!(result.reason, "Safe for SQL");
    }

    #[test]
    fn test_unstable_type_gate() {
        let result = classifier().classify(&field("reading", 1.0, 0.5, 0.5));

        assert_eq!(result.decision, Decision::Mongo);
        assert_eq!(result.score, 1.0);
        assert_eq!(result.flags, vec![Flag::UnstableType]);
    }

    #[test]
    fn test_gate_ignores_otherwise_clean_statistics() {
        let mut f = field("reading", 1.0, 0.5, 0.9);
        f.dominant_type = ValueType::String;
        let result = classifier().classify(&f);

        assert_eq!(result.decision, Decision::Mongo);
        assert_eq!(result.flags, vec![Flag::UnstableType]);
    }

    #[test]
    fn test_mandatory_field_beats_instability() {
        let mut f = field("username", 0.1, 0.2, 0.0);
        f.is_array = true;
        let result = classifier().classify(&f);

        assert_eq!(result.decision, Decision::Both);
        assert_eq!(result.reason, "Mandatory Field");
        assert!(result.flags.is_empty());
    }

    #[test]
    fn test_sparsity_alone_exceeds_threshold() {
        let result = classifier().classify(&field("battery", 0.4, 1.0, 0.5));

        // 1.5 / 4.5
        assert_eq!(result.decision, Decision::Mongo);
        assert_eq!(result.score, 0.333);
        assert_eq!(result.flags, vec![Flag::Sparsity]);
        assert_eq!(result.reason, "Score Threshold Exceeded");
    }

    #[test]
    fn test_low_cardinality_alone_stays_sql() {
        let result = classifier().classify(&field("status", 1.0, 1.0, 0.01));

        // 1.0 / 4.5
        assert_eq!(result.decision, Decision::Sql);
        assert_eq!(result.score, 0.222);
        assert_eq!(result.flags, vec![Flag::LowCardinality]);
    }

    #[test]
    fn test_array_field_is_complex() {
        let mut f = field("tags", 1.0, 1.0, 0.0);
        f.is_array = true;
        f.dominant_type = ValueType::Array;
        let result = classifier().classify(&f);

        // (2.0 + 1.0) / 4.5
        assert_eq!(result.decision, Decision::Mongo);
        assert_eq!(result.score, 0.667);
        assert_eq!(result.flags, vec![Flag::ComplexStructure, Flag::LowCardinality]);
    }

    #[test]
    fn test_nested_path_with_scalar_type_not_penalized() {
        let mut f = field("geo.lat", 1.0, 1.0, 0.8);
        f.is_nested = true;
        f.dominant_type = ValueType::Float;
        let result = classifier().classify(&f);

        assert_eq!(result.decision, Decision::Sql);
        assert_eq!(result.score, 0.0);
        assert!(result.flags.is_empty());
    }

    #[test]
    fn test_object_dominant_type_is_complex() {
        let mut f = field("meta", 1.0, 1.0, 0.8);
        f.is_nested = true;
        f.dominant_type = ValueType::Object;
        let result = classifier().classify(&f);

        assert_eq!(result.flags, vec![Flag::ComplexStructure]);
        assert_eq!(result.decision, Decision::Mongo);
    }

    #[test]
    fn test_custom_floor_and_mandatory_set() {
        let mut config = ClassifierConfig::default();
        config.limits.stability_floor = 0.6;
        config.mandatory_fields.clear();
        let classifier = Classifier::new(config).unwrap();

        let result = classifier.classify(&field("timestamp", 1.0, 0.7, 0.5));
        assert_eq!(result.decision, Decision::Sql);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let summary = ProfileSummary {
            total_records: 10,
            fields: vec![
                field("a", 1.0, 1.0, 0.5),
                field("b", 0.3, 1.0, 0.05),
                field("c", 1.0, 0.5, 0.5),
            ],
        };

        let c = classifier();
        let first = serde_json::to_string(&c.classify_all(&summary)).unwrap();
        let second = serde_json::to_string(&c.classify_all(&summary)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = ClassifierConfig::default();
        config.limits.density_floor = -0.1;
        assert!(Classifier::new(config).is_err());
    }
}
