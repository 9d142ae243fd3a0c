//! Ordered classification rules
//!
//! Each rule pairs a guard with an action. The classifier walks [`RULES`] in
//! order and applies the first rule whose guard holds; later rules are never
//! consulted for that field.

use crate::classify::types::{Decision, Flag};
use crate::config::ClassifierConfig;
use crate::profile::FieldSummary;

/// Outcome of the rule that fired
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub decision: Decision,
    pub score: f64,
    pub flags: Vec<Flag>,
    pub reason: &'static str,
}

/// One guard-and-action pair in the decision chain
pub struct Rule {
    pub name: &'static str,
    pub guard: fn(&ClassifierConfig, &FieldSummary) -> bool,
    pub action: fn(&ClassifierConfig, &FieldSummary) -> Verdict,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// The decision chain, highest priority first
pub const RULES: &[Rule] = &[
    Rule {
        name: "mandatory",
        guard: is_mandatory,
        action: mirror,
    },
    Rule {
        name: "unstable_type",
        guard: is_unstable,
        action: unstable,
    },
    Rule {
        name: "weighted_score",
        guard: always,
        action: weighted_score,
    },
];

fn is_mandatory(config: &ClassifierConfig, field: &FieldSummary) -> bool {
    config.mandatory_fields.contains(&field.field_name)
}

fn mirror(_: &ClassifierConfig, _: &FieldSummary) -> Verdict {
    Verdict {
        decision: Decision::Both,
        score: 0.0,
        flags: Vec::new(),
        reason: "Mandatory Field",
    }
}

// An unstable field never goes to SQL, whatever else its statistics say
fn is_unstable(config: &ClassifierConfig, field: &FieldSummary) -> bool {
    field.type_stability < config.limits.stability_floor
}

fn unstable(_: &ClassifierConfig, _: &FieldSummary) -> Verdict {
    Verdict {
        decision: Decision::Mongo,
        score: 1.0,
        flags: vec![Flag::UnstableType],
        reason: "Hard Gate: Unstable Types",
    }
}

fn always(_: &ClassifierConfig, _: &FieldSummary) -> bool {
    true
}

fn weighted_score(config: &ClassifierConfig, field: &FieldSummary) -> Verdict {
    let weights = &config.weights;
    let limits = &config.limits;
    let mut penalty = 0.0;
    let mut flags = Vec::new();

    if field.frequency < limits.density_floor {
        penalty += weights.sparsity;
        flags.push(Flag::Sparsity);
    }

    // Only genuinely compound values are penalized. A flattened nested path
    // with a scalar dominant type adds nothing.
    if field.is_array || field.dominant_type.is_compound() {
        penalty += weights.nested;
        flags.push(Flag::ComplexStructure);
    }

    if field.cardinality < limits.cardinality_ceiling {
        penalty += weights.low_cardinality;
        flags.push(Flag::LowCardinality);
    }

    let score = penalty / weights.total();

    if score > config.decision_threshold {
        Verdict {
            decision: Decision::Mongo,
            score,
            flags,
            reason: "Score Threshold Exceeded",
        }
    } else {
        Verdict {
            decision: Decision::Sql,
            score,
            flags,
            reason: "Safe for SQL",
        }
    }
}
