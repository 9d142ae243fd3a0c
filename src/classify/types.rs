use serde::{Deserialize, Serialize};

/// Storage destination for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    #[serde(rename = "SQL")]
    Sql,
    #[serde(rename = "MONGO")]
    Mongo,
    #[serde(rename = "BOTH")]
    Both,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Sql => "SQL",
            Decision::Mongo => "MONGO",
            Decision::Both => "BOTH",
        }
    }

    pub fn to_sql(self) -> bool {
        matches!(self, Decision::Sql | Decision::Both)
    }

    pub fn to_mongo(self) -> bool {
        matches!(self, Decision::Mongo | Decision::Both)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Condition noted while classifying a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Flag {
    UnstableType,
    Sparsity,
    ComplexStructure,
    LowCardinality,
}

impl Flag {
    pub fn as_str(self) -> &'static str {
        match self {
            Flag::UnstableType => "UNSTABLE_TYPE",
            Flag::Sparsity => "SPARSITY",
            Flag::ComplexStructure => "COMPLEX_STRUCTURE",
            Flag::LowCardinality => "LOW_CARDINALITY",
        }
    }
}

/// Destination decision for one field, as persisted in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub field_name: String,
    pub decision: Decision,
    pub score: f64,
    pub flags: Vec<Flag>,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let result = ClassificationResult {
            field_name: "battery_level".to_string(),
            decision: Decision::Mongo,
            score: 0.556,
            flags: vec![Flag::Sparsity, Flag::LowCardinality],
            reason: "Score Threshold Exceeded".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "fieldName": "battery_level",
                "decision": "MONGO",
                "score": 0.556,
                "flags": ["SPARSITY", "LOW_CARDINALITY"],
                "reason": "Score Threshold Exceeded"
            })
        );
    }

    #[test]
    fn test_destinations() {
        assert!(Decision::Both.to_sql() && Decision::Both.to_mongo());
        assert!(Decision::Sql.to_sql() && !Decision::Sql.to_mongo());
        assert!(!Decision::Mongo.to_sql() && Decision::Mongo.to_mongo());
    }
}
