use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Runtime type of one observed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Null,
    Boolean,
    Integer,
    Float,
    String,
    Array,
    Object,
    #[serde(other)]
    Unknown,
}

impl ValueType {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Boolean,
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    ValueType::Integer
                } else if n.is_f64() {
                    ValueType::Float
                } else {
                    ValueType::Unknown
                }
            }
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Object,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Null => "null",
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Object => "object",
            ValueType::Unknown => "unknown",
        }
    }

    /// Object or array
    pub fn is_compound(self) -> bool {
        matches!(self, ValueType::Array | ValueType::Object)
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognised shape of a string value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    IpAddress,
    Email,
    Url,
    Uuid,
    Timestamp,
    #[serde(other)]
    None,
}

impl Pattern {
    pub fn as_str(self) -> &'static str {
        match self {
            Pattern::IpAddress => "ip_address",
            Pattern::Email => "email",
            Pattern::Url => "url",
            Pattern::Uuid => "uuid",
            Pattern::Timestamp => "timestamp",
            Pattern::None => "none",
        }
    }
}

/// Finalized statistics for one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    pub field_name: String,
    pub frequency: f64,
    pub dominant_type: ValueType,
    pub type_stability: f64,
    pub cardinality: f64,
    pub is_nested: bool,
    pub is_array: bool,
    #[serde(default = "no_pattern")]
    pub dominant_pattern: Pattern,
}

fn no_pattern() -> Pattern {
    Pattern::None
}

/// The persisted output of one profiling pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub total_records: u64,
    pub fields: Vec<FieldSummary>,
}

impl ProfileSummary {
    pub fn field(&self, name: &str) -> Option<&FieldSummary> {
        self.fields.iter().find(|f| f.field_name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_types() {
        assert_eq!(ValueType::from_value(&json!(null)), ValueType::Null);
        assert_eq!(ValueType::from_value(&json!(true)), ValueType::Boolean);
        assert_eq!(ValueType::from_value(&json!(3)), ValueType::Integer);
        assert_eq!(ValueType::from_value(&json!(u64::MAX)), ValueType::Integer);
        assert_eq!(ValueType::from_value(&json!(3.0)), ValueType::Float);
        assert_eq!(ValueType::from_value(&json!("3")), ValueType::String);
        assert_eq!(ValueType::from_value(&json!([3])), ValueType::Array);
        assert_eq!(ValueType::from_value(&json!({"a": 3})), ValueType::Object);
    }

    #[test]
    fn test_unrecognised_names_deserialize_as_fallbacks() {
        let t: ValueType = serde_json::from_value(json!("d.d.d.d")).unwrap();
        assert_eq!(t, ValueType::Unknown);
        let p: Pattern = serde_json::from_value(json!("phone")).unwrap();
        assert_eq!(p, Pattern::None);
    }

    #[test]
    fn test_summary_field_names() {
        let summary = FieldSummary {
            field_name: "a".to_string(),
            frequency: 1.0,
            dominant_type: ValueType::Integer,
            type_stability: 1.0,
            cardinality: 0.5,
            is_nested: false,
            is_array: false,
            dominant_pattern: Pattern::None,
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["dominant_type"], "integer");
        assert_eq!(json["dominant_pattern"], "none");
        assert_eq!(json["type_stability"], 1.0);
    }
}
