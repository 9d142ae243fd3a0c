use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordered set of canonical field names learned during one normalization run.
///
/// Insertion order is the match priority: when a new key is close to several
/// entries, the earliest one wins. Entries are never removed or reordered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "VocabularyFile", into = "VocabularyFile")]
pub struct KeyRegistry {
    keys: Vec<String>,
    index: HashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct VocabularyFile {
    keys: Vec<String>,
}

impl From<VocabularyFile> for KeyRegistry {
    fn from(file: VocabularyFile) -> Self {
        KeyRegistry::from_keys(file.keys)
    }
}

impl From<KeyRegistry> for VocabularyFile {
    fn from(registry: KeyRegistry) -> Self {
        VocabularyFile { keys: registry.keys }
    }
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from a saved vocabulary, dropping exact repeats.
    pub fn from_keys<I: IntoIterator<Item = String>>(keys: I) -> Self {
        let mut registry = KeyRegistry::new();
        for key in keys {
            registry.push(key);
        }
        registry
    }

    /// Position of an exact entry
    pub fn position(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Append a key. Returns false if it was already present.
    pub fn push(&mut self, key: String) -> bool {
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key.clone(), self.keys.len());
        self.keys.push(key);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_order_and_rejects_repeats() {
        let mut registry = KeyRegistry::new();
        assert!(registry.push("b".to_string()));
        assert!(registry.push("a".to_string()));
        assert!(!registry.push("b".to_string()));

        assert_eq!(registry.keys(), &["b".to_string(), "a".to_string()]);
        assert_eq!(registry.position("a"), Some(1));
    }

    #[test]
    fn test_vocabulary_file_shape() {
        let registry = KeyRegistry::from_keys(vec!["user_name".to_string(), "temp".to_string()]);
        let json = serde_json::to_value(&registry).unwrap();
        assert_eq!(json, serde_json::json!({"keys": ["user_name", "temp"]}));

        let back: KeyRegistry = serde_json::from_value(json).unwrap();
        assert_eq!(back, registry);
        assert_eq!(back.position("temp"), Some(1));
    }
}
