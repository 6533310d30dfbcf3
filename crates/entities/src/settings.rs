//! Per-user settings bag.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Per-user key/value settings.
///
/// Every key present in the default bag is known; updates must keep the
/// JSON kind of the existing value (a string setting stays a string, a
/// boolean stays a boolean). Validation of incoming updates lives in the
/// server's settings service; this type only holds the bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    values: Map<String, Value>,
}

impl Settings {
    /// Returns the value for a key, if the key exists.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Replaces the value for an existing key. Returns false if the key
    /// is unknown.
    pub fn set(&mut self, key: &str, value: Value) -> bool {
        match self.values.get_mut(key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Returns the configured language.
    pub fn language(&self) -> &str {
        self.values
            .get("language")
            .and_then(Value::as_str)
            .unwrap_or("en")
    }

    /// Iterates over all keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl Default for Settings {
    fn default() -> Self {
        let mut values = Map::new();
        values.insert("language".to_string(), json!("en"));
        values.insert("notifications".to_string(), json!(true));
        values.insert("theme".to_string(), json!("light"));
        Self { values }
    }
}

/// Human-readable JSON kind of a value, used in type-mismatch messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.language(), "en");
        assert_eq!(settings.get("notifications"), Some(&json!(true)));
        assert_eq!(settings.get("theme"), Some(&json!("light")));
    }

    #[test]
    fn test_set_known_key() {
        let mut settings = Settings::default();
        assert!(settings.set("language", json!("de")));
        assert_eq!(settings.language(), "de");
    }

    #[test]
    fn test_set_unknown_key_is_rejected() {
        let mut settings = Settings::default();
        assert!(!settings.set("no_such_key", json!(1)));
        assert!(settings.get("no_such_key").is_none());
    }

    #[test]
    fn test_value_kind_names() {
        assert_eq!(value_kind(&json!("x")), "string");
        assert_eq!(value_kind(&json!(1)), "number");
        assert_eq!(value_kind(&json!(true)), "boolean");
        assert_eq!(value_kind(&Value::Null), "null");
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let settings = Settings::default();
        let value = serde_json::to_value(&settings).unwrap();
        assert!(value.is_object());
        assert_eq!(value["language"], json!("en"));
    }
}
