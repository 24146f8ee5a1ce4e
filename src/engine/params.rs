//! Parameter Map
//!
//! Typed, read-only access to the resolved parameter tree a render consumes.
//! Keys are dotted paths (`"kick.sub.amp.decay_ms"`) that resolve either
//! through nested objects or through a literal flat key at the root. A key
//! that is missing, or whose leaf has the wrong type, always yields the
//! caller's default.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EngineError, Result};

/// Resolved parameter tree for one render call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamMap {
    root: Map<String, Value>,
}

impl ParamMap {
    /// Create an empty map (every lookup returns its default)
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value; the root must be an object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(EngineError::InvalidParams {
                reason: format!("expected a JSON object at the root, found {}", type_name(&other)),
            }),
        }
    }

    /// Parse a JSON document into a parameter map
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Builder form of [`ParamMap::set`]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Insert a value along a dotted path, creating intermediate objects
    ///
    /// An intermediate that exists but is not an object is replaced.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let mut segments = key.split('.').peekable();
        let mut node = &mut self.root;
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                node.insert(segment.to_string(), value.into());
                return;
            }
            let child = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            match child {
                Value::Object(map) => node = map,
                _ => return,
            }
        }
    }

    /// Look up the raw leaf for a dotted key
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        self.lookup_nested(key).or_else(|| self.root.get(key))
    }

    fn lookup_nested(&self, key: &str) -> Option<&Value> {
        let mut segments = key.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Whether a key resolves to any value
    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Numeric leaf, if present and numeric
    pub fn get_opt_f32(&self, key: &str) -> Option<f32> {
        self.lookup(key).and_then(Value::as_f64).map(|v| v as f32)
    }

    /// Numeric leaf or default
    pub fn get_f32(&self, key: &str, default: f32) -> f32 {
        self.get_opt_f32(key).unwrap_or(default)
    }

    /// First numeric leaf found among several candidate keys, or default
    ///
    /// Macro knobs are accepted both at the root (`"tune"`) and under the
    /// instrument (`"kick.tune"`).
    pub fn get_first_f32(&self, keys: &[&str], default: f32) -> f32 {
        keys.iter()
            .find_map(|key| self.get_opt_f32(key))
            .unwrap_or(default)
    }

    /// Boolean leaf or default
    ///
    /// Numbers are truthy when non-zero; the strings "true"/"false" are accepted.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.lookup(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(default),
            Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => default,
            },
            _ => default,
        }
    }

    /// String leaf or default
    pub fn get_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.lookup(key).and_then(Value::as_str).unwrap_or(default)
    }

    /// Decibel leaf converted to linear gain
    pub fn get_db_gain(&self, key: &str, default_db: f32) -> f32 {
        super::buffer::db_to_linear(self.get_f32(key, default_db))
    }

    /// Borrow the underlying JSON object
    pub fn as_object(&self) -> &Map<String, Value> {
        &self.root
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    #[test]
    fn test_nested_lookup() {
        let params = ParamMap::from_value(json!({
            "kick": { "sub": { "amp": { "decay_ms": 250.0 } } }
        }))
        .unwrap();
        assert_eq!(params.get_f32("kick.sub.amp.decay_ms", 1.0), 250.0);
    }

    #[test]
    fn test_flat_key_lookup() {
        let params = ParamMap::from_value(json!({ "kick.click.gain_db": -6.0 })).unwrap();
        assert_eq!(params.get_f32("kick.click.gain_db", 0.0), -6.0);
    }

    #[test]
    fn test_missing_and_non_object_intermediate_use_default() {
        let params = ParamMap::from_value(json!({ "kick": { "sub": 3.0 } })).unwrap();
        assert_eq!(params.get_f32("kick.sub.gain_db", -3.0), -3.0);
        assert_eq!(params.get_f32("snare.body", 0.5), 0.5);
        assert!(!params.get_bool("kick.sub.mute", false));
    }

    #[test]
    fn test_wrong_type_uses_default() {
        let params = ParamMap::new().with("hat.color", "bright");
        assert_eq!(params.get_f32("hat.color", 0.5), 0.5);
        assert_eq!(params.get_str("hat.color", "dark"), "bright");
    }

    #[test]
    fn test_bool_coercion() {
        let params = ParamMap::new()
            .with("a", true)
            .with("b", 0)
            .with("c", "FALSE")
            .with("d", "maybe");
        assert!(params.get_bool("a", false));
        assert!(!params.get_bool("b", true));
        assert!(!params.get_bool("c", true));
        assert!(params.get_bool("d", true));
    }

    #[test]
    fn test_builder_creates_nested_path() {
        let params = ParamMap::new()
            .with("snare.shell.feedback", 0.9)
            .with("snare.shell.pitch_hz", 200.0);
        let shell = &params.as_object()["snare"]["shell"];
        assert_eq!(shell["feedback"], json!(0.9));
        assert_eq!(params.get_f32("snare.shell.pitch_hz", 0.0), 200.0);
    }

    #[test]
    fn test_builder_replaces_scalar_intermediate() {
        let params = ParamMap::new().with("kick", 1.0).with("kick.tune", 50.0);
        assert_eq!(params.get_f32("kick.tune", 0.0), 50.0);
    }

    #[test]
    fn test_get_first_prefers_earlier_keys() {
        let params = ParamMap::new().with("tune", 50.0).with("kick.tune", 60.0);
        assert_eq!(params.get_first_f32(&["kick.tune", "tune"], 45.0), 60.0);
        assert_eq!(params.get_first_f32(&["kick.missing", "tune"], 45.0), 50.0);
        assert_eq!(params.get_first_f32(&["nope"], 45.0), 45.0);
    }

    #[test]
    fn test_db_gain() {
        let params = ParamMap::new().with("kick.click.gain_db", -20.0);
        assert_relative_eq!(params.get_db_gain("kick.click.gain_db", 0.0), 0.1, epsilon = 1e-6);
        assert_relative_eq!(params.get_db_gain("kick.sub.gain_db", 0.0), 1.0);
    }

    #[test]
    fn test_non_object_root_rejected() {
        let err = ParamMap::from_json("[1, 2, 3]").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMS");
    }
}
