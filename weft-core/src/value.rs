//! Dynamic payload type for packets.
//!
//! Wraps `serde_json::Value` so payloads of any declared port type can be
//! carried, cloned for fan-out, and round-tripped through graph
//! descriptions.

use crate::error::{FlowError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Dynamic payload carried by packets and initial-packet registrations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(pub JsonValue);

impl Value {
    /// Create a null value.
    pub fn null() -> Self {
        Self(JsonValue::Null)
    }

    /// Create a boolean value.
    pub fn bool(v: bool) -> Self {
        Self(JsonValue::Bool(v))
    }

    /// Create an integer value.
    pub fn int(v: i64) -> Self {
        Self(JsonValue::Number(v.into()))
    }

    /// Create a floating-point value.
    pub fn float(v: f64) -> Self {
        Self(serde_json::Number::from_f64(v).map_or(JsonValue::Null, JsonValue::Number))
    }

    /// Create a string value.
    pub fn string(v: impl Into<String>) -> Self {
        Self(JsonValue::String(v.into()))
    }

    /// Create a value from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Ok(Self::null());
        }
        serde_json::from_slice(bytes)
            .map(Self)
            .map_err(|e| FlowError::Serialization(format!("Failed to parse value: {}", e)))
    }

    /// Serialize to JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.0)
            .map_err(|e| FlowError::Serialization(format!("Failed to serialize value: {}", e)))
    }

    /// Check if the value is null.
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// The JSON kind of this value ("null", "boolean", "number", "string",
    /// "array", "object"). Used in type-validation error messages.
    pub fn kind(&self) -> &'static str {
        match &self.0 {
            JsonValue::Null => "null",
            JsonValue::Bool(_) => "boolean",
            JsonValue::Number(_) => "number",
            JsonValue::String(_) => "string",
            JsonValue::Array(_) => "array",
            JsonValue::Object(_) => "object",
        }
    }

    /// Convert to string if possible.
    pub fn as_string(&self) -> Option<String> {
        match &self.0 {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            JsonValue::Bool(b) => Some(b.to_string()),
            JsonValue::Null => None,
            _ => Some(self.0.to_string()),
        }
    }

    /// Convert to f64 if possible.
    pub fn as_f64(&self) -> Option<f64> {
        match &self.0 {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Convert to i64 if possible.
    pub fn as_i64(&self) -> Option<i64> {
        match &self.0 {
            JsonValue::Number(n) => n.as_i64(),
            JsonValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Convert to bool if possible.
    pub fn as_bool(&self) -> Option<bool> {
        match &self.0 {
            JsonValue::Bool(b) => Some(*b),
            JsonValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            JsonValue::Number(n) => Some(n.as_f64().is_some_and(|v| v != 0.0)),
            JsonValue::Null => Some(false),
            _ => None,
        }
    }

    /// Access the inner serde_json::Value.
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Convert into the inner serde_json::Value.
    pub fn into_inner(self) -> JsonValue {
        self.0
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::null()
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        Self(v)
    }
}

impl From<Value> for JsonValue {
    fn from(v: Value) -> Self {
        v.0
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::string(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::bool(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn value_from_bytes() {
        let bytes = br#"{"name": "test", "score": 0.95}"#;
        let value = Value::from_bytes(bytes).unwrap();
        assert_eq!(value.kind(), "object");
    }

    #[test]
    fn empty_bytes_returns_null() {
        let value = Value::from_bytes(&[]).unwrap();
        assert!(value.is_null());
    }

    #[test]
    fn value_kinds() {
        assert_eq!(Value::null().kind(), "null");
        assert_eq!(Value::bool(true).kind(), "boolean");
        assert_eq!(Value::int(3).kind(), "number");
        assert_eq!(Value::string("hi").kind(), "string");
        assert_eq!(Value(json!([1, 2])).kind(), "array");
        assert_eq!(Value(json!({"a": 1})).kind(), "object");
    }

    #[test]
    fn conversions() {
        assert_eq!(Value::int(42).as_i64(), Some(42));
        assert_eq!(Value::string("42").as_i64(), Some(42));
        assert_eq!(Value::float(1.5).as_f64(), Some(1.5));
        assert_eq!(Value::string("yes").as_bool(), Some(true));
        assert_eq!(Value::int(7).as_string(), Some("7".to_string()));
        assert_eq!(Value::null().as_string(), None);
    }

    #[test]
    fn roundtrip_bytes() {
        let value = Value(json!({"items": [1, 2, 3]}));
        let bytes = value.to_bytes().unwrap();
        assert_eq!(Value::from_bytes(&bytes).unwrap(), value);
    }

    #[test]
    fn from_impls() {
        assert_eq!(Value::from("hello").kind(), "string");
        assert_eq!(Value::from(4_i64).as_i64(), Some(4));
        assert_eq!(Value::from(true).as_bool(), Some(true));
    }
}
