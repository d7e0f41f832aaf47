//! JSON via `serde_json`

use crate::error::{Error, Result};
use crate::value::Value;

pub(super) fn parse(text: &str) -> Result<Value> {
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|e| Error::malformed("json", e.to_string()))?;
    Ok(Value::from(json))
}

pub(super) fn encode(value: &Value, indent: bool) -> Result<String> {
    let encoded = if indent {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    encoded.map_err(|e| Error::internal(format!("JSON encoding failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_nested() {
        let value = parse(r#"{"Database": {"Timeout": 30, "Hosts": ["a", "b"]}, "on": true}"#)
            .unwrap();

        assert_eq!(
            value,
            Value::from(json!({"Database": {"Timeout": 30, "Hosts": ["a", "b"]}, "on": true}))
        );
    }

    #[test]
    fn test_parse_malformed_has_location() {
        let err = parse("{\"a\": 1,,}").unwrap_err();
        let display = err.to_string();

        assert!(display.contains("Malformed json input"));
        assert!(display.contains("line 1"), "{}", display);
    }

    #[test]
    fn test_encode_compact_and_pretty() {
        let value = Value::from(json!({"a": {"b": 1}}));

        assert_eq!(encode(&value, false).unwrap(), r#"{"a":{"b":1}}"#);
        assert_eq!(
            encode(&value, true).unwrap(),
            "{\n  \"a\": {\n    \"b\": 1\n  }\n}"
        );
    }

    #[test]
    fn test_encode_keeps_key_order() {
        let value = parse(r#"{"z": 1, "a": 2}"#).unwrap();
        assert_eq!(encode(&value, false).unwrap(), r#"{"z":1,"a":2}"#);
    }
}
