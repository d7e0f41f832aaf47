//! Flat TOML subset
//!
//! `[section]` headers and `key = value` lines only. No arrays, table
//! arrays, inline tables or escape sequences.

use super::Format;
use crate::error::Result;
use crate::value::Value;

pub(super) fn parse(text: &str) -> Result<Value> {
    Ok(super::parse_sections(text, super::coerce_scalar))
}

pub(super) fn encode(value: &Value) -> Result<String> {
    super::encode_sections(Format::Toml, value, " = ", |item| Ok(scalar(item)))
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Float(f) => super::float_text(*f),
        Value::Integer(_) | Value::Bool(_) | Value::Null => value.to_string(),
        Value::String(s) => format!("\"{}\"", s),
        // Anything deeper than a section is written as a string
        Value::Sequence(_) | Value::Mapping(_) => format!("\"{}\"", value),
    }
}
