//! INI subset
//!
//! Values are never coerced: everything under a section is a string.

use super::Format;
use crate::error::{Error, Result};
use crate::value::Value;

pub(super) fn parse(text: &str) -> Result<Value> {
    Ok(super::parse_sections(text, |raw| Value::String(raw.to_string())))
}

pub(super) fn encode(value: &Value) -> Result<String> {
    super::encode_sections(Format::Ini, value, "=", |item| {
        let text = item.to_string();
        if text.trim() != text {
            return Err(Error::unencodable(
                Format::Ini.name(),
                "surrounding whitespace would be trimmed on read",
            ));
        }
        Ok(text)
    })
}
