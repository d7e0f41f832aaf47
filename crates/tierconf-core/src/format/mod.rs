//! Format parsers and encoders
//!
//! JSON goes through `serde_json`. TOML, YAML and INI are deliberately
//! minimal line-oriented subsets: sections/one level of nesting for TOML and
//! INI, indentation-nested `key: value` mappings for YAML. None of them
//! support arrays, so sequences do not survive a round trip through those
//! three encoders.

mod ini;
mod json;
mod toml;
mod yaml;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::value::Value;

/// A supported configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Toml,
    Yaml,
    Ini,
}

impl Format {
    /// All supported formats
    pub const ALL: [Format; 4] = [Format::Json, Format::Toml, Format::Yaml, Format::Ini];

    /// Detect the format from a file extension (case-insensitive)
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        ext.parse::<Format>()
            .map_err(|e: Error| e.with_path(path.display().to_string()))
    }

    /// Canonical lowercase name, also the default file extension
    pub fn name(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Toml => "toml",
            Format::Yaml => "yaml",
            Format::Ini => "ini",
        }
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "toml" => Ok(Format::Toml),
            "yaml" | "yml" => Ok(Format::Yaml),
            "ini" => Ok(Format::Ini),
            _ => Err(Error::unsupported_format(if s.is_empty() {
                "(none)"
            } else {
                s
            })),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse `text` as `format`
pub fn parse(format: Format, text: &str) -> Result<Value> {
    match format {
        Format::Json => json::parse(text),
        Format::Toml => toml::parse(text),
        Format::Yaml => yaml::parse(text),
        Format::Ini => ini::parse(text),
    }
}

/// Encode `value` as `format`.
///
/// `indent` only affects JSON; the other formats have one canonical layout.
/// TOML, YAML and INI fail with `Unencodable` when a key or value cannot be
/// written as a single line that parses back to the same key and value.
pub fn encode(format: Format, value: &Value, indent: bool) -> Result<String> {
    match format {
        Format::Json => json::encode(value, indent),
        Format::Toml => toml::encode(value),
        Format::Yaml => yaml::encode(value),
        Format::Ini => ini::encode(value),
    }
}

/// Read and parse a file, choosing the format from its extension
pub fn parse_file(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let display = path.display().to_string();
    if !path.exists() {
        return Err(Error::file_not_found(display));
    }
    let format = Format::from_path(path)?;
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(&display, &e))?;
    parse(format, &text).map_err(|e| e.with_path(display))
}

/// Scalar coercion shared by the TOML and YAML subsets
///
/// `"..."` → string without the quotes (no escape processing),
/// `true`/`false` → bool, a finite float → float, anything else stays a
/// raw string.
pub(crate) fn coerce_scalar(raw: &str) -> Value {
    if let Some(inner) = strip_quotes(raw, '"') {
        return Value::String(inner.to_string());
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => match raw.parse::<f64>() {
            Ok(f) if f.is_finite() => Value::Float(f),
            _ => Value::String(raw.to_string()),
        },
    }
}

pub(crate) fn strip_quotes(raw: &str, quote: char) -> Option<&str> {
    if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
        Some(&raw[1..raw.len() - 1])
    } else {
        None
    }
}

/// Float text that re-parses as a float, never as an integer
pub(crate) fn float_text(f: f64) -> String {
    format!("{:?}", f)
}

/// Section layout shared by the INI and TOML parsers.
///
/// `[name]` opens (or re-opens) section `name`; `key<sep>value` is split on
/// the first `=`. Entries before any header land in the `Global` section,
/// which is only created once it receives an entry.
pub(crate) fn parse_sections(text: &str, coerce: impl Fn(&str) -> Value) -> Value {
    let mut root = crate::value::Mapping::new();
    let mut section = String::from("Global");

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim();
            if !name.is_empty() {
                section = name.to_string();
            }
            continue;
        }

        let Some((key, raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let entry = root
            .entry(section.clone())
            .or_insert_with(Value::empty_mapping);
        if let Value::Mapping(map) = entry {
            map.insert(key.to_string(), coerce(raw.trim()));
        }
    }

    Value::Mapping(root)
}

/// Section layout shared by the INI and TOML encoders.
///
/// Top-level scalars come first, then one `[key]` section per top-level
/// mapping. Values nested deeper than a section are stringified.
pub(crate) fn encode_sections(
    format: Format,
    value: &Value,
    separator: &str,
    scalar: impl Fn(&Value) -> Result<String>,
) -> Result<String> {
    let Value::Mapping(root) = value else {
        return Ok(format!("{}\n", scalar(value)?));
    };

    let line = |key: &str, item: &Value| -> Result<String> {
        check_key(format, key, &['='], &['#', ';', '['])?;
        let text = scalar(item).map_err(|e| e.with_path(key))?;
        check_single_line(format, key, &text)?;
        Ok(format!("{}{}{}\n", key, separator, text))
    };

    let mut out = String::new();
    for (key, item) in root.iter().filter(|(_, v)| !v.is_mapping()) {
        out.push_str(&line(key.as_str(), item)?);
    }

    for (name, section) in root.iter().filter_map(|(k, v)| v.as_mapping().map(|m| (k, m))) {
        check_key(format, name, &[], &[])?;
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("[{}]\n", name));
        for (key, item) in section {
            out.push_str(&line(key.as_str(), item)?);
        }
    }

    Ok(out)
}

/// Reject keys the line-oriented parsers would read back differently.
///
/// `reserved` may not appear anywhere in the key, `leading` may not start it.
pub(crate) fn check_key(
    format: Format,
    key: &str,
    reserved: &[char],
    leading: &[char],
) -> Result<()> {
    let problem = if key.is_empty() {
        Some("key is empty".to_string())
    } else if key.trim() != key {
        Some("key has surrounding whitespace".to_string())
    } else if key.starts_with(leading) {
        Some(format!("key starts with {:?}", key.chars().next().unwrap_or_default()))
    } else {
        key.chars()
            .find(|&c| matches!(c, '\n' | '\r') || reserved.contains(&c))
            .map(|c| format!("key contains {:?}", c))
    };
    match problem {
        Some(detail) => Err(Error::unencodable(format.name(), detail).with_path(key)),
        None => Ok(()),
    }
}

/// Reject rendered values that would spill onto a second line
pub(crate) fn check_single_line(format: Format, key: &str, text: &str) -> Result<()> {
    if text.contains(['\n', '\r']) {
        return Err(Error::unencodable(format.name(), "value contains a line break").with_path(key));
    }
    Ok(())
}
