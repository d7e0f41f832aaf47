//! Minimal YAML subset
//!
//! Only `key: value` scalars and `key:` lines that open a nested mapping are
//! understood. Nesting is tracked with an indent stack. Lists, multi-line
//! scalars, anchors and flow collections are rejected or read as plain text.

use super::Format;
use crate::error::{Error, Result};
use crate::value::{Mapping, Value};

pub(super) fn parse(text: &str) -> Result<Value> {
    let mut root = Mapping::new();
    // (indent, path to the open mapping)
    let mut stack: Vec<(usize, Vec<String>)> = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let content = line.trim();
        if content.is_empty() || content.starts_with('#') || content == "---" {
            continue;
        }
        if line.starts_with('\t') {
            return Err(malformed(line_no, "tabs are not allowed for indentation"));
        }
        if content.starts_with("- ") || content == "-" {
            return Err(malformed(line_no, "sequences are not supported"));
        }

        let indent = line.len() - line.trim_start().len();
        let Some((key, rest)) = content.split_once(':') else {
            return Err(malformed(line_no, "expected `key: value` or `key:`"));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(malformed(line_no, "empty key"));
        }
        if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
            return Err(malformed(line_no, "expected a space after ':'"));
        }

        while stack.last().is_some_and(|(open, _)| *open >= indent) {
            stack.pop();
        }
        let parent_path = stack.last().map(|(_, path)| path.clone()).unwrap_or_default();
        let parent = mapping_at(&mut root, &parent_path)
            .ok_or_else(|| Error::internal(format!("lost nesting at line {}", line_no)))?;

        let raw = rest.trim();
        if raw.is_empty() {
            parent.insert(key.to_string(), Value::empty_mapping());
            let mut path = parent_path;
            path.push(key.to_string());
            stack.push((indent, path));
        } else {
            parent.insert(key.to_string(), scalar(raw));
        }
    }

    Ok(Value::Mapping(root))
}

fn malformed(line_no: usize, message: &str) -> Error {
    Error::malformed("yaml", format!("line {}: {}", line_no, message))
}

fn mapping_at<'a>(root: &'a mut Mapping, path: &[String]) -> Option<&'a mut Mapping> {
    let mut current = root;
    for key in path {
        current = current.get_mut(key)?.as_mapping_mut()?;
    }
    Some(current)
}

fn scalar(raw: &str) -> Value {
    if let Some(inner) = super::strip_quotes(raw, '\'') {
        return Value::String(inner.to_string());
    }
    match raw {
        "null" | "~" => Value::Null,
        _ => match raw.parse::<i64>() {
            Ok(i) => Value::Integer(i),
            Err(_) => super::coerce_scalar(raw),
        },
    }
}

pub(super) fn encode(value: &Value) -> Result<String> {
    let mut out = String::new();
    match value {
        Value::Mapping(map) => write_mapping(&mut out, map, 0)?,
        other => {
            let text = scalar_text(other);
            super::check_single_line(Format::Yaml, "", &text)?;
            out.push_str(&text);
            out.push('\n');
        }
    }
    Ok(out)
}

fn write_mapping(out: &mut String, map: &Mapping, depth: usize) -> Result<()> {
    let indent = "  ".repeat(depth);
    for (key, item) in map {
        check_key(key)?;
        match item {
            Value::Mapping(child) => {
                out.push_str(&format!("{}{}:\n", indent, key));
                write_mapping(out, child, depth + 1)?;
            }
            other => {
                let text = scalar_text(other);
                super::check_single_line(Format::Yaml, key, &text)?;
                out.push_str(&format!("{}{}: {}\n", indent, key, text));
            }
        }
    }
    Ok(())
}

fn check_key(key: &str) -> Result<()> {
    if key == "-" || key.starts_with("- ") {
        return Err(Error::unencodable(Format::Yaml.name(), "key reads as a sequence item").with_path(key));
    }
    super::check_key(Format::Yaml, key, &[':'], &['#'])
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Float(f) => super::float_text(*f),
        Value::String(s) => {
            // Quote strings that would otherwise read back as another type
            if s.is_empty() || s.trim() != s || scalar(s) != Value::String(s.clone()) {
                format!("\"{}\"", s)
            } else {
                s.clone()
            }
        }
        other => other.to_string(),
    }
}
