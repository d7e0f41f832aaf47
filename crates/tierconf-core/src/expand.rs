//! Environment variable expansion
//!
//! Recognized reference forms inside string values:
//! - `${NAME}`
//! - `$NAME`
//! - `%NAME%`
//!
//! An unset variable expands to the empty string. Fallback syntax such as
//! `${NAME:-default}` is not interpreted and stays in the text verbatim.
//! Expansion is a single pass: substituted text is never scanned again.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::value::Value;

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\$\{(?P<braced>[A-Za-z_][A-Za-z0-9_]*)\}|\$(?P<bare>[A-Za-z_][A-Za-z0-9_]*)|%(?P<percent>[A-Za-z_][A-Za-z0-9_]*)%",
    )
    .expect("reference pattern is valid")
});

fn reference_name<'t>(caps: &Captures<'t>) -> &'t str {
    caps.name("braced")
        .or_else(|| caps.name("bare"))
        .or_else(|| caps.name("percent"))
        .map(|m| m.as_str())
        .unwrap_or_default()
}

/// Expand references using the process environment
pub fn expand(value: &Value) -> Value {
    expand_with(value, &|name| std::env::var(name).ok())
}

/// Expand references using `lookup` to resolve variable names
pub fn expand_with<F>(value: &Value, lookup: &F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::String(s) => Value::String(expand_str(s, lookup)),
        Value::Sequence(seq) => {
            Value::Sequence(seq.iter().map(|item| expand_with(item, lookup)).collect())
        }
        Value::Mapping(map) => Value::Mapping(
            map.iter()
                .map(|(k, v)| (k.clone(), expand_with(v, lookup)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Expand references in a single string
pub fn expand_str<F>(input: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    REFERENCE
        .replace_all(input, |caps: &Captures<'_>| {
            lookup(reference_name(caps)).unwrap_or_default()
        })
        .into_owned()
}

/// Names of all variables referenced in `input`, in order of appearance
pub fn references(input: &str) -> Vec<String> {
    REFERENCE
        .captures_iter(input)
        .map(|caps| reference_name(&caps).to_string())
        .collect()
}

/// A reference to a variable that `lookup` could not resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    /// Dotted path of the string value holding the reference
    pub path: String,
    /// Variable name
    pub variable: String,
}

/// Find every reference in `value` whose variable is unset
pub fn unresolved_references<F>(value: &Value, lookup: &F) -> Vec<UnresolvedReference>
where
    F: Fn(&str) -> Option<String>,
{
    let mut found = Vec::new();
    collect_unresolved(value, "", lookup, &mut found);
    found
}

fn collect_unresolved<F>(
    value: &Value,
    path: &str,
    lookup: &F,
    found: &mut Vec<UnresolvedReference>,
) where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::String(s) => {
            for variable in references(s) {
                if lookup(&variable).is_none() {
                    found.push(UnresolvedReference {
                        path: path.to_string(),
                        variable,
                    });
                }
            }
        }
        Value::Sequence(seq) => {
            for (i, item) in seq.iter().enumerate() {
                collect_unresolved(item, &format!("{}[{}]", path, i), lookup, found);
            }
        }
        Value::Mapping(map) => {
            for (key, item) in map {
                let item_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                collect_unresolved(item, &item_path, lookup, found);
            }
        }
        _ => {}
    }
}
