//! Deep merge of configuration layers
//!
//! Merge semantics:
//! - Mappings: merged recursively, key by key
//! - Scalars: overlay wins
//! - Sequences: overlay replaces entirely (never element-wise)
//! - Type mismatch: overlay wins
//! - Keys only in the base are kept unchanged

use crate::value::Value;

/// Merge `overlay` over `base`, returning a new value.
///
/// Neither input is modified.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, overlay_value) in overlay_map {
                let value = match merged.get(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Mapping(merged)
        }
        (_, overlay) => overlay.clone(),
    }
}

/// Merge layers in order, later layers winning.
///
/// Starts from an empty mapping, so an empty iterator yields `{}`.
pub fn merge_all<'a>(layers: impl IntoIterator<Item = &'a Value>) -> Value {
    layers
        .into_iter()
        .fold(Value::empty_mapping(), |acc, layer| deep_merge(&acc, layer))
}
