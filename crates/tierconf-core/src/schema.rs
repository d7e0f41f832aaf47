//! Schema validation for configuration
//!
//! A [`Schema`] is an ordered list of property rules checked against the
//! top-level mapping of a configuration value:
//! - required properties must be present
//! - validator predicates must hold for properties that are present
//!
//! Declared types are advisory; [`Schema::type_mismatches`] reports them but
//! neither validation entry point fails on them.
//!
//! [`Schema::validate`] stops at the first failure. [`Schema::validate_collect`]
//! runs every check and returns all failures, in the same order.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{Error, Result};
use crate::value::Value;

/// A validator predicate
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Name given to predicates compiled from JSON-Schema constraint keywords
pub const JSON_SCHEMA_VALIDATOR: &str = "json-schema";

/// JSON-Schema keywords that describe a property without constraining it
const ANNOTATION_KEYWORDS: &[&str] = &[
    "type",
    "title",
    "description",
    "default",
    "examples",
    "$comment",
];

/// Expected type of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueType {
    #[default]
    Any,
    String,
    Integer,
    /// Integer or float
    Number,
    Boolean,
    Mapping,
    Sequence,
}

impl ValueType {
    /// Whether `value` has this type
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueType::Any => true,
            ValueType::String => matches!(value, Value::String(_)),
            ValueType::Integer => matches!(value, Value::Integer(_)),
            ValueType::Number => value.is_number(),
            ValueType::Boolean => matches!(value, Value::Bool(_)),
            ValueType::Mapping => matches!(value, Value::Mapping(_)),
            ValueType::Sequence => matches!(value, Value::Sequence(_)),
        }
    }

    /// Map a JSON-Schema `type` name
    fn from_json_schema(name: &str) -> Self {
        match name {
            "string" => ValueType::String,
            "integer" => ValueType::Integer,
            "number" => ValueType::Number,
            "boolean" => ValueType::Boolean,
            "object" => ValueType::Mapping,
            "array" => ValueType::Sequence,
            _ => ValueType::Any,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Any => "any",
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Mapping => "mapping",
            ValueType::Sequence => "sequence",
        };
        f.write_str(name)
    }
}

/// A named validator predicate
#[derive(Clone)]
pub struct Validator {
    name: String,
    predicate: Predicate,
}

impl Validator {
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, value: &Value) -> bool {
        (self.predicate)(value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Rules for one top-level property
#[derive(Debug, Clone, Default)]
pub struct PropertyRule {
    pub name: String,
    pub value_type: ValueType,
    pub required: bool,
    pub validators: Vec<Validator>,
}

/// A single validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Property the failure relates to
    pub path: String,
    /// Error message
    pub message: String,
}

impl From<&Error> for ValidationError {
    fn from(err: &Error) -> Self {
        let path = match &err.kind {
            crate::error::ErrorKind::MissingRequiredProperty { property }
            | crate::error::ErrorKind::ValidatorFailed { property, .. } => property.clone(),
            _ => err.path.clone().unwrap_or_default(),
        };
        Self {
            path,
            message: err.summary(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Schema for validating configuration
#[derive(Debug, Clone, Default)]
pub struct Schema {
    properties: IndexMap<String, PropertyRule>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    fn rule_mut(&mut self, name: &str) -> &mut PropertyRule {
        self.properties
            .entry(name.to_string())
            .or_insert_with(|| PropertyRule {
                name: name.to_string(),
                ..PropertyRule::default()
            })
    }

    /// Declare an optional property
    pub fn property(mut self, name: &str, value_type: ValueType) -> Self {
        self.rule_mut(name).value_type = value_type;
        self
    }

    /// Declare a required property
    pub fn require(mut self, name: &str, value_type: ValueType) -> Self {
        let rule = self.rule_mut(name);
        rule.value_type = value_type;
        rule.required = true;
        self
    }

    /// Attach a validator to a property, declaring it if needed
    pub fn validator(mut self, name: &str, validator: Validator) -> Self {
        self.rule_mut(name).validators.push(validator);
        self
    }

    /// Property rules in declaration order
    pub fn rules(&self) -> impl Iterator<Item = &PropertyRule> {
        self.properties.values()
    }

    pub fn rule(&self, name: &str) -> Option<&PropertyRule> {
        self.properties.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Validate, stopping at the first failure.
    ///
    /// All required checks run before any validator.
    pub fn validate(&self, value: &Value) -> Result<()> {
        match self.failures(value).next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Validate and collect all failures instead of stopping at the first
    pub fn validate_collect(&self, value: &Value) -> Vec<ValidationError> {
        self.failures(value)
            .map(|err| ValidationError::from(&err))
            .collect()
    }

    fn failures<'a>(&'a self, value: &'a Value) -> impl Iterator<Item = Error> + 'a {
        let lookup = move |name: &str| value.as_mapping().and_then(|map| map.get(name));

        let missing = self
            .rules()
            .filter(move |rule| rule.required && lookup(&rule.name).is_none())
            .map(|rule| Error::missing_required(&rule.name));

        let failed = self.rules().flat_map(move |rule| {
            let present = lookup(&rule.name);
            rule.validators
                .iter()
                .filter(move |validator| present.is_some_and(|v| !validator.check(v)))
                .map(move |validator| Error::validator_failed(&rule.name, validator.name()))
        });

        missing.chain(failed)
    }

    /// Present properties whose value does not match the declared type
    pub fn type_mismatches(&self, value: &Value) -> Vec<ValidationError> {
        let Some(map) = value.as_mapping() else {
            return Vec::new();
        };
        self.rules()
            .filter_map(|rule| {
                let present = map.get(&rule.name)?;
                (!rule.value_type.matches(present)).then(|| ValidationError {
                    path: rule.name.clone(),
                    message: format!(
                        "expected {}, found {}",
                        rule.value_type,
                        present.type_name()
                    ),
                })
            })
            .collect()
    }

    /// Load a schema from a JSON-Schema document in JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let schema: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| Error::malformed("json", format!("Invalid JSON schema: {}", e)))?;
        Self::from_json_schema(&schema)
    }

    /// Load a schema from a JSON-Schema document in YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let schema: serde_json::Value = serde_yaml::from_str(yaml)
            .map_err(|e| Error::malformed("yaml", format!("Invalid YAML schema: {}", e)))?;
        Self::from_json_schema(&schema)
    }

    /// Load a schema from a file (JSON or YAML based on extension)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        if !path.exists() {
            return Err(Error::file_not_found(display));
        }
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(&display, &e))?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let schema = match ext.as_deref() {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        };
        schema.map_err(|e| e.with_path(display))
    }

    /// Build rules from a JSON-Schema object.
    ///
    /// Top-level `required` names become required properties and each
    /// `properties` entry contributes its `type`. Any other keyword on a
    /// property is compiled with `jsonschema` into a validator.
    pub fn from_json_schema(schema: &serde_json::Value) -> Result<Self> {
        let Some(root) = schema.as_object() else {
            return Err(Error::malformed(
                "json-schema",
                "schema document must be an object",
            ));
        };

        let mut result = Schema::new();

        if let Some(properties) = root.get("properties").and_then(|p| p.as_object()) {
            for (name, property) in properties {
                let value_type = property
                    .get("type")
                    .and_then(|t| t.as_str())
                    .map(ValueType::from_json_schema)
                    .unwrap_or_default();
                result = result.property(name, value_type);

                if let Some(validator) = compile_constraints(name, property)? {
                    result = result.validator(name, validator);
                }
            }
        }

        if let Some(required) = root.get("required").and_then(|r| r.as_array()) {
            for name in required.iter().filter_map(|n| n.as_str()) {
                let value_type = result.rule(name).map(|r| r.value_type).unwrap_or_default();
                result = result.require(name, value_type);
            }
        }

        Ok(result)
    }
}

/// Compile the constraint keywords of one property, if it has any.
///
/// Annotation keywords, `type` included, are left out: declared types only
/// set the advisory [`ValueType`].
fn compile_constraints(name: &str, property: &serde_json::Value) -> Result<Option<Validator>> {
    let Some(object) = property.as_object() else {
        return Ok(None);
    };
    let constraints: serde_json::Map<String, serde_json::Value> = object
        .iter()
        .filter(|(k, _)| !ANNOTATION_KEYWORDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if constraints.is_empty() {
        return Ok(None);
    }

    let compiled = jsonschema::validator_for(&serde_json::Value::Object(constraints))
        .map_err(|e| Error::malformed("json-schema", format!("property '{}': {}", name, e)))?;
    let compiled = Arc::new(compiled);

    Ok(Some(Validator::new(JSON_SCHEMA_VALIDATOR, move |value| {
        compiled.is_valid(&serde_json::Value::from(value))
    })))
}

/// Ready-made validator predicates
pub mod validators {
    use super::{Regex, Validator};
    use crate::error::{Error, Result};
    use crate::value::Value;

    /// String, sequence or mapping with at least one element
    pub fn non_empty() -> Validator {
        Validator::new("non-empty", |value| match value {
            Value::String(s) => !s.trim().is_empty(),
            Value::Sequence(seq) => !seq.is_empty(),
            Value::Mapping(map) => !map.is_empty(),
            Value::Null => false,
            _ => true,
        })
    }

    /// Number (or numeric string) within `min..=max`
    pub fn range(min: f64, max: f64) -> Validator {
        Validator::new("range", move |value| {
            let number = match value {
                Value::String(s) => s.trim().parse::<f64>().ok(),
                other => other.as_f64(),
            };
            number.is_some_and(|n| n >= min && n <= max)
        })
    }

    /// Scalar whose text form is one of `allowed`
    pub fn one_of(allowed: &[&str]) -> Validator {
        let allowed: Vec<String> = allowed.iter().map(|s| s.to_string()).collect();
        Validator::new("one-of", move |value| {
            !value.is_mapping() && allowed.contains(&value.to_string())
        })
    }

    /// String matching a regular expression
    pub fn pattern(regex: &str) -> Result<Validator> {
        let compiled = Regex::new(regex)
            .map_err(|e| Error::malformed("regex", format!("'{}': {}", regex, e)))?;
        Ok(Validator::new("pattern", move |value| {
            value.as_str().is_some_and(|s| compiled.is_match(s))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn test_missing_required_names_property() {
        let schema = Schema::new().require("Url", ValueType::String);

        let err = schema.validate(&v(json!({"Name": "svc"}))).unwrap_err();

        assert_eq!(
            err.kind,
            crate::error::ErrorKind::MissingRequiredProperty {
                property: "Url".into()
            }
        );
    }

    #[test]
    fn test_valid_config_passes() {
        let schema = Schema::new()
            .require("Url", ValueType::String)
            .property("Port", ValueType::Integer)
            .validator("Port", validators::range(1.0, 65535.0));

        assert!(schema
            .validate(&v(json!({"Url": "http://x", "Port": 8080})))
            .is_ok());
        // Optional property absent: its validators are skipped
        assert!(schema.validate(&v(json!({"Url": "http://x"}))).is_ok());
    }

    #[test]
    fn test_required_checks_run_before_validators() {
        let schema = Schema::new()
            .property("Port", ValueType::Integer)
            .validator("Port", validators::range(1.0, 10.0))
            .require("Url", ValueType::String);

        // Port fails its validator, but the missing Url is reported first
        let err = schema.validate(&v(json!({"Port": 99}))).unwrap_err();
        assert!(matches!(
            err.kind,
            crate::error::ErrorKind::MissingRequiredProperty { .. }
        ));
    }

    #[test]
    fn test_declaration_order_within_phase() {
        let schema = Schema::new()
            .require("B", ValueType::Any)
            .require("A", ValueType::Any);

        let err = schema.validate(&Value::empty_mapping()).unwrap_err();
        assert_eq!(
            err.kind,
            crate::error::ErrorKind::MissingRequiredProperty {
                property: "B".into()
            }
        );
    }

    #[test]
    fn test_validator_failed_names_property_and_validator() {
        let schema = Schema::new().validator(
            "Mode",
            Validator::new("uppercase", |v| {
                v.as_str().is_some_and(|s| s == s.to_uppercase())
            }),
        );

        let err = schema.validate(&v(json!({"Mode": "fast"}))).unwrap_err();

        assert_eq!(
            err.kind,
            crate::error::ErrorKind::ValidatorFailed {
                property: "Mode".into(),
                validator: "uppercase".into()
            }
        );
    }

    #[test]
    fn test_types_are_advisory() {
        let schema = Schema::new().require("Port", ValueType::Integer);
        let value = v(json!({"Port": "8080"}));

        assert!(schema.validate(&value).is_ok());
        assert_eq!(
            schema.type_mismatches(&value),
            vec![ValidationError {
                path: "Port".into(),
                message: "expected integer, found string".into()
            }]
        );
    }

    #[test]
    fn test_validate_collect_gathers_everything() {
        let schema = Schema::new()
            .require("Url", ValueType::String)
            .require("Name", ValueType::String)
            .validator("Level", validators::one_of(&["debug", "info"]))
            .validator("Name", validators::non_empty());

        let errors = schema.validate_collect(&v(json!({"Level": "verbose"})));

        let rendered: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "Url: Missing required property: Url",
                "Name: Missing required property: Name",
                "Level: Validator 'one-of' failed for property: Level",
            ]
        );
    }

    #[test]
    fn test_non_mapping_value_misses_required() {
        let schema = Schema::new().require("Url", ValueType::String);
        assert!(schema.validate(&Value::from("scalar")).is_err());
    }

    #[test]
    fn test_pattern_validator() {
        let schema = Schema::new().validator(
            "Version",
            validators::pattern(r"^\d+\.\d+\.\d+$").unwrap(),
        );

        assert!(schema.validate(&v(json!({"Version": "1.2.3"}))).is_ok());
        assert!(schema.validate(&v(json!({"Version": "v1.2"}))).is_err());
        assert!(validators::pattern("(").is_err());
    }

    #[test]
    fn test_range_accepts_numeric_strings() {
        let range = validators::range(1.0, 100.0);

        assert!(range.check(&Value::from("30")));
        assert!(range.check(&Value::Float(30.0)));
        assert!(!range.check(&Value::from(0)));
        assert!(!range.check(&Value::from("many")));
    }

    #[test]
    fn test_from_yaml_json_schema() {
        let schema = Schema::from_yaml(
            r#"
type: object
required:
  - name
properties:
  name:
    type: string
    description: Service name
  port:
    type: integer
    minimum: 1
    maximum: 65535
"#,
        )
        .unwrap();

        let name = schema.rule("name").unwrap();
        assert!(name.required);
        assert_eq!(name.value_type, ValueType::String);
        assert!(name.validators.is_empty());

        let port = schema.rule("port").unwrap();
        assert!(!port.required);
        assert_eq!(port.validators.len(), 1);
        assert_eq!(port.validators[0].name(), JSON_SCHEMA_VALIDATOR);

        assert!(schema
            .validate(&v(json!({"name": "svc", "port": 8080})))
            .is_ok());
        let err = schema
            .validate(&v(json!({"name": "svc", "port": 70000})))
            .unwrap_err();
        assert!(matches!(
            err.kind,
            crate::error::ErrorKind::ValidatorFailed { .. }
        ));
        assert!(schema.validate(&v(json!({"port": 80}))).is_err());
    }

    #[test]
    fn test_from_json_enum_constraint() {
        let schema = Schema::from_json(
            r#"{"properties": {"level": {"type": "string", "enum": ["debug", "info"]}}}"#,
        )
        .unwrap();

        assert!(schema.validate(&v(json!({"level": "info"}))).is_ok());
        assert!(schema.validate(&v(json!({"level": "verbose"}))).is_err());
    }

    #[test]
    fn test_from_json_type_stays_advisory_next_to_constraints() {
        let schema =
            Schema::from_json(r#"{"properties": {"Port": {"type": "integer", "minimum": 1}}}"#)
                .unwrap();
        let ini_style = v(json!({"Port": "8080"}));

        assert!(schema.validate(&ini_style).is_ok());
        assert!(schema.validate(&v(json!({"Port": 8080}))).is_ok());
        assert!(schema.validate(&v(json!({"Port": 0}))).is_err());
        assert_eq!(
            schema.type_mismatches(&ini_style),
            vec![ValidationError {
                path: "Port".into(),
                message: "expected integer, found string".into(),
            }]
        );
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(Schema::from_json("[1, 2]").is_err());
        assert!(Schema::from_json("{not json").is_err());
    }

    #[test]
    fn test_from_file_uses_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(&path, r#"{"required": ["Url"]}"#).unwrap();

        let schema = Schema::from_file(&path).unwrap();
        assert!(schema.rule("Url").unwrap().required);

        let missing = Schema::from_file(dir.path().join("nope.yaml")).unwrap_err();
        assert_eq!(missing.kind, crate::error::ErrorKind::FileNotFound);
    }
}
