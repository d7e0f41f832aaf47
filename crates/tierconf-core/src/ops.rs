//! Top-level operations used by front ends such as the CLI
//!
//! [`import_configuration`] and [`export_configuration`] audit every call in
//! the given [`Context`] and wrap failures as configuration errors.
//! [`test_configuration`] never fails: every problem becomes an entry of the
//! returned [`ValidationReport`].

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;

use crate::context::{AuditAction, Context};
use crate::error::{Error, ErrorKind, Result};
use crate::expand;
use crate::format::{self, Format};
use crate::manager::{ConfigManager, OVERRIDE_FILE_NAME};
use crate::schema::Schema;
use crate::value::Value;

/// Sub-test names recorded in a [`ValidationReport`]
pub const TEST_FILE_EXISTS: &str = "FileExists";
pub const TEST_FORMAT_VALID: &str = "FormatValid";
pub const TEST_SCHEMA_VALID: &str = "SchemaValid";
pub const TEST_ENVIRONMENT_EXPANSION: &str = "EnvironmentExpansion";

/// Per-call options for [`import_configuration`]
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub expand_env: bool,
    pub validate: bool,
    /// Schema checked when `validate` is set
    pub schema: Option<Schema>,
    /// environment variable name -> dotted config path
    pub env_bindings: Vec<(String, String)>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            expand_env: true,
            validate: true,
            schema: None,
            env_bindings: Vec::new(),
        }
    }
}

/// Outcome of [`test_configuration`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Named sub-test outcomes, in the order they ran
    pub tests: IndexMap<String, bool>,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            tests: IndexMap::new(),
        }
    }
}

impl ValidationReport {
    fn pass(&mut self, test: &str) {
        self.tests.insert(test.to_string(), true);
    }

    fn fail(&mut self, test: &str, error: String) {
        self.tests.insert(test.to_string(), false);
        self.errors.push(error);
        self.is_valid = false;
    }

    fn warn(&mut self, test: &str, warning: String) {
        self.tests.insert(test.to_string(), false);
        self.warnings.push(warning);
    }
}

/// Load `base` with the override files in `overrides`.
///
/// The parent directory of every override path is registered as a search
/// path, so each of those directories contributes its
/// `config-override.json`. The manager starts from `ctx.settings` with the
/// call's expansion and validation flags; the context's own settings are
/// never modified.
pub fn import_configuration(
    ctx: &mut Context,
    base: impl AsRef<Path>,
    overrides: &[PathBuf],
    options: &ImportOptions,
) -> Result<Value> {
    let base = base.as_ref();
    let mut paths = vec![base.display().to_string()];
    paths.extend(overrides.iter().map(|p| p.display().to_string()));

    if !base.exists() {
        let err = Error::file_not_found(base.display().to_string());
        ctx.record_error(&err);
        ctx.audit(AuditAction::Import, paths, Err(&err));
        return Err(err);
    }

    let settings = ctx
        .settings
        .with_expand_env(options.expand_env)
        .with_validate(options.validate);
    let mut manager = ConfigManager::new(base).with_settings(settings);
    manager.set_schema(options.schema.clone());
    for (var, path) in &options.env_bindings {
        manager.bind_env(var, path);
    }
    for path in overrides {
        if path.file_name().is_some_and(|name| name != OVERRIDE_FILE_NAME) {
            log::warn!(
                "Override {} is not named {}; only {} in its directory is read",
                path.display(),
                OVERRIDE_FILE_NAME,
                OVERRIDE_FILE_NAME
            );
        }
        manager.add_search_path(override_dir(path));
    }

    match manager.load(true) {
        Ok(value) => {
            ctx.register_manager(manager);
            ctx.audit(AuditAction::Import, paths, Ok(()));
            Ok(value)
        }
        Err(err) => {
            ctx.record_error(&err);
            ctx.audit(AuditAction::Import, paths, Err(&err));
            Err(Error::configuration(
                base.display().to_string(),
                Some(err.summary()),
            ))
        }
    }
}

fn override_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Encode `value` as `format` and write it to `output`.
///
/// Missing parent directories are created first. `indent` only affects
/// JSON output.
pub fn export_configuration(
    ctx: &mut Context,
    value: &Value,
    output: impl AsRef<Path>,
    format: Format,
    indent: bool,
) -> Result<()> {
    let output = output.as_ref();
    let display = output.display().to_string();

    let result = write_encoded(value, output, format, indent);
    match &result {
        Ok(()) => {
            log::info!("Exported {} as {}", display, format);
            ctx.audit(AuditAction::Export, vec![display], Ok(()));
        }
        Err(err) => {
            ctx.record_error(err);
            ctx.audit(AuditAction::Export, vec![display], Err(err));
        }
    }
    result.map_err(|err| Error::configuration(output.display().to_string(), Some(err.summary())))
}

fn write_encoded(value: &Value, output: &Path, format: Format, indent: bool) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::io(parent.display().to_string(), &e))?;
    }
    let text = format::encode(format, value, indent)?;
    std::fs::write(output, text).map_err(|e| Error::io(output.display().to_string(), &e))
}

/// Import `input` and export it to `output` in another format
pub fn convert_configuration(
    ctx: &mut Context,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    format: Format,
    indent: bool,
) -> Result<Value> {
    let options = ImportOptions {
        expand_env: false,
        validate: false,
        ..ImportOptions::default()
    };
    let value = import_configuration(ctx, input, &[], &options)?;
    export_configuration(ctx, &value, output, format, indent)?;
    Ok(value)
}

/// Check a configuration file without failing.
///
/// Runs in order: existence (fatal), format parse (fatal), schema
/// validation when a schema is given, then an expansion check that only
/// produces warnings.
pub fn test_configuration(
    path: impl AsRef<Path>,
    schema: Option<&Schema>,
    test_expansion: bool,
) -> ValidationReport {
    test_configuration_with(path, schema, test_expansion, &|name| std::env::var(name).ok())
}

/// [`test_configuration`] with a custom environment lookup
pub fn test_configuration_with<F>(
    path: impl AsRef<Path>,
    schema: Option<&Schema>,
    test_expansion: bool,
    lookup: &F,
) -> ValidationReport
where
    F: Fn(&str) -> Option<String>,
{
    let path = path.as_ref();
    let mut report = ValidationReport::default();

    if !path.exists() {
        report.fail(
            TEST_FILE_EXISTS,
            format!("Configuration file not found: {}", path.display()),
        );
        return report;
    }
    report.pass(TEST_FILE_EXISTS);

    let value = match format::parse_file(path) {
        Ok(value) => value,
        Err(err) => {
            let message = match err.kind {
                ErrorKind::UnsupportedFormat { .. } => err.summary(),
                _ => format!("Invalid configuration format: {}", err.summary()),
            };
            report.fail(TEST_FORMAT_VALID, message);
            return report;
        }
    };
    report.pass(TEST_FORMAT_VALID);

    if let Some(schema) = schema {
        let failures = schema.validate_collect(&value);
        if failures.is_empty() {
            report.pass(TEST_SCHEMA_VALID);
        } else {
            report.tests.insert(TEST_SCHEMA_VALID.to_string(), false);
            report.is_valid = false;
            report
                .errors
                .extend(failures.iter().map(|f| format!("Schema validation failed: {}", f)));
        }
        report.warnings.extend(
            schema
                .type_mismatches(&value)
                .iter()
                .map(|m| format!("Type mismatch: {}", m)),
        );
    }

    if test_expansion {
        let unresolved = expand::unresolved_references(&value, lookup);
        if unresolved.is_empty() {
            report.pass(TEST_ENVIRONMENT_EXPANSION);
        } else {
            for reference in unresolved {
                report.warn(
                    TEST_ENVIRONMENT_EXPANSION,
                    format!(
                        "Environment variable '{}' referenced at '{}' is not set",
                        reference.variable, reference.path
                    ),
                );
            }
        }
    }

    report
}
