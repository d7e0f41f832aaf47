//! tierconf-core: Layered configuration loading
//!
//! This crate loads a base configuration file in JSON, TOML, YAML or INI,
//! deep-merges `config-override.json` files from search directories on top,
//! applies environment bindings and `$VAR` expansion, and validates the
//! result against a property schema.
//!
//! # Example
//!
//! ```rust
//! use tierconf_core::{deep_merge, format, Format};
//!
//! let base = format::parse(Format::Yaml, "Database:\n  Timeout: 30\n  Host: a\n").unwrap();
//! let overlay = format::parse(Format::Json, r#"{"Database": {"Timeout": 60}}"#).unwrap();
//!
//! let merged = deep_merge(&base, &overlay);
//! assert_eq!(merged.get_path("Database.Timeout").and_then(|v| v.as_i64()), Some(60));
//! assert_eq!(merged.get_path("Database.Host").and_then(|v| v.as_str()), Some("a"));
//! ```

pub mod context;
pub mod error;
pub mod expand;
pub mod format;
pub mod manager;
pub mod merge;
pub mod ops;
pub mod schema;
pub mod settings;
pub mod value;

pub use context::{AuditAction, AuditEntry, Context};
pub use error::{Error, ErrorKind, Result};
pub use format::Format;
pub use manager::{ConfigManager, LoadState, OVERRIDE_FILE_NAME};
pub use merge::{deep_merge, merge_all};
pub use ops::{
    convert_configuration, export_configuration, import_configuration, test_configuration,
    ImportOptions, ValidationReport,
};
pub use schema::{Schema, ValidationError, Validator, ValueType};
pub use settings::Settings;
pub use value::{Mapping, Value};
