//! Configuration manager: layered loading with a time-bounded cache
//!
//! A load runs these layers in order, each winning over the previous:
//! 1. the base file (skipped when it does not exist)
//! 2. `config-override.json` from every registered search path
//! 3. registered environment-variable bindings
//!
//! The result is then expanded and validated according to the manager's
//! [`Settings`] and cached until the cache timeout elapses.

use std::path::{Path, PathBuf};
use std::time::Instant;

use indexmap::IndexMap;

use crate::error::Result;
use crate::expand;
use crate::format;
use crate::merge::deep_merge;
use crate::schema::Schema;
use crate::settings::Settings;
use crate::value::Value;

/// File name looked up in every search path
pub const OVERRIDE_FILE_NAME: &str = "config-override.json";

/// Where a manager is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Never loaded
    Uninitialized,
    /// Loaded, but the cache is stale or disabled
    Loaded,
    /// Loaded and a non-forced load would be served from the cache
    Cached,
}

/// Loads one configuration from a base file plus override layers
#[derive(Debug, Clone)]
pub struct ConfigManager {
    base_path: PathBuf,
    search_paths: Vec<PathBuf>,
    schema: Option<Schema>,
    /// environment variable name -> dotted config path
    env_bindings: IndexMap<String, String>,
    settings: Settings,
    cached: Option<Value>,
    last_load: Option<Instant>,
}

impl ConfigManager {
    /// Create a manager for `base_path` with default settings
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            search_paths: Vec::new(),
            schema: None,
            env_bindings: IndexMap::new(),
            settings: Settings::default(),
            cached: None,
            last_load: None,
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_search_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.add_search_path(dir);
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_env_binding(mut self, var: impl Into<String>, path: impl Into<String>) -> Self {
        self.bind_env(var, path);
        self
    }

    /// Register a directory scanned for `config-override.json`.
    ///
    /// Directories are applied in registration order; registering the same
    /// directory twice has no effect.
    pub fn add_search_path(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if !self.search_paths.contains(&dir) {
            self.search_paths.push(dir);
        }
    }

    /// Bind environment variable `var` to the dotted config `path`
    pub fn bind_env(&mut self, var: impl Into<String>, path: impl Into<String>) {
        self.env_bindings.insert(var.into(), path.into());
    }

    pub fn set_schema(&mut self, schema: Option<Schema>) {
        self.schema = schema;
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn state(&self) -> LoadState {
        if self.cached.is_none() {
            LoadState::Uninitialized
        } else if self.is_cached() {
            LoadState::Cached
        } else {
            LoadState::Loaded
        }
    }

    /// Whether a non-forced load would be a cache hit
    pub fn is_cached(&self) -> bool {
        self.settings.cache_enabled
            && self.cached.is_some()
            && self
                .last_load
                .is_some_and(|at| at.elapsed() < self.settings.cache_timeout)
    }

    /// Drop the cached value so the next load reads from disk
    pub fn invalidate(&mut self) {
        self.last_load = None;
    }

    /// The value produced by the last load (or modified by [`set`](Self::set))
    pub fn value(&self) -> Option<&Value> {
        self.cached.as_ref()
    }

    /// Load the configuration.
    ///
    /// Unless `force` is set, a fresh cached value is returned without
    /// touching the file system. Schema failures propagate unchanged.
    pub fn load(&mut self, force: bool) -> Result<Value> {
        if !force && self.is_cached() {
            if let Some(cached) = &self.cached {
                log::debug!("Cache hit for {}", self.base_path.display());
                return Ok(cached.clone());
            }
        }

        let mut working = Value::empty_mapping();

        if self.base_path.exists() {
            working = format::parse_file(&self.base_path)?;
        } else {
            log::debug!(
                "Base file {} does not exist, starting empty",
                self.base_path.display()
            );
        }

        for dir in &self.search_paths {
            let candidate = dir.join(OVERRIDE_FILE_NAME);
            if !candidate.is_file() {
                log::debug!("No override in {}", dir.display());
                continue;
            }
            let overlay = format::parse_file(&candidate)?;
            working = deep_merge(&working, &overlay);
            log::debug!("Applied override {}", candidate.display());
        }

        for (var, path) in &self.env_bindings {
            if let Ok(raw) = std::env::var(var) {
                log::debug!("Binding {} -> {}", var, path);
                working.set_path(path, Value::String(raw));
            }
        }

        if self.settings.expand_env {
            working = expand::expand(&working);
        }

        if self.settings.validate {
            if let Some(schema) = &self.schema {
                schema.validate(&working)?;
            }
        }

        self.last_load = Some(Instant::now());
        self.cached = Some(working.clone());
        log::info!(
            "Loaded {} ({} override dirs, {} env bindings)",
            self.base_path.display(),
            self.search_paths.len(),
            self.env_bindings.len()
        );
        Ok(working)
    }

    /// Value at a dotted path of the cached configuration, or `default`
    pub fn get(&self, path: &str, default: impl Into<Value>) -> Value {
        self.get_raw(path).cloned().unwrap_or_else(|| default.into())
    }

    /// Borrow the value at a dotted path of the cached configuration
    pub fn get_raw(&self, path: &str) -> Option<&Value> {
        self.cached.as_ref()?.get_path(path)
    }

    /// Assign a value at a dotted path, creating intermediate mappings
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        self.cached
            .get_or_insert_with(Value::empty_mapping)
            .set_path(path, value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::ValueType;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use serial_test::serial;
    use std::time::Duration;
    use tempfile::TempDir;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_base_only() {
        let dir = TempDir::new().unwrap();
        let base = write(dir.path(), "app.toml", "[Db]\nTimeout = 30\n");

        let mut manager = ConfigManager::new(&base);
        assert_eq!(manager.state(), LoadState::Uninitialized);

        let value = manager.load(false).unwrap();

        assert_eq!(value, v(json!({"Db": {"Timeout": 30.0}})));
        assert_eq!(manager.state(), LoadState::Cached);
    }

    #[test]
    fn test_missing_base_loads_empty() {
        let dir = TempDir::new().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("absent.json"));

        assert_eq!(manager.load(false).unwrap(), Value::empty_mapping());
    }

    #[test]
    fn test_overrides_applied_in_registration_order() {
        let dir = TempDir::new().unwrap();
        let base = write(
            dir.path(),
            "app.json",
            r#"{"Database": {"Timeout": 30, "Host": "a"}, "Name": "base"}"#,
        );
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        let empty = dir.path().join("empty");
        for d in [&first, &second, &empty] {
            std::fs::create_dir_all(d).unwrap();
        }
        write(
            &first,
            OVERRIDE_FILE_NAME,
            r#"{"Database": {"Timeout": 60}, "Name": "first"}"#,
        );
        write(&second, OVERRIDE_FILE_NAME, r#"{"Name": "second"}"#);

        let mut manager = ConfigManager::new(&base)
            .with_search_path(&first)
            .with_search_path(&empty)
            .with_search_path(&second);

        let value = manager.load(true).unwrap();

        assert_eq!(
            value,
            v(json!({"Database": {"Timeout": 60, "Host": "a"}, "Name": "second"}))
        );
    }

    #[test]
    fn test_duplicate_search_path_ignored() {
        let mut manager = ConfigManager::new("app.json")
            .with_search_path("conf")
            .with_search_path("conf");
        manager.add_search_path("other");

        assert_eq!(
            manager.search_paths(),
            &[PathBuf::from("conf"), PathBuf::from("other")]
        );
    }

    #[test]
    fn test_cache_hit_does_not_reread() {
        let dir = TempDir::new().unwrap();
        let base = write(dir.path(), "app.json", r#"{"a": 1}"#);
        let mut manager = ConfigManager::new(&base);

        let first = manager.load(false).unwrap();
        std::fs::write(&base, r#"{"a": 2}"#).unwrap();
        let second = manager.load(false).unwrap();

        assert_eq!(first, second);
        assert_eq!(second, v(json!({"a": 1})));

        // Forced reload always re-reads
        assert_eq!(manager.load(true).unwrap(), v(json!({"a": 2})));
    }

    #[test]
    fn test_cache_survives_file_removal() {
        let dir = TempDir::new().unwrap();
        let base = write(dir.path(), "app.yaml", "a: 1\n");
        let mut manager = ConfigManager::new(&base);

        let first = manager.load(false).unwrap();
        std::fs::remove_file(&base).unwrap();

        assert_eq!(manager.load(false).unwrap(), first);
        assert_eq!(manager.load(true).unwrap(), Value::empty_mapping());
    }

    #[test]
    fn test_expired_or_disabled_cache_reloads() {
        let dir = TempDir::new().unwrap();
        let base = write(dir.path(), "app.json", r#"{"a": 1}"#);

        let mut expired = ConfigManager::new(&base)
            .with_settings(Settings::default().with_cache_timeout(Duration::ZERO));
        expired.load(false).unwrap();
        assert_eq!(expired.state(), LoadState::Loaded);

        let mut disabled = ConfigManager::new(&base)
            .with_settings(Settings::default().with_cache_enabled(false));
        disabled.load(false).unwrap();

        std::fs::write(&base, r#"{"a": 2}"#).unwrap();
        assert_eq!(expired.load(false).unwrap(), v(json!({"a": 2})));
        assert_eq!(disabled.load(false).unwrap(), v(json!({"a": 2})));
    }

    #[test]
    fn test_invalidate_forces_next_read() {
        let dir = TempDir::new().unwrap();
        let base = write(dir.path(), "app.json", r#"{"a": 1}"#);
        let mut manager = ConfigManager::new(&base);
        manager.load(false).unwrap();

        std::fs::write(&base, r#"{"a": 2}"#).unwrap();
        manager.invalidate();

        assert_eq!(manager.load(false).unwrap(), v(json!({"a": 2})));
    }

    #[test]
    #[serial]
    fn test_env_binding_overwrites_and_creates() {
        let dir = TempDir::new().unwrap();
        let base = write(
            dir.path(),
            "app.json",
            r#"{"Database": {"Timeout": 30}}"#,
        );
        std::env::set_var("TIERCONF_TEST_DB_TIMEOUT", "90");
        std::env::set_var("TIERCONF_TEST_CACHE_HOST", "cache.local");
        std::env::remove_var("TIERCONF_TEST_UNSET_BINDING");

        let mut manager = ConfigManager::new(&base)
            .with_env_binding("TIERCONF_TEST_DB_TIMEOUT", "Database.Timeout")
            .with_env_binding("TIERCONF_TEST_CACHE_HOST", "Cache.Redis.Host")
            .with_env_binding("TIERCONF_TEST_UNSET_BINDING", "Database.User");

        let value = manager.load(true).unwrap();

        assert_eq!(
            value,
            v(json!({
                "Database": {"Timeout": "90"},
                "Cache": {"Redis": {"Host": "cache.local"}}
            }))
        );

        std::env::remove_var("TIERCONF_TEST_DB_TIMEOUT");
        std::env::remove_var("TIERCONF_TEST_CACHE_HOST");
    }

    #[test]
    #[serial]
    fn test_expansion_follows_settings() {
        let dir = TempDir::new().unwrap();
        let base = write(dir.path(), "app.json", r#"{"Home": "${TIERCONF_TEST_HOME}"}"#);
        std::env::set_var("TIERCONF_TEST_HOME", "/srv/app");

        let mut expanding = ConfigManager::new(&base);
        assert_eq!(
            expanding.load(true).unwrap(),
            v(json!({"Home": "/srv/app"}))
        );

        let mut literal = ConfigManager::new(&base)
            .with_settings(Settings::default().with_expand_env(false));
        assert_eq!(
            literal.load(true).unwrap(),
            v(json!({"Home": "${TIERCONF_TEST_HOME}"}))
        );

        std::env::remove_var("TIERCONF_TEST_HOME");
    }

    #[test]
    fn test_schema_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let base = write(dir.path(), "app.json", r#"{"Name": "svc"}"#);
        let schema = Schema::new().require("Url", ValueType::String);

        let mut manager = ConfigManager::new(&base).with_schema(schema.clone());
        let err = manager.load(true).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::MissingRequiredProperty {
                property: "Url".into()
            }
        );
        assert_eq!(manager.state(), LoadState::Uninitialized);

        let mut unchecked = ConfigManager::new(&base)
            .with_schema(schema)
            .with_settings(Settings::default().with_validate(false));
        assert!(unchecked.load(true).is_ok());
    }

    #[test]
    fn test_malformed_override_propagates() {
        let dir = TempDir::new().unwrap();
        let base = write(dir.path(), "app.json", "{}");
        write(dir.path(), OVERRIDE_FILE_NAME, "{broken");

        let mut manager = ConfigManager::new(&base).with_search_path(dir.path());
        let err = manager.load(true).unwrap_err();

        assert!(matches!(err.kind, ErrorKind::MalformedInput { .. }));
    }

    #[test]
    fn test_get_and_set() {
        let dir = TempDir::new().unwrap();
        let base = write(dir.path(), "app.json", r#"{"Database": {}}"#);
        let mut manager = ConfigManager::new(&base);
        manager.load(false).unwrap();

        assert_eq!(manager.get("Database.Timeout", 30), Value::from(30));

        manager.set("Database.Timeout", 60);
        assert_eq!(manager.get("Database.Timeout", 30), Value::from(60));

        manager.set("Logging.Level.Root", "debug");
        assert_eq!(
            manager.get_raw("Logging.Level.Root").and_then(Value::as_str),
            Some("debug")
        );
    }

    #[test]
    fn test_get_before_load_returns_default() {
        let manager = ConfigManager::new("never-loaded.json");
        assert_eq!(manager.get("a.b", "fallback"), Value::from("fallback"));
        assert!(manager.value().is_none());
    }
}
