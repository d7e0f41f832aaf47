//! Session state shared by the top-level operations
//!
//! A [`Context`] records every manager an import created, the errors it
//! hit, and an append-only audit trail of imports and exports. Pass one
//! explicitly, or use [`Context::global`] when a single process-wide
//! instance is needed; that instance is guarded by a mutex.

use std::path::Path;
use std::sync::{Mutex, OnceLock};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::Error;
use crate::manager::ConfigManager;
use crate::settings::Settings;

static GLOBAL_CONTEXT: OnceLock<Mutex<Context>> = OnceLock::new();

/// Kind of audited operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Import,
    Export,
}

/// One audit trail record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    /// Files involved, the primary one first
    pub paths: Vec<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Session state for imports and exports
#[derive(Debug)]
pub struct Context {
    loaded_at: DateTime<Utc>,
    has_error: bool,
    managers: IndexMap<String, ConfigManager>,
    validation_errors: Vec<String>,
    audit_log: Vec<AuditEntry>,
    /// Loading knobs new managers start from
    pub settings: Settings,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Context {
    pub fn new(settings: Settings) -> Self {
        Self {
            loaded_at: Utc::now(),
            has_error: false,
            managers: IndexMap::new(),
            validation_errors: Vec::new(),
            audit_log: Vec::new(),
            settings,
        }
    }

    /// The process-wide context, created from `TIERCONF_*` variables on
    /// first use.
    pub fn global() -> &'static Mutex<Context> {
        GLOBAL_CONTEXT.get_or_init(|| Mutex::new(Context::new(Settings::from_env())))
    }

    /// Clear managers, errors and the audit trail. Settings are kept.
    pub fn reset(&mut self) {
        *self = Context::new(self.settings);
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn has_error(&self) -> bool {
        self.has_error
    }

    pub fn validation_errors(&self) -> &[String] {
        &self.validation_errors
    }

    pub fn audit_log(&self) -> &[AuditEntry] {
        &self.audit_log
    }

    pub fn managers(&self) -> impl Iterator<Item = (&str, &ConfigManager)> {
        self.managers.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn manager(&self, path: impl AsRef<Path>) -> Option<&ConfigManager> {
        self.managers.get(&key(path.as_ref()))
    }

    pub fn manager_mut(&mut self, path: impl AsRef<Path>) -> Option<&mut ConfigManager> {
        self.managers.get_mut(&key(path.as_ref()))
    }

    /// Register a manager under its base path, replacing any previous one
    pub fn register_manager(&mut self, manager: ConfigManager) {
        self.managers.insert(key(manager.base_path()), manager);
    }

    /// Note a failed operation; schema failures are also kept as strings
    pub fn record_error(&mut self, err: &Error) {
        self.has_error = true;
        if err.is_validation() {
            self.validation_errors.push(err.summary());
        }
    }

    /// Append an audit entry
    pub fn audit(
        &mut self,
        action: AuditAction,
        paths: Vec<String>,
        outcome: std::result::Result<(), &Error>,
    ) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            action,
            paths,
            success: outcome.is_ok(),
            error: outcome.err().map(|e| e.summary()),
        };
        log::debug!(
            "Audit {:?} {:?} success={}",
            entry.action,
            entry.paths,
            entry.success
        );
        self.audit_log.push(entry);
    }
}

fn key(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_entries_append_in_order() {
        let mut ctx = Context::default();
        let failure = Error::file_not_found("missing.json");

        ctx.audit(AuditAction::Import, vec!["a.json".into()], Ok(()));
        ctx.audit(
            AuditAction::Export,
            vec!["a.json".into(), "out.yaml".into()],
            Err(&failure),
        );

        let log = ctx.audit_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].action, AuditAction::Import);
        assert!(log[0].success);
        assert!(log[0].error.is_none());
        assert_eq!(log[1].action, AuditAction::Export);
        assert!(!log[1].success);
        assert_eq!(log[1].error.as_deref(), Some("File not found"));
        assert!(log[0].timestamp <= log[1].timestamp);
    }

    #[test]
    fn test_audit_entry_serializes() {
        let mut ctx = Context::default();
        ctx.audit(AuditAction::Import, vec!["a.json".into()], Ok(()));

        let json = serde_json::to_value(&ctx.audit_log()[0]).unwrap();

        assert_eq!(json["action"], "import");
        assert_eq!(json["paths"][0], "a.json");
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_record_error_tracks_validation_messages() {
        let mut ctx = Context::default();

        ctx.record_error(&Error::unsupported_format("xml"));
        assert!(ctx.has_error());
        assert!(ctx.validation_errors().is_empty());

        ctx.record_error(&Error::missing_required("Url"));
        assert_eq!(
            ctx.validation_errors(),
            &["Missing required property: Url".to_string()]
        );
    }

    #[test]
    fn test_register_and_lookup_manager() {
        let mut ctx = Context::default();
        ctx.register_manager(ConfigManager::new("conf/app.json"));

        assert!(ctx.manager("conf/app.json").is_some());
        assert!(ctx.manager("conf/other.json").is_none());
        assert_eq!(ctx.managers().count(), 1);

        ctx.manager_mut("conf/app.json")
            .unwrap()
            .set("a", 1);
        assert!(ctx.manager("conf/app.json").unwrap().value().is_some());
    }

    #[test]
    fn test_reset_clears_state_keeps_settings() {
        let settings = Settings::default().with_expand_env(false);
        let mut ctx = Context::new(settings);
        ctx.register_manager(ConfigManager::new("a.json"));
        ctx.record_error(&Error::missing_required("Url"));
        ctx.audit(AuditAction::Import, vec!["a.json".into()], Ok(()));

        ctx.reset();

        assert!(!ctx.has_error());
        assert!(ctx.validation_errors().is_empty());
        assert!(ctx.audit_log().is_empty());
        assert_eq!(ctx.managers().count(), 0);
        assert_eq!(ctx.settings, settings);
    }

    #[test]
    fn test_global_is_shared() {
        let first = Context::global() as *const _;
        let second = Context::global() as *const _;
        assert_eq!(first, second);
    }
}
