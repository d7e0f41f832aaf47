//! Process-wide loading knobs

use std::time::Duration;

/// Default cache timeout in seconds
pub const DEFAULT_CACHE_TIMEOUT_SECS: u64 = 300;

/// Environment variables read by [`Settings::from_env`]
pub const ENV_CACHE_ENABLED: &str = "TIERCONF_CACHE_ENABLED";
pub const ENV_CACHE_TIMEOUT: &str = "TIERCONF_CACHE_TIMEOUT";
pub const ENV_EXPAND_ENV: &str = "TIERCONF_EXPAND_ENV";
pub const ENV_VALIDATE: &str = "TIERCONF_VALIDATE";

/// Options that control how a configuration is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Serve repeated non-forced loads from the cache
    pub cache_enabled: bool,
    /// Maximum age of a cached value
    pub cache_timeout: Duration,
    /// Expand environment references in string values
    pub expand_env: bool,
    /// Run schema validation when a schema is attached
    pub validate: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_timeout: Duration::from_secs(DEFAULT_CACHE_TIMEOUT_SECS),
            expand_env: true,
            validate: true,
        }
    }
}

impl Settings {
    /// Defaults overridden by `TIERCONF_*` environment variables.
    ///
    /// Values that cannot be parsed keep their default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`Settings::from_env`] with a custom variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |name: &str, default: bool| {
            lookup(name)
                .and_then(|raw| parse_flag(&raw))
                .unwrap_or_else(|| {
                    log::debug!("{} unset or invalid, using {}", name, default);
                    default
                })
        };

        Self {
            cache_enabled: flag(ENV_CACHE_ENABLED, defaults.cache_enabled),
            cache_timeout: lookup(ENV_CACHE_TIMEOUT)
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_timeout),
            expand_env: flag(ENV_EXPAND_ENV, defaults.expand_env),
            validate: flag(ENV_VALIDATE, defaults.validate),
        }
    }

    pub fn with_expand_env(mut self, expand_env: bool) -> Self {
        self.expand_env = expand_env;
        self
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }

    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
