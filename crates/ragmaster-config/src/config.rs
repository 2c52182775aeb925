//! Configuration management.
//!
//! The backend endpoint and its public key come from the environment and are
//! required: a process without them fails at startup. Everything else has a
//! default and can be tuned from `config.json` or the environment.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Supabase project URL.
pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";

/// Supabase anonymous (publishable) key.
pub const ENV_SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";

/// Names used by the web build, accepted as fallbacks.
const LEGACY_ENV_SUPABASE_URL: &str = "VITE_SUPABASE_URL";
const LEGACY_ENV_SUPABASE_ANON_KEY: &str = "VITE_SUPABASE_ANON_KEY";

/// Runtime override for the log level.
pub const ENV_LOG_LEVEL: &str = "RAGMASTER_LOG_LEVEL";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseSettings {
    /// Project URL without a trailing slash, e.g. `https://abc123.supabase.co`.
    pub url: String,
    /// Anonymous key sent as `apikey` on every request.
    pub anon_key: String,
}

impl SupabaseSettings {
    /// Resolve settings through `lookup` (normally `std::env::var`).
    ///
    /// Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |primary: &str, legacy: &str| {
            lookup(primary)
                .and_then(non_empty)
                .or_else(|| lookup(legacy).and_then(non_empty))
        };

        let url = read(ENV_SUPABASE_URL, LEGACY_ENV_SUPABASE_URL)
            .ok_or(CoreError::ConfigurationMissing(ENV_SUPABASE_URL))?;
        let anon_key = read(ENV_SUPABASE_ANON_KEY, LEGACY_ENV_SUPABASE_ANON_KEY)
            .ok_or(CoreError::ConfigurationMissing(ENV_SUPABASE_ANON_KEY))?;

        let parsed = Url::parse(&url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CoreError::Config(format!(
                "{} must be an http(s) URL, got {}",
                ENV_SUPABASE_URL, url
            )));
        }

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
        })
    }

    /// Resolve settings from the process environment.
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

/// Tunable settings stored in `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Fully resolved application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Backend connection settings.
    pub supabase: SupabaseSettings,
}

impl Config {
    /// Load configuration for `paths` from the process environment.
    ///
    /// Fails with [`CoreError::ConfigurationMissing`] when the backend URL or
    /// key is absent.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        Self::load_with(paths, |name| std::env::var(name).ok())
    }

    /// Load configuration resolving environment variables through `lookup`.
    pub fn load_with<F>(paths: &Paths, lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = paths.config_file();
        let file = if config_path.exists() {
            Self::load_file(&config_path)?
        } else {
            FileConfig::default()
        };

        let supabase = SupabaseSettings::from_lookup(&lookup)?;
        let log_level = lookup(ENV_LOG_LEVEL)
            .and_then(non_empty)
            .unwrap_or(file.log_level);

        Ok(Self {
            log_level,
            supabase,
        })
    }

    /// Load the tunable part of the configuration from a specific file.
    pub fn load_file(path: &Path) -> CoreResult<FileConfig> {
        let content = std::fs::read_to_string(path)?;
        let config: FileConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save the tunable part of the configuration.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(&FileConfig {
            log_level: self.log_level.clone(),
        })?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
