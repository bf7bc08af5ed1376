//! TOML-based application configuration.
//!
//! Stores:
//! - The set of monitored apps
//! - Quick Task duration, quota size and optional refill window
//! - Default Intention and Alternative Activity durations
//! - Infrastructure packages that never count as a real app switch
//! - Logging level
//!
//! Configuration is stored at `<data dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::app::AppId;
use crate::error::ConfigError;
use crate::timer::{QuotaPolicy, DEFAULT_MAX_USES};

/// Quick Task configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickTaskConfig {
    #[serde(default = "default_quick_task_duration_ms")]
    pub duration_ms: u64,
    #[serde(default = "default_max_uses")]
    pub max_uses: u32,
    /// Quota refill window. Unset means the quota only resets on demand.
    #[serde(default)]
    pub refill_window_ms: Option<u64>,
}

/// Intention timer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentionConfig {
    #[serde(default = "default_intention_duration_ms")]
    pub default_duration_ms: u64,
}

/// Alternative Activity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativeActivityConfig {
    #[serde(default = "default_activity_duration_ms")]
    pub default_duration_ms: u64,
}

/// Transient host-OS surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfrastructureConfig {
    #[serde(default = "default_infrastructure_packages")]
    pub packages: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitored_apps: Vec<String>,
    #[serde(default)]
    pub quick_task: QuickTaskConfig,
    #[serde(default)]
    pub intention: IntentionConfig,
    #[serde(default)]
    pub alternative_activity: AlternativeActivityConfig,
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// Default functions
fn default_quick_task_duration_ms() -> u64 {
    3 * 60 * 1000
}
fn default_max_uses() -> u32 {
    DEFAULT_MAX_USES
}
fn default_intention_duration_ms() -> u64 {
    5 * 60 * 1000
}
fn default_activity_duration_ms() -> u64 {
    10 * 60 * 1000
}
fn default_log_level() -> String {
    "info".into()
}
fn default_infrastructure_packages() -> Vec<String> {
    [
        "com.android.systemui",
        "com.android.dialer",
        "com.google.android.dialer",
        "com.android.incallui",
        "com.android.server.telecom",
        "com.android.permissioncontroller",
        "com.google.android.permissioncontroller",
        "com.android.packageinstaller",
        "com.google.android.packageinstaller",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for QuickTaskConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_quick_task_duration_ms(),
            max_uses: default_max_uses(),
            refill_window_ms: None,
        }
    }
}

impl Default for IntentionConfig {
    fn default() -> Self {
        Self {
            default_duration_ms: default_intention_duration_ms(),
        }
    }
}

impl Default for AlternativeActivityConfig {
    fn default() -> Self {
        Self {
            default_duration_ms: default_activity_duration_ms(),
        }
    }
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            packages: default_infrastructure_packages(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            monitored_apps: Vec::new(),
            quick_task: QuickTaskConfig::default(),
            intention: IntentionConfig::default(),
            alternative_activity: AlternativeActivityConfig::default(),
            infrastructure: InfrastructureConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value.parse::<u64>().map_err(|e| invalid(e.to_string()))?;
                        serde_json::Value::Number(n.into())
                    }
                    // Optional numbers serialize as null; "none" clears them.
                    serde_json::Value::Null => {
                        if value.eq_ignore_ascii_case("none") {
                            serde_json::Value::Null
                        } else {
                            let n = value.parse::<u64>().map_err(|e| invalid(e.to_string()))?;
                            serde_json::Value::Number(n.into())
                        }
                    }
                    serde_json::Value::Array(_) => {
                        let items = value
                            .split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(|s| serde_json::Value::String(s.to_string()))
                            .collect();
                        serde_json::Value::Array(items)
                    }
                    serde_json::Value::Object(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load from an explicit path, writing defaults there if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Returns error if key is unknown
    /// or the value does not parse.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn quota_policy(&self) -> QuotaPolicy {
        QuotaPolicy {
            max_uses: self.quick_task.max_uses,
            refill_window_ms: self.quick_task.refill_window_ms,
        }
    }

    pub fn is_monitored(&self, app: &AppId) -> bool {
        self.monitored_apps.iter().any(|m| m == app.as_str())
    }

    pub fn with_monitored<I, S>(mut self, apps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.monitored_apps = apps.into_iter().map(Into::into).collect();
        self
    }
}
