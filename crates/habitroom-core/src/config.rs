//! TOML-based application configuration.
//!
//! Stores:
//! - Backend connection settings (endpoint, project, database, collections)
//! - Realtime reconciliation tuning
//!
//! Configuration is stored at `~/.config/habitroom/config.toml`. Every backend
//! key can be overridden from the environment (`HABITROOM_ENDPOINT`, ...), and
//! the environment always wins.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns `~/.config/habitroom[-dev]/` based on HABITROOM_ENV.
///
/// Set HABITROOM_ENV=dev to use the development data directory.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("HABITROOM_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("habitroom-dev")
    } else {
        base_dir.join("habitroom")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::SaveFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}

/// Backend settings as written in the config file. Any of them may be
/// missing here and supplied by the environment instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub database_id: Option<String>,
    #[serde(default)]
    pub habits_collection: Option<String>,
    #[serde(default)]
    pub completions_collection: Option<String>,
}

/// Realtime reconciliation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Quiet window used to coalesce bursts of change events.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    150
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Fully resolved backend connection settings. Every field is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub endpoint: url::Url,
    pub project_id: String,
    pub platform: String,
    pub database_id: String,
    pub habits_collection: String,
    pub completions_collection: String,
}

impl BackendConfig {
    /// Realtime channel for document changes in `collection`.
    pub fn documents_channel(&self, collection: &str) -> String {
        format!(
            "databases.{}.collections.{}.documents",
            self.database_id, collection
        )
    }

    pub fn habits_channel(&self) -> String {
        self.documents_channel(&self.habits_collection)
    }

    pub fn completions_channel(&self) -> String {
        self.documents_channel(&self.completions_collection)
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/habitroom/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// (config key, environment variable) for each required backend setting,
/// in the order they are checked.
const BACKEND_KEYS: [(&str, &str); 6] = [
    ("backend.endpoint", "HABITROOM_ENDPOINT"),
    ("backend.project_id", "HABITROOM_PROJECT_ID"),
    ("backend.platform", "HABITROOM_PLATFORM"),
    ("backend.database_id", "HABITROOM_DB_ID"),
    ("backend.habits_collection", "HABITROOM_HABITS_COLLECTION"),
    ("backend.completions_collection", "HABITROOM_COMPLETIONS_COLLECTION"),
];

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
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".into(),
        };
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, or return defaults if no file exists.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, or return defaults if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => Some(String::new()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. Does not save.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Resolve backend settings from the process environment and this file.
    pub fn backend(&self) -> Result<BackendConfig, ConfigError> {
        self.backend_with_env(|name| std::env::var(name).ok())
    }

    /// Resolve backend settings, looking variables up through `env`.
    ///
    /// Fails on the first missing or blank key.
    pub fn backend_with_env<F>(&self, env: F) -> Result<BackendConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut values = Vec::with_capacity(BACKEND_KEYS.len());
        for (key, var) in BACKEND_KEYS {
            let value = env(var)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| self.get(key).filter(|v| !v.trim().is_empty()))
                .ok_or_else(|| ConfigError::MissingKey(format!("{key} (or {var})")))?;
            values.push(value.trim().to_string());
        }

        let mut values = values.into_iter();
        let mut next = || values.next().unwrap_or_default();

        let endpoint_raw = next();
        let endpoint = url::Url::parse(&endpoint_raw).map_err(|e| ConfigError::InvalidValue {
            key: "backend.endpoint".into(),
            message: format!("'{endpoint_raw}' is not a URL: {e}"),
        })?;

        Ok(BackendConfig {
            endpoint,
            project_id: next(),
            platform: next(),
            database_id: next(),
            habits_collection: next(),
            completions_collection: next(),
        })
    }
}
