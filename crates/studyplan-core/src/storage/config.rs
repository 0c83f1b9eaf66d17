//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Planning horizon and slot search window
//! - Pomodoro split of generated sessions
//! - The local user id used as the calendar owner
//!
//! Configuration is stored at `~/.config/studyplan/config.toml`.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;
use crate::plan::PomodoroSettings;
use crate::distributor::MAX_WEEKS_AHEAD;
use crate::slot_finder::{SlotFinderConfig, DEFAULT_SEARCH_DAYS, MAX_SEARCH_DAYS};

/// Plan generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_weeks_ahead")]
    pub weeks_ahead: u32,
    #[serde(default = "default_search_window_days")]
    pub search_window_days: u32,
    /// Move generated sessions off booked events and blocked times.
    #[serde(default = "default_true")]
    pub respect_existing_events: bool,
}

/// Pomodoro split settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PomodoroConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_user_id")]
    pub id: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/studyplan/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub pomodoro: PomodoroConfig,
    #[serde(default)]
    pub user: UserConfig,
}

// Default functions
fn default_weeks_ahead() -> u32 {
    4
}
fn default_search_window_days() -> u32 {
    DEFAULT_SEARCH_DAYS as u32
}
fn default_true() -> bool {
    true
}
fn default_work_minutes() -> u32 {
    25
}
fn default_break_minutes() -> u32 {
    5
}
fn default_user_id() -> String {
    "local".into()
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            weeks_ahead: default_weeks_ahead(),
            search_window_days: default_search_window_days(),
            respect_existing_events: true,
        }
    }
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            work_minutes: default_work_minutes(),
            break_minutes: default_break_minutes(),
        }
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: default_user_id(),
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
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(format!("expected true/false: {e}")))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|e| invalid(format!("expected a whole number: {e}")))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("cannot set a whole section".into()));
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

    /// Default config path.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default path, or defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, or defaults when it does not exist.
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

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Persist to the default path.
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
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value has the wrong type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reject values the planner cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let out_of_range = |key: &str, max: u32| ConfigError::InvalidValue {
            key: key.into(),
            message: format!("must be between 1 and {max}"),
        };
        if !(1..=MAX_WEEKS_AHEAD).contains(&self.planner.weeks_ahead) {
            return Err(out_of_range("planner.weeks_ahead", MAX_WEEKS_AHEAD));
        }
        let max_days = MAX_SEARCH_DAYS as u32;
        if !(1..=max_days).contains(&self.planner.search_window_days) {
            return Err(out_of_range("planner.search_window_days", max_days));
        }
        if self.pomodoro.work_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pomodoro.work_minutes".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Pomodoro settings, if splitting is enabled.
    pub fn pomodoro_settings(&self) -> Option<PomodoroSettings> {
        if !self.pomodoro.enabled {
            return None;
        }
        PomodoroSettings::new(self.pomodoro.work_minutes, self.pomodoro.break_minutes).ok()
    }

    pub fn slot_finder_config(&self) -> SlotFinderConfig {
        SlotFinderConfig::default()
            .with_search_window(Duration::days(i64::from(self.planner.search_window_days)))
    }
}
