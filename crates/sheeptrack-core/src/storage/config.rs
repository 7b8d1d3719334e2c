//! TOML-based application configuration.
//!
//! Stores:
//! - Cycle length for each goal frequency
//! - Tracker policy (dead-sheep completion, live goal cap, default deadline)
//! - Polling period for the real-time decay loop
//!
//! Configuration is stored at `<data dir>/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::goal::Frequency;
use crate::tracker::CompletionPolicy;

/// Longest accepted cycle: ten years.
const MAX_INTERVAL_SECS: u64 = 10 * 365 * 24 * 60 * 60;
/// Longest accepted default deadline: a hundred years.
const MAX_DEADLINE_DAYS: u64 = 36_500;
const MAX_TICK_MS: u64 = 24 * 60 * 60 * 1000;

/// Cycle length per frequency, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalConfig {
    #[serde(default = "default_daily_secs")]
    pub daily_secs: u64,
    #[serde(default = "default_weekly_secs")]
    pub weekly_secs: u64,
    #[serde(default = "default_biweekly_secs")]
    pub biweekly_secs: u64,
}

/// Tracker behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Whether a goal can be completed while its sheep has no hearts.
    #[serde(default = "default_true")]
    pub allow_complete_when_dead: bool,
    #[serde(default = "default_max_live_goals")]
    pub max_live_goals: usize,
    /// Deadline given to goals created without one.
    #[serde(default = "default_deadline_days")]
    pub default_deadline_days: u32,
    /// How often `run` polls the decay timers.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub intervals: IntervalConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

fn default_daily_secs() -> u64 {
    24 * 60 * 60
}
fn default_weekly_secs() -> u64 {
    7 * default_daily_secs()
}
fn default_biweekly_secs() -> u64 {
    14 * default_daily_secs()
}
fn default_true() -> bool {
    true
}
fn default_max_live_goals() -> usize {
    3
}
fn default_deadline_days() -> u32 {
    30
}
fn default_tick_ms() -> u64 {
    1000
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            daily_secs: default_daily_secs(),
            weekly_secs: default_weekly_secs(),
            biweekly_secs: default_biweekly_secs(),
        }
    }
}

impl IntervalConfig {
    pub fn secs_for(&self, frequency: Frequency) -> u64 {
        match frequency {
            Frequency::Daily => self.daily_secs,
            Frequency::Weekly => self.weekly_secs,
            Frequency::Biweekly => self.biweekly_secs,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            allow_complete_when_dead: true,
            max_live_goals: default_max_live_goals(),
            default_deadline_days: default_deadline_days(),
            tick_ms: default_tick_ms(),
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
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => value
                        .parse::<bool>()
                        .map(serde_json::Value::Bool)
                        .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) => return Err(unknown()),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Reject values the tracker cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bounded = [
            ("intervals.daily_secs", self.intervals.daily_secs, MAX_INTERVAL_SECS),
            ("intervals.weekly_secs", self.intervals.weekly_secs, MAX_INTERVAL_SECS),
            ("intervals.biweekly_secs", self.intervals.biweekly_secs, MAX_INTERVAL_SECS),
            (
                "tracker.default_deadline_days",
                self.tracker.default_deadline_days as u64,
                MAX_DEADLINE_DAYS,
            ),
            ("tracker.tick_ms", self.tracker.tick_ms, MAX_TICK_MS),
        ];
        for (key, value, max) in bounded {
            if value > max {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("must be at most {max}"),
                });
            }
        }

        let positive = [
            ("intervals.daily_secs", self.intervals.daily_secs),
            ("intervals.weekly_secs", self.intervals.weekly_secs),
            ("intervals.biweekly_secs", self.intervals.biweekly_secs),
            ("tracker.tick_ms", self.tracker.tick_ms),
            ("tracker.max_live_goals", self.tracker.max_live_goals as u64),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be greater than zero".into(),
                });
            }
        }
        Ok(())
    }

    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or write and return the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
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
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result fails validation. On error `self` is unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// All leaf keys with their current values, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(serde_json::Value::Object(sections)) = serde_json::to_value(self) {
            for (section, fields) in sections {
                if let serde_json::Value::Object(fields) = fields {
                    for (field, value) in fields {
                        let value = match value {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        };
                        out.push((format!("{section}.{field}"), value));
                    }
                }
            }
        }
        out
    }

    pub fn completion_policy(&self) -> CompletionPolicy {
        CompletionPolicy {
            allow_complete_when_dead: self.tracker.allow_complete_when_dead,
        }
    }

    pub fn tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tracker.tick_ms)
    }
}
