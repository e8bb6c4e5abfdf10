//! TOML-based startup configuration.
//!
//! Holds every tunable of the controller:
//! - Input timing (debounce, double-click, cooldowns)
//! - Screen refresh and hold durations
//! - Default session durations and long-break cadence
//! - Presence range threshold
//! - Settings screen step and bounds
//!
//! Configuration is read once at startup from `~/.config/pomodesk/config.toml`
//! (or an explicit path). Values edited on the device are not written back.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::timer::SessionDurations;

/// Input and screen timing, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_double_click_ms")]
    pub double_click_ms: u64,
    /// Settings cannot be re-entered for this long after leaving a mode.
    #[serde(default = "default_settings_reentry_cooldown_ms")]
    pub settings_reentry_cooldown_ms: u64,
    #[serde(default = "default_shake_cooldown_ms")]
    pub shake_cooldown_ms: u64,
    #[serde(default = "default_presence_sample_interval_ms")]
    pub presence_sample_interval_ms: u64,
    #[serde(default = "default_display_refresh_ms")]
    pub display_refresh_ms: u64,
    #[serde(default = "default_idle_display_refresh_ms")]
    pub idle_display_refresh_ms: u64,
    #[serde(default = "default_finished_screen_ms")]
    pub finished_screen_ms: u64,
    #[serde(default = "default_gambling_result_ms")]
    pub gambling_result_ms: u64,
    /// Control loop cadence used by drivers of `AppController::tick`.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Presence detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceConfig {
    #[serde(default = "default_range_threshold_cm")]
    pub range_threshold_cm: f32,
}

/// Settings screen configuration, in minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsConfig {
    #[serde(default = "default_step_minutes")]
    pub step_minutes: u32,
    #[serde(default = "default_work_min_minutes")]
    pub work_min_minutes: u32,
    #[serde(default = "default_work_max_minutes")]
    pub work_max_minutes: u32,
    #[serde(default = "default_break_min_minutes")]
    pub break_min_minutes: u32,
    #[serde(default = "default_break_max_minutes")]
    pub break_max_minutes: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub durations: SessionDurations,
    #[serde(default)]
    pub presence: PresenceConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
}

// Default functions
fn default_debounce_ms() -> u64 {
    200
}
fn default_double_click_ms() -> u64 {
    350
}
fn default_settings_reentry_cooldown_ms() -> u64 {
    400
}
fn default_shake_cooldown_ms() -> u64 {
    2000
}
fn default_presence_sample_interval_ms() -> u64 {
    1000
}
fn default_display_refresh_ms() -> u64 {
    500
}
fn default_idle_display_refresh_ms() -> u64 {
    100
}
fn default_finished_screen_ms() -> u64 {
    3000
}
fn default_gambling_result_ms() -> u64 {
    2000
}
fn default_tick_interval_ms() -> u64 {
    10
}
fn default_range_threshold_cm() -> f32 {
    25.0
}
fn default_step_minutes() -> u32 {
    5
}
fn default_work_min_minutes() -> u32 {
    10
}
fn default_work_max_minutes() -> u32 {
    90
}
fn default_break_min_minutes() -> u32 {
    5
}
fn default_break_max_minutes() -> u32 {
    20
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            double_click_ms: default_double_click_ms(),
            settings_reentry_cooldown_ms: default_settings_reentry_cooldown_ms(),
            shake_cooldown_ms: default_shake_cooldown_ms(),
            presence_sample_interval_ms: default_presence_sample_interval_ms(),
            display_refresh_ms: default_display_refresh_ms(),
            idle_display_refresh_ms: default_idle_display_refresh_ms(),
            finished_screen_ms: default_finished_screen_ms(),
            gambling_result_ms: default_gambling_result_ms(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            range_threshold_cm: default_range_threshold_cm(),
        }
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            step_minutes: default_step_minutes(),
            work_min_minutes: default_work_min_minutes(),
            work_max_minutes: default_work_max_minutes(),
            break_min_minutes: default_break_min_minutes(),
            break_max_minutes: default_break_max_minutes(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            durations: SessionDurations::default(),
            presence: PresenceConfig::default(),
            settings: SettingsConfig::default(),
        }
    }
}

/// Returns `~/.config/pomodesk[-dev]/` based on POMODESK_ENV.
///
/// Set POMODESK_ENV=dev to use the development directory.
pub fn config_dir() -> PathBuf {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("POMODESK_ENV").unwrap_or_else(|_| "production".to_string());

    if env == "dev" {
        base_dir.join("pomodesk-dev")
    } else {
        base_dir.join("pomodesk")
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
                    serde_json::Value::Bool(_) => value
                        .parse::<bool>()
                        .map(serde_json::Value::Bool)
                        .map_err(|e| ConfigError::invalid(key, e.to_string()))?,
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| {
                                    ConfigError::invalid(key, format!("cannot parse '{value}' as number"))
                                })?
                        } else {
                            return Err(ConfigError::invalid(
                                key,
                                format!("cannot parse '{value}' as number"),
                            ));
                        }
                    }
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

    /// Default location of the configuration file.
    pub fn default_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    /// Load from `path`, returning the defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or
    /// fails validation.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };
        let cfg: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from `path`, returning defaults on any error.
    /// This is a convenience method that never fails.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load_from(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid configuration, using defaults");
            Self::default()
        })
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

    /// Set a config value by key. The change is validated before it is applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed or
    /// the resulting configuration is invalid. `self` is unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::invalid(key, e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reject values the controller cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.durations
            .validate()
            .map_err(|e| ConfigError::invalid("durations", e.to_string()))?;

        let t = &self.timing;
        for (key, value) in [
            ("timing.presence_sample_interval_ms", t.presence_sample_interval_ms),
            ("timing.display_refresh_ms", t.display_refresh_ms),
            ("timing.idle_display_refresh_ms", t.idle_display_refresh_ms),
            ("timing.tick_interval_ms", t.tick_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid(key, "must be greater than zero"));
            }
        }

        let threshold = self.presence.range_threshold_cm;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::invalid(
                "presence.range_threshold_cm",
                "must be a non-negative number",
            ));
        }

        let s = &self.settings;
        if s.step_minutes == 0 {
            return Err(ConfigError::invalid("settings.step_minutes", "must be at least 1"));
        }
        if s.work_min_minutes == 0 || s.work_min_minutes > s.work_max_minutes {
            return Err(ConfigError::invalid(
                "settings.work_min_minutes",
                "must be at least 1 and not above work_max_minutes",
            ));
        }
        if s.break_min_minutes == 0 || s.break_min_minutes > s.break_max_minutes {
            return Err(ConfigError::invalid(
                "settings.break_min_minutes",
                "must be at least 1 and not above break_max_minutes",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[timing]\ndebounce_ms = 150\n").unwrap();
        assert_eq!(parsed.timing.debounce_ms, 150);
        assert_eq!(parsed.timing.double_click_ms, 350);
        assert_eq!(parsed.durations.work_secs, 1500);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timing.debounce_ms").as_deref(), Some("200"));
        assert_eq!(cfg.get("durations.work_secs").as_deref(), Some("1500"));
        assert_eq!(cfg.get("presence.range_threshold_cm").as_deref(), Some("25.0"));
        assert!(cfg.get("timing.missing_key").is_none());
        assert!(cfg.get("timing").is_none());
    }

    #[test]
    fn set_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.set("timing.shake_cooldown_ms", "1500").unwrap();
        assert_eq!(cfg.timing.shake_cooldown_ms, 1500);
        cfg.set("presence.range_threshold_cm", "30.5").unwrap();
        assert_eq!(cfg.presence.range_threshold_cm, 30.5);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("timing.nonexistent_key", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.set("timing", "1"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("timing.debounce_ms", "soon"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn set_rejects_zero_duration_and_keeps_previous() {
        let mut cfg = Config::default();
        assert!(cfg.set("durations.work_secs", "0").is_err());
        assert_eq!(cfg.durations.work_secs, 1500);
    }

    #[test]
    fn validate_rejects_inverted_settings_bounds() {
        let mut cfg = Config::default();
        cfg.settings.work_min_minutes = 95;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.durations.work_secs = 3000;
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timing = 3").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseFailed(_))
        ));
        assert_eq!(Config::load_or_default(&path), Config::default());
    }
}
