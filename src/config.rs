use std::path::Path;

use chrono::{DateTime, Utc};
use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::error::ConfigError;

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_tick_interval_secs() -> u64 {
    60
}

fn default_error_cooldown_secs() -> u64 {
    60
}

fn default_ntfy_base_url() -> String {
    "https://ntfy.sh".into()
}

fn default_lead_minutes() -> u64 {
    5
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub notify: NotifyConfig,
    pub breakout: BreakoutConfig,
    pub event: EventConfig,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Seconds between condition checks.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// Seconds to wait after an unexpected scheduler failure before retrying.
    #[serde(default = "default_error_cooldown_secs")]
    pub error_cooldown_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_ntfy_base_url")]
    pub base_url: String,
    /// ntfy topic the phone is subscribed to.
    pub topic: String,
}

#[derive(Debug, Deserialize)]
pub struct BreakoutConfig {
    /// Provider ticker, e.g. "CAD=X" for USD/CAD.
    pub symbol: String,
    /// Entry trigger price; alert fires when the last close is strictly above.
    pub threshold: f64,
}

#[derive(Debug, Deserialize)]
pub struct EventConfig {
    /// Human label used in log lines and the notification text.
    pub name: String,
    /// RFC 3339 instant of the scheduled event, e.g. "2025-08-07T11:00:00Z".
    pub target_utc: DateTime<Utc>,
    /// Minutes before the event at which the alert window opens.
    #[serde(default = "default_lead_minutes")]
    pub lead_minutes: u64,
}

/// Load and validate an `AppConfig` from a TOML file at `path`.
pub fn load(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    let content = std::fs::read_to_string(path)
        .change_context(ConfigError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })?;

    validate(&config)?;

    Ok(config)
}

fn validate(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    validate_general(config)?;
    validate_notify(config)?;
    validate_breakout(config)?;
    Ok(())
}

fn validate_general(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if config.general.tick_interval_secs == 0 {
        return Err(Report::new(ConfigError::Validation {
            field: "general.tick_interval_secs must be at least 1".into(),
        }));
    }
    Ok(())
}

fn validate_notify(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if config.notify.topic.trim().is_empty() {
        return Err(Report::new(ConfigError::Validation {
            field: "notify.topic must not be empty".into(),
        }));
    }
    Ok(())
}

fn validate_breakout(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if config.breakout.symbol.trim().is_empty() {
        return Err(Report::new(ConfigError::Validation {
            field: "breakout.symbol must not be empty".into(),
        }));
    }

    let threshold = config.breakout.threshold;
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(Report::new(ConfigError::Validation {
            field: format!("breakout.threshold must be a positive price, got {threshold}"),
        }));
    }
    Ok(())
}
