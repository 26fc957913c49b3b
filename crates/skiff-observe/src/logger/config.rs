use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use super::{LoggerError, LoggerFormat, LoggerLevel, LoggerTimeZone};

/// Logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Output format.
    pub format: LoggerFormat,
    /// Filter expression (e.g. `"info"`, `"skiff_core=debug,info"`).
    pub level: LoggerLevel,
    /// Timezone for timestamps.
    pub tz: LoggerTimeZone,
    /// Include event targets in the output.
    pub with_targets: bool,
    /// Color text output when stdout is a terminal.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            tz: LoggerTimeZone::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Reads `SKIFF_LOG_FORMAT`, `SKIFF_LOG_LEVEL`, `SKIFF_LOG_TZ`, `SKIFF_LOG_TARGETS` and
    /// `SKIFF_LOG_COLOR` over the defaults.
    pub fn from_env() -> Result<Self, LoggerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoggerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup("SKIFF_LOG_FORMAT") {
            cfg.format = v.parse()?;
        }
        if let Some(v) = lookup("SKIFF_LOG_LEVEL") {
            cfg.level = v.parse()?;
        }
        if let Some(v) = lookup("SKIFF_LOG_TZ") {
            cfg.tz = v.parse()?;
        }
        if let Some(v) = lookup("SKIFF_LOG_TARGETS") {
            cfg.with_targets = parse_flag("SKIFF_LOG_TARGETS", &v)?;
        }
        if let Some(v) = lookup("SKIFF_LOG_COLOR") {
            cfg.use_color = parse_flag("SKIFF_LOG_COLOR", &v)?;
        }
        Ok(cfg)
    }

    /// `true` when color is enabled and stdout is a terminal.
    ///
    /// Checked at install time, not at parse time.
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, LoggerError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(LoggerError::InvalidFlag {
            var,
            value: value.to_string(),
        }),
    }
}
