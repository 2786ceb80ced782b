//! Configuration management for the passage planner
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::PlannerError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for the passage planner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Capability provider settings
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Plan persistence settings
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Safety scoring thresholds
    #[serde(default)]
    pub safety: SafetyConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Capability provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Deadline for each fanned-out branch, in seconds
    #[serde(default = "default_branch_timeout")]
    pub branch_timeout_seconds: u32,
}

/// Plan persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Maximum number of save attempts
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each following attempt
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Time allowed for a single save attempt
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    /// Directory of the embedded plan store
    #[serde(default = "default_store_location")]
    pub location: String,
}

/// Safety scoring thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Required depth as a multiple of the vessel draft
    #[serde(default = "default_depth_margin")]
    pub depth_safety_margin: f64,
    /// Wind speed (knots) above which a strong-wind warning is raised
    #[serde(default = "default_strong_wind")]
    pub strong_wind_knots: f64,
    /// Wave height (provider unit) above which a rough-seas warning is raised
    #[serde(default = "default_rough_seas")]
    pub rough_seas_height: f64,
    /// Routes with more waypoints than this get a rest-stop recommendation
    #[serde(default = "default_long_route")]
    pub long_route_waypoints: usize,
    /// Cruise speed (knots) assumed when the request has no vessel
    #[serde(default = "default_cruise_speed")]
    pub default_cruise_speed_knots: f64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_branch_timeout() -> u32 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_attempt_timeout_ms() -> u64 {
    10_000
}

fn default_store_location() -> String {
    "~/.local/share/passageplan/plans".to_string()
}

fn default_depth_margin() -> f64 {
    1.5
}

fn default_strong_wind() -> f64 {
    25.0
}

fn default_rough_seas() -> f64 {
    3.0
}

fn default_long_route() -> usize {
    10
}

fn default_cruise_speed() -> f64 {
    5.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            branch_timeout_seconds: default_branch_timeout(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            location: default_store_location(),
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            depth_safety_margin: default_depth_margin(),
            strong_wind_knots: default_strong_wind(),
            rough_seas_height: default_rough_seas(),
            long_route_waypoints: default_long_route(),
            default_cruise_speed_knots: default_cruise_speed(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            providers: ProvidersConfig::default(),
            persistence: PersistenceConfig::default(),
            safety: SafetyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ProvidersConfig {
    #[must_use]
    pub fn branch_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.branch_timeout_seconds))
    }
}

impl PersistenceConfig {
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    /// Store location with a leading `~` expanded to the home directory
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        match self.location.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(rest)),
            None => PathBuf::from(&self.location),
        }
    }
}

impl PlannerConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // PASSAGEPLAN_SAFETY__STRONG_WIND_KNOTS=30 style overrides
        builder = builder.add_source(
            Environment::with_prefix("PASSAGEPLAN")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: PlannerConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("passageplan").join("config.toml"))
    }

    /// Apply default values to zeroed or empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.providers.branch_timeout_seconds == 0 {
            self.providers.branch_timeout_seconds = default_branch_timeout();
        }
        if self.persistence.max_attempts == 0 {
            self.persistence.max_attempts = default_max_attempts();
        }
        if self.persistence.attempt_timeout_ms == 0 {
            self.persistence.attempt_timeout_ms = default_attempt_timeout_ms();
        }
        if self.persistence.location.is_empty() {
            self.persistence.location = default_store_location();
        }
        if self.safety.depth_safety_margin <= 0.0 {
            self.safety.depth_safety_margin = default_depth_margin();
        }
        if self.safety.default_cruise_speed_knots <= 0.0 {
            self.safety.default_cruise_speed_knots = default_cruise_speed();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.providers.branch_timeout_seconds > 300 {
            return Err(
                PlannerError::config("Branch timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.persistence.max_attempts > 10 {
            return Err(PlannerError::config("Persistence attempts cannot exceed 10").into());
        }

        if self.persistence.base_delay_ms > 60_000 {
            return Err(
                PlannerError::config("Persistence base delay cannot exceed 60000 ms").into(),
            );
        }

        if self.persistence.attempt_timeout_ms > 300_000 {
            return Err(
                PlannerError::config("Persistence attempt timeout cannot exceed 300000 ms").into(),
            );
        }

        let thresholds = [
            ("depth_safety_margin", self.safety.depth_safety_margin),
            ("strong_wind_knots", self.safety.strong_wind_knots),
            ("rough_seas_height", self.safety.rough_seas_height),
            ("default_cruise_speed_knots", self.safety.default_cruise_speed_knots),
        ];
        if let Some((name, value)) = thresholds.iter().find(|(_, value)| !value.is_finite()) {
            return Err(PlannerError::config(format!(
                "Safety setting {name} must be a finite number, got {value}"
            ))
            .into());
        }

        if self.safety.depth_safety_margin < 1.0 {
            return Err(PlannerError::config(
                "Depth safety margin must be at least 1.0 (depth equal to draft)",
            )
            .into());
        }

        if self.safety.strong_wind_knots <= 0.0 || self.safety.rough_seas_height <= 0.0 {
            return Err(PlannerError::config("Wind and wave thresholds must be positive").into());
        }

        if self.safety.default_cruise_speed_knots > 50.0 {
            return Err(
                PlannerError::config("Default cruise speed cannot exceed 50 knots").into(),
            );
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(PlannerError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(PlannerError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = PlannerConfig::default();
        assert_eq!(config.providers.branch_timeout_seconds, 30);
        assert_eq!(config.persistence.max_attempts, 3);
        assert_eq!(config.safety.strong_wind_knots, 25.0);
        assert_eq!(config.safety.long_route_waypoints, 10);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = PlannerConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = PlannerConfig::default();
        config.providers.branch_timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_depth_margin_below_draft_rejected() {
        let mut config = PlannerConfig::default();
        config.safety.depth_safety_margin = 0.8;
        assert!(config.validate().is_err());
    }

    #[rstest]
    #[case::depth_margin(|c: &mut PlannerConfig| c.safety.depth_safety_margin = f64::NAN)]
    #[case::strong_wind(|c: &mut PlannerConfig| c.safety.strong_wind_knots = f64::INFINITY)]
    #[case::rough_seas(|c: &mut PlannerConfig| c.safety.rough_seas_height = f64::NAN)]
    #[case::cruise_speed(|c: &mut PlannerConfig| c.safety.default_cruise_speed_knots = f64::NAN)]
    fn test_non_finite_safety_settings_rejected(#[case] set: fn(&mut PlannerConfig)) {
        let mut config = PlannerConfig::default();
        set(&mut config);
        config.apply_defaults();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("finite"));
    }

    #[test]
    fn test_nan_cruise_speed_in_file_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[safety]\ndefault_cruise_speed_knots = nan\n").unwrap();

        assert!(PlannerConfig::load_from_path(Some(file.path().to_path_buf())).is_err());
    }

    #[test]
    fn test_store_path_expands_home() {
        let config = PersistenceConfig {
            location: "~/plans".to_string(),
            ..PersistenceConfig::default()
        };
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.store_path(), home.join("plans"));
        }

        let absolute = PersistenceConfig {
            location: "/var/lib/plans".to_string(),
            ..PersistenceConfig::default()
        };
        assert_eq!(absolute.store_path(), PathBuf::from("/var/lib/plans"));
    }

    #[test]
    fn test_apply_defaults_fills_zeroes() {
        let mut config = PlannerConfig::default();
        config.providers.branch_timeout_seconds = 0;
        config.persistence.max_attempts = 0;
        config.logging.format = String::new();
        config.apply_defaults();
        assert_eq!(config.providers.branch_timeout_seconds, 30);
        assert_eq!(config.persistence.max_attempts, 3);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[providers]\nbranch_timeout_seconds = 10\n\n[safety]\nstrong_wind_knots = 20.0\n"
        )
        .unwrap();

        let config = PlannerConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.providers.branch_timeout_seconds, 10);
        assert_eq!(config.safety.strong_wind_knots, 20.0);
        assert_eq!(config.persistence.max_attempts, 3);
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = PlannerConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("passageplan"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}
