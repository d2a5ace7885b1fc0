//! Typed settings for CampusFinder
//!
//! Settings are resolved from three layers, highest priority first:
//!
//! 1. Environment variables prefixed with `CAMPUS_` (`__` separates nested keys)
//! 2. The TOML settings file (`settings/campus.toml` unless overridden)
//! 3. Built-in defaults

use crate::builder::{SettingsBuilder, SettingsError};
use crate::sources::{DefaultSource, EnvSource, TomlFileSource};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "CAMPUS_";

/// Environment variable naming the settings file
pub const SETTINGS_FILE_ENV: &str = "CAMPUS_SETTINGS_FILE";

/// Settings file used when neither the CLI nor the environment names one
pub const DEFAULT_SETTINGS_FILE: &str = "settings/campus.toml";

/// Longest credit record retention the sweeper accepts, in days
pub const MAX_RETENTION_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub database: DatabaseSettings,
	pub sweeper: SweeperSettings,
	pub logging: LoggingSettings,
}

/// Connection settings for the relational store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
	/// SQLite URL, e.g. `sqlite://campus.db`
	pub url: String,
	pub max_connections: u32,
	pub min_connections: u32,
	pub acquire_timeout_secs: u64,
	/// How long a writer waits for the store's write lock before failing
	pub busy_timeout_ms: u64,
}

impl Default for DatabaseSettings {
	fn default() -> Self {
		Self {
			url: "sqlite://campus.db".to_string(),
			max_connections: 10,
			min_connections: 1,
			acquire_timeout_secs: 30,
			busy_timeout_ms: 5_000,
		}
	}
}

impl DatabaseSettings {
	pub fn acquire_timeout(&self) -> Duration {
		Duration::from_secs(self.acquire_timeout_secs)
	}

	pub fn busy_timeout(&self) -> Duration {
		Duration::from_millis(self.busy_timeout_ms)
	}
}

/// Background credit sweeper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweeperSettings {
	pub enabled: bool,
	pub interval_secs: u64,
	/// Expired credit records younger than this are kept for review
	pub retention_days: i64,
}

impl Default for SweeperSettings {
	fn default() -> Self {
		Self {
			enabled: true,
			interval_secs: 3_600,
			retention_days: 30,
		}
	}
}

impl SweeperSettings {
	pub fn interval(&self) -> Duration {
		Duration::from_secs(self.interval_secs)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
	/// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence
	pub filter: String,
}

impl Default for LoggingSettings {
	fn default() -> Self {
		Self {
			filter: "info".to_string(),
		}
	}
}

impl Settings {
	/// Load settings from defaults, the given TOML file and `CAMPUS_*` variables
	pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let settings: Settings = SettingsBuilder::new()
			.add_source(
				DefaultSource::from_serializable(&Settings::default()).map_err(|error| {
					SettingsError::Source {
						source_name: "Default values".to_string(),
						error,
					}
				})?,
			)
			.add_source(TomlFileSource::new(path.as_ref()))
			.add_source(EnvSource::new(ENV_PREFIX))
			.build()?
			.into_typed()?;

		settings.validate()?;
		Ok(settings)
	}

	/// Resolve the settings file path: explicit argument, then `CAMPUS_SETTINGS_FILE`, then the default
	pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
		explicit
			.or_else(|| std::env::var_os(SETTINGS_FILE_ENV).map(PathBuf::from))
			.unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
	}

	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.database.url.trim().is_empty() {
			return Err(SettingsError::Validation {
				key: "database.url".to_string(),
				message: "must not be empty".to_string(),
			});
		}
		if self.database.max_connections == 0 {
			return Err(SettingsError::Validation {
				key: "database.max_connections".to_string(),
				message: "must be at least 1".to_string(),
			});
		}
		if self.database.max_connections < self.database.min_connections {
			return Err(SettingsError::Validation {
				key: "database.min_connections".to_string(),
				message: "must not exceed max_connections".to_string(),
			});
		}
		if self.sweeper.interval_secs == 0 {
			return Err(SettingsError::Validation {
				key: "sweeper.interval_secs".to_string(),
				message: "must be at least 1".to_string(),
			});
		}
		if !(0..=MAX_RETENTION_DAYS).contains(&self.sweeper.retention_days) {
			return Err(SettingsError::Validation {
				key: "sweeper.retention_days".to_string(),
				message: format!("must be between 0 and {MAX_RETENTION_DAYS}"),
			});
		}
		Ok(())
	}
}
