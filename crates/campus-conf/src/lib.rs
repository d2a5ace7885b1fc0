//! # campus-conf
//!
//! Layered settings for CampusFinder.
//!
//! ```no_run
//! use campus_conf::Settings;
//!
//! let settings = Settings::load(Settings::resolve_path(None)).unwrap();
//! println!("database: {}", settings.database.url);
//! ```

pub mod builder;
pub mod settings;
pub mod sources;

pub use builder::{MergedSettings, SettingsBuilder, SettingsError};
pub use settings::{
	DEFAULT_SETTINGS_FILE, DatabaseSettings, ENV_PREFIX, LoggingSettings, MAX_RETENTION_DAYS,
	SETTINGS_FILE_ENV, Settings, SweeperSettings,
};
pub use sources::{ConfigSource, DefaultSource, EnvSource, SourceError, TomlFileSource};
