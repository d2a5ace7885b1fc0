//! Settings builder merging configuration sources by priority

use crate::sources::{ConfigSource, SourceError, merge_value};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Errors raised while building typed settings
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("Failed to load {source_name}: {error}")]
	Source {
		source_name: String,
		#[source]
		error: SourceError,
	},

	#[error("Invalid settings: {0}")]
	Invalid(#[from] serde_json::Error),

	#[error("Setting `{key}` is invalid: {message}")]
	Validation { key: String, message: String },
}

/// Collects configuration sources and merges them into one value tree
///
/// Lower-priority sources are applied first; nested tables are merged key by key.
///
/// # Examples
///
/// ```
/// use campus_conf::builder::SettingsBuilder;
/// use campus_conf::sources::DefaultSource;
/// use serde_json::json;
///
/// let merged = SettingsBuilder::new()
///     .add_source(DefaultSource::new().with_value("logging", json!({ "filter": "info" })))
///     .build()
///     .unwrap();
/// assert_eq!(merged.get("logging.filter"), Some(&json!("info")));
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl SettingsBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_source<S: ConfigSource + 'static>(mut self, source: S) -> Self {
		self.sources.push(Box::new(source));
		self
	}

	/// Load every source and merge them in ascending priority order
	pub fn build(mut self) -> Result<MergedSettings, SettingsError> {
		// Stable sort keeps insertion order among equal priorities
		self.sources.sort_by_key(|source| source.priority());

		let mut root = Value::Object(serde_json::Map::new());
		for source in &self.sources {
			let values = source.load().map_err(|error| SettingsError::Source {
				source_name: source.description(),
				error,
			})?;
			tracing::debug!(
				source = %source.description(),
				keys = values.len(),
				"Loaded settings source"
			);
			let overlay: serde_json::Map<String, Value> = values.into_iter().collect();
			merge_value(&mut root, Value::Object(overlay));
		}

		Ok(MergedSettings { root })
	}
}

/// Result of merging all sources
#[derive(Debug, Clone)]
pub struct MergedSettings {
	root: Value,
}

impl MergedSettings {
	/// Look up a dotted key path such as `database.url`
	pub fn get(&self, dotted_key: &str) -> Option<&Value> {
		dotted_key
			.split('.')
			.try_fold(&self.root, |node, segment| node.get(segment))
	}

	/// Deserialize the merged tree into a typed settings struct
	pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, SettingsError> {
		Ok(serde_json::from_value(self.root)?)
	}
}
