//! Configuration sources for the layered settings system
//!
//! Sources are merged in priority order
//! (environment variables > settings file > defaults).

use indexmap::IndexMap;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Separator between nested keys in environment variable names.
///
/// `CAMPUS_DATABASE__MAX_CONNECTIONS` addresses `database.max_connections`.
pub const ENV_NESTING_SEPARATOR: &str = "__";

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync {
	/// Load configuration from this source
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError>;

	/// Get the priority of this source (higher = more important)
	fn priority(&self) -> u8;

	/// Get a description of this source
	fn description(&self) -> String;
}

/// Error type for configuration sources
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Parse error: {0}")]
	Parse(String),

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

/// Default values configuration source
pub struct DefaultSource {
	values: IndexMap<String, Value>,
}

impl DefaultSource {
	/// Create an empty default source
	pub fn new() -> Self {
		Self {
			values: IndexMap::new(),
		}
	}

	/// Add a default value for a top-level key
	///
	/// # Examples
	///
	/// ```
	/// use campus_conf::sources::{ConfigSource, DefaultSource};
	/// use serde_json::json;
	///
	/// let source = DefaultSource::new().with_value("sweeper", json!({ "enabled": true }));
	/// let values = source.load().unwrap();
	/// assert_eq!(values["sweeper"]["enabled"], json!(true));
	/// ```
	pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
		self.values.insert(key.into(), value);
		self
	}

	/// Build a default source from any serializable value whose root is an object.
	pub fn from_serializable<T: serde::Serialize>(value: &T) -> Result<Self, SourceError> {
		let json = serde_json::to_value(value)?;
		let map = json
			.as_object()
			.ok_or_else(|| SourceError::Parse("Expected object at root".to_string()))?;
		Ok(Self {
			values: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
		})
	}
}

impl Default for DefaultSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigSource for DefaultSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		Ok(self.values.clone())
	}

	fn priority(&self) -> u8 {
		0 // Lowest priority
	}

	fn description(&self) -> String {
		"Default values".to_string()
	}
}

/// TOML file configuration source
///
/// A missing file contributes nothing, so deployments may rely on defaults
/// and environment variables alone.
pub struct TomlFileSource {
	path: PathBuf,
}

impl TomlFileSource {
	/// Create a new TOML file configuration source
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl ConfigSource for TomlFileSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		if !self.path.exists() {
			return Ok(IndexMap::new());
		}

		let content = fs::read_to_string(&self.path)?;
		let toml_value: toml::Value = toml::from_str(&content)?;

		// Convert TOML value to JSON value
		let json_str = serde_json::to_string(&toml_value)?;
		let json_value: Value = serde_json::from_str(&json_str)?;

		let map = json_value
			.as_object()
			.ok_or_else(|| SourceError::Parse("Expected table at root".to_string()))?;

		Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
	}

	fn priority(&self) -> u8 {
		50 // Medium priority
	}

	fn description(&self) -> String {
		format!("TOML file: {}", self.path.display())
	}
}

/// Environment variable configuration source
///
/// Only variables carrying the prefix are read. The remainder of the name is
/// lower-cased and split on [`ENV_NESTING_SEPARATOR`] into a nested key path.
pub struct EnvSource {
	prefix: String,
}

impl EnvSource {
	/// Create an environment source reading `<prefix>*` variables
	pub fn new(prefix: impl Into<String>) -> Self {
		Self {
			prefix: prefix.into(),
		}
	}

	fn load_from<I>(&self, vars: I) -> IndexMap<String, Value>
	where
		I: IntoIterator<Item = (String, String)>,
	{
		let mut config = serde_json::Map::new();

		for (key, value) in vars {
			let Some(clean_key) = key.strip_prefix(&self.prefix) else {
				continue;
			};
			let path: Vec<String> = clean_key
				.to_lowercase()
				.split(ENV_NESTING_SEPARATOR)
				.filter(|segment| !segment.is_empty())
				.map(str::to_string)
				.collect();
			if path.is_empty() {
				continue;
			}

			insert_path(&mut config, &path, parse_scalar(&value));
		}

		config.into_iter().collect()
	}
}

impl ConfigSource for EnvSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		Ok(self.load_from(std::env::vars()))
	}

	fn priority(&self) -> u8 {
		100 // Highest priority
	}

	fn description(&self) -> String {
		format!("Environment variables (prefix: {})", self.prefix)
	}
}

/// Parse an environment value into the narrowest JSON scalar
fn parse_scalar(raw: &str) -> Value {
	let trimmed = raw.trim();
	match trimmed.to_lowercase().as_str() {
		"true" | "yes" | "on" => return Value::Bool(true),
		"false" | "no" | "off" => return Value::Bool(false),
		_ => {}
	}
	if let Ok(num) = trimmed.parse::<i64>() {
		return Value::Number(num.into());
	}
	Value::String(raw.to_string())
}

fn insert_path(map: &mut serde_json::Map<String, Value>, path: &[String], value: Value) {
	match path {
		[] => {}
		[last] => {
			map.insert(last.clone(), value);
		}
		[head, rest @ ..] => {
			let child = map
				.entry(head.clone())
				.or_insert_with(|| Value::Object(serde_json::Map::new()));
			if !child.is_object() {
				*child = Value::Object(serde_json::Map::new());
			}
			if let Value::Object(child_map) = child {
				insert_path(child_map, rest, value);
			}
		}
	}
}

/// Deep-merge `overlay` into `base`; objects merge key by key, everything else is replaced.
pub(crate) fn merge_value(base: &mut Value, overlay: Value) {
	match (base, overlay) {
		(Value::Object(base_map), Value::Object(overlay_map)) => {
			for (key, value) in overlay_map {
				match base_map.get_mut(&key) {
					Some(existing) => merge_value(existing, value),
					None => {
						base_map.insert(key, value);
					}
				}
			}
		}
		(base, overlay) => *base = overlay,
	}
}
