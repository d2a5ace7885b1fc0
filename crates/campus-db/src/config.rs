//! Pool configuration

use campus_conf::DatabaseSettings;
use std::time::Duration;

#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct PoolConfig {
	pub max_connections: u32,
	pub min_connections: u32,
	pub acquire_timeout: Duration,
	pub idle_timeout: Option<Duration>,
	pub max_lifetime: Option<Duration>,
	/// Time a connection waits on a locked database before returning `SQLITE_BUSY`
	pub busy_timeout: Duration,
	pub test_before_acquire: bool,
}

impl Default for PoolConfig {
	fn default() -> Self {
		Self {
			max_connections: 10,
			min_connections: 1,
			acquire_timeout: Duration::from_secs(30),
			idle_timeout: Some(Duration::from_secs(600)),
			max_lifetime: Some(Duration::from_secs(1800)),
			busy_timeout: Duration::from_secs(5),
			test_before_acquire: false,
		}
	}
}

impl PoolConfig {
	/// Create a new pool configuration with default values
	///
	/// # Examples
	///
	/// ```rust
	/// use campus_db::PoolConfig;
	///
	/// let config = PoolConfig::new();
	/// assert_eq!(config.max_connections, 10);
	/// ```
	pub fn new() -> Self {
		Self::default()
	}

	/// Build a pool configuration from the `[database]` settings table
	pub fn from_settings(settings: &DatabaseSettings) -> Self {
		Self::default()
			.with_max_connections(settings.max_connections)
			.with_min_connections(settings.min_connections)
			.with_acquire_timeout(settings.acquire_timeout())
			.with_busy_timeout(settings.busy_timeout())
	}

	pub fn with_max_connections(mut self, max: u32) -> Self {
		self.max_connections = max;
		self
	}

	pub fn with_min_connections(mut self, min: u32) -> Self {
		self.min_connections = min;
		self
	}

	pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
		self.acquire_timeout = timeout;
		self
	}

	pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.idle_timeout = timeout;
		self
	}

	pub fn with_max_lifetime(mut self, lifetime: Option<Duration>) -> Self {
		self.max_lifetime = lifetime;
		self
	}

	pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
		self.busy_timeout = timeout;
		self
	}

	pub fn with_test_before_acquire(mut self, test: bool) -> Self {
		self.test_before_acquire = test;
		self
	}

	pub fn validate(&self) -> Result<(), String> {
		if self.max_connections == 0 {
			return Err("max_connections must be at least 1".to_string());
		}
		if self.max_connections < self.min_connections {
			return Err("max_connections must be >= min_connections".to_string());
		}
		Ok(())
	}
}
