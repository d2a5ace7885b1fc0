//! Pool error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
	#[error("Invalid pool configuration: {0}")]
	Config(String),

	#[error("Database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error("Migration error: {0}")]
	Migration(#[from] sqlx::migrate::MigrateError),
}

pub type PoolResult<T> = Result<T, PoolError>;
