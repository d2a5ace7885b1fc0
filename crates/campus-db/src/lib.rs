//! # campus-db
//!
//! Storage plumbing for CampusFinder: a SQLite connection pool, the embedded
//! schema migrations and the write-transaction discipline every
//! state-changing operation follows.

pub mod config;
pub mod errors;
pub mod pool;

pub use config::PoolConfig;
pub use errors::{PoolError, PoolResult};
pub use pool::{BEGIN_WRITE, ConnectionPool, MIGRATOR};

/// Re-exported so dependants name the same driver types
pub use sqlx::{Sqlite, SqliteConnection, Transaction};
