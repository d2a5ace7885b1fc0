//! Test fixtures and factories.
//!
//! Available to this crate's tests and, through the `test-utils` feature, to
//! dependants' tests.

use crate::context::{Principal, RequestContext};
use crate::models::{Item, ItemKind};
use campus_db::{ConnectionPool, PoolConfig};
use chrono::Utc;
use rstest::*;
use tempfile::TempDir;

/// Administrator id used by [`admin_ctx`]
pub const TEST_ADMIN_ID: &str = "admin";

/// A migrated database in a temporary directory.
///
/// The file is removed when the value is dropped.
pub struct TestDb {
	pub pool: ConnectionPool,
	_dir: TempDir,
}

/// Open and migrate a file-backed database.
///
/// File-backed so that concurrent pooled connections see the same data.
#[fixture]
pub async fn test_db() -> TestDb {
	let dir = tempfile::tempdir().expect("Failed to create temp dir");
	let url = format!("sqlite://{}", dir.path().join("campus.db").display());
	let pool = ConnectionPool::connect(&url, PoolConfig::default().with_max_connections(5))
		.await
		.expect("Failed to create pool");
	pool.migrate().await.expect("Failed to migrate");
	TestDb { pool, _dir: dir }
}

/// Insert a user row with a placeholder credential.
pub async fn create_user(pool: &ConnectionPool, user_id: &str, user_name: &str) {
	sqlx::query("INSERT INTO app_user (user_id, user_name, password) VALUES (?, ?, 'password123')")
		.bind(user_id)
		.bind(user_name)
		.execute(pool.inner())
		.await
		.expect("Failed to create user");
}

/// Insert an item published by `publisher_id`, bypassing the freeze gate.
pub async fn create_item(pool: &ConnectionPool, publisher_id: &str, title: &str, kind: ItemKind) -> Item {
	sqlx::query_as::<_, Item>(
		"INSERT INTO item (title, description, location, user_id, item_type, pub_time)
		 VALUES (?, '', 'Main hall', ?, ?, ?)
		 RETURNING item_id, title, description, location, cat_id, user_id, item_type, pub_time",
	)
	.bind(title)
	.bind(publisher_id)
	.bind(kind)
	.bind(Utc::now())
	.fetch_one(pool.inner())
	.await
	.expect("Failed to create item")
}

pub fn user_ctx(user_id: &str) -> RequestContext {
	RequestContext::new(Principal::user(user_id))
}

pub fn admin_ctx() -> RequestContext {
	RequestContext::new(Principal::admin(TEST_ADMIN_ID))
}
