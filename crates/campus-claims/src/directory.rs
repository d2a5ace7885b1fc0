//! Read-only view of registered users

use crate::error::ClaimResult;
use sqlx::SqliteConnection;

pub async fn exists(conn: &mut SqliteConnection, user_id: &str) -> ClaimResult<bool> {
	let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM app_user WHERE user_id = ?")
		.bind(user_id)
		.fetch_one(conn)
		.await?;
	Ok(count > 0)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{TestDb, create_user, test_db};
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_lookup_registered_user(#[future] test_db: TestDb) {
		let db = test_db.await;
		create_user(&db.pool, "s1", "Ann").await;
		let mut conn = db.pool.acquire().await.unwrap();

		assert!(exists(&mut conn, "s1").await.unwrap());
		assert!(!exists(&mut conn, "ghost").await.unwrap());
	}
}
