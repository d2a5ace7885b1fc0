//! Item catalog lookups used by the claim lifecycle

use crate::error::ClaimResult;
use crate::models::{Item, ItemRef, NewItem};
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

pub async fn find(conn: &mut SqliteConnection, item_id: i64) -> ClaimResult<Option<ItemRef>> {
	let item = sqlx::query_as::<_, ItemRef>("SELECT item_id, title, user_id FROM item WHERE item_id = ?")
		.bind(item_id)
		.fetch_optional(conn)
		.await?;
	Ok(item)
}

/// Insert a posting owned by `publisher_id`, stamped at `now`
pub async fn publish(
	conn: &mut SqliteConnection,
	publisher_id: &str,
	item: &NewItem,
	now: DateTime<Utc>,
) -> ClaimResult<Item> {
	let item = sqlx::query_as::<_, Item>(
		"INSERT INTO item (title, description, location, cat_id, user_id, item_type, pub_time)
		 VALUES (?, ?, ?, ?, ?, ?, ?)
		 RETURNING item_id, title, description, location, cat_id, user_id, item_type, pub_time",
	)
	.bind(&item.title)
	.bind(&item.description)
	.bind(&item.location)
	.bind(item.category_id)
	.bind(publisher_id)
	.bind(item.kind)
	.bind(now)
	.fetch_one(conn)
	.await?;
	Ok(item)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::ItemKind;
	use crate::testing::{TestDb, create_user, test_db};
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_publish_then_find(#[future] test_db: TestDb) {
		let db = test_db.await;
		create_user(&db.pool, "s1", "Ann").await;
		let mut conn = db.pool.acquire().await.unwrap();
		let now = Utc::now();

		let item = publish(
			&mut conn,
			"s1",
			&NewItem {
				title: "Blue umbrella".to_string(),
				description: "Left in the library".to_string(),
				location: "Library 2F".to_string(),
				category_id: Some(3),
				kind: ItemKind::Found,
			},
			now,
		)
		.await
		.unwrap();

		assert_eq!(item.publisher_id, "s1");
		assert_eq!(item.kind, ItemKind::Found);
		assert_eq!(item.pub_time, now);

		let found = find(&mut conn, item.item_id).await.unwrap().unwrap();
		assert_eq!(found.title, "Blue umbrella");
		assert_eq!(found.publisher_id, "s1");
	}

	#[rstest]
	#[tokio::test]
	async fn test_find_missing_item(#[future] test_db: TestDb) {
		let db = test_db.await;
		let mut conn = db.pool.acquire().await.unwrap();

		assert!(find(&mut conn, 404).await.unwrap().is_none());
	}
}
