//! Claim registry
//!
//! Owns the `claim` relation. Callers pass the connection of an open write
//! transaction; the freeze gate lives with the caller so that the check and
//! the insert commit together.

use crate::catalog;
use crate::error::{ClaimError, ClaimResult, EntityKind, is_unique_violation};
use crate::models::{AuditDecision, AuditedClaim, AuditStatus, Claim, ClaimSummary, SubmittedClaim};
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

const CLAIM_COLUMNS: &str = "claim_id, item_id, user_id, reason, audit_status, created_at";

const SUMMARY_SELECT: &str = "SELECT c.claim_id, c.item_id, i.title, c.user_id,
		u.user_name AS claimant_name, c.reason, c.audit_status, c.created_at
	 FROM claim c
	 JOIN item i ON i.item_id = c.item_id
	 JOIN app_user u ON u.user_id = c.user_id";

/// Record a pending claim by `user_id` on `item_id`
///
/// # Errors
///
/// - [`ClaimError::NotFound`] when the item does not exist
/// - [`ClaimError::SelfClaim`] when the claimant published the item
/// - [`ClaimError::DuplicateClaim`] when the user already holds a pending or
///   approved claim on the item
pub async fn submit(
	conn: &mut SqliteConnection,
	user_id: &str,
	item_id: i64,
	reason: &str,
	now: DateTime<Utc>,
) -> ClaimResult<SubmittedClaim> {
	let item = catalog::find(&mut *conn, item_id)
		.await?
		.ok_or_else(|| ClaimError::not_found(EntityKind::Item, item_id))?;

	if item.publisher_id == user_id {
		return Err(ClaimError::SelfClaim { item_id });
	}

	let duplicate = || ClaimError::DuplicateClaim {
		user_id: user_id.to_string(),
		item_id,
	};

	let active: i64 = sqlx::query_scalar(
		"SELECT COUNT(*) FROM claim
		 WHERE item_id = ? AND user_id = ? AND audit_status IN (?, ?)",
	)
	.bind(item_id)
	.bind(user_id)
	.bind(AuditStatus::Pending)
	.bind(AuditStatus::Approved)
	.fetch_one(&mut *conn)
	.await?;
	if active > 0 {
		return Err(duplicate());
	}

	let inserted = sqlx::query_as::<_, Claim>(&format!(
		"INSERT INTO claim (item_id, user_id, reason, audit_status, created_at)
		 VALUES (?, ?, ?, ?, ?)
		 RETURNING {CLAIM_COLUMNS}"
	))
	.bind(item_id)
	.bind(user_id)
	.bind(reason)
	.bind(AuditStatus::Pending)
	.bind(now)
	.fetch_one(&mut *conn)
	.await;

	// The partial unique index catches a concurrent writer the count missed
	let claim = match inserted {
		Ok(claim) => claim,
		Err(e) if is_unique_violation(&e) => return Err(duplicate()),
		Err(e) => return Err(e.into()),
	};

	Ok(SubmittedClaim {
		claim,
		publisher_id: item.publisher_id,
		item_title: item.title,
	})
}

/// Move a pending claim to the decision's terminal state
///
/// Repeating the decision a claim already carries returns it with
/// `changed == false`.
///
/// # Errors
///
/// - [`ClaimError::NotFound`] when the claim does not exist
/// - [`ClaimError::InvalidTransition`] when the claim already carries the
///   opposite decision
pub async fn set_audit_status(
	conn: &mut SqliteConnection,
	claim_id: i64,
	decision: AuditDecision,
) -> ClaimResult<AuditedClaim> {
	let target = decision.target_status();

	let updated = sqlx::query(
		"UPDATE claim SET audit_status = ? WHERE claim_id = ? AND audit_status = ?",
	)
	.bind(target)
	.bind(claim_id)
	.bind(AuditStatus::Pending)
	.execute(&mut *conn)
	.await?;
	let changed = updated.rows_affected() == 1;

	let claim = find(&mut *conn, claim_id)
		.await?
		.ok_or_else(|| ClaimError::not_found(EntityKind::Claim, claim_id))?;

	if !changed && claim.audit_status != target {
		return Err(ClaimError::InvalidTransition {
			claim_id,
			from: claim.audit_status,
			to: target,
		});
	}

	let item = catalog::find(&mut *conn, claim.item_id)
		.await?
		.ok_or_else(|| ClaimError::not_found(EntityKind::Item, claim.item_id))?;

	Ok(AuditedClaim {
		claimant_id: claim.claimant_id.clone(),
		item_title: item.title,
		claim,
		changed,
	})
}

pub async fn find(conn: &mut SqliteConnection, claim_id: i64) -> ClaimResult<Option<Claim>> {
	let claim = sqlx::query_as::<_, Claim>(&format!(
		"SELECT {CLAIM_COLUMNS} FROM claim WHERE claim_id = ?"
	))
	.bind(claim_id)
	.fetch_optional(conn)
	.await?;
	Ok(claim)
}

/// Claims filed by `user_id`, newest first
pub async fn by_claimant(conn: &mut SqliteConnection, user_id: &str) -> ClaimResult<Vec<ClaimSummary>> {
	let claims = sqlx::query_as::<_, ClaimSummary>(&format!(
		"{SUMMARY_SELECT} WHERE c.user_id = ? ORDER BY c.created_at DESC, c.claim_id DESC"
	))
	.bind(user_id)
	.fetch_all(conn)
	.await?;
	Ok(claims)
}

/// Claims other users filed on items `publisher_id` published, newest first
pub async fn incoming_for_publisher(
	conn: &mut SqliteConnection,
	publisher_id: &str,
) -> ClaimResult<Vec<ClaimSummary>> {
	let claims = sqlx::query_as::<_, ClaimSummary>(&format!(
		"{SUMMARY_SELECT} WHERE i.user_id = ? AND c.user_id != i.user_id
		 ORDER BY c.created_at DESC, c.claim_id DESC"
	))
	.bind(publisher_id)
	.fetch_all(conn)
	.await?;
	Ok(claims)
}

pub async fn all(conn: &mut SqliteConnection) -> ClaimResult<Vec<ClaimSummary>> {
	let claims = sqlx::query_as::<_, ClaimSummary>(&format!(
		"{SUMMARY_SELECT} ORDER BY c.created_at DESC, c.claim_id DESC"
	))
	.fetch_all(conn)
	.await?;
	Ok(claims)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::ItemKind;
	use crate::testing::{TestDb, create_item, create_user, test_db};
	use rstest::rstest;

	async fn seeded() -> (TestDb, i64) {
		let db = test_db().await;
		create_user(&db.pool, "pub", "Publisher").await;
		create_user(&db.pool, "s1", "Ann").await;
		let item = create_item(&db.pool, "pub", "Calculator", ItemKind::Found).await;
		(db, item.item_id)
	}

	#[rstest]
	#[tokio::test]
	async fn test_submit_creates_pending_claim() {
		let (db, item_id) = seeded().await;
		let mut conn = db.pool.acquire().await.unwrap();

		let submitted = submit(&mut conn, "s1", item_id, "Mine, has my name", Utc::now())
			.await
			.unwrap();

		assert_eq!(submitted.claim.audit_status, AuditStatus::Pending);
		assert_eq!(submitted.claim.claimant_id, "s1");
		assert_eq!(submitted.publisher_id, "pub");
		assert_eq!(submitted.item_title, "Calculator");
	}

	#[rstest]
	#[tokio::test]
	async fn test_submit_rejects_missing_item() {
		let (db, _) = seeded().await;
		let mut conn = db.pool.acquire().await.unwrap();

		let error = submit(&mut conn, "s1", 999, "x", Utc::now()).await.unwrap_err();

		assert!(matches!(
			error,
			ClaimError::NotFound {
				kind: EntityKind::Item,
				..
			}
		));
	}

	#[rstest]
	#[tokio::test]
	async fn test_submit_rejects_self_claim() {
		let (db, item_id) = seeded().await;
		let mut conn = db.pool.acquire().await.unwrap();

		let error = submit(&mut conn, "pub", item_id, "x", Utc::now()).await.unwrap_err();

		assert!(matches!(error, ClaimError::SelfClaim { item_id: id } if id == item_id));
	}

	#[rstest]
	#[tokio::test]
	async fn test_submit_rejects_active_duplicate() {
		let (db, item_id) = seeded().await;
		let mut conn = db.pool.acquire().await.unwrap();
		submit(&mut conn, "s1", item_id, "first", Utc::now()).await.unwrap();

		let error = submit(&mut conn, "s1", item_id, "second", Utc::now())
			.await
			.unwrap_err();

		assert!(matches!(error, ClaimError::DuplicateClaim { .. }));
	}

	#[rstest]
	#[tokio::test]
	async fn test_rejected_claim_does_not_block_new_claim() {
		let (db, item_id) = seeded().await;
		let mut conn = db.pool.acquire().await.unwrap();
		let first = submit(&mut conn, "s1", item_id, "first", Utc::now()).await.unwrap();
		set_audit_status(&mut conn, first.claim.claim_id, AuditDecision::Reject)
			.await
			.unwrap();

		let second = submit(&mut conn, "s1", item_id, "second", Utc::now()).await.unwrap();

		assert_ne!(second.claim.claim_id, first.claim.claim_id);
	}

	#[rstest]
	#[tokio::test]
	async fn test_approved_claim_blocks_new_claim() {
		let (db, item_id) = seeded().await;
		let mut conn = db.pool.acquire().await.unwrap();
		let first = submit(&mut conn, "s1", item_id, "first", Utc::now()).await.unwrap();
		set_audit_status(&mut conn, first.claim.claim_id, AuditDecision::Approve)
			.await
			.unwrap();

		let error = submit(&mut conn, "s1", item_id, "again", Utc::now())
			.await
			.unwrap_err();

		assert!(matches!(error, ClaimError::DuplicateClaim { .. }));
	}

	#[rstest]
	#[tokio::test]
	async fn test_unique_index_backs_duplicate_check() {
		let (db, item_id) = seeded().await;
		let mut conn = db.pool.acquire().await.unwrap();
		submit(&mut conn, "s1", item_id, "first", Utc::now()).await.unwrap();

		let result = sqlx::query(
			"INSERT INTO claim (item_id, user_id, reason, audit_status, created_at) VALUES (?, 's1', 'raw', 1, ?)",
		)
		.bind(item_id)
		.bind(Utc::now())
		.execute(&mut *conn)
		.await;

		assert!(is_unique_violation(&result.unwrap_err()));
	}

	#[rstest]
	#[case(AuditDecision::Approve, AuditStatus::Approved)]
	#[case(AuditDecision::Reject, AuditStatus::Rejected)]
	#[tokio::test]
	async fn test_audit_moves_pending_claim(
		#[case] decision: AuditDecision,
		#[case] expected: AuditStatus,
	) {
		let (db, item_id) = seeded().await;
		let mut conn = db.pool.acquire().await.unwrap();
		let submitted = submit(&mut conn, "s1", item_id, "x", Utc::now()).await.unwrap();

		let audited = set_audit_status(&mut conn, submitted.claim.claim_id, decision)
			.await
			.unwrap();

		assert!(audited.changed);
		assert_eq!(audited.claim.audit_status, expected);
		assert_eq!(audited.claimant_id, "s1");
		assert_eq!(audited.item_title, "Calculator");
	}

	#[rstest]
	#[tokio::test]
	async fn test_repeated_decision_is_noop() {
		let (db, item_id) = seeded().await;
		let mut conn = db.pool.acquire().await.unwrap();
		let submitted = submit(&mut conn, "s1", item_id, "x", Utc::now()).await.unwrap();
		let claim_id = submitted.claim.claim_id;
		set_audit_status(&mut conn, claim_id, AuditDecision::Approve)
			.await
			.unwrap();

		let again = set_audit_status(&mut conn, claim_id, AuditDecision::Approve)
			.await
			.unwrap();

		assert!(!again.changed);
		assert_eq!(again.claim.audit_status, AuditStatus::Approved);
	}

	#[rstest]
	#[tokio::test]
	async fn test_opposite_decision_is_rejected() {
		let (db, item_id) = seeded().await;
		let mut conn = db.pool.acquire().await.unwrap();
		let submitted = submit(&mut conn, "s1", item_id, "x", Utc::now()).await.unwrap();
		let claim_id = submitted.claim.claim_id;
		set_audit_status(&mut conn, claim_id, AuditDecision::Approve)
			.await
			.unwrap();

		let error = set_audit_status(&mut conn, claim_id, AuditDecision::Reject)
			.await
			.unwrap_err();

		assert!(matches!(
			error,
			ClaimError::InvalidTransition {
				from: AuditStatus::Approved,
				to: AuditStatus::Rejected,
				..
			}
		));
		let stored = find(&mut conn, claim_id).await.unwrap().unwrap();
		assert_eq!(stored.audit_status, AuditStatus::Approved);
	}

	#[rstest]
	#[tokio::test]
	async fn test_audit_missing_claim() {
		let (db, _) = seeded().await;
		let mut conn = db.pool.acquire().await.unwrap();

		let error = set_audit_status(&mut conn, 77, AuditDecision::Approve)
			.await
			.unwrap_err();

		assert!(matches!(
			error,
			ClaimError::NotFound {
				kind: EntityKind::Claim,
				..
			}
		));
	}

	#[rstest]
	#[tokio::test]
	async fn test_listings_split_by_role() {
		let (db, item_id) = seeded().await;
		create_user(&db.pool, "s2", "Bo").await;
		let mut conn = db.pool.acquire().await.unwrap();
		submit(&mut conn, "s1", item_id, "a", Utc::now()).await.unwrap();
		submit(&mut conn, "s2", item_id, "b", Utc::now()).await.unwrap();

		let mine = by_claimant(&mut conn, "s1").await.unwrap();
		let incoming = incoming_for_publisher(&mut conn, "pub").await.unwrap();
		let everything = all(&mut conn).await.unwrap();

		assert_eq!(mine.len(), 1);
		assert_eq!(mine[0].title, "Calculator");
		assert_eq!(incoming.len(), 2);
		assert_eq!(incoming[0].claimant_name, "Bo");
		assert!(incoming_for_publisher(&mut conn, "s1").await.unwrap().is_empty());
		assert_eq!(everything.len(), 2);
	}
}
