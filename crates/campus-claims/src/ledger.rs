//! Credit ledger
//!
//! A user is frozen at instant `t` iff some credit record for that user has
//! `freeze_until > t`. There is no stored flag; every check derives the answer
//! from the ledger inside the caller's transaction.

use crate::error::ClaimResult;
use crate::models::{AuditStatus, CreditProfile, CreditRecord};
use chrono::{DateTime, TimeDelta, Utc};
use sqlx::SqliteConnection;

/// Length of a freeze applied directly by an administrator
pub const MANUAL_FREEZE_DAYS: i64 = 7;

/// Length of a freeze applied when a complaint is confirmed as a violation
pub const COMPLAINT_FREEZE_DAYS: i64 = 15;

pub const MANUAL_FREEZE_REASON: &str = "manual freeze by administrator";

const COMPLAINT_REASON_PREFIX: &str = "complaint-confirmed: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreezePolicy {
	Manual,
	ConfirmedComplaint,
}

impl FreezePolicy {
	pub fn duration(self) -> TimeDelta {
		match self {
			FreezePolicy::Manual => TimeDelta::days(MANUAL_FREEZE_DAYS),
			FreezePolicy::ConfirmedComplaint => TimeDelta::days(COMPLAINT_FREEZE_DAYS),
		}
	}
}

/// Reason stored on the record a confirmed complaint creates
pub fn complaint_reason(result: &str) -> String {
	format!("{COMPLAINT_REASON_PREFIX}{result}")
}

pub async fn is_frozen(
	conn: &mut SqliteConnection,
	user_id: &str,
	as_of: DateTime<Utc>,
) -> ClaimResult<bool> {
	let active: i64 = sqlx::query_scalar(
		"SELECT COUNT(*) FROM credit_record WHERE user_id = ? AND freeze_until > ?",
	)
	.bind(user_id)
	.bind(as_of)
	.fetch_one(conn)
	.await?;
	Ok(active > 0)
}

/// Latest expiry among the user's active records, if any
pub async fn frozen_until(
	conn: &mut SqliteConnection,
	user_id: &str,
	as_of: DateTime<Utc>,
) -> ClaimResult<Option<DateTime<Utc>>> {
	let until: Option<DateTime<Utc>> = sqlx::query_scalar(
		"SELECT freeze_until FROM credit_record
		 WHERE user_id = ? AND freeze_until > ?
		 ORDER BY freeze_until DESC LIMIT 1",
	)
	.bind(user_id)
	.bind(as_of)
	.fetch_optional(conn)
	.await?;
	Ok(until)
}

/// Append a freeze of `duration` starting at `now`
pub async fn freeze(
	conn: &mut SqliteConnection,
	user_id: &str,
	reason: &str,
	duration: TimeDelta,
	now: DateTime<Utc>,
) -> ClaimResult<CreditRecord> {
	let record = sqlx::query_as::<_, CreditRecord>(
		"INSERT INTO credit_record (user_id, violation_type, freeze_until)
		 VALUES (?, ?, ?)
		 RETURNING record_id, user_id, violation_type, freeze_until",
	)
	.bind(user_id)
	.bind(reason)
	.bind(now + duration)
	.fetch_one(conn)
	.await?;

	tracing::info!(
		user_id = %user_id,
		record_id = record.record_id,
		freeze_until = %record.freeze_until,
		"Credit freeze recorded"
	);
	Ok(record)
}

/// End every active freeze of the user at `as_of`
///
/// Returns the number of records cut short. Expired records are untouched,
/// so the history keeps their recorded expiry.
pub async fn unfreeze(
	conn: &mut SqliteConnection,
	user_id: &str,
	as_of: DateTime<Utc>,
) -> ClaimResult<u64> {
	let result = sqlx::query(
		"UPDATE credit_record SET freeze_until = ? WHERE user_id = ? AND freeze_until > ?",
	)
	.bind(as_of)
	.bind(user_id)
	.bind(as_of)
	.execute(conn)
	.await?;

	tracing::info!(
		user_id = %user_id,
		records = result.rows_affected(),
		"Active freezes lifted"
	);
	Ok(result.rows_affected())
}

/// Delete records that expired at least `retention` before `as_of`
///
/// Only expired records qualify, so sweeping never changes whether anyone is
/// frozen. A retention reaching past the earliest representable instant
/// deletes nothing.
pub async fn sweep_expired(
	conn: &mut SqliteConnection,
	as_of: DateTime<Utc>,
	retention: TimeDelta,
) -> ClaimResult<u64> {
	let Some(cutoff) = as_of.checked_sub_signed(retention.max(TimeDelta::zero())) else {
		return Ok(0);
	};
	let result = sqlx::query("DELETE FROM credit_record WHERE freeze_until <= ?")
		.bind(cutoff)
		.execute(conn)
		.await?;
	Ok(result.rows_affected())
}

/// Every record of one user, newest expiry first
pub async fn history(conn: &mut SqliteConnection, user_id: &str) -> ClaimResult<Vec<CreditRecord>> {
	let records = sqlx::query_as::<_, CreditRecord>(
		"SELECT record_id, user_id, violation_type, freeze_until FROM credit_record
		 WHERE user_id = ? ORDER BY freeze_until DESC, record_id DESC",
	)
	.bind(user_id)
	.fetch_all(conn)
	.await?;
	Ok(records)
}

pub async fn all_records(conn: &mut SqliteConnection) -> ClaimResult<Vec<CreditRecord>> {
	let records = sqlx::query_as::<_, CreditRecord>(
		"SELECT record_id, user_id, violation_type, freeze_until FROM credit_record
		 ORDER BY freeze_until DESC, record_id DESC",
	)
	.fetch_all(conn)
	.await?;
	Ok(records)
}

/// Per-user counts of rejected claims and complaints against them
pub async fn credit_profiles(
	conn: &mut SqliteConnection,
	as_of: DateTime<Utc>,
) -> ClaimResult<Vec<CreditProfile>> {
	let profiles = sqlx::query_as::<_, CreditProfile>(
		"SELECT u.user_id, u.user_name,
		        (SELECT COUNT(*) FROM claim c
		          WHERE c.user_id = u.user_id AND c.audit_status = ?) AS rejected_claims,
		        (SELECT COUNT(*) FROM complaint p JOIN claim c ON c.claim_id = p.claim_id
		          WHERE c.user_id = u.user_id) AS complaint_count,
		        (SELECT COUNT(*) FROM credit_record r
		          WHERE r.user_id = u.user_id AND r.freeze_until > ?) > 0 AS is_frozen
		 FROM app_user u
		 ORDER BY u.user_id",
	)
	.bind(AuditStatus::Rejected)
	.bind(as_of)
	.fetch_all(conn)
	.await?;
	Ok(profiles)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::{AuditDecision, ItemKind};
	use crate::registry;
	use crate::testing::{TestDb, create_item, create_user, test_db};
	use rstest::rstest;

	fn at(rfc3339: &str) -> DateTime<Utc> {
		DateTime::parse_from_rfc3339(rfc3339)
			.unwrap()
			.with_timezone(&Utc)
	}

	#[rstest]
	#[case(FreezePolicy::Manual, 7)]
	#[case(FreezePolicy::ConfirmedComplaint, 15)]
	fn test_policy_durations(#[case] policy: FreezePolicy, #[case] days: i64) {
		assert_eq!(policy.duration(), TimeDelta::days(days));
	}

	#[rstest]
	#[tokio::test]
	async fn test_freeze_boundary_is_exclusive(#[future] test_db: TestDb) {
		let db = test_db.await;
		create_user(&db.pool, "s1", "Ann").await;
		let now = at("2031-03-01T12:00:00Z");
		let mut conn = db.pool.acquire().await.unwrap();

		let record = freeze(&mut conn, "s1", MANUAL_FREEZE_REASON, TimeDelta::days(7), now)
			.await
			.unwrap();

		assert_eq!(record.freeze_until, at("2031-03-08T12:00:00Z"));
		assert!(is_frozen(&mut conn, "s1", now).await.unwrap());
		assert!(
			is_frozen(&mut conn, "s1", at("2031-03-08T11:59:59Z"))
				.await
				.unwrap()
		);
		assert!(!is_frozen(&mut conn, "s1", record.freeze_until).await.unwrap());
	}

	#[rstest]
	#[tokio::test]
	async fn test_frozen_until_takes_latest_record(#[future] test_db: TestDb) {
		let db = test_db.await;
		create_user(&db.pool, "s1", "Ann").await;
		let now = at("2031-03-01T00:00:00Z");
		let mut conn = db.pool.acquire().await.unwrap();

		freeze(&mut conn, "s1", "a", TimeDelta::days(15), now).await.unwrap();
		freeze(&mut conn, "s1", "b", TimeDelta::days(7), now).await.unwrap();

		let until = frozen_until(&mut conn, "s1", now).await.unwrap();
		assert_eq!(until, Some(at("2031-03-16T00:00:00Z")));
		assert_eq!(
			frozen_until(&mut conn, "s1", at("2031-04-01T00:00:00Z"))
				.await
				.unwrap(),
			None
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_unfreeze_only_touches_active_records(#[future] test_db: TestDb) {
		let db = test_db.await;
		create_user(&db.pool, "s1", "Ann").await;
		let mut conn = db.pool.acquire().await.unwrap();

		let old = freeze(
			&mut conn,
			"s1",
			"old",
			TimeDelta::days(1),
			at("2031-01-01T00:00:00Z"),
		)
		.await
		.unwrap();
		let now = at("2031-03-01T00:00:00Z");
		freeze(&mut conn, "s1", "new", TimeDelta::days(7), now).await.unwrap();

		let lifted = unfreeze(&mut conn, "s1", now).await.unwrap();

		assert_eq!(lifted, 1);
		assert!(!is_frozen(&mut conn, "s1", now).await.unwrap());
		let history = history(&mut conn, "s1").await.unwrap();
		assert_eq!(history.len(), 2);
		assert_eq!(history[0].freeze_until, now);
		assert_eq!(history[1].freeze_until, old.freeze_until);
	}

	#[rstest]
	#[tokio::test]
	async fn test_unfreeze_without_active_records_is_noop(#[future] test_db: TestDb) {
		let db = test_db.await;
		create_user(&db.pool, "s1", "Ann").await;
		let mut conn = db.pool.acquire().await.unwrap();

		let lifted = unfreeze(&mut conn, "s1", Utc::now()).await.unwrap();

		assert_eq!(lifted, 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_sweep_keeps_active_and_recent_records(#[future] test_db: TestDb) {
		let db = test_db.await;
		create_user(&db.pool, "s1", "Ann").await;
		create_user(&db.pool, "s2", "Bo").await;
		let mut conn = db.pool.acquire().await.unwrap();
		let now = at("2031-06-01T00:00:00Z");

		// Expired two months ago
		freeze(&mut conn, "s1", "stale", TimeDelta::days(1), at("2031-03-30T00:00:00Z"))
			.await
			.unwrap();
		// Expired last week
		freeze(&mut conn, "s1", "recent", TimeDelta::days(1), at("2031-05-24T00:00:00Z"))
			.await
			.unwrap();
		// Still active
		freeze(&mut conn, "s2", "active", TimeDelta::days(15), now)
			.await
			.unwrap();

		let removed = sweep_expired(&mut conn, now, TimeDelta::days(30)).await.unwrap();

		assert_eq!(removed, 1);
		let remaining = all_records(&mut conn).await.unwrap();
		let reasons: Vec<&str> = remaining.iter().map(|r| r.reason.as_str()).collect();
		assert_eq!(reasons, vec!["active", "recent"]);
		assert!(is_frozen(&mut conn, "s2", now).await.unwrap());
	}

	#[rstest]
	#[tokio::test]
	async fn test_sweep_with_zero_retention_removes_all_expired(#[future] test_db: TestDb) {
		let db = test_db.await;
		create_user(&db.pool, "s1", "Ann").await;
		let mut conn = db.pool.acquire().await.unwrap();
		let now = at("2031-06-01T00:00:00Z");
		freeze(&mut conn, "s1", "done", TimeDelta::days(1), at("2031-05-30T00:00:00Z"))
			.await
			.unwrap();
		freeze(&mut conn, "s1", "live", TimeDelta::days(1), now).await.unwrap();

		let removed = sweep_expired(&mut conn, now, TimeDelta::zero()).await.unwrap();

		assert_eq!(removed, 1);
		assert!(is_frozen(&mut conn, "s1", now).await.unwrap());
	}

	#[rstest]
	#[tokio::test]
	async fn test_sweep_with_retention_before_calendar_start_removes_nothing(
		#[future] test_db: TestDb,
	) {
		let db = test_db.await;
		create_user(&db.pool, "s1", "Ann").await;
		let mut conn = db.pool.acquire().await.unwrap();
		let now = at("2031-06-01T00:00:00Z");
		freeze(&mut conn, "s1", "ancient", TimeDelta::days(1), at("2001-01-01T00:00:00Z"))
			.await
			.unwrap();

		let removed = sweep_expired(&mut conn, now, TimeDelta::days(100_000_000))
			.await
			.unwrap();

		assert_eq!(removed, 0);
		assert_eq!(all_records(&mut conn).await.unwrap().len(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_credit_profiles_report_frozen_flag(#[future] test_db: TestDb) {
		let db = test_db.await;
		create_user(&db.pool, "s1", "Ann").await;
		create_user(&db.pool, "s2", "Bo").await;
		let now = at("2031-06-01T00:00:00Z");
		let mut conn = db.pool.acquire().await.unwrap();
		freeze(&mut conn, "s2", MANUAL_FREEZE_REASON, TimeDelta::days(7), now)
			.await
			.unwrap();

		let profiles = credit_profiles(&mut conn, now).await.unwrap();

		assert_eq!(profiles.len(), 2);
		assert_eq!(profiles[0].user_id, "s1");
		assert!(!profiles[0].is_frozen);
		assert!(profiles[1].is_frozen);
		assert_eq!(profiles[1].rejected_claims, 0);
		assert_eq!(profiles[1].complaint_count, 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_credit_profiles_count_only_rejected_claims(#[future] test_db: TestDb) {
		let db = test_db.await;
		create_user(&db.pool, "s1", "Ann").await;
		create_user(&db.pool, "s2", "Bo").await;
		let first = create_item(&db.pool, "s2", "Umbrella", ItemKind::Found).await;
		let second = create_item(&db.pool, "s2", "Scarf", ItemKind::Found).await;
		let mut conn = db.pool.acquire().await.unwrap();
		let now = at("2031-06-01T00:00:00Z");
		let rejected = registry::submit(&mut conn, "s1", first.item_id, "mine", now)
			.await
			.unwrap();
		registry::set_audit_status(&mut conn, rejected.claim.claim_id, AuditDecision::Reject)
			.await
			.unwrap();
		registry::submit(&mut conn, "s1", first.item_id, "mine, really", now)
			.await
			.unwrap();
		let approved = registry::submit(&mut conn, "s1", second.item_id, "mine", now)
			.await
			.unwrap();
		registry::set_audit_status(&mut conn, approved.claim.claim_id, AuditDecision::Approve)
			.await
			.unwrap();

		let profiles = credit_profiles(&mut conn, now).await.unwrap();

		assert_eq!(profiles[0].user_id, "s1");
		assert_eq!(profiles[0].rejected_claims, 1);
		assert_eq!(profiles[1].rejected_claims, 0);
	}
}
