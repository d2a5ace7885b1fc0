//! Complaint desk
//!
//! Complaints target a claim. Resolving one is a single irreversible step:
//! the status flip, any ledger entry and the notice to the accused are all
//! written through the caller's transaction.

use crate::error::{ClaimError, ClaimResult, EntityKind};
use crate::ledger::{self, FreezePolicy};
use crate::models::{Complaint, ComplaintAction, ComplaintStatus, Resolution};
use crate::notifications::{self, MessageTemplate};
use crate::registry;
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

const COMPLAINT_COLUMNS: &str =
	"comp_id, reason, complaint_type, claim_id, status, result, admin_id, resolved_at";

/// Open a complaint against `claim_id`
pub async fn file(
	conn: &mut SqliteConnection,
	claim_id: i64,
	reason: &str,
	kind: &str,
) -> ClaimResult<Complaint> {
	if registry::find(&mut *conn, claim_id).await?.is_none() {
		return Err(ClaimError::not_found(EntityKind::Claim, claim_id));
	}

	let complaint = sqlx::query_as::<_, Complaint>(&format!(
		"INSERT INTO complaint (reason, complaint_type, claim_id, status)
		 VALUES (?, ?, ?, ?)
		 RETURNING {COMPLAINT_COLUMNS}"
	))
	.bind(reason)
	.bind(kind)
	.bind(claim_id)
	.bind(ComplaintStatus::Open)
	.fetch_one(conn)
	.await?;
	Ok(complaint)
}

/// Complaints awaiting a ruling, oldest first
pub async fn open_complaints(conn: &mut SqliteConnection) -> ClaimResult<Vec<Complaint>> {
	let complaints = sqlx::query_as::<_, Complaint>(&format!(
		"SELECT {COMPLAINT_COLUMNS} FROM complaint WHERE status = ? ORDER BY comp_id"
	))
	.bind(ComplaintStatus::Open)
	.fetch_all(conn)
	.await?;
	Ok(complaints)
}

/// Rule on an open complaint
///
/// A [`ComplaintAction::Violation`] freezes the claimant of the targeted claim
/// for [`ledger::COMPLAINT_FREEZE_DAYS`] days from `now`. Either way the
/// accused receives exactly one notice.
///
/// # Errors
///
/// - [`ClaimError::NotFound`] when the complaint does not exist
/// - [`ClaimError::AlreadyResolved`] when it has been ruled on before
pub async fn resolve(
	conn: &mut SqliteConnection,
	comp_id: i64,
	action: ComplaintAction,
	result: &str,
	admin_id: &str,
	now: DateTime<Utc>,
) -> ClaimResult<Resolution> {
	let accused_id: String = sqlx::query_scalar(
		"SELECT c.user_id FROM complaint p JOIN claim c ON c.claim_id = p.claim_id WHERE p.comp_id = ?",
	)
	.bind(comp_id)
	.fetch_optional(&mut *conn)
	.await?
	.ok_or_else(|| ClaimError::not_found(EntityKind::Complaint, comp_id))?;

	let complaint = sqlx::query_as::<_, Complaint>(&format!(
		"UPDATE complaint SET status = ?, result = ?, admin_id = ?, resolved_at = ?
		 WHERE comp_id = ? AND status = ?
		 RETURNING {COMPLAINT_COLUMNS}"
	))
	.bind(ComplaintStatus::Resolved)
	.bind(result)
	.bind(admin_id)
	.bind(now)
	.bind(comp_id)
	.bind(ComplaintStatus::Open)
	.fetch_optional(&mut *conn)
	.await?
	.ok_or(ClaimError::AlreadyResolved { comp_id })?;

	let (credit_record, notice) = match action {
		ComplaintAction::Violation => {
			let policy = FreezePolicy::ConfirmedComplaint;
			let record = ledger::freeze(
				&mut *conn,
				&accused_id,
				&ledger::complaint_reason(result),
				policy.duration(),
				now,
			)
			.await?;
			let notice = MessageTemplate::ViolationConfirmed {
				result: result.to_string(),
			};
			(Some(record), notice)
		}
		ComplaintAction::Dismiss => (
			None,
			MessageTemplate::ComplaintDismissed {
				result: result.to_string(),
			},
		),
	};

	notifications::enqueue(&mut *conn, &accused_id, &notice, now).await?;

	Ok(Resolution {
		complaint,
		accused_id,
		action,
		credit_record,
	})
}
