//! Claim lifecycle orchestration
//!
//! [`ClaimService`] is the entry point request handlers call. Each
//! state-changing operation opens one write transaction, runs the ledger,
//! registry and notification steps through it and commits once. Any error
//! drops the transaction, which rolls every step back.

use crate::context::RequestContext;
use crate::error::{ClaimError, ClaimResult, EntityKind};
use crate::ledger::{self, FreezePolicy, MANUAL_FREEZE_REASON};
use crate::models::{
	AuditDecision, AuditedClaim, ClaimSummary, Complaint, ComplaintAction, CreditProfile,
	CreditRecord, Item, Message, NewItem, Resolution, SubmittedClaim,
};
use crate::notifications::{self, MessageTemplate};
use crate::{catalog, complaints, directory, registry};
use campus_db::ConnectionPool;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;

/// What a user sees on their own dashboard
#[derive(Debug, Clone, Serialize)]
pub struct UserOverview {
	pub user_id: String,
	pub is_frozen: bool,
	pub frozen_until: Option<DateTime<Utc>>,
	pub my_claims: Vec<ClaimSummary>,
	pub incoming_claims: Vec<ClaimSummary>,
	/// Inbox as it was before this view marked it read
	pub messages: Vec<Message>,
}

/// Administration dashboard
#[derive(Debug, Clone, Serialize)]
pub struct AdminOverview {
	pub profiles: Vec<CreditProfile>,
	pub claims: Vec<ClaimSummary>,
	pub open_complaints: Vec<Complaint>,
	pub ledger: Vec<CreditRecord>,
}

#[derive(Debug, Clone)]
pub struct ClaimService {
	pool: ConnectionPool,
}

impl ClaimService {
	pub fn new(pool: ConnectionPool) -> Self {
		Self { pool }
	}

	pub fn pool(&self) -> &ConnectionPool {
		&self.pool
	}

	/// File a claim for the context's user
	///
	/// # Errors
	///
	/// [`ClaimError::Frozen`] if the user is frozen at `ctx.now()`, otherwise
	/// whatever [`registry::submit`] rejects with. No claim or message is
	/// written in either case.
	pub async fn submit_claim(
		&self,
		ctx: &RequestContext,
		item_id: i64,
		reason: &str,
	) -> ClaimResult<SubmittedClaim> {
		let user_id = ctx.user_id();
		let mut tx = self.pool.begin_write().await?;

		ensure_not_frozen(&mut tx, user_id, ctx.now()).await?;
		let submitted = registry::submit(&mut tx, user_id, item_id, reason, ctx.now())
			.await
			.inspect_err(|e| {
				tracing::debug!(user_id = %user_id, item_id, error = %e, "Claim rejected");
			})?;
		notifications::enqueue(
			&mut tx,
			&submitted.publisher_id,
			&MessageTemplate::ClaimReceived {
				title: submitted.item_title.clone(),
			},
			ctx.now(),
		)
		.await?;

		tx.commit().await?;
		tracing::info!(
			claim_id = submitted.claim.claim_id,
			item_id,
			user_id = %user_id,
			"Claim submitted"
		);
		Ok(submitted)
	}

	/// Post an item for the context's user, gated on the same freeze check as claims
	pub async fn publish_item(&self, ctx: &RequestContext, item: &NewItem) -> ClaimResult<Item> {
		let user_id = ctx.user_id();
		let mut tx = self.pool.begin_write().await?;

		ensure_not_frozen(&mut tx, user_id, ctx.now()).await?;
		let item = catalog::publish(&mut tx, user_id, item, ctx.now()).await?;

		tx.commit().await?;
		tracing::info!(item_id = item.item_id, user_id = %user_id, kind = ?item.kind, "Item published");
		Ok(item)
	}

	/// Approve or reject a pending claim and tell the claimant
	///
	/// Repeating a decision returns the claim unchanged and sends nothing.
	pub async fn audit_claim(
		&self,
		ctx: &RequestContext,
		claim_id: i64,
		decision: AuditDecision,
	) -> ClaimResult<AuditedClaim> {
		let admin = ctx.require_admin("audit claims")?;
		let mut tx = self.pool.begin_write().await?;

		let audited = registry::set_audit_status(&mut tx, claim_id, decision).await?;
		if audited.changed {
			let title = audited.item_title.clone();
			let notice = match decision {
				AuditDecision::Approve => MessageTemplate::ClaimApproved { title },
				AuditDecision::Reject => MessageTemplate::ClaimRejected { title },
			};
			notifications::enqueue(&mut tx, &audited.claimant_id, &notice, ctx.now()).await?;
		}

		tx.commit().await?;
		if audited.changed {
			tracing::info!(
				claim_id,
				admin_id = %admin.id,
				status = %audited.claim.audit_status,
				"Claim audited"
			);
		} else {
			tracing::debug!(claim_id, status = %audited.claim.audit_status, "Claim already audited");
		}
		Ok(audited)
	}

	/// Freeze a user for the manual-freeze period
	pub async fn freeze_user(&self, ctx: &RequestContext, user_id: &str) -> ClaimResult<CreditRecord> {
		let admin = ctx.require_admin("freeze users")?;
		let mut tx = self.pool.begin_write().await?;

		ensure_user(&mut tx, user_id).await?;
		let record = ledger::freeze(
			&mut tx,
			user_id,
			MANUAL_FREEZE_REASON,
			FreezePolicy::Manual.duration(),
			ctx.now(),
		)
		.await?;

		tx.commit().await?;
		tracing::info!(user_id = %user_id, admin_id = %admin.id, "User frozen");
		Ok(record)
	}

	/// Expire every active freeze of a user at `ctx.now()`
	///
	/// Returns how many records were cut short.
	pub async fn unfreeze_user(&self, ctx: &RequestContext, user_id: &str) -> ClaimResult<u64> {
		let admin = ctx.require_admin("unfreeze users")?;
		let mut tx = self.pool.begin_write().await?;

		ensure_user(&mut tx, user_id).await?;
		let lifted = ledger::unfreeze(&mut tx, user_id, ctx.now()).await?;

		tx.commit().await?;
		tracing::info!(user_id = %user_id, admin_id = %admin.id, records = lifted, "User unfrozen");
		Ok(lifted)
	}

	pub async fn file_complaint(
		&self,
		ctx: &RequestContext,
		claim_id: i64,
		reason: &str,
		kind: &str,
	) -> ClaimResult<Complaint> {
		let mut tx = self.pool.begin_write().await?;
		let complaint = complaints::file(&mut tx, claim_id, reason, kind).await?;
		tx.commit().await?;

		tracing::info!(
			comp_id = complaint.comp_id,
			claim_id,
			filed_by = %ctx.user_id(),
			"Complaint filed"
		);
		Ok(complaint)
	}

	pub async fn resolve_complaint(
		&self,
		ctx: &RequestContext,
		comp_id: i64,
		action: ComplaintAction,
		result: &str,
	) -> ClaimResult<Resolution> {
		let admin = ctx.require_admin("resolve complaints")?;
		let mut tx = self.pool.begin_write().await?;

		let resolution =
			complaints::resolve(&mut tx, comp_id, action, result, &admin.id, ctx.now()).await?;

		tx.commit().await?;
		tracing::info!(
			comp_id,
			accused_id = %resolution.accused_id,
			action = ?action,
			"Complaint resolved"
		);
		Ok(resolution)
	}

	pub async fn is_frozen(&self, user_id: &str, as_of: DateTime<Utc>) -> ClaimResult<bool> {
		let mut conn = self.pool.acquire().await?;
		ledger::is_frozen(&mut conn, user_id, as_of).await
	}

	pub async fn frozen_until(
		&self,
		user_id: &str,
		as_of: DateTime<Utc>,
	) -> ClaimResult<Option<DateTime<Utc>>> {
		let mut conn = self.pool.acquire().await?;
		ledger::frozen_until(&mut conn, user_id, as_of).await
	}

	/// Ledger records of a user; only the user themself or an administrator may look
	pub async fn credit_history(
		&self,
		ctx: &RequestContext,
		user_id: &str,
	) -> ClaimResult<Vec<CreditRecord>> {
		if ctx.user_id() != user_id {
			ctx.require_admin("view another user's credit history")?;
		}
		let mut conn = self.pool.acquire().await?;
		ledger::history(&mut conn, user_id).await
	}

	/// Return the caller's inbox and mark it read
	pub async fn view_inbox(&self, ctx: &RequestContext) -> ClaimResult<Vec<Message>> {
		let mut tx = self.pool.begin_write().await?;
		let messages = consume_inbox(&mut tx, ctx.user_id()).await?;
		tx.commit().await?;
		Ok(messages)
	}

	/// The caller's dashboard; consumes the inbox like [`ClaimService::view_inbox`]
	pub async fn user_overview(&self, ctx: &RequestContext) -> ClaimResult<UserOverview> {
		let user_id = ctx.user_id();
		let mut tx = self.pool.begin_write().await?;

		let frozen_until = ledger::frozen_until(&mut tx, user_id, ctx.now()).await?;
		let my_claims = registry::by_claimant(&mut tx, user_id).await?;
		let incoming_claims = registry::incoming_for_publisher(&mut tx, user_id).await?;
		let messages = consume_inbox(&mut tx, user_id).await?;

		tx.commit().await?;
		Ok(UserOverview {
			user_id: user_id.to_string(),
			is_frozen: frozen_until.is_some(),
			frozen_until,
			my_claims,
			incoming_claims,
			messages,
		})
	}

	pub async fn admin_overview(&self, ctx: &RequestContext) -> ClaimResult<AdminOverview> {
		ctx.require_admin("view the administration overview")?;
		let mut tx = self.pool.begin().await?;

		let overview = AdminOverview {
			profiles: ledger::credit_profiles(&mut tx, ctx.now()).await?,
			claims: registry::all(&mut tx).await?,
			open_complaints: complaints::open_complaints(&mut tx).await?,
			ledger: ledger::all_records(&mut tx).await?,
		};

		tx.commit().await?;
		Ok(overview)
	}

	/// Delete ledger records that expired more than `retention` before `ctx.now()`
	pub async fn sweep_expired(&self, ctx: &RequestContext, retention: TimeDelta) -> ClaimResult<u64> {
		ctx.require_admin("sweep the credit ledger")?;
		self.sweep_at(ctx.now(), retention).await
	}

	/// Sweep without a principal, for the background sweeper
	pub(crate) async fn sweep_at(&self, as_of: DateTime<Utc>, retention: TimeDelta) -> ClaimResult<u64> {
		let mut tx = self.pool.begin_write().await?;
		let removed = ledger::sweep_expired(&mut tx, as_of, retention).await?;
		tx.commit().await?;

		tracing::info!(removed, as_of = %as_of, "Credit ledger swept");
		Ok(removed)
	}
}

async fn ensure_not_frozen(
	conn: &mut SqliteConnection,
	user_id: &str,
	now: DateTime<Utc>,
) -> ClaimResult<()> {
	match ledger::frozen_until(conn, user_id, now).await? {
		Some(until) => {
			tracing::warn!(user_id = %user_id, until = %until, "Frozen user blocked");
			Err(ClaimError::Frozen {
				user_id: user_id.to_string(),
				until,
			})
		}
		None => Ok(()),
	}
}

async fn ensure_user(conn: &mut SqliteConnection, user_id: &str) -> ClaimResult<()> {
	if directory::exists(conn, user_id).await? {
		Ok(())
	} else {
		Err(ClaimError::not_found(EntityKind::User, user_id))
	}
}

async fn consume_inbox(conn: &mut SqliteConnection, user_id: &str) -> ClaimResult<Vec<Message>> {
	let messages = notifications::inbox(&mut *conn, user_id).await?;
	notifications::mark_all_read(conn, user_id).await?;
	Ok(messages)
}
