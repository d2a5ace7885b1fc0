//! Persisted records and the values operations return
//!
//! Status columns are stored as integers; the enums below carry the
//! discriminants the schema's `CHECK` constraints allow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Audit state of a claim
///
/// `Pending` moves to exactly one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
	Pending = 0,
	Approved = 1,
	Rejected = 2,
}

impl fmt::Display for AuditStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			AuditStatus::Pending => "pending",
			AuditStatus::Approved => "approved",
			AuditStatus::Rejected => "rejected",
		})
	}
}

/// An administrator's verdict on a pending claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditDecision {
	Approve,
	Reject,
}

impl AuditDecision {
	pub fn target_status(self) -> AuditStatus {
		match self {
			AuditDecision::Approve => AuditStatus::Approved,
			AuditDecision::Reject => AuditStatus::Rejected,
		}
	}
}

/// Whether a posting reports a found or a lost item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
	Found = 0,
	Lost = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
	Open = 0,
	Resolved = 1,
}

/// Administrator's ruling on a complaint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintAction {
	/// The complaint is upheld and the accused is frozen
	Violation,
	/// The complaint is rejected; no ledger effect
	Dismiss,
}

/// Catalog view of an item, enough to route notifications and detect self-claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ItemRef {
	pub item_id: i64,
	pub title: String,
	#[sqlx(rename = "user_id")]
	pub publisher_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
	pub item_id: i64,
	pub title: String,
	pub description: String,
	pub location: String,
	#[sqlx(rename = "cat_id")]
	pub category_id: Option<i64>,
	#[sqlx(rename = "user_id")]
	pub publisher_id: String,
	#[sqlx(rename = "item_type")]
	pub kind: ItemKind,
	pub pub_time: DateTime<Utc>,
}

/// Fields a user supplies when posting an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
	pub title: String,
	pub description: String,
	pub location: String,
	pub category_id: Option<i64>,
	pub kind: ItemKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Claim {
	pub claim_id: i64,
	pub item_id: i64,
	#[sqlx(rename = "user_id")]
	pub claimant_id: String,
	pub reason: String,
	pub audit_status: AuditStatus,
	pub created_at: DateTime<Utc>,
}

/// A claim joined with its item title and claimant name, for listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClaimSummary {
	pub claim_id: i64,
	pub item_id: i64,
	pub title: String,
	#[sqlx(rename = "user_id")]
	pub claimant_id: String,
	pub claimant_name: String,
	pub reason: String,
	pub audit_status: AuditStatus,
	pub created_at: DateTime<Utc>,
}

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedClaim {
	pub claim: Claim,
	pub publisher_id: String,
	pub item_title: String,
}

/// Result of an audit
///
/// `changed` is false when the claim already carried the requested decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditedClaim {
	pub claim: Claim,
	pub claimant_id: String,
	pub item_title: String,
	pub changed: bool,
}

/// One freeze period in the credit ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CreditRecord {
	pub record_id: i64,
	pub user_id: String,
	#[sqlx(rename = "violation_type")]
	pub reason: String,
	pub freeze_until: DateTime<Utc>,
}

/// Credit picture of one user for the administration view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CreditProfile {
	pub user_id: String,
	pub user_name: String,
	pub rejected_claims: i64,
	pub complaint_count: i64,
	pub is_frozen: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Complaint {
	pub comp_id: i64,
	pub reason: String,
	#[sqlx(rename = "complaint_type")]
	pub kind: String,
	pub claim_id: i64,
	pub status: ComplaintStatus,
	pub result: Option<String>,
	pub admin_id: Option<String>,
	pub resolved_at: Option<DateTime<Utc>>,
}

/// Outcome of adjudicating a complaint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
	pub complaint: Complaint,
	/// The user who filed the claim the complaint targets
	pub accused_id: String,
	pub action: ComplaintAction,
	/// Freeze created by a confirmed violation
	pub credit_record: Option<CreditRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
	pub msg_id: i64,
	#[sqlx(rename = "user_id")]
	pub recipient_id: String,
	pub content: String,
	pub send_time: DateTime<Utc>,
	pub is_read: bool,
}
