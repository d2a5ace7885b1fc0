//! Error types for claim lifecycle operations

use crate::models::AuditStatus;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Entity named by a [`ClaimError::NotFound`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
	User,
	Item,
	Claim,
	Complaint,
}

impl fmt::Display for EntityKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			EntityKind::User => "user",
			EntityKind::Item => "item",
			EntityKind::Claim => "claim",
			EntityKind::Complaint => "complaint",
		})
	}
}

/// Errors raised by the claim lifecycle
///
/// Every variant except [`ClaimError::Database`] is a rejection the boundary
/// layer reports back to the caller; the transaction it happened in has been
/// rolled back.
#[derive(Debug, Error)]
pub enum ClaimError {
	#[error("User {user_id} is frozen until {until}")]
	Frozen {
		user_id: String,
		until: DateTime<Utc>,
	},

	#[error("User {user_id} already holds an active claim on item {item_id}")]
	DuplicateClaim { user_id: String, item_id: i64 },

	#[error("Item {item_id} cannot be claimed by its own publisher")]
	SelfClaim { item_id: i64 },

	#[error("No {kind} with id {id}")]
	NotFound { kind: EntityKind, id: String },

	#[error("Complaint {comp_id} has already been resolved")]
	AlreadyResolved { comp_id: i64 },

	#[error("Claim {claim_id} is already {from}; cannot change it to {to}")]
	InvalidTransition {
		claim_id: i64,
		from: AuditStatus,
		to: AuditStatus,
	},

	#[error("Only administrators may {action}")]
	Forbidden { action: &'static str },

	#[error("Database error: {0}")]
	Database(#[from] sqlx::Error),
}

impl ClaimError {
	pub(crate) fn not_found(kind: EntityKind, id: impl ToString) -> Self {
		ClaimError::NotFound {
			kind,
			id: id.to_string(),
		}
	}

	/// HTTP-style status code for boundary layers
	pub fn status_code(&self) -> u16 {
		match self {
			ClaimError::Frozen { .. } | ClaimError::Forbidden { .. } => 403,
			ClaimError::NotFound { .. } => 404,
			ClaimError::DuplicateClaim { .. }
			| ClaimError::AlreadyResolved { .. }
			| ClaimError::InvalidTransition { .. } => 409,
			ClaimError::SelfClaim { .. } => 422,
			ClaimError::Database(_) => 500,
		}
	}

	/// Whether the caller can act on this rejection, as opposed to an internal failure
	pub fn is_user_error(&self) -> bool {
		!matches!(self, ClaimError::Database(_))
	}
}

pub type ClaimResult<T> = Result<T, ClaimError>;

/// Whether a driver error is a violation of a `UNIQUE` constraint or index
pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
	match error {
		sqlx::Error::Database(db_error) => db_error.is_unique_violation(),
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_frozen_message_includes_expiry() {
		let until = DateTime::parse_from_rfc3339("2030-01-16T00:00:00Z")
			.unwrap()
			.with_timezone(&Utc);
		let error = ClaimError::Frozen {
			user_id: "s1001".to_string(),
			until,
		};
		assert_eq!(
			error.to_string(),
			"User s1001 is frozen until 2030-01-16 00:00:00 UTC"
		);
	}

	#[rstest]
	#[case(ClaimError::DuplicateClaim { user_id: "a".into(), item_id: 1 }, 409)]
	#[case(ClaimError::SelfClaim { item_id: 1 }, 422)]
	#[case(ClaimError::not_found(EntityKind::Claim, 7), 404)]
	#[case(ClaimError::AlreadyResolved { comp_id: 3 }, 409)]
	#[case(ClaimError::Forbidden { action: "audit claims" }, 403)]
	#[case(ClaimError::Database(sqlx::Error::RowNotFound), 500)]
	fn test_status_codes(#[case] error: ClaimError, #[case] expected: u16) {
		assert_eq!(error.status_code(), expected);
	}

	#[rstest]
	fn test_database_errors_are_internal() {
		assert!(!ClaimError::Database(sqlx::Error::PoolTimedOut).is_user_error());
		assert!(ClaimError::SelfClaim { item_id: 1 }.is_user_error());
	}

	#[rstest]
	fn test_not_found_display() {
		assert_eq!(
			ClaimError::not_found(EntityKind::Complaint, 12).to_string(),
			"No complaint with id 12"
		);
	}
}
