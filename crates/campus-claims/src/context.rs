//! Caller identity and request clock
//!
//! Every service operation receives a [`RequestContext`] naming who acts and
//! the instant the request happens at. Freeze checks and timestamps all read
//! `now` from here, so one request sees one clock.

use crate::error::{ClaimError, ClaimResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	User,
	Admin,
}

/// An authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
	pub id: String,
	pub role: Role,
}

impl Principal {
	pub fn user(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			role: Role::User,
		}
	}

	pub fn admin(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			role: Role::Admin,
		}
	}

	pub fn is_admin(&self) -> bool {
		self.role == Role::Admin
	}
}

#[derive(Debug, Clone)]
pub struct RequestContext {
	principal: Principal,
	now: DateTime<Utc>,
}

impl RequestContext {
	/// Context stamped with the current wall-clock time
	pub fn new(principal: Principal) -> Self {
		Self::at(principal, Utc::now())
	}

	/// Context stamped with an explicit instant
	pub fn at(principal: Principal, now: DateTime<Utc>) -> Self {
		Self { principal, now }
	}

	pub fn principal(&self) -> &Principal {
		&self.principal
	}

	pub fn user_id(&self) -> &str {
		&self.principal.id
	}

	pub fn now(&self) -> DateTime<Utc> {
		self.now
	}

	/// Return the principal if it is an administrator
	///
	/// # Errors
	///
	/// Returns [`ClaimError::Forbidden`] naming `action` otherwise.
	pub fn require_admin(&self, action: &'static str) -> ClaimResult<&Principal> {
		if self.principal.is_admin() {
			Ok(&self.principal)
		} else {
			Err(ClaimError::Forbidden { action })
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_require_admin_accepts_admin() {
		let ctx = RequestContext::new(Principal::admin("root"));
		let principal = ctx.require_admin("audit claims").unwrap();
		assert_eq!(principal.id, "root");
	}

	#[rstest]
	fn test_require_admin_rejects_user() {
		let ctx = RequestContext::new(Principal::user("s1001"));
		let error = ctx.require_admin("audit claims").unwrap_err();
		assert!(matches!(
			error,
			ClaimError::Forbidden {
				action: "audit claims"
			}
		));
	}

	#[rstest]
	fn test_explicit_clock_is_kept() {
		let now = DateTime::parse_from_rfc3339("2031-05-01T08:00:00Z")
			.unwrap()
			.with_timezone(&Utc);
		let ctx = RequestContext::at(Principal::user("s1001"), now);
		assert_eq!(ctx.now(), now);
		assert_eq!(ctx.user_id(), "s1001");
	}
}
