//! Per-user inbox
//!
//! Messages are written in the same transaction as the state change they
//! announce, so a rolled-back operation never leaves a notice behind.

use crate::error::ClaimResult;
use crate::models::Message;
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use std::fmt;

/// Fixed notice texts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageTemplate {
	/// Sent to the publisher when someone claims their item
	ClaimReceived { title: String },
	ClaimApproved { title: String },
	ClaimRejected { title: String },
	/// Sent to the accused when a complaint is upheld
	ViolationConfirmed { result: String },
	ComplaintDismissed { result: String },
}

impl fmt::Display for MessageTemplate {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MessageTemplate::ClaimReceived { title } => {
				write!(f, "Your item '{title}' has a new claim awaiting review.")
			}
			MessageTemplate::ClaimApproved { title } => {
				write!(f, "Your claim for '{title}' was approved.")
			}
			MessageTemplate::ClaimRejected { title } => {
				write!(f, "Your claim for '{title}' was rejected.")
			}
			MessageTemplate::ViolationConfirmed { result } => write!(
				f,
				"A complaint against your claim was upheld: {result}. Your account is frozen for 15 days."
			),
			MessageTemplate::ComplaintDismissed { result } => {
				write!(f, "A complaint against your claim was dismissed: {result}.")
			}
		}
	}
}

pub async fn enqueue(
	conn: &mut SqliteConnection,
	recipient_id: &str,
	template: &MessageTemplate,
	now: DateTime<Utc>,
) -> ClaimResult<Message> {
	let message = sqlx::query_as::<_, Message>(
		"INSERT INTO message (user_id, content, send_time, is_read)
		 VALUES (?, ?, ?, 0)
		 RETURNING msg_id, user_id, content, send_time, is_read",
	)
	.bind(recipient_id)
	.bind(template.to_string())
	.bind(now)
	.fetch_one(conn)
	.await?;

	tracing::debug!(recipient_id = %recipient_id, msg_id = message.msg_id, "Notification queued");
	Ok(message)
}

/// All messages for a user, newest first
pub async fn inbox(conn: &mut SqliteConnection, user_id: &str) -> ClaimResult<Vec<Message>> {
	let messages = sqlx::query_as::<_, Message>(
		"SELECT msg_id, user_id, content, send_time, is_read FROM message
		 WHERE user_id = ? ORDER BY send_time DESC, msg_id DESC",
	)
	.bind(user_id)
	.fetch_all(conn)
	.await?;
	Ok(messages)
}

pub async fn unread_count(conn: &mut SqliteConnection, user_id: &str) -> ClaimResult<i64> {
	let count = sqlx::query_scalar("SELECT COUNT(*) FROM message WHERE user_id = ? AND is_read = 0")
		.bind(user_id)
		.fetch_one(conn)
		.await?;
	Ok(count)
}

pub async fn mark_all_read(conn: &mut SqliteConnection, user_id: &str) -> ClaimResult<u64> {
	let result = sqlx::query("UPDATE message SET is_read = 1 WHERE user_id = ? AND is_read = 0")
		.bind(user_id)
		.execute(conn)
		.await?;
	Ok(result.rows_affected())
}
