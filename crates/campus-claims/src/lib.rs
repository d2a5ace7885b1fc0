//! # campus-claims
//!
//! Claim lifecycle and credit penalties for CampusFinder.
//!
//! Users claim posted items; administrators audit claims and rule on
//! complaints against them. Confirmed abuse appends freeze periods to the
//! credit ledger, and a frozen user can neither claim nor publish until every
//! freeze has expired or been lifted.
//!
//! ## Components
//!
//! - [`ledger`]: the append-only credit ledger and derived freeze status
//! - [`registry`]: claims and their audit state machine
//! - [`complaints`]: complaint filing and adjudication
//! - [`notifications`]: per-user inbox
//! - [`orchestrator`]: [`ClaimService`], the transactional entry point
//! - [`sweeper`]: periodic deletion of long-expired ledger records
//!
//! ## Example
//!
//! ```no_run
//! use campus_claims::{ClaimService, Principal, RequestContext};
//! use campus_db::{ConnectionPool, PoolConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = ConnectionPool::connect("sqlite://campus.db", PoolConfig::default()).await?;
//! pool.migrate().await?;
//! let service = ClaimService::new(pool);
//!
//! let ctx = RequestContext::new(Principal::user("s1001"));
//! let submitted = service.submit_claim(&ctx, 42, "Has my initials inside").await?;
//! println!("claim {} is {}", submitted.claim.claim_id, submitted.claim.audit_status);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod complaints;
pub mod context;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod models;
pub mod notifications;
pub mod orchestrator;
pub mod registry;
pub mod sweeper;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use context::{Principal, RequestContext, Role};
pub use error::{ClaimError, ClaimResult, EntityKind};
pub use ledger::{COMPLAINT_FREEZE_DAYS, FreezePolicy, MANUAL_FREEZE_DAYS};
pub use models::*;
pub use notifications::MessageTemplate;
pub use orchestrator::{AdminOverview, ClaimService, UserOverview};
pub use sweeper::CreditSweeper;
