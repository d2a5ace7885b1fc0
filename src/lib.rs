//! # CampusFinder
//!
//! Claim lifecycle and credit penalties for a campus lost-and-found platform.
//!
//! Users post found and lost items and claim items others posted.
//! Administrators audit claims and rule on complaints; confirmed abuse freezes
//! the offender, and a frozen user can neither claim nor publish until the
//! freeze runs out or is lifted.
//!
//! This crate is a facade over the workspace members:
//!
//! - [`conf`] (`campus-conf`): layered settings
//! - [`db`] (`campus-db`): SQLite pool, migrations and write transactions
//! - [`claims`] (`campus-claims`): the claim service, credit ledger and sweeper
//!
//! It also hosts the `manage` administration binary; [`manage_cli`] holds the
//! command implementations it dispatches to.
//!
//! ## Quick Start
//!
//! ```no_run
//! use campus_finder::prelude::*;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = Settings::load(Settings::resolve_path(None))?;
//! let service = campus_finder::open_service(&settings.database).await?;
//!
//! let admin = RequestContext::new(Principal::admin("root"));
//! let overview = service.admin_overview(&admin).await?;
//! println!("{} open complaints", overview.open_complaints.len());
//! # Ok(())
//! # }
//! ```

pub mod manage_cli;

pub use campus_claims as claims;
pub use campus_conf as conf;
pub use campus_db as db;

use campus_claims::ClaimService;
use campus_conf::DatabaseSettings;
use campus_db::{ConnectionPool, PoolConfig, PoolResult};

/// Connect to the configured database, apply migrations and build the claim service
pub async fn open_service(settings: &DatabaseSettings) -> PoolResult<ClaimService> {
	let pool = ConnectionPool::connect(&settings.url, PoolConfig::from_settings(settings)).await?;
	pool.migrate().await?;
	Ok(ClaimService::new(pool))
}

pub mod prelude {
	pub use campus_claims::{
		AdminOverview, AuditDecision, AuditStatus, ClaimError, ClaimResult, ClaimService,
		ComplaintAction, CreditSweeper, ItemKind, NewItem, Principal, RequestContext, Role,
		UserOverview,
	};
	pub use campus_conf::{Settings, SettingsError};
	pub use campus_db::{ConnectionPool, PoolConfig, PoolError};
}
