//! Command implementations behind the `manage` binary
//!
//! Each `run_*` function performs one operation through [`ClaimService`] and
//! prints the result as JSON on stdout. Rejections come back as errors; the
//! binary prints them and exits with status 1.

use anyhow::{Context, bail};
use campus_claims::{
	AuditDecision, ClaimError, ClaimService, ComplaintAction, CreditSweeper, NewItem, Principal,
	RequestContext,
};
use campus_conf::{MAX_RETENTION_DAYS, Settings, SweeperSettings};
use chrono::TimeDelta;
use console::style;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install the fmt subscriber
///
/// `RUST_LOG` wins over `default_filter`; each `-v` raises the floor to
/// `debug` and then `trace`.
pub fn init_logging(default_filter: &str, verbosity: u8) {
	let filter = match verbosity {
		0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
		1 => EnvFilter::new("debug"),
		_ => EnvFilter::new("trace"),
	};

	// A second initialisation (tests, embedding) keeps the first subscriber
	let _ = tracing_subscriber::registry()
		.with(filter)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.try_init();
}

/// Principal for the command line caller
///
/// `--admin` without `--as` acts as the user `admin`.
pub fn principal(user: Option<String>, admin: bool) -> anyhow::Result<Principal> {
	match (user, admin) {
		(Some(id), true) => Ok(Principal::admin(id)),
		(None, true) => Ok(Principal::admin("admin")),
		(Some(id), false) => Ok(Principal::user(id)),
		(None, false) => bail!("this command acts on behalf of a user; pass --as <USER_ID>"),
	}
}

/// One-line description of a failed command, with the status code of claim rejections
pub fn describe_error(error: &anyhow::Error) -> String {
	match error.downcast_ref::<ClaimError>() {
		Some(claim_error) if claim_error.is_user_error() => {
			format!("{} (status {})", claim_error, claim_error.status_code())
		}
		_ => format!("{error:#}"),
	}
}

fn print_json<T: Serialize>(label: &str, value: &T) -> anyhow::Result<()> {
	println!("{}", style(label).green().bold());
	println!(
		"{}",
		serde_json::to_string_pretty(value).context("Failed to render output")?
	);
	Ok(())
}

pub async fn run_migrate(settings: &Settings) -> anyhow::Result<()> {
	crate::open_service(&settings.database)
		.await
		.context("Failed to prepare the database")?;
	println!("{}", style("Database schema is up to date").green().bold());
	Ok(())
}

pub async fn run_publish(
	service: &ClaimService,
	ctx: &RequestContext,
	item: NewItem,
) -> anyhow::Result<()> {
	let item = service.publish_item(ctx, &item).await?;
	print_json("Item published", &item)
}

pub async fn run_claim(
	service: &ClaimService,
	ctx: &RequestContext,
	item_id: i64,
	reason: &str,
) -> anyhow::Result<()> {
	let submitted = service.submit_claim(ctx, item_id, reason).await?;
	print_json("Claim submitted", &submitted)
}

pub async fn run_audit(
	service: &ClaimService,
	ctx: &RequestContext,
	claim_id: i64,
	decision: AuditDecision,
) -> anyhow::Result<()> {
	let audited = service.audit_claim(ctx, claim_id, decision).await?;
	let label = if audited.changed {
		"Claim audited"
	} else {
		"Claim already carried this decision"
	};
	print_json(label, &audited)
}

pub async fn run_complain(
	service: &ClaimService,
	ctx: &RequestContext,
	claim_id: i64,
	reason: &str,
	kind: &str,
) -> anyhow::Result<()> {
	let complaint = service.file_complaint(ctx, claim_id, reason, kind).await?;
	print_json("Complaint filed", &complaint)
}

pub async fn run_resolve(
	service: &ClaimService,
	ctx: &RequestContext,
	comp_id: i64,
	action: ComplaintAction,
	result: &str,
) -> anyhow::Result<()> {
	let resolution = service.resolve_complaint(ctx, comp_id, action, result).await?;
	print_json("Complaint resolved", &resolution)
}

pub async fn run_freeze(
	service: &ClaimService,
	ctx: &RequestContext,
	user_id: &str,
) -> anyhow::Result<()> {
	let record = service.freeze_user(ctx, user_id).await?;
	print_json("User frozen", &record)
}

pub async fn run_unfreeze(
	service: &ClaimService,
	ctx: &RequestContext,
	user_id: &str,
) -> anyhow::Result<()> {
	let lifted = service.unfreeze_user(ctx, user_id).await?;
	print_json("User unfrozen", &serde_json::json!({ "user_id": user_id, "records_lifted": lifted }))
}

#[derive(Serialize)]
struct FreezeStatus {
	user_id: String,
	is_frozen: bool,
	frozen_until: Option<chrono::DateTime<chrono::Utc>>,
}

/// Freeze status of `user_id`, or of the caller when omitted
pub async fn run_status(
	service: &ClaimService,
	ctx: &RequestContext,
	user_id: Option<String>,
) -> anyhow::Result<()> {
	let user_id = user_id.unwrap_or_else(|| ctx.user_id().to_string());
	let frozen_until = service.frozen_until(&user_id, ctx.now()).await?;
	print_json(
		"Credit status",
		&FreezeStatus {
			user_id,
			is_frozen: frozen_until.is_some(),
			frozen_until,
		},
	)
}

pub async fn run_inbox(service: &ClaimService, ctx: &RequestContext) -> anyhow::Result<()> {
	let messages = service.view_inbox(ctx).await?;
	print_json("Inbox", &messages)
}

pub async fn run_overview(service: &ClaimService, ctx: &RequestContext) -> anyhow::Result<()> {
	if ctx.principal().is_admin() {
		let overview = service.admin_overview(ctx).await?;
		print_json("Administration overview", &overview)
	} else {
		let overview = service.user_overview(ctx).await?;
		print_json("Overview", &overview)
	}
}

/// Retention window for a manual sweep, bounded like `sweeper.retention_days`
pub fn retention_from_days(days: i64) -> anyhow::Result<TimeDelta> {
	if !(0..=MAX_RETENTION_DAYS).contains(&days) {
		bail!("retention must be between 0 and {MAX_RETENTION_DAYS} days");
	}
	TimeDelta::try_days(days).context("retention is out of range")
}

pub async fn run_sweep(
	service: &ClaimService,
	ctx: &RequestContext,
	retention_days: i64,
) -> anyhow::Result<()> {
	let retention = retention_from_days(retention_days)?;
	let removed = service.sweep_expired(ctx, retention).await?;
	print_json("Credit ledger swept", &serde_json::json!({ "removed": removed }))
}

/// Run the periodic sweeper until Ctrl-C
pub async fn run_sweeper(service: ClaimService, settings: &SweeperSettings) -> anyhow::Result<()> {
	if !settings.enabled {
		println!(
			"{}",
			style("Sweeper is disabled (sweeper.enabled = false)").yellow()
		);
		return Ok(());
	}

	let sweeper = std::sync::Arc::new(CreditSweeper::from_settings(service, settings));
	let runner = std::sync::Arc::clone(&sweeper);
	let handle = tokio::spawn(async move { runner.run().await });

	tokio::signal::ctrl_c()
		.await
		.context("Failed to listen for Ctrl-C")?;
	sweeper.shutdown();
	handle.await.context("Sweeper task panicked")?;
	Ok(())
}
