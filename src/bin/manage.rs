//! CampusFinder management CLI
//!
//! Drives the claim service from the command line, acting as the principal
//! named by `--as` (and `--admin` for administrator commands).

use campus_claims::{AuditDecision, ComplaintAction, ItemKind, NewItem, RequestContext};
use campus_conf::Settings;
use campus_finder::manage_cli;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "manage")]
#[command(about = "CampusFinder management interface", long_about = None)]
#[command(version)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Settings file (defaults to $CAMPUS_SETTINGS_FILE, then settings/campus.toml)
	#[arg(long, global = true, value_name = "FILE")]
	settings: Option<PathBuf>,

	/// User id to act as
	#[arg(long = "as", global = true, env = "CAMPUS_USER", value_name = "USER_ID")]
	user: Option<String>,

	/// Act with administrator rights
	#[arg(long, global = true)]
	admin: bool,

	/// Verbosity level (can be repeated for more output)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	verbosity: u8,
}

#[derive(Subcommand)]
enum Commands {
	/// Apply database migrations
	Migrate,

	/// Publish a found or lost item
	Publish {
		#[arg(long)]
		title: String,

		#[arg(long, default_value = "")]
		description: String,

		#[arg(long, default_value = "")]
		location: String,

		#[arg(long, value_name = "CATEGORY_ID")]
		category: Option<i64>,

		#[arg(long, value_enum, default_value_t = KindArg::Found)]
		kind: KindArg,
	},

	/// Claim an item
	Claim {
		item_id: i64,

		/// Why the item is yours
		#[arg(long)]
		reason: String,
	},

	/// Approve or reject a pending claim
	Audit {
		claim_id: i64,

		#[arg(value_enum)]
		decision: DecisionArg,
	},

	/// File a complaint against a claim
	Complain {
		claim_id: i64,

		#[arg(long)]
		reason: String,

		/// Complaint category, e.g. false-claim
		#[arg(long = "type", default_value = "false-claim")]
		kind: String,
	},

	/// Rule on an open complaint
	Resolve {
		comp_id: i64,

		#[arg(value_enum)]
		action: ActionArg,

		/// Ruling text sent to the accused
		#[arg(long)]
		result: String,
	},

	/// Freeze a user for the manual-freeze period
	Freeze { user_id: String },

	/// Lift every active freeze of a user
	Unfreeze { user_id: String },

	/// Show whether a user is frozen
	Status {
		/// Defaults to the acting user
		user_id: Option<String>,
	},

	/// Show and mark read the acting user's messages
	Inbox,

	/// Dashboard of the acting user, or the administration overview with --admin
	Overview,

	/// Delete long-expired credit records now
	Sweep {
		/// Keep records that expired within this many days (defaults to sweeper.retention_days)
		#[arg(long)]
		retention_days: Option<i64>,
	},

	/// Run the periodic credit sweeper until interrupted
	RunSweeper,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
	Found,
	Lost,
}

impl From<KindArg> for ItemKind {
	fn from(kind: KindArg) -> Self {
		match kind {
			KindArg::Found => ItemKind::Found,
			KindArg::Lost => ItemKind::Lost,
		}
	}
}

#[derive(Clone, Copy, ValueEnum)]
enum DecisionArg {
	Approve,
	Reject,
}

impl From<DecisionArg> for AuditDecision {
	fn from(decision: DecisionArg) -> Self {
		match decision {
			DecisionArg::Approve => AuditDecision::Approve,
			DecisionArg::Reject => AuditDecision::Reject,
		}
	}
}

#[derive(Clone, Copy, ValueEnum)]
enum ActionArg {
	Violation,
	Dismiss,
}

impl From<ActionArg> for ComplaintAction {
	fn from(action: ActionArg) -> Self {
		match action {
			ActionArg::Violation => ComplaintAction::Violation,
			ActionArg::Dismiss => ComplaintAction::Dismiss,
		}
	}
}

async fn run(cli: Cli) -> anyhow::Result<()> {
	let settings = Settings::load(Settings::resolve_path(cli.settings))?;
	manage_cli::init_logging(&settings.logging.filter, cli.verbosity);

	if let Commands::Migrate = cli.command {
		return manage_cli::run_migrate(&settings).await;
	}

	let service = campus_finder::open_service(&settings.database).await?;
	if let Commands::RunSweeper = cli.command {
		return manage_cli::run_sweeper(service, &settings.sweeper).await;
	}

	let ctx = RequestContext::new(manage_cli::principal(cli.user, cli.admin)?);
	let service = &service;
	let ctx = &ctx;

	match cli.command {
		Commands::Publish {
			title,
			description,
			location,
			category,
			kind,
		} => {
			let item = NewItem {
				title,
				description,
				location,
				category_id: category,
				kind: kind.into(),
			};
			manage_cli::run_publish(service, ctx, item).await
		}
		Commands::Claim { item_id, reason } => {
			manage_cli::run_claim(service, ctx, item_id, &reason).await
		}
		Commands::Audit { claim_id, decision } => {
			manage_cli::run_audit(service, ctx, claim_id, decision.into()).await
		}
		Commands::Complain {
			claim_id,
			reason,
			kind,
		} => manage_cli::run_complain(service, ctx, claim_id, &reason, &kind).await,
		Commands::Resolve {
			comp_id,
			action,
			result,
		} => manage_cli::run_resolve(service, ctx, comp_id, action.into(), &result).await,
		Commands::Freeze { user_id } => manage_cli::run_freeze(service, ctx, &user_id).await,
		Commands::Unfreeze { user_id } => manage_cli::run_unfreeze(service, ctx, &user_id).await,
		Commands::Status { user_id } => manage_cli::run_status(service, ctx, user_id).await,
		Commands::Inbox => manage_cli::run_inbox(service, ctx).await,
		Commands::Overview => manage_cli::run_overview(service, ctx).await,
		Commands::Sweep { retention_days } => {
			let retention_days = retention_days.unwrap_or(settings.sweeper.retention_days);
			manage_cli::run_sweep(service, ctx, retention_days).await
		}
		Commands::Migrate | Commands::RunSweeper => Ok(()),
	}
}

#[tokio::main]
async fn main() {
	let cli = Cli::parse();

	if let Err(e) = run(cli).await {
		eprintln!(
			"{} {}",
			style("Error:").red().bold(),
			manage_cli::describe_error(&e)
		);
		process::exit(1);
	}
}
