//! Periodic credit ledger housekeeping

use crate::error::ClaimResult;
use crate::orchestrator::ClaimService;
use campus_conf::SweeperSettings;
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;
use tokio::sync::watch;

/// Deletes long-expired credit records on a fixed interval
///
/// The first sweep runs as soon as [`CreditSweeper::run`] starts. A failed
/// sweep is logged and retried on the next tick. A shutdown requested before
/// `run` starts is still honoured.
pub struct CreditSweeper {
	service: ClaimService,
	interval: Duration,
	retention: TimeDelta,
	shutdown_tx: watch::Sender<bool>,
}

impl CreditSweeper {
	pub fn new(service: ClaimService, interval: Duration, retention: TimeDelta) -> Self {
		let (shutdown_tx, _) = watch::channel(false);
		Self {
			service,
			interval,
			retention,
			shutdown_tx,
		}
	}

	/// Retentions beyond what `TimeDelta` can hold saturate, which keeps every record
	pub fn from_settings(service: ClaimService, settings: &SweeperSettings) -> Self {
		Self::new(
			service,
			settings.interval(),
			TimeDelta::try_days(settings.retention_days).unwrap_or(TimeDelta::MAX),
		)
	}

	pub fn interval(&self) -> Duration {
		self.interval
	}

	pub fn retention(&self) -> TimeDelta {
		self.retention
	}

	/// Run a single sweep as of `now`
	pub async fn sweep_once(&self, now: DateTime<Utc>) -> ClaimResult<u64> {
		self.service.sweep_at(now, self.retention).await
	}

	/// Signal [`CreditSweeper::run`] to return
	pub fn shutdown(&self) {
		self.shutdown_tx.send_replace(true);
	}

	pub async fn run(&self) {
		let mut shutdown_rx = self.shutdown_tx.subscribe();
		tracing::info!(
			interval_secs = self.interval.as_secs(),
			retention_days = self.retention.num_days(),
			"Credit sweeper started"
		);

		while !*shutdown_rx.borrow() {
			if let Err(e) = self.sweep_once(Utc::now()).await {
				tracing::error!(error = %e, "Credit sweep failed");
			}

			tokio::select! {
				_ = tokio::time::sleep(self.interval) => {}
				_ = shutdown_rx.wait_for(|stopped| *stopped) => {
					break;
				}
			}
		}

		tracing::info!("Credit sweeper stopped");
	}
}
