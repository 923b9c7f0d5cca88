//! Ticket poller
//!
//! The agent's main loop. Each cycle claims a bounded batch of `new`
//! tickets and drives them through the [`PrintDriver`] one at a time, in
//! claim order, with a short pause between tickets so a single thermal
//! printer is never flooded.

use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::driver::{PrintDriver, TicketOutcome};
use super::error::PrintJobError;
use super::metrics::AgentMetrics;
use crate::core::Config;
use crate::db::models::Ticket;
use crate::db::repository::ticket as ticket_repo;
use crate::utils::time::now_millis;

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    pub batch_size: i64,
    pub ticket_pacing: Duration,
    pub error_backoff: Duration,
    pub stale_claim: Duration,
    /// Empty means every station
    pub stations: Vec<String>,
    pub actor: String,
}

impl PollerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval,
            batch_size: config.max_tickets_per_poll,
            ticket_pacing: config.ticket_pacing,
            error_backoff: config.error_backoff,
            stale_claim: config.stale_claim,
            stations: config.station_codes.clone(),
            actor: config.agent_name.clone(),
        }
    }
}

pub struct TicketPoller {
    pool: SqlitePool,
    driver: PrintDriver,
    metrics: Arc<AgentMetrics>,
    config: PollerConfig,
}

impl TicketPoller {
    pub fn new(
        pool: SqlitePool,
        driver: PrintDriver,
        metrics: Arc<AgentMetrics>,
        config: PollerConfig,
    ) -> Self {
        Self {
            pool,
            driver,
            metrics,
            config,
        }
    }

    /// Run until `shutdown` is cancelled
    ///
    /// Stale claims are recovered at start and again whenever the stale
    /// window has passed since the last recovery.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            batch_size = self.config.batch_size,
            stations = ?self.config.stations,
            "Ticket poller started"
        );

        self.recover_stale_claims().await;
        let mut last_recovery = Instant::now();

        while !shutdown.is_cancelled() {
            if last_recovery.elapsed() >= self.config.stale_claim {
                self.recover_stale_claims().await;
                last_recovery = Instant::now();
            }
            self.metrics.record_poll(now_millis());

            let delay = match self.run_cycle(&shutdown).await {
                Ok(_) => self.config.poll_interval,
                Err(e) => {
                    self.metrics.record_cycle_error();
                    error!(error = %e, backoff_secs = self.config.error_backoff.as_secs(), "Poll cycle aborted");
                    self.config.error_backoff
                }
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("Ticket poller stopped");
    }

    /// Claim and process one batch; returns how many tickets were processed
    ///
    /// On shutdown or a store failure, claimed tickets that were not
    /// attempted yet are released back to `new`.
    pub async fn run_cycle(&self, shutdown: &CancellationToken) -> Result<usize, PrintJobError> {
        let tickets = ticket_repo::claim_next_batch(
            &self.pool,
            self.config.batch_size,
            &self.config.stations,
            &self.config.actor,
        )
        .await?;

        if tickets.is_empty() {
            debug!("No pending tickets");
            return Ok(0);
        }
        info!(count = tickets.len(), "Claimed pending tickets");

        let mut processed = 0;
        let mut pending = tickets.into_iter();
        while let Some(ticket) = pending.next() {
            if shutdown.is_cancelled() {
                self.release(std::iter::once(ticket).chain(pending)).await;
                break;
            }

            match self.driver.process(&ticket).await {
                Ok(outcome) => {
                    processed += 1;
                    log_outcome(&ticket, &outcome);
                }
                Err(e) => {
                    self.release(pending).await;
                    return Err(e);
                }
            }

            if !pending.as_slice().is_empty() {
                tokio::select! {
                    _ = shutdown.cancelled() => {}
                    _ = tokio::time::sleep(self.config.ticket_pacing) => {}
                }
            }
        }

        Ok(processed)
    }

    /// Requeue tickets some agent left in `printing` longer than the stale window
    async fn recover_stale_claims(&self) {
        match ticket_repo::recover_stale_claims(&self.pool, self.config.stale_claim, &self.config.actor).await {
            Ok(0) => {}
            Ok(n) => warn!(recovered = n, "Released stale printing claims"),
            Err(e) => error!(error = %e, "Failed to recover stale claims"),
        }
    }

    async fn release(&self, tickets: impl Iterator<Item = Ticket>) {
        for ticket in tickets {
            match ticket_repo::release_claim(&self.pool, ticket.id, &self.config.actor).await {
                Ok(_) => debug!(ticket_id = ticket.id, "Released unattempted claim"),
                Err(e) => warn!(ticket_id = ticket.id, error = %e, "Failed to release claim"),
            }
        }
    }
}

fn log_outcome(ticket: &Ticket, outcome: &TicketOutcome) {
    match outcome {
        TicketOutcome::Printed => {
            info!(ticket_id = ticket.id, station = %ticket.station, "Ticket printed")
        }
        TicketOutcome::Retried { attempts } => {
            info!(ticket_id = ticket.id, station = %ticket.station, attempts, "Ticket requeued")
        }
        TicketOutcome::Failed(e) => {
            warn!(ticket_id = ticket.id, station = %ticket.station, kind = e.kind(), "Ticket failed")
        }
    }
}
