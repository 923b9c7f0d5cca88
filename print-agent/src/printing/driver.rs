//! Ticket state machine driver
//!
//! Takes one claimed (`printing`) ticket through resolve → render → send and
//! records the outcome:
//!
//! | Result | Transition | Printer stats |
//! |--------|------------|---------------|
//! | sent | `printing → printed` | success +1 |
//! | transport error, attempts < ceiling | `printing → new`, attempts +1 | fail +1 |
//! | transport error, attempts ≥ ceiling | `printing → failed` | fail +1 |
//! | no printer / bad ticket data | `printing → failed` | untouched |
//!
//! The ceiling is the ticket's `max_retries`, capped by the agent setting.
//! A store failure before anything is sent releases the claim; after the
//! send the ticket stays `printing` until stale-claim recovery.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use kitchen_printer::Printer;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::error::PrintJobError;
use super::metrics::AgentMetrics;
use super::renderer::KitchenTicketRenderer;
use super::resolver;
use super::transport::TransportFactory;
use crate::core::Config;
use crate::db::models::Ticket;
use crate::db::repository::{station_printer, ticket as ticket_repo};

/// What happened to a ticket
#[derive(Debug)]
pub enum TicketOutcome {
    Printed,
    /// Back in the queue; `attempts` is the new attempt count
    Retried { attempts: i64 },
    Failed(PrintJobError),
}

pub struct PrintDriver {
    pool: SqlitePool,
    transports: TransportFactory,
    metrics: Arc<AgentMetrics>,
    timezone: Tz,
    max_print_retries: i64,
    actor: String,
}

impl PrintDriver {
    pub fn new(pool: SqlitePool, transports: TransportFactory, metrics: Arc<AgentMetrics>) -> Self {
        Self {
            pool,
            transports,
            metrics,
            timezone: Tz::UTC,
            max_print_retries: 3,
            actor: "print-agent".to_string(),
        }
    }

    pub fn from_config(pool: SqlitePool, config: &Config, metrics: Arc<AgentMetrics>) -> Self {
        Self::new(pool, TransportFactory::from_config(config), metrics)
            .with_timezone(config.timezone)
            .with_max_print_retries(config.max_print_retries)
            .with_actor(&config.agent_name)
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_max_print_retries(mut self, max: i64) -> Self {
        self.max_print_retries = max;
        self
    }

    pub fn with_actor(mut self, actor: &str) -> Self {
        self.actor = actor.to_string();
        self
    }

    /// Process a claimed ticket
    ///
    /// Only [`PrintJobError::StoreUnavailable`] is returned as an error;
    /// every other failure is recorded on the ticket.
    pub async fn process(&self, ticket: &Ticket) -> Result<TicketOutcome, PrintJobError> {
        self.process_at(ticket, Utc::now()).await
    }

    #[instrument(skip(self, ticket, now), fields(ticket_id = ticket.id, station = %ticket.station, attempts = ticket.print_attempts))]
    pub async fn process_at(
        &self,
        ticket: &Ticket,
        now: DateTime<Utc>,
    ) -> Result<TicketOutcome, PrintJobError> {
        let printer = match resolver::resolve(&self.pool, &ticket.station, &ticket.scope).await {
            Ok(printer) => printer,
            Err(err @ PrintJobError::StoreUnavailable(_)) => {
                // Nothing was sent, so the ticket can go straight back to the queue
                if let Err(e) = ticket_repo::release_claim(&self.pool, ticket.id, &self.actor).await {
                    warn!(error = %e, "Failed to release claim after store error");
                }
                return Err(err);
            }
            Err(err) => return self.fail(ticket, None, err).await,
        };

        let data = match KitchenTicketRenderer::for_printer(&printer, self.timezone).render(ticket, now) {
            Ok(data) => data,
            Err(err) => return self.fail(ticket, Some(printer.id), err.into()).await,
        };

        let transport = self.transports.for_printer(&printer);
        match transport.print(&data).await {
            Ok(()) => {
                self.bump_stat(printer.id, true).await;
                if ticket_repo::mark_printed(&self.pool, ticket.id, printer.id, &self.actor).await? {
                    self.metrics.record_printed();
                } else {
                    warn!("Ticket left printing state before it could be marked printed");
                }
                info!(printer = %printer.name, endpoint = %printer.endpoint(), bytes = data.len(), "Ticket printed");
                Ok(TicketOutcome::Printed)
            }
            Err(err) => {
                let err = PrintJobError::from_transport(err);
                self.bump_stat(printer.id, false).await;

                let ceiling = ticket.max_retries.min(self.max_print_retries);
                if ticket.print_attempts < ceiling {
                    let attempts = ticket.print_attempts + 1;
                    let message = err.describe();
                    if ticket_repo::mark_retry(&self.pool, ticket.id, &message, Some(printer.id), &self.actor).await? {
                        self.metrics.record_retried();
                        warn!(printer = %printer.name, attempts, ceiling, error = %message, "Print failed, ticket requeued");
                    } else {
                        warn!(printer = %printer.name, error = %message, "Ticket left printing state before it could be requeued");
                    }
                    Ok(TicketOutcome::Retried { attempts })
                } else {
                    self.fail(ticket, Some(printer.id), err).await
                }
            }
        }
    }

    async fn fail(
        &self,
        ticket: &Ticket,
        printer_id: Option<i64>,
        err: PrintJobError,
    ) -> Result<TicketOutcome, PrintJobError> {
        if matches!(err, PrintJobError::StoreUnavailable(_)) {
            return Err(err);
        }

        let message = err.describe();
        if ticket_repo::mark_failed(&self.pool, ticket.id, &message, printer_id, &self.actor).await? {
            self.metrics.record_failed();
        } else {
            warn!("Ticket left printing state before it could be marked failed");
        }
        warn!(error = %message, "Ticket failed");
        Ok(TicketOutcome::Failed(err))
    }

    /// Printer counters are best effort and never fail the ticket
    async fn bump_stat(&self, printer_id: i64, success: bool) {
        if let Err(e) = station_printer::bump_stat(&self.pool, printer_id, success).await {
            warn!(printer_id, error = %e, "Failed to update printer statistics");
        }
    }
}
