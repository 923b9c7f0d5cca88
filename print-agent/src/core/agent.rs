//! Agent lifecycle
//!
//! ```text
//! Config → DbService (migrations) → BackgroundTasks
//!   ├─ ticket_poller      (Worker)
//!   ├─ health_server      (Listener, when HEALTH_PORT != 0)
//!   └─ printer_health     (Periodic, when PRINTER_HEALTH_INTERVAL_SECS != 0)
//! → wait for Ctrl+C / SIGTERM (or a lost poller) → cancel, await tasks → close pool
//! ```

use std::sync::Arc;
use std::time::Duration;

use super::error::AgentResult;
use super::state::AgentState;
use super::tasks::{BackgroundTasks, TaskKind};
use super::Config;
use crate::api;
use crate::db::DbService;
use crate::printing::{
    AgentMetrics, PollerConfig, PrintDriver, PrinterHealthSweep, TicketPoller, TransportFactory,
};

/// How long running tasks get to finish after shutdown is requested
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

pub struct Agent {
    config: Arc<Config>,
    db: DbService,
    metrics: Arc<AgentMetrics>,
}

impl Agent {
    /// Open the store and prepare shared state
    pub async fn initialize(config: Config) -> AgentResult<Self> {
        let db = DbService::new(&config.database_path).await?;
        Ok(Self {
            config: Arc::new(config),
            db,
            metrics: Arc::new(AgentMetrics::new()),
        })
    }

    pub fn state(&self) -> AgentState {
        AgentState::new(self.config.clone(), self.db.pool.clone(), self.metrics.clone())
    }

    /// Start every background task and block until a shutdown signal
    pub async fn run(self) -> AgentResult<()> {
        let tasks = self.start();
        let token = tasks.shutdown_token();
        tokio::select! {
            _ = shutdown_signal() => {}
            _ = token.cancelled() => {
                tracing::error!("Ticket poller stopped unexpectedly, shutting down");
            }
        }
        self.stop(tasks).await;
        Ok(())
    }

    fn start(&self) -> BackgroundTasks {
        let config = &self.config;
        let pool = self.db.pool.clone();
        let mut tasks = BackgroundTasks::new();

        let driver = PrintDriver::from_config(pool.clone(), config, self.metrics.clone());
        let poller = TicketPoller::new(
            pool.clone(),
            driver,
            self.metrics.clone(),
            PollerConfig::from_config(config),
        );
        tasks.spawn("ticket_poller", TaskKind::Worker, poller.run(tasks.shutdown_token()));

        if config.health_port != 0 {
            let state = self.state();
            let port = config.health_port;
            let token = tasks.shutdown_token();
            tasks.spawn("health_server", TaskKind::Listener, async move {
                if let Err(e) = api::serve(state, port, token).await {
                    tracing::error!(port, error = %e, "Health server failed");
                }
            });
        }

        if !config.printer_health_interval.is_zero() {
            let sweep = PrinterHealthSweep::new(
                pool,
                TransportFactory::from_config(config),
                config.station_codes.clone(),
                config.printer_health_interval,
            )
            .with_retention(config.printer_health_retention);
            tasks.spawn("printer_health", TaskKind::Periodic, sweep.run(tasks.shutdown_token()));
        }

        tasks.log_summary();
        tracing::info!(
            agent = %config.agent_name,
            stations = %config.stations_label(),
            "Print agent is running, press Ctrl+C to stop"
        );
        tasks
    }

    async fn stop(self, tasks: BackgroundTasks) {
        for name in tasks.stopped_early() {
            tracing::warn!(task = name, "Task had already stopped before shutdown");
        }
        tasks.shutdown(SHUTDOWN_GRACE).await;
        self.db.close().await;
        tracing::info!("Print agent stopped");
    }
}

/// Resolve on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
