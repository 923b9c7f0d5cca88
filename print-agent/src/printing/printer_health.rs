//! Periodic printer reachability sweep
//!
//! Probes every active network printer of the agent's stations and keeps
//! the result in `printer_health_check` for the admin screens. Spooler
//! queues have no meaningful probe and are skipped. Results older than
//! the retention window are deleted after each sweep.

use sqlx::SqlitePool;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::transport::{Transport, TransportFactory};
use crate::db::models::PrinterHealthCheck;
use crate::db::repository::{RepoResult, printer_health, station_printer};
use crate::utils::time::now_millis;

pub struct PrinterHealthSweep {
    pool: SqlitePool,
    transports: TransportFactory,
    stations: Vec<String>,
    interval: Duration,
    retention: Duration,
}

impl PrinterHealthSweep {
    pub fn new(
        pool: SqlitePool,
        transports: TransportFactory,
        stations: Vec<String>,
        interval: Duration,
    ) -> Self {
        Self {
            pool,
            transports,
            stations,
            interval,
            retention: Duration::from_secs(7 * 86_400),
        }
    }

    /// Zero keeps every result
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub async fn run(self, shutdown: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "Printer health sweep started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
            match self.sweep_once().await {
                Ok(checked) => debug!(checked, "Printer health sweep done"),
                Err(e) => warn!(error = %e, "Printer health sweep failed"),
            }
        }
        info!("Printer health sweep stopped");
    }

    /// Probe all printers once; returns how many were checked
    pub async fn sweep_once(&self) -> RepoResult<usize> {
        let printers = station_printer::find_active(&self.pool, &self.stations).await?;

        let mut checked = 0;
        for printer in &printers {
            let Transport::Network(network) = self.transports.for_printer(printer) else {
                continue;
            };

            let check = match network.probe().await {
                Ok(latency) => PrinterHealthCheck {
                    printer_id: printer.id,
                    checked_at: now_millis(),
                    is_online: true,
                    response_time_ms: Some(i64::try_from(latency.as_millis()).unwrap_or(i64::MAX)),
                    error_message: None,
                },
                Err(e) => {
                    warn!(printer = %printer.name, endpoint = %printer.endpoint(), error = %e, "Printer offline");
                    PrinterHealthCheck {
                        printer_id: printer.id,
                        checked_at: now_millis(),
                        is_online: false,
                        response_time_ms: None,
                        error_message: Some(e.to_string()),
                    }
                }
            };
            printer_health::insert(&self.pool, &check).await?;
            checked += 1;
        }

        if !self.retention.is_zero() {
            let window = i64::try_from(self.retention.as_millis()).unwrap_or(i64::MAX);
            let pruned = printer_health::delete_older_than(&self.pool, now_millis().saturating_sub(window)).await?;
            if pruned > 0 {
                debug!(pruned, "Old printer health checks deleted");
            }
        }
        Ok(checked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::*;

    #[tokio::test]
    async fn test_sweep_records_online_and_offline() {
        let pool = memory_pool().await;
        let (port, _) = recording_printer().await;
        let online = insert_printer(&pool, PrinterSeed { port: Some(i64::from(port)), ..Default::default() }).await;
        let offline = insert_printer(
            &pool,
            PrinterSeed {
                name: "Bar",
                station: "bar",
                port: Some(i64::from(refused_port().await)),
                ..Default::default()
            },
        )
        .await;
        insert_printer(
            &pool,
            PrinterSeed {
                name: "Office",
                connection: "spooler",
                device_name: Some("office"),
                ..Default::default()
            },
        )
        .await;

        let transports =
            TransportFactory::new(Duration::from_millis(500), Duration::from_secs(1), Some("lp".into()));
        let sweep = PrinterHealthSweep::new(pool.clone(), transports, Vec::new(), Duration::from_secs(60));

        assert_eq!(sweep.sweep_once().await.unwrap(), 2);

        let up = printer_health::find_for_printer(&pool, online, 5).await.unwrap();
        assert_eq!(up.len(), 1);
        assert!(up[0].is_online);
        assert!(up[0].response_time_ms.is_some());

        let down = printer_health::find_for_printer(&pool, offline, 5).await.unwrap();
        assert_eq!(down.len(), 1);
        assert!(!down[0].is_online);
        assert!(down[0].error_message.is_some());
    }

    #[tokio::test]
    async fn test_sweep_prunes_results_past_retention() {
        let pool = memory_pool().await;
        let (port, _) = recording_printer().await;
        let id = insert_printer(&pool, PrinterSeed { port: Some(i64::from(port)), ..Default::default() }).await;
        let old = PrinterHealthCheck {
            printer_id: id,
            checked_at: now_millis() - 3 * 86_400_000,
            is_online: false,
            response_time_ms: None,
            error_message: Some("offline".into()),
        };
        printer_health::insert(&pool, &old).await.unwrap();

        let transports = TransportFactory::new(Duration::from_millis(500), Duration::from_secs(1), None);
        let keep_all = PrinterHealthSweep::new(pool.clone(), transports.clone(), Vec::new(), Duration::from_secs(60))
            .with_retention(Duration::ZERO);
        keep_all.sweep_once().await.unwrap();
        assert_eq!(printer_health::find_for_printer(&pool, id, 10).await.unwrap().len(), 2);

        let one_day = PrinterHealthSweep::new(pool.clone(), transports, Vec::new(), Duration::from_secs(60))
            .with_retention(Duration::from_secs(86_400));
        one_day.sweep_once().await.unwrap();
        let kept = printer_health::find_for_printer(&pool, id, 10).await.unwrap();
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|c| c.is_online));
    }

    #[tokio::test]
    async fn test_sweep_respects_station_filter() {
        let pool = memory_pool().await;
        let (port, _) = recording_printer().await;
        insert_printer(&pool, PrinterSeed { port: Some(i64::from(port)), ..Default::default() }).await;

        let transports = TransportFactory::new(Duration::from_millis(500), Duration::from_secs(1), None);
        let sweep = PrinterHealthSweep::new(pool, transports, vec!["bar".into()], Duration::from_secs(60));
        assert_eq!(sweep.sweep_once().await.unwrap(), 0);
    }
}
