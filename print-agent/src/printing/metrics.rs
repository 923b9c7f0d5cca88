//! Operational counters of one agent process
//!
//! Shared through `Arc` between the poller, the driver and the health
//! surface; nothing here is global.

use crate::utils::time::{format_uptime, millis_to_datetime};
use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug)]
pub struct AgentMetrics {
    started: Instant,
    printed: AtomicU64,
    retried: AtomicU64,
    failed: AtomicU64,
    cycle_errors: AtomicU64,
    /// Unix millis of the last completed poll, 0 before the first one
    last_poll: AtomicI64,
}

/// Point-in-time copy of [`AgentMetrics`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_seconds: u64,
    pub uptime_formatted: String,
    pub tickets_processed: u64,
    pub tickets_retried: u64,
    pub tickets_failed: u64,
    pub cycle_errors: u64,
    /// Printed / (printed + failed) in percent, two decimals
    pub success_rate: f64,
    /// RFC 3339, `None` before the first poll
    pub last_poll: Option<String>,
}

impl AgentMetrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            printed: AtomicU64::new(0),
            retried: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cycle_errors: AtomicU64::new(0),
            last_poll: AtomicI64::new(0),
        }
    }

    pub fn record_printed(&self) {
        self.printed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retried(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle_error(&self) {
        self.cycle_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll(&self, at_millis: i64) {
        self.last_poll.store(at_millis, Ordering::Relaxed);
    }

    pub fn last_poll_millis(&self) -> Option<i64> {
        match self.last_poll.load(Ordering::Relaxed) {
            0 => None,
            millis => Some(millis),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let printed = self.printed.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let uptime = self.uptime_seconds();

        MetricsSnapshot {
            uptime_seconds: uptime,
            uptime_formatted: format_uptime(uptime),
            tickets_processed: printed,
            tickets_retried: self.retried.load(Ordering::Relaxed),
            tickets_failed: failed,
            cycle_errors: self.cycle_errors.load(Ordering::Relaxed),
            success_rate: success_rate(printed, failed),
            last_poll: self
                .last_poll_millis()
                .and_then(millis_to_datetime)
                .map(|dt| dt.to_rfc3339()),
        }
    }
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn success_rate(printed: u64, failed: u64) -> f64 {
    let total = printed + failed;
    if total == 0 {
        return 0.0;
    }
    let rate = printed as f64 / total as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}
