use chrono_tz::Tz;
use std::str::FromStr;
use std::time::Duration;

/// Agent configuration
///
/// # Environment variables
///
/// Every field can be overridden from the environment (or a `.env` file).
/// Unset or unparsable values fall back to the default.
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | DATABASE_PATH | kitchen.db | SQLite file shared with the POS |
/// | POLL_INTERVAL_SECS | 2 | sleep between poll cycles |
/// | MAX_TICKETS_PER_POLL | 10 | claim batch size |
/// | MAX_PRINT_RETRIES | 3 | cap on a ticket's retry ceiling |
/// | TICKET_PACING_MS | 500 | delay between tickets of one batch |
/// | ERROR_BACKOFF_SECS | 5 | sleep after a failed cycle |
/// | PROBE_TIMEOUT_MS | 3000 | printer reachability probe |
/// | SEND_TIMEOUT_MS | 10000 | print data send |
/// | STALE_CLAIM_SECS | 300 | `printing` claims older than this are released (at start-up, then once per window) |
/// | STATION_CODES | (all) | comma-separated stations this agent serves |
/// | AGENT_NAME | print-agent | actor written to the ticket log |
/// | TIMEZONE | UTC | zone of the clock printed on tickets |
/// | SPOOLER_COMMAND | lp | spooler executable, empty disables spooler printers |
/// | HEALTH_PORT | 8099 | health HTTP port, 0 disables |
/// | PRINTER_HEALTH_INTERVAL_SECS | 60 | printer probe sweep, 0 disables |
/// | PRINTER_HEALTH_RETENTION_DAYS | 7 | age at which probe results are deleted, 0 keeps them |
/// | LOG_LEVEL | info | tracing filter |
/// | LOG_DIR | (unset) | directory for daily rolling log files |
///
/// # Example
///
/// ```ignore
/// STATION_CODES=kitchen,bar POLL_INTERVAL_SECS=1 print-agent
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub poll_interval: Duration,
    pub max_tickets_per_poll: i64,
    pub max_print_retries: i64,
    pub ticket_pacing: Duration,
    pub error_backoff: Duration,
    pub probe_timeout: Duration,
    pub send_timeout: Duration,
    pub stale_claim: Duration,
    /// Empty means every station
    pub station_codes: Vec<String>,
    pub agent_name: String,
    pub timezone: Tz,
    /// `None` when spooler printing is disabled
    pub spooler_command: Option<String>,
    /// 0 disables the health server
    pub health_port: u16,
    /// Zero disables the printer sweep
    pub printer_health_interval: Duration,
    /// Zero keeps every probe result
    pub printer_health_retention: Duration,
    pub log_level: String,
    pub log_dir: Option<String>,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let spooler_command = lookup("SPOOLER_COMMAND")
            .unwrap_or_else(|| "lp".into())
            .trim()
            .to_string();

        Self {
            database_path: lookup("DATABASE_PATH")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "kitchen.db".into()),
            poll_interval: Duration::from_secs(parse_or(&lookup, "POLL_INTERVAL_SECS", 2).max(1)),
            max_tickets_per_poll: parse_or(&lookup, "MAX_TICKETS_PER_POLL", 10).max(1),
            max_print_retries: parse_or(&lookup, "MAX_PRINT_RETRIES", 3).max(0),
            ticket_pacing: Duration::from_millis(parse_or(&lookup, "TICKET_PACING_MS", 500)),
            error_backoff: Duration::from_secs(parse_or(&lookup, "ERROR_BACKOFF_SECS", 5)),
            probe_timeout: Duration::from_millis(parse_or(&lookup, "PROBE_TIMEOUT_MS", 3000)),
            send_timeout: Duration::from_millis(parse_or(&lookup, "SEND_TIMEOUT_MS", 10000)),
            stale_claim: Duration::from_secs(parse_or(&lookup, "STALE_CLAIM_SECS", 300)),
            station_codes: lookup("STATION_CODES")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            agent_name: lookup("AGENT_NAME")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "print-agent".into()),
            timezone: parse_or(&lookup, "TIMEZONE", Tz::UTC),
            spooler_command: (!spooler_command.is_empty()).then_some(spooler_command),
            health_port: parse_or(&lookup, "HEALTH_PORT", 8099),
            printer_health_interval: Duration::from_secs(parse_or(
                &lookup,
                "PRINTER_HEALTH_INTERVAL_SECS",
                60,
            )),
            printer_health_retention: Duration::from_secs(
                parse_or(&lookup, "PRINTER_HEALTH_RETENTION_DAYS", 7u64).saturating_mul(86_400),
            ),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: lookup("LOG_DIR").filter(|v| !v.trim().is_empty()),
        }
    }

    /// Log the effective configuration (nothing here is secret)
    pub fn log_summary(&self) {
        tracing::info!(
            database = %self.database_path,
            poll_interval_secs = self.poll_interval.as_secs(),
            max_tickets_per_poll = self.max_tickets_per_poll,
            max_print_retries = self.max_print_retries,
            ticket_pacing_ms = self.ticket_pacing.as_millis() as u64,
            stations = %self.stations_label(),
            agent = %self.agent_name,
            timezone = %self.timezone,
            spooler = self.spooler_command.as_deref().unwrap_or("disabled"),
            health_port = self.health_port,
            "Agent configuration loaded"
        );
    }

    pub fn stations_label(&self) -> String {
        if self.station_codes.is_empty() {
            "all".to_string()
        } else {
            self.station_codes.join(",")
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
