//! Transport selection
//!
//! Which channel a printer row is reached through is decided once, from
//! configuration, into a [`Transport`] value. A channel that cannot be used
//! on this host becomes [`Transport::Unavailable`] and fails every job
//! without doing I/O.

use kitchen_printer::{DEFAULT_PORT, NetworkPrinter, PrintError, PrintResult, Printer, SpoolerPrinter};
use std::time::Duration;

use crate::core::Config;
use crate::db::models::{ConnectionKind, PrinterConfig};

#[derive(Debug, Clone)]
pub enum Transport {
    Network(NetworkPrinter),
    Spooler(SpoolerPrinter),
    Unavailable(String),
}

impl Transport {
    pub fn kind(&self) -> &'static str {
        match self {
            Transport::Network(_) => "network",
            Transport::Spooler(_) => "spooler",
            Transport::Unavailable(_) => "unavailable",
        }
    }
}

impl Printer for Transport {
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        match self {
            Transport::Network(p) => p.print(data).await,
            Transport::Spooler(p) => p.print(data).await,
            Transport::Unavailable(reason) => Err(PrintError::Unavailable(reason.clone())),
        }
    }

    async fn is_online(&self) -> bool {
        match self {
            Transport::Network(p) => p.is_online().await,
            Transport::Spooler(p) => p.is_online().await,
            Transport::Unavailable(_) => false,
        }
    }
}

/// Builds transports for printer rows with the agent's timeouts and
/// spooler capability
#[derive(Debug, Clone)]
pub struct TransportFactory {
    probe_timeout: Duration,
    send_timeout: Duration,
    spooler_command: Option<String>,
}

impl TransportFactory {
    pub fn new(
        probe_timeout: Duration,
        send_timeout: Duration,
        spooler_command: Option<String>,
    ) -> Self {
        Self {
            probe_timeout,
            send_timeout,
            spooler_command,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.probe_timeout,
            config.send_timeout,
            config.spooler_command.clone(),
        )
    }

    pub fn for_printer(&self, printer: &PrinterConfig) -> Transport {
        match self.build(printer) {
            Ok(transport) => transport,
            Err(reason) => {
                tracing::warn!(printer = %printer.name, printer_id = printer.id, %reason, "Printer transport unavailable");
                Transport::Unavailable(reason)
            }
        }
    }

    fn build(&self, printer: &PrinterConfig) -> Result<Transport, String> {
        match printer.connection_kind()? {
            ConnectionKind::Network => {
                let host = printer
                    .host
                    .as_deref()
                    .ok_or_else(|| format!("printer '{}' has no host", printer.name))?;
                let port = match printer.port {
                    None => DEFAULT_PORT,
                    Some(port) => u16::try_from(port)
                        .map_err(|_| format!("printer '{}' has invalid port {}", printer.name, port))?,
                };
                let network = NetworkPrinter::new(host, port)
                    .map_err(|e| e.to_string())?
                    .with_probe_timeout(self.probe_timeout)
                    .with_send_timeout(self.send_timeout);
                Ok(Transport::Network(network))
            }
            ConnectionKind::Spooler => {
                let command = self
                    .spooler_command
                    .as_deref()
                    .ok_or_else(|| "spooler printing is disabled on this agent".to_string())?;
                let device = printer.device_name.as_deref().unwrap_or(&printer.name);
                let spooler = SpoolerPrinter::new(device, command).map_err(|e| e.to_string())?;
                Ok(Transport::Spooler(spooler))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::*;

    fn row(connection: &str) -> PrinterConfig {
        PrinterConfig {
            id: 1,
            name: "Kitchen".into(),
            is_active: true,
            station: "kitchen".into(),
            company_id: None,
            brand_id: None,
            store_id: None,
            connection: connection.into(),
            host: Some("127.0.0.1".into()),
            port: Some(9100),
            device_name: Some("kitchen_queue".into()),
            chars_per_line: 32,
            code_page: "utf8".into(),
            profile: "hrpt".into(),
            sort_order: 0,
            success_count: 0,
            fail_count: 0,
            last_print_at: None,
            last_error_at: None,
        }
    }

    fn factory(spooler: Option<&str>) -> TransportFactory {
        TransportFactory::new(
            Duration::from_millis(500),
            Duration::from_secs(2),
            spooler.map(String::from),
        )
    }

    #[test]
    fn test_selects_channel_from_row() {
        let f = factory(Some("lp"));
        assert!(matches!(f.for_printer(&row("network")), Transport::Network(ref p) if p.target() == "127.0.0.1:9100"));
        assert!(matches!(f.for_printer(&row("spooler")), Transport::Spooler(ref p) if p.device() == "kitchen_queue"));
    }

    #[test]
    fn test_unusable_rows_are_unavailable() {
        let f = factory(None);
        assert_eq!(f.for_printer(&row("spooler")).kind(), "unavailable");
        assert_eq!(f.for_printer(&row("bluetooth")).kind(), "unavailable");

        let mut no_host = row("network");
        no_host.host = None;
        assert_eq!(f.for_printer(&no_host).kind(), "unavailable");

        let mut bad_port = row("network");
        bad_port.port = Some(70_000);
        assert_eq!(f.for_printer(&bad_port).kind(), "unavailable");
    }

    #[tokio::test]
    async fn test_unavailable_fails_without_io() {
        let transport = factory(None).for_printer(&row("spooler"));
        assert!(matches!(transport.print(b"job").await, Err(PrintError::Unavailable(_))));
        assert!(!transport.is_online().await);
    }

    #[tokio::test]
    async fn test_network_transport_delivers() {
        let (port, received) = recording_printer().await;
        let mut printer = row("network");
        printer.port = Some(i64::from(port));

        let transport = factory(None).for_printer(&printer);
        transport.print(b"\x1B@ticket").await.unwrap();
        assert_eq!(wait_for_bytes(&received).await, b"\x1B@ticket");
    }
}
