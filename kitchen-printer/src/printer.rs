//! Transports that deliver a finished ESC/POS stream
//!
//! [`NetworkPrinter`] writes to a raw TCP port; [`SpoolerPrinter`] hands the
//! bytes to a local queue through `lp` or `lpr`. Neither retries.

use crate::error::{PrintError, PrintResult};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::{info, instrument, warn};

/// Conventional raw printing port
pub const DEFAULT_PORT: u16 = 9100;

/// A destination for ESC/POS bytes
#[allow(async_fn_in_trait)]
pub trait Printer {
    /// Deliver `data` once
    async fn print(&self, data: &[u8]) -> PrintResult<()>;

    async fn is_online(&self) -> bool;
}

/// Printer reached over TCP, usually on [`DEFAULT_PORT`]
///
/// Printing is two-phase: a short reachability probe, then a fresh
/// connection that carries the data under its own, longer timeout.
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    host: String,
    port: u16,
    probe_timeout: Duration,
    send_timeout: Duration,
}

impl NetworkPrinter {
    /// Fails with [`PrintError::InvalidConfig`] for an empty host or port 0
    pub fn new(host: &str, port: u16) -> PrintResult<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(PrintError::InvalidConfig("Empty printer host".to_string()));
        }
        if port == 0 {
            return Err(PrintError::InvalidConfig(format!(
                "Invalid port for {}: 0",
                host
            )));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            probe_timeout: Duration::from_secs(3),
            send_timeout: Duration::from_secs(10),
        })
    }

    /// Set the reachability probe timeout
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the timeout covering connect + write of the print job
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// `host:port` of the printer
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connect and immediately disconnect, returning the connect latency
    #[instrument(skip(self), fields(target = %self.target()))]
    pub async fn probe(&self) -> PrintResult<Duration> {
        let target = self.target();
        let started = Instant::now();

        let stream = tokio::time::timeout(
            self.probe_timeout,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        .map_err(|_| PrintError::Timeout(format!("Probe timeout: {}", target)))?
        .map_err(|e| PrintError::from_io(&target, e))?;
        drop(stream);

        Ok(started.elapsed())
    }

    async fn send(&self, data: &[u8]) -> PrintResult<()> {
        let target = self.target();

        let mut stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| PrintError::from_io(&target, e))?;

        tracing::debug!(bytes = data.len(), "Send connection open");

        stream
            .write_all(data)
            .await
            .map_err(|e| PrintError::from_io(&target, e))?;
        stream
            .flush()
            .await
            .map_err(|e| PrintError::from_io(&target, e))?;
        stream
            .shutdown()
            .await
            .map_err(|e| PrintError::from_io(&target, e))?;
        Ok(())
    }
}

impl Printer for NetworkPrinter {
    #[instrument(skip(self, data), fields(target = %self.target(), data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let latency = self.probe().await?;
        info!(latency_ms = latency.as_millis() as u64, "Printer reachable");

        // The printer can drop between probe and send; that surfaces as an
        // ordinary error from the second connection.
        tokio::time::timeout(self.send_timeout, self.send(data))
            .await
            .map_err(|_| PrintError::Timeout(format!("Send timeout: {}", self.target())))??;

        info!("Ticket bytes delivered");
        Ok(())
    }

    async fn is_online(&self) -> bool {
        match self.probe().await {
            Ok(_) => true,
            Err(e) => {
                warn!(target = %self.target(), error = %e, "Printer offline");
                false
            }
        }
    }
}

/// Printer behind the local print spooler
///
/// The job is piped to the spooler command as a raw document. The spooler
/// is a black box: only the exit status is observed.
#[derive(Debug, Clone)]
pub struct SpoolerPrinter {
    device: String,
    command: String,
    timeout: Duration,
}

impl SpoolerPrinter {
    pub fn new(device: &str, command: &str) -> PrintResult<Self> {
        if device.trim().is_empty() {
            return Err(PrintError::InvalidConfig("Empty spooler device".to_string()));
        }
        if command.trim().is_empty() {
            return Err(PrintError::Unavailable("No spooler command".to_string()));
        }
        Ok(Self {
            device: device.trim().to_string(),
            command: command.trim().to_string(),
            timeout: Duration::from_secs(30),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Arguments selecting the queue and raw mode
    fn args(&self) -> Vec<&str> {
        let program = std::path::Path::new(&self.command)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.command);
        let queue_flag = if program == "lpr" { "-P" } else { "-d" };
        vec![queue_flag, self.device.as_str(), "-o", "raw"]
    }

    async fn run(&self, data: &[u8]) -> PrintResult<()> {
        let mut child = Command::new(&self.command)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PrintError::Spooler(format!("Failed to start {}: {}", self.command, e)))?;

        // A spooler that exits before reading everything reports through its
        // exit status, so a broken pipe here is not an error by itself.
        if let Some(mut stdin) = child.stdin.take()
            && let Err(e) = stdin.write_all(data).await
            && e.kind() != std::io::ErrorKind::BrokenPipe
        {
            return Err(e.into());
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PrintError::Spooler(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl Printer for SpoolerPrinter {
    #[instrument(skip(self, data), fields(device = %self.device, data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        tokio::time::timeout(self.timeout, self.run(data))
            .await
            .map_err(|_| PrintError::Timeout(format!("Spooler timeout: {}", self.device)))??;

        info!("Print job handed to spooler");
        Ok(())
    }

    /// Spooler queues accept jobs even while the device is offline
    async fn is_online(&self) -> bool {
        true
    }
}
