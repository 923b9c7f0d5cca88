//! Station Printer Model

use super::ticket::TicketScope;
use kitchen_printer::{Profile, TextEncoding};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Physical channel a printer is reached through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    /// Raw TCP (port 9100)
    Network,
    /// Local OS print spooler
    Spooler,
}

impl FromStr for ConnectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "network" => Ok(ConnectionKind::Network),
            // "win32" / "driver" rows come from older admin screens
            "spooler" | "win32" | "driver" => Ok(ConnectionKind::Spooler),
            other => Err(format!("unknown printer connection: {}", other)),
        }
    }
}

/// How broadly a printer configuration applies (ordered least → most specific)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeLevel {
    Company,
    Brand,
    Store,
}

/// Printer routing entry for a station
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PrinterConfig {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    pub station: String,
    pub company_id: Option<i64>,
    pub brand_id: Option<i64>,
    pub store_id: Option<i64>,
    /// "network" | "spooler"
    pub connection: String,
    pub host: Option<String>,
    pub port: Option<i64>,
    /// Spooler queue name
    pub device_name: Option<String>,
    pub chars_per_line: i64,
    /// "utf8" | "gbk"
    pub code_page: String,
    /// "hrpt" | "epson"
    pub profile: String,
    pub sort_order: i64,
    pub success_count: i64,
    pub fail_count: i64,
    pub last_print_at: Option<i64>,
    pub last_error_at: Option<i64>,
}

impl PrinterConfig {
    pub fn scope_level(&self) -> ScopeLevel {
        if self.store_id.is_some() {
            ScopeLevel::Store
        } else if self.brand_id.is_some() {
            ScopeLevel::Brand
        } else {
            ScopeLevel::Company
        }
    }

    /// Whether this configuration may serve a ticket of the given scope
    ///
    /// A company-wide row without `company_id` serves every company.
    pub fn covers(&self, scope: &TicketScope) -> bool {
        match self.scope_level() {
            ScopeLevel::Store => self.store_id == scope.store_id,
            ScopeLevel::Brand => self.brand_id == scope.brand_id,
            ScopeLevel::Company => self.company_id.is_none() || self.company_id == scope.company_id,
        }
    }

    pub fn connection_kind(&self) -> Result<ConnectionKind, String> {
        self.connection.parse()
    }

    /// Unknown profile names fall back to HRPT
    pub fn command_profile(&self) -> Profile {
        self.profile.parse().unwrap_or_default()
    }

    /// Unknown code pages fall back to UTF-8
    pub fn text_encoding(&self) -> TextEncoding {
        self.code_page.parse().unwrap_or_default()
    }

    /// Paper width in characters, never below 16
    pub fn width(&self) -> usize {
        usize::try_from(self.chars_per_line).unwrap_or(32).max(16)
    }

    /// Human readable address for logs and error messages
    pub fn endpoint(&self) -> String {
        match self.connection_kind() {
            Ok(ConnectionKind::Spooler) => {
                format!("spooler:{}", self.device_name.as_deref().unwrap_or("?"))
            }
            _ => format!(
                "{}:{}",
                self.host.as_deref().unwrap_or("?"),
                self.port.unwrap_or(i64::from(kitchen_printer::DEFAULT_PORT))
            ),
        }
    }
}

/// Result of one reachability probe against a printer
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PrinterHealthCheck {
    pub printer_id: i64,
    pub checked_at: i64,
    pub is_online: bool,
    pub response_time_ms: Option<i64>,
    pub error_message: Option<String>,
}
