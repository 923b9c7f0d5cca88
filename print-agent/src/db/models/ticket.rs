//! Kitchen Ticket Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticket lifecycle state
///
/// `new → printing → {printed | failed}`, with `printing → new` for retries.
/// `printed` and `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TicketStatus {
    New,
    Printing,
    Printed,
    Failed,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::New => "new",
            TicketStatus::Printing => "printing",
            TicketStatus::Printed => "printed",
            TicketStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TicketStatus::Printed | TicketStatus::Failed)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ownership scope of the bill a ticket belongs to
///
/// Tickets do not carry scope themselves; it comes from the bill join.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TicketScope {
    pub company_id: Option<i64>,
    pub brand_id: Option<i64>,
    pub store_id: Option<i64>,
}

/// One line of a kitchen ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TicketItem {
    pub quantity: i64,
    pub name: String,
    pub notes: Option<String>,
}

/// A print job, hydrated with its bill fields and items
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ticket {
    pub id: i64,
    pub bill_id: i64,
    /// Station target, e.g. "kitchen" / "bar" / "dessert"
    pub station: String,
    pub status: TicketStatus,
    pub print_attempts: i64,
    pub max_retries: i64,
    pub last_error: Option<String>,
    pub printer_id: Option<i64>,
    /// Unix millis
    pub created_at: i64,
    pub claimed_at: Option<i64>,
    pub printed_at: Option<i64>,

    // -- From the bill join --
    pub bill_number: Option<String>,
    pub table_name: Option<String>,
    pub brand_name: Option<String>,
    #[sqlx(flatten)]
    pub scope: TicketScope,

    // -- Relations (populated by repository code, skipped by FromRow) --
    #[sqlx(skip)]
    #[serde(default)]
    pub items: Vec<TicketItem>,
}

/// Audit row written with every status transition
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TicketLogEntry {
    pub ticket_id: i64,
    pub timestamp: i64,
    pub old_status: String,
    pub new_status: String,
    pub action: String,
    pub actor: String,
    pub printer_id: Option<i64>,
    pub message: Option<String>,
}

/// Ticket totals shown on the health surface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TicketStatusCounts {
    pub pending: i64,
    pub printing: i64,
    pub printed_today: i64,
    pub failed: i64,
}
