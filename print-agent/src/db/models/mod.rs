//! Database models
//!
//! Row types for the tables the agent reads and writes.

pub mod station_printer;
pub mod ticket;

pub use station_printer::{ConnectionKind, PrinterConfig, PrinterHealthCheck, ScopeLevel};
pub use ticket::{
    Ticket, TicketItem, TicketLogEntry, TicketScope, TicketStatus, TicketStatusCounts,
};
