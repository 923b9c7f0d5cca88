//! Printer resolution
//!
//! Picks the single printer a ticket goes to: among the active rows of the
//! ticket's station whose scope covers the ticket, the most specific wins
//! (store > brand > company), then the lowest `sort_order`, then the lowest id.

use super::error::PrintJobError;
use crate::db::models::{PrinterConfig, TicketScope};
use crate::db::repository::station_printer;
use sqlx::SqlitePool;
use std::cmp::Reverse;

/// Choose the best candidate for `station` / `scope`
pub fn select_printer<'a>(
    candidates: &'a [PrinterConfig],
    station: &str,
    scope: &TicketScope,
) -> Option<&'a PrinterConfig> {
    candidates
        .iter()
        .filter(|p| p.is_active && p.station == station && p.covers(scope))
        .min_by_key(|p| (Reverse(p.scope_level()), p.sort_order, p.id))
}

/// Load the station's printers and select one
pub async fn resolve(
    pool: &SqlitePool,
    station: &str,
    scope: &TicketScope,
) -> Result<PrinterConfig, PrintJobError> {
    let candidates = station_printer::find_active_by_station(pool, station).await?;
    select_printer(&candidates, station, scope)
        .cloned()
        .ok_or_else(|| PrintJobError::PrinterNotFound {
            station: station.to_string(),
        })
}
