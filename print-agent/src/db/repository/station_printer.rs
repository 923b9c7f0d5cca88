//! Station Printer Repository

use super::RepoResult;
use crate::db::models::PrinterConfig;
use crate::utils::time::now_millis;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

const PRINTER_SELECT: &str = "SELECT id, name, is_active, station, company_id, brand_id, store_id, \
     connection, host, port, device_name, chars_per_line, code_page, profile, sort_order, \
     success_count, fail_count, last_print_at, last_error_at FROM station_printer";

/// Active printers routed to `station`, in id order
pub async fn find_active_by_station(
    pool: &SqlitePool,
    station: &str,
) -> RepoResult<Vec<PrinterConfig>> {
    let printers = sqlx::query_as::<_, PrinterConfig>(&format!(
        "{PRINTER_SELECT} WHERE station = ? AND is_active = 1 ORDER BY id"
    ))
    .bind(station)
    .fetch_all(pool)
    .await?;
    Ok(printers)
}

/// Active printers of the given stations (all stations when empty)
pub async fn find_active(pool: &SqlitePool, stations: &[String]) -> RepoResult<Vec<PrinterConfig>> {
    let mut qb = QueryBuilder::<Sqlite>::new(PRINTER_SELECT);
    qb.push(" WHERE is_active = 1");
    if !stations.is_empty() {
        qb.push(" AND station IN (");
        let mut separated = qb.separated(", ");
        for station in stations {
            separated.push_bind(station.as_str());
        }
        separated.push_unseparated(")");
    }
    qb.push(" ORDER BY station, id");

    let printers = qb.build_query_as::<PrinterConfig>().fetch_all(pool).await?;
    Ok(printers)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<PrinterConfig>> {
    let printer = sqlx::query_as::<_, PrinterConfig>(&format!("{PRINTER_SELECT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(printer)
}

/// Count one completed attempt against a printer
///
/// Plain increments without cross-process locking; concurrent agents may
/// interleave, the counters are an approximation.
pub async fn bump_stat(pool: &SqlitePool, printer_id: i64, success: bool) -> RepoResult<()> {
    let sql = if success {
        "UPDATE station_printer SET success_count = success_count + 1, last_print_at = ? WHERE id = ?"
    } else {
        "UPDATE station_printer SET fail_count = fail_count + 1, last_error_at = ? WHERE id = ?"
    };
    sqlx::query(sql)
        .bind(now_millis())
        .bind(printer_id)
        .execute(pool)
        .await?;
    Ok(())
}
