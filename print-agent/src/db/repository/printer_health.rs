//! Printer Health Check Repository

use super::RepoResult;
use crate::db::models::PrinterHealthCheck;
use sqlx::SqlitePool;

pub async fn insert(pool: &SqlitePool, check: &PrinterHealthCheck) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO printer_health_check \
         (printer_id, checked_at, is_online, response_time_ms, error_message) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(check.printer_id)
    .bind(check.checked_at)
    .bind(check.is_online)
    .bind(check.response_time_ms)
    .bind(&check.error_message)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete checks taken before `cutoff` (Unix millis); returns how many went
pub async fn delete_older_than(pool: &SqlitePool, cutoff: i64) -> RepoResult<u64> {
    let deleted = sqlx::query("DELETE FROM printer_health_check WHERE checked_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(deleted)
}

/// Most recent checks first
pub async fn find_for_printer(
    pool: &SqlitePool,
    printer_id: i64,
    limit: i64,
) -> RepoResult<Vec<PrinterHealthCheck>> {
    let checks = sqlx::query_as::<_, PrinterHealthCheck>(
        "SELECT printer_id, checked_at, is_online, response_time_ms, error_message \
         FROM printer_health_check WHERE printer_id = ? ORDER BY checked_at DESC, id DESC LIMIT ?",
    )
    .bind(printer_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(checks)
}
