//! Kitchen Ticket Repository
//!
//! Every status change is a guarded `UPDATE ... WHERE status = <expected>`.
//! A guard that matches no row is a no-op, which is what keeps terminal
//! tickets immutable and makes the claim an exclusive compare-and-swap
//! across agent processes sharing the same database.

use super::RepoResult;
use crate::db::models::{Ticket, TicketItem, TicketLogEntry, TicketStatus, TicketStatusCounts};
use crate::utils::time::now_millis;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::time::Duration;

const TICKET_SELECT: &str = "SELECT t.id, t.bill_id, t.station, t.status, t.print_attempts, \
     t.max_retries, t.last_error, t.printer_id, t.created_at, t.claimed_at, t.printed_at, \
     b.bill_number, b.table_name, b.brand_name, b.company_id, b.brand_id, b.store_id \
     FROM kitchen_ticket t LEFT JOIN bill b ON b.id = t.bill_id";

/// Load a ticket with its bill fields and items
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Ticket>> {
    let ticket = sqlx::query_as::<_, Ticket>(&format!("{TICKET_SELECT} WHERE t.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match ticket {
        Some(mut ticket) => {
            ticket.items = find_items(pool, id).await?;
            Ok(Some(ticket))
        }
        None => Ok(None),
    }
}

pub async fn find_items(pool: &SqlitePool, ticket_id: i64) -> RepoResult<Vec<TicketItem>> {
    let items = sqlx::query_as::<_, TicketItem>(
        "SELECT quantity, name, notes FROM kitchen_ticket_item WHERE ticket_id = ? ORDER BY position, id",
    )
    .bind(ticket_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

/// Claim up to `limit` pending tickets, oldest first
///
/// Candidates that another claimant wins between the select and the
/// compare-and-swap are skipped silently. An empty `stations` slice means
/// every station. If the store fails part way, tickets already claimed by
/// this call are released before the error is returned.
pub async fn claim_next_batch(
    pool: &SqlitePool,
    limit: i64,
    stations: &[String],
    actor: &str,
) -> RepoResult<Vec<Ticket>> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT id FROM kitchen_ticket WHERE status = 'new'");
    if !stations.is_empty() {
        qb.push(" AND station IN (");
        let mut separated = qb.separated(", ");
        for station in stations {
            separated.push_bind(station.as_str());
        }
        separated.push_unseparated(")");
    }
    qb.push(" ORDER BY created_at, id LIMIT ");
    qb.push_bind(limit);

    let candidates = qb.build_query_scalar::<i64>().fetch_all(pool).await?;

    let mut claimed: Vec<Ticket> = Vec::with_capacity(candidates.len());
    for id in candidates {
        let won = match mark_printing(pool, id, actor).await {
            Ok(won) => won,
            Err(e) => {
                release_all(pool, claimed.iter().map(|t| t.id), actor).await;
                return Err(e);
            }
        };
        if !won {
            tracing::debug!(ticket_id = id, "Ticket claimed by another agent, skipping");
            continue;
        }

        match find_by_id(pool, id).await {
            Ok(Some(ticket)) => claimed.push(ticket),
            Ok(None) => {}
            Err(e) => {
                let held = claimed.iter().map(|t| t.id).chain(std::iter::once(id));
                release_all(pool, held, actor).await;
                return Err(e);
            }
        }
    }
    Ok(claimed)
}

/// Best-effort release of claims the caller can no longer hand out
async fn release_all(pool: &SqlitePool, ids: impl Iterator<Item = i64>, actor: &str) {
    for id in ids {
        if let Err(e) = release_claim(pool, id, actor).await {
            tracing::warn!(ticket_id = id, error = %e, "Failed to release claim after store error");
        }
    }
}

/// `new → printing`; true only for the caller that won the ticket
pub async fn mark_printing(pool: &SqlitePool, id: i64, actor: &str) -> RepoResult<bool> {
    let now = now_millis();
    let mut tx = pool.begin().await?;
    let rows = sqlx::query(
        "UPDATE kitchen_ticket SET status = 'printing', claimed_at = ? WHERE id = ? AND status = 'new'",
    )
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if rows == 1 {
        insert_log(
            &mut tx,
            &TicketLogEntry {
                ticket_id: id,
                timestamp: now,
                old_status: TicketStatus::New.to_string(),
                new_status: TicketStatus::Printing.to_string(),
                action: "claim".into(),
                actor: actor.into(),
                printer_id: None,
                message: None,
            },
        )
        .await?;
    }
    tx.commit().await?;
    Ok(rows == 1)
}

/// `printing → printed`
pub async fn mark_printed(
    pool: &SqlitePool,
    id: i64,
    printer_id: i64,
    actor: &str,
) -> RepoResult<bool> {
    let now = now_millis();
    let mut tx = pool.begin().await?;
    let rows = sqlx::query(
        "UPDATE kitchen_ticket SET status = 'printed', printed_at = ?, printer_id = ? \
         WHERE id = ? AND status = 'printing'",
    )
    .bind(now)
    .bind(printer_id)
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if rows == 1 {
        insert_log(
            &mut tx,
            &TicketLogEntry {
                ticket_id: id,
                timestamp: now,
                old_status: TicketStatus::Printing.to_string(),
                new_status: TicketStatus::Printed.to_string(),
                action: "print".into(),
                actor: actor.into(),
                printer_id: Some(printer_id),
                message: None,
            },
        )
        .await?;
    }
    tx.commit().await?;
    Ok(rows == 1)
}

/// `printing → new` with one more recorded attempt
pub async fn mark_retry(
    pool: &SqlitePool,
    id: i64,
    error: &str,
    printer_id: Option<i64>,
    actor: &str,
) -> RepoResult<bool> {
    let now = now_millis();
    let mut tx = pool.begin().await?;
    let rows = sqlx::query(
        "UPDATE kitchen_ticket SET status = 'new', print_attempts = print_attempts + 1, \
         last_error = ?, claimed_at = NULL, printer_id = COALESCE(?, printer_id) \
         WHERE id = ? AND status = 'printing'",
    )
    .bind(error)
    .bind(printer_id)
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if rows == 1 {
        insert_log(
            &mut tx,
            &TicketLogEntry {
                ticket_id: id,
                timestamp: now,
                old_status: TicketStatus::Printing.to_string(),
                new_status: TicketStatus::New.to_string(),
                action: "retry".into(),
                actor: actor.into(),
                printer_id,
                message: Some(error.to_string()),
            },
        )
        .await?;
    }
    tx.commit().await?;
    Ok(rows == 1)
}

/// `printing → failed`; attempts are left as they are
pub async fn mark_failed(
    pool: &SqlitePool,
    id: i64,
    error: &str,
    printer_id: Option<i64>,
    actor: &str,
) -> RepoResult<bool> {
    let now = now_millis();
    let mut tx = pool.begin().await?;
    let rows = sqlx::query(
        "UPDATE kitchen_ticket SET status = 'failed', last_error = ?, \
         printer_id = COALESCE(?, printer_id) WHERE id = ? AND status = 'printing'",
    )
    .bind(error)
    .bind(printer_id)
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if rows == 1 {
        insert_log(
            &mut tx,
            &TicketLogEntry {
                ticket_id: id,
                timestamp: now,
                old_status: TicketStatus::Printing.to_string(),
                new_status: TicketStatus::Failed.to_string(),
                action: "fail".into(),
                actor: actor.into(),
                printer_id,
                message: Some(error.to_string()),
            },
        )
        .await?;
    }
    tx.commit().await?;
    Ok(rows == 1)
}

/// `printing → new` for a claim that was never attempted
pub async fn release_claim(pool: &SqlitePool, id: i64, actor: &str) -> RepoResult<bool> {
    release(pool, id, actor, "release", None).await
}

async fn release(
    pool: &SqlitePool,
    id: i64,
    actor: &str,
    action: &str,
    message: Option<String>,
) -> RepoResult<bool> {
    let now = now_millis();
    let mut tx = pool.begin().await?;
    let rows = sqlx::query(
        "UPDATE kitchen_ticket SET status = 'new', claimed_at = NULL WHERE id = ? AND status = 'printing'",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if rows == 1 {
        insert_log(
            &mut tx,
            &TicketLogEntry {
                ticket_id: id,
                timestamp: now,
                old_status: TicketStatus::Printing.to_string(),
                new_status: TicketStatus::New.to_string(),
                action: action.into(),
                actor: actor.into(),
                printer_id: None,
                message,
            },
        )
        .await?;
    }
    tx.commit().await?;
    Ok(rows == 1)
}

/// Release tickets left in `printing` longer than `older_than`
///
/// Returns how many tickets went back to `new`.
pub async fn recover_stale_claims(
    pool: &SqlitePool,
    older_than: Duration,
    actor: &str,
) -> RepoResult<u64> {
    let window = i64::try_from(older_than.as_millis()).unwrap_or(i64::MAX);
    let cutoff = now_millis().saturating_sub(window);

    let stale: Vec<i64> = sqlx::query_scalar(
        "SELECT id FROM kitchen_ticket WHERE status = 'printing' \
         AND (claimed_at IS NULL OR claimed_at < ?) ORDER BY id",
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    let mut recovered = 0;
    for id in stale {
        let message = Some(format!("claim older than {}s recovered", older_than.as_secs()));
        if release(pool, id, actor, "recover", message).await? {
            recovered += 1;
        }
    }
    Ok(recovered)
}

/// Ticket totals; `printed_today` counts prints since `day_start` (Unix millis)
pub async fn status_counts(pool: &SqlitePool, day_start: i64) -> RepoResult<TicketStatusCounts> {
    let counts = sqlx::query_as::<_, TicketStatusCounts>(
        "SELECT \
           COALESCE(SUM(CASE WHEN status = 'new' THEN 1 ELSE 0 END), 0) AS pending, \
           COALESCE(SUM(CASE WHEN status = 'printing' THEN 1 ELSE 0 END), 0) AS printing, \
           COALESCE(SUM(CASE WHEN status = 'printed' AND printed_at >= ? THEN 1 ELSE 0 END), 0) AS printed_today, \
           COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0) AS failed \
         FROM kitchen_ticket",
    )
    .bind(day_start)
    .fetch_one(pool)
    .await?;
    Ok(counts)
}

/// Audit trail of a ticket, oldest first
pub async fn find_logs(pool: &SqlitePool, ticket_id: i64) -> RepoResult<Vec<TicketLogEntry>> {
    let logs = sqlx::query_as::<_, TicketLogEntry>(
        "SELECT ticket_id, timestamp, old_status, new_status, action, actor, printer_id, message \
         FROM kitchen_ticket_log WHERE ticket_id = ? ORDER BY id",
    )
    .bind(ticket_id)
    .fetch_all(pool)
    .await?;
    Ok(logs)
}

async fn insert_log(conn: &mut SqliteConnection, entry: &TicketLogEntry) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO kitchen_ticket_log \
         (ticket_id, timestamp, old_status, new_status, action, actor, printer_id, message) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(entry.ticket_id)
    .bind(entry.timestamp)
    .bind(&entry.old_status)
    .bind(&entry.new_status)
    .bind(&entry.action)
    .bind(&entry.actor)
    .bind(entry.printer_id)
    .bind(&entry.message)
    .execute(conn)
    .await?;
    Ok(())
}
