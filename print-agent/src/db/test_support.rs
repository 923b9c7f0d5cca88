//! Shared fixtures for database-backed tests

use super::MIGRATOR;
use super::models::TicketScope;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

/// In-memory database with the real schema
///
/// A single connection that never expires, otherwise every new
/// connection would see its own empty `:memory:` database.
pub async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    MIGRATOR.run(&pool).await.unwrap();
    pool
}

pub async fn insert_bill(pool: &SqlitePool, scope: &TicketScope, table: Option<&str>) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO bill (bill_number, table_name, company_id, brand_id, store_id, brand_name) \
         VALUES ('B-0001', ?, ?, ?, ?, 'Warung') RETURNING id",
    )
    .bind(table)
    .bind(scope.company_id)
    .bind(scope.brand_id)
    .bind(scope.store_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Insert a `new` ticket with its items `(quantity, name, notes)`
pub async fn insert_ticket(
    pool: &SqlitePool,
    bill_id: i64,
    station: &str,
    created_at: i64,
    items: &[(i64, &str, Option<&str>)],
) -> i64 {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO kitchen_ticket (bill_id, station, created_at) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(bill_id)
    .bind(station)
    .bind(created_at)
    .fetch_one(pool)
    .await
    .unwrap();

    for (position, (quantity, name, notes)) in items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO kitchen_ticket_item (ticket_id, position, quantity, name, notes) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(position as i64)
        .bind(quantity)
        .bind(name)
        .bind(notes)
        .execute(pool)
        .await
        .unwrap();
    }
    id
}

/// Printer row to seed; defaults to an active company-wide network printer
#[derive(Debug, Clone)]
pub struct PrinterSeed {
    pub name: &'static str,
    pub station: &'static str,
    pub is_active: bool,
    pub company_id: Option<i64>,
    pub brand_id: Option<i64>,
    pub store_id: Option<i64>,
    pub connection: &'static str,
    pub host: Option<&'static str>,
    pub port: Option<i64>,
    pub device_name: Option<&'static str>,
    pub sort_order: i64,
}

impl Default for PrinterSeed {
    fn default() -> Self {
        Self {
            name: "Kitchen",
            station: "kitchen",
            is_active: true,
            company_id: None,
            brand_id: None,
            store_id: None,
            connection: "network",
            host: Some("127.0.0.1"),
            port: Some(9100),
            device_name: None,
            sort_order: 0,
        }
    }
}

pub async fn insert_printer(pool: &SqlitePool, seed: PrinterSeed) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO station_printer \
         (name, is_active, station, company_id, brand_id, store_id, connection, host, port, device_name, sort_order) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(seed.name)
    .bind(seed.is_active)
    .bind(seed.station)
    .bind(seed.company_id)
    .bind(seed.brand_id)
    .bind(seed.store_id)
    .bind(seed.connection)
    .bind(seed.host)
    .bind(seed.port)
    .bind(seed.device_name)
    .bind(seed.sort_order)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Loopback "printer" that records every byte it receives
pub async fn recording_printer() -> (u16, Arc<Mutex<Vec<u8>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = Vec::new();
            let _ = socket.read_to_end(&mut buf).await;
            sink.lock().unwrap().extend_from_slice(&buf);
        }
    });
    (port, received)
}

/// A port nothing listens on
pub async fn refused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Wait until the recording printer has seen at least one byte
pub async fn wait_for_bytes(received: &Arc<Mutex<Vec<u8>>>) -> Vec<u8> {
    for _ in 0..100 {
        if !received.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    received.lock().unwrap().clone()
}
