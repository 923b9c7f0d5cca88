//! Health check routes

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};

use crate::core::AgentState;
use crate::db::DbService;
use crate::db::models::TicketStatusCounts;
use crate::db::repository::ticket as ticket_repo;
use crate::printing::MetricsSnapshot;
use crate::utils::time::start_of_day_millis;

const SERVICE_NAME: &str = "print-agent";

pub fn router() -> Router<AgentState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ping", get(ping))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// healthy | degraded
    status: &'static str,
    service: &'static str,
    version: &'static str,
    uptime_seconds: u64,
    uptime_formatted: String,
    /// connected | disconnected
    database: &'static str,
    last_poll: Option<String>,
    metrics: HealthMetrics,
}

#[derive(Debug, Serialize)]
pub struct HealthMetrics {
    tickets_processed: u64,
    tickets_retried: u64,
    tickets_failed: u64,
    success_rate: f64,
    pending_tickets: i64,
    printing_tickets: i64,
    printed_today: i64,
    failed_tickets: i64,
}

async fn health(State(state): State<AgentState>) -> (StatusCode, Json<HealthResponse>) {
    let snapshot = state.metrics.snapshot();

    let connected = match DbService::ping(&state.pool).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check: store unreachable");
            false
        }
    };

    let counts = if connected {
        let day_start = start_of_day_millis(Utc::now(), state.config.timezone);
        ticket_repo::status_counts(&state.pool, day_start)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Health check: failed to count tickets");
                TicketStatusCounts::default()
            })
    } else {
        TicketStatusCounts::default()
    };

    let status = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = HealthResponse {
        status: if connected { "healthy" } else { "degraded" },
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: snapshot.uptime_seconds,
        uptime_formatted: snapshot.uptime_formatted.clone(),
        database: if connected { "connected" } else { "disconnected" },
        last_poll: snapshot.last_poll.clone(),
        metrics: HealthMetrics {
            tickets_processed: snapshot.tickets_processed,
            tickets_retried: snapshot.tickets_retried,
            tickets_failed: snapshot.tickets_failed,
            success_rate: snapshot.success_rate,
            pending_tickets: counts.pending,
            printing_tickets: counts.printing,
            printed_today: counts.printed_today,
            failed_tickets: counts.failed,
        },
    };

    (status, Json(body))
}

async fn metrics(State(state): State<AgentState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

async fn ping() -> Json<Value> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::db::models::TicketScope;
    use crate::db::test_support::*;
    use crate::printing::AgentMetrics;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn state() -> AgentState {
        AgentState::new(
            Arc::new(Config::default()),
            memory_pool().await,
            Arc::new(AgentMetrics::new()),
        )
    }

    async fn get_json(state: AgentState, path: &str) -> (StatusCode, Value) {
        let response = crate::api::router(state)
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_ping() {
        let (status, body) = get_json(state().await, "/ping").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok", "service": "print-agent" }));
    }

    #[tokio::test]
    async fn test_health_reports_counts_and_metrics() {
        let state = state().await;
        let bill = insert_bill(&state.pool, &TicketScope::default(), None).await;
        insert_ticket(&state.pool, bill, "kitchen", 1, &[(1, "A", None)]).await;
        insert_ticket(&state.pool, bill, "kitchen", 2, &[(1, "B", None)]).await;
        state.metrics.record_printed();
        state.metrics.record_poll(1_700_000_000_000);

        let (status, body) = get_json(state, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "print-agent");
        assert_eq!(body["database"], "connected");
        assert_eq!(body["last_poll"], "2023-11-14T22:13:20+00:00");
        assert!(body["uptime_seconds"].is_u64());
        assert!(body["uptime_formatted"].is_string());
        assert_eq!(body["metrics"]["pending_tickets"], 2);
        assert_eq!(body["metrics"]["tickets_processed"], 1);
        assert_eq!(body["metrics"]["success_rate"], 100.0);
    }

    #[tokio::test]
    async fn test_health_degraded_when_store_down() {
        let state = state().await;
        state.pool.close().await;

        let (status, body) = get_json(state, "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["database"], "disconnected");
        assert_eq!(body["metrics"]["pending_tickets"], 0);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let state = state().await;
        state.metrics.record_failed();

        let (status, body) = get_json(state, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tickets_failed"], 1);
        assert_eq!(body["success_rate"], 0.0);
        assert!(body["last_poll"].is_null());
    }
}
