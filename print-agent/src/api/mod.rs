//! HTTP health surface
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /health | GET | Store status, ticket counts and agent metrics (503 when the store is down) |
//! | /metrics | GET | Agent metrics only |
//! | /ping | GET | Liveness |

pub mod health;

use axum::Router;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

use crate::core::AgentState;

pub fn router(state: AgentState) -> Router {
    health::router().with_state(state)
}

/// Serve the health routes until `shutdown` is cancelled
pub async fn serve(state: AgentState, port: u16, shutdown: CancellationToken) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Health server listening on http://{}/health", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
