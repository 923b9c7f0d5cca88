use sqlx::SqlitePool;
use std::sync::Arc;

use super::Config;
use crate::printing::AgentMetrics;

/// State shared with the HTTP handlers
#[derive(Clone)]
pub struct AgentState {
    pub config: Arc<Config>,
    pub pool: SqlitePool,
    pub metrics: Arc<AgentMetrics>,
}

impl AgentState {
    pub fn new(config: Arc<Config>, pool: SqlitePool, metrics: Arc<AgentMetrics>) -> Self {
        Self {
            config,
            pool,
            metrics,
        }
    }
}
