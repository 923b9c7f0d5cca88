//! Print Agent - kitchen ticket print orchestration
//!
//! Polls the shared POS database for pending kitchen tickets, routes each
//! one to the right station printer, renders it to ESC/POS and drives it
//! through a retry-aware state machine so every ticket prints once even
//! when printers drop off the network or the agent restarts.
//!
//! # Module layout
//!
//! ```text
//! print-agent/src/
//! ├── core/       # config, errors, lifecycle, background tasks
//! ├── db/         # SQLite pool, migrations, models, repositories
//! ├── printing/   # resolver, renderer, transport, driver, poller
//! ├── api/        # health HTTP surface
//! └── utils/      # logging, time helpers
//! ```

pub mod api;
pub mod core;
pub mod db;
pub mod printing;
pub mod utils;

pub use crate::core::{Agent, AgentError, Config};
pub use db::DbService;
pub use printing::{PrintDriver, TicketOutcome, TicketPoller};
pub use utils::logger::init_logger_with_file;

/// Initialize logging from the loaded configuration
pub fn setup_environment(config: &Config) {
    init_logger_with_file(&config.log_level, config.log_dir.as_deref());
}
