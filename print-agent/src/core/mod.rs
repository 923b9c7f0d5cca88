//! Agent core: configuration, errors, lifecycle and task supervision

pub mod agent;
pub mod config;
pub mod error;
pub mod state;
pub mod tasks;

pub use agent::{Agent, shutdown_signal};
pub use config::Config;
pub use error::{AgentError, AgentResult};
pub use state::AgentState;
pub use tasks::{BackgroundTasks, TaskKind};
