//! Logging setup
//!
//! Human-readable lines on stdout, or JSON lines in a daily rolling file
//! when `LOG_DIR` points at an existing directory.

use std::path::Path;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "print-agent";

/// Install the global subscriber
///
/// `RUST_LOG` wins over `log_level` when set.
pub fn init_logger_with_file(log_level: &str, log_dir: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| level_filter(log_level));

    match log_dir.map(Path::new) {
        Some(dir) if dir.is_dir() => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            tracing_subscriber::fmt()
                .json()
                .with_current_span(true)
                .with_env_filter(filter)
                .with_writer(appender)
                .init();
        }
        Some(dir) => {
            eprintln!("Log directory {} does not exist, logging to stdout", dir.display());
            init_stdout(filter);
        }
        None => init_stdout(filter),
    }
}

fn init_stdout(filter: EnvFilter) {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Filter for a `LOG_LEVEL` value; anything unparsable means `info`
fn level_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter() {
        assert_eq!(level_filter("debug").to_string(), "debug");
        assert_eq!(level_filter("kitchen=verbose").to_string(), "info");
    }
}
