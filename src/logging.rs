//! Logging setup for the `cli` binary using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `GANTT_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `warn`
//!
//! Output goes to stderr so stdout stays free for command results.

use tracing::Level;
use tracing_subscriber::fmt;

pub const LOG_ENV_VAR: &str = "GANTT_LOG";

/// Initialise the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<Level>) {
    let level = cli_level
        .or_else(|| {
            std::env::var(LOG_ENV_VAR)
                .ok()
                .and_then(|value| parse_level_str(&value))
        })
        .unwrap_or(Level::WARN);

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

pub fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
