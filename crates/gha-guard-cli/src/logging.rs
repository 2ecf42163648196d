//! Diagnostic logging through `tracing-subscriber`.
//!
//! Log events go to stderr so they never mix with a JSON or SARIF report
//! written to stdout.
//!
//! - `warn` (default): recoverable problems such as a missing config file
//! - `info` (`-v`): files scanned, config loaded, report sizes
//! - `debug` (`-vv`): per-rule finding counts, skipped files
//! - `trace` (`-vvv`): everything
//!
//! `RUST_LOG` overrides the verbosity flag when set.

use std::io;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub level: Level,
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            with_ansi: true,
        }
    }
}

impl LogConfig {
    /// Map the `-v` count to a level.
    #[must_use]
    pub fn from_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_ansi(mut self, enable: bool) -> Self {
        self.with_ansi = enable;
        self
    }
}

/// Install the global subscriber. Call once, before any work starts.
pub fn init_logging(config: &LogConfig) {
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(config.with_ansi)
        .with_target(false)
        .without_time();

    if let Err(e) = tracing_subscriber::registry()
        .with(build_env_filter(config.level))
        .with(layer)
        .try_init()
    {
        eprintln!("Warning: failed to initialize logging: {e}");
    }
}

fn build_env_filter(level: Level) -> EnvFilter {
    let level = level.as_str().to_lowercase();
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Third-party crates stay at warn.
        EnvFilter::new(format!(
            "warn,gha_guard_cli={level},gha_guard_core={level}"
        ))
    })
}
