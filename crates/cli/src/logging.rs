//! Tracing subscriber setup
//!
//! Logs go to stderr so report output on stdout stays machine readable.
//! `RUST_LOG` overrides the level chosen by `-v`.

use clap::ValueEnum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable (default)
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Level for a `-v` count: 0 warn, 1 info, 2 and above debug
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Install the global subscriber; call once at startup
pub fn init(verbosity: u8, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}
