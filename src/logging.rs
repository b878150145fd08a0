//! Process-wide `tracing` subscriber.
//!
//! stdout carries the LSP channel, so everything goes to stderr.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Build the filter: `--log-level` when given, else `RUST_LOG`, else `info`.
pub fn env_filter(log_level: Option<&str>) -> EnvFilter {
    match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Install the stderr subscriber.  Fails if one is already installed.
pub fn init_logger(
    no_color: bool,
    log_level: Option<&str>,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .with_filter(env_filter(log_level));
    tracing_subscriber::registry().with(stderr_layer).try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_level_wins() {
        assert_eq!(env_filter(Some("debug")).to_string(), "debug");
    }
}
