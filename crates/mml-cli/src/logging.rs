//! Logging setup using `tracing-subscriber`
//!
//! Logs go to stderr so command output on stdout stays clean.
//! `RUST_LOG` takes precedence over `-v` flags.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Map a `-v` count to a level: warn by default, then info, debug, trace
pub fn level_from_verbosity(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(verbosity: u8) {
    let level = level_from_verbosity(verbosity);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
