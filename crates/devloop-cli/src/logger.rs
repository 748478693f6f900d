//! Logging infrastructure for the devloop CLI.
//!
//! Structured logging on the `tracing` ecosystem with verbosity flags,
//! colored output and a `RUST_LOG` override.
//!
//! # Example
//!
//! ```rust,no_run
//! use devloop_cli::logger::init_logger;
//! use tracing::{debug, info};
//!
//! init_logger(false, false, false);
//!
//! info!("Watching ./src");
//! debug!("Queued build for {}", "src/index.ts");
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERBOSE_FILTER: &str = "devloop=debug,devloop_cli=debug,devloop_hmr=debug";
const QUIET_FILTER: &str = "devloop=error,devloop_cli=error,devloop_hmr=error";
const DEFAULT_FILTER: &str = "devloop=info,devloop_cli=info,devloop_hmr=info";

/// Build the filter for the given flags.
///
/// The level is chosen in this order:
/// 1. `--verbose`: DEBUG for devloop crates
/// 2. `--quiet`: ERROR only
/// 3. `RUST_LOG`: custom filter
/// 4. Default: INFO for devloop crates
pub fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Initialize the tracing subscriber. Call once, before any logging.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color);
}

/// Initialize logger with a custom environment filter.
///
/// Does nothing if a global subscriber is already installed, so tests can
/// call it repeatedly.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
