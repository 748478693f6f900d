//! Devloop CLI - watch, rebuild and hot-reload for JavaScript/TypeScript projects.
//!
//! This crate drives an external bundler from a file watcher, serves the
//! build output over HTTP and pushes reload and diagnostic events to
//! connected browsers over the HMR WebSocket defined in `devloop-hmr`.
//!
//! # Architecture
//!
//! - [`error`] - Error types with actionable messages
//! - [`logger`] - Structured logging with tracing
//! - [`ui`] - Status lines and the build output table
//! - [`config`] - `devloop.config.json` loading and validation
//! - [`dev`] - Queue, watcher, build pipeline, type-checker gate, HMR bus and server
//! - `commands` - `dev` and `build` command implementations
//!
//! # Example
//!
//! ```rust
//! use devloop_cli::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{BuildError, CliError, ConfigError, Result, ResultExt};
