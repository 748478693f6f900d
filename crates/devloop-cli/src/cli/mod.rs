//! Command-line interface definition.
//!
//! - `devloop dev` - watch, rebuild and serve with hot reload
//! - `devloop build` - run the build pipeline once

mod commands;

use clap::Parser;

pub use commands::{BuildArgs, Command, DevArgs};

/// Devloop - watch, rebuild and hot-reload dev server
#[derive(Parser, Debug)]
#[command(
    name = "devloop",
    version,
    about = "Watch, rebuild and hot-reload dev server for JavaScript/TypeScript projects",
    long_about = "Devloop drives your bundler from a file watcher, serves the build output\n\
                  and pushes reload and type-check diagnostics to the browser over a\n\
                  WebSocket."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
