use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Available devloop subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the development server with watch mode
    ///
    /// Runs an initial build, serves the output directory, rebuilds when
    /// files under the watch directory change and tells connected browsers
    /// to reload.
    Dev(DevArgs),

    /// Run the build pipeline once and exit
    ///
    /// Same steps as a rebuild in dev mode, without the server, watcher or
    /// reload messages. Build and hook failures make the command fail.
    Build(BuildArgs),
}

/// Arguments for the dev command
#[derive(Args, Debug, Clone, Default)]
pub struct DevArgs {
    /// Path to the config file
    ///
    /// Relative paths are resolved against --cwd. Defaults to
    /// devloop.config.json in the project root when present.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project root directory
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Port for the dev server
    ///
    /// If the port is busy, the next free port (up to +10) is used.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory to watch for changes
    #[arg(short, long, value_name = "DIR")]
    pub watch_dir: Option<PathBuf>,

    /// Open the browser once the server is up
    #[arg(long)]
    pub open: bool,
}

/// Arguments for the build command
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Path to the config file, relative to --cwd
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project root directory
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}
