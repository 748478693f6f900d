//! Miette diagnostic conversion for CLI errors.

use crate::error::{BuildError, CliError};
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(e) => build_error_to_miette(e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        _ => miette::miette!("{}", err),
    }
}

/// Convert BuildError to miette Report
fn build_error_to_miette(err: BuildError) -> Report {
    match err {
        BuildError::CommandFailed { status, output } => {
            miette::miette!(
                "Build command failed ({})\n\n{}\n\nHint: Run the bundler command directly to see its full output",
                status,
                output.trim_end()
            )
        }
        BuildError::HookFailed { stage, message } => {
            miette::miette!(
                "{} hook failed: {}\n\nHint: Check the '{}' entries in devloop.config.json",
                stage,
                message,
                stage
            )
        }
        _ => miette::miette!("{}", err),
    }
}
